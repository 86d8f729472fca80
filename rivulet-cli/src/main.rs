//! rivulet-cli - Command-line interface for a rivulet server
//!
//! Provides one-shot commands, a REPL and a demo producer loop.

mod commands;
mod repl;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rivulet_client::{Client, ConnectionConfig, TlsConfig};
use rivulet_protocol::{CompressionAlgorithm, Identifier, MaxTopicSize, MessageExpiry};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rivulet-cli")]
#[command(about = "Command-line interface for a rivulet message-streaming server")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, env = "RIVULET_SERVER", default_value = rivulet_protocol::DEFAULT_ADDRESS)]
    server: String,

    /// Username to log in with
    #[arg(short, long, env = "RIVULET_USERNAME")]
    username: Option<String>,

    /// Password to log in with
    #[arg(short, long, env = "RIVULET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    request_timeout: u64,

    // ===== TLS Options =====
    /// Enable TLS connection
    #[arg(long, env = "RIVULET_TLS")]
    tls: bool,

    /// Path to CA certificate for server verification
    #[arg(long, env = "RIVULET_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Skip server certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    /// Server name for TLS SNI (defaults to server hostname)
    #[arg(long)]
    server_name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Ping the server
    Ping,

    /// List all streams
    Streams,

    /// Show a stream and its topics
    Stream {
        /// Stream id or name
        stream: Identifier,
    },

    /// Create a stream
    CreateStream {
        /// Stream id (0 lets the server assign one)
        #[arg(short, long, default_value = "0")]
        id: u32,

        /// Stream name
        name: String,
    },

    /// Rename a stream
    UpdateStream {
        stream: Identifier,
        name: String,
    },

    /// Delete a stream
    DeleteStream { stream: Identifier },

    /// Delete all messages in a stream
    PurgeStream { stream: Identifier },

    /// List the topics of a stream
    Topics { stream: Identifier },

    /// Show a topic and its partitions
    Topic {
        stream: Identifier,
        topic: Identifier,
    },

    /// Create a topic
    CreateTopic {
        stream: Identifier,

        /// Topic id (0 lets the server assign one)
        #[arg(short, long, default_value = "0")]
        id: u32,

        /// Number of partitions
        #[arg(short, long, default_value = "1")]
        partitions: u32,

        #[command(flatten)]
        settings: TopicSettings,

        /// Topic name
        name: String,
    },

    /// Change a topic's name and settings
    UpdateTopic {
        stream: Identifier,
        topic: Identifier,

        #[command(flatten)]
        settings: TopicSettings,

        /// New topic name
        name: String,
    },

    /// Delete a topic
    DeleteTopic {
        stream: Identifier,
        topic: Identifier,
    },

    /// Delete all messages in a topic
    PurgeTopic {
        stream: Identifier,
        topic: Identifier,
    },

    /// Send messages, one per payload argument
    Send {
        stream: Identifier,
        topic: Identifier,

        /// Target partition
        #[arg(short, long, conflicts_with = "key")]
        partition: Option<u32>,

        /// Partition by hash of this key
        #[arg(short, long)]
        key: Option<String>,

        /// Message payloads
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Poll messages from a partition
    Poll {
        stream: Identifier,
        topic: Identifier,

        #[arg(short, long, default_value = "1")]
        partition: u32,

        /// first, last, next, offset:<n> or timestamp:<micros>
        #[arg(long, default_value = "first")]
        strategy: String,

        /// Maximum number of messages
        #[arg(short, long, default_value = "10")]
        count: u32,

        /// Consumer id or name
        #[arg(long, default_value = "0")]
        consumer: Identifier,

        /// Poll as a consumer group
        #[arg(long)]
        group: bool,

        /// Store the consumer offset after reading
        #[arg(long)]
        auto_commit: bool,
    },

    /// Ensure a stream and topic exist, then publish a JSON message on an interval
    Produce(ProduceArgs),
}

#[derive(Args)]
pub struct TopicSettings {
    /// Compression algorithm (none, gzip)
    #[arg(long, default_value = "none")]
    pub compression: CompressionAlgorithm,

    /// Message expiry in microseconds, "default" or "never"
    #[arg(long, default_value = "default")]
    pub message_expiry: MessageExpiry,

    /// Maximum topic size in bytes, "default" or "unlimited"
    #[arg(long, default_value = "default")]
    pub max_size: MaxTopicSize,

    /// Replication factor (0 leaves it unset)
    #[arg(long, default_value = "0")]
    pub replication_factor: u8,
}

#[derive(Args, Clone)]
pub struct ProduceArgs {
    #[arg(long, default_value = "1")]
    pub stream_id: u32,

    #[arg(long, default_value = "Test Producer Stream")]
    pub stream_name: String,

    #[arg(long, default_value = "1")]
    pub topic_id: u32,

    #[arg(long, default_value = "Test Topic From Producer")]
    pub topic_name: String,

    /// Partitions to create the topic with
    #[arg(long, default_value = "12")]
    pub partitions: u32,

    /// Partition to publish to
    #[arg(long, default_value = "1")]
    pub partition: u32,

    /// Delay between messages in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Stop after this many messages
    #[arg(long)]
    pub limit: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Build TLS config if any TLS option is set
    let tls_config = if cli.tls || cli.ca_cert.is_some() || cli.insecure {
        let mut tls = TlsConfig::new();
        if let Some(ref path) = cli.ca_cert {
            tls = tls.with_ca_file(path);
        }
        if let Some(ref name) = cli.server_name {
            tls = tls.with_domain(name);
        }
        if cli.insecure {
            tls = tls.with_insecure();
        }
        Some(tls)
    } else {
        None
    };

    let credentials = match (cli.username, cli.password) {
        (Some(username), Some(password)) => Some((username, password)),
        (None, None) => None,
        _ => {
            eprintln!(
                "{}: --username and --password must be used together",
                "Error".red()
            );
            std::process::exit(1);
        }
    };

    let mut config = ConnectionConfig::new(cli.server.clone())
        .with_request_timeout(Duration::from_secs(cli.request_timeout));
    if let Some(tls) = tls_config {
        config = config.with_tls(tls);
    }
    let client = Client::new(config);

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, &cli.server, credentials).await?;
        }
        Some(cmd) => {
            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;
            if let Some((ref username, ref password)) = credentials {
                client.login(username, password).await.map_err(|e| {
                    eprintln!("{}: {}", "Login failed".red(), e);
                    e
                })?;
            }

            let result = match cmd {
                Commands::Produce(args) => commands::produce(&client, &args).await,
                cmd => commands::execute(&client, cmd).await,
            };

            match result {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    let _ = client.close().await;
                    std::process::exit(1);
                }
            }

            client.close().await?;
        }
    }

    Ok(())
}
