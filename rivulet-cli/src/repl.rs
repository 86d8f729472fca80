//! Interactive REPL.
//!
//! Lines are parsed with the same clap definitions as one-shot commands, so
//! `create-topic 1 --partitions 3 orders` works the same in both places.

use crate::commands;
use crate::Commands;
use clap::Parser;
use colored::Colorize;
use rivulet_client::Client;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

const HELP_TEXT: &str = r#"
Available commands:
  help                                Show this help
  ping                                Ping the server
  login <username> <password>         Log in
  logout                              Log out

  streams                             List streams
  stream <stream>                     Show a stream and its topics
  create-stream [--id N] <name>       Create a stream
  update-stream <stream> <name>       Rename a stream
  delete-stream <stream>              Delete a stream
  purge-stream <stream>               Delete all messages in a stream

  topics <stream>                     List topics
  topic <stream> <topic>              Show a topic and its partitions
  create-topic <stream> [--id N] [--partitions N] <name>
  update-topic <stream> <topic> <name>
  delete-topic <stream> <topic>
  purge-topic <stream> <topic>

  send <stream> <topic> [-p N | -k KEY] <payload>...
  poll <stream> <topic> [-p N] [--strategy S] [-c N]

  Streams and topics accept a numeric id or a name.
  Append --help to any command for its options.

  quit, exit                          Exit the REPL
"#;

#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Commands,
}

pub async fn run(
    client: Client,
    addr: &str,
    credentials: Option<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "rivulet CLI".bold().cyan());
    println!("Connecting to {}...", addr);

    client.connect().await?;
    println!("{}", "Connected!".green());

    if let Some((username, password)) = credentials {
        let identity = client.login(&username, &password).await?;
        println!("Logged in as user {}", identity.user_id.to_string().cyan());
    }

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".rivulet_history"))
        .unwrap_or_else(|_| ".rivulet_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "rivulet>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&client, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }

                // A transport failure closes the session for good.
                if client.state() == rivulet_client::SessionState::Closed {
                    println!("{}", "Connection lost.".red());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    client: &Client,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts = split_args(line)?;
    let Some(cmd) = parts.first().map(|c| c.to_lowercase()) else {
        return Ok(Some(String::new()));
    };

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "login" => {
            let [_, username, password] = parts.as_slice() else {
                return Ok(Some("Usage: login <username> <password>".to_string()));
            };
            let identity = client.login(username, password).await?;
            Ok(Some(format!(
                "{} as user {}",
                "Logged in".green(),
                identity.user_id.to_string().cyan()
            )))
        }

        "logout" => {
            client.logout().await?;
            Ok(Some("Logged out".green().to_string()))
        }

        _ => match ReplLine::try_parse_from(&parts) {
            Ok(ReplLine {
                command: Commands::Repl | Commands::Produce(_),
            }) => Ok(Some(format!("'{}' is not available in the REPL", cmd))),
            Ok(ReplLine { command }) => commands::execute(client, command).await.map(Some),
            // Parse errors and --help output are both rendered by clap.
            Err(e) => Ok(Some(e.render().to_string())),
        },
    }
}

/// Splits a line on whitespace, keeping double-quoted segments together.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if pending {
        args.push(current);
    }
    Ok(args)
}
