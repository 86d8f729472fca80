//! Command execution.

use crate::{Commands, ProduceArgs, TopicSettings};
use colored::Colorize;
use rivulet_client::Client;
use rivulet_protocol::request::{CreateTopic, PollMessages, UpdateTopic};
use rivulet_protocol::{
    Consumer, Identifier, Message, Partitioning, PollingStrategy, Stream, Topic,
};
use std::time::Duration;

/// Executes a command and returns the formatted output.
pub async fn execute(client: &Client, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        // Handled by the caller.
        Commands::Repl | Commands::Produce(_) => unreachable!(),

        Commands::Ping => {
            client.ping().await?;
            Ok("PONG".green().to_string())
        }

        Commands::Streams => {
            let streams = client.get_streams().await?;
            if streams.is_empty() {
                return Ok("No streams".yellow().to_string());
            }
            Ok(streams.iter().map(format_stream).collect::<Vec<_>>().join("\n"))
        }

        Commands::Stream { stream } => {
            let details = client.get_stream(&stream).await?;
            let mut output = format!("{}\n", format_stream(&details.stream).bold());
            if details.topics.is_empty() {
                output.push_str(&format!("  {}", "No topics".dimmed()));
            }
            for topic in &details.topics {
                output.push_str(&format!("  {}\n", format_topic(topic)));
            }
            Ok(output)
        }

        Commands::CreateStream { id, name } => {
            client.create_stream(id, &name).await?;
            Ok(format!("{} stream {}", "Created".green(), name.cyan()))
        }

        Commands::UpdateStream { stream, name } => {
            client.update_stream(&stream, &name).await?;
            Ok(format!(
                "{} stream {} to {}",
                "Renamed".green(),
                stream,
                name.cyan()
            ))
        }

        Commands::DeleteStream { stream } => {
            client.delete_stream(&stream).await?;
            Ok(format!("{} stream {}", "Deleted".green(), stream.to_string().cyan()))
        }

        Commands::PurgeStream { stream } => {
            client.purge_stream(&stream).await?;
            Ok(format!("{} stream {}", "Purged".green(), stream.to_string().cyan()))
        }

        Commands::Topics { stream } => {
            let topics = client.get_topics(&stream).await?;
            if topics.is_empty() {
                return Ok("No topics".yellow().to_string());
            }
            Ok(topics.iter().map(format_topic).collect::<Vec<_>>().join("\n"))
        }

        Commands::Topic { stream, topic } => {
            let details = client.get_topic(&stream, &topic).await?;
            let mut output = format!("{}\n", format_topic(&details.topic).bold());
            for partition in &details.partitions {
                output.push_str(&format!(
                    "  partition {:>4} | offset {:>10} | {:>8} messages | {}\n",
                    partition.id.to_string().cyan(),
                    partition.current_offset,
                    partition.messages_count,
                    format_bytes(partition.size)
                ));
            }
            Ok(output)
        }

        Commands::CreateTopic {
            stream,
            id,
            partitions,
            settings,
            name,
        } => {
            let request = CreateTopic {
                stream_id: stream,
                topic_id: id,
                partitions_count: partitions,
                compression: settings.compression,
                message_expiry: settings.message_expiry,
                max_topic_size: settings.max_size,
                replication_factor: settings.replication_factor,
                name: name.clone(),
            };
            client.create_topic_with(&request).await?;
            Ok(format!(
                "{} topic {} with {} partitions",
                "Created".green(),
                name.cyan(),
                partitions
            ))
        }

        Commands::UpdateTopic {
            stream,
            topic,
            settings,
            name,
        } => {
            let request = update_topic_request(stream, topic.clone(), settings, &name);
            client.update_topic(&request).await?;
            Ok(format!("{} topic {}", "Updated".green(), topic.to_string().cyan()))
        }

        Commands::DeleteTopic { stream, topic } => {
            client.delete_topic(&stream, &topic).await?;
            Ok(format!("{} topic {}", "Deleted".green(), topic.to_string().cyan()))
        }

        Commands::PurgeTopic { stream, topic } => {
            client.purge_topic(&stream, &topic).await?;
            Ok(format!("{} topic {}", "Purged".green(), topic.to_string().cyan()))
        }

        Commands::Send {
            stream,
            topic,
            partition,
            key,
            payloads,
        } => {
            let partitioning = parse_partitioning(partition, key.as_deref())?;
            let messages: Vec<Message> = payloads.into_iter().map(Message::new).collect();
            client
                .send_messages(&stream, &topic, &partitioning, &messages)
                .await?;
            Ok(format!(
                "{} {} message(s) to {}/{}",
                "Sent".green(),
                messages.len(),
                stream,
                topic
            ))
        }

        Commands::Poll {
            stream,
            topic,
            partition,
            strategy,
            count,
            consumer,
            group,
            auto_commit,
        } => {
            let request = PollMessages {
                consumer: if group {
                    Consumer::Group(consumer)
                } else {
                    Consumer::Individual(consumer)
                },
                stream_id: stream,
                topic_id: topic,
                partition_id: Some(partition),
                strategy: parse_strategy(&strategy)?,
                count,
                auto_commit,
            };
            let polled = client.poll_messages(&request).await?;
            if polled.messages.is_empty() {
                return Ok("No messages".yellow().to_string());
            }

            let mut output = String::new();
            for message in &polled.messages {
                output.push_str(&format!(
                    "[{:>8}] {} | {}\n",
                    message.header.offset.to_string().cyan(),
                    format!("{:032x}", message.id()).dimmed(),
                    String::from_utf8_lossy(&message.payload)
                ));
            }
            output.push_str(&format!(
                "\n{}: {}",
                "Current offset".dimmed(),
                polled.current_offset
            ));
            Ok(output)
        }
    }
}

/// Ensures the stream and topic exist, then publishes `{"msg": n}` until
/// interrupted or the limit is reached.
pub async fn produce(
    client: &Client,
    args: &ProduceArgs,
) -> Result<String, Box<dyn std::error::Error>> {
    let stream_id = Identifier::numeric(args.stream_id);
    let topic_id = Identifier::numeric(args.topic_id);

    match client.get_stream(&stream_id).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            client.create_stream(args.stream_id, &args.stream_name).await?;
            eprintln!("{} stream with ID: {}", "Created".green(), args.stream_id);
        }
        Err(e) => return Err(e.into()),
    }
    eprintln!("Stream with ID: {} exists.", args.stream_id);

    match client.get_topic(&stream_id, &topic_id).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            client
                .create_topic(&stream_id, args.topic_id, args.partitions, &args.topic_name)
                .await?;
            eprintln!("{} topic with ID: {}", "Created".green(), args.topic_id);
        }
        Err(e) => return Err(e.into()),
    }
    eprintln!("Topic with ID: {} exists.", args.topic_id);

    eprintln!(
        "Messages will be sent to stream '{}', topic '{}', partition '{}' with interval {} ms.",
        args.stream_id, args.topic_id, args.partition, args.interval_ms
    );
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    let partitioning = Partitioning::partition_id(args.partition);
    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0u64;
    loop {
        if args.limit.is_some_and(|limit| sent >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Stopping producer...".dimmed());
                break;
            }
        }

        sent += 1;
        let payload = serde_json::to_vec(&serde_json::json!({ "msg": sent }))?;
        client
            .send_messages(&stream_id, &topic_id, &partitioning, &[Message::new(payload.clone())])
            .await?;
        println!("Sent message: {}", String::from_utf8_lossy(&payload));
    }

    Ok(format!("{} {} message(s)", "Produced".green(), sent))
}

fn update_topic_request(
    stream: Identifier,
    topic: Identifier,
    settings: TopicSettings,
    name: &str,
) -> UpdateTopic {
    UpdateTopic {
        stream_id: stream,
        topic_id: topic,
        compression: settings.compression,
        message_expiry: settings.message_expiry,
        max_topic_size: settings.max_size,
        replication_factor: settings.replication_factor,
        name: name.to_string(),
    }
}

/// Parses `first`, `last`, `next`, `offset:<n>` or `timestamp:<micros>`.
fn parse_strategy(value: &str) -> Result<PollingStrategy, String> {
    let (kind, arg) = match value.split_once(':') {
        Some((kind, arg)) => (kind, Some(arg)),
        None => (value, None),
    };
    let number = |arg: Option<&str>| -> Result<u64, String> {
        arg.ok_or_else(|| format!("strategy '{}' needs a value", kind))?
            .parse()
            .map_err(|_| format!("invalid strategy value: {}", value))
    };

    match (kind.to_ascii_lowercase().as_str(), arg) {
        ("first", None) => Ok(PollingStrategy::First),
        ("last", None) => Ok(PollingStrategy::Last),
        ("next", None) => Ok(PollingStrategy::Next),
        ("offset", arg) => Ok(PollingStrategy::Offset(number(arg)?)),
        ("timestamp", arg) => Ok(PollingStrategy::Timestamp(number(arg)?)),
        _ => Err(format!("unknown polling strategy: {}", value)),
    }
}

fn parse_partitioning(
    partition: Option<u32>,
    key: Option<&str>,
) -> Result<Partitioning, Box<dyn std::error::Error>> {
    Ok(match (partition, key) {
        (Some(id), _) => Partitioning::partition_id(id),
        (None, Some(key)) => Partitioning::messages_key(key.as_bytes().to_vec())?,
        (None, None) => Partitioning::balanced(),
    })
}

fn format_stream(stream: &Stream) -> String {
    format!(
        "{:>4} {} | {} topics | {} messages | {} | created {}",
        stream.id.to_string().cyan(),
        stream.name,
        stream.topics_count,
        stream.messages_count,
        format_bytes(stream.size),
        format_created_at(stream.created_at_utc())
    )
}

fn format_topic(topic: &Topic) -> String {
    format!(
        "{:>4} {} | {} partitions | {} messages | {} | expiry {} | compression {}",
        topic.id.to_string().cyan(),
        topic.name,
        topic.partitions_count,
        topic.messages_count,
        format_bytes(topic.size),
        topic.message_expiry,
        topic.compression
    )
}

fn format_created_at(created_at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    created_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// Formats bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
