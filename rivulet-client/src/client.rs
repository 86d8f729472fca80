//! High-level client API.
//!
//! Every operation validates its request locally, sends it through the
//! session and decodes the typed response. Nothing is retried or cached and
//! server errors are returned unchanged.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::session::{Credentials, Session, SessionState};
use crate::transport::Transport;
use bytes::Bytes;
use rivulet_protocol::models::{decode_streams, decode_topics};
use rivulet_protocol::request::*;
use rivulet_protocol::{
    ErrorCode, IdentityInfo, Identifier, Message, Partitioning, PolledMessages, Stream,
    StreamDetails, Topic, TopicDetails, WireDecode,
};
use std::sync::Arc;

/// High-level client for a rivulet server.
pub struct Client {
    session: Arc<Session>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            session: Arc::new(Session::new(config)),
        }
    }

    /// Creates a connected client over an already open transport.
    pub fn with_transport(config: ConnectionConfig, transport: impl Transport) -> Self {
        Self {
            session: Arc::new(Session::with_transport(config, transport)),
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.session.connect().await
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.session.close().await
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Returns the underlying session.
    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }

    async fn send<R: Request>(&self, request: &R) -> Result<Bytes, ClientError> {
        self.session.send(request).await
    }

    // =========================================================================
    // Session operations
    // =========================================================================

    /// Logs in with a username and password.
    ///
    /// An empty success payload is a malformed response.
    pub async fn login(&self, username: &str, password: &str) -> Result<IdentityInfo, ClientError> {
        self.session
            .login(&Credentials::new(username, password))
            .await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await
    }

    /// Pings the server.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.send(&Ping).await?;
        Ok(())
    }

    // =========================================================================
    // Stream operations
    // =========================================================================

    /// Lists all streams. An empty payload is an empty list.
    pub async fn get_streams(&self) -> Result<Vec<Stream>, ClientError> {
        let payload = self.send(&GetStreams).await?;
        Ok(decode_streams(&payload)?)
    }

    /// Gets a stream with its topics.
    ///
    /// The server answers a missing stream with an empty success payload;
    /// that is returned as `StreamIdNotFound` (numeric id) or
    /// `StreamNameNotFound` (name), never as an empty stream.
    pub async fn get_stream(&self, stream_id: &Identifier) -> Result<StreamDetails, ClientError> {
        let payload = self
            .send(&GetStream {
                stream_id: stream_id.clone(),
            })
            .await?;
        if payload.is_empty() {
            return Err(ClientError::Server(stream_not_found(stream_id)));
        }
        Ok(StreamDetails::from_bytes(&payload)?)
    }

    /// Creates a stream. A `stream_id` of 0 lets the server assign one.
    pub async fn create_stream(&self, stream_id: u32, name: &str) -> Result<(), ClientError> {
        self.send(&CreateStream {
            stream_id,
            name: name.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Renames a stream.
    pub async fn update_stream(&self, stream_id: &Identifier, name: &str) -> Result<(), ClientError> {
        self.send(&UpdateStream {
            stream_id: stream_id.clone(),
            name: name.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn delete_stream(&self, stream_id: &Identifier) -> Result<(), ClientError> {
        self.send(&DeleteStream {
            stream_id: stream_id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Deletes all messages in the stream's topics.
    pub async fn purge_stream(&self, stream_id: &Identifier) -> Result<(), ClientError> {
        self.send(&PurgeStream {
            stream_id: stream_id.clone(),
        })
        .await?;
        Ok(())
    }

    // =========================================================================
    // Topic operations
    // =========================================================================

    /// Lists the topics of a stream. An empty payload is an empty list.
    pub async fn get_topics(&self, stream_id: &Identifier) -> Result<Vec<Topic>, ClientError> {
        let payload = self
            .send(&GetTopics {
                stream_id: stream_id.clone(),
            })
            .await?;
        Ok(decode_topics(&payload)?)
    }

    /// Gets a topic with its partitions.
    ///
    /// An empty success payload is returned as `TopicIdNotFound` (numeric id)
    /// or `TopicNameNotFound` (name).
    pub async fn get_topic(
        &self,
        stream_id: &Identifier,
        topic_id: &Identifier,
    ) -> Result<TopicDetails, ClientError> {
        let payload = self
            .send(&GetTopic {
                stream_id: stream_id.clone(),
                topic_id: topic_id.clone(),
            })
            .await?;
        if payload.is_empty() {
            return Err(ClientError::Server(topic_not_found(topic_id)));
        }
        Ok(TopicDetails::from_bytes(&payload)?)
    }

    /// Creates a topic with server defaults for compression, expiry, size
    /// and replication.
    pub async fn create_topic(
        &self,
        stream_id: &Identifier,
        topic_id: u32,
        partitions_count: u32,
        name: &str,
    ) -> Result<(), ClientError> {
        self.create_topic_with(&CreateTopic::new(
            stream_id.clone(),
            topic_id,
            partitions_count,
            name,
        ))
        .await
    }

    /// Creates a topic with every setting given explicitly.
    pub async fn create_topic_with(&self, request: &CreateTopic) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    pub async fn update_topic(&self, request: &UpdateTopic) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete_topic(
        &self,
        stream_id: &Identifier,
        topic_id: &Identifier,
    ) -> Result<(), ClientError> {
        self.send(&DeleteTopic {
            stream_id: stream_id.clone(),
            topic_id: topic_id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Deletes all messages in the topic.
    pub async fn purge_topic(
        &self,
        stream_id: &Identifier,
        topic_id: &Identifier,
    ) -> Result<(), ClientError> {
        self.send(&PurgeTopic {
            stream_id: stream_id.clone(),
            topic_id: topic_id.clone(),
        })
        .await?;
        Ok(())
    }

    // =========================================================================
    // Message operations
    // =========================================================================

    /// Appends a non-empty batch of messages to a topic.
    pub async fn send_messages(
        &self,
        stream_id: &Identifier,
        topic_id: &Identifier,
        partitioning: &Partitioning,
        messages: &[Message],
    ) -> Result<(), ClientError> {
        self.send(&SendMessages {
            stream_id: stream_id.clone(),
            topic_id: topic_id.clone(),
            partitioning: partitioning.clone(),
            messages: messages.to_vec(),
        })
        .await?;
        Ok(())
    }

    /// Polls messages. An empty payload means no messages.
    pub async fn poll_messages(&self, request: &PollMessages) -> Result<PolledMessages, ClientError> {
        let payload = self.send(request).await?;
        if payload.is_empty() {
            return Ok(PolledMessages {
                partition_id: request.partition_id.unwrap_or_default(),
                ..PolledMessages::default()
            });
        }
        Ok(PolledMessages::from_bytes(&payload)?)
    }
}

fn stream_not_found(stream_id: &Identifier) -> ErrorCode {
    if stream_id.is_numeric() {
        ErrorCode::StreamIdNotFound
    } else {
        ErrorCode::StreamNameNotFound
    }
}

fn topic_not_found(topic_id: &Identifier) -> ErrorCode {
    if topic_id.is_numeric() {
        ErrorCode::TopicIdNotFound
    } else {
        ErrorCode::TopicNameNotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{request_bytes, response_bytes, spawn_server};
    use parking_lot::Mutex;
    use rivulet_protocol::{
        Command, CompressionAlgorithm, Consumer, MaxTopicSize, MessageExpiry, Partition,
        PollingStrategy, ResponseFrame, ValidationError, WireEncode,
    };
    use std::collections::BTreeMap;
    use tokio_test::io::Builder;

    fn client(mock: tokio_test::io::Mock) -> Client {
        Client::with_transport(ConnectionConfig::default(), mock)
    }

    fn stream_details(id: u32, name: &str, topics: Vec<Topic>) -> StreamDetails {
        StreamDetails {
            stream: Stream {
                id,
                created_at: 1_700_000_000_000_000,
                topics_count: topics.len() as u32,
                size: 0,
                messages_count: 0,
                name: name.to_string(),
            },
            topics,
        }
    }

    fn topic(id: u32, name: &str, partitions_count: u32) -> Topic {
        Topic {
            id,
            created_at: 1_700_000_000_000_000,
            partitions_count,
            message_expiry: MessageExpiry::ServerDefault,
            compression: CompressionAlgorithm::None,
            max_topic_size: MaxTopicSize::ServerDefault,
            replication_factor: 1,
            size: 0,
            messages_count: 0,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_stream_not_found_by_id() {
        let request = GetStream {
            stream_id: Identifier::numeric(404),
        };
        let mock = Builder::new()
            .write(&request_bytes(&request))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        let err = client
            .get_stream(&Identifier::numeric(404))
            .await
            .unwrap_err();
        assert_eq!(err.server_code(), Some(ErrorCode::StreamIdNotFound));
        assert!(err.is_not_found());
        assert_eq!(client.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_get_stream_not_found_by_name() {
        let stream_id = Identifier::named("missing").unwrap();
        let mock = Builder::new()
            .write(&request_bytes(&GetStream {
                stream_id: stream_id.clone(),
            }))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        let err = client.get_stream(&stream_id).await.unwrap_err();
        assert_eq!(err.server_code(), Some(ErrorCode::StreamNameNotFound));
    }

    #[tokio::test]
    async fn test_get_stream_server_not_found_passes_through() {
        let mock = Builder::new()
            .write(&request_bytes(&GetStream {
                stream_id: Identifier::numeric(2),
            }))
            .read(&response_bytes(ResponseFrame::error(
                ErrorCode::StreamIdNotFound,
            )))
            .build();
        let client = client(mock);

        let err = client
            .get_stream(&Identifier::numeric(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Server(ErrorCode::StreamIdNotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_stream_decodes_details() {
        let details = stream_details(1, "events", vec![topic(1, "orders", 3)]);
        let mock = Builder::new()
            .write(&request_bytes(&GetStream {
                stream_id: Identifier::numeric(1),
            }))
            .read(&response_bytes(ResponseFrame::ok(
                details.to_bytes().unwrap(),
            )))
            .build();
        let client = client(mock);

        let decoded = client.get_stream(&Identifier::numeric(1)).await.unwrap();
        assert_eq!(decoded, details);
    }

    #[tokio::test]
    async fn test_get_topic_not_found() {
        let stream_id = Identifier::numeric(1);
        let topic_id = Identifier::numeric(9);
        let mock = Builder::new()
            .write(&request_bytes(&GetTopic {
                stream_id: stream_id.clone(),
                topic_id: topic_id.clone(),
            }))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        let err = client.get_topic(&stream_id, &topic_id).await.unwrap_err();
        assert_eq!(err.server_code(), Some(ErrorCode::TopicIdNotFound));
    }

    #[tokio::test]
    async fn test_empty_lists() {
        let stream_id = Identifier::numeric(1);
        let mock = Builder::new()
            .write(&request_bytes(&GetStreams))
            .read(&response_bytes(ResponseFrame::empty()))
            .write(&request_bytes(&GetTopics {
                stream_id: stream_id.clone(),
            }))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        assert!(client.get_streams().await.unwrap().is_empty());
        assert!(client.get_topics(&stream_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_length_boundary_before_write() {
        // The mock expects no I/O at all.
        let client = client(Builder::new().build());

        let err = client.create_stream(1, &"s".repeat(256)).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::ValueTooLong {
                length: 256,
                max: 255,
                ..
            })
        ));

        let err = client
            .create_topic(&Identifier::numeric(1), 1, 1, &"t".repeat(256))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = client
            .send_messages(
                &Identifier::numeric(1),
                &Identifier::numeric(1),
                &Partitioning::Balanced,
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::EmptyBatch)
        ));

        // Validation failures leave the session usable.
        assert_eq!(client.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_name_of_max_length_is_sent() {
        let request = CreateStream {
            stream_id: 1,
            name: "s".repeat(255),
        };
        let mock = Builder::new()
            .write(&request_bytes(&request))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        client.create_stream(1, &"s".repeat(255)).await.unwrap();
    }

    #[tokio::test]
    async fn test_poll_messages() {
        let polled = PolledMessages {
            partition_id: 1,
            current_offset: 1,
            messages: vec![
                Message::with_id(1, "{\"msg\": 1}"),
                Message::with_id(2, "{\"msg\": 2}"),
            ],
        };
        let request = PollMessages {
            consumer: Consumer::default(),
            stream_id: Identifier::numeric(1),
            topic_id: Identifier::numeric(1),
            partition_id: Some(1),
            strategy: PollingStrategy::Offset(0),
            count: 10,
            auto_commit: false,
        };
        let mock = Builder::new()
            .write(&request_bytes(&request))
            .read(&response_bytes(ResponseFrame::ok(polled.to_bytes().unwrap())))
            .write(&request_bytes(&request))
            .read(&response_bytes(ResponseFrame::empty()))
            .build();
        let client = client(mock);

        assert_eq!(client.poll_messages(&request).await.unwrap(), polled);

        let empty = client.poll_messages(&request).await.unwrap();
        assert!(empty.messages.is_empty());
        assert_eq!(empty.partition_id, 1);
    }

    /// Minimal stateful server: streams, topics and message counts.
    #[derive(Default)]
    struct FakeBroker {
        streams: BTreeMap<u32, StreamDetails>,
        partitions: BTreeMap<(u32, u32), Vec<Partition>>,
        sent: Vec<(u32, u32, Partitioning, Vec<Message>)>,
    }

    impl FakeBroker {
        fn handle(&mut self, request: rivulet_protocol::RequestFrame) -> ResponseFrame {
            let payload = request.payload;
            match request.command {
                Command::LoginUser => {
                    let login = LoginUser::from_bytes(&payload).unwrap();
                    if login.username == "admin" && login.password == "secret" {
                        ResponseFrame::ok(IdentityInfo { user_id: 1 }.to_bytes().unwrap())
                    } else {
                        ResponseFrame::error(ErrorCode::InvalidCredentials)
                    }
                }
                Command::CreateStream => {
                    let create = CreateStream::from_bytes(&payload).unwrap();
                    if self.streams.contains_key(&create.stream_id) {
                        return ResponseFrame::error(ErrorCode::StreamIdAlreadyExists);
                    }
                    self.streams.insert(
                        create.stream_id,
                        stream_details(create.stream_id, &create.name, vec![]),
                    );
                    ResponseFrame::empty()
                }
                Command::GetStream => {
                    let get = GetStream::from_bytes(&payload).unwrap();
                    match get
                        .stream_id
                        .as_numeric()
                        .and_then(|id| self.streams.get(&id))
                    {
                        Some(details) => ResponseFrame::ok(details.to_bytes().unwrap()),
                        None => ResponseFrame::empty(),
                    }
                }
                Command::CreateTopic => {
                    let create = CreateTopic::from_bytes(&payload).unwrap();
                    let Some(stream_id) = create.stream_id.as_numeric() else {
                        return ResponseFrame::error(ErrorCode::StreamNameNotFound);
                    };
                    let Some(details) = self.streams.get_mut(&stream_id) else {
                        return ResponseFrame::error(ErrorCode::StreamIdNotFound);
                    };
                    details.topics.push(topic(
                        create.topic_id,
                        &create.name,
                        create.partitions_count,
                    ));
                    details.stream.topics_count += 1;
                    let partitions = (1..=create.partitions_count)
                        .map(|id| Partition {
                            id,
                            created_at: 0,
                            segments_count: 1,
                            current_offset: 0,
                            size: 0,
                            messages_count: 0,
                        })
                        .collect();
                    self.partitions
                        .insert((stream_id, create.topic_id), partitions);
                    ResponseFrame::empty()
                }
                Command::GetTopic => {
                    let get = GetTopic::from_bytes(&payload).unwrap();
                    let key = (
                        get.stream_id.as_numeric().unwrap_or_default(),
                        get.topic_id.as_numeric().unwrap_or_default(),
                    );
                    let found = self.partitions.get(&key).and_then(|partitions| {
                        let header = self
                            .streams
                            .get(&key.0)?
                            .topics
                            .iter()
                            .find(|t| t.id == key.1)?
                            .clone();
                        Some(TopicDetails {
                            topic: header,
                            partitions: partitions.clone(),
                        })
                    });
                    match found {
                        Some(details) => ResponseFrame::ok(details.to_bytes().unwrap()),
                        None => ResponseFrame::empty(),
                    }
                }
                Command::SendMessages => {
                    let send = SendMessages::from_bytes(&payload).unwrap();
                    let stream_id = send.stream_id.as_numeric().unwrap_or_default();
                    let topic_id = send.topic_id.as_numeric().unwrap_or_default();
                    if !self.partitions.contains_key(&(stream_id, topic_id)) {
                        return ResponseFrame::error(ErrorCode::TopicIdNotFound);
                    }
                    self.sent
                        .push((stream_id, topic_id, send.partitioning, send.messages));
                    ResponseFrame::empty()
                }
                _ => ResponseFrame::error(ErrorCode::InvalidCommand),
            }
        }
    }

    #[tokio::test]
    async fn test_producer_scenario() {
        let broker = Arc::new(Mutex::new(FakeBroker::default()));
        let (transport, server) = {
            let broker = broker.clone();
            spawn_server(move |request| broker.lock().handle(request))
        };
        let client = Client::with_transport(ConnectionConfig::default(), transport);

        let identity = client.login("admin", "secret").await.unwrap();
        assert_eq!(identity.user_id, 1);
        assert_eq!(client.state(), SessionState::Authenticated);

        let stream_id = Identifier::numeric(1);
        let topic_id = Identifier::numeric(1);

        // Probe, then create on not-found.
        let err = client.get_stream(&stream_id).await.unwrap_err();
        assert!(err.is_not_found());
        client
            .create_stream(1, "Test Producer Stream")
            .await
            .unwrap();

        let details = client.get_stream(&stream_id).await.unwrap();
        assert_eq!(details.stream.id, 1);
        assert_eq!(details.stream.name, "Test Producer Stream");
        assert!(details.topics.is_empty());

        let err = client.get_topic(&stream_id, &topic_id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.server_code(), Some(ErrorCode::TopicIdNotFound));
        client
            .create_topic(&stream_id, 1, 12, "Test Producer Topic")
            .await
            .unwrap();

        let topic_details = client.get_topic(&stream_id, &topic_id).await.unwrap();
        assert_eq!(topic_details.topic.id, 1);
        assert_eq!(topic_details.topic.name, "Test Producer Topic");
        assert_eq!(topic_details.partitions.len(), 12);

        let details = client.get_stream(&stream_id).await.unwrap();
        assert_eq!(details.topics.len(), 1);
        assert_eq!(details.topics[0].partitions_count, 12);

        let payload = serde_json::to_vec(&serde_json::json!({ "msg": 1 })).unwrap();
        let message = Message::new(payload.clone());
        client
            .send_messages(
                &stream_id,
                &topic_id,
                &Partitioning::partition_id(1),
                std::slice::from_ref(&message),
            )
            .await
            .unwrap();

        {
            let broker = broker.lock();
            assert_eq!(broker.sent.len(), 1);
            let (stream, topic, partitioning, messages) = &broker.sent[0];
            assert_eq!((*stream, *topic), (1, 1));
            assert_eq!(partitioning, &Partitioning::PartitionId(1));
            assert_eq!(messages, &vec![message]);
            assert_eq!(messages[0].payload.as_ref(), payload.as_slice());
        }

        // Creating the same stream again surfaces the server's code verbatim.
        let err = client
            .create_stream(1, "Test Producer Stream")
            .await
            .unwrap_err();
        assert_eq!(err.server_code(), Some(ErrorCode::StreamIdAlreadyExists));

        assert_eq!(server.stats().interleaved, 0);
        client.close().await.unwrap();
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_login_with_invalid_credentials_against_server() {
        let broker = Arc::new(Mutex::new(FakeBroker::default()));
        let (transport, _server) = {
            let broker = broker.clone();
            spawn_server(move |request| broker.lock().handle(request))
        };
        let client = Client::with_transport(ConnectionConfig::default(), transport);

        let err = client.login("admin", "wrong").await.unwrap_err();
        assert_eq!(err.server_code(), Some(ErrorCode::InvalidCredentials));
        assert_eq!(client.state(), SessionState::Connected);

        client.login("admin", "secret").await.unwrap();
        assert_eq!(client.state(), SessionState::Authenticated);
    }
}
