//! Session: one transport connection, its authentication state and the
//! request/response exchange every command goes through.
//!
//! The protocol carries no request ids; responses are matched to requests by
//! arrival order alone. A session therefore holds its I/O lock across the
//! whole exchange (write the request frame, read one response frame) so at
//! most one command is ever in flight on the connection.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::transport::{self, BoxedTransport, Transport};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex as StateMutex;
use rivulet_protocol::request::{LoginUser, LogoutUser, Request};
use rivulet_protocol::{
    Command, IdentityInfo, ProtocolError, RequestFrame, ResponseFrame, WireDecode, WireEncode,
};
use std::fmt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

/// Username and password used to log in.
///
/// The session never stores credentials; they are only borrowed for the
/// login exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session lifecycle.
///
/// `Disconnected → Connected → Authenticated → Closed`. A failed login
/// leaves (or puts) the session in `Connected`. `Closed` is terminal: it is
/// entered on [`Session::close`] or on any transport failure, timeout or
/// framing violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Transport plus the bytes read from it but not yet consumed.
struct SessionIo {
    transport: BoxedTransport,
    read_buf: BytesMut,
    read_chunk: usize,
    /// Set while an exchange is running. Still set at the start of the next
    /// exchange only if the previous caller was dropped mid-exchange.
    in_flight: bool,
}

impl SessionIo {
    fn new(transport: BoxedTransport, read_chunk: usize) -> Self {
        Self {
            transport,
            read_buf: BytesMut::with_capacity(read_chunk),
            read_chunk,
            in_flight: false,
        }
    }

    /// Writes one request frame and reads exactly one response frame.
    async fn exchange(&mut self, frame: &[u8]) -> Result<ResponseFrame, ClientError> {
        self.transport.write_all(frame).await?;
        self.transport.flush().await?;

        loop {
            if let Some(response) = ResponseFrame::decode(&mut self.read_buf)? {
                if !self.read_buf.is_empty() {
                    return Err(ProtocolError::TrailingBytes {
                        field: "response",
                        count: self.read_buf.len(),
                    }
                    .into());
                }
                return Ok(response);
            }

            self.read_buf.reserve(self.read_chunk);
            let n = self.transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                tracing::debug!("Connection closed by server");
                return Err(ClientError::ConnectionClosed);
            }
        }
    }
}

/// A session with the server.
pub struct Session {
    config: ConnectionConfig,
    io: Mutex<Option<SessionIo>>,
    state: StateMutex<SessionState>,
    closed: watch::Sender<bool>,
}

impl Session {
    /// Creates a session (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            config,
            io: Mutex::new(None),
            state: StateMutex::new(SessionState::Disconnected),
            closed,
        }
    }

    /// Creates a connected session over an already open transport.
    pub fn with_transport(config: ConnectionConfig, transport: impl Transport) -> Self {
        let (closed, _) = watch::channel(false);
        let io = SessionIo::new(Box::new(transport), config.read_buffer_size);
        Self {
            config,
            io: Mutex::new(Some(io)),
            state: StateMutex::new(SessionState::Connected),
            closed,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Opens the transport. Does not authenticate.
    ///
    /// Connecting an already connected session does nothing; a closed
    /// session cannot be reconnected.
    pub async fn connect(&self) -> Result<(), ClientError> {
        match self.state() {
            SessionState::Closed => return Err(ClientError::ConnectionClosed),
            SessionState::Connected | SessionState::Authenticated => return Ok(()),
            SessionState::Disconnected => {}
        }

        let mut io = self.io.lock().await;
        if io.is_some() {
            return Ok(());
        }

        let transport = transport::open(&self.config).await?;
        self.attach(&mut io, transport)?;

        tracing::info!("Connected to {}", self.config.server_address);
        Ok(())
    }

    /// Installs a freshly opened transport unless the session was closed
    /// while it was being opened.
    fn attach(
        &self,
        io: &mut Option<SessionIo>,
        transport: BoxedTransport,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if *state == SessionState::Closed {
            return Err(ClientError::ConnectionClosed);
        }
        *io = Some(SessionIo::new(transport, self.config.read_buffer_size));
        *state = SessionState::Connected;
        Ok(())
    }

    /// Logs in. On success the session becomes authenticated and the
    /// server's identity record is returned.
    ///
    /// Any failure, including rejected credentials, leaves the session
    /// connected but unauthenticated; a failed re-login drops an existing
    /// authentication.
    pub async fn login(&self, credentials: &Credentials) -> Result<IdentityInfo, ClientError> {
        let request = LoginUser {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            context: String::new(),
        };

        let result = match self.send(&request).await {
            Ok(payload) => IdentityInfo::from_bytes(&payload).map_err(ClientError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(identity) => {
                self.transition(SessionState::Authenticated);
                tracing::debug!("Logged in as user {}", identity.user_id);
                Ok(identity)
            }
            Err(e) => {
                self.transition(SessionState::Connected);
                tracing::debug!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// Logs out. The connection stays open.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send(&LogoutUser).await?;
        self.transition(SessionState::Connected);
        Ok(())
    }

    /// Encodes `request` and sends it, returning the raw success payload.
    pub async fn send<R: Request>(&self, request: &R) -> Result<Bytes, ClientError> {
        let payload = request.to_bytes()?;
        self.send_and_await(R::COMMAND, payload).await
    }

    /// Sends one command and waits for its response.
    ///
    /// Returns the response payload on success status and
    /// [`ClientError::Server`] otherwise. Transport failures, framing
    /// violations and timeouts close the session; server errors do not.
    /// A concurrent [`Session::close`] fails the pending call with
    /// [`ClientError::ConnectionClosed`].
    pub async fn send_and_await(
        &self,
        command: Command,
        payload: Bytes,
    ) -> Result<Bytes, ClientError> {
        let frame = RequestFrame::new(command, payload).encode()?;
        self.ensure_open()?;

        let mut closed = self.closed.subscribe();
        let mut guard = self.io.lock().await;
        if *closed.borrow_and_update() {
            return Err(ClientError::ConnectionClosed);
        }

        let Some(io) = guard.as_mut() else {
            return Err(match self.state() {
                SessionState::Disconnected => ClientError::NotConnected,
                _ => ClientError::ConnectionClosed,
            });
        };

        if io.in_flight {
            tracing::warn!("Previous request was abandoned mid-exchange, closing session");
            guard.take();
            self.mark_closed();
            return Err(ClientError::ConnectionClosed);
        }

        tracing::debug!("Sending {} ({} bytes)", command, frame.len());
        io.in_flight = true;
        let result = tokio::select! {
            result = tokio::time::timeout(self.config.request_timeout, io.exchange(&frame)) => {
                result.unwrap_or(Err(ClientError::Timeout))
            }
            _ = wait_closed(&mut closed) => Err(ClientError::ConnectionClosed),
        };
        io.in_flight = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_terminal() {
                    tracing::warn!("{} failed: {}, closing session", command, e);
                    // State first: the shutdown below may never complete.
                    self.mark_closed();
                    if let Some(mut io) = guard.take() {
                        let _ = io.transport.shutdown().await;
                    }
                }
                return Err(e);
            }
        };

        match response.error_code() {
            None => {
                tracing::debug!(
                    "{} succeeded ({} byte payload)",
                    command,
                    response.payload.len()
                );
                Ok(response.payload)
            }
            Some(code) => {
                tracing::debug!("{} failed with {}", command, code);
                Err(ClientError::Server(code))
            }
        }
    }

    /// Closes the session. Idempotent; pending and later calls fail with
    /// [`ClientError::ConnectionClosed`].
    pub async fn close(&self) -> Result<(), ClientError> {
        if self.state() == SessionState::Closed {
            return Ok(());
        }
        tracing::debug!("Closing session...");
        self.mark_closed();

        // An exchange holding the lock drops the transport itself once it
        // observes the close.
        if let Ok(mut io) = self.io.try_lock() {
            if let Some(mut io) = io.take() {
                let _ = io.transport.shutdown().await;
            }
        }

        tracing::debug!("Session closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        match self.state() {
            SessionState::Disconnected => Err(ClientError::NotConnected),
            SessionState::Closed => Err(ClientError::ConnectionClosed),
            SessionState::Connected | SessionState::Authenticated => Ok(()),
        }
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Moves between `Connected` and `Authenticated`; never leaves `Closed`.
    fn transition(&self, to: SessionState) {
        let mut state = self.state.lock();
        if matches!(
            *state,
            SessionState::Connected | SessionState::Authenticated
        ) {
            *state = to;
        }
    }

    fn mark_closed(&self) {
        self.set_state(SessionState::Closed);
        self.closed.send_replace(true);
    }
}

/// Resolves once the session is closed.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            // Sender dropped with the session; nothing can close it now.
            std::future::pending::<()>().await;
        }
    }
}
