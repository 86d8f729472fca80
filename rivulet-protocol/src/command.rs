//! Command codes carried in the header of every request frame.

use crate::error::ProtocolError;
use std::fmt;

/// Commands supported by this client.
///
/// The discriminants are the server's command codes and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    // Session
    Ping = 1,
    LoginUser = 38,
    LogoutUser = 39,

    // Messages
    PollMessages = 100,
    SendMessages = 101,

    // Streams
    GetStream = 200,
    GetStreams = 201,
    CreateStream = 202,
    DeleteStream = 203,
    UpdateStream = 204,
    PurgeStream = 205,

    // Topics
    GetTopic = 300,
    GetTopics = 301,
    CreateTopic = 302,
    DeleteTopic = 303,
    UpdateTopic = 304,
    PurgeTopic = 305,
}

impl Command {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Result<Self, ProtocolError> {
        let command = match code {
            1 => Command::Ping,
            38 => Command::LoginUser,
            39 => Command::LogoutUser,
            100 => Command::PollMessages,
            101 => Command::SendMessages,
            200 => Command::GetStream,
            201 => Command::GetStreams,
            202 => Command::CreateStream,
            203 => Command::DeleteStream,
            204 => Command::UpdateStream,
            205 => Command::PurgeStream,
            300 => Command::GetTopic,
            301 => Command::GetTopics,
            302 => Command::CreateTopic,
            303 => Command::DeleteTopic,
            304 => Command::UpdateTopic,
            305 => Command::PurgeTopic,
            other => return Err(ProtocolError::UnknownCommand(other)),
        };
        Ok(command)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::LoginUser => "user.login",
            Command::LogoutUser => "user.logout",
            Command::PollMessages => "message.poll",
            Command::SendMessages => "message.send",
            Command::GetStream => "stream.get",
            Command::GetStreams => "stream.list",
            Command::CreateStream => "stream.create",
            Command::DeleteStream => "stream.delete",
            Command::UpdateStream => "stream.update",
            Command::PurgeStream => "stream.purge",
            Command::GetTopic => "topic.get",
            Command::GetTopics => "topic.list",
            Command::CreateTopic => "topic.create",
            Command::DeleteTopic => "topic.delete",
            Command::UpdateTopic => "topic.update",
            Command::PurgeTopic => "topic.purge",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}
