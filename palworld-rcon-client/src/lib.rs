//! This crate provides a blocking RCON client for administering [Palworld] dedicated servers.
//!
//! A [`Client`] is created from an address and a password and connects lazily: nothing touches
//! the network until the first command is sent. If the server drops the connection between
//! commands (a restart, an idle timeout), the client reconnects and retries the command once.
//!
//! The wire protocol itself is supplied through the [`Dial`] and [`Connection`] traits. The
//! default `rcon` feature provides a ready-made transport backed by the
//! [`rcon`](https://docs.rs/rcon) crate, used by [`Client::new`].
//!
//! # Example
//! ```rust,no_run
//! use palworld_rcon_client::Client;
//!
//! fn main() -> palworld_rcon_client::Result<()> {
//!     let mut client = Client::new("localhost:25575", "password123")?;
//!
//!     let info = client.info()?;
//!     println!("{} running {}", info.name, info.version);
//!
//!     for player in client.show_players()? {
//!         println!("{} ({})", player.name, player.steam_id);
//!     }
//!
//!     client.broadcast("Saving...")?;
//!     client.save()?;
//!     client.close()
//! }
//! ```
//!
//! [Palworld]: https://tech.palworldgame.com/settings-and-operation/commands

mod client;
#[cfg(feature = "rcon")]
mod source;
mod response;
mod transport;

pub use self::client::Client;
#[cfg(feature = "rcon")]
pub use self::source::{RconConnection, RconDialer};
pub use self::response::{Player, ServerInfo};
pub use self::transport::{Connection, Dial, TransportError};

/// Error type for RCON operations.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(RconError);

#[derive(Debug, thiserror::Error)]
pub(crate) enum RconError {
    #[error("failed to connect: {0}")]
    Connect(#[source] TransportError),

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("failed to {action}: {response}")]
    UnexpectedResponse {
        action: &'static str,
        response: String,
    },

    #[error("failed to parse {what}: {fragment}")]
    Parse {
        what: &'static str,
        fragment: String,
    },
}

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Dialing or re-dialing the server failed.
    Connect,
    /// A command failed at the transport level and was not recovered by a retry.
    Transport,
    /// The server answered, but not with the expected success response.
    UnexpectedResponse,
    /// The response had the right shape but a field could not be decoded.
    Parse,
}

/// [`Result`] alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            RconError::Connect(_) => ErrorKind::Connect,
            RconError::Transport(_) => ErrorKind::Transport,
            RconError::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            RconError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// The literal server response, if this is an unexpected-response error.
    pub fn response(&self) -> Option<&str> {
        match &self.0 {
            RconError::UnexpectedResponse { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The underlying transport failure, for connect and transport errors.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match &self.0 {
            RconError::Connect(err) | RconError::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the error is a severed connection that survived the single retry.
    pub fn is_severed(&self) -> bool {
        self.transport_error().is_some_and(TransportError::is_severed)
    }
}

impl<T> From<T> for Error
where
    T: Into<RconError>,
{
    fn from(inner: T) -> Self {
        Error(inner.into())
    }
}
