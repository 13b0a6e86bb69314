use std::io;

/// Establishes authenticated RCON sessions.
///
/// This is the seam between the [`Client`](crate::Client) and whatever speaks the RCON wire
/// protocol. Closures of the form `Fn(&str, &str) -> Result<C, TransportError>` implement it.
pub trait Dial {
    type Connection: Connection;

    /// Open a connection to `address` and authenticate with `password`.
    fn dial(&self, address: &str, password: &str) -> Result<Self::Connection, TransportError>;
}

/// A live, authenticated RCON session.
pub trait Connection {
    /// Send one command and wait for the full textual reply.
    fn execute(&mut self, command: &str) -> Result<String, TransportError>;

    /// Release the session.
    fn close(self) -> Result<(), TransportError>;
}

/// Failure reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("authentication rejected")]
    Auth,

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the socket behind the session is gone: the stream ended or the pipe broke.
    pub fn is_severed(&self) -> bool {
        match self {
            TransportError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl<F, C> Dial for F
where
    F: Fn(&str, &str) -> Result<C, TransportError>,
    C: Connection,
{
    type Connection = C;

    fn dial(&self, address: &str, password: &str) -> Result<C, TransportError> {
        self(address, password)
    }
}
