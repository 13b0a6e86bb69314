use crate::{Connection, Dial, TransportError};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

/// Blocking [`Dial`] implementation backed by the `rcon` crate.
///
/// Each dialer owns a current-thread Tokio runtime which its connections share.
#[derive(Debug, Clone)]
pub struct RconDialer {
    runtime: Arc<Runtime>,
}

/// A connection opened by [`RconDialer`].
pub struct RconConnection {
    runtime: Arc<Runtime>,
    conn: rcon::Connection<TcpStream>,
}

impl RconDialer {
    /// Creates a dialer with its own runtime. No connection is made here.
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        Ok(RconDialer {
            runtime: Arc::new(runtime),
        })
    }
}

impl Dial for RconDialer {
    type Connection = RconConnection;

    fn dial(&self, address: &str, password: &str) -> Result<RconConnection, TransportError> {
        let conn = self
            .runtime
            .block_on(
                rcon::Connection::<TcpStream>::builder()
                    // One reply packet per command, without the empty end-of-reply marker
                    .enable_factorio_quirks(true)
                    .connect(address, password),
            )
            .map_err(map_rcon_error)?;

        Ok(RconConnection {
            runtime: self.runtime.clone(),
            conn,
        })
    }
}

impl Connection for RconConnection {
    fn execute(&mut self, command: &str) -> Result<String, TransportError> {
        self.runtime
            .block_on(self.conn.cmd(command))
            .map_err(map_rcon_error)
    }

    fn close(self) -> Result<(), TransportError> {
        // Dropping the stream closes the socket
        drop(self.conn);
        Ok(())
    }
}

impl std::fmt::Debug for RconConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconConnection").finish_non_exhaustive()
    }
}

fn map_rcon_error(err: rcon::Error) -> TransportError {
    match err {
        rcon::Error::Io(err) => TransportError::Io(err),
        rcon::Error::Auth => TransportError::Auth,
        err @ rcon::Error::CommandTooLong => TransportError::Protocol(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Client, ErrorKind};
    use std::io::{Read, Write};
    use std::net::{Shutdown, TcpListener};
    use std::sync::mpsc;
    use std::thread;

    const AUTH: i32 = 3;
    const AUTH_RESPONSE: i32 = 2;
    const EXEC_COMMAND: i32 = 2;
    const RESPONSE_VALUE: i32 = 0;

    fn read_packet(stream: &mut std::net::TcpStream) -> io::Result<(i32, i32, String)> {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len)?;
        let mut buf = vec![0u8; i32::from_le_bytes(len) as usize];
        stream.read_exact(&mut buf)?;

        let id = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let kind = i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let body = String::from_utf8_lossy(&buf[8..buf.len() - 2]).into_owned();
        Ok((id, kind, body))
    }

    fn write_packet(
        stream: &mut std::net::TcpStream,
        id: i32,
        kind: i32,
        body: &str,
    ) -> io::Result<()> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(body.len() as i32 + 10).to_le_bytes());
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        buf.extend_from_slice(body.as_bytes());
        buf.extend_from_slice(&[0, 0]);
        stream.write_all(&buf)
    }

    /// Accepts one client and answers its login. Wrong passwords get the `-1` id.
    fn accept(listener: &TcpListener, password: &str) -> std::net::TcpStream {
        let (mut stream, _) = listener.accept().unwrap();
        let (id, kind, body) = read_packet(&mut stream).unwrap();
        assert_eq!(kind, AUTH);

        let reply_id = if body == password { id } else { -1 };
        write_packet(&mut stream, reply_id, AUTH_RESPONSE, "").unwrap();
        stream
    }

    fn answer(stream: &mut std::net::TcpStream, command: &str, response: &str) {
        let (id, kind, body) = read_packet(stream).unwrap();
        assert_eq!(kind, EXEC_COMMAND);
        assert_eq!(body, command);
        write_packet(stream, id, RESPONSE_VALUE, response).unwrap();
    }

    fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, address)
    }

    #[test]
    fn dial_refused_is_not_severed() {
        let (listener, address) = listen();
        drop(listener);

        let dialer = RconDialer::new().unwrap();
        let err = dialer.dial(&address, "secret").unwrap_err();
        assert!(!err.is_severed());
    }

    #[test]
    fn wrong_password_is_a_connect_error() {
        let (listener, address) = listen();
        let server = thread::spawn(move || {
            accept(&listener, "secret");
        });

        let mut client = Client::new(address, "wrong").unwrap();
        let err = client.save().unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind(), ErrorKind::Connect);
        assert!(matches!(err.transport_error(), Some(TransportError::Auth)));
        assert!(!client.is_connected());
    }

    #[test]
    fn single_reply_packet_completes_the_command() {
        let (listener, address) = listen();
        let server = thread::spawn(move || {
            let mut stream = accept(&listener, "secret");
            answer(&mut stream, "DoExit", "Shutdown...\n");
            // The server is gone right after answering
            stream.shutdown(Shutdown::Both).unwrap();
        });

        let mut client = Client::new(address, "secret").unwrap();
        client.do_exit().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn server_restart_between_commands_redials_once() {
        let (listener, address) = listen();
        let (closed_tx, closed_rx) = mpsc::channel();
        let server = thread::spawn(move || {
            let mut stream = accept(&listener, "secret");
            answer(&mut stream, "Save", "Complete Save");
            stream.shutdown(Shutdown::Both).unwrap();
            drop(stream);
            closed_tx.send(()).unwrap();

            let mut stream = accept(&listener, "secret");
            answer(&mut stream, "Save", "Complete Save");
            stream
        });

        let mut client = Client::new(address, "secret").unwrap();
        client.save().unwrap();
        closed_rx.recv().unwrap();

        client.save().unwrap();
        let stream = server.join().unwrap();
        drop(stream);

        client.close().unwrap();
        assert!(!client.is_connected());
    }
}
