use crate::response::{expect_exact, expect_prefix, parse_info, parse_players};
use crate::{Connection, Dial, Player, RconError, ServerInfo};

/// A Palworld RCON client.
///
/// The client owns at most one connection. It is opened on the first command, and re-opened if
/// the server drops it between commands. Commands take `&mut self`, so sharing a client between
/// threads needs external locking.
///
/// Available commands are documented at
/// <https://tech.palworldgame.com/settings-and-operation/commands#command-list>.
pub struct Client<D: Dial> {
    dialer: D,
    address: String,
    password: String,
    connection: Option<D::Connection>,
}

#[cfg(feature = "rcon")]
impl Client<crate::RconDialer> {
    /// Creates a client using the bundled [`RconDialer`](crate::RconDialer) transport.
    ///
    /// This does not connect to the server, so the password is not checked until the first
    /// command is sent.
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> crate::Result<Self> {
        let dialer = crate::RconDialer::new().map_err(|err| RconError::Connect(err.into()))?;
        Ok(Self::with_dialer(dialer, address, password))
    }
}

impl<D: Dial> Client<D> {
    /// Creates a client that opens its connections through `dialer`. No connection is made here.
    pub fn with_dialer(dialer: D, address: impl Into<String>, password: impl Into<String>) -> Self {
        Client {
            dialer,
            address: address.into(),
            password: password.into(),
            connection: None,
        }
    }

    /// The server address commands are sent to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a connection is currently held. It may still turn out to be dead.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens a fresh connection, closing the current one first if there is one.
    ///
    /// Commands connect on demand, so calling this is only needed to check the address and
    /// password up front.
    pub fn connect(&mut self) -> crate::Result<()> {
        self.reconnect().map(|_| ())
    }

    /// Closes the connection to the server. Calling any command afterwards reopens it.
    ///
    /// Closing a client that is not connected does nothing.
    pub fn close(&mut self) -> crate::Result<()> {
        match self.connection.take() {
            Some(connection) => connection
                .close()
                .map_err(|err| RconError::Transport(err).into()),
            None => Ok(()),
        }
    }

    fn reconnect(&mut self) -> crate::Result<&mut D::Connection> {
        if let Some(old) = self.connection.take() {
            if let Err(err) = old.close() {
                log::debug!("Ignoring error closing previous connection: {}", err);
            }
        }

        log::debug!("Connecting to {}", self.address);
        let connection = self
            .dialer
            .dial(&self.address, &self.password)
            .map_err(RconError::Connect)?;

        Ok(self.connection.insert(connection))
    }

    /// Sends `command` and returns the trimmed response.
    ///
    /// A command that fails because the connection was severed is retried once on a new
    /// connection. Every other failure, and any failure of the retry, is returned as is.
    fn execute(&mut self, command: &str) -> crate::Result<String> {
        let mut may_retry = true;

        loop {
            let connection = match self.connection.take() {
                Some(connection) => self.connection.insert(connection),
                None => self.reconnect()?,
            };

            match connection.execute(command) {
                Ok(response) => return Ok(response.trim().to_string()),
                Err(err) if may_retry && err.is_severed() => {
                    log::debug!("Connection to {} severed ({}), reconnecting", self.address, err);
                    may_retry = false;
                    self.reconnect()?;
                }
                Err(err) => return Err(RconError::Transport(err).into()),
            }
        }
    }

    /// Bans the player with the given Steam ID. The player must be online.
    pub fn ban_player(&mut self, steam_id: u64) -> crate::Result<()> {
        let response = self.execute(&format!("BanPlayer {}", steam_id))?;
        // sic, the server spells it this way
        expect_prefix(&response, "Baned: ", "ban player")
    }

    /// Displays `message` to all online players.
    pub fn broadcast(&mut self, message: &str) -> crate::Result<()> {
        let response = self.execute(&format!("Broadcast {}", message))?;
        expect_prefix(&response, "Broadcasted: ", "broadcast")
    }

    /// Makes the server exit immediately.
    pub fn do_exit(&mut self) -> crate::Result<()> {
        let response = self.execute("DoExit")?;
        expect_exact(&response, "Shutdown...", "shut down")
    }

    /// Queries the server name and version.
    pub fn info(&mut self) -> crate::Result<ServerInfo> {
        let response = self.execute("Info")?;
        parse_info(&response)
    }

    /// Kicks the player with the given Steam ID.
    pub fn kick_player(&mut self, steam_id: u64) -> crate::Result<()> {
        let response = self.execute(&format!("KickPlayer {}", steam_id))?;
        expect_prefix(&response, "Kicked: ", "kick player")
    }

    /// Saves the world to disk.
    pub fn save(&mut self) -> crate::Result<()> {
        let response = self.execute("Save")?;
        expect_exact(&response, "Complete Save", "save")
    }

    /// Lists the players that are currently online.
    pub fn show_players(&mut self) -> crate::Result<Vec<Player>> {
        let response = self.execute("ShowPlayers")?;
        parse_players(&response)
    }

    /// Shuts the server down after `seconds`.
    pub fn shutdown(&mut self, seconds: u32) -> crate::Result<()> {
        self.timed_shutdown(&format!("Shutdown {}", seconds))
    }

    /// Shuts the server down after `seconds`, showing `message` to all online players.
    pub fn shutdown_with_message(&mut self, seconds: u32, message: &str) -> crate::Result<()> {
        self.timed_shutdown(&format!("Shutdown {} {}", seconds, message))
    }

    fn timed_shutdown(&mut self, command: &str) -> crate::Result<()> {
        let response = self.execute(command)?;
        expect_prefix(&response, "The server will shut down", "shut down")
    }
}

impl<D> std::fmt::Debug for Client<D>
where
    D: Dial,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
