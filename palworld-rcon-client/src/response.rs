//! Decoding of trimmed command responses.

use crate::RconError;
use regex::Regex;
use std::sync::LazyLock;

static INFO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Welcome to Pal Server\[v([\d.]+)\]\s*(.*?)$").expect("info pattern is valid")
});

const PLAYER_COLUMNS: usize = 3;

/// Server details returned by [`Client::info`](crate::Client::info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// A player currently online, as listed by [`Client::show_players`](crate::Client::show_players).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub player_uid: u64,
    pub steam_id: u64,
}

/// Succeeds if `response` starts with `prefix`.
pub(crate) fn expect_prefix(
    response: &str,
    prefix: &str,
    action: &'static str,
) -> crate::Result<()> {
    if response.starts_with(prefix) {
        Ok(())
    } else {
        Err(unexpected(response, action))
    }
}

/// Succeeds if `response` is exactly `expected`.
pub(crate) fn expect_exact(
    response: &str,
    expected: &str,
    action: &'static str,
) -> crate::Result<()> {
    if response == expected {
        Ok(())
    } else {
        Err(unexpected(response, action))
    }
}

pub(crate) fn parse_info(response: &str) -> crate::Result<ServerInfo> {
    let captures = INFO_REGEX
        .captures(response)
        .ok_or_else(|| parse_error("Info output", response))?;

    Ok(ServerInfo {
        name: captures[2].to_string(),
        version: captures[1].to_string(),
    })
}

/// Parses the comma separated `ShowPlayers` table. The first row is a header and is skipped.
pub(crate) fn parse_players(response: &str) -> crate::Result<Vec<Player>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(response.as_bytes());

    let mut players = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| parse_error("ShowPlayers response", err))?;
        if record.len() != PLAYER_COLUMNS {
            let fields: Vec<&str> = record.iter().collect();
            return Err(parse_error("player record", fields.join(",")));
        }

        players.push(Player {
            name: record[0].to_string(),
            player_uid: parse_id("player UID", &record[1])?,
            steam_id: parse_id("steam ID", &record[2])?,
        });
    }

    Ok(players)
}

fn parse_id(what: &'static str, field: &str) -> crate::Result<u64> {
    field.parse().map_err(|_| parse_error(what, field))
}

fn unexpected(response: &str, action: &'static str) -> crate::Error {
    RconError::UnexpectedResponse {
        action,
        response: response.to_string(),
    }
    .into()
}

fn parse_error(what: &'static str, fragment: impl ToString) -> crate::Error {
    RconError::Parse {
        what,
        fragment: fragment.to_string(),
    }
    .into()
}
