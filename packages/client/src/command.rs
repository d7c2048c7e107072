//! Slash commands of the terminal client.

use thiserror::Error;

use crate::model::{GroupId, ModelError, UserId};

/// List whose display order can be saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedList {
    Status,
    Mood,
}

/// Parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(GroupId),
    Leave,
    Status { text: String, emoji: Option<String> },
    Mood { mood: String, text: Option<String> },
    Members,
    Show,
    Moods,
    Order { list: OrderedList, users: Vec<UserId> },
    Groups,
    Help,
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Commands start with '/'; type /help")]
    NotACommand,

    #[error("Unknown command '/{0}'; type /help")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid group: {0}")]
    InvalidGroup(#[from] ModelError),

    #[error("Invalid user: {0}")]
    InvalidUser(ModelError),

    #[error("/order takes 'status' or 'mood', got '{0}'")]
    UnknownList(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let Some(body) = line.strip_prefix('/') else {
            return Err(CommandError::NotACommand);
        };

        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "join" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("join"));
                }
                Ok(Command::Join(GroupId::new(rest)?))
            }
            "leave" => Ok(Command::Leave),
            "status" => parse_status(rest),
            "mood" => parse_mood(rest),
            "members" => Ok(Command::Members),
            "show" => Ok(Command::Show),
            "moods" => Ok(Command::Moods),
            "order" => parse_order(rest),
            "groups" => Ok(Command::Groups),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// `/status <text> [emoji]`: a trailing token without letters or digits is the emoji
fn parse_status(rest: &str) -> Result<Command, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument("status"));
    }

    if let Some((text, last)) = rest.rsplit_once(char::is_whitespace)
        && !last.chars().any(char::is_alphanumeric)
    {
        return Ok(Command::Status {
            text: text.trim().to_string(),
            emoji: Some(last.to_string()),
        });
    }

    Ok(Command::Status {
        text: rest.to_string(),
        emoji: None,
    })
}

/// `/mood <mood> [text]`
fn parse_mood(rest: &str) -> Result<Command, CommandError> {
    match rest.split_once(char::is_whitespace) {
        _ if rest.is_empty() => Err(CommandError::MissingArgument("mood")),
        Some((mood, text)) => Ok(Command::Mood {
            mood: mood.to_string(),
            text: Some(text.trim().to_string()),
        }),
        None => Ok(Command::Mood {
            mood: rest.to_string(),
            text: None,
        }),
    }
}

/// `/order status|mood <user>...`: an empty user list resets the order
fn parse_order(rest: &str) -> Result<Command, CommandError> {
    let mut words = rest.split_whitespace();
    let list = match words.next() {
        None => return Err(CommandError::MissingArgument("order")),
        Some(word) => match word.to_ascii_lowercase().as_str() {
            "status" | "statuses" => OrderedList::Status,
            "mood" | "moods" => OrderedList::Mood,
            _ => return Err(CommandError::UnknownList(word.to_string())),
        },
    };

    let users = words
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(CommandError::InvalidUser)?;

    Ok(Command::Order { list, users })
}
