//! Line protocol spoken by the host process.
//!
//! The binary reads one command per line on stdin. This stands in for the
//! platform hooks a real app would wire up (URI handler, lifecycle listener,
//! checkout button, login screen).
//!
//! # Commands
//!
//! - `link <uri>` - a deep link was received
//! - `state active|inactive|background` - the app state changed
//! - `checkout <order_id>` - a checkout session is starting
//! - `login <token>` / `logout` - the bearer token changed
//! - `quit`
//!
//! Command names are case-insensitive. Blank lines and `#` comments are
//! skipped.

use thiserror::Error;

use crate::lifecycle::AppState;
use crate::types::{AuthToken, OrderId};

/// One parsed host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Link(String),
    State(AppState),
    Checkout(OrderId),
    Login(AuthToken),
    Logout,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostCommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("{command} needs an argument")]
    MissingArgument { command: &'static str },

    #[error("unknown app state {0:?}")]
    UnknownState(String),
}

/// Parses one input line. Returns `Ok(None)` for blank and comment lines.
///
/// ```
/// use payment_reconciler::host::{HostCommand, parse_host_command};
/// use payment_reconciler::lifecycle::AppState;
///
/// assert_eq!(
///     parse_host_command("state background").unwrap(),
///     Some(HostCommand::State(AppState::Background))
/// );
/// assert_eq!(parse_host_command("  ").unwrap(), None);
/// assert!(parse_host_command("dance").is_err());
/// ```
pub fn parse_host_command(line: &str) -> Result<Option<HostCommand>, HostCommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let arg = |command: &'static str| {
        if rest.is_empty() {
            Err(HostCommandError::MissingArgument { command })
        } else {
            Ok(rest)
        }
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "link" => HostCommand::Link(arg("link")?.to_string()),
        "state" => {
            let state = arg("state")?;
            HostCommand::State(
                AppState::parse(state)
                    .ok_or_else(|| HostCommandError::UnknownState(state.to_string()))?,
            )
        }
        "checkout" => {
            // OrderId::parse only rejects blank input, which `arg` already did.
            let id = OrderId::parse(arg("checkout")?)
                .ok_or(HostCommandError::MissingArgument { command: "checkout" })?;
            HostCommand::Checkout(id)
        }
        "login" => HostCommand::Login(AuthToken::new(arg("login")?)),
        "logout" => HostCommand::Logout,
        "quit" | "exit" => HostCommand::Quit,
        _ => return Err(HostCommandError::Unknown(name.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_command() {
        assert_eq!(
            parse_host_command("link myapp://checkout/success?orderId=1").unwrap(),
            Some(HostCommand::Link(
                "myapp://checkout/success?orderId=1".to_string()
            ))
        );
        assert_eq!(
            parse_host_command("checkout order42").unwrap(),
            Some(HostCommand::Checkout(OrderId::new("order42")))
        );
        assert_eq!(
            parse_host_command("login abc").unwrap(),
            Some(HostCommand::Login(AuthToken::new("abc")))
        );
        assert_eq!(
            parse_host_command("logout").unwrap(),
            Some(HostCommand::Logout)
        );
        assert_eq!(parse_host_command("QUIT").unwrap(), Some(HostCommand::Quit));
    }

    #[test]
    fn whitespace_is_flexible() {
        assert_eq!(
            parse_host_command("\tstate\t  Active  ").unwrap(),
            Some(HostCommand::State(AppState::Active))
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_host_command("").unwrap(), None);
        assert_eq!(parse_host_command("# returning from checkout").unwrap(), None);
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(
            parse_host_command("link").unwrap_err(),
            HostCommandError::MissingArgument { command: "link" }
        );
        assert_eq!(
            parse_host_command("state asleep").unwrap_err(),
            HostCommandError::UnknownState("asleep".to_string())
        );
        assert_eq!(
            parse_host_command("pay now").unwrap_err(),
            HostCommandError::Unknown("pay".to_string())
        );
    }
}
