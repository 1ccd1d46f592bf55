//! Parsing of terminal input lines.

use thiserror::Error;

/// A chat line addressed to another client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Receiver identifier.
    pub receiver: String,
    /// Message text.
    pub text: String,
}

/// Rejected input line. Nothing is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The line does not start with `to:<id> `.
    #[error(
        "Recipient ID not provided. Please include recipient ID in the message 'to:<id> <message>'."
    )]
    MissingRecipient,
}

/// Parses a line of the form `to:<receiverId> <message text>`.
///
/// # Errors
/// Returns `InputError::MissingRecipient` if the prefix is absent, the
/// receiver is empty, or no space separates it from the text.
pub fn parse_input(line: &str) -> Result<Outgoing, InputError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (head, text) = line.split_once(' ').ok_or(InputError::MissingRecipient)?;
    let receiver = head
        .strip_prefix("to:")
        .filter(|receiver| !receiver.is_empty())
        .ok_or(InputError::MissingRecipient)?;

    Ok(Outgoing {
        receiver: receiver.to_string(),
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addressed_line() {
        let out = parse_input("to:B hello there").unwrap();
        assert_eq!(out.receiver, "B");
        assert_eq!(out.text, "hello there");
    }

    #[test]
    fn test_parse_strips_line_ending() {
        let out = parse_input("to:bob hi\r\n").unwrap();
        assert_eq!(out.receiver, "bob");
        assert_eq!(out.text, "hi");
    }

    #[test]
    fn test_parse_keeps_empty_text() {
        let out = parse_input("to:bob ").unwrap();
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert_eq!(parse_input("hello bob"), Err(InputError::MissingRecipient));
        assert_eq!(parse_input("bob: hello"), Err(InputError::MissingRecipient));
    }

    #[test]
    fn test_parse_rejects_prefix_without_text() {
        assert_eq!(parse_input("to:bob"), Err(InputError::MissingRecipient));
    }

    #[test]
    fn test_parse_rejects_empty_receiver() {
        assert_eq!(parse_input("to: hello"), Err(InputError::MissingRecipient));
    }
}
