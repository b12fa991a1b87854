//! GCM wire types.

use crate::error::GcmError;
use serde_json::{Map, Value};

/// Raw inbound push as delivered by the transport: the intent extras.
pub type Delivery = Map<String, Value>;

/// Outcome of a `register3` call, parsed from its `key=value` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Token(String),
    Error(String),
}

impl RegisterOutcome {
    /// Parse the plain-text body returned by the token issuer.
    ///
    /// The body carries either `token=<value>` or `Error=<CODE>`; any other
    /// lines are ignored.
    pub fn parse(body: &str) -> Result<Self, GcmError> {
        for line in body.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };

            match key {
                "token" if !value.is_empty() => return Ok(Self::Token(value.to_string())),
                "Error" => return Ok(Self::Error(value.to_string())),
                _ => {}
            }
        }

        Err(GcmError::MalformedResponse(
            body.chars().take(100).collect::<String>(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(
            RegisterOutcome::parse("token=APA91bH").unwrap(),
            RegisterOutcome::Token("APA91bH".into())
        );
    }

    #[test]
    fn test_parse_token_with_equals_in_value() {
        assert_eq!(
            RegisterOutcome::parse("token=abc:def=ghi\n").unwrap(),
            RegisterOutcome::Token("abc:def=ghi".into())
        );
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            RegisterOutcome::parse("Error=PHONE_REGISTRATION_ERROR").unwrap(),
            RegisterOutcome::Error("PHONE_REGISTRATION_ERROR".into())
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            RegisterOutcome::parse("<html>oops</html>"),
            Err(GcmError::MalformedResponse(_))
        ));
        assert!(RegisterOutcome::parse("token=").is_err());
    }
}
