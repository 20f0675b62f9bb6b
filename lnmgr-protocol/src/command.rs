//! Line parser for the control protocol (spec.md §4.9). A line is whitespace
//! separated; the first token is the verb.

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Hello,
    Status(Option<String>),
    Dump,
    Save,
    Signal { node: String, signal: String, value: bool },
    Subscribe,
}

pub fn parse_line(line: &str) -> Result<Command, ProtocolError> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or(ProtocolError::Empty)?;

    match verb.to_ascii_uppercase().as_str() {
        "HELLO" => Ok(Command::Hello),
        "STATUS" => Ok(Command::Status(parts.next().map(str::to_string))),
        "DUMP" => Ok(Command::Dump),
        "SAVE" => Ok(Command::Save),
        "SUBSCRIBE" => Ok(Command::Subscribe),
        "SIGNAL" => {
            let node = parts.next().ok_or(ProtocolError::BadArguments("SIGNAL"))?;
            let signal = parts.next().ok_or(ProtocolError::BadArguments("SIGNAL"))?;
            let raw = parts.next().ok_or(ProtocolError::BadArguments("SIGNAL"))?;
            let value = match raw {
                "1" => true,
                "0" => false,
                other => return Err(ProtocolError::BadSignalValue(other.to_string())),
            };
            Ok(Command::Signal {
                node: node.to_string(),
                signal: signal.to_string(),
                value,
            })
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_with_and_without_id() {
        assert_eq!(parse_line("STATUS").unwrap(), Command::Status(None));
        assert_eq!(
            parse_line("STATUS eth0").unwrap(),
            Command::Status(Some("eth0".to_string()))
        );
    }

    #[test]
    fn parses_signal() {
        assert_eq!(
            parse_line("SIGNAL eth0 carrier 1").unwrap(),
            Command::Signal {
                node: "eth0".to_string(),
                signal: "carrier".to_string(),
                value: true,
            }
        );
    }

    #[test]
    fn rejects_bad_signal_value() {
        assert!(parse_line("SIGNAL eth0 carrier maybe").is_err());
    }

    #[test]
    fn is_case_insensitive_on_verb() {
        assert_eq!(parse_line("hello").unwrap(), Command::Hello);
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(parse_line("FROBNICATE").is_err());
    }

    #[test]
    fn rejects_empty_line() {
        assert!(parse_line("   ").is_err());
    }
}
