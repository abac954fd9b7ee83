// Line protocol: request tokenizing and response encoding - pure data, no I/O
use std::fmt;
use thiserror::Error;

pub const STATUS_OK: &str = "OK";
pub const STATUS_FAILED: &str = "FAILED";

/// Malformed or rejected request. Always local to one request line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,

    #[error("unknown command '{verb}' with {arity} argument(s)")]
    UnknownCommand { verb: String, arity: usize },

    #[error("invalid argument '{value}' for '{verb}'")]
    InvalidArgument { verb: &'static str, value: String },

    #[error("invalid client id '{0}'")]
    InvalidClientId(String),
}

/// Split a request line into verb and arguments on runs of whitespace.
/// No quoting or escaping.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

// One response line as it travels server -> client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok(Option<String>),
    Failed,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Response::Ok(Some(output)) => Some(output),
            _ => None,
        }
    }

    /// Wire form including the terminating newline
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }

    /// Decode one response line (with or without its newline)
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        if line == STATUS_FAILED {
            return Some(Response::Failed);
        }
        if line == STATUS_OK {
            return Some(Response::Ok(None));
        }
        line.strip_prefix(STATUS_OK)
            .and_then(|rest| rest.strip_prefix(' '))
            .filter(|output| !output.is_empty())
            .map(|output| Response::Ok(Some(output.to_string())))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Response::Ok(None) => f.write_str(STATUS_OK),
            Response::Ok(Some(output)) if output.is_empty() => f.write_str(STATUS_OK),
            Response::Ok(Some(output)) => write!(f, "{} {}", STATUS_OK, output),
            Response::Failed => f.write_str(STATUS_FAILED),
        }
    }
}

impl From<Result<Option<String>, ProtocolError>> for Response {
    fn from(result: Result<Option<String>, ProtocolError>) -> Self {
        match result {
            Ok(output) => Response::Ok(output),
            Err(_) => Response::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("set-led-rate   3"), vec!["set-led-rate", "3"]);
        assert_eq!(tokenize("\tget-led-rate \r"), vec!["get-led-rate"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_encode() {
        assert_eq!(Response::Ok(None).encode(), "OK\n");
        assert_eq!(Response::Ok(Some("blue".into())).encode(), "OK blue\n");
        assert_eq!(Response::Ok(Some(String::new())).encode(), "OK\n");
        assert_eq!(Response::Failed.encode(), "FAILED\n");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Response::parse("OK\n"), Some(Response::Ok(None)));
        assert_eq!(Response::parse("OK 3"), Some(Response::Ok(Some("3".into()))));
        assert_eq!(Response::parse("FAILED\n"), Some(Response::Failed));
        assert_eq!(Response::parse("OKAY"), None);
        assert_eq!(Response::parse("OK "), None);
        assert_eq!(Response::parse(""), None);
    }

    #[test]
    fn test_from_dispatch_result() {
        let ok: Response = Ok(Some("on".to_string())).into();
        assert_eq!(ok.output(), Some("on"));

        let failed: Response = Err(ProtocolError::Empty).into();
        assert_eq!(failed, Response::Failed);
        assert!(!failed.is_ok());
    }
}
