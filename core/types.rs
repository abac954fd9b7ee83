// Core types shared by the server, transport and client
use crate::protocol::ProtocolError;
use std::fmt;
use std::str::FromStr;

pub const RATE_MIN: u8 = 1;
pub const RATE_MAX: u8 = 5;

// LED color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LedColor {
    #[default]
    Red,
    Green,
    Blue,
}

impl LedColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedColor::Red => "red",
            LedColor::Green => "green",
            LedColor::Blue => "blue",
        }
    }

    /// Case-insensitive match against the color names
    pub fn parse_ignore_case(s: &str) -> Option<Self> {
        [LedColor::Red, LedColor::Green, LedColor::Blue]
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Complete LED state: on/off, color and blink rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedState {
    pub on: bool,
    pub color: LedColor,
    pub rate: u8,
}

impl Default for LedState {
    fn default() -> Self {
        LedState {
            on: false,
            color: LedColor::Red,
            rate: RATE_MIN,
        }
    }
}

impl LedState {
    pub fn state_str(&self) -> &'static str {
        if self.on {
            "on"
        } else {
            "off"
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{ {}, {}, {} }}", self.state_str(), self.color, self.rate)
    }
}

/// Identifier a client announces on the control channel (its process id).
///
/// Parsing is strict: ASCII digits only, no sign or padding, non-zero and
/// within `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u32);

impl ClientId {
    pub fn new(id: u32) -> Option<Self> {
        (id != 0).then_some(ClientId(id))
    }

    /// Id of the calling process
    pub fn current() -> Self {
        ClientId(std::process::id())
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl FromStr for ClientId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidClientId(s.to_string());

        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let id: u32 = s.parse().map_err(|_| invalid())?;
        ClientId::new(id).ok_or_else(invalid)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let led = LedState::default();
        assert!(!led.on);
        assert_eq!(led.color, LedColor::Red);
        assert_eq!(led.rate, 1);
        assert_eq!(led.to_string(), "{ off, red, 1 }");
    }

    #[test]
    fn test_color_parse_ignores_case() {
        assert_eq!(LedColor::parse_ignore_case("RED"), Some(LedColor::Red));
        assert_eq!(LedColor::parse_ignore_case("Green"), Some(LedColor::Green));
        assert_eq!(LedColor::parse_ignore_case("blue"), Some(LedColor::Blue));
        assert_eq!(LedColor::parse_ignore_case("purple"), None);
        assert_eq!(LedColor::parse_ignore_case(""), None);
    }

    #[test]
    fn test_client_id_accepts_plain_digits() {
        let id: ClientId = "4242".parse().unwrap();
        assert_eq!(id.get(), 4242);
        assert_eq!(id.to_string(), "4242");
    }

    #[test]
    fn test_client_id_rejects_garbage() {
        for bad in ["", "0", "-12", "+12", " 12", "12 ", "12a", "abc", "4294967296"] {
            assert!(
                bad.parse::<ClientId>().is_err(),
                "{:?} should not parse as a client id",
                bad
            );
        }
    }
}
