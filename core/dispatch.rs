// Command table and dispatcher
//
// Every supported request is known at compile time, so the table is a static
// list of tagged variants. Handlers work on a copy of the LED state; the
// dispatcher commits the copy (and notifies the view) only when the handler
// succeeded and something actually changed.
use crate::protocol::{tokenize, ProtocolError};
use crate::types::{LedColor, LedState, RATE_MAX, RATE_MIN};
use crate::view::LedView;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetState,
    GetState,
    SetColor,
    GetColor,
    SetRate,
    GetRate,
}

/// All supported commands. Add new commands here.
pub static COMMANDS: [Command; 6] = [
    Command::SetState,
    Command::GetState,
    Command::SetColor,
    Command::GetColor,
    Command::SetRate,
    Command::GetRate,
];

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::SetState => "set-led-state",
            Command::GetState => "get-led-state",
            Command::SetColor => "set-led-color",
            Command::GetColor => "get-led-color",
            Command::SetRate => "set-led-rate",
            Command::GetRate => "get-led-rate",
        }
    }

    /// Number of arguments after the verb
    pub fn arity(&self) -> usize {
        match self {
            Command::SetState | Command::SetColor | Command::SetRate => 1,
            Command::GetState | Command::GetColor | Command::GetRate => 0,
        }
    }

    /// Exact (case-sensitive) verb match plus arity match
    pub fn lookup(verb: &str, arity: usize) -> Option<Command> {
        COMMANDS
            .iter()
            .copied()
            .find(|c| c.verb() == verb && c.arity() == arity)
    }

    /// Run the handler against `led`. `args` excludes the verb and has
    /// exactly `arity()` elements.
    pub fn handle(&self, args: &[&str], led: &mut LedState) -> Result<Option<String>, ProtocolError> {
        debug_assert_eq!(args.len(), self.arity());

        match self {
            Command::SetState => {
                let arg = args[0];
                if arg.eq_ignore_ascii_case("on") {
                    led.on = true;
                } else if arg.eq_ignore_ascii_case("off") {
                    led.on = false;
                } else {
                    return Err(self.invalid(arg));
                }
                Ok(None)
            }
            Command::GetState => Ok(Some(led.state_str().to_string())),
            Command::SetColor => {
                led.color = LedColor::parse_ignore_case(args[0]).ok_or_else(|| self.invalid(args[0]))?;
                Ok(None)
            }
            Command::GetColor => Ok(Some(led.color.to_string())),
            Command::SetRate => {
                let rate: i64 = args[0].parse().map_err(|_| self.invalid(args[0]))?;
                if rate < i64::from(RATE_MIN) || rate > i64::from(RATE_MAX) {
                    return Err(self.invalid(args[0]));
                }
                led.rate = rate as u8;
                Ok(None)
            }
            Command::GetRate => Ok(Some(led.rate.to_string())),
        }
    }

    fn invalid(&self, value: &str) -> ProtocolError {
        ProtocolError::InvalidArgument {
            verb: self.verb(),
            value: value.to_string(),
        }
    }
}

/// Owns the authoritative LED state and the view it is mirrored to.
pub struct Dispatcher<V: LedView = Box<dyn LedView>> {
    state: LedState,
    view: V,
}

impl<V: LedView> Dispatcher<V> {
    pub fn new(view: V) -> Self {
        Self::with_state(view, LedState::default())
    }

    pub fn with_state(view: V, state: LedState) -> Self {
        Dispatcher { state, view }
    }

    pub fn state(&self) -> &LedState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Push the current state to the view unconditionally (startup)
    pub fn refresh_view(&mut self) {
        self.view.update(&self.state);
    }

    /// Parse one request line, run its handler and commit the result.
    ///
    /// Returns the handler output on success. On any error the state and
    /// the view are left untouched.
    pub fn dispatch(&mut self, line: &str) -> Result<Option<String>, ProtocolError> {
        let tokens = tokenize(line);
        let (verb, args) = tokens.split_first().ok_or(ProtocolError::Empty)?;

        let command = Command::lookup(verb, args.len()).ok_or_else(|| ProtocolError::UnknownCommand {
            verb: verb.to_string(),
            arity: args.len(),
        })?;
        debug!(verb = command.verb(), ?args, "Dispatching request");

        let mut led = self.state;
        let output = command.handle(args, &mut led)?;

        if led != self.state {
            self.view.update(&led);
            self.state = led;
        }

        Ok(output)
    }
}
