// LED view abstraction: whatever displays the committed LED state
use crate::types::LedState;

/// Receives every committed state change.
///
/// Called synchronously from the dispatcher, so implementations must not
/// block for long: a slow view stalls every client.
pub trait LedView: Send {
    fn update(&mut self, state: &LedState);
}

impl<V: LedView + ?Sized> LedView for Box<V> {
    fn update(&mut self, state: &LedState) {
        (**self).update(state)
    }
}
