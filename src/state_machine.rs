//! Session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the runtime feeds events in, applies the resulting busy state, and
//! executes the effects.

mod effect;
pub mod event;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use transition::{check_orphaned, transition, TransitionError, TransitionResult};
