//! Turn controller state machine
//!
//! Elm-style: `transition` is a pure function from (state, context, event) to
//! a new state plus effects. The session runtime executes the effects and
//! feeds backend results back in as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ConvState, SessionContext, TurnId};
pub use transition::{transition, TransitionError, TransitionResult};
