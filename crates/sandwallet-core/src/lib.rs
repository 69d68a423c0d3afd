//! State machine of the sandwallet bridge.
//!
//! The reducer is the single definition of how an action changes the state
//! tree. The host folds every action through it, and the sandbox replays the
//! same actions through it to keep its mirror in step. Selectors derive the
//! flattened views the UI layer renders from.

pub mod reducer;
pub mod selectors;

pub use reducer::{fold, reduce, reduce_with_epoch};
pub use selectors::*;
