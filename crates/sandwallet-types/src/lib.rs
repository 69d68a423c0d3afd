//! Shared vocabulary of the sandwallet bridge.
//!
//! Both sides of the host/sandbox boundary depend on this crate and nothing
//! else for the shape of what crosses it:
//! - [`action`]: the closed set of base actions and their request/success/error variants
//! - [`state`]: the nested async-state tree folded by the reducer
//! - [`model`]: account and token records as they travel over JSON
//! - [`envelope`]: sandbox-to-host envelopes and host-to-sandbox statements

pub mod action;
pub mod cluster;
pub mod envelope;
pub mod error;
pub mod model;
pub mod state;

pub use action::*;
pub use cluster::*;
pub use envelope::*;
pub use error::*;
pub use model::*;
pub use state::*;
