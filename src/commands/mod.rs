//! Command layer.
//!
//! Each command takes the shared `AppStateManager`, guards its trigger and
//! turns failures into the message shown to the user. The CLI binary is a
//! thin dispatcher over these.

pub mod debug;
pub mod health;
pub mod upload;
pub mod waitlist;
