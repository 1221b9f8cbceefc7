//! Shared state for the command layer.
//!
//! Holds what every command needs: resolved configuration, the debug log and
//! the busy flags that keep each trigger from starting a second submission.

mod manager;

pub use manager::AppStateManager;
