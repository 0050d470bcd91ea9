//! ListController integration tests.
//!
//! Runs on a paused Tokio clock: sleeping past the undo window
//! auto-advances time and lets the countdown task commit.

mod removal;
mod sorting;
