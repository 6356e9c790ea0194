// src/queue/mod.rs

//! Queue state machine.
//!
//! - [`stage`] defines the stage list elements (jobs, groups, nested queues).
//! - [`state`] holds the pure per-queue state: remaining stages and the
//!   finished set.
//! - [`server`] runs each queue as its own task and resolves nested
//!   delegation.
//! - [`registry`] maps queue names to running queues and handles their
//!   lifecycle.

pub mod registry;
pub mod server;
pub mod stage;
pub mod state;

pub use registry::QueueRegistry;
pub use server::{QueueCommand, QueueHandle};
pub use stage::{Stage, StageEntry};
pub use state::QueueState;
