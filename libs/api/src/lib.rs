//! Typed access to the STACKIT REST APIs used by the CLI.
//!
//! Every request is plain data with an `execute(&ApiClient)` method, so
//! handlers can build and inspect requests without touching the network.

pub mod client;
pub mod dns;
pub mod error;
pub mod iaas;
pub mod ske;
pub mod wait;

pub use client::{ApiClient, ApiConfig, Service};
pub use error::{ApiError, ApiResult};
pub use wait::{PollOutcome, WaitConfig, WaitError};
