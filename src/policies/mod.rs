//! Startup policies.
//!
//! - [`retry`]: bounded retry-with-mutation for services that pick their own
//!   listen port and can only discover a collision by failing fast.

mod retry;

pub use retry::{spawn_until_live, RetryPolicy};
