//! Session manager client for FleetCmd.
//!
//! Provides the HTTP client used to open correlation sessions against the
//! external session manager before a command is dispatched.

pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::SessionClient;
