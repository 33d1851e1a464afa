//! FleetCmd Control Plane Library
//!
//! This crate provides the device task orchestration engine for FleetCmd:
//! collaborator ports, the per-operation drivers, command dispatch, and the
//! HTTP trigger surface.

pub mod aggregate;
pub mod audit;
pub mod availability;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod http;
pub mod resolver;
pub mod session;
pub mod state;
pub mod store;
pub mod urls;

pub use config::{Config, TransferConfig};
pub use driver::TaskDriver;
pub use state::AppState;
