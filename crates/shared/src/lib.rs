//! Shared types for the opsdash presence client and any backend receiving its reports.

pub mod models;
pub mod protocol;
pub mod error;

pub use models::*;
pub use protocol::*;
pub use error::*;
