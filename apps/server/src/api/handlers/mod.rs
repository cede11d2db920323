//! Request handlers for API endpoints
//!
//! Handlers extract and validate the request, call into the services, and shape
//! the response. Business rules live in `crate::services`.

pub mod metrics;
pub mod questions;
pub mod tags;

pub use metrics::*;
pub use questions::*;
pub use tags::*;
