//! Per-request context stored in request extensions by the request-id middleware.

use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Server-generated id echoed as `x-request-id`
    pub request_id: String,
    pub received_at: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            received_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.received_at.elapsed().as_millis() as u64
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
