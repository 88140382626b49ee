//! Request-independent services used by the route handlers.

pub mod conversion;
pub mod transcoder;
pub mod workspace;
