//! Domain layer: models, ports, and the error taxonomy.
//!
//! Pure types and trait seams; no I/O happens here.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{GatewayError, GatewayResult, RetrievalError, RetrievalResult};
