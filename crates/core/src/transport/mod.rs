//! Remote stream transport.
//!
//! A transport pulls one remote stream and pushes [`TransportEvent`]s into a
//! bounded channel: data chunks interleaved with progress samples. The
//! transfer's return value is its terminal event.

mod config;
mod error;
mod http;
mod traits;
mod types;

pub use config::TransportConfig;
pub use error::TransportError;
pub use http::HttpTransport;
pub use traits::StreamTransport;
pub use types::{StreamRequest, TransportEvent};
