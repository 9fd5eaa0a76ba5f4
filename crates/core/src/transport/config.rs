//! Configuration for the transport module.

use serde::{Deserialize, Serialize};

/// Configuration for stream transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capacity of the bounded event channel between transport and writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_user_agent() -> String {
    format!("tubemux/{}", env!("CARGO_PKG_VERSION"))
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
