//! Format catalog: remote format metadata and the compatible-format filter.
//!
//! A single catalog query returns every format the remote source offers.
//! [`filter_formats`] keeps only the allow-listed video-only and audio-only
//! streams and ranks them best first.

mod config;
mod error;
mod filter;
mod traits;
mod types;
mod ytdlp;

pub use config::CatalogConfig;
pub use error::CatalogError;
pub use filter::{audio_allow_list, filter_formats, parse_rank, video_allow_list};
pub use traits::CatalogClient;
pub use types::{MediaInfo, MediaKind, RawFormat, RawMediaInfo, StreamDescriptor};
pub use ytdlp::YtDlpCatalog;
