//! Scan and download the segments of HLS and MPEG-DASH streams.
//!
//! ```no_run
//! # async fn run() -> ottscan::ScanResult<()> {
//! let scanner = ottscan::Scanner::new("https://example.com/live/master.m3u8", 10)?;
//! for (segment, reachable) in scanner.scan().await? {
//!     println!("{} {reachable}", segment.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod dash;
pub mod download;
pub mod error;
pub mod format;
pub mod hls;
pub mod scanner;
pub mod segment;
pub mod util;

pub use scanner::{Scanner, ScannerBuilder};

pub use dash::DashWindow;
pub use error::{FetchError, ScanError, ScanResult, ScanResultExt};
pub use format::Format;
pub use segment::{Segment, SegmentDownload, Stream};
pub use util::{http::HttpClient, range::ByteRange};

pub use tokio_util::sync::CancellationToken;
