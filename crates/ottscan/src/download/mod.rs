//! Bounded-concurrency scan and download over resolved segments.

pub mod parallel;
pub mod scan;
pub mod stream;

pub use parallel::ParallelRunner;
pub use scan::scan_segments;
pub use stream::{create_stream_dir, download_segments, save_playlist};
