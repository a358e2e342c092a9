use std::fmt;

use serde::Serialize;

use crate::{ScanError, ScanResult};

/// Manifest family of a session, decided once from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    Hls,
    Dash,
}

impl Format {
    pub fn detect(url: &str) -> ScanResult<Self> {
        if url.contains(".m3u8") {
            Ok(Self::Hls)
        } else if url.contains(".mpd") {
            Ok(Self::Dash)
        } else {
            Err(ScanError::UnknownFormat(url.to_string()))
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hls => f.write_str("hls"),
            Self::Dash => f.write_str("dash"),
        }
    }
}
