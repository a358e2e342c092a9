use std::path::{Path, PathBuf};

use serde::Serialize;
use url::Url;

use crate::{
    util::{path::PathExt, range::ByteRange, url::last_path_segment},
    ScanError, ScanResult,
};

/// One retrievable media unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    /// Media reference as written in the manifest, possibly relative.
    pub name: String,
    pub url: Url,
    pub byte_range: Option<ByteRange>,
}

impl Segment {
    pub fn new(name: impl Into<String>, url: Url, byte_range: Option<ByteRange>) -> Self {
        Self {
            name: name.into(),
            url,
            byte_range,
        }
    }

    /// `-1` when the segment is a standalone resource.
    pub fn byte_range_start(&self) -> i64 {
        self.byte_range.map_or(-1, |r| r.start as i64)
    }

    /// `-1` when the segment is a standalone resource.
    pub fn byte_range_size(&self) -> i64 {
        self.byte_range.map_or(-1, |r| r.size as i64)
    }

    /// Local file name derived from the final path component of the url.
    ///
    /// Byte range segments share one remote resource, so the range is added
    /// to keep their files apart.
    pub fn file_name(&self) -> String {
        let name = last_path_segment(&self.url).unwrap_or("segment");
        match self.byte_range {
            Some(range) => {
                let mut path = PathBuf::from(name);
                path.add_suffix(format!("{}-{}", range.start, range.end()));
                path.to_string_lossy().into_owned()
            }
            None => name.to_string(),
        }
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One bitrate / quality variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    pub name: String,
    /// Variant playlist for HLS, the shared manifest for DASH.
    pub url: Url,
    pub master_playlist_url: Url,
    pub segments: Vec<Segment>,
}

impl Stream {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome of saving one segment to disk.
#[derive(Debug)]
pub struct SegmentDownload {
    pub(crate) file_path: PathBuf,
    pub(crate) error: Option<ScanError>,
}

impl SegmentDownload {
    pub fn file(&self) -> &Path {
        &self.file_path
    }

    pub fn error(&self) -> Option<&ScanError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
