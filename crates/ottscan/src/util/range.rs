use serde::Serialize;

/// A sub-range of a shared resource, as addressed by `#EXT-X-BYTERANGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub size: u64,
}

impl ByteRange {
    pub fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    /// Parse `<size>[@<start>]`.
    ///
    /// When the start offset is omitted, the range begins right after
    /// `previous_end`. Without a previous range such a value is invalid, and
    /// so is a range whose end does not fit in a `u64`.
    pub fn parse_hls(value: &str, previous_end: Option<u64>) -> Option<Self> {
        let (size, start) = match value.trim().split_once('@') {
            Some((size, start)) => (size, Some(start)),
            None => (value.trim(), None),
        };

        let size = size.trim().parse().ok()?;
        let start = match start {
            Some(start) => start.trim().parse().ok()?,
            None => previous_end?,
        };
        start.checked_add(size)?;

        Some(Self { start, size })
    }

    pub fn to_http_range(&self) -> String {
        format!("bytes={}-{}", self.start, self.end())
    }
}
