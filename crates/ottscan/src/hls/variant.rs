use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::{
    util::{range::ByteRange, url::merge_baseurls},
    HttpClient, ScanError, ScanResult, ScanResultExt, Segment,
};

/// File suffixes of media references in a variant playlist.
pub const SEGMENT_FORMATS: &[&str] = &[
    ".ts", ".fmp4", ".cmfv", ".cmfa", ".aac", ".ac3", ".ec3", ".webvtt",
];

static MAP_URI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"URI="([^"]+)""#).unwrap());
static MAP_BYTERANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"BYTERANGE="([^"]*)""#).unwrap());

fn is_media_line(line: &str) -> bool {
    SEGMENT_FORMATS.iter().any(|format| line.contains(format))
}

/// Segments of a variant playlist body, in playlist order.
///
/// `url` is the address of the playlist itself and is the base for relative
/// references. An `#EXT-X-BYTERANGE` tag applies to the line right after it
/// only when that line is a media reference.
pub fn parse_variant(playlist: &str, url: &Url) -> ScanResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut pending: Option<ByteRange> = None;
    let mut previous_end: Option<u64> = None;

    for line in playlist.lines().map(str::trim) {
        if line.starts_with("#EXT-X-BYTERANGE") {
            // #EXT-X-BYTERANGE:44744@2304880
            let range = line
                .split_once(':')
                .and_then(|(_, value)| ByteRange::parse_hls(value, previous_end))
                .ok_or_else(|| ScanError::MalformedByteRange(line.to_string()))?;
            pending = Some(range);
            continue;
        }

        let byte_range = pending.take();

        if line.starts_with("#EXT-X-MAP") {
            // #EXT-X-MAP:URI="init.mp4",BYTERANGE="720@0"
            let name = MAP_URI_REGEX
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|uri| uri.as_str())
                .ok_or_else(|| ScanError::MalformedInitSegment(line.to_string()))?;
            let byte_range = match MAP_BYTERANGE_REGEX.captures(line).and_then(|c| c.get(1)) {
                Some(value) => Some(
                    ByteRange::parse_hls(value.as_str(), None)
                        .ok_or_else(|| ScanError::MalformedByteRange(line.to_string()))?,
                ),
                None => byte_range,
            };

            tracing::debug!("init segment found in variant playlist {name}");
            segments.push(Segment::new(name, merge_baseurls(url, name)?, byte_range));
            continue;
        }

        if line.starts_with('#') || !is_media_line(line) {
            continue;
        }

        if let Some(range) = byte_range {
            previous_end = Some(range.end());
        }
        segments.push(Segment::new(line, merge_baseurls(url, line)?, byte_range));
    }

    Ok(segments)
}

pub async fn decode_variant(client: &HttpClient, url: &Url) -> ScanResult<Vec<Segment>> {
    tracing::debug!("decoding hls variant {url}");
    let playlist = client
        .text(url)
        .await
        .with_context(|| format!("unable to download hls variant playlist url {url}"))?;

    parse_variant(&playlist, url)
        .with_context(|| format!("unable to parse hls variant playlist: {url}"))
}
