use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::variant::parse_variant;
use crate::{
    util::url::{last_path_segment, merge_baseurls},
    HttpClient, ScanError, ScanResult, ScanResultExt, Stream,
};

static URI_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"URI="(.*?)""#).unwrap());

/// Result of decoding the top-level playlist.
#[derive(Debug)]
pub enum HlsPlaylist {
    /// Variant streams discovered from a master playlist, segments not loaded yet.
    Master(Vec<Stream>),
    /// The playlist was a variant playlist itself; its segments are already loaded.
    Media(Stream),
}

/// Variant playlist references of a master playlist, in document order.
///
/// Plain `*.m3u8` lines and the `URI` attribute of `#EXT-X-I-FRAME-STREAM-INF`
/// and `#EXT-X-MEDIA` tags are collected. Repeated references are kept once.
pub fn master_references(playlist: &str) -> Vec<&str> {
    let mut references: Vec<&str> = Vec::new();
    for line in playlist.lines().map(str::trim) {
        let reference = if !line.starts_with('#') && line.contains("m3u8") {
            Some(line)
        } else if line.contains("#EXT-X-I-FRAME-STREAM-INF") || line.contains("#EXT-X-MEDIA") {
            URI_REGEX
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|uri| uri.as_str())
                .filter(|uri| !uri.is_empty())
        } else {
            None
        };

        if let Some(reference) = reference {
            if !references.contains(&reference) {
                tracing::debug!("variant found in master playlist {reference}");
                references.push(reference);
            }
        }
    }
    references
}

pub async fn decode_master(client: &HttpClient, url: &Url) -> ScanResult<HlsPlaylist> {
    tracing::debug!("decoding hls master playlist {url}");
    let playlist = client
        .text(url)
        .await
        .with_context(|| format!("unable to download hls master playlist url {url}"))?;

    let references = master_references(&playlist);
    if references.is_empty() {
        let segments = parse_variant(&playlist, url)
            .with_context(|| format!("unable to parse hls playlist: {url}"))?;
        if segments.is_empty() {
            return Err(ScanError::NoStreamsFound(url.to_string()));
        }

        tracing::debug!("no variants in {url}, using it as a variant playlist");
        let name = last_path_segment(url)
            .map(str::to_string)
            .unwrap_or_else(|| url.to_string());
        return Ok(HlsPlaylist::Media(Stream {
            name,
            url: url.clone(),
            master_playlist_url: url.clone(),
            segments,
        }));
    }

    let streams = references
        .into_iter()
        .map(|reference| {
            Ok(Stream {
                name: reference.to_string(),
                url: merge_baseurls(url, reference)?,
                master_playlist_url: url.clone(),
                segments: Vec::new(),
            })
        })
        .collect::<ScanResult<Vec<_>>>()?;
    Ok(HlsPlaylist::Master(streams))
}
