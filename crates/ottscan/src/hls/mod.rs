//! HLS playlist resolution.
//!
//! Playlists are scanned line by line rather than parsed into a full
//! RFC 8216 model: the scanner only needs variant references from master
//! playlists and media references (with byte ranges and initialization
//! sections) from variant playlists.

mod master;
mod variant;

pub use master::{decode_master, master_references, HlsPlaylist};
pub use variant::{decode_variant, parse_variant, SEGMENT_FORMATS};

use url::Url;

use crate::{HttpClient, ScanResult, Stream};

/// Resolve a playlist into its variant streams with their segments filled.
///
/// A playlist without variant references is itself treated as the only variant.
pub async fn parse_hls(client: &HttpClient, url: &Url) -> ScanResult<Vec<Stream>> {
    match decode_master(client, url).await? {
        HlsPlaylist::Media(stream) => Ok(vec![stream]),
        HlsPlaylist::Master(mut streams) => {
            for stream in streams.iter_mut() {
                stream.segments = decode_variant(client, &stream.url).await?;
            }
            Ok(streams)
        }
    }
}
