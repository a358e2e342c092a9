use url::Url;

use crate::ScanResult;

pub fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Resolve a manifest reference against the URL of the document it appeared in.
pub fn merge_baseurls(current: &Url, new: &str) -> ScanResult<Url> {
    if is_absolute_url(new) {
        Ok(Url::parse(new)?)
    } else {
        // The query of the current URL is carried over unless the new reference
        // brings its own, so signed manifest URLs keep working for their segments.
        //
        // merge_baseurls(https://example.com/hls/master.m3u8?auth=secret, 720p.m3u8) =>
        //   https://example.com/hls/720p.m3u8?auth=secret
        //
        // merge_baseurls(https://example.com/manifest.mpd?auth=old, /video42.mp4?auth=new) =>
        //   https://example.com/video42.mp4?auth=new
        let mut merged = current.join(new)?;
        if merged.query().is_none() {
            merged.set_query(current.query());
        }
        Ok(merged)
    }
}

/// Final non-empty path component of `url`, without query or fragment.
pub fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
}
