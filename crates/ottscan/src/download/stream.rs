use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::Mutex;
use url::Url;

use super::parallel::ParallelRunner;
use crate::{
    util::url::last_path_segment, HttpClient, ScanError, ScanResult, Segment, SegmentDownload,
};

/// Create the directory of one stream. An existing directory is reused.
pub async fn create_stream_dir(directory: &Path) -> ScanResult<()> {
    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|source| ScanError::DirectoryCreateFailed {
            path: directory.to_path_buf(),
            source,
        })
}

/// Save the playlist or manifest describing a stream next to its segments.
pub async fn save_playlist(
    client: &HttpClient,
    url: &Url,
    directory: &Path,
) -> ScanResult<PathBuf> {
    let file_name = last_path_segment(url).unwrap_or("playlist");
    let path = directory.join(file_name);
    client.save(url, &path, None).await?;
    Ok(path)
}

/// Fetch `segments` into `directory`, one file per segment.
///
/// Results keep the order of `segments`. A failed segment is reported in its
/// [`SegmentDownload`] and does not stop the others.
pub async fn download_segments(
    client: &HttpClient,
    segments: Vec<Segment>,
    directory: &Path,
    runner: &ParallelRunner,
) -> ScanResult<Vec<SegmentDownload>> {
    let total = segments.len();
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    tracing::debug!("downloading {total} segments into {}", directory.display());

    runner
        .run(segments.into_iter().enumerate(), |(index, segment)| {
            let client = client.clone();
            let results = results.clone();
            let file_path = directory.join(segment.file_name());
            async move {
                let error = match client.save(&segment.url, &file_path, segment.byte_range).await {
                    Ok(()) => {
                        tracing::debug!("{} saved to {}", segment.url, file_path.display());
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Processing {} failed. {e}", segment.name);
                        Some(e)
                    }
                };

                let mut results = results.lock().await;
                results.push((index, SegmentDownload { file_path, error }));
                let done = results.len();
                tracing::info!("Processing {} finished. ({done} / {total})", segment.name);
            }
        })
        .await?;

    let mut results = std::mem::take(&mut *results.lock().await);
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, download)| download).collect())
}
