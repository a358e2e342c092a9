use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use super::parallel::ParallelRunner;
use crate::{HttpClient, ScanResult, Segment};

/// Check every segment with a header-only request.
///
/// A failed request marks its segment unreachable and never fails the batch.
pub async fn scan_segments(
    client: &HttpClient,
    segments: Vec<Segment>,
    runner: &ParallelRunner,
) -> ScanResult<HashMap<Segment, bool>> {
    let total = segments.len();
    let results = Arc::new(Mutex::new(HashMap::with_capacity(total)));
    tracing::info!("scanning {total} segments");

    runner
        .run(segments, |segment| {
            let client = client.clone();
            let results = results.clone();
            async move {
                let reachable = match client.head(&segment.url, segment.byte_range).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("{e}");
                        false
                    }
                };
                results.lock().await.insert(segment, reachable);
            }
        })
        .await?;

    let results = std::mem::take(&mut *results.lock().await);
    let failed = results.values().filter(|ok| !**ok).count();
    if failed > 0 {
        tracing::warn!("{failed} of {total} segments are unreachable");
    }
    Ok(results)
}
