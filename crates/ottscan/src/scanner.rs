use std::{collections::HashMap, future::Future, num::NonZeroU32, path::Path};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    dash::{parse_dash, DashWindow},
    download::{
        create_stream_dir, download_segments, save_playlist, scan_segments, ParallelRunner,
    },
    hls::{decode_variant, parse_hls},
    util::path::sanitize_dir_name,
    Format, HttpClient, ScanError, ScanResult, ScanResultExt, Segment, SegmentDownload, Stream,
};

fn clamp_concurrency(concurrency: u32) -> NonZeroU32 {
    NonZeroU32::new(concurrency).unwrap_or(NonZeroU32::MIN)
}

/// A scanning session bound to one manifest url.
///
/// The manifest format is fixed at construction. Every operation resolves the
/// manifest again, so a session can be reused on a live stream.
///
/// ┌─────────────┐   Format   ┌──────────────────────┐
/// │ manifest url├───────────►│ hls::parse_hls       │
/// └─────────────┘            │ dash::parse_dash     │
///                            └──────────┬───────────┘
///                                       │ Vec<Stream>
///                            ┌──────────▼───────────┐
///                            │    ParallelRunner    │
///                            │ scan: HEAD per item  │
///                            │ download: GET to dir │
///                            └──────────────────────┘
pub struct Scanner {
    url: Url,
    format: Format,
    max_concurrency: NonZeroU32,

    client: HttpClient,
    dash_window: DashWindow,
    preflight: bool,
    refresh_variants: bool,
    cancellation: CancellationToken,

    files: HashMap<String, Vec<SegmentDownload>>,
}

impl Scanner {
    /// Create a session with default settings. A concurrency of `0` is raised to `1`.
    pub fn new(url: &str, max_concurrency: u32) -> ScanResult<Self> {
        Self::builder(url).max_concurrency(max_concurrency).build()
    }

    pub fn builder(url: &str) -> ScannerBuilder {
        ScannerBuilder::new(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn max_concurrency(&self) -> NonZeroU32 {
        self.max_concurrency
    }

    /// Stream name to the files of its segments, filled by [`Scanner::download`].
    pub fn files(&self) -> &HashMap<String, Vec<SegmentDownload>> {
        &self.files
    }

    async fn cancellable<T, F>(&self, future: F) -> ScanResult<T>
    where
        F: Future<Output = ScanResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ScanError::Cancelled),
            result = future => result,
        }
    }

    async fn resolve_streams(&self) -> ScanResult<Vec<Stream>> {
        if self.preflight {
            tracing::debug!("checking url: {}", self.url);
            self.client
                .head(&self.url, None)
                .await
                .with_context(|| format!("error checking playlist: {}", self.url))?;
        }

        match self.format {
            Format::Hls => {
                tracing::info!("getting streams for hls playlist: {}", self.url);
                parse_hls(&self.client, &self.url)
                    .await
                    .with_context(|| format!("error getting abr streams for hls: {}", self.url))
            }
            Format::Dash => {
                tracing::info!("getting streams for dash playlist: {}", self.url);
                parse_dash(&self.client, &self.url, self.dash_window)
                    .await
                    .with_context(|| format!("error getting abr streams for dash: {}", self.url))
            }
        }
    }

    /// Variant streams of the manifest with their segments.
    pub async fn streams(&self) -> ScanResult<Vec<Stream>> {
        self.cancellable(self.resolve_streams()).await
    }

    /// Segment list of one stream right before it is used.
    ///
    /// HLS variant playlists are fetched again to pick up a fresh copy.
    async fn resolve_segments(&self, stream: &Stream) -> ScanResult<Vec<Segment>> {
        match self.format {
            Format::Hls if self.refresh_variants => decode_variant(&self.client, &stream.url)
                .await
                .with_context(|| format!("error getting segments: {}", stream.url)),
            _ => Ok(stream.segments.clone()),
        }
    }

    /// All segments of all streams, in stream order.
    pub async fn segments(&self) -> ScanResult<Vec<Segment>> {
        self.cancellable(async {
            let streams = self
                .resolve_streams()
                .await
                .with_context(|| format!("error getting streams: {}", self.url))?;

            let mut segments = Vec::new();
            for stream in streams.iter() {
                segments.extend(self.resolve_segments(stream).await?);
            }
            Ok::<_, ScanError>(segments)
        })
        .await
    }

    /// Check that every segment is reachable.
    ///
    /// Individual failures are reported as `false`; only failing to list the
    /// segments, or listing none, fails the call.
    pub async fn scan(&self) -> ScanResult<HashMap<Segment, bool>> {
        let segments = self
            .segments()
            .await
            .with_context(|| format!("error getting segments: {}", self.url))?;
        if segments.is_empty() {
            return Err(ScanError::NoSegmentsToDownload(self.url.to_string()));
        }

        let runner = ParallelRunner::new(self.max_concurrency, self.cancellation.clone());
        scan_segments(&self.client, segments, &runner)
            .await
            .with_context(|| format!("error scanning segments: {}", self.url))
    }

    /// Download every stream into `directory/<stream name>/`.
    ///
    /// Each stream directory receives the playlist (HLS) or manifest (DASH)
    /// describing it, then one file per segment. Results are available from
    /// [`Scanner::files`] once the call succeeds.
    pub async fn download<P>(&mut self, directory: P, concurrency: u32) -> ScanResult<()>
    where
        P: AsRef<Path>,
    {
        self.files.clear();
        tracing::info!("downloading segments for playlist: {}", self.url);

        let runner = ParallelRunner::new(
            clamp_concurrency(concurrency),
            self.cancellation.clone(),
        );
        let files = self
            .download_streams(directory.as_ref(), &runner)
            .await
            .with_context(|| format!("error downloading {} segments: {}", self.format, self.url))?;

        self.files = files;
        Ok(())
    }

    async fn download_streams(
        &self,
        directory: &Path,
        runner: &ParallelRunner,
    ) -> ScanResult<HashMap<String, Vec<SegmentDownload>>> {
        let streams = self
            .streams()
            .await
            .with_context(|| format!("error getting streams for download: {}", self.url))?;
        if streams.is_empty() {
            return Err(ScanError::NoStreamsFound(self.url.to_string()));
        }

        let mut files: HashMap<String, Vec<SegmentDownload>> = HashMap::new();
        for stream in streams.iter() {
            let stream_directory = directory.join(sanitize_dir_name(&stream.name));
            create_stream_dir(&stream_directory).await?;

            let playlist = match self.format {
                Format::Hls => &stream.url,
                Format::Dash => &self.url,
            };
            self.cancellable(save_playlist(&self.client, playlist, &stream_directory))
                .await
                .with_context(|| format!("error downloading playlist: {playlist}"))?;

            let segments = self.cancellable(self.resolve_segments(stream)).await?;
            if segments.is_empty() {
                return Err(ScanError::NoSegmentsToDownload(stream.name.clone()));
            }

            tracing::debug!(
                "downloading {} segments for stream: {}",
                segments.len(),
                stream.name
            );
            let downloads = download_segments(&self.client, segments, &stream_directory, runner)
                .await
                .with_context(|| format!("error downloading stream: {}", stream.name))?;
            files.entry(stream.name.clone()).or_default().extend(downloads);
        }

        Ok(files)
    }
}

/// Configuration of a [`Scanner`].
pub struct ScannerBuilder {
    url: String,
    client: Option<HttpClient>,
    max_concurrency: u32,
    dash_window: DashWindow,
    preflight: bool,
    refresh_variants: bool,
    cancellation: Option<CancellationToken>,
}

impl ScannerBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: None,
            max_concurrency: 10,
            dash_window: DashWindow::default(),
            preflight: true,
            refresh_variants: true,
            cancellation: None,
        }
    }

    pub fn client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Maximum number of concurrent segment requests of [`Scanner::scan`].
    pub fn max_concurrency(mut self, max_concurrency: u32) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn dash_window(mut self, dash_window: DashWindow) -> Self {
        self.dash_window = dash_window;
        self
    }

    /// Check the manifest with a `HEAD` request before resolving it.
    pub fn preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Fetch HLS variant playlists again before scanning or downloading them.
    ///
    /// When disabled, the segments loaded while resolving streams are reused.
    pub fn refresh_variants(mut self, refresh_variants: bool) -> Self {
        self.refresh_variants = refresh_variants;
        self
    }

    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn build(self) -> ScanResult<Scanner> {
        let format = Format::detect(&self.url)?;
        let url = Url::parse(&self.url)?;

        Ok(Scanner {
            url,
            format,
            max_concurrency: clamp_concurrency(self.max_concurrency),
            client: self.client.unwrap_or_default(),
            dash_window: self.dash_window,
            preflight: self.preflight,
            refresh_variants: self.refresh_variants,
            cancellation: self.cancellation.unwrap_or_default(),
            files: HashMap::new(),
        })
    }
}
