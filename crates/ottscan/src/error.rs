use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single transport operation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot determine if this url is hls or dash: {0}")]
    UnknownFormat(String),

    #[error("failed to fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("problem parsing byte range: {0}")]
    MalformedByteRange(String),

    #[error("unable to parse init segment: {0}")]
    MalformedInitSegment(String),

    #[error("invalid mpd manifest {url}: {source}")]
    MalformedManifest {
        url: String,
        #[source]
        source: dash_mpd::DashMpdError,
    },

    #[error("missing {field} in SegmentTemplate of representation {representation}")]
    MissingTemplateField {
        representation: String,
        field: &'static str,
    },

    #[error("invalid {field} in SegmentTemplate of representation {representation}: {value}")]
    InvalidTemplateField {
        representation: String,
        field: &'static str,
        value: String,
    },

    #[error("no variant streams found in playlist: {0}")]
    NoStreamsFound(String),

    #[error("no segments found: {0}")]
    NoSegmentsToDownload(String),

    #[error("error creating directory {path}: {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    pub(crate) fn fetch<U, E>(url: U, source: E) -> Self
    where
        U: ToString,
        E: Into<FetchError>,
    {
        Self::FetchFailed {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// The innermost error, skipping every [`ScanError::Context`] layer.
    pub fn root(&self) -> &ScanError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Attach a human readable context to a failure while keeping its cause.
pub trait ScanResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> ScanResult<T>;

    fn with_context<C, F>(self, f: F) -> ScanResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ScanResultExt<T> for Result<T, E>
where
    E: Into<ScanError>,
{
    fn context<C: Into<String>>(self, context: C) -> ScanResult<T> {
        self.map_err(|e| ScanError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<C, F>(self, f: F) -> ScanResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| ScanError::Context {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}
