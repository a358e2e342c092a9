use std::{path::Path, sync::Arc};

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{header::RANGE, Client, ClientBuilder, Method, RequestBuilder, Response};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::{error::FetchError, util::range::ByteRange, ScanError, ScanResult};

/// Transport used for every manifest, playlist and segment request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> Result<Self, reqwest::Error> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    pub fn add_cookies(&self, cookies: Vec<String>, url: &Url) {
        let Ok(mut lock) = self.cookies_store.lock() else {
            tracing::warn!("Cookie store is poisoned, cookies for {url} were not added.");
            return;
        };
        for cookie in cookies {
            _ = lock.parse(&cookie, url);
        }
    }

    fn request(&self, method: Method, url: &Url, range: Option<ByteRange>) -> RequestBuilder {
        let mut request = self.client.request(method, url.clone());
        if let Some(range) = range {
            request = request.header(RANGE, range.to_http_range());
        }
        request
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> ScanResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ScanError::fetch(url, e))?;
        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                if !body.is_empty() {
                    tracing::debug!("Error body of {url}: {body}");
                }
            }
            return Err(ScanError::fetch(url, FetchError::Status(status)));
        }
        Ok(response)
    }

    /// Issue `method` against `url` and return the body.
    pub async fn fetch(
        &self,
        method: Method,
        url: &Url,
        range: Option<ByteRange>,
    ) -> ScanResult<Bytes> {
        let response = self.send(self.request(method, url, range), url).await?;
        response.bytes().await.map_err(|e| ScanError::fetch(url, e))
    }

    /// Header-only existence check.
    pub async fn head(&self, url: &Url, range: Option<ByteRange>) -> ScanResult<()> {
        self.send(self.request(Method::HEAD, url, range), url)
            .await?;
        Ok(())
    }

    pub async fn text(&self, url: &Url) -> ScanResult<String> {
        let response = self.send(self.request(Method::GET, url, None), url).await?;
        response.text().await.map_err(|e| ScanError::fetch(url, e))
    }

    /// Stream the body of `url` into a newly created file at `path`.
    pub async fn save(&self, url: &Url, path: &Path, range: Option<ByteRange>) -> ScanResult<()> {
        let response = self.send(self.request(Method::GET, url, range), url).await?;

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| ScanError::fetch(url, e))?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ScanError::fetch(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ScanError::fetch(url, e))?;
        }
        file.flush().await.map_err(|e| ScanError::fetch(url, e))?;

        Ok(())
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = match Client::builder()
            .cookie_provider(cookies_store.clone())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Failed to build http client, cookies will not be sent: {e}");
                Client::new()
            }
        };

        Self {
            client,
            cookies_store,
        }
    }
}
