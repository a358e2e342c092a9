use ottscan::{ByteRange, CancellationToken, FetchError, HttpClient, ScanError, Scanner};
use reqwest::Method;
use url::Url;
use wiremock::{
    matchers::{header, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{init_test_tracing, setup_mock_server, StreamMock};

const MASTER_PLAYLIST: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000
v/index.m3u8
";

async fn setup_stream(failing: Option<&str>) -> (String, MockServer) {
    let (url, server) = setup_mock_server("/hls/master.m3u8", MASTER_PLAYLIST).await;
    server
        .mock_variant("/hls/v/index.m3u8", &["s0.ts", "s1.ts", "s2.ts"])
        .await;
    for segment in ["s0.ts", "s1.ts", "s2.ts"] {
        let segment_path = format!("/hls/v/{segment}");
        if failing == Some(segment) {
            server.mock_status(&segment_path, 404).await;
        } else {
            server.mock(&segment_path, format!("data of {segment}")).await;
        }
    }
    (url, server)
}

async fn count_requests(server: &MockServer, method: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == request_path)
        .count()
}

#[test]
fn test_unknown_format() {
    let err = Scanner::new("https://example.com/video.mp4", 10).err();
    assert!(matches!(err, Some(ScanError::UnknownFormat(_))));
}

#[tokio::test]
async fn test_scan_all_reachable() -> anyhow::Result<()> {
    init_test_tracing();
    let (url, _server) = setup_stream(None).await;

    let scanner = Scanner::new(&url, 2)?;
    let segments = scanner.segments().await?;
    let results = scanner.scan().await?;

    assert_eq!(results.len(), segments.len());
    assert!(results.values().all(|reachable| *reachable));
    Ok(())
}

#[tokio::test]
async fn test_scan_one_unreachable() -> anyhow::Result<()> {
    let (url, _server) = setup_stream(Some("s1.ts")).await;

    let results = Scanner::new(&url, 2)?.scan().await?;
    assert_eq!(results.len(), 3);
    for (segment, reachable) in results.iter() {
        assert_eq!(*reachable, segment.name != "s1.ts", "{}", segment.name);
    }
    Ok(())
}

#[tokio::test]
async fn test_scan_sends_byte_range() -> anyhow::Result<()> {
    let (url, server) = setup_mock_server(
        "/vod/index.m3u8",
        "#EXTM3U
#EXTINF:10,
#EXT-X-BYTERANGE:100@50
main.ts
#EXTINF:10,
#EXT-X-BYTERANGE:100@1000
main.ts
",
    )
    .await;
    Mock::given(path("/vod/main.ts"))
        .and(header("range", "bytes=50-150"))
        .respond_with(ResponseTemplate::new(206))
        .mount(&server)
        .await;
    server.mock_status("/vod/main.ts", 416).await;

    let results = Scanner::new(&url, 1)?.scan().await?;
    let mut reachable: Vec<_> = results
        .iter()
        .map(|(segment, ok)| (segment.byte_range_start(), *ok))
        .collect();
    reachable.sort();
    assert_eq!(reachable, vec![(50, true), (1000, false)]);
    Ok(())
}

#[tokio::test]
async fn test_scan_refetches_variants() -> anyhow::Result<()> {
    let (url, server) = setup_stream(None).await;

    Scanner::new(&url, 2)?.scan().await?;
    assert_eq!(count_requests(&server, "GET", "/hls/v/index.m3u8").await, 2);
    assert_eq!(count_requests(&server, "HEAD", "/hls/v/s0.ts").await, 1);
    Ok(())
}

#[tokio::test]
async fn test_scan_cached_variants() -> anyhow::Result<()> {
    let (url, server) = setup_stream(None).await;

    let results = Scanner::builder(&url)
        .refresh_variants(false)
        .preflight(false)
        .build()?
        .scan()
        .await?;
    assert_eq!(results.len(), 3);
    assert_eq!(count_requests(&server, "GET", "/hls/v/index.m3u8").await, 1);
    assert_eq!(count_requests(&server, "HEAD", "/hls/master.m3u8").await, 0);
    Ok(())
}

#[tokio::test]
async fn test_download() -> anyhow::Result<()> {
    init_test_tracing();
    let (url, _server) = setup_stream(Some("s1.ts")).await;
    let output = tempfile::tempdir()?;

    let mut scanner = Scanner::new(&url, 2)?;
    scanner.download(output.path(), 2).await?;

    let stream_dir = output.path().join("v__index.m3u8");
    assert!(stream_dir.join("index.m3u8").is_file());
    assert_eq!(
        std::fs::read_to_string(stream_dir.join("s0.ts"))?,
        "data of s0.ts"
    );
    assert_eq!(
        std::fs::read_to_string(stream_dir.join("s2.ts"))?,
        "data of s2.ts"
    );

    let files = scanner
        .files()
        .get("v/index.m3u8")
        .ok_or_else(|| anyhow::anyhow!("stream missing from results"))?;
    assert_eq!(files.len(), 3);
    assert!(files[0].is_ok());
    assert_eq!(files[0].file(), stream_dir.join("s0.ts"));
    assert!(matches!(
        files[1].error(),
        Some(ScanError::FetchFailed { .. })
    ));
    assert!(files[2].is_ok());
    Ok(())
}

#[tokio::test]
async fn test_download_dash() -> anyhow::Result<()> {
    let (url, server) = setup_mock_server(
        "/dash/manifest.mpd",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT6S">
  <Period>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="audio/en" bandwidth="128000">
        <SegmentTemplate timescale="1" media="a_$Number$.m4s" startNumber="0" duration="2"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#,
    )
    .await;
    for number in 3..6 {
        server
            .mock(&format!("/dash/a_{number}.m4s"), number.to_string())
            .await;
    }
    let output = tempfile::tempdir()?;

    let mut scanner = Scanner::new(&url, 4)?;
    scanner.download(output.path(), 4).await?;

    let stream_dir = output.path().join("audio__en");
    assert!(stream_dir.join("manifest.mpd").is_file());
    for number in 3..6 {
        assert_eq!(
            std::fs::read_to_string(stream_dir.join(format!("a_{number}.m4s")))?,
            number.to_string()
        );
    }
    assert_eq!(scanner.files()["audio/en"].len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_no_segments() -> anyhow::Result<()> {
    let (url, server) = setup_mock_server("/hls/master.m3u8", MASTER_PLAYLIST).await;
    server.mock_variant("/hls/v/index.m3u8", &[]).await;
    let output = tempfile::tempdir()?;

    let mut scanner = Scanner::new(&url, 2)?;

    let err = scanner.scan().await.unwrap_err();
    assert!(matches!(err.root(), ScanError::NoSegmentsToDownload(_)));

    let err = scanner.download(output.path(), 2).await.unwrap_err();
    assert!(matches!(err.root(), ScanError::NoSegmentsToDownload(name) if name == "v/index.m3u8"));
    assert!(scanner.files().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cancelled() -> anyhow::Result<()> {
    let (url, _server) = setup_stream(None).await;

    let cancellation = CancellationToken::new();
    let scanner = Scanner::builder(&url)
        .cancellation(cancellation.clone())
        .build()?;
    cancellation.cancel();

    let err = scanner.scan().await.unwrap_err();
    assert!(err.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_client_fetch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(path("/blob.mp4"))
        .and(header("range", "bytes=0-4"))
        .respond_with(ResponseTemplate::new(206).set_body_string("head"))
        .mount(&server)
        .await;
    server.mock_status("/blob.mp4", 416).await;

    let client = HttpClient::default();
    let url = Url::parse(&format!("{}/blob.mp4", server.uri()))?;

    let body = client
        .fetch(Method::GET, &url, Some(ByteRange::new(0, 4)))
        .await?;
    assert_eq!(&body[..], b"head");

    let err = client.fetch(Method::GET, &url, None).await.unwrap_err();
    assert!(matches!(
        err,
        ScanError::FetchFailed {
            source: FetchError::Status(status),
            ..
        } if status.as_u16() == 416
    ));
    Ok(())
}

#[tokio::test]
async fn test_download_dir_collision() -> anyhow::Result<()> {
    let (url, _server) = setup_stream(None).await;
    let output = tempfile::tempdir()?;
    std::fs::write(output.path().join("v__index.m3u8"), "not a directory")?;

    let mut scanner = Scanner::new(&url, 2)?;
    let err = scanner.download(output.path(), 2).await.unwrap_err();
    assert!(matches!(
        err.root(),
        ScanError::DirectoryCreateFailed { .. }
    ));
    assert!(scanner.files().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_default_client_sends_cookies() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(path("/private.m3u8"))
        .and(header("cookie", "token=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U"))
        .mount(&server)
        .await;
    server.mock_status("/private.m3u8", 403).await;

    let client = HttpClient::default();
    let url = Url::parse(&format!("{}/private.m3u8", server.uri()))?;
    client.add_cookies(vec!["token=abc".to_string()], &url);

    let body = client.fetch(Method::GET, &url, None).await?;
    assert_eq!(&body[..], b"#EXTM3U");
    Ok(())
}
