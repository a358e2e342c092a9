use ottscan::{ScanError, Scanner};

use crate::{init_test_tracing, setup_mock_server, StreamMock};

const MASTER_PLAYLIST: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aud1",LANGUAGE="en",NAME="English",AUTOSELECT=YES,DEFAULT=YES,URI="audio/index.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,AUDIO="aud1"
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=1280x720,AUDIO="aud1"
high/index.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=90000,URI="low/iframe.m3u8"
"#;

async fn setup_master() -> (String, wiremock::MockServer) {
    let (url, server) = setup_mock_server("/live/master.m3u8", MASTER_PLAYLIST).await;
    server
        .mock_variant("/live/audio/index.m3u8", &["a0.aac", "a1.aac"])
        .await
        .mock_variant("/live/low/index.m3u8", &["l0.ts", "l1.ts", "l2.ts"])
        .await
        .mock_variant("/live/high/index.m3u8", &["h0.ts", "h1.ts", "h2.ts"])
        .await
        .mock_variant("/live/low/iframe.m3u8", &["l0.ts"])
        .await;
    (url, server)
}

#[tokio::test]
async fn test_master_streams() -> anyhow::Result<()> {
    init_test_tracing();
    let (url, server) = setup_master().await;

    let scanner = Scanner::new(&url, 4)?;
    let streams = scanner.streams().await?;

    let names: Vec<_> = streams.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "audio/index.m3u8",
            "low/index.m3u8",
            "high/index.m3u8",
            "low/iframe.m3u8"
        ]
    );
    for stream in streams.iter() {
        assert!(stream.url.as_str().starts_with(&server.uri()));
        assert_eq!(stream.master_playlist_url.as_str(), url);
        assert!(!stream.segments.is_empty());
    }

    let high = &streams[2];
    assert_eq!(
        high.url.as_str(),
        format!("{}/live/high/index.m3u8", server.uri())
    );
    let segment_urls: Vec<_> = high.segments.iter().map(|s| s.url.to_string()).collect();
    assert_eq!(
        segment_urls,
        vec![
            format!("{}/live/high/h0.ts", server.uri()),
            format!("{}/live/high/h1.ts", server.uri()),
            format!("{}/live/high/h2.ts", server.uri()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_segments_of_all_streams() -> anyhow::Result<()> {
    let (url, _server) = setup_master().await;

    let scanner = Scanner::new(&url, 4)?;
    let segments = scanner.segments().await?;
    assert_eq!(segments.len(), 2 + 3 + 3 + 1);
    assert_eq!(segments[0].name, "a0.aac");
    assert_eq!(segments[8].name, "l0.ts");

    Ok(())
}

#[tokio::test]
async fn test_variant_as_master() -> anyhow::Result<()> {
    let (url, _server) = setup_mock_server(
        "/vod/prog_index.m3u8",
        r#"#EXTM3U
#EXT-X-TARGETDURATION:10
#EXT-X-VERSION:7
#EXT-X-MAP:URI="init.mp4"
#EXTINF:10,
#EXT-X-BYTERANGE:100@50
main.fmp4
#EXTINF:10,
main.fmp4
#EXTINF:10,
#EXT-X-BYTERANGE:200@150
main.fmp4
#EXTINF:10,
#EXT-X-BYTERANGE:300
main.fmp4
#EXT-X-ENDLIST
"#,
    )
    .await;

    let streams = Scanner::new(&url, 1)?.streams().await?;
    assert_eq!(streams.len(), 1);
    let stream = &streams[0];
    assert_eq!(stream.name, "prog_index.m3u8");
    assert_eq!(stream.url.as_str(), url);

    let segments = stream.segments();
    assert_eq!(segments.len(), 5);

    assert_eq!(segments[0].name, "init.mp4");
    assert_eq!(segments[0].byte_range_start(), -1);

    assert_eq!(segments[1].byte_range_start(), 50);
    assert_eq!(segments[1].byte_range_size(), 100);

    assert_eq!(segments[2].byte_range_start(), -1);
    assert_eq!(segments[2].byte_range_size(), -1);

    assert_eq!(segments[3].byte_range_start(), 150);
    assert_eq!(segments[3].byte_range_size(), 200);

    // offset continues from the previous range
    assert_eq!(segments[4].byte_range_start(), 350);
    assert_eq!(segments[4].byte_range_size(), 300);

    Ok(())
}

#[tokio::test]
async fn test_malformed_byte_range() -> anyhow::Result<()> {
    let (url, _server) = setup_mock_server(
        "/playlist.m3u8",
        "#EXTM3U\n#EXTINF:10,\n#EXT-X-BYTERANGE:abc@0\nmain.ts\n",
    )
    .await;

    let err = Scanner::new(&url, 1)?.streams().await.unwrap_err();
    assert!(matches!(err.root(), ScanError::MalformedByteRange(_)));
    assert!(err.to_string().contains(&url));

    Ok(())
}

#[tokio::test]
async fn test_empty_playlist() -> anyhow::Result<()> {
    let (url, _server) =
        setup_mock_server("/playlist.m3u8", "#EXTM3U\n#EXT-X-ENDLIST\n").await;

    let err = Scanner::new(&url, 1)?.streams().await.unwrap_err();
    assert!(matches!(err.root(), ScanError::NoStreamsFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_missing_variant() -> anyhow::Result<()> {
    let (url, server) = setup_mock_server(
        "/master.m3u8",
        "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nmissing.m3u8\n",
    )
    .await;
    server.mock_status("/missing.m3u8", 404).await;

    let err = Scanner::new(&url, 1)?.streams().await.unwrap_err();
    match err.root() {
        ScanError::FetchFailed { url, .. } => assert!(url.ends_with("/missing.m3u8")),
        e => panic!("unexpected error: {e}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_preflight_failure() -> anyhow::Result<()> {
    let server = wiremock::MockServer::start().await;
    server.mock_status("/gone.m3u8", 410).await;
    let url = format!("{}/gone.m3u8", server.uri());

    let err = Scanner::new(&url, 1)?.streams().await.unwrap_err();
    assert!(err.to_string().starts_with("error checking playlist"));
    assert!(matches!(err.root(), ScanError::FetchFailed { .. }));

    Ok(())
}
