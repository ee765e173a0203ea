use toolscout::dedup::CatalogSnapshot;
use toolscout::fetcher::{FetchError, extract_metadata, fetch_page};
use toolscout::pipeline::{IngestOptions, Pipeline};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

#[tokio::test]
async fn test_fetch_page_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/post/hello"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    concat!(
                        "<html><head><title>Hello Post</title>",
                        "<meta name=\"description\" content=\"A post about things\">",
                        "</head><body>Hello World</body></html>"
                    )
                    .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/post/hello", mock_server.uri())).unwrap();
    let doc = fetch_page(&url).await.unwrap();
    assert!(doc.body.contains("Hello World"));

    let meta = extract_metadata(&doc.body);
    assert_eq!(meta.title.as_deref(), Some("Hello Post"));
    assert_eq!(meta.description.as_deref(), Some("A post about things"));
}

#[tokio::test]
async fn test_fetch_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
    match fetch_page(&url).await {
        Err(FetchError::Http { status }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected HTTP 404 error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_unsupported_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF])
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/image", mock_server.uri())).unwrap();
    match fetch_page(&url).await {
        Err(FetchError::UnsupportedContentType(ct)) => assert_eq!(ct, "image/jpeg"),
        other => panic!("expected UnsupportedContentType, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_body_too_large() {
    let mock_server = MockServer::start().await;

    // 3MB > 2MB cap
    let large_body = "x".repeat(3 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.into_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/large", mock_server.uri())).unwrap();
    match fetch_page(&url).await {
        Err(FetchError::BodyTooLarge(size)) => assert_eq!(size, 3 * 1024 * 1024),
        other => panic!("expected BodyTooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_gzip_transparently_decoded() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let original = "<html><head><title>Compressed</title></head><body>gzipped body</body></html>";
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(original.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gzipped"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/gzipped", mock_server.uri())).unwrap();
    let doc = fetch_page(&url).await.unwrap();
    assert!(doc.body.contains("gzipped body"));
}

#[tokio::test]
async fn test_pipeline_uses_fetched_title() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/post/agent-design"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    concat!(
                        "<html><head>",
                        "<meta property=\"og:title\" content=\"Agent Design Patterns\">",
                        "<meta property=\"og:description\" content=\"How to build agents\">",
                        "</head><body>...</body></html>"
                    )
                    .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let raw = format!(
        "[1/15/26, 2:30:00 PM] John: worth reading {}/post/agent-design",
        mock_server.uri()
    );

    let mut opts = IngestOptions::new("agi");
    opts.fetch_metadata = true;
    let pipeline = Pipeline::new(opts);
    let batch = pipeline.run(&raw, &CatalogSnapshot::default()).await.unwrap();

    assert_eq!(batch.new_articles.len(), 1);
    let article = &batch.new_articles[0];
    assert_eq!(article.title, "Agent Design Patterns");
    assert_eq!(article.summary.as_deref(), Some("How to build agents"));
    assert!(batch.errors.is_empty());
}

#[tokio::test]
async fn test_pipeline_fetch_failure_is_absorbed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/post/broken-page"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let raw = format!(
        "[1/15/26, 2:30:00 PM] John: worth reading {}/post/broken-page",
        mock_server.uri()
    );

    let mut opts = IngestOptions::new("agi");
    opts.fetch_metadata = true;
    let pipeline = Pipeline::new(opts);
    let batch = pipeline.run(&raw, &CatalogSnapshot::default()).await.unwrap();

    // The candidate survives with a synthesized title; the failure is
    // visible in the report.
    assert_eq!(batch.new_articles.len(), 1);
    assert_eq!(batch.new_articles[0].title, "Broken Page");
    assert_eq!(batch.errors.len(), 1);
}
