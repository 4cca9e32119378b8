//! HTTP client tests against a mock collaborator service.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fscope_client::{ClientConfig, ClientError, HttpDetector, HttpSegmenter, HttpSemanticAnalyzer};
use fscope_client::{ObjectDetector, Segmenter, SemanticAnalyzer};
use fscope_models::{BBox, Frame};

fn frame(index: u64) -> Frame {
    Frame {
        index,
        timestamp_seconds: index as f64 / 30.0,
        pixel_data: vec![0u8; 12],
        width: 2,
        height: 2,
    }
}

#[tokio::test]
async fn detector_maps_response_onto_frame_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detections": [
                {"class": "bowl", "confidence": 0.9,
                 "bbox": {"x": 10.0, "y": 20.0, "width": 30.0, "height": 40.0}}
            ]
        })))
        .mount(&server)
        .await;

    let detector = HttpDetector::new(ClientConfig::new(server.uri())).unwrap();
    let detections = detector.detect(&frame(25)).await.unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].frame_index, 25);
    assert_eq!(detections[0].class_label, "bowl");
    assert!((detections[0].confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn detector_retries_transient_failures() {
    let server = MockServer::start().await;

    // First call fails with a 503, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detections": []})))
        .mount(&server)
        .await;

    let detector = HttpDetector::new(ClientConfig::new(server.uri())).unwrap();
    let detections = detector.detect(&frame(0)).await.unwrap();
    assert!(detections.is_empty());
}

#[tokio::test]
async fn detector_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let detector = HttpDetector::new(ClientConfig::new(server.uri())).unwrap();
    let err = detector.detect(&frame(0)).await.unwrap_err();
    assert!(matches!(err, ClientError::RequestFailed(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn segmenter_decodes_rle_masks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/segment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rle": "1,2,1", "width": 2, "height": 2
        })))
        .mount(&server)
        .await;

    let segmenter = HttpSegmenter::new(ClientConfig::new(server.uri())).unwrap();
    let mask = segmenter
        .segment(&frame(0), &BBox::new(0.0, 0.0, 2.0, 2.0))
        .await
        .unwrap();

    assert_eq!(mask.foreground_area(), 2);
    assert!(!mask.get(0, 0));
    assert!(mask.get(1, 0));
    assert!(mask.get(0, 1));
}

#[tokio::test]
async fn segmenter_rejects_corrupt_masks_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/segment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rle": "3,x,10", "width": 4, "height": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let segmenter = HttpSegmenter::new(ClientConfig::new(server.uri())).unwrap();
    let err = segmenter
        .segment(&frame(0), &BBox::new(0.0, 0.0, 2.0, 2.0))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Mask(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn semantic_analyzer_parses_analysis_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {"name": "Dog Bowl", "category": "container",
                 "first_seen_ts": 0.0, "last_seen_ts": 4.0}
            ],
            "scenes": [
                {"start_seconds": 0.0, "end_seconds": 10.0, "description": "feeding"}
            ],
            "summary": "a dog eats"
        })))
        .mount(&server)
        .await;

    let analyzer = HttpSemanticAnalyzer::new(ClientConfig::new(server.uri())).unwrap();
    let analysis = analyzer.analyze("videos/dog.mp4").await.unwrap();

    assert_eq!(analysis.products.len(), 1);
    assert_eq!(analysis.products[0].name, "Dog Bowl");
    assert_eq!(analysis.scenes.len(), 1);
    assert_eq!(analysis.summary.as_deref(), Some("a dog eats"));
}
