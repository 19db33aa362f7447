/*!
 * REST client tests against a local mock server
 */

use serde_json::json;
use std::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use persdeck::app_config::{DeckRoute, ServiceConfig};
use persdeck::errors::ServiceError;
use persdeck::language_utils::TargetLanguage;
use persdeck::pipeline::{DeckId, ExportOptions, JobId};
use persdeck::service::http::HttpDeckService;
use persdeck::service::{Credential, DeckRequest, DeckService, ExportRequest};

use crate::common;

fn client(server: &MockServer, route: DeckRoute, credential: Option<Credential>) -> HttpDeckService {
    common::init_logging();
    let config = ServiceConfig {
        base_url: format!("{}/api", server.uri()),
        deck_route: route,
        ..ServiceConfig::default()
    };
    HttpDeckService::new(&config, credential).unwrap()
}

fn deck_request() -> DeckRequest {
    DeckRequest {
        job_id: JobId("job-42".to_string()),
        deck_name: "S01E01".to_string(),
        target_language: TargetLanguage::EnGb,
    }
}

#[tokio::test]
async fn test_createJob_shouldSendMultipartFileAndEpisodeName() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-42"})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let job_id = svc.create_job(&common::sample_subtitle(), "S01E01").await.unwrap();
    assert_eq!(job_id, JobId("job-42".to_string()));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("name=\"file\"; filename=\"S01E01.srt\""));
    assert!(body.contains("name=\"episode_name\""));
    assert!(body.contains("Det är ett hus."));
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_createJob_withCredential_shouldSendBearerToken() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "j"})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, Some(Credential::bearer("s3cret")));
    assert!(svc.create_job(&common::sample_subtitle(), "S01E01").await.is_ok());
}

#[tokio::test]
async fn test_createJob_withRejectedFile_shouldReturnStatusAndBody() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("{\"detail\":\"Only .srt files are supported\"}"),
        )
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let err = svc.create_job(&common::sample_subtitle(), "S01E01").await.unwrap_err();

    match err {
        ServiceError::RemoteRejected { status_code, body } => {
            assert_eq!(status_code, 400);
            assert!(body.contains("Only .srt files"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_createJob_withMissingJobId_shouldBeMalformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "nope"})))
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let err = svc.create_job(&common::sample_subtitle(), "S01E01").await.unwrap_err();
    assert!(matches!(err, ServiceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_triggerAnalysis_shouldAcceptStatsOrEmptyBody() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/job-42/manual"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-42", "stats": {"lines": 3}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/job-42/manual"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let job = JobId("job-42".to_string());

    let ack = svc.trigger_analysis(&job).await.unwrap();
    assert_eq!(ack.job_id.as_deref(), Some("job-42"));
    assert_eq!(ack.stats, Some(json!({"lines": 3})));

    let ack = svc.trigger_analysis(&job).await.unwrap();
    assert!(ack.job_id.is_none());
}

#[tokio::test]
async fn test_fetchAnalysis_shouldParseListsAndKeepExtras() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/job-42/analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "words": [{"lemma": "hus"}, {"lemma": "vara"}],
            "sentences": null,
            "episode": "S01E01"
        })))
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let analysis = svc.fetch_analysis(&JobId("job-42".to_string())).await.unwrap();

    assert_eq!(analysis.stats().words, 2);
    assert!(analysis.phrases.is_empty());
    assert!(analysis.sentences.is_empty());
    assert_eq!(analysis.extra.get("episode"), Some(&json!("S01E01")));
}

#[tokio::test]
async fn test_fetchAnalysis_withInvalidJson_shouldBeMalformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/job-42/analysis"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let err = svc.fetch_analysis(&JobId("job-42".to_string())).await.unwrap_err();
    assert!(matches!(err, ServiceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_createDeck_globalRoute_shouldPostWireFields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/deck"))
        .and(body_json(json!({
            "job_id": "job-42",
            "deck_name": "S01E01",
            "target_lang_tag": "EN-GB",
            "build_version": "v1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deck_id": 17})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let deck_id = svc.create_deck(&deck_request()).await.unwrap();
    assert_eq!(deck_id, DeckId::Number(17));
}

#[tokio::test]
async fn test_createDeck_perJobRoute_shouldUseJobPath() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/job-42/deck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deck_id": "deck-abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::PerJob, None);
    let deck_id = svc.create_deck(&deck_request()).await.unwrap();
    assert_eq!(deck_id, DeckId::Text("deck-abc".to_string()));
}

#[tokio::test]
async fn test_exportDeck_shouldEchoDeckIdAndReturnRawBytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/job-42/deck"))
        .and(body_json(json!({
            "deck_id": 17,
            "output_format": "quizlet",
            "export_options": {"include_sentence": true}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("hus\thouse\tDet är ett hus.\n", "text/tab-separated-values"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let svc = client(&server, DeckRoute::Global, None);
    let payload = svc
        .export_deck(&ExportRequest {
            job_id: JobId("job-42".to_string()),
            deck_id: DeckId::Number(17),
            options: ExportOptions { include_sentence: true },
        })
        .await
        .unwrap();

    assert_eq!(&payload.content[..], "hus\thouse\tDet är ett hus.\n".as_bytes());
    assert_eq!(payload.content_type.as_deref(), Some("text/tab-separated-values"));
}

#[tokio::test]
async fn test_unreachableService_shouldBeTransportError() {
    common::init_logging();
    // Grab a free port, then close it so nothing is listening there
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ServiceConfig {
        base_url: format!("http://127.0.0.1:{}/api", port),
        ..ServiceConfig::default()
    };
    let svc = HttpDeckService::new(&config, None).unwrap();

    let err = svc.fetch_analysis(&JobId("job-42".to_string())).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "unexpected error: {:?}", err);
}
