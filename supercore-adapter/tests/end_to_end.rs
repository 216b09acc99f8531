//! End-to-end scenarios across modality, workflow, compliance and the
//! SuperCore boundary.

use std::sync::Arc;

use compliance::{IpGovernance, IpRegistration, NotarizationMetadata, NotarizationService};
use modality::{InputOrchestrator, ModalityConfig};
use serde_json::json;
use supercore_adapter::{AdapterError, AdapterMode, SuperCoreAdapter, SuperCoreConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workflow::IntentExecutor;

/// Nothing listens on port 1.
const UNREACHABLE: &str = "http://127.0.0.1:1";

fn unreachable_adapter() -> SuperCoreAdapter {
    SuperCoreAdapter::new(SuperCoreConfig::new(UNREACHABLE).with_timeout_ms(500)).unwrap()
}

async fn status_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn voice_command_forwarded_in_standalone_mode() {
    let adapter = Arc::new(unreachable_adapter());
    assert_eq!(adapter.initialize().await, AdapterMode::Standalone);

    let orchestrator = InputOrchestrator::new(ModalityConfig::default()).with_forwarder(adapter);
    let processed = orchestrator
        .process_input(json!({"transcript": "please create asset now", "confidence": 0.95}))
        .await
        .unwrap();

    assert_eq!(processed.intent.intent, "create-asset");
    let command_confidence = processed.intent.param("commandConfidence").unwrap().as_f64().unwrap();
    assert!(command_confidence >= 0.8);

    let forwarded = processed.forwarded.unwrap();
    assert_eq!(forwarded["mode"], "standalone");
    assert_eq!(forwarded["intent"], "create-asset");
}

#[tokio::test]
async fn flow_swipe_right_is_linear() {
    let orchestrator = InputOrchestrator::new(ModalityConfig::default());
    let processed = orchestrator
        .process_input(json!({
            "sequence": [{"x": 0.0, "y": 0.0}, {"x": 0.5, "y": 0.0}, {"x": 1.0, "y": 0.0}]
        }))
        .await
        .unwrap();

    let intent = processed.intent;
    assert_eq!(intent.metadata.input_type, "flow");
    assert_eq!(intent.intent, "navigate-forward");
    assert_eq!(intent.action, "swipe-right");
    assert_eq!(intent.parameters["confidence"], 1.0);
    assert_eq!(intent.parameters["pattern"]["type"], "linear");
    assert!(processed.forwarded.is_none());
}

#[tokio::test]
async fn intent_executed_locally_through_orchestrator() {
    let executor = Arc::new(IntentExecutor::new());
    let orchestrator =
        InputOrchestrator::new(ModalityConfig::default()).with_forwarder(executor.clone());

    let processed = orchestrator
        .process_input(json!({"type": "generic", "intent": "save-work", "action": "save"}))
        .await
        .unwrap();

    let forwarded = processed.forwarded.unwrap();
    assert_eq!(forwarded["success"], true);
    assert_eq!(forwarded["steps"][2]["stepName"], "execute save");
    assert_eq!(executor.stats().await.successful, 1);
}

#[tokio::test]
async fn ip_ownership_scenario() {
    let notary = Arc::new(NotarizationService::new());
    let governance = IpGovernance::new().with_notarization_service(notary.clone());

    governance
        .register_ip(IpRegistration::new("ip1", "logo", "acct-1"))
        .await
        .unwrap();

    let owned = governance.verify_ownership("ip1", "acct-1").await;
    assert!(owned.valid);
    assert!(owned.notarized);

    let claimed = governance.verify_ownership("ip1", "acct-2").await;
    assert!(!claimed.valid);

    assert_eq!(notary.all_notarizations().await.len(), 1);
}

#[tokio::test]
async fn standalone_notarization_is_local() {
    let notary = Arc::new(NotarizationService::new());
    let adapter = unreachable_adapter().with_notarization_service(notary.clone());
    adapter.initialize().await;

    let data = json!({"asset": "logo.png", "sha": "abc"});
    let record = adapter
        .notarize(&data, NotarizationMetadata::new("asset", "acct-1"))
        .await
        .unwrap();

    let id = record["id"].as_str().unwrap();
    let verification = notary.verify(id, Some(&data)).await.unwrap();
    assert!(verification.valid);

    let err = adapter.verify_asset("logo", &json!({"path": "logo.png"})).await.unwrap_err();
    assert!(matches!(err, AdapterError::Standalone(_)));
}

#[tokio::test]
async fn status_of_unreachable_service_is_unknown() {
    let adapter = unreachable_adapter();
    let status = adapter.get_status().await;
    assert_eq!(status["status"], "unknown");
    assert!(status["error"].is_string());
}

#[tokio::test]
async fn connected_intent_uses_bearer_token() {
    let server = status_server().await;
    Mock::given(method("POST"))
        .and(path("/api/intents"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({"intent": "save-work"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = Arc::new(
        SuperCoreAdapter::new(SuperCoreConfig::new(server.uri()).with_api_key("secret")).unwrap(),
    );
    assert_eq!(adapter.initialize().await, AdapterMode::Connected);

    let orchestrator = InputOrchestrator::new(ModalityConfig::default()).with_forwarder(adapter);
    let processed = orchestrator
        .process_input(json!({"type": "generic", "intent": "save-work", "action": "save"}))
        .await
        .unwrap();

    assert_eq!(processed.forwarded.unwrap()["accepted"], true);
}

#[tokio::test]
async fn connected_compliance_requests() {
    let server = status_server().await;
    Mock::given(method("POST"))
        .and(path("/api/compliance/notarize"))
        .and(body_partial_json(json!({"data": {"doc": 1}, "metadata": {"owner": "acct-1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "remote-1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/compliance/verify-asset"))
        .and(body_partial_json(json!({"assetId": "logo", "assetData": {"path": "logo.png"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = SuperCoreAdapter::new(SuperCoreConfig::new(server.uri())).unwrap();
    adapter.initialize().await;

    let record = adapter
        .notarize(&json!({"doc": 1}), NotarizationMetadata::new("document", "acct-1"))
        .await
        .unwrap();
    assert_eq!(record["id"], "remote-1");

    let verified = adapter.verify_asset("logo", &json!({"path": "logo.png"})).await.unwrap();
    assert_eq!(verified["valid"], true);

    assert_eq!(adapter.get_status().await["status"], "ok");
}

#[tokio::test]
async fn server_error_surfaces_as_request_failure() {
    let server = status_server().await;
    Mock::given(method("POST"))
        .and(path("/api/compliance/verify-asset"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let adapter = SuperCoreAdapter::new(SuperCoreConfig::new(server.uri())).unwrap();
    adapter.initialize().await;

    let err = adapter.verify_asset("logo", &json!({"path": "logo.png"})).await.unwrap_err();
    let AdapterError::RequestFailed(message) = err else {
        panic!("expected request failure");
    };
    assert!(message.contains("500"));
    assert!(message.contains("boom"));
}

#[tokio::test]
async fn failed_ping_selects_standalone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = SuperCoreAdapter::new(SuperCoreConfig::new(server.uri())).unwrap();
    assert_eq!(adapter.initialize().await, AdapterMode::Standalone);
    assert!(adapter.is_standalone().await);
}
