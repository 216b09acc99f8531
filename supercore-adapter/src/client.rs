//! HTTP client for the SuperCore service.

use async_trait::async_trait;
use compliance::{NotarizationMetadata, NotarizationService};
use modality::{IntentForwarder, ModalityError, NormalizedIntent};
use reqwest::{header, Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SuperCoreConfig;
use crate::types::{AdapterError, AdapterMode, Result};

/// Boundary to the SuperCore service. Falls back to standalone behaviour
/// when the service is unreachable at initialization.
pub struct SuperCoreAdapter {
    client: Client,
    config: SuperCoreConfig,
    mode: Arc<RwLock<AdapterMode>>,
    /// Local notarization used in standalone mode
    notary: Option<Arc<NotarizationService>>,
}

impl SuperCoreAdapter {
    /// Create an adapter. Starts in standalone mode until
    /// [`initialize`](Self::initialize) reaches the service.
    pub fn new(config: SuperCoreConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            mode: Arc::new(RwLock::new(AdapterMode::Standalone)),
            notary: None,
        })
    }

    /// Attach the local notarization service used in standalone mode.
    pub fn with_notarization_service(mut self, notary: Arc<NotarizationService>) -> Self {
        self.notary = Some(notary);
        self
    }

    pub fn config(&self) -> &SuperCoreConfig {
        &self.config
    }

    pub async fn mode(&self) -> AdapterMode {
        *self.mode.read().await
    }

    pub async fn is_standalone(&self) -> bool {
        self.mode().await == AdapterMode::Standalone
    }

    /// Ping the service and pick the mode. Never fails.
    pub async fn initialize(&self) -> AdapterMode {
        let mode = match self.get_json("/api/status").await {
            Ok(status) => {
                info!(base_url = %self.config.base_url, status = %status, "Connected to SuperCore");
                AdapterMode::Connected
            }
            Err(e) => {
                warn!(
                    base_url = %self.config.base_url,
                    error = %e,
                    "SuperCore unreachable, running in standalone mode"
                );
                AdapterMode::Standalone
            }
        };

        *self.mode.write().await = mode;
        mode
    }

    /// Submit a normalized intent.
    pub async fn process_intent(&self, intent: &NormalizedIntent) -> Result<Value> {
        if self.is_standalone().await {
            debug!(intent = %intent.intent, "Processing intent locally");
            let mut echoed = serde_json::to_value(intent).map_err(|e| AdapterError::Parse(e.to_string()))?;
            if let Value::Object(map) = &mut echoed {
                map.insert("mode".to_string(), json!("standalone"));
            }
            return Ok(echoed);
        }

        self.post_json("/api/intents", intent).await
    }

    /// Ask the service to verify an asset.
    pub async fn verify_asset(&self, asset_id: &str, asset_data: &Value) -> Result<Value> {
        if self.is_standalone().await {
            return Err(AdapterError::Standalone("asset verification".to_string()));
        }

        self.post_json(
            "/api/compliance/verify-asset",
            &json!({ "assetId": asset_id, "assetData": asset_data }),
        )
        .await
    }

    /// Notarize data remotely, or with the local service in standalone mode.
    pub async fn notarize(&self, data: &Value, metadata: NotarizationMetadata) -> Result<Value> {
        if self.is_standalone().await {
            let notary = self
                .notary
                .as_ref()
                .ok_or_else(|| AdapterError::Standalone("no local notarization service".to_string()))?;
            let notarization = notary.notarize(data, metadata).await?;
            return serde_json::to_value(notarization).map_err(|e| AdapterError::Parse(e.to_string()));
        }

        self.post_json(
            "/api/compliance/notarize",
            &json!({ "data": data, "metadata": metadata }),
        )
        .await
    }

    /// Service status. Failures are reported in the body.
    pub async fn get_status(&self) -> Value {
        match self.get_json("/api/status").await {
            Ok(status) => status,
            Err(e) => json!({ "status": "unknown", "error": e.to_string() }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header(header::AUTHORIZATION, format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let request = self.authorize(self.client.get(self.url(path)));
        Self::send(request).await
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let request = self.authorize(self.client.post(self.url(path))).json(body);
        Self::send(request).await
    }

    async fn send(request: RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }
}

#[async_trait]
impl IntentForwarder for SuperCoreAdapter {
    fn name(&self) -> &str {
        "supercore"
    }

    async fn forward(&self, intent: &NormalizedIntent) -> modality::Result<Value> {
        self.process_intent(intent)
            .await
            .map_err(|e| ModalityError::Forward(e.to_string()))
    }
}
