use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use upscaler_core::{AppError, UpscaleConfig, UpscaleFactor};

use crate::auth::AccessTokenSource;

/// Remote image-upscale transform
#[async_trait]
pub trait ImageUpscaler: Send + Sync {
    /// Send `image` to the model and return the upscaled bytes.
    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>, AppError>;
}

/// Location of a publisher model's `:predict` method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionEndpoint {
    /// Scheme and host, without a trailing slash
    pub base_url: String,
    pub project_id: String,
    pub region: String,
    pub publisher: String,
    pub model: String,
}

impl PredictionEndpoint {
    pub fn from_config(config: &UpscaleConfig) -> Self {
        let base_url = config
            .prediction_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", config.region));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            region: config.region.clone(),
            publisher: config.publisher.clone(),
            model: config.model.clone(),
        }
    }

    pub fn predict_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/{}/models/{}:predict",
            self.base_url, self.project_id, self.region, self.publisher, self.model
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleParameters {
    pub sample_count: u32,
    pub factor: UpscaleFactor,
}

impl UpscaleParameters {
    pub fn from_config(config: &UpscaleConfig) -> Self {
        Self {
            sample_count: config.sample_count,
            factor: config.upscale_factor,
        }
    }
}

impl Default for UpscaleParameters {
    fn default() -> Self {
        Self {
            sample_count: 1,
            factor: UpscaleFactor::X2,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: RequestParameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: &'static str,
    image: EncodedImage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedImage {
    bytes_base64_encoded: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestParameters {
    sample_count: u32,
    mode: &'static str,
    upscale_config: UpscaleConfigPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpscaleConfigPayload {
    upscale_factor: UpscaleFactor,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

/// Client for the hosted upscale model
pub struct PredictionClient {
    http_client: reqwest::Client,
    endpoint: PredictionEndpoint,
    parameters: UpscaleParameters,
    tokens: Arc<dyn AccessTokenSource>,
}

impl Debug for PredictionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PredictionClient")
            .field("endpoint", &self.endpoint)
            .field("parameters", &self.parameters)
            .field("tokens", &"<AccessTokenSource>")
            .finish()
    }
}

impl PredictionClient {
    pub fn new(
        endpoint: PredictionEndpoint,
        parameters: UpscaleParameters,
        tokens: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
            parameters,
            tokens,
        })
    }

    pub fn from_config(
        config: &UpscaleConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, AppError> {
        Self::new(
            PredictionEndpoint::from_config(config),
            UpscaleParameters::from_config(config),
            tokens,
            config.http_timeout(),
        )
    }

    pub fn endpoint(&self) -> &PredictionEndpoint {
        &self.endpoint
    }

    fn build_request(&self, image: &[u8]) -> PredictRequest {
        PredictRequest {
            instances: vec![Instance {
                prompt: "",
                image: EncodedImage {
                    bytes_base64_encoded: base64::engine::general_purpose::STANDARD.encode(image),
                },
            }],
            parameters: RequestParameters {
                sample_count: self.parameters.sample_count,
                mode: "upscale",
                upscale_config: UpscaleConfigPayload {
                    upscale_factor: self.parameters.factor,
                },
            },
        }
    }

    fn decode_response(body: &str) -> Result<Vec<u8>, AppError> {
        let parsed: PredictResponse = serde_json::from_str(body).map_err(|e| {
            AppError::Protocol(format!("Failed to parse prediction response: {}", e))
        })?;

        let encoded = parsed
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.bytes_base64_encoded)
            .ok_or_else(|| {
                AppError::Protocol("Prediction response has no image payload".to_string())
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| AppError::Protocol(format!("Prediction payload is not valid base64: {}", e)))
    }
}

#[async_trait]
impl ImageUpscaler for PredictionClient {
    async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>, AppError> {
        let start = std::time::Instant::now();
        let token = self.tokens.access_token().await?;
        let request = self.build_request(image);

        let response = self
            .http_client
            .post(self.endpoint.predict_url())
            .bearer_auth(&token.value)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, model = %self.endpoint.model, "Prediction request failed");
                AppError::Internal(format!("Prediction request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read prediction response: {}", e)))?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                model = %self.endpoint.model,
                "Prediction endpoint returned an error"
            );
            return Err(AppError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let output = Self::decode_response(&body)?;

        info!(
            model = %self.endpoint.model,
            input_bytes = image.len(),
            output_bytes = output.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Upscale prediction completed"
        );

        Ok(output)
    }
}
