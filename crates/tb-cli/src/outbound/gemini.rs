use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tb_core::core::{
    BaseModel, CredentialProvider, JobId, JobStatus, ModelName, ServiceError, ServiceFuture,
    TextGenerator, TunedModel, TuningJob, TuningRequest, TuningService,
};

const TUNED_MODELS: &str = "tunedModels";
const LIST_PAGE_SIZE: &str = "1000";

/// REST client for the Generative Language API.
pub struct GeminiClient {
    http: reqwest::Client,
    /// Base URL including the API version, e.g. `https://host/v1beta`.
    api_base: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GeminiClient {
    pub fn new(
        api_base: String,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ServiceError> {
        let (name, value) = self.credentials.credential().await?.header();
        let resp = request
            .header(name, value)
            .send()
            .await
            .map_err(|e| ServiceError::Connection(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Connection(e.to_string()))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::warn!(status = status.as_u16(), body = %body, "service returned error");
            return Err(ServiceError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body.to_vec())
    }

    /// Tuned models owned by the caller, across all pages.
    pub async fn list_tuned_models(&self) -> Result<Vec<TunedModel>, ServiceError> {
        let url = format!("{}/{TUNED_MODELS}", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&url).query(&[("pageSize", LIST_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let body = self.execute(request).await?;
            let (page, next) = parse_tuned_models_page(&body)?;
            models.extend(page);
            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        tracing::debug!(count = models.len(), "listed tuned models");
        Ok(models)
    }

    async fn fetch_tuned_model(&self, job: &JobId) -> Result<TunedModel, ServiceError> {
        let url = format!("{}/{}", self.api_base, job_path(job));
        let body = self.execute(self.http.get(url)).await?;
        parse_tuned_model(&body)
    }
}

impl TuningService for GeminiClient {
    fn list_models(&self) -> ServiceFuture<'_, Vec<BaseModel>> {
        Box::pin(async move {
            let url = format!("{}/models", self.api_base);
            let mut models = Vec::new();
            let mut page_token: Option<String> = None;
            loop {
                let mut request = self.http.get(&url).query(&[("pageSize", LIST_PAGE_SIZE)]);
                if let Some(token) = &page_token {
                    request = request.query(&[("pageToken", token.as_str())]);
                }
                let body = self.execute(request).await?;
                let (page, next) = parse_models_page(&body)?;
                models.extend(page);
                match next {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
            tracing::debug!(count = models.len(), "listed models");
            Ok(models)
        })
    }

    fn submit<'a>(&'a self, request: &'a TuningRequest) -> ServiceFuture<'a, TuningJob> {
        Box::pin(async move {
            let url = format!("{}/{TUNED_MODELS}", self.api_base);
            let body = build_create_body(request);
            let http_request = self
                .http
                .post(url)
                .query(&[("tunedModelId", request.tuned_model_id.as_str())])
                .json(&body);
            let resp = self.execute(http_request).await?;
            let job = parse_operation(&resp, &request.tuned_model_id)?;
            tracing::info!(job = %job, source_model = %request.source_model, "tuning job submitted");
            Ok(TuningJob::submitted(job))
        })
    }

    fn status<'a>(&'a self, job: &'a JobId) -> ServiceFuture<'a, JobStatus> {
        Box::pin(async move { Ok(self.fetch_tuned_model(job).await?.state) })
    }

    fn resolve<'a>(&'a self, job: &'a JobId) -> ServiceFuture<'a, TunedModel> {
        Box::pin(self.fetch_tuned_model(job))
    }
}

impl TextGenerator for GeminiClient {
    fn generate<'a>(&'a self, model: &'a str, prompt: &'a str) -> ServiceFuture<'a, String> {
        Box::pin(async move {
            let url = format!("{}/{}:generateContent", self.api_base, model_path(model));
            let body = serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }],
                }],
            });
            let resp = self.execute(self.http.post(url).json(&body)).await?;
            parse_generated_text(&resp)
        })
    }
}

// ---------------------------------------------------------------------------
// Request bodies and resource paths
// ---------------------------------------------------------------------------

pub(crate) fn build_create_body(request: &TuningRequest) -> serde_json::Value {
    let examples: Vec<serde_json::Value> = request
        .examples
        .iter()
        .map(|e| {
            serde_json::json!({
                "textInput": e.input_text,
                "output": e.output_text,
            })
        })
        .collect();

    serde_json::json!({
        "displayName": request.display_name,
        "baseModel": request.source_model.as_str(),
        "tuningTask": {
            "hyperparameters": {
                "epochCount": request.hyperparameters.epoch_count,
                "batchSize": request.hyperparameters.batch_size,
                "learningRate": request.hyperparameters.learning_rate,
            },
            "trainingData": {
                "examples": { "examples": examples },
            },
        },
    })
}

/// Accepts both `tunedModels/x` and bare `x`.
pub(crate) fn job_path(job: &JobId) -> String {
    let id = job.as_str().trim_start_matches('/');
    if id.starts_with("tunedModels/") {
        id.to_owned()
    } else {
        format!("{TUNED_MODELS}/{id}")
    }
}

/// Resource names pass through; a bare name is taken as a base model.
pub(crate) fn model_path(model: &str) -> String {
    if model.contains('/') {
        model.to_owned()
    } else {
        format!("models/{model}")
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

pub(crate) fn parse_models_page(
    body: &[u8],
) -> Result<(Vec<BaseModel>, Option<String>), ServiceError> {
    let wire: ListModelsWire =
        serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    let models = wire
        .models
        .into_iter()
        .map(|m| BaseModel {
            name: ModelName::new(m.name),
            display_name: m.display_name,
            supported_generation_methods: m.supported_generation_methods,
        })
        .collect();
    let next = wire.next_page_token.filter(|t| !t.is_empty());
    Ok((models, next))
}

/// The created model's name comes from the long-running operation metadata,
/// falling back to the requested id.
pub(crate) fn parse_operation(body: &[u8], tuned_model_id: &str) -> Result<JobId, ServiceError> {
    let wire: OperationWire =
        serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    let name = wire
        .metadata
        .and_then(|m| m.tuned_model)
        .unwrap_or_else(|| format!("{TUNED_MODELS}/{tuned_model_id}"));
    Ok(JobId::new(name))
}

pub(crate) fn parse_tuned_model(body: &[u8]) -> Result<TunedModel, ServiceError> {
    let wire: TunedModelWire =
        serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    tuned_model_from_wire(wire)
}

pub(crate) fn parse_tuned_models_page(
    body: &[u8],
) -> Result<(Vec<TunedModel>, Option<String>), ServiceError> {
    let wire: ListTunedModelsWire =
        serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    let models = wire
        .tuned_models
        .into_iter()
        .map(tuned_model_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    let next = wire.next_page_token.filter(|t| !t.is_empty());
    Ok((models, next))
}

fn tuned_model_from_wire(wire: TunedModelWire) -> Result<TunedModel, ServiceError> {
    let state = JobStatus::from_wire(&wire.state)
        .ok_or_else(|| ServiceError::Decode(format!("unknown tuned model state: {}", wire.state)))?;
    Ok(TunedModel {
        name: JobId::new(wire.name),
        display_name: wire.display_name,
        base_model: wire.base_model,
        state,
    })
}

pub(crate) fn parse_generated_text(body: &[u8]) -> Result<String, ServiceError> {
    let wire: GenerateContentWire =
        serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    let Some(candidate) = wire.candidates.into_iter().next() else {
        return Err(ServiceError::Decode("response has no candidates".to_owned()));
    };
    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsWire {
    #[serde(default)]
    models: Vec<ModelWire>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelWire {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
struct OperationWire {
    metadata: Option<OperationMetadataWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationMetadataWire {
    tuned_model: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTunedModelsWire {
    #[serde(default)]
    tuned_models: Vec<TunedModelWire>,
    next_page_token: Option<String>,
}

fn default_state() -> String {
    "STATE_UNSPECIFIED".to_owned()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TunedModelWire {
    name: String,
    display_name: Option<String>,
    base_model: Option<String>,
    #[serde(default = "default_state")]
    state: String,
}

#[derive(Deserialize)]
struct GenerateContentWire {
    #[serde(default)]
    candidates: Vec<CandidateWire>,
}

#[derive(Deserialize)]
struct CandidateWire {
    content: Option<ContentWire>,
}

#[derive(Deserialize)]
struct ContentWire {
    #[serde(default)]
    parts: Vec<PartWire>,
}

#[derive(Deserialize)]
struct PartWire {
    text: Option<String>,
}

#[cfg(test)]
mod tests;
