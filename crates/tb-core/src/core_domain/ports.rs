use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::core::{
    BaseModel, Credential, JobId, JobStatus, ServiceError, TunedModel, TuningJob, TuningRequest,
};

/// Boxed future returned by the object-safe async ports below.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// TuningService: the narrow slice of the vendor API the pipeline depends on
// ---------------------------------------------------------------------------

pub trait TuningService: Send + Sync {
    fn list_models(&self) -> ServiceFuture<'_, Vec<BaseModel>>;

    fn submit<'a>(&'a self, request: &'a TuningRequest) -> ServiceFuture<'a, TuningJob>;

    fn status<'a>(&'a self, job: &'a JobId) -> ServiceFuture<'a, JobStatus>;

    fn resolve<'a>(&'a self, job: &'a JobId) -> ServiceFuture<'a, TunedModel>;
}

// ---------------------------------------------------------------------------
// TextGenerator: runs a prompt against a (tuned) model, used for evaluation
// ---------------------------------------------------------------------------

pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, model: &'a str, prompt: &'a str) -> ServiceFuture<'a, String>;
}

// ---------------------------------------------------------------------------
// CredentialProvider: supplies the credential for each outgoing call
// ---------------------------------------------------------------------------

pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> ServiceFuture<'_, Credential>;
}

// ---------------------------------------------------------------------------
// Sleeper: injectable wait between status checks for deterministic testing
// ---------------------------------------------------------------------------

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
