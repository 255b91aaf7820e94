//! End-to-end tuning run: prepare data, pick a base model, submit, wait for
//! the job, and optionally evaluate the tuned model.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use tb_core::core::{
    select_base_model, Hyperparameters, JobId, JobPoller, ModelName, PipelineError, PollPolicy,
    RunId, Sleeper, TextGenerator, TunedModel, TuningRequest, TuningService,
};
use tracing::Instrument;

use crate::evaluation::{evaluate, EvaluationReport};

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Clone, Debug)]
pub struct RunSettings {
    pub base_model: Option<String>,
    pub display_name: Option<String>,
    pub hyperparameters: Hyperparameters,
    pub poll_policy: PollPolicy,
}

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub data_file: PathBuf,
    pub tuned_model_id: String,
    pub test_file: Option<PathBuf>,
    /// Poll until the job finishes; otherwise return right after submission.
    pub wait: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub job: JobId,
    pub base_model: ModelName,
    pub training_examples: usize,
    pub tuned_model: Option<TunedModel>,
    pub evaluation: Option<EvaluationReport>,
}

pub struct TuningRunner<'a> {
    service: &'a dyn TuningService,
    generator: &'a dyn TextGenerator,
    sleeper: &'a dyn Sleeper,
    settings: RunSettings,
}

impl<'a> TuningRunner<'a> {
    pub fn new(
        service: &'a dyn TuningService,
        generator: &'a dyn TextGenerator,
        sleeper: &'a dyn Sleeper,
        settings: RunSettings,
    ) -> Self {
        Self {
            service,
            generator,
            sleeper,
            settings,
        }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new(uuid::Uuid::new_v4().to_string());
        let span = tracing::info_span!("tuning_run", run_id = %run_id);
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        request: &RunRequest,
    ) -> Result<RunReport, PipelineError> {
        // Both files are read before anything is sent to the service.
        let examples = tb_dataset::load(&request.data_file)?;
        let test_examples = match &request.test_file {
            Some(path) => Some(tb_dataset::load(path)?),
            None => None,
        };

        let models = self.service.list_models().await?;
        let base = select_base_model(&models, self.settings.base_model.as_deref())?;
        tracing::info!(base_model = %base.name, "base model selected");

        let tuning_request = TuningRequest {
            source_model: base.name.clone(),
            tuned_model_id: request.tuned_model_id.clone(),
            display_name: self
                .settings
                .display_name
                .clone()
                .unwrap_or_else(|| request.tuned_model_id.clone()),
            hyperparameters: self.settings.hyperparameters.clone(),
            examples,
        };
        tuning_request.validate()?;
        let training_examples = tuning_request.examples.len();

        let job = self.service.submit(&tuning_request).await?;

        let mut report = RunReport {
            run_id,
            job: job.id.clone(),
            base_model: base.name.clone(),
            training_examples,
            tuned_model: None,
            evaluation: None,
        };
        if !request.wait {
            return Ok(report);
        }

        let poller = JobPoller::new(self.service, self.sleeper, self.settings.poll_policy.clone());
        let tuned = poller.poll(&job.id).await?;
        tracing::info!(model = %tuned.name, "tuned model ready");

        if let Some(test_examples) = test_examples {
            let evaluation =
                evaluate(self.generator, tuned.name.as_str(), &test_examples).await?;
            report.evaluation = Some(evaluation);
        }
        report.tuned_model = Some(tuned);
        Ok(report)
    }
}
