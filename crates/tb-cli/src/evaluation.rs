use std::path::Path;

use serde::Serialize;
use tb_core::core::{ServiceError, TextGenerator, TuningExample};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub input_text: String,
    pub expected: String,
    pub actual: String,
    /// Compared after trimming surrounding whitespace.
    pub exact_match: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model: String,
    pub total: usize,
    pub exact_matches: usize,
    pub exact_match_rate: f64,
    pub records: Vec<EvaluationRecord>,
}

/// Runs every test example through `model`, one request at a time.
pub async fn evaluate(
    generator: &dyn TextGenerator,
    model: &str,
    examples: &[TuningExample],
) -> Result<EvaluationReport, ServiceError> {
    let mut records = Vec::with_capacity(examples.len());
    for (index, example) in examples.iter().enumerate() {
        let actual = generator.generate(model, &example.input_text).await?;
        let exact_match = actual.trim() == example.output_text.trim();
        tracing::debug!(index, exact_match, "evaluated example");
        records.push(EvaluationRecord {
            input_text: example.input_text.clone(),
            expected: example.output_text.clone(),
            actual,
            exact_match,
        });
    }

    let total = records.len();
    let exact_matches = records.iter().filter(|r| r.exact_match).count();
    let exact_match_rate = if total == 0 {
        0.0
    } else {
        exact_matches as f64 / total as f64
    };
    tracing::info!(model, total, exact_matches, "evaluation finished");

    Ok(EvaluationReport {
        model: model.to_owned(),
        total,
        exact_matches,
        exact_match_rate,
        records,
    })
}

/// Writes `results` as pretty-printed JSON.
pub fn save_results<T: Serialize>(results: &T, path: &Path) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)
        .map_err(|e| anyhow::anyhow!("failed to write results to {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "results saved");
    Ok(())
}
