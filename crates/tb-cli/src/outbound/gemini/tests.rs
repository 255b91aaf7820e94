use super::*;
use tb_core::core::{Hyperparameters, TuningExample};

fn make_request() -> TuningRequest {
    TuningRequest {
        source_model: ModelName::new("models/gemini-1.5-flash-001-tuning"),
        tuned_model_id: "support-bot-v1".to_owned(),
        display_name: "support bot".to_owned(),
        hyperparameters: Hyperparameters {
            epoch_count: 5,
            batch_size: 4,
            learning_rate: 0.001,
        },
        examples: vec![
            TuningExample::new("You are helpful. Hi", "Hello!"),
            TuningExample::new("2+2?", "4"),
        ],
    }
}

// ---------------------------------------------------------------------------
// build_create_body
// ---------------------------------------------------------------------------

#[test]
fn test_build_create_body() {
    let body = build_create_body(&make_request());

    assert_eq!(body["displayName"], "support bot");
    assert_eq!(body["baseModel"], "models/gemini-1.5-flash-001-tuning");

    let hp = &body["tuningTask"]["hyperparameters"];
    assert_eq!(hp["epochCount"], 5);
    assert_eq!(hp["batchSize"], 4);
    assert_eq!(hp["learningRate"], 0.001);

    let examples = body["tuningTask"]["trainingData"]["examples"]["examples"]
        .as_array()
        .unwrap();
    assert_eq!(examples.len(), 2);
    assert_eq!(examples[0]["textInput"], "You are helpful. Hi");
    assert_eq!(examples[0]["output"], "Hello!");
    assert_eq!(examples[1]["textInput"], "2+2?");
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[test]
fn test_job_path_prefixes_bare_id() {
    assert_eq!(job_path(&JobId::new("support-bot-v1")), "tunedModels/support-bot-v1");
    assert_eq!(
        job_path(&JobId::new("tunedModels/support-bot-v1")),
        "tunedModels/support-bot-v1"
    );
}

#[test]
fn test_model_path() {
    assert_eq!(model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
    assert_eq!(model_path("tunedModels/support-bot-v1"), "tunedModels/support-bot-v1");
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[test]
fn test_parse_models_page() {
    let body = br#"{
        "models": [
            {
                "name": "models/gemini-1.5-flash-001-tuning",
                "displayName": "Gemini 1.5 Flash 001 Tuning",
                "supportedGenerationMethods": ["generateContent", "createTunedModel"]
            },
            { "name": "models/embedding-001" }
        ],
        "nextPageToken": "page-2"
    }"#;

    let (models, next) = parse_models_page(body).unwrap();
    assert_eq!(models.len(), 2);
    assert!(models[0].is_tunable());
    assert_eq!(
        models[0].display_name.as_deref(),
        Some("Gemini 1.5 Flash 001 Tuning")
    );
    assert!(!models[1].is_tunable());
    assert_eq!(next.as_deref(), Some("page-2"));
}

#[test]
fn test_parse_models_last_page() {
    let (models, next) = parse_models_page(br#"{"models": [], "nextPageToken": ""}"#).unwrap();
    assert!(models.is_empty());
    assert!(next.is_none());

    let (_, next) = parse_models_page(b"{}").unwrap();
    assert!(next.is_none());
}

#[test]
fn test_parse_operation_uses_metadata() {
    let body = br#"{
        "name": "tunedModels/support-bot-v1/operations/abc",
        "metadata": {
            "@type": "type.googleapis.com/google.ai.generativelanguage.v1beta.CreateTunedModelMetadata",
            "tunedModel": "tunedModels/support-bot-v1",
            "totalSteps": 12
        }
    }"#;
    let job = parse_operation(body, "ignored").unwrap();
    assert_eq!(job.as_str(), "tunedModels/support-bot-v1");
}

#[test]
fn test_parse_operation_falls_back_to_requested_id() {
    let job = parse_operation(br#"{"name": "operations/xyz"}"#, "support-bot-v1").unwrap();
    assert_eq!(job.as_str(), "tunedModels/support-bot-v1");
}

#[test]
fn test_parse_tuned_model_states() {
    let creating = parse_tuned_model(
        br#"{"name": "tunedModels/a", "baseModel": "models/gemini-1.0-pro-001", "state": "CREATING"}"#,
    )
    .unwrap();
    assert_eq!(creating.state, JobStatus::Pending);
    assert_eq!(creating.base_model.as_deref(), Some("models/gemini-1.0-pro-001"));

    let active = parse_tuned_model(
        br#"{"name": "tunedModels/a", "displayName": "A", "state": "ACTIVE"}"#,
    )
    .unwrap();
    assert_eq!(active.state, JobStatus::Active);
    assert_eq!(active.display_name.as_deref(), Some("A"));

    let failed = parse_tuned_model(br#"{"name": "tunedModels/a", "state": "FAILED"}"#).unwrap();
    assert_eq!(failed.state, JobStatus::Failed);

    let unspecified = parse_tuned_model(br#"{"name": "tunedModels/a"}"#).unwrap();
    assert_eq!(unspecified.state, JobStatus::Pending);
}

#[test]
fn test_parse_tuned_models_page() {
    let body = br#"{
        "tunedModels": [
            {"name": "tunedModels/a", "baseModel": "models/gemini-1.0-pro-001", "state": "ACTIVE"},
            {"name": "tunedModels/b", "state": "CREATING"}
        ],
        "nextPageToken": "next"
    }"#;
    let (models, next) = parse_tuned_models_page(body).unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].state, JobStatus::Active);
    assert_eq!(models[1].state, JobStatus::Pending);
    assert_eq!(next.as_deref(), Some("next"));

    let (models, next) = parse_tuned_models_page(b"{}").unwrap();
    assert!(models.is_empty());
    assert!(next.is_none());
}

#[test]
fn test_parse_tuned_model_unknown_state() {
    let result = parse_tuned_model(br#"{"name": "tunedModels/a", "state": "EXPLODED"}"#);
    assert!(matches!(result, Err(ServiceError::Decode(msg)) if msg.contains("EXPLODED")));
}

#[test]
fn test_parse_generated_text_joins_parts() {
    let body = br#"{
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": "Hello"}, {"text": ", world"}]
            },
            "finishReason": "STOP"
        }]
    }"#;
    assert_eq!(parse_generated_text(body).unwrap(), "Hello, world");
}

#[test]
fn test_parse_generated_text_without_candidates() {
    let result = parse_generated_text(br#"{"candidates": []}"#);
    assert!(matches!(result, Err(ServiceError::Decode(_))));
}

#[test]
fn test_parse_invalid_json() {
    assert!(matches!(
        parse_tuned_model(b"not json"),
        Err(ServiceError::Decode(_))
    ));
}
