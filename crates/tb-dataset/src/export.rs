use std::io::Write;

use serde::Serialize;
use tb_core::core::{DatasetError, TuningExample};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExampleStats {
    pub input_words: usize,
    pub output_words: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub examples: Vec<ExampleStats>,
}

impl DatasetStats {
    pub fn total_input_words(&self) -> usize {
        self.examples.iter().map(|e| e.input_words).sum()
    }

    pub fn total_output_words(&self) -> usize {
        self.examples.iter().map(|e| e.output_words).sum()
    }
}

/// Whitespace-separated word counts per example.
pub fn dataset_stats(examples: &[TuningExample]) -> DatasetStats {
    DatasetStats {
        examples: examples
            .iter()
            .map(|example| ExampleStats {
                input_words: example.input_text.split_whitespace().count(),
                output_words: example.output_text.split_whitespace().count(),
            })
            .collect(),
    }
}

/// Writes converted examples as JSONL, one `{"text_input", "output"}` object
/// per line.
pub fn write_jsonl<W: Write>(examples: &[TuningExample], mut writer: W) -> Result<(), DatasetError> {
    for example in examples {
        serde_json::to_writer(&mut writer, example)
            .map_err(|e| DatasetError::Export(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| DatasetError::Export(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| DatasetError::Export(e.to_string()))
}
