//! Shared helpers for integration tests

#![allow(dead_code)]

use ticket_triage::config::ClassifierSettings;
use ticket_triage::data::{prepare_data, sample_table};
use ticket_triage::ml::{PipelineConfig, TicketClassifier};
use ticket_triage::models::TrainingRecord;

/// The bundled sample rows, cleaned with raw labels
pub fn sample_records() -> Vec<TrainingRecord> {
    prepare_data(&sample_table(), false).expect("sample table should prepare")
}

/// Classifier fitted on every sample row
pub fn fitted_classifier() -> TicketClassifier {
    let mut classifier = TicketClassifier::new(PipelineConfig::default());
    classifier
        .fit(&sample_records())
        .expect("sample data should fit");
    classifier
}

/// Settings pointing at a private model directory
pub fn settings_in(dir: &std::path::Path) -> ClassifierSettings {
    ClassifierSettings {
        model_dir: dir.to_path_buf(),
        train_on_startup: false,
        ..ClassifierSettings::default()
    }
}
