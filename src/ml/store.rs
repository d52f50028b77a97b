use crate::error::{AppError, Result};
use crate::ml::classifier::LogisticRegressionClassifier;
use crate::ml::encoder::LabelEncoder;
use crate::ml::features::FeatureExtractor;
use crate::ml::models::ModelType;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bumped whenever the layout of any persisted artifact changes
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.bin";
pub const TYPE_CLASSIFIER_FILE: &str = "type_clf_lr.bin";
pub const URGENCY_CLASSIFIER_FILE: &str = "urgency_clf_lr.bin";
pub const TYPE_ENCODER_FILE: &str = "type_label_encoder.bin";
pub const URGENCY_ENCODER_FILE: &str = "urgency_label_encoder.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Description of a trained artifact set, checked on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema_version: u32,
    pub model_type: ModelType,
    pub type_classes: Vec<String>,
    pub urgency_classes: Vec<String>,
    pub n_features: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub type_accuracy: Option<f64>,
    pub urgency_accuracy: Option<f64>,
    pub evaluation_meaningful: bool,
    pub trained_at: DateTime<Utc>,
    pub top_features: Vec<String>,
}

/// The five co-versioned trained objects plus their manifest
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub vectorizer: FeatureExtractor,
    pub type_classifier: LogisticRegressionClassifier,
    pub urgency_classifier: LogisticRegressionClassifier,
    pub type_encoder: LabelEncoder,
    pub urgency_encoder: LabelEncoder,
    pub manifest: ArtifactManifest,
}

impl ArtifactSet {
    /// Check that every component is internally sound and agrees with the
    /// manifest
    pub fn validate(&self) -> Result<()> {
        let m = &self.manifest;

        self.vectorizer
            .check_consistency()
            .map_err(|e| AppError::artifact(VECTORIZER_FILE, e))?;
        self.type_classifier
            .check_consistency()
            .map_err(|e| AppError::artifact(TYPE_CLASSIFIER_FILE, e))?;
        self.urgency_classifier
            .check_consistency()
            .map_err(|e| AppError::artifact(URGENCY_CLASSIFIER_FILE, e))?;
        self.type_encoder
            .check_consistency()
            .map_err(|e| AppError::artifact(TYPE_ENCODER_FILE, e))?;
        self.urgency_encoder
            .check_consistency()
            .map_err(|e| AppError::artifact(URGENCY_ENCODER_FILE, e))?;

        if self.type_encoder.classes() != m.type_classes.as_slice() {
            return Err(AppError::SchemaMismatch(format!(
                "department classes {:?} differ from manifest {:?}",
                self.type_encoder.classes(),
                m.type_classes
            )));
        }
        if self.urgency_encoder.classes() != m.urgency_classes.as_slice() {
            return Err(AppError::SchemaMismatch(format!(
                "urgency classes {:?} differ from manifest {:?}",
                self.urgency_encoder.classes(),
                m.urgency_classes
            )));
        }
        if self.vectorizer.n_features() != m.n_features {
            return Err(AppError::SchemaMismatch(format!(
                "vectorizer has {} features, manifest records {}",
                self.vectorizer.n_features(),
                m.n_features
            )));
        }

        for (name, clf, encoder) in [
            ("department", &self.type_classifier, &self.type_encoder),
            ("urgency", &self.urgency_classifier, &self.urgency_encoder),
        ] {
            if clf.n_features() != m.n_features {
                return Err(AppError::SchemaMismatch(format!(
                    "{name} classifier expects {} features, manifest records {}",
                    clf.n_features(),
                    m.n_features
                )));
            }
            if clf.n_classes() != encoder.n_classes() {
                return Err(AppError::SchemaMismatch(format!(
                    "{name} classifier has {} classes, encoder has {}",
                    clf.n_classes(),
                    encoder.n_classes()
                )));
            }
        }

        Ok(())
    }
}

/// Directory-backed persistence for artifact sets
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Quick readiness probe: a manifest is present
    pub fn exists(&self) -> bool {
        self.dir.join(MANIFEST_FILE).is_file()
    }

    /// Remove any previous manifest, write the five blobs, then the manifest.
    ///
    /// A reader that sees the manifest therefore sees a complete set; a save
    /// that fails partway leaves the directory without one.
    pub fn save(&self, artifacts: &ArtifactSet) -> Result<()> {
        artifacts.validate()?;
        std::fs::create_dir_all(&self.dir)?;

        match std::fs::remove_file(self.dir.join(MANIFEST_FILE)) {
            Ok(()) => debug!("Removed previous manifest"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.write_blob(VECTORIZER_FILE, &artifacts.vectorizer)?;
        self.write_blob(TYPE_CLASSIFIER_FILE, &artifacts.type_classifier)?;
        self.write_blob(URGENCY_CLASSIFIER_FILE, &artifacts.urgency_classifier)?;
        self.write_blob(TYPE_ENCODER_FILE, &artifacts.type_encoder)?;
        self.write_blob(URGENCY_ENCODER_FILE, &artifacts.urgency_encoder)?;

        let manifest = serde_json::to_vec_pretty(&artifacts.manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), manifest)?;

        info!(dir = %self.dir.display(), "💾 Saved model artifacts");
        Ok(())
    }

    /// Load a complete artifact set or fail without partial state
    pub fn load(&self) -> Result<ArtifactSet> {
        let manifest = self.read_manifest()?;
        if manifest.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(AppError::SchemaMismatch(format!(
                "artifacts use schema version {}, expected {}",
                manifest.schema_version, ARTIFACT_SCHEMA_VERSION
            )));
        }

        let artifacts = ArtifactSet {
            vectorizer: self.read_blob(VECTORIZER_FILE)?,
            type_classifier: self.read_blob(TYPE_CLASSIFIER_FILE)?,
            urgency_classifier: self.read_blob(URGENCY_CLASSIFIER_FILE)?,
            type_encoder: self.read_blob(TYPE_ENCODER_FILE)?,
            urgency_encoder: self.read_blob(URGENCY_ENCODER_FILE)?,
            manifest,
        };
        artifacts.validate()?;

        info!(
            dir = %self.dir.display(),
            vocab_size = artifacts.vectorizer.vocab_size(),
            "📂 Loaded model artifacts"
        );
        Ok(artifacts)
    }

    /// Read only the manifest
    pub fn read_manifest(&self) -> Result<ArtifactManifest> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "no trained models in {}",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(AppError::artifact(MANIFEST_FILE, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| AppError::artifact(MANIFEST_FILE, e))
    }

    fn write_blob<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        std::fs::write(self.dir.join(name), bytes)?;
        debug!(artifact = name, "Wrote artifact");
        Ok(())
    }

    fn read_blob<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bytes = std::fs::read(self.dir.join(name)).map_err(|e| AppError::artifact(name, e))?;
        bincode::deserialize(&bytes).map_err(|e| AppError::artifact(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("absent"));

        assert!(!store.exists());
        assert!(matches!(store.load(), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_manifest_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), b"{not json").unwrap();
        let store = ModelStore::new(dir.path());

        assert!(store.exists());
        match store.load() {
            Err(AppError::ArtifactLoad { artifact, .. }) => assert_eq!(artifact, MANIFEST_FILE),
            other => panic!("expected artifact error, got {other:?}"),
        }
    }
}
