//! On-disk artifact pair: fitted preprocessor plus winning model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CostError, Result};
use crate::preprocessing::{FeatureLayout, Preprocessor};
use crate::training::{CandidateKind, ModelMetrics, SelectionReport, TrainedModel};

/// Current on-disk format version for both files
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "model.json";

/// Descriptive data stored alongside the winning model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Winner's display name
    pub name: String,
    pub kind: CandidateKind,
    /// Layout of the feature vectors the model was trained on
    pub feature_layout: FeatureLayout,
    pub target_name: String,
    pub train_r2: f64,
    pub test_metrics: ModelMetrics,
    pub low_confidence: bool,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetadata {
    /// Describe the winner of a selection run
    pub fn from_report(
        report: &SelectionReport,
        preprocessor: &Preprocessor,
        target_name: impl Into<String>,
    ) -> Self {
        let best = report.winner_score();
        Self {
            name: best.name().to_string(),
            kind: best.kind,
            feature_layout: preprocessor.layout(),
            target_name: target_name.into(),
            train_r2: best.train_r2,
            test_metrics: best.test.clone(),
            low_confidence: report.low_confidence,
            trained_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreprocessorArtifact {
    format_version: u32,
    created_at: DateTime<Utc>,
    preprocessor: Preprocessor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    created_at: DateTime<Utc>,
    metadata: ModelMetadata,
    model: TrainedModel,
}

/// A loaded, mutually consistent preprocessor and model
#[derive(Debug, Clone)]
pub struct ArtifactPair {
    pub preprocessor: Preprocessor,
    pub model: TrainedModel,
    pub metadata: ModelMetadata,
}

/// Reads and writes the artifact pair in one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(PREPROCESSOR_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    /// Both files are present
    pub fn exists(&self) -> bool {
        self.preprocessor_path().is_file() && self.model_path().is_file()
    }

    /// Persist the pair, replacing any previous one.
    ///
    /// Both files are written under temporary names first. Existing files are
    /// moved aside before the new ones are renamed into place and restored if
    /// either rename fails, so the directory always holds one complete pair.
    pub fn save(
        &self,
        preprocessor: &Preprocessor,
        model: &TrainedModel,
        metadata: &ModelMetadata,
    ) -> Result<()> {
        if !preprocessor.is_fitted() {
            return Err(CostError::NotFitted("Preprocessor".to_string()));
        }
        check_layout(&metadata.feature_layout, &preprocessor.layout())?;

        let now = Utc::now();
        let pre_json = serde_json::to_string_pretty(&PreprocessorArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: now,
            preprocessor: preprocessor.clone(),
        })?;
        let model_json = serde_json::to_string_pretty(&ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: now,
            metadata: metadata.clone(),
            model: model.clone(),
        })?;

        fs::create_dir_all(&self.dir)?;
        let pre_tmp = tmp_path(&self.preprocessor_path());
        let model_tmp = tmp_path(&self.model_path());

        let written = fs::write(&pre_tmp, pre_json).and_then(|_| fs::write(&model_tmp, model_json));
        if let Err(e) = written {
            let _ = fs::remove_file(&pre_tmp);
            let _ = fs::remove_file(&model_tmp);
            return Err(e.into());
        }

        let staged = [
            (pre_tmp, self.preprocessor_path()),
            (model_tmp, self.model_path()),
        ];
        commit(&staged)?;

        info!(
            dir = %self.dir.display(),
            model = %metadata.name,
            features = metadata.feature_layout.feature_names.len(),
            "Artifacts saved"
        );
        Ok(())
    }

    /// Load both files and check they describe the same feature layout
    pub fn load(&self) -> Result<ArtifactPair> {
        for path in [self.preprocessor_path(), self.model_path()] {
            if !path.is_file() {
                return Err(CostError::ArtifactMissing { path });
            }
        }

        let pre: PreprocessorArtifact =
            serde_json::from_str(&fs::read_to_string(self.preprocessor_path())?)?;
        let model: ModelArtifact = serde_json::from_str(&fs::read_to_string(self.model_path())?)?;

        for (file, version) in [
            (PREPROCESSOR_FILE, pre.format_version),
            (MODEL_FILE, model.format_version),
        ] {
            if version != ARTIFACT_FORMAT_VERSION {
                return Err(CostError::ArtifactMismatch(format!(
                    "{} has format version {}, expected {}",
                    file, version, ARTIFACT_FORMAT_VERSION
                )));
            }
        }
        if !pre.preprocessor.is_fitted() {
            return Err(CostError::ArtifactMismatch(
                "stored preprocessor was never fitted".to_string(),
            ));
        }
        check_layout(&model.metadata.feature_layout, &pre.preprocessor.layout())?;

        debug!(dir = %self.dir.display(), model = %model.metadata.name, "Artifacts loaded");
        Ok(ArtifactPair {
            preprocessor: pre.preprocessor,
            model: model.model,
            metadata: model.metadata,
        })
    }
}

/// Rename each staged file over its target, all or nothing
fn commit(staged: &[(PathBuf, PathBuf)]) -> Result<()> {
    let mut backups = Vec::new();
    let mut placed = Vec::new();

    match swap_in(staged, &mut backups, &mut placed) {
        Ok(()) => {
            for (backup, _) in &backups {
                let _ = fs::remove_file(backup);
            }
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Artifact commit failed, restoring previous pair");
            for target in &placed {
                let _ = fs::remove_file(target);
            }
            for (backup, target) in &backups {
                if let Err(restore) = fs::rename(backup, target) {
                    warn!(path = %target.display(), error = %restore, "Could not restore artifact");
                }
            }
            for (tmp, _) in staged {
                let _ = fs::remove_file(tmp);
            }
            Err(e.into())
        }
    }
}

fn swap_in(
    staged: &[(PathBuf, PathBuf)],
    backups: &mut Vec<(PathBuf, PathBuf)>,
    placed: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for (_, target) in staged {
        if target.is_file() {
            let backup = sibling_path(target, ".bak");
            fs::rename(target, &backup)?;
            backups.push((backup, target.clone()));
        }
    }
    for (tmp, target) in staged {
        fs::rename(tmp, target)?;
        placed.push(target.clone());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    sibling_path(path, ".tmp")
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn check_layout(model: &FeatureLayout, preprocessor: &FeatureLayout) -> Result<()> {
    if model == preprocessor {
        return Ok(());
    }
    Err(CostError::ArtifactMismatch(format!(
        "model expects layout v{} with {} features, preprocessor produces v{} with {}",
        model.version,
        model.feature_names.len(),
        preprocessor.version,
        preprocessor.feature_names.len()
    )))
}
