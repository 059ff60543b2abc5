//! Artifact persistence
//!
//! The fitted preprocessor and the winning model are stored as two JSON files
//! in one directory. They are written together and loaded together.

mod artifacts;

pub use artifacts::{
    ArtifactPair, ArtifactStore, ModelMetadata, ARTIFACT_FORMAT_VERSION, MODEL_FILE,
    PREPROCESSOR_FILE,
};
