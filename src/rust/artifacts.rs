use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

use crate::classifier::{ClassifierError, OnnxStageModel, StageModel};
use crate::runtime::RuntimeConfig;
use crate::schema::FeatureDescriptor;

/// Environment variable overriding the project root.
pub const ROOT_ENV_VAR: &str = "STAGEVIEW_ROOT";

pub const DEFAULT_MODEL_FILE: &str = "model.onnx";
pub const DEFAULT_FEATURES_FILE: &str = "features.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("{kind} file not found: {}", .path.display())]
    Missing { kind: &'static str, path: PathBuf },
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Feature descriptor {} is not valid JSON: {source}", .path.display())]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid feature descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Failed to load classifier: {0}")]
    Model(#[from] ClassifierError),
    #[error("Hash mismatch: expected {expected}, got {actual} for model file")]
    HashMismatch { expected: String, actual: String },
}

/// Where the artifacts live on disk.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub descriptor: PathBuf,
    /// Expected SHA-256 of the model file, lowercase hex.
    pub model_sha256: Option<String>,
}

impl ArtifactPaths {
    /// Default file names under `root`.
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            model: root.join(DEFAULT_MODEL_FILE),
            descriptor: root.join(DEFAULT_FEATURES_FILE),
            model_sha256: None,
        }
    }

    /// Returns the project root: `STAGEVIEW_ROOT` if set, otherwise the working directory.
    pub fn default_root() -> PathBuf {
        match env::var(ROOT_ENV_VAR) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from("."),
        }
    }

    pub fn with_model_sha256(mut self, digest: impl Into<String>) -> Self {
        self.model_sha256 = Some(digest.into().to_lowercase());
        self
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::under(Self::default_root())
    }
}

/// The loaded classifier and its descriptor, shared read-only by every session.
#[derive(Clone)]
pub struct Artifacts {
    pub model: Arc<dyn StageModel>,
    pub descriptor: Arc<FeatureDescriptor>,
}

impl std::fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifacts")
            .field("model", &self.model.info())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Turns a model file and its descriptor into a classifier.
pub type ModelLoader =
    dyn Fn(&Path, &FeatureDescriptor) -> Result<Arc<dyn StageModel>, ArtifactLoadError> + Send + Sync;

/// Loads the classifier and descriptor once and hands out the cached pair afterwards.
///
/// A failed load is not cached, so a later call retries.
pub struct ArtifactStore {
    paths: ArtifactPaths,
    loader: Box<ModelLoader>,
    loaded: OnceCell<Arc<Artifacts>>,
}

impl ArtifactStore {
    /// Creates a store that loads the model with the ONNX backend
    pub fn new(paths: ArtifactPaths) -> Self {
        Self::with_runtime_config(paths, RuntimeConfig::default())
    }

    pub fn with_runtime_config(paths: ArtifactPaths, config: RuntimeConfig) -> Self {
        Self::with_loader(paths, move |path, descriptor| {
            let mut builder = OnnxStageModel::builder()
                .with_model_path(path)
                .with_runtime_config(config.clone())
                .with_feature_columns(&descriptor.feature_columns);
            if let Some(labels) = &descriptor.class_labels {
                builder = builder.with_class_labels(labels.clone());
            }
            let model = builder.build()?;
            log::info!("Loaded classifier: {:?}", model.info());
            Ok(Arc::new(model) as Arc<dyn StageModel>)
        })
    }

    /// Creates a store with a custom model loader
    pub fn with_loader<F>(paths: ArtifactPaths, loader: F) -> Self
    where
        F: Fn(&Path, &FeatureDescriptor) -> Result<Arc<dyn StageModel>, ArtifactLoadError> + Send + Sync + 'static,
    {
        Self {
            paths,
            loader: Box::new(loader),
            loaded: OnceCell::new(),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Returns the cached artifacts, reading storage only on the first successful call.
    pub fn load(&self) -> Result<Arc<Artifacts>, ArtifactLoadError> {
        self.loaded
            .get_or_try_init(|| self.read_artifacts().map(Arc::new))
            .map(Arc::clone)
    }

    fn read_artifacts(&self) -> Result<Artifacts, ArtifactLoadError> {
        log::info!("Loading artifacts:");
        log::info!("  Model path: {:?} (exists: {})", self.paths.model, self.paths.model.exists());
        log::info!("  Descriptor path: {:?} (exists: {})", self.paths.descriptor, self.paths.descriptor.exists());

        if !self.paths.model.exists() {
            return Err(ArtifactLoadError::Missing { kind: "Model", path: self.paths.model.clone() });
        }
        if !self.paths.descriptor.exists() {
            return Err(ArtifactLoadError::Missing { kind: "Feature descriptor", path: self.paths.descriptor.clone() });
        }

        let descriptor = Self::read_descriptor(&self.paths.descriptor)?;
        log::info!("Descriptor declares {} feature columns", descriptor.feature_columns.len());

        if let Some(expected) = &self.paths.model_sha256 {
            self.verify_model(expected)?;
        }

        let model = (self.loader)(&self.paths.model, &descriptor)?;
        Ok(Artifacts {
            model,
            descriptor: Arc::new(descriptor),
        })
    }

    fn read_descriptor(path: &Path) -> Result<FeatureDescriptor, ArtifactLoadError> {
        let text = fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptor = FeatureDescriptor::from_json(&text).map_err(|source| {
            ArtifactLoadError::MalformedDescriptor {
                path: path.to_path_buf(),
                source,
            }
        })?;
        descriptor.validate().map_err(ArtifactLoadError::InvalidDescriptor)?;
        Ok(descriptor)
    }

    fn verify_model(&self, expected: &str) -> Result<(), ArtifactLoadError> {
        log::info!("Verifying file: {:?}", self.paths.model);
        let hash = file_sha256(&self.paths.model)?;
        log::info!("Calculated hash: {}", hash);
        log::info!("Expected hash:   {}", expected);
        if hash != expected {
            log::error!("Model hash mismatch: expected {}, got {}", expected, hash);
            return Err(ArtifactLoadError::HashMismatch {
                expected: expected.to_string(),
                actual: hash,
            });
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String, ArtifactLoadError> {
    let bytes = fs::read(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_use_fixed_file_names() {
        let paths = ArtifactPaths::under("/srv/liver");
        assert_eq!(paths.model, PathBuf::from("/srv/liver/model.onnx"));
        assert_eq!(paths.descriptor, PathBuf::from("/srv/liver/features.json"));
        assert!(paths.model_sha256.is_none());
    }

    #[test]
    fn test_default_root() {
        env::set_var(ROOT_ENV_VAR, "/tmp/test-stageview");
        assert_eq!(ArtifactPaths::default_root(), PathBuf::from("/tmp/test-stageview"));
        env::remove_var(ROOT_ENV_VAR);

        assert_eq!(ArtifactPaths::default_root(), PathBuf::from("."));
    }

    #[test]
    fn test_digest_is_lowercased() {
        let paths = ArtifactPaths::under(".").with_model_sha256("ABCDEF");
        assert_eq!(paths.model_sha256.as_deref(), Some("abcdef"));
    }

    #[test]
    fn test_file_sha256() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("blob");
        fs::write(&path, b"abc")?;
        assert_eq!(
            file_sha256(&path)?,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        Ok(())
    }
}
