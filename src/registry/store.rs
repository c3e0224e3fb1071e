//! In-memory registry with promotion, plus a JSON file store.

use super::artifact::{ArtifactState, ModelArtifact};
use crate::core::FeatureSchema;
use crate::error::{PipelineError, Result};
use crate::models::ModelFamily;
use crate::training::TrainingOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Every registered artifact, grouped by family in version order.
///
/// At most one artifact per family is `Active`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRegistry {
    families: BTreeMap<ModelFamily, Vec<ModelArtifact>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a training outcome as the family's next version in state
    /// `Trained`. Returns the new version.
    ///
    /// The schema version carries over from the latest artifact unless the
    /// feature list changed.
    pub fn register(&mut self, outcome: TrainingOutcome) -> Result<u32> {
        let family = outcome.family;
        let artifacts = self.families.entry(family).or_default();
        let latest = artifacts.last();
        let version = latest.map_or(1, |a| a.version() + 1);
        let schema = FeatureSchema::next_after(
            latest.map(|a| a.schema()),
            outcome.features.clone(),
        )?;

        tracing::info!(
            %family,
            version,
            schema_version = schema.version,
            test_rmse = outcome.metrics.test.rmse,
            "registered artifact"
        );
        artifacts.push(ModelArtifact::from_outcome(outcome, version, schema));
        Ok(version)
    }

    /// Make a version the active one for its family. The previously active
    /// artifact becomes `Superseded`.
    pub fn promote(&mut self, family: ModelFamily, version: u32) -> Result<()> {
        let artifacts = self
            .families
            .get_mut(&family)
            .ok_or_else(|| not_found(family, version))?;
        let target = artifacts
            .iter()
            .position(|a| a.version() == version)
            .ok_or_else(|| not_found(family, version))?;
        if artifacts[target].state() == ArtifactState::Active {
            return Ok(());
        }

        for artifact in artifacts.iter_mut() {
            if artifact.state() == ArtifactState::Active {
                tracing::debug!(%family, version = artifact.version(), "superseding artifact");
                artifact.set_state(ArtifactState::Superseded);
            }
        }
        artifacts[target].set_state(ArtifactState::Active);
        tracing::info!(%family, version, "promoted artifact");
        Ok(())
    }

    /// Active artifact of a family.
    pub fn active(&self, family: ModelFamily) -> Option<&ModelArtifact> {
        self.families
            .get(&family)?
            .iter()
            .find(|a| a.state() == ArtifactState::Active)
    }

    pub fn get(&self, family: ModelFamily, version: u32) -> Option<&ModelArtifact> {
        self.families
            .get(&family)?
            .iter()
            .find(|a| a.version() == version)
    }

    /// Latest registered artifact of a family, whatever its state.
    pub fn latest(&self, family: ModelFamily) -> Option<&ModelArtifact> {
        self.families.get(&family)?.last()
    }

    /// All versions of a family, oldest first.
    pub fn versions(&self, family: ModelFamily) -> &[ModelArtifact] {
        self.families.get(&family).map_or(&[], Vec::as_slice)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ModelArtifact> {
        self.families.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_loaded(&mut self, artifact: ModelArtifact) -> Result<()> {
        let artifacts = self.families.entry(artifact.family()).or_default();
        if artifacts.iter().any(|a| a.version() == artifact.version()) {
            return Err(PipelineError::InvalidParameter(format!(
                "duplicate artifact {} v{}",
                artifact.family(),
                artifact.version()
            )));
        }
        if artifact.state() == ArtifactState::Active {
            if let Some(active) = artifacts.iter().find(|a| a.state() == ArtifactState::Active) {
                return Err(PipelineError::InvalidParameter(format!(
                    "{} has two active artifacts: v{} and v{}",
                    artifact.family(),
                    active.version(),
                    artifact.version()
                )));
            }
        }
        artifacts.push(artifact);
        artifacts.sort_by_key(|a| a.version());
        Ok(())
    }
}

fn not_found(family: ModelFamily, version: u32) -> PipelineError {
    PipelineError::ArtifactNotFound {
        family: family.to_string(),
        version,
    }
}

/// One line of `registry.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexEntry {
    family: ModelFamily,
    version: u32,
    state: ArtifactState,
    file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RegistryIndex {
    artifacts: Vec<IndexEntry>,
}

/// Persists a registry as one JSON file per artifact plus an index.
///
/// Layout under the root directory:
///
/// ```text
/// registry.json
/// ridge_v1.json
/// random_forest_v1.json
/// random_forest_v2.json
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub const INDEX_FILE: &'static str = "registry.json";

    /// Open a store, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name of an artifact.
    pub fn artifact_file(family: ModelFamily, version: u32) -> String {
        format!("{}_v{}.json", family.as_str(), version)
    }

    /// Write every artifact and the index.
    pub fn save(&self, registry: &ModelRegistry) -> Result<()> {
        let mut index = RegistryIndex::default();
        for artifact in registry.artifacts() {
            let file = Self::artifact_file(artifact.family(), artifact.version());
            write_json(&self.root.join(&file), artifact)?;
            index.artifacts.push(IndexEntry {
                family: artifact.family(),
                version: artifact.version(),
                state: artifact.state(),
                file,
            });
        }
        write_json(&self.root.join(Self::INDEX_FILE), &index)?;
        tracing::info!(
            root = %self.root.display(),
            artifacts = index.artifacts.len(),
            "saved registry"
        );
        Ok(())
    }

    /// Read the registry back. A store without an index loads as empty.
    pub fn load(&self) -> Result<ModelRegistry> {
        let index_path = self.root.join(Self::INDEX_FILE);
        if !index_path.exists() {
            return Ok(ModelRegistry::new());
        }
        let index: RegistryIndex = read_json(&index_path)?;

        let mut registry = ModelRegistry::new();
        for entry in index.artifacts {
            let path = self.root.join(&entry.file);
            if !path.exists() {
                return Err(not_found(entry.family, entry.version));
            }
            let mut artifact: ModelArtifact = read_json(&path)?;
            if artifact.family() != entry.family || artifact.version() != entry.version {
                return Err(PipelineError::Serialization(format!(
                    "{} holds {} v{}, index expects {} v{}",
                    entry.file,
                    artifact.family(),
                    artifact.version(),
                    entry.family,
                    entry.version
                )));
            }
            artifact.set_state(entry.state);
            registry.insert_loaded(artifact)?;
        }
        tracing::debug!(artifacts = registry.len(), "loaded registry");
        Ok(registry)
    }

    /// Load one artifact file directly.
    pub fn load_artifact(&self, family: ModelFamily, version: u32) -> Result<ModelArtifact> {
        let path = self.root.join(Self::artifact_file(family, version));
        if !path.exists() {
            return Err(not_found(family, version));
        }
        read_json(&path)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::artifact::tests::fitted_outcome;
    use crate::registry::FeatureVector;

    #[test]
    fn versions_increment_per_family() {
        let mut reg = ModelRegistry::new();
        assert_eq!(reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap(), 1);
        assert_eq!(reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap(), 2);
        assert_eq!(
            reg.register(fitted_outcome(ModelFamily::RandomForest, &["a"])).unwrap(),
            1
        );
        assert_eq!(reg.len(), 3);
        assert!(reg.active(ModelFamily::Ridge).is_none());
        assert_eq!(reg.get(ModelFamily::Ridge, 2).unwrap().state(), ArtifactState::Trained);
    }

    #[test]
    fn promotion_supersedes_previous() {
        let mut reg = ModelRegistry::new();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap();

        reg.promote(ModelFamily::Ridge, 1).unwrap();
        assert_eq!(reg.active(ModelFamily::Ridge).unwrap().version(), 1);

        reg.promote(ModelFamily::Ridge, 2).unwrap();
        assert_eq!(reg.active(ModelFamily::Ridge).unwrap().version(), 2);
        assert_eq!(
            reg.get(ModelFamily::Ridge, 1).unwrap().state(),
            ArtifactState::Superseded
        );

        assert_eq!(
            reg.promote(ModelFamily::Ridge, 9),
            Err(PipelineError::ArtifactNotFound {
                family: "ridge".into(),
                version: 9
            })
        );
        assert_eq!(reg.active(ModelFamily::Ridge).unwrap().version(), 2);
    }

    #[test]
    fn schema_version_tracks_feature_changes() {
        let mut reg = ModelRegistry::new();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a", "b"])).unwrap();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a", "b"])).unwrap();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a", "b", "c"])).unwrap();
        let schema_versions: Vec<u32> = reg
            .versions(ModelFamily::Ridge)
            .iter()
            .map(|a| a.schema().version)
            .collect();
        assert_eq!(schema_versions, vec![1, 1, 2]);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_empty());

        let mut reg = ModelRegistry::new();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["pm25", "hour"])).unwrap();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["pm25", "hour"])).unwrap();
        reg.promote(ModelFamily::Ridge, 2).unwrap();
        store.save(&reg).unwrap();

        assert!(dir.path().join("ridge_v1.json").exists());
        assert!(dir.path().join("registry.json").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, reg);

        let v = FeatureVector::new().with("pm25", 3.0).with("hour", 7.0);
        let before = reg.active(ModelFamily::Ridge).unwrap().predict(&v).unwrap();
        let after = loaded.active(ModelFamily::Ridge).unwrap().predict(&v).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn index_with_two_active_versions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut reg = ModelRegistry::new();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap();
        reg.register(fitted_outcome(ModelFamily::Ridge, &["a"])).unwrap();
        reg.promote(ModelFamily::Ridge, 2).unwrap();
        store.save(&reg).unwrap();

        let index_path = dir.path().join(FileStore::INDEX_FILE);
        let mut index: RegistryIndex = read_json(&index_path).unwrap();
        for entry in &mut index.artifacts {
            entry.state = ArtifactState::Active;
        }
        write_json(&index_path, &index).unwrap();

        assert!(matches!(
            store.load(),
            Err(PipelineError::InvalidParameter(msg)) if msg.contains("two active")
        ));
    }

    #[test]
    fn missing_artifact_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load_artifact(ModelFamily::Stacking, 1),
            Err(PipelineError::ArtifactNotFound { .. })
        ));
    }
}
