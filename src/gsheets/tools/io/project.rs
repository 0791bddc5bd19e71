use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::gsheets::tools::dataset::{DatasetSink, DatasetSpec, Project, Zone};
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::io::tsv::TsvSink;
use crate::gsheets::tools::model::Schema;

/// File holding the project manifest inside the project directory.
pub const MANIFEST_FILE: &str = "project.json";
/// Data file of each filesystem dataset.
pub const DATA_FILE: &str = "data.tsv";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub project_key: String,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    #[serde(flatten)]
    pub spec: DatasetSpec,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Project stored as a directory: a JSON manifest plus one folder per
/// filesystem dataset.
#[derive(Debug)]
pub struct LocalProject {
    root: PathBuf,
    manifest: ProjectManifest,
}

impl LocalProject {
    /// Opens the project at `root`, creating an empty one named `project_key`
    /// when no manifest exists yet.
    pub fn open(root: &Path, project_key: &str) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)?
        } else {
            std::fs::create_dir_all(root)?;
            ProjectManifest {
                project_key: project_key.to_string(),
                ..ProjectManifest::default()
            }
        };
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    /// Data file of a dataset, resolved from its `path` parameter.
    pub fn data_path(&self, name: &str) -> Result<PathBuf> {
        let entry = self.entry(name)?;
        let relative = entry
            .spec
            .params
            .get("path")
            .cloned()
            .unwrap_or_else(|| format!("{}/{name}", self.manifest.project_key));
        Ok(self.root.join(relative).join(DATA_FILE))
    }

    fn entry(&self, name: &str) -> Result<&DatasetEntry> {
        self.manifest
            .datasets
            .iter()
            .find(|entry| entry.spec.name == name)
            .ok_or_else(|| ToolError::InvalidDataset(format!("unknown dataset '{name}'")))
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut DatasetEntry> {
        self.manifest
            .datasets
            .iter_mut()
            .find(|entry| entry.spec.name == name)
            .ok_or_else(|| ToolError::InvalidDataset(format!("unknown dataset '{name}'")))
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.manifest)?;
        std::fs::write(self.root.join(MANIFEST_FILE), data)?;
        Ok(())
    }
}

impl Project for LocalProject {
    fn project_key(&self) -> &str {
        &self.manifest.project_key
    }

    fn list_dataset_names(&self) -> Result<Vec<String>> {
        Ok(self
            .manifest
            .datasets
            .iter()
            .map(|entry| entry.spec.name.clone())
            .collect())
    }

    fn create_dataset(&mut self, spec: &DatasetSpec) -> Result<()> {
        if self.entry(&spec.name).is_ok() {
            return Err(ToolError::InvalidDataset(format!(
                "dataset '{}' already exists",
                spec.name
            )));
        }
        self.manifest.datasets.push(DatasetEntry {
            spec: spec.clone(),
            managed: false,
            zone: None,
        });
        debug!(dataset = %spec.name, "created dataset");
        self.save()
    }

    fn set_managed(&mut self, name: &str) -> Result<()> {
        self.entry_mut(name)?.managed = true;
        self.save()
    }

    fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.manifest.zones.clone())
    }

    fn create_zone(&mut self, name: &str) -> Result<Zone> {
        let zone = Zone {
            id: Uuid::new_v4().simple().to_string()[..7].to_string(),
            name: name.to_string(),
        };
        self.manifest.zones.push(zone.clone());
        debug!(zone = %zone.name, id = %zone.id, "created zone");
        self.save()?;
        Ok(zone)
    }

    fn move_to_zone(&mut self, dataset: &str, zone_id: &str) -> Result<()> {
        if !self.manifest.zones.iter().any(|zone| zone.id == zone_id) {
            return Err(ToolError::InvalidDataset(format!("unknown zone '{zone_id}'")));
        }
        self.entry_mut(dataset)?.zone = Some(zone_id.to_string());
        self.save()
    }

    fn dataset_writer(&mut self, name: &str, schema: &Schema) -> Result<Box<dyn DatasetSink>> {
        let path = self.data_path(name)?;
        Ok(Box::new(TsvSink::create(&path, schema)?))
    }
}
