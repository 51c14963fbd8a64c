//! The persisted record of every manifest an apply rendered

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crdform_core::resource::ResourceId;
use serde::{Deserialize, Serialize};

/// Layout version written into every state file
pub const FORMAT_VERSION: u32 = 1;

/// Everything one configuration has rendered, keyed by resource address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: u32,
    /// Bumped on every write
    pub serial: u64,
    /// Fixed when the file is first created; a backend refuses to overwrite
    /// state of another lineage
    pub lineage: String,
    pub written_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub manifests: BTreeMap<String, ManifestRecord>,
}

impl StateFile {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            written_by: writer(),
            updated_at: None,
            manifests: BTreeMap::new(),
        }
    }

    /// Stamp a new revision; call once before each write
    pub fn advance(&mut self) {
        self.serial += 1;
        self.written_by = writer();
        self.updated_at = Some(Utc::now());
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ManifestRecord> {
        self.manifests.get(&id.to_string())
    }

    /// Record a manifest, returning the one it replaces
    pub fn insert(&mut self, record: ManifestRecord) -> Option<ManifestRecord> {
        self.manifests.insert(record.address(), record)
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<ManifestRecord> {
        self.manifests.remove(&id.to_string())
    }

    /// Records in address order
    pub fn records(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.manifests.values()
    }

    /// Every stored manifest as one multi-document YAML stream
    pub fn manifest_stream(&self) -> String {
        self.records().map(ManifestRecord::document).collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

fn writer() -> String {
    concat!("crdform ", env!("CARGO_PKG_VERSION")).to_string()
}

/// One rendered manifest and the configuration it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub resource_type: String,
    pub name: String,
    /// Time-based identifier assigned by the last create or update
    pub id: i64,
    pub api_version: String,
    pub kind: String,
    pub manifest: String,
    /// Configuration attributes, without the computed ones above
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ManifestRecord {
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    /// `type.name`, the key this record is stored under
    pub fn address(&self) -> String {
        self.resource_id().to_string()
    }

    /// The manifest as a single YAML document, `---` separator included
    pub fn document(&self) -> String {
        if self.manifest.ends_with('\n') {
            format!("---\n{}", self.manifest)
        } else {
            format!("---\n{}\n", self.manifest)
        }
    }
}
