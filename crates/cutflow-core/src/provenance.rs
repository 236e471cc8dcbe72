//! Provenance and schema descriptors attached to run artefacts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version describing the schema of serialized artefacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
    /// Patch version incremented for fixes.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Provenance information recorded with every cut-flow report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Schema of the report payload.
    #[serde(default)]
    pub schema: SchemaVersion,
    /// Sample name the run processed.
    pub sample: String,
    /// Canonical hash of the cut table used to build the pipeline.
    pub config_hash: String,
    /// Cut-variation mode of the pipeline.
    pub mode: String,
    /// ISO-8601 timestamp recording when the run finished.
    pub created_at: String,
    /// Version map for the tools involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Creates a provenance record without a timestamp.
    pub fn new(
        sample: impl Into<String>,
        config_hash: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            schema: SchemaVersion::default(),
            sample: sample.into(),
            config_hash: config_hash.into(),
            mode: mode.into(),
            created_at: String::new(),
            tool_versions: BTreeMap::new(),
        }
    }

    /// Records the version of a tool that contributed to the run.
    pub fn with_tool(mut self, tool: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(tool.into(), version.into());
        self
    }
}
