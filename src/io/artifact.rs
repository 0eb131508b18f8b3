//! # Artifact Store
//!
//! Lifecycle of the staged VCF files passed between pipeline jobs.
//!
//! An artifact is a bgzipped data file plus its tabix sidecar. The store
//! reserves uniquely named files in the output directory and retires them in
//! two phases: index first, then data. A failed deletion is always an error.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PedSimError, Result};

/// Suffix of every staged data file
pub const STAGED_SUFFIX: &str = ".vcf.gz";
/// Suffix appended to a data file to name its index sidecar
pub const INDEX_SUFFIX: &str = ".tbi";

/// Path of the tabix sidecar for a data file
pub fn index_path(data: &Path) -> PathBuf {
    let mut name = data.as_os_str().to_os_string();
    name.push(INDEX_SUFFIX);
    PathBuf::from(name)
}

/// A data file and its index sidecar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    data: PathBuf,
    index: PathBuf,
}

impl Artifact {
    /// Reference an existing file (e.g. the population input)
    pub fn from_path(data: impl Into<PathBuf>) -> Self {
        let data = data.into();
        let index = index_path(&data);
        Self { data, index }
    }

    pub fn data(&self) -> &Path {
        &self.data
    }

    pub fn index(&self) -> &Path {
        &self.index
    }
}

/// Creates and retires staged artifacts within one run
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    module_name: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, module_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            module_name: module_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a new uniquely named artifact for `label`
    ///
    /// The data file exists (empty) on return so that concurrent reservations
    /// can never pick the same name.
    pub fn create(&self, label: &str) -> Result<Artifact> {
        self.create_with_suffix(label, STAGED_SUFFIX)
    }

    /// Reserve an artifact whose data file ends in `suffix`
    pub fn create_with_suffix(&self, label: &str, suffix: &str) -> Result<Artifact> {
        let prefix = format!("{}-{}.", self.module_name, sanitize_label(label));
        let reserved = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(|e| PedSimError::artifact(&self.dir, e))?;
        let data = reserved
            .into_temp_path()
            .keep()
            .map_err(|e| PedSimError::artifact(&self.dir, e.error))?;
        debug!(path = ?data, "reserved artifact");
        Ok(Artifact::from_path(data))
    }

    /// Delete an artifact: index sidecar first, then the data file
    pub fn retire(&self, artifact: Artifact) -> Result<()> {
        fs::remove_file(&artifact.index)
            .map_err(|e| PedSimError::artifact(&artifact.index, e))?;
        fs::remove_file(&artifact.data).map_err(|e| PedSimError::artifact(&artifact.data, e))?;
        debug!(path = ?artifact.data, "retired artifact");
        Ok(())
    }

    /// Remove whatever part of an abandoned artifact exists
    pub fn discard(&self, artifact: Artifact) -> Result<()> {
        for path in [&artifact.index, &artifact.data] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(PedSimError::artifact(path, e)),
            }
        }
        debug!(path = ?artifact.data, "discarded artifact");
        Ok(())
    }
}

/// Keep labels usable as file name components
fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
