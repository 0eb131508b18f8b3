//! # Aggregation
//!
//! Turn the last staged artifact into the permanent output.
//!
//! The artifact is streamed to `<out>/pedsamplesim.vcf.gz` with the master
//! seed recorded as `##SEED=`, statistics are gathered for the samples the
//! run created, and the gzipped output is tabix-indexed. The copy is built
//! under a staged name and renamed into place when complete. The last staged
//! artifact is retired only after that rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};

use crate::error::{PedSimError, Result};
use crate::io::artifact::{index_path, Artifact, ArtifactStore, STAGED_SUFFIX};
use crate::io::vcf::{index_vcf, is_compressed, VcfReader, VcfWriter};
use crate::model::statistics::GenotypeStatistics;

/// Suffix of the staged copy when the output is not compressed
const PLAIN_SUFFIX: &str = ".vcf";

/// What the finalize step produced
#[derive(Debug)]
pub struct FinalOutput {
    pub path: PathBuf,
    /// Present when some sample was created
    pub statistics: Option<GenotypeStatistics>,
    pub records: u64,
}

pub struct Aggregator {
    output: PathBuf,
    master_seed: u64,
}

impl Aggregator {
    pub fn new(output: impl Into<PathBuf>, master_seed: u64) -> Self {
        Self {
            output: output.into(),
            master_seed,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Copy `source` to the output, adding the seed line and counting calls
    ///
    /// The copy is written and indexed under a staged name next to the
    /// output and only renamed into place once complete, so a failure never
    /// leaves a truncated file at the permanent location.
    fn promote(
        &self,
        store: &ArtifactStore,
        source: &Artifact,
        created: &[String],
    ) -> Result<(u64, GenotypeStatistics)> {
        info_span!("promote", from = ?source.data(), to = ?self.output).in_scope(|| {
            let compressed = is_compressed(&self.output);
            let suffix = if compressed { STAGED_SUFFIX } else { PLAIN_SUFFIX };
            let pending = store.create_with_suffix("final", suffix)?;
            match self.write_copy(source, &pending, compressed, created) {
                Ok(result) => {
                    fs::rename(pending.data(), &self.output)
                        .map_err(|e| PedSimError::artifact(&self.output, e))?;
                    if compressed {
                        let index = index_path(&self.output);
                        fs::rename(pending.index(), &index).map_err(|e| PedSimError::artifact(&index, e))?;
                    }
                    Ok(result)
                }
                Err(e) => {
                    if let Err(cleanup) = store.discard(pending) {
                        warn!(error = %cleanup, "failed to remove incomplete output");
                    }
                    Err(e)
                }
            }
        })
    }

    fn write_copy(
        &self,
        source: &Artifact,
        pending: &Artifact,
        compressed: bool,
        created: &[String],
    ) -> Result<(u64, GenotypeStatistics)> {
        let mut reader = VcfReader::open(source.data())?;
        let mut header = reader.header().clone();
        header.set_meta_value("SEED", self.master_seed);
        let mut stats = GenotypeStatistics::new(&header, created);

        let mut writer = VcfWriter::create(pending.data())?;
        writer.write_header(&header)?;
        let mut n = 0u64;
        while let Some(record) = reader.read_record()? {
            stats.add_record(&record)?;
            writer.write_record(&record)?;
            n += 1;
        }
        writer.finish()?;
        if compressed {
            index_vcf(pending.data())?;
        }
        Ok((n, stats))
    }

    /// Write the final output from the pipeline's last artifact
    ///
    /// `staged` tells whether `current` was produced by this run. The
    /// population input is never deleted; a staged artifact is retired once
    /// the output is complete, whether or not any sample was created.
    pub fn finalize<W: Write + ?Sized>(
        &self,
        store: &ArtifactStore,
        current: Artifact,
        staged: bool,
        created: &[String],
        report: &mut W,
    ) -> Result<FinalOutput> {
        if created.is_empty() {
            if staged {
                warn!("No samples were simulated; writing the filtered input");
            } else {
                warn!("No samples were simulated; the input is passed through unchanged");
            }
        }

        let (records, stats) = self.promote(store, &current, created)?;
        if staged {
            store.retire(current)?;
        }
        if created.is_empty() {
            return Ok(FinalOutput {
                path: self.output.clone(),
                statistics: None,
                records,
            });
        }

        stats.write_report(report)?;
        info!(path = ?self.output, records, samples = created.len(), "output written");
        Ok(FinalOutput {
            path: self.output.clone(),
            statistics: Some(stats),
            records,
        })
    }
}
