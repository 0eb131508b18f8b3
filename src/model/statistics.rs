//! # Genotype Statistics
//!
//! Per-sample call counts over the final artifact, restricted to the samples
//! created by the run.

use std::io::Write;

use crate::data::genotype::Genotype;
use crate::error::Result;
use crate::io::vcf::{VcfHeader, VcfRecord};

/// Call counts for one sample
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub sample: String,
    pub total: u64,
    pub missing: u64,
    pub hom_ref: u64,
    pub het: u64,
    pub hom_alt: u64,
    pub hemi_ref: u64,
    pub hemi_alt: u64,
    pub de_novo: u64,
}

impl SampleStats {
    fn new(sample: &str) -> Self {
        Self {
            sample: sample.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, gt: &Genotype, de_novo: bool) {
        self.total += 1;
        if de_novo {
            self.de_novo += 1;
        }
        if gt.is_missing() {
            self.missing += 1;
            return;
        }
        let called: Vec<usize> = gt.alleles().iter().flatten().copied().collect();
        match gt.copies() {
            1 => {
                if called[0] == 0 {
                    self.hemi_ref += 1;
                } else {
                    self.hemi_alt += 1;
                }
            }
            _ => {
                let first = called[0];
                if called.iter().any(|&a| a != first) {
                    self.het += 1;
                } else if first == 0 {
                    self.hom_ref += 1;
                } else {
                    self.hom_alt += 1;
                }
            }
        }
    }
}

/// Statistics accumulator for a chosen set of samples
#[derive(Clone, Debug)]
pub struct GenotypeStatistics {
    columns: Vec<usize>,
    stats: Vec<SampleStats>,
}

impl GenotypeStatistics {
    /// Track `samples` in the given order; names absent from `header` are ignored
    pub fn new(header: &VcfHeader, samples: &[String]) -> Self {
        let (columns, stats) = samples
            .iter()
            .filter_map(|s| header.sample_index(s).map(|idx| (idx, SampleStats::new(s))))
            .unzip();
        Self { columns, stats }
    }

    pub fn add_record(&mut self, record: &VcfRecord) -> Result<()> {
        for (column, stats) in self.columns.iter().zip(self.stats.iter_mut()) {
            let Some(gt) = record.genotype(*column)? else {
                continue;
            };
            if gt.copies() == 0 {
                continue;
            }
            let de_novo = record.sample_value(*column, "DN") == Some("Y");
            stats.add(&gt, de_novo);
        }
        Ok(())
    }

    pub fn samples(&self) -> &[SampleStats] {
        &self.stats
    }

    /// Tab-separated report, one row per sample
    pub fn write_report<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "Sample\tTotal\tMissing\tHomRef\tHet\tHomAlt\tHemiRef\tHemiAlt\tDeNovo"
        )?;
        for s in &self.stats {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.sample, s.total, s.missing, s.hom_ref, s.het, s.hom_alt, s.hemi_ref, s.hemi_alt, s.de_novo
            )?;
        }
        Ok(())
    }
}
