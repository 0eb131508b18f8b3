//! # Sample Simulators
//!
//! ## Role
//! The transforms the pipeline chains together. The pipeline treats them as
//! opaque: each job hands over the current artifact, a freshly reserved
//! output artifact and the sample context, and expects the output artifact
//! (data plus index) to exist when the call returns.
//!
//! `VcfSimulator` is the built-in implementation working on bgzipped VCF.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::instrument;

use crate::data::sample::{PloidyMode, Sex};
use crate::error::{PedSimError, Result};
use crate::io::artifact::Artifact;
use crate::io::reference::ReferenceGenome;
use crate::io::vcf::{index_vcf, write_vcf, VcfHeader, VcfReader, VcfRecord, VcfWriter};
use crate::model::{denovo, genotyping, inheritance, replay};

/// Identities of both parents of a family child
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentPair {
    pub father: String,
    pub mother: String,
}

/// Everything a transform knows about the sample it is working on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleContext {
    pub sample: String,
    pub sex: Sex,
    pub seed: u64,
    pub parents: Option<ParentPair>,
}

impl SampleContext {
    pub fn new(sample: impl Into<String>, sex: Sex, seed: u64) -> Self {
        Self {
            sample: sample.into(),
            sex,
            seed,
            parents: None,
        }
    }

    pub fn with_parents(mut self, father: impl Into<String>, mother: impl Into<String>) -> Self {
        self.parents = Some(ParentPair {
            father: father.into(),
            mother: mother.into(),
        });
        self
    }

    /// Deterministic generator for this job
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

/// Transforms applied by the pipeline, one call per job
pub trait SampleSimulator {
    /// Add genotypes for a sample with no known parents
    fn mutate_independent(&mut self, input: &Artifact, output: &Artifact, ctx: &SampleContext) -> Result<()>;

    /// Add genotypes for a child inherited from `ctx.parents`
    fn mutate_child(&mut self, input: &Artifact, output: &Artifact, ctx: &SampleContext) -> Result<()>;

    /// Add de novo mutations to an existing sample
    fn mutate_de_novo(
        &mut self,
        input: &Artifact,
        output: &Artifact,
        ctx: &SampleContext,
        expected: u32,
    ) -> Result<()>;

    /// Keep only records where some sample carries a non-reference allele
    fn filter_unused(&mut self, input: &Artifact, output: &Artifact) -> Result<()>;

    /// Write the genome of one sample next to the output, leaving the artifact untouched
    fn replay_sample(&mut self, input: &Artifact, sample: &str, out_dir: &Path) -> Result<PathBuf>;
}

/// Built-in simulator over bgzipped, tabix-indexed VCF artifacts
pub struct VcfSimulator {
    reference: ReferenceGenome,
    ploidy: PloidyMode,
    extra_crossovers: f64,
}

impl VcfSimulator {
    pub fn new(reference: ReferenceGenome, ploidy: PloidyMode, extra_crossovers: f64) -> Self {
        Self {
            reference,
            ploidy,
            extra_crossovers,
        }
    }

    pub fn reference(&self) -> &ReferenceGenome {
        &self.reference
    }
}

/// Stream every record of `input` through `apply` into `output`, then index it
fn stream_transform<F>(output: &Artifact, header: VcfHeader, mut reader: VcfReader, mut apply: F) -> Result<()>
where
    F: FnMut(&mut VcfRecord) -> Result<bool>,
{
    let mut writer = VcfWriter::create(output.data())?;
    writer.write_header(&header)?;
    while let Some(mut record) = reader.read_record()? {
        if apply(&mut record)? {
            writer.write_record(&record)?;
        }
    }
    writer.finish()?;
    index_vcf(output.data())
}

impl SampleSimulator for VcfSimulator {
    #[instrument(skip_all, fields(sample = %ctx.sample))]
    fn mutate_independent(&mut self, input: &Artifact, output: &Artifact, ctx: &SampleContext) -> Result<()> {
        let reader = VcfReader::open(input.data())?;
        let mut header = reader.header().clone();
        header
            .add_sample(&ctx.sample)
            .map_err(|e| PedSimError::simulation(&ctx.sample, e.to_string()))?;
        let mut rng = ctx.rng();
        let ploidy = self.ploidy;
        stream_transform(output, header, reader, |record| {
            let gt = genotyping::draw_genotype(record, ploidy.copies(&record.chrom, ctx.sex), &mut rng)?;
            record.push_genotype(&gt);
            Ok(true)
        })
    }

    #[instrument(skip_all, fields(sample = %ctx.sample))]
    fn mutate_child(&mut self, input: &Artifact, output: &Artifact, ctx: &SampleContext) -> Result<()> {
        let parents = ctx
            .parents
            .as_ref()
            .ok_or_else(|| PedSimError::simulation(&ctx.sample, "child simulated without parents"))?;
        let reader = VcfReader::open(input.data())?;
        let mut header = reader.header().clone();
        let locate = |name: &str| {
            header.sample_index(name).ok_or_else(|| {
                PedSimError::simulation(&ctx.sample, format!("parent {name} is not present in the input"))
            })
        };
        let father = locate(&parents.father)?;
        let mother = locate(&parents.mother)?;
        header
            .add_sample(&ctx.sample)
            .map_err(|e| PedSimError::simulation(&ctx.sample, e.to_string()))?;

        let mut transmitter = inheritance::Transmitter::new(
            &self.reference,
            self.ploidy,
            ctx.sex,
            self.extra_crossovers,
            ctx.rng(),
        );
        stream_transform(output, header, reader, |record| {
            let gt = transmitter.child_genotype(record, father, mother)?;
            record.push_genotype(&gt);
            Ok(true)
        })
    }

    #[instrument(skip_all, fields(sample = %ctx.sample, expected = expected))]
    fn mutate_de_novo(
        &mut self,
        input: &Artifact,
        output: &Artifact,
        ctx: &SampleContext,
        expected: u32,
    ) -> Result<()> {
        let mut reader = VcfReader::open(input.data())?;
        let mut header = reader.header().clone();
        let sample = header.sample_index(&ctx.sample).ok_or_else(|| {
            PedSimError::simulation(&ctx.sample, "sample is not present in the input")
        })?;
        let mut records = reader.read_all()?;
        let mut rng = ctx.rng();
        denovo::add_de_novo_mutations(
            &mut header,
            &mut records,
            &self.reference,
            self.ploidy,
            sample,
            ctx.sex,
            expected,
            &mut rng,
        )?;
        write_vcf(output.data(), &header, &records)?;
        index_vcf(output.data())
    }

    #[instrument(skip_all)]
    fn filter_unused(&mut self, input: &Artifact, output: &Artifact) -> Result<()> {
        let reader = VcfReader::open(input.data())?;
        let header = reader.header().clone();
        stream_transform(output, header, reader, |record| genotyping::is_used(record))
    }

    #[instrument(skip_all, fields(sample = %sample))]
    fn replay_sample(&mut self, input: &Artifact, sample: &str, out_dir: &Path) -> Result<PathBuf> {
        let mut reader = VcfReader::open(input.data())?;
        let idx = reader.header().sample_index(sample).ok_or_else(|| {
            PedSimError::simulation(sample, "sample is not present in the input")
        })?;
        let records = reader.read_all()?;
        let path = out_dir.join(format!("{sample}.fa"));
        replay::write_genome(&path, &self.reference, self.ploidy, &records, idx)?;
        Ok(path)
    }
}
