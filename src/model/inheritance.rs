//! # Inheritance
//!
//! Transmission of parental alleles to a child.
//!
//! For every chromosome the child receives one strand per copy, each from a
//! single parent. A strand starts on a random parental copy and switches copy
//! at each crossover: one uniformly placed crossover per chromosome, plus an
//! extra one with the configured probability. Sex chromosomes follow the
//! ploidy mode (a son's X comes from his mother, his Y from his father).
//! Mitochondria are inherited maternally without recombination.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::data::genotype::Genotype;
use crate::data::sample::{ChromKind, PloidyMode, Sex};
use crate::error::Result;
use crate::io::reference::ReferenceGenome;
use crate::io::vcf::VcfRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParentRole {
    Father,
    Mother,
}

/// One inherited chromosome copy
#[derive(Clone, Debug)]
struct Strand {
    parent: ParentRole,
    start_copy: usize,
    crossovers: Vec<u64>,
}

impl Strand {
    /// Parental copy transmitted at `pos`
    fn copy_at(&self, pos: u64) -> usize {
        let switches = self.crossovers.iter().filter(|&&c| c <= pos).count();
        (self.start_copy + switches) % 2
    }
}

#[derive(Clone, Debug)]
struct ChromosomePlan {
    chrom: String,
    strands: Vec<Strand>,
}

/// Stateful allele transmitter for one child, fed records in file order
pub struct Transmitter<'a> {
    reference: &'a ReferenceGenome,
    ploidy: PloidyMode,
    child_sex: Sex,
    extra_crossovers: f64,
    rng: ChaCha8Rng,
    current: Option<ChromosomePlan>,
}

impl<'a> Transmitter<'a> {
    pub fn new(
        reference: &'a ReferenceGenome,
        ploidy: PloidyMode,
        child_sex: Sex,
        extra_crossovers: f64,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            reference,
            ploidy,
            child_sex,
            extra_crossovers,
            rng,
            current: None,
        }
    }

    fn plan_chromosome(&mut self, chrom: &str) -> ChromosomePlan {
        let kind = ChromKind::from_name(chrom);
        let parents = match self.ploidy.copies(chrom, self.child_sex) {
            0 => Vec::new(),
            1 => match (self.ploidy, kind) {
                (PloidyMode::Auto, ChromKind::Y) => vec![ParentRole::Father],
                (PloidyMode::Auto, _) => vec![ParentRole::Mother],
                _ => {
                    if self.rng.random_bool(0.5) {
                        vec![ParentRole::Father]
                    } else {
                        vec![ParentRole::Mother]
                    }
                }
            },
            _ => vec![ParentRole::Father, ParentRole::Mother],
        };

        let length = self
            .reference
            .contig(chrom)
            .map(|c| c.len() as u64)
            .unwrap_or(0);
        let recombines = length > 0 && kind != ChromKind::Mito;

        let strands = parents
            .into_iter()
            .map(|parent| {
                let start_copy = self.rng.random_range(0..2usize);
                let mut crossovers = Vec::new();
                if recombines {
                    crossovers.push(self.rng.random_range(1..=length));
                    if self.rng.random_bool(self.extra_crossovers) {
                        crossovers.push(self.rng.random_range(1..=length));
                    }
                    crossovers.sort_unstable();
                }
                Strand {
                    parent,
                    start_copy,
                    crossovers,
                }
            })
            .collect();

        ChromosomePlan {
            chrom: chrom.to_string(),
            strands,
        }
    }

    /// Child genotype at `record`, given the sample columns of both parents
    pub fn child_genotype(&mut self, record: &VcfRecord, father: usize, mother: usize) -> Result<Genotype> {
        let stale = self
            .current
            .as_ref()
            .map(|plan| plan.chrom != record.chrom)
            .unwrap_or(true);
        if stale {
            let plan = self.plan_chromosome(&record.chrom);
            self.current = Some(plan);
        }
        let Some(plan) = self.current.as_ref() else {
            return Ok(Genotype::absent());
        };
        if plan.strands.is_empty() {
            return Ok(Genotype::absent());
        }

        let father_gt = record.genotype(father)?.unwrap_or_default();
        let mother_gt = record.genotype(mother)?.unwrap_or_default();
        let alleles = plan
            .strands
            .iter()
            .map(|strand| {
                let parent_gt = match strand.parent {
                    ParentRole::Father => &father_gt,
                    ParentRole::Mother => &mother_gt,
                };
                match parent_gt.copies() {
                    0 => None,
                    1 => parent_gt.allele(0),
                    _ => parent_gt.allele(strand.copy_at(record.pos)),
                }
            })
            .collect();
        Ok(Genotype::phased(alleles))
    }
}
