//! # Population Genotyping
//!
//! Genotypes for samples without known parents, drawn per chromosome copy
//! from the alternate allele frequencies (`INFO/AF`) of each site.

use rand::Rng;

use crate::data::genotype::Genotype;
use crate::error::{PedSimError, Result};
use crate::io::vcf::VcfRecord;

/// Alternate allele frequencies of a record, empty if `AF` is absent
pub fn alt_frequencies(record: &VcfRecord) -> Result<Vec<f64>> {
    let Some(af) = record.info_value("AF") else {
        return Ok(Vec::new());
    };
    let freqs = af
        .split(',')
        .map(|v| match v {
            "." => Ok(0.0),
            v => v.parse::<f64>().map_err(|_| {
                PedSimError::vcf(format!("invalid AF value {v} at {}:{}", record.chrom, record.pos))
            }),
        })
        .collect::<Result<Vec<f64>>>()?;
    if freqs.len() != record.alts.len() {
        return Err(PedSimError::vcf(format!(
            "AF has {} values but {}:{} has {} alternate alleles",
            freqs.len(),
            record.chrom,
            record.pos,
            record.alts.len()
        )));
    }
    Ok(freqs)
}

/// Pick one allele index: alt `i` with probability `freqs[i]`, otherwise REF
fn draw_allele<R: Rng>(freqs: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.random();
    let mut cumulative = 0.0;
    for (i, f) in freqs.iter().enumerate() {
        cumulative += f;
        if r < cumulative {
            return i + 1;
        }
    }
    0
}

/// Draw a phased genotype with `copies` chromosome copies
///
/// Sites without frequencies are homozygous reference and consume no
/// randomness.
pub fn draw_genotype<R: Rng>(record: &VcfRecord, copies: usize, rng: &mut R) -> Result<Genotype> {
    if copies == 0 {
        return Ok(Genotype::absent());
    }
    let freqs = alt_frequencies(record)?;
    if freqs.is_empty() {
        return Ok(Genotype::reference(copies));
    }
    let alleles = (0..copies).map(|_| Some(draw_allele(&freqs, rng))).collect();
    Ok(Genotype::phased(alleles))
}

/// True if any sample carries a non-reference allele at this record
pub fn is_used(record: &VcfRecord) -> Result<bool> {
    Ok(record.genotypes()?.iter().any(Genotype::has_alt))
}
