//! # De Novo Mutations
//!
//! New SNVs that appear in one sample without being inherited.
//!
//! The number of mutations is Poisson-distributed around the expected count.
//! Positions are uniform over the contigs where the sample carries at least
//! one copy. A position is redrawn if it already holds a record or the
//! reference base is not A/C/G/T. The mutant allele lands on one randomly
//! chosen copy and the sample is flagged with `FORMAT/DN=Y`; every other
//! sample is left uncalled at the new site.

use std::collections::HashSet;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::{debug, warn};

use crate::data::genotype::Genotype;
use crate::data::sample::{PloidyMode, Sex};
use crate::error::{PedSimError, Result};
use crate::io::reference::ReferenceGenome;
use crate::io::vcf::{VcfHeader, VcfRecord};

pub const DN_FORMAT_LINE: &str =
    "##FORMAT=<ID=DN,Number=1,Type=Character,Description=\"Whether this is a de novo mutation\">";

const MAX_ATTEMPTS_PER_MUTATION: usize = 100;
const BASES: [u8; 4] = *b"ACGT";

/// Draw the number of mutations for one sample
pub fn mutation_count<R: Rng>(expected: u32, rng: &mut R) -> Result<usize> {
    if expected == 0 {
        return Ok(0);
    }
    let poisson = Poisson::new(f64::from(expected))
        .map_err(|e| PedSimError::config(format!("invalid expected mutation count: {e}")))?;
    Ok(poisson.sample(rng) as usize)
}

/// Pick a uniformly random position over the eligible contigs
fn draw_site<R: Rng>(eligible: &[(usize, u64)], total: u64, rng: &mut R) -> (usize, u64) {
    let mut offset = rng.random_range(0..total);
    for &(contig, len) in eligible {
        if offset < len {
            return (contig, offset + 1);
        }
        offset -= len;
    }
    let (contig, len) = eligible[eligible.len() - 1];
    (contig, len)
}

/// Insert de novo mutations for `sample` into `records`, keeping reference order
#[allow(clippy::too_many_arguments)]
pub fn add_de_novo_mutations<R: Rng>(
    header: &mut VcfHeader,
    records: &mut Vec<VcfRecord>,
    reference: &ReferenceGenome,
    ploidy: PloidyMode,
    sample: usize,
    sex: Sex,
    expected: u32,
    rng: &mut R,
) -> Result<usize> {
    let eligible: Vec<(usize, u64)> = reference
        .contigs()
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_empty() && ploidy.copies(c.name(), sex) > 0)
        .map(|(i, c)| (i, c.len() as u64))
        .collect();
    let total: u64 = eligible.iter().map(|&(_, len)| len).sum();
    let n = mutation_count(expected, rng)?;
    if n == 0 || total == 0 {
        return Ok(0);
    }

    header.ensure_definition(DN_FORMAT_LINE);
    let n_samples = header.sample_names().len();
    let mut occupied: HashSet<(String, u64)> =
        records.iter().map(|r| (r.chrom.clone(), r.pos)).collect();

    let mut added = Vec::with_capacity(n);
    for _ in 0..n {
        let mut placed = false;
        for _ in 0..MAX_ATTEMPTS_PER_MUTATION {
            let (contig_idx, pos) = draw_site(&eligible, total, rng);
            let contig = &reference.contigs()[contig_idx];
            let ref_base = contig.seq()[(pos - 1) as usize];
            if !BASES.contains(&ref_base) || occupied.contains(&(contig.name().to_string(), pos)) {
                continue;
            }
            let alt_choices: Vec<u8> = BASES.iter().copied().filter(|&b| b != ref_base).collect();
            let alt = alt_choices[rng.random_range(0..alt_choices.len())];
            let copies = ploidy.copies(contig.name(), sex);
            let mut gt = Genotype::reference(copies);
            gt.set_allele(rng.random_range(0..copies), 1);

            let mut record = VcfRecord::new(
                contig.name(),
                pos,
                (ref_base as char).to_string(),
                vec![(alt as char).to_string()],
            );
            record.filter = "PASS".to_string();
            record.format = vec!["GT".to_string(), "DN".to_string()];
            record.samples = (0..n_samples)
                .map(|i| {
                    if i == sample {
                        vec![gt.to_string(), "Y".to_string()]
                    } else {
                        vec![".".to_string(), ".".to_string()]
                    }
                })
                .collect();

            occupied.insert((contig.name().to_string(), pos));
            added.push(record);
            placed = true;
            break;
        }
        if !placed {
            warn!("could not place a de novo mutation after {} attempts", MAX_ATTEMPTS_PER_MUTATION);
        }
    }

    let n_added = added.len();
    debug!(n_added, "de novo mutations placed");
    records.extend(added);
    // stable: records on contigs missing from the reference keep their relative order at the end
    records.sort_by_key(|r| (reference.rank(&r.chrom).unwrap_or(usize::MAX), r.pos));
    Ok(n_added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reference::Contig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reference() -> ReferenceGenome {
        ReferenceGenome::from_contigs(vec![
            Contig::new("1", b"ACGTACGTACGTACGTACGT".to_vec()),
            Contig::new("2", b"NNNNNNNNNNGGGGGGGGGG".to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_expected_draws_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(mutation_count(0, &mut rng).unwrap(), 0);
    }

    #[test]
    fn test_mutations_inserted_in_order() {
        let reference = reference();
        let mut header = VcfHeader::new(vec!["##fileformat=VCFv4.2".into()], vec!["A".into(), "B".into()]);
        let mut records = vec![
            VcfRecord::parse("1\t5\t.\tA\tC\t.\t.\t.\tGT\t0|0\t0|1", 1).unwrap(),
            VcfRecord::parse("2\t15\t.\tG\tT\t.\t.\t.\tGT\t0|0\t0|0", 2).unwrap(),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let added = add_de_novo_mutations(
            &mut header,
            &mut records,
            &reference,
            PloidyMode::Diploid,
            0,
            Sex::Female,
            8,
            &mut rng,
        )
        .unwrap();
        assert_eq!(records.len(), 2 + added);
        assert!(header.meta_lines().iter().any(|l| l == DN_FORMAT_LINE));

        let keys: Vec<(usize, u64)> = records
            .iter()
            .map(|r| (reference.rank(&r.chrom).unwrap(), r.pos))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted, "records sorted without duplicate sites");

        for r in records.iter().filter(|r| r.sample_value(0, "DN") == Some("Y")) {
            assert_ne!(r.ref_allele, "N");
            assert_eq!(r.alts.len(), 1);
            assert_ne!(r.alts[0], r.ref_allele);
            let gt = r.genotype(0).unwrap().unwrap();
            assert_eq!(gt.alleles().iter().filter(|a| **a == Some(1)).count(), 1);
            assert!(r.genotype(1).unwrap().unwrap().is_missing());
        }
    }

    #[test]
    fn test_same_seed_same_mutations() {
        let reference = reference();
        let run = || {
            let mut header = VcfHeader::new(Vec::new(), vec!["A".into()]);
            let mut records = Vec::new();
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            add_de_novo_mutations(
                &mut header,
                &mut records,
                &reference,
                PloidyMode::Auto,
                0,
                Sex::Male,
                5,
                &mut rng,
            )
            .unwrap();
            records
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_soft_masked_reference_accepted() {
        let reference = ReferenceGenome::from_contigs(vec![Contig::new("1", b"acgt".repeat(50))]).unwrap();
        let mut header = VcfHeader::new(Vec::new(), vec!["A".into()]);
        let mut records = Vec::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let added = add_de_novo_mutations(
            &mut header,
            &mut records,
            &reference,
            PloidyMode::Diploid,
            0,
            Sex::Female,
            12,
            &mut rng,
        )
        .unwrap();
        assert!(added > 0);
        assert_eq!(records.len(), added);
        for r in &records {
            assert!(["A", "C", "G", "T"].contains(&r.ref_allele.as_str()));
            assert_ne!(r.alts[0], r.ref_allele);
        }
    }
}
