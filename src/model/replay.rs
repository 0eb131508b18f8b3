//! # Genome Replay
//!
//! Materialise one sample's genome as FASTA: the reference with the sample's
//! alleles substituted in, one sequence per contig and chromosome copy.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info_span;

use crate::data::sample::{PloidyMode, Sex};
use crate::error::{PedSimError, Result};
use crate::io::reference::{Contig, ReferenceGenome};
use crate::io::vcf::VcfRecord;

const LINE_WIDTH: usize = 60;

/// Allele strings that cannot be spelled out as bases
fn is_symbolic(allele: &str) -> bool {
    allele.is_empty() || allele.starts_with('<') || allele.contains(['[', ']', '*', '.'])
}

/// Number of copies to emit for a contig
///
/// Taken from the sample's calls where there are any, otherwise from the
/// ploidy mode with the sex left unknown.
fn contig_copies(contig: &Contig, records: &[&VcfRecord], sample: usize, ploidy: PloidyMode) -> Result<usize> {
    let mut copies = None;
    for record in records {
        if let Some(gt) = record.genotype(sample)? {
            copies = Some(copies.unwrap_or(0).max(gt.copies()));
        }
    }
    Ok(copies.unwrap_or_else(|| ploidy.copies(contig.name(), Sex::Unknown)))
}

/// Reference sequence of `contig` with the alleles carried on `copy` applied
fn haplotype_sequence(contig: &Contig, records: &[&VcfRecord], sample: usize, copy: usize) -> Result<Vec<u8>> {
    let seq = contig.seq();
    let mut out = Vec::with_capacity(seq.len());
    let mut cursor = 0usize;
    for record in records {
        let Some(allele) = record.genotype(sample)?.and_then(|gt| gt.allele(copy)) else {
            continue;
        };
        if allele == 0 {
            continue;
        }
        let alt = record.allele(allele).ok_or_else(|| {
            PedSimError::vcf(format!(
                "allele {allele} out of range at {}:{}",
                record.chrom, record.pos
            ))
        })?;
        if is_symbolic(alt) {
            continue;
        }
        let start = (record.pos as usize).saturating_sub(1);
        let end = start + record.ref_allele.len();
        // overlaps an allele already applied on this copy
        if start < cursor || end > seq.len() {
            continue;
        }
        out.extend_from_slice(&seq[cursor..start]);
        out.extend_from_slice(alt.as_bytes());
        cursor = end;
    }
    out.extend_from_slice(&seq[cursor..]);
    Ok(out)
}

fn write_sequence<W: Write>(writer: &mut W, name: &str, seq: &[u8]) -> Result<()> {
    writeln!(writer, ">{name}")?;
    for line in seq.chunks(LINE_WIDTH) {
        writer.write_all(line)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write the genome of sample column `sample` to `path`
///
/// Sequences are named `<contig>_<copy>` with copies counted from 1.
pub fn write_genome(
    path: &Path,
    reference: &ReferenceGenome,
    ploidy: PloidyMode,
    records: &[VcfRecord],
    sample: usize,
) -> Result<()> {
    info_span!("replay_genome", path = ?path).in_scope(|| {
        let mut by_contig: HashMap<&str, Vec<&VcfRecord>> = HashMap::new();
        for record in records {
            by_contig.entry(record.chrom.as_str()).or_default().push(record);
        }
        for list in by_contig.values_mut() {
            list.sort_by_key(|r| r.pos);
        }

        let file = File::create(path).map_err(|e| PedSimError::artifact(path, e))?;
        let mut writer = BufWriter::new(file);
        for contig in reference.contigs() {
            let list = by_contig.get(contig.name()).map(Vec::as_slice).unwrap_or(&[]);
            let copies = contig_copies(contig, list, sample, ploidy)?;
            for copy in 0..copies {
                let seq = haplotype_sequence(contig, list, sample, copy)?;
                write_sequence(&mut writer, &format!("{}_{}", contig.name(), copy + 1), &seq)?;
            }
        }
        writer.flush().map_err(|e| PedSimError::artifact(path, e))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reference() -> ReferenceGenome {
        ReferenceGenome::from_contigs(vec![
            Contig::new("1", b"AAAACCCCGGGGTTTT".to_vec()),
            Contig::new("Y", b"GGGG".to_vec()),
        ])
        .unwrap()
    }

    fn record(line: &str) -> VcfRecord {
        VcfRecord::parse(line, 1).unwrap()
    }

    #[test]
    fn test_substitutes_alleles_per_copy() {
        let reference = reference();
        let records = vec![
            record("1\t2\t.\tA\tT\t.\t.\t.\tGT\t1|0"),
            record("1\t5\t.\tCC\tG\t.\t.\t.\tGT\t0|1"),
            // overlaps the deletion on copy 2
            record("1\t6\t.\tC\tA\t.\t.\t.\tGT\t1|1"),
        ];
        let contig = reference.contig("1").unwrap();
        let refs: Vec<&VcfRecord> = records.iter().collect();
        assert_eq!(haplotype_sequence(contig, &refs, 0, 0).unwrap(), b"ATAACACCGGGGTTTT".to_vec());
        assert_eq!(haplotype_sequence(contig, &refs, 0, 1).unwrap(), b"AAAAGCCGGGGTTTT".to_vec());
    }

    #[test]
    fn test_write_genome_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S.fa");
        let reference = reference();
        let records = vec![record("1\t1\t.\tA\tC\t.\t.\t.\tGT\t1|0")];
        write_genome(&path, &reference, PloidyMode::Auto, &records, 0).unwrap();

        let written = ReferenceGenome::from_fasta(Cursor::new(std::fs::read(&path).unwrap())).unwrap();
        let names: Vec<&str> = written.contigs().iter().map(|c| c.name()).collect();
        // no calls on Y and unknown sex: no Y copies
        assert_eq!(names, vec!["1_1", "1_2"]);
        assert_eq!(written.contig("1_1").unwrap().seq(), b"CAAACCCCGGGGTTTT");
        assert_eq!(written.contig("1_2").unwrap().seq(), reference.contig("1").unwrap().seq());
    }

    #[test]
    fn test_long_sequences_wrap() {
        let mut buf = Vec::new();
        write_sequence(&mut buf, "c", &[b'A'; 130]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[3].len(), 10);
    }
}
