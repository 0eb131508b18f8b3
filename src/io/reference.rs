//! # Reference Genome
//!
//! In-memory FASTA reference. The pipeline only passes it through; the
//! built-in simulator reads contig lengths, contig order and bases from it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::info_span;

use crate::error::{PedSimError, Result};

/// One reference sequence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contig {
    name: String,
    seq: Vec<u8>,
}

impl Contig {
    pub fn new(name: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        let mut seq = seq.into();
        seq.make_ascii_uppercase();
        Self {
            name: name.into(),
            seq,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Ordered set of reference contigs
#[derive(Clone, Debug, Default)]
pub struct ReferenceGenome {
    contigs: Vec<Contig>,
    by_name: HashMap<String, usize>,
}

impl ReferenceGenome {
    pub fn from_contigs(contigs: Vec<Contig>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(contigs.len());
        for (idx, contig) in contigs.iter().enumerate() {
            if by_name.insert(contig.name.clone(), idx).is_some() {
                return Err(PedSimError::reference(format!(
                    "duplicate contig name: {}",
                    contig.name
                )));
            }
        }
        Ok(Self { contigs, by_name })
    }

    /// Load a FASTA file, gzip-compressed if named `.gz`
    pub fn load(path: &Path) -> Result<Self> {
        info_span!("reference_load", path = ?path).in_scope(|| {
            let file = File::open(path).map_err(|e| PedSimError::artifact(path, e))?;
            let gz = path.extension().map(|e| e == "gz").unwrap_or(false);
            let reader: Box<dyn BufRead> = if gz {
                Box::new(BufReader::new(MultiGzDecoder::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };
            Self::from_fasta(reader)
        })
    }

    /// Parse FASTA text; the contig name is the first word of the `>` line
    pub fn from_fasta<R: BufRead>(reader: R) -> Result<Self> {
        let mut contigs = Vec::new();
        let mut current: Option<(String, Vec<u8>)> = None;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if let Some(desc) = line.strip_prefix('>') {
                if let Some((name, seq)) = current.take() {
                    contigs.push(Contig::new(name, seq));
                }
                let name = desc.split_whitespace().next().unwrap_or_default();
                if name.is_empty() {
                    return Err(PedSimError::parse(idx + 1, "FASTA header without a name"));
                }
                current = Some((name.to_string(), Vec::new()));
            } else if !line.is_empty() {
                match current.as_mut() {
                    Some((_, seq)) => seq.extend_from_slice(line.as_bytes()),
                    None => {
                        return Err(PedSimError::parse(idx + 1, "sequence data before first FASTA header"))
                    }
                }
            }
        }
        if let Some((name, seq)) = current {
            contigs.push(Contig::new(name, seq));
        }
        if contigs.is_empty() {
            return Err(PedSimError::reference("reference contains no sequences"));
        }
        Self::from_contigs(contigs)
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn contig(&self, name: &str) -> Option<&Contig> {
        self.by_name.get(name).map(|&i| &self.contigs[i])
    }

    /// Position of a contig in reference order
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Base at a 1-based position
    pub fn base(&self, name: &str, pos: u64) -> Option<u8> {
        let contig = self.contig(name)?;
        let idx = usize::try_from(pos).ok()?.checked_sub(1)?;
        contig.seq.get(idx).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_fasta() {
        let text = ">chr1 first\nACGT\nacgt\n>chrX\nNNAA\n";
        let reference = ReferenceGenome::from_fasta(Cursor::new(text)).unwrap();
        assert_eq!(reference.contigs().len(), 2);
        assert_eq!(reference.contig("chr1").unwrap().seq(), b"ACGTACGT");
        assert_eq!(reference.rank("chrX"), Some(1));
        assert_eq!(reference.base("chr1", 2), Some(b'C'));
        assert_eq!(reference.base("chr1", 0), None);
        assert_eq!(reference.base("chr1", 9), None);
    }

    #[test]
    fn test_duplicate_contig_rejected() {
        let text = ">a\nAC\n>a\nGT\n";
        assert!(ReferenceGenome::from_fasta(Cursor::new(text)).is_err());
    }

    #[test]
    fn test_sequence_before_header_rejected() {
        let err = ReferenceGenome::from_fasta(Cursor::new("ACGT\n")).unwrap_err();
        assert!(matches!(err, PedSimError::Parse { line: 1, .. }));
    }
}
