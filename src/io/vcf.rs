//! # VCF Reading and Writing
//!
//! Stream VCF records between staged artifacts.
//!
//! The header is validated with `noodles::vcf::Header`, but its meta lines
//! are kept verbatim so a file rewritten without changes is byte-identical.
//! Records are split into a typed `VcfRecord` with per-sample field access.
//! Staged files are bgzf-compressed and tabix-indexed with noodles.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use noodles::bgzf::io as bgzf_io;
use noodles::vcf::Header;
use tracing::info_span;

use crate::data::genotype::Genotype;
use crate::error::{PedSimError, Result};
use crate::io::artifact::index_path;

pub const GT_FORMAT_LINE: &str =
    "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">";

const FIXED_COLUMNS: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

/// True if the path names a bgzipped file
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "gz" || e == "bgz")
        .unwrap_or(false)
}

/// Meta lines and sample names of a VCF
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VcfHeader {
    meta: Vec<String>,
    samples: Vec<String>,
}

impl VcfHeader {
    pub fn new(meta: Vec<String>, samples: Vec<String>) -> Self {
        Self { meta, samples }
    }

    /// Parse header text (meta lines plus `#CHROM` line)
    pub fn parse(text: &str) -> Result<Self> {
        let header: Header = text.parse()?;
        let samples = header.sample_names().iter().map(|s| s.to_string()).collect();
        let meta = text
            .lines()
            .filter(|l| l.starts_with("##"))
            .map(str::to_string)
            .collect();
        Ok(Self { meta, samples })
    }

    pub fn meta_lines(&self) -> &[String] {
        &self.meta
    }

    pub fn sample_names(&self) -> &[String] {
        &self.samples
    }

    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == name)
    }

    /// Set a `##key=value` line, replacing any earlier lines for the same key
    pub fn set_meta_value(&mut self, key: &str, value: impl std::fmt::Display) {
        let prefix = format!("##{key}=");
        self.meta.retain(|m| !m.starts_with(&prefix));
        self.meta.push(format!("{prefix}{value}"));
    }

    /// Add a FORMAT/INFO definition unless its ID is already declared
    pub fn ensure_definition(&mut self, line: &str) {
        let id_prefix = match line.find(',') {
            Some(end) => &line[..=end],
            None => line,
        };
        if !self.meta.iter().any(|m| m.starts_with(id_prefix)) {
            self.meta.push(line.to_string());
        }
    }

    /// Append a sample column, returning its index
    pub fn add_sample(&mut self, name: &str) -> Result<usize> {
        if self.sample_index(name).is_some() {
            return Err(PedSimError::vcf(format!("sample {name} already present")));
        }
        self.ensure_definition(GT_FORMAT_LINE);
        self.samples.push(name.to_string());
        Ok(self.samples.len() - 1)
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        for line in &self.meta {
            writeln!(writer, "{}", line)?;
        }
        write!(writer, "{}", FIXED_COLUMNS)?;
        if !self.samples.is_empty() {
            write!(writer, "\tFORMAT")?;
            for sample in &self.samples {
                write!(writer, "\t{}", sample)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// One VCF data line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub ref_allele: String,
    pub alts: Vec<String>,
    pub qual: String,
    pub filter: String,
    pub info: String,
    pub format: Vec<String>,
    pub samples: Vec<Vec<String>>,
}

impl VcfRecord {
    /// A new site with no sample columns
    pub fn new(chrom: impl Into<String>, pos: u64, ref_allele: impl Into<String>, alts: Vec<String>) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            id: ".".to_string(),
            ref_allele: ref_allele.into(),
            alts,
            qual: ".".to_string(),
            filter: ".".to_string(),
            info: ".".to_string(),
            format: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Parse a tab-separated data line
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(PedSimError::parse(
                line_no,
                format!("expected at least 8 VCF columns, found {}", fields.len()),
            ));
        }
        let pos = fields[1]
            .parse::<u64>()
            .map_err(|_| PedSimError::parse(line_no, format!("invalid position: {}", fields[1])))?;
        let alts = match fields[4] {
            "." => Vec::new(),
            alts => alts.split(',').map(str::to_string).collect(),
        };
        let format = fields
            .get(8)
            .map(|f| f.split(':').map(str::to_string).collect())
            .unwrap_or_default();
        let samples = fields
            .iter()
            .skip(9)
            .map(|s| s.split(':').map(str::to_string).collect())
            .collect();
        Ok(Self {
            chrom: fields[0].to_string(),
            pos,
            id: fields[2].to_string(),
            ref_allele: fields[3].to_string(),
            alts,
            qual: fields[5].to_string(),
            filter: fields[6].to_string(),
            info: fields[7].to_string(),
            format,
            samples,
        })
    }

    /// Allele string by index (0 = REF)
    pub fn allele(&self, idx: usize) -> Option<&str> {
        if idx == 0 {
            Some(&self.ref_allele)
        } else {
            self.alts.get(idx - 1).map(String::as_str)
        }
    }

    /// Value of an INFO key (`None` for absent keys and flags)
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info.split(';').find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    fn format_index(&self, key: &str) -> Option<usize> {
        self.format.iter().position(|k| k == key)
    }

    /// Declare a FORMAT key, padding existing samples with `.`
    pub fn ensure_format(&mut self, key: &str) -> usize {
        if let Some(idx) = self.format_index(key) {
            return idx;
        }
        self.format.push(key.to_string());
        for sample in &mut self.samples {
            sample.push(".".to_string());
        }
        self.format.len() - 1
    }

    /// Sample field value, `.` if the sample omits trailing fields
    pub fn sample_value(&self, sample: usize, key: &str) -> Option<&str> {
        let idx = self.format_index(key)?;
        let values = self.samples.get(sample)?;
        Some(values.get(idx).map(String::as_str).unwrap_or("."))
    }

    pub fn set_sample_value(&mut self, sample: usize, key: &str, value: impl Into<String>) {
        let idx = self.ensure_format(key);
        if let Some(values) = self.samples.get_mut(sample) {
            if values.len() <= idx {
                values.resize(idx + 1, ".".to_string());
            }
            values[idx] = value.into();
        }
    }

    pub fn genotype(&self, sample: usize) -> Result<Option<Genotype>> {
        match self.sample_value(sample, "GT") {
            Some(gt) => Ok(Some(gt.parse()?)),
            None => Ok(None),
        }
    }

    /// Every sample genotype; samples without GT count as missing
    pub fn genotypes(&self) -> Result<Vec<Genotype>> {
        (0..self.samples.len())
            .map(|i| Ok(self.genotype(i)?.unwrap_or_default()))
            .collect()
    }

    /// Append a sample column holding only a genotype
    pub fn push_genotype(&mut self, genotype: &Genotype) {
        let gt_idx = self.ensure_format("GT");
        let mut values = vec![".".to_string(); self.format.len()];
        values[gt_idx] = genotype.to_string();
        self.samples.push(values);
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let alts = if self.alts.is_empty() {
            ".".to_string()
        } else {
            self.alts.join(",")
        };
        write!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom, self.pos, self.id, self.ref_allele, alts, self.qual, self.filter, self.info
        )?;
        if !self.format.is_empty() {
            write!(writer, "\t{}", self.format.join(":"))?;
            for sample in &self.samples {
                write!(writer, "\t{}", sample.join(":"))?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// Streaming VCF reader
pub struct VcfReader {
    header: VcfHeader,
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    pending: Option<String>,
}

impl VcfReader {
    /// Open a VCF file (bgzipped if named `.gz`/`.bgz`) and read the header
    pub fn open(path: &Path) -> Result<Self> {
        info_span!("vcf_open", path = ?path).in_scope(|| {
            let file = File::open(path).map_err(|e| PedSimError::artifact(path, e))?;
            let reader: Box<dyn BufRead + Send> = if is_compressed(path) {
                Box::new(BufReader::new(bgzf_io::Reader::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };
            Self::from_reader(reader)
        })
    }

    /// Create from a reader positioned at the start of the header
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let mut header_str = String::new();
        let mut line_no = 0;
        let mut pending = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            if line.starts_with('#') {
                let is_column_line = line.starts_with("#CHROM");
                header_str.push_str(&line);
                if is_column_line {
                    break;
                }
            } else {
                pending = Some(line);
                break;
            }
        }
        if !header_str.contains("#CHROM") {
            return Err(PedSimError::vcf("missing #CHROM header line"));
        }
        let header = VcfHeader::parse(&header_str)?;
        Ok(Self {
            header,
            reader,
            line_no,
            pending,
        })
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// Read the next record, `None` at end of file
    pub fn read_record(&mut self) -> Result<Option<VcfRecord>> {
        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => {
                    let mut line = String::new();
                    if self.reader.read_line(&mut line)? == 0 {
                        return Ok(None);
                    }
                    self.line_no += 1;
                    line
                }
            };
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            return VcfRecord::parse(trimmed, self.line_no).map(Some);
        }
    }

    /// Read every remaining record
    pub fn read_all(&mut self) -> Result<Vec<VcfRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Read only the sample names of a VCF
pub fn read_sample_names(path: &Path) -> Result<Vec<String>> {
    Ok(VcfReader::open(path)?.header().sample_names().to_vec())
}

enum Sink {
    Bgzf(BufWriter<bgzf_io::Writer<File>>),
    Plain(BufWriter<File>),
}

/// VCF file writer
pub struct VcfWriter {
    sink: Sink,
}

impl VcfWriter {
    /// Create a writer; bgzf compression follows the file name
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| PedSimError::artifact(path, e))?;
        let sink = if is_compressed(path) {
            Sink::Bgzf(BufWriter::new(bgzf_io::Writer::new(file)))
        } else {
            Sink::Plain(BufWriter::new(file))
        };
        Ok(Self { sink })
    }

    fn inner(&mut self) -> &mut dyn Write {
        match &mut self.sink {
            Sink::Bgzf(w) => w,
            Sink::Plain(w) => w,
        }
    }

    pub fn write_header(&mut self, header: &VcfHeader) -> Result<()> {
        header.write_to(self.inner())
    }

    pub fn write_record(&mut self, record: &VcfRecord) -> Result<()> {
        record.write_to(self.inner())
    }

    /// Flush buffered data and write the bgzf EOF marker
    pub fn finish(self) -> Result<()> {
        match self.sink {
            Sink::Bgzf(w) => {
                let mut bgzf = w.into_inner().map_err(|e| e.into_error())?;
                bgzf.try_finish()?;
            }
            Sink::Plain(mut w) => w.flush()?,
        }
        Ok(())
    }
}

/// Write a complete VCF (header plus records) to `path`
pub fn write_vcf(path: &Path, header: &VcfHeader, records: &[VcfRecord]) -> Result<()> {
    info_span!("vcf_write", path = ?path, n_records = records.len()).in_scope(|| {
        let mut writer = VcfWriter::create(path)?;
        writer.write_header(header)?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.finish()
    })
}

/// Build the tabix sidecar of a bgzipped VCF
pub fn index_vcf(path: &Path) -> Result<()> {
    info_span!("vcf_index", path = ?path).in_scope(|| {
        let index = noodles::vcf::fs::index(path).map_err(|e| PedSimError::artifact(path, e))?;
        let dst = index_path(path);
        noodles::tabix::fs::write(&dst, &index).map_err(|e| PedSimError::artifact(&dst, e))?;
        Ok(())
    })
}
