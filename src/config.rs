//! # Configuration
//!
//! ## Role
//! Command-line parsing (`Config`, clap derive) and the library-level
//! `SimulationSettings` the pipeline runs with.
//!
//! ## Validation
//! - Input VCF, pedigree and reference must exist.
//! - Extra crossover probability must lie in `[0, 1]`.
//! - An existing output file is refused unless `--force` is given.
//!
//! ## Example CLI
//! ```bash
//! pedsim -i population.vcf.gz -p family.ped -t ref.fa -o simulated --seed 42 --num-mutations 5
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::data::sample::PloidyMode;
use crate::error::{PedSimError, Result};

/// Name used for staged artifacts and the final output file
pub const MODULE_NAME: &str = "pedsamplesim";

/// Run-wide simulation settings
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    /// Master seed; a random one is drawn (and recorded) when absent
    pub seed: Option<u64>,
    /// Expected de novo mutations per created sample; 0 disables the stage
    pub expected_mutations: u32,
    /// Probability of a second crossover per chromosome and parent
    pub extra_crossovers: f64,
    /// Drop records no sample carries an alternate allele for
    pub remove_unused: bool,
    /// Write one genome FASTA per created sample
    pub output_genomes: bool,
    pub ploidy: PloidyMode,
    /// Write the final VCF uncompressed
    pub no_gzip: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            expected_mutations: 0,
            extra_crossovers: 0.01,
            remove_unused: false,
            output_genomes: false,
            ploidy: PloidyMode::Auto,
            no_gzip: false,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.extra_crossovers) {
            return Err(PedSimError::config(format!(
                "extra crossover probability must be in [0, 1], got {}",
                self.extra_crossovers
            )));
        }
        Ok(())
    }

    pub fn de_novo_enabled(&self) -> bool {
        self.expected_mutations > 0
    }

    /// File name of the final output inside the output directory
    pub fn output_file_name(&self) -> String {
        if self.no_gzip {
            format!("{MODULE_NAME}.vcf")
        } else {
            format!("{MODULE_NAME}.vcf.gz")
        }
    }
}

/// Simulate genotypes for the members of a pedigree
#[derive(Parser, Debug, Clone)]
#[command(name = "pedsim", version, about = "Simulate genotypes for every member of a pedigree")]
pub struct Config {
    /// Population VCF providing the sites (and existing samples)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Pedigree in PED format
    #[arg(short = 'p', long = "pedigree")]
    pub pedigree: PathBuf,

    /// Reference genome FASTA (plain or gzipped)
    #[arg(short = 't', long = "reference")]
    pub reference: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Master random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Expected number of de novo mutations per simulated sample
    #[arg(long = "num-mutations", default_value_t = 0)]
    pub num_mutations: u32,

    /// Probability of an extra crossover per chromosome
    #[arg(long = "extra-crossovers", default_value_t = 0.01)]
    pub extra_crossovers: f64,

    /// Remove records with no alternate allele in any sample
    #[arg(long = "remove-unused")]
    pub remove_unused: bool,

    /// Write the genome of each simulated sample as FASTA
    #[arg(long = "output-genomes")]
    pub output_genomes: bool,

    /// Ploidy handling for sex and mitochondrial chromosomes
    #[arg(long, value_enum, default_value_t = PloidyMode::Auto)]
    pub ploidy: PloidyMode,

    /// Do not compress the output VCF
    #[arg(long = "no-gzip")]
    pub no_gzip: bool,

    /// Overwrite existing output
    #[arg(long)]
    pub force: bool,

    /// Seconds between progress heartbeats (0 disables)
    #[arg(long = "heartbeat-secs", default_value_t = 0)]
    pub heartbeat_secs: u64,

    /// Log span timings
    #[arg(long)]
    pub profile: bool,
}

impl Config {
    /// Parse command line arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (what, path) in [
            ("input VCF", &self.input),
            ("pedigree", &self.pedigree),
            ("reference", &self.reference),
        ] {
            if !path.exists() {
                return Err(PedSimError::config(format!("{what} not found: {}", path.display())));
            }
        }
        if self.output.exists() && !self.output.is_dir() {
            return Err(PedSimError::config(format!(
                "output {} exists and is not a directory",
                self.output.display()
            )));
        }
        let out = self.output_path();
        if out.exists() && !self.force {
            return Err(PedSimError::config(format!(
                "output {} already exists (use --force to overwrite)",
                out.display()
            )));
        }
        self.settings().validate()
    }

    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            seed: self.seed,
            expected_mutations: self.num_mutations,
            extra_crossovers: self.extra_crossovers,
            remove_unused: self.remove_unused,
            output_genomes: self.output_genomes,
            ploidy: self.ploidy,
            no_gzip: self.no_gzip,
        }
    }

    /// Path of the final output VCF
    pub fn output_path(&self) -> PathBuf {
        output_path(&self.output, &self.settings())
    }
}

pub fn output_path(dir: &Path, settings: &SimulationSettings) -> PathBuf {
    dir.join(settings.output_file_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path, extra: &[&str]) -> Config {
        for name in ["in.vcf", "fam.ped", "ref.fa"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        let mut args = vec![
            "pedsim".to_string(),
            "-i".to_string(),
            dir.join("in.vcf").display().to_string(),
            "-p".to_string(),
            dir.join("fam.ped").display().to_string(),
            "-t".to_string(),
            dir.join("ref.fa").display().to_string(),
            "-o".to_string(),
            dir.join("out").display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Config::parse_from(args)
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &[]);
        config.validate().unwrap();
        let settings = config.settings();
        assert_eq!(settings.seed, None);
        assert!(!settings.de_novo_enabled());
        assert_eq!(settings.ploidy, PloidyMode::Auto);
        assert!(config.output_path().ends_with("pedsamplesim.vcf.gz"));
    }

    #[test]
    fn test_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            dir.path(),
            &["--seed", "42", "--num-mutations", "3", "--ploidy", "haploid", "--no-gzip", "--remove-unused"],
        );
        let settings = config.settings();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.expected_mutations, 3);
        assert_eq!(settings.ploidy, PloidyMode::Haploid);
        assert!(settings.remove_unused);
        assert!(config.output_path().ends_with("pedsamplesim.vcf"));
    }

    #[test]
    fn test_crossover_range() {
        let settings = SimulationSettings {
            extra_crossovers: 1.5,
            ..SimulationSettings::default()
        };
        assert!(matches!(settings.validate(), Err(PedSimError::Config { .. })));
    }

    #[test]
    fn test_existing_output_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let config_plain = config(dir.path(), &[]);
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(config_plain.output_path(), "").unwrap();
        assert!(config_plain.validate().is_err());
        let forced = config(dir.path(), &["--force"]);
        forced.validate().unwrap();
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &[]);
        std::fs::remove_file(dir.path().join("fam.ped")).unwrap();
        assert!(config.validate().is_err());
    }
}
