//! # Sample Definitions
//!
//! Pedigree members, their sex, and the number of chromosome copies each
//! one carries under a given ploidy mode.

use std::fmt;

/// Sex of a pedigree member as declared in the PED file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Parse the PED sex column (`1` male, `2` female, anything else unknown)
    pub fn from_ped_code(code: &str) -> Self {
        match code {
            "1" => Sex::Male,
            "2" => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Run-wide ploidy assumption passed through to the simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PloidyMode {
    /// Sex-aware: autosomes diploid, X/Y/MT follow the sample's sex
    #[default]
    Auto,
    /// Every chromosome carries two copies
    Diploid,
    /// Every chromosome carries one copy
    Haploid,
}

/// Chromosome class, derived from the contig name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChromKind {
    Autosome,
    X,
    Y,
    Mito,
}

impl ChromKind {
    /// Classify a contig name, with or without a `chr` prefix
    pub fn from_name(name: &str) -> Self {
        let bare = name
            .strip_prefix("chr")
            .or_else(|| name.strip_prefix("Chr"))
            .unwrap_or(name);
        match bare {
            "X" | "x" => ChromKind::X,
            "Y" | "y" => ChromKind::Y,
            "M" | "MT" | "m" | "mt" => ChromKind::Mito,
            _ => ChromKind::Autosome,
        }
    }
}

impl PloidyMode {
    /// Number of copies of `chrom` carried by a sample of the given sex
    pub fn copies(self, chrom: &str, sex: Sex) -> usize {
        match self {
            PloidyMode::Diploid => 2,
            PloidyMode::Haploid => 1,
            PloidyMode::Auto => match (ChromKind::from_name(chrom), sex) {
                (ChromKind::Autosome, _) => 2,
                (ChromKind::Mito, _) => 1,
                (ChromKind::X, Sex::Male) => 1,
                (ChromKind::X, _) => 2,
                (ChromKind::Y, Sex::Male) => 1,
                (ChromKind::Y, _) => 0,
            },
        }
    }
}

/// A pedigree member
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    id: String,
    sex: Sex,
}

impl Sample {
    pub fn new(id: impl Into<String>, sex: Sex) -> Self {
        Self { id: id.into(), sex }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_from_ped_code() {
        assert_eq!(Sex::from_ped_code("1"), Sex::Male);
        assert_eq!(Sex::from_ped_code("2"), Sex::Female);
        assert_eq!(Sex::from_ped_code("0"), Sex::Unknown);
        assert_eq!(Sex::from_ped_code("other"), Sex::Unknown);
    }

    #[test]
    fn test_chrom_kind() {
        assert_eq!(ChromKind::from_name("chrX"), ChromKind::X);
        assert_eq!(ChromKind::from_name("Y"), ChromKind::Y);
        assert_eq!(ChromKind::from_name("chrM"), ChromKind::Mito);
        assert_eq!(ChromKind::from_name("MT"), ChromKind::Mito);
        assert_eq!(ChromKind::from_name("chr1"), ChromKind::Autosome);
        assert_eq!(ChromKind::from_name("Xenopus"), ChromKind::Autosome);
    }

    #[test]
    fn test_auto_ploidy_copies() {
        let auto = PloidyMode::Auto;
        assert_eq!(auto.copies("1", Sex::Male), 2);
        assert_eq!(auto.copies("chrX", Sex::Male), 1);
        assert_eq!(auto.copies("chrX", Sex::Female), 2);
        assert_eq!(auto.copies("chrY", Sex::Female), 0);
        assert_eq!(auto.copies("chrY", Sex::Male), 1);
        assert_eq!(auto.copies("MT", Sex::Female), 1);
        assert_eq!(PloidyMode::Haploid.copies("chrY", Sex::Female), 1);
        assert_eq!(PloidyMode::Diploid.copies("chrX", Sex::Male), 2);
    }
}
