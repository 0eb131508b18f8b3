//! # Genotype Calls
//!
//! `GT` values as allele index lists, e.g. `0|1`, `1/1`, `0`, `./.`.

use std::fmt;
use std::str::FromStr;

use crate::error::PedSimError;

/// A genotype call: one optional allele index per chromosome copy
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Genotype {
    alleles: Vec<Option<usize>>,
    phased: bool,
}

impl Genotype {
    pub fn phased(alleles: Vec<Option<usize>>) -> Self {
        Self {
            alleles,
            phased: true,
        }
    }

    /// Call for a sample with no copies of the chromosome
    pub fn absent() -> Self {
        Self::default()
    }

    /// Homozygous reference call with the given number of copies
    pub fn reference(copies: usize) -> Self {
        Self::phased(vec![Some(0); copies])
    }

    pub fn alleles(&self) -> &[Option<usize>] {
        &self.alleles
    }

    pub fn copies(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_phased(&self) -> bool {
        self.phased
    }

    /// True if no copy is called
    pub fn is_missing(&self) -> bool {
        self.alleles.iter().all(Option::is_none)
    }

    /// True if any copy carries a non-reference allele
    pub fn has_alt(&self) -> bool {
        self.alleles.iter().any(|a| matches!(a, Some(i) if *i > 0))
    }

    /// Allele carried on copy `copy`, if called
    pub fn allele(&self, copy: usize) -> Option<usize> {
        self.alleles.get(copy).copied().flatten()
    }

    pub fn set_allele(&mut self, copy: usize, allele: usize) {
        if let Some(slot) = self.alleles.get_mut(copy) {
            *slot = Some(allele);
        }
    }
}

impl FromStr for Genotype {
    type Err = PedSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PedSimError::vcf("empty genotype"));
        }
        let phased = !s.contains('/');
        let alleles = s
            .split(['|', '/'])
            .map(|a| match a {
                "." => Ok(None),
                idx => idx
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| PedSimError::vcf(format!("invalid genotype: {s}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alleles, phased })
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alleles.is_empty() {
            return f.write_str(".");
        }
        let sep = if self.phased { '|' } else { '/' };
        for (i, allele) in self.alleles.iter().enumerate() {
            if i > 0 {
                write!(f, "{sep}")?;
            }
            match allele {
                Some(idx) => write!(f, "{idx}")?,
                None => f.write_str(".")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genotype() {
        let gt: Genotype = "0|1".parse().unwrap();
        assert_eq!(gt.alleles(), &[Some(0), Some(1)]);
        assert!(gt.is_phased());
        assert!(gt.has_alt());

        let gt: Genotype = "1/2".parse().unwrap();
        assert!(!gt.is_phased());
        assert_eq!(gt.allele(1), Some(2));

        let gt: Genotype = "./.".parse().unwrap();
        assert!(gt.is_missing());
        assert_eq!(gt.copies(), 2);
    }

    #[test]
    fn test_parse_haploid() {
        let gt: Genotype = "1".parse().unwrap();
        assert_eq!(gt.copies(), 1);
        assert_eq!(gt.to_string(), "1");
    }

    #[test]
    fn test_invalid_genotype() {
        assert!("0|x".parse::<Genotype>().is_err());
        assert!("".parse::<Genotype>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Genotype::phased(vec![Some(0), Some(1)]).to_string(), "0|1");
        assert_eq!(Genotype::reference(1).to_string(), "0");
        assert_eq!(Genotype::absent().to_string(), ".");
        assert_eq!("./1".parse::<Genotype>().unwrap().to_string(), "./1");
    }
}
