//! # I/O Module
//!
//! File reading/writing boundaries: PED pedigrees, VCF artifacts, FASTA
//! references and the lifecycle of staged files.

pub mod artifact;
pub mod ped;
pub mod reference;
pub mod vcf;
