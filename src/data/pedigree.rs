//! # Pedigree Graph
//!
//! Samples, parent-child and mate relationships, and complete families for
//! one simulation run. Read-only after construction.
//!
//! ## Validation
//! - Sample ids are unique
//! - Every referenced parent is itself declared
//! - Nobody is their own parent, fathers are not female, mothers are not male
//! - The parent-child relation has no cycles
//!
//! A sample with exactly one declared parent is not part of any family. It
//! is kept as an independent sample and reported with a warning.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use tracing::warn;

use crate::data::sample::{Sample, Sex};
use crate::error::{PedSimError, Result};
use crate::io::ped::{read_ped, PedRecord};

/// Typed edge between two samples
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relationship {
    ParentChild { parent: String, child: String },
    Mate { first: String, second: String },
}

/// A father, a mother and their (lexically ordered) children
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Family {
    father: String,
    mother: String,
    children: BTreeSet<String>,
}

impl Family {
    pub fn new(father: impl Into<String>, mother: impl Into<String>) -> Self {
        Self {
            father: father.into(),
            mother: mother.into(),
            children: BTreeSet::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.insert(child.into());
        self
    }

    pub fn father(&self) -> &str {
        &self.father
    }

    pub fn mother(&self) -> &str {
        &self.mother
    }

    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn is_parent(&self, id: &str) -> bool {
        self.father == id || self.mother == id
    }

    /// Stable ordering key: the parent pair
    pub fn key(&self) -> (&str, &str) {
        (&self.father, &self.mother)
    }
}

#[derive(Clone, Debug, Default)]
struct Parents {
    father: Option<String>,
    mother: Option<String>,
}

/// Full pedigree for one run
#[derive(Clone, Debug)]
pub struct PedigreeGraph {
    samples: BTreeMap<String, Sample>,
    parents: BTreeMap<String, Parents>,
    relationships: Vec<Relationship>,
    families: Vec<Family>,
    incomplete: BTreeSet<String>,
}

impl PedigreeGraph {
    /// Load and validate a PED file
    pub fn load(path: &Path) -> Result<Self> {
        let records = read_ped(path)?;
        Self::from_records(records)
    }

    /// Build and validate a pedigree from parsed records
    pub fn from_records(records: Vec<PedRecord>) -> Result<Self> {
        let mut samples = BTreeMap::new();
        let mut parents = BTreeMap::new();
        for record in &records {
            if samples.contains_key(&record.id) {
                return Err(PedSimError::validation(format!(
                    "duplicate sample id: {}",
                    record.id
                )));
            }
            samples.insert(record.id.clone(), Sample::new(record.id.clone(), record.sex));
            parents.insert(
                record.id.clone(),
                Parents {
                    father: record.father.clone(),
                    mother: record.mother.clone(),
                },
            );
        }

        let mut relationships = Vec::new();
        let mut by_pair: BTreeMap<(String, String), Family> = BTreeMap::new();
        let mut incomplete = BTreeSet::new();

        for (child, p) in &parents {
            for (parent, role) in [(&p.father, "father"), (&p.mother, "mother")] {
                let Some(parent) = parent else { continue };
                let Some(parent_sample) = samples.get(parent) else {
                    return Err(PedSimError::validation(format!(
                        "{role} {parent} of sample {child} is not declared in the pedigree"
                    )));
                };
                if parent == child {
                    return Err(PedSimError::validation(format!(
                        "sample {child} is declared as its own {role}"
                    )));
                }
                let inconsistent = match role {
                    "father" => parent_sample.sex() == Sex::Female,
                    _ => parent_sample.sex() == Sex::Male,
                };
                if inconsistent {
                    return Err(PedSimError::validation(format!(
                        "{role} {parent} of sample {child} has sex {}",
                        parent_sample.sex()
                    )));
                }
                relationships.push(Relationship::ParentChild {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }

            match (&p.father, &p.mother) {
                (Some(father), Some(mother)) => {
                    if father == mother {
                        return Err(PedSimError::validation(format!(
                            "sample {child} lists {father} as both father and mother"
                        )));
                    }
                    by_pair
                        .entry((father.clone(), mother.clone()))
                        .or_insert_with(|| Family::new(father.clone(), mother.clone()))
                        .children
                        .insert(child.clone());
                }
                (Some(_), None) | (None, Some(_)) => {
                    warn!(
                        sample = %child,
                        "Sample {} is a child of a non-complete family, generating as independent individual",
                        child
                    );
                    incomplete.insert(child.clone());
                }
                (None, None) => {}
            }
        }

        for (father, mother) in by_pair.keys() {
            relationships.push(Relationship::Mate {
                first: father.clone(),
                second: mother.clone(),
            });
        }
        relationships.sort();

        let graph = Self {
            samples,
            parents,
            relationships,
            families: by_pair.into_values().collect(),
            incomplete,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Reject pedigrees where a sample is its own ancestor
    fn check_acyclic(&self) -> Result<()> {
        let mut n_parents: BTreeMap<&str, usize> =
            self.samples.keys().map(|id| (id.as_str(), 0)).collect();
        let mut children_of: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rel in &self.relationships {
            if let Relationship::ParentChild { parent, child } = rel {
                *n_parents.entry(child.as_str()).or_default() += 1;
                children_of.entry(parent.as_str()).or_default().push(child.as_str());
            }
        }

        let mut queue: VecDeque<&str> = n_parents
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            for &child in children_of.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                let n = n_parents.entry(child).or_default();
                *n -= 1;
                if *n == 0 {
                    queue.push_back(child);
                }
            }
        }

        if visited != self.samples.len() {
            let stuck: Vec<&str> = n_parents
                .iter()
                .filter(|(_, n)| **n > 0)
                .map(|(&id, _)| id)
                .collect();
            return Err(PedSimError::validation(format!(
                "parent-child cycle involving samples: {}",
                stuck.join(", ")
            )));
        }
        Ok(())
    }

    /// All sample ids in lexical order
    pub fn sample_ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.values()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample(&self, id: &str) -> Option<&Sample> {
        self.samples.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.samples.contains_key(id)
    }

    /// Declared sex, `Unknown` for ids outside the pedigree
    pub fn sex(&self, id: &str) -> Sex {
        self.samples.get(id).map(Sample::sex).unwrap_or_default()
    }

    /// Declared (father, mother) of a sample
    pub fn parents_of(&self, id: &str) -> (Option<&str>, Option<&str>) {
        self.parents
            .get(id)
            .map(|p| (p.father.as_deref(), p.mother.as_deref()))
            .unwrap_or((None, None))
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Complete families, sorted by (father, mother)
    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Samples with exactly one declared parent
    pub fn incomplete_children(&self) -> impl Iterator<Item = &str> {
        self.incomplete.iter().map(String::as_str)
    }

    pub fn is_incomplete_child(&self, id: &str) -> bool {
        self.incomplete.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::log_capture::CapturedLogs;

    fn trio() -> Vec<PedRecord> {
        vec![
            PedRecord::new("F", None, None, Sex::Male),
            PedRecord::new("M", None, None, Sex::Female),
            PedRecord::new("C", Some("F"), Some("M"), Sex::Female),
        ]
    }

    #[test]
    fn test_trio_family() {
        let graph = PedigreeGraph::from_records(trio()).unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.families().len(), 1);
        let family = &graph.families()[0];
        assert_eq!(family.key(), ("F", "M"));
        assert_eq!(family.children().collect::<Vec<_>>(), vec!["C"]);
        assert_eq!(graph.parents_of("C"), (Some("F"), Some("M")));
        assert!(graph.relationships().contains(&Relationship::Mate {
            first: "F".into(),
            second: "M".into()
        }));
        let parent_edges = graph
            .relationships()
            .iter()
            .filter(|r| matches!(r, Relationship::ParentChild { .. }))
            .count();
        assert_eq!(parent_edges, 2);
    }

    #[test]
    fn test_duplicate_sample_rejected() {
        let mut records = trio();
        records.push(PedRecord::new("F", None, None, Sex::Male));
        let err = PedigreeGraph::from_records(records).unwrap_err();
        assert!(matches!(err, PedSimError::Validation { .. }));
    }

    #[test]
    fn test_undeclared_parent_rejected() {
        let records = vec![
            PedRecord::new("M", None, None, Sex::Female),
            PedRecord::new("C", Some("ghost"), Some("M"), Sex::Male),
        ];
        let err = PedigreeGraph::from_records(records).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_inconsistent_parent_sex_rejected() {
        let records = vec![
            PedRecord::new("F", None, None, Sex::Female),
            PedRecord::new("M", None, None, Sex::Female),
            PedRecord::new("C", Some("F"), Some("M"), Sex::Male),
        ];
        assert!(PedigreeGraph::from_records(records).is_err());
    }

    #[test]
    fn test_cycle_rejected() {
        let records = vec![
            PedRecord::new("A", Some("B"), Some("X"), Sex::Male),
            PedRecord::new("X", None, None, Sex::Female),
            PedRecord::new("B", Some("A"), Some("X"), Sex::Male),
        ];
        let err = PedigreeGraph::from_records(records).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_single_parent_is_incomplete() {
        let records = vec![
            PedRecord::new("M", None, None, Sex::Female),
            PedRecord::new("C", None, Some("M"), Sex::Male),
        ];
        let logs = CapturedLogs::default();
        let graph = logs.capture(|| PedigreeGraph::from_records(records)).unwrap();
        assert!(graph.families().is_empty());
        assert!(graph.is_incomplete_child("C"));
        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("Sample C is a child of a non-complete family"));
        assert_eq!(graph.incomplete_children().collect::<Vec<_>>(), vec!["C"]);
    }

    #[test]
    fn test_unknown_sex_parent_accepted() {
        let records = vec![
            PedRecord::new("P1", None, None, Sex::Unknown),
            PedRecord::new("P2", None, None, Sex::Unknown),
            PedRecord::new("K", Some("P1"), Some("P2"), Sex::Unknown),
        ];
        let graph = PedigreeGraph::from_records(records).unwrap();
        assert_eq!(graph.families().len(), 1);
        assert_eq!(graph.sex("K"), Sex::Unknown);
    }
}
