//! # Family Ordering
//!
//! ## Role
//! Decide the order in which samples are simulated so that every parent
//! exists in the artifact before any of its children are generated.
//!
//! ## Layers
//! 1. Independent samples, lexical by id.
//! 2. Families, topologically sorted: family A precedes family B whenever a
//!    child of A is a parent in B. Ties are broken by the (father, mother)
//!    pair so the order never depends on input line order.
//!
//! A cycle between families means the pedigree is malformed and is reported
//! as a validation error.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::data::pedigree::{Family, PedigreeGraph};
use crate::error::{PedSimError, Result};

/// Two-layer simulation order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FamilyOrder {
    /// Samples simulated without inheritance, lexical order
    pub independents: Vec<String>,
    /// Families in parent-before-child order
    pub families: Vec<Family>,
    /// Family children that still need simulating, in the order they will be visited
    pub children: Vec<String>,
}

impl FamilyOrder {
    /// Number of samples this order will create
    pub fn n_created(&self) -> usize {
        self.independents.len() + self.children.len()
    }

    /// Every sample to be created, independents first then children
    pub fn created_samples(&self) -> impl Iterator<Item = &str> {
        self.independents
            .iter()
            .chain(self.children.iter())
            .map(String::as_str)
    }
}

/// Topological sorter for pedigree families
pub struct FamilyOrderer;

impl FamilyOrderer {
    /// Build the simulation order for a pedigree, skipping samples that
    /// already exist in the population input
    pub fn plan(pedigree: &PedigreeGraph, existing: &HashSet<String>) -> Result<FamilyOrder> {
        let families = Self::order(pedigree.families())?;

        let family_children: HashSet<&str> =
            families.iter().flat_map(|f| f.children()).collect();

        let independents: Vec<String> = pedigree
            .sample_ids()
            .filter(|id| !existing.contains(*id) && !family_children.contains(id))
            .map(str::to_string)
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut children = Vec::new();
        for family in &families {
            for child in family.children() {
                if !existing.contains(child) && seen.insert(child) {
                    children.push(child.to_string());
                }
            }
        }

        debug!(
            n_independents = independents.len(),
            n_families = families.len(),
            n_children = children.len(),
            "family order computed"
        );

        Ok(FamilyOrder {
            independents,
            families,
            children,
        })
    }

    /// Topologically sort families (Kahn's algorithm with a lexical ready set)
    pub fn order(families: &[Family]) -> Result<Vec<Family>> {
        let mut sorted: Vec<&Family> = families.iter().collect();
        sorted.sort_by(|a, b| a.key().cmp(&b.key()));
        let n = sorted.len();

        // successors[a] holds every family with a parent among a's children
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for (a, fa) in sorted.iter().enumerate() {
            for (b, fb) in sorted.iter().enumerate() {
                if fa.children().any(|c| fb.is_parent(c)) {
                    successors[a].push(b);
                    in_degree[b] += 1;
                }
            }
        }

        // indices follow key order, so the smallest index is the smallest key
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_first() {
            order.push(sorted[next].clone());
            for &succ in &successors[next] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }

        if order.len() != n {
            let stuck: Vec<String> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| format!("{}x{}", sorted[i].father(), sorted[i].mother()))
                .collect();
            return Err(PedSimError::validation(format!(
                "families form a cycle: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::Sex;
    use crate::io::ped::PedRecord;

    fn three_generations() -> PedigreeGraph {
        PedigreeGraph::from_records(vec![
            PedRecord::new("gc", Some("c1"), Some("sp"), Sex::Female),
            PedRecord::new("c1", Some("f"), Some("m"), Sex::Male),
            PedRecord::new("sp", None, None, Sex::Female),
            PedRecord::new("c2", Some("f"), Some("m"), Sex::Female),
            PedRecord::new("f", None, None, Sex::Male),
            PedRecord::new("m", None, None, Sex::Female),
        ])
        .unwrap()
    }

    #[test]
    fn test_parents_before_children() {
        let order = FamilyOrderer::plan(&three_generations(), &HashSet::new()).unwrap();
        assert_eq!(order.independents, vec!["f", "m", "sp"]);
        let keys: Vec<_> = order.families.iter().map(|f| f.key()).collect();
        // (c1, sp) sorts before (f, m) lexically but depends on it
        assert_eq!(keys, vec![("f", "m"), ("c1", "sp")]);
        assert_eq!(order.children, vec!["c1", "c2", "gc"]);
        assert_eq!(order.n_created(), 6);
    }

    #[test]
    fn test_every_parent_precedes_child() {
        let graph = three_generations();
        let order = FamilyOrderer::plan(&graph, &HashSet::new()).unwrap();
        let sequence: Vec<&str> = order.created_samples().collect();
        let position = |id: &str| sequence.iter().position(|s| *s == id).unwrap();
        for family in graph.families() {
            for child in family.children() {
                assert!(position(family.father()) < position(child));
                assert!(position(family.mother()) < position(child));
            }
        }
    }

    #[test]
    fn test_existing_samples_skipped() {
        let existing: HashSet<String> = ["f", "m", "c1"].iter().map(|s| s.to_string()).collect();
        let order = FamilyOrderer::plan(&three_generations(), &existing).unwrap();
        assert_eq!(order.independents, vec!["sp"]);
        assert_eq!(order.children, vec!["c2", "gc"]);
    }

    #[test]
    fn test_independent_ties_are_lexical() {
        let families = vec![
            Family::new("b", "y").with_child("k2"),
            Family::new("a", "z").with_child("k1"),
        ];
        let order = FamilyOrderer::order(&families).unwrap();
        assert_eq!(order[0].key(), ("a", "z"));
        assert_eq!(order[1].key(), ("b", "y"));
    }

    #[test]
    fn test_family_cycle_rejected() {
        let families = vec![
            Family::new("a", "b").with_child("c"),
            Family::new("c", "d").with_child("a"),
        ];
        let err = FamilyOrderer::order(&families).unwrap_err();
        assert!(matches!(err, PedSimError::Validation { .. }));
    }
}
