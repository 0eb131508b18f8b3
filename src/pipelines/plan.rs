//! # Simulation Plan
//!
//! The flat list of stages a run executes, assembled once from the family
//! order and the settings. Every stage except the final `Finalize` is one job.

use std::collections::HashSet;

use crate::config::SimulationSettings;
use crate::model::ordering::FamilyOrder;
use crate::utils::telemetry::PipelinePhase;

/// One step of the pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Independent { sample: String },
    Cleanup,
    FamilyChild { child: String, father: String, mother: String },
    DeNovo { sample: String },
    Replay { sample: String },
    Finalize,
}

impl Stage {
    pub fn is_job(&self) -> bool {
        !matches!(self, Stage::Finalize)
    }

    /// Pipeline phase this stage runs in
    pub fn phase(&self) -> PipelinePhase {
        match self {
            Stage::Independent { .. } => PipelinePhase::StagingIndependents,
            Stage::Cleanup => PipelinePhase::UnusedCleanup,
            Stage::FamilyChild { .. } => PipelinePhase::StagingFamilies,
            Stage::DeNovo { .. } => PipelinePhase::DeNovo,
            Stage::Replay { .. } => PipelinePhase::Replay,
            Stage::Finalize => PipelinePhase::Finalizing,
        }
    }

    /// Short label used to name the artifact a stage produces
    pub fn label(&self) -> String {
        match self {
            Stage::Independent { sample } => sample.clone(),
            Stage::Cleanup => "remove-unused".to_string(),
            Stage::FamilyChild { child, .. } => child.clone(),
            Stage::DeNovo { sample } => format!("{sample}-denovo"),
            Stage::Replay { sample } => format!("{sample}-replay"),
            Stage::Finalize => "final".to_string(),
        }
    }
}

/// Number of jobs for a run with the given shape
pub fn expected_job_count(
    independents: usize,
    children: usize,
    de_novo: bool,
    replay: bool,
    cleanup: bool,
) -> usize {
    (independents + children) * (1 + usize::from(de_novo) + usize::from(replay)) + usize::from(cleanup)
}

/// Ordered stages of one run
#[derive(Clone, Debug)]
pub struct SimulationPlan {
    order: FamilyOrder,
    stages: Vec<Stage>,
}

impl SimulationPlan {
    pub fn build(order: FamilyOrder, settings: &SimulationSettings) -> Self {
        let mut stages = Vec::new();
        stages.extend(
            order
                .independents
                .iter()
                .map(|sample| Stage::Independent { sample: sample.clone() }),
        );
        if settings.remove_unused {
            stages.push(Stage::Cleanup);
        }

        let pending: HashSet<&str> = order.children.iter().map(String::as_str).collect();
        let mut children = Vec::with_capacity(order.children.len());
        for family in &order.families {
            for child in family.children().filter(|c| pending.contains(c)) {
                children.push(child.to_string());
                stages.push(Stage::FamilyChild {
                    child: child.to_string(),
                    father: family.father().to_string(),
                    mother: family.mother().to_string(),
                });
            }
        }

        let created: Vec<String> = order.independents.iter().cloned().chain(children).collect();
        if settings.de_novo_enabled() {
            stages.extend(created.iter().map(|sample| Stage::DeNovo { sample: sample.clone() }));
        }
        if settings.output_genomes {
            stages.extend(created.iter().map(|sample| Stage::Replay { sample: sample.clone() }));
        }
        stages.push(Stage::Finalize);

        let plan = Self { order, stages };
        debug_assert_eq!(
            plan.total_jobs(),
            expected_job_count(
                plan.order.independents.len(),
                plan.order.children.len(),
                settings.de_novo_enabled(),
                settings.output_genomes,
                settings.remove_unused,
            )
        );
        plan
    }

    pub fn order(&self) -> &FamilyOrder {
        &self.order
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_jobs(&self) -> usize {
        self.stages.iter().filter(|s| s.is_job()).count()
    }

    pub fn n_created(&self) -> usize {
        self.order.n_created()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pedigree::Family;

    fn trio_order() -> FamilyOrder {
        FamilyOrder {
            independents: vec!["F".into(), "M".into()],
            families: vec![Family::new("F", "M").with_child("C")],
            children: vec!["C".into()],
        }
    }

    #[test]
    fn test_expected_job_count() {
        assert_eq!(expected_job_count(2, 1, false, false, false), 3);
        assert_eq!(expected_job_count(2, 1, true, false, false), 6);
        assert_eq!(expected_job_count(2, 1, true, true, true), 10);
        assert_eq!(expected_job_count(0, 0, true, true, true), 1);
    }

    #[test]
    fn test_total_matches_formula_for_every_combination() {
        for bits in 0..8u8 {
            let settings = SimulationSettings {
                expected_mutations: u32::from(bits & 1),
                output_genomes: bits & 2 != 0,
                remove_unused: bits & 4 != 0,
                ..SimulationSettings::default()
            };
            let plan = SimulationPlan::build(trio_order(), &settings);
            assert_eq!(plan.total_jobs(), plan.stages().len() - 1);
            assert_eq!(
                plan.total_jobs(),
                expected_job_count(2, 1, bits & 1 != 0, bits & 2 != 0, bits & 4 != 0)
            );
        }
    }

    #[test]
    fn test_stage_order() {
        let settings = SimulationSettings {
            expected_mutations: 2,
            output_genomes: true,
            remove_unused: true,
            ..SimulationSettings::default()
        };
        let plan = SimulationPlan::build(trio_order(), &settings);
        let labels: Vec<String> = plan.stages().iter().map(Stage::label).collect();
        assert_eq!(
            labels,
            vec![
                "F", "M", "remove-unused", "C", "F-denovo", "M-denovo", "C-denovo", "F-replay", "M-replay",
                "C-replay", "final"
            ]
        );
        assert_eq!(
            plan.stages()[3],
            Stage::FamilyChild {
                child: "C".into(),
                father: "F".into(),
                mother: "M".into()
            }
        );
    }

    #[test]
    fn test_existing_children_skipped() {
        let order = FamilyOrder {
            independents: vec![],
            families: vec![Family::new("F", "M").with_child("A").with_child("B")],
            children: vec!["B".into()],
        };
        let plan = SimulationPlan::build(order, &SimulationSettings::default());
        assert_eq!(plan.total_jobs(), 1);
        assert_eq!(plan.stages()[0].label(), "B");
    }

    #[test]
    fn test_empty_plan_is_finalize_only() {
        let plan = SimulationPlan::build(FamilyOrder::default(), &SimulationSettings::default());
        assert_eq!(plan.stages(), &[Stage::Finalize]);
        assert_eq!(plan.total_jobs(), 0);
    }
}
