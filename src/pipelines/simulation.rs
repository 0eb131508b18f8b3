//! # Simulation Pipeline
//!
//! ## Role
//! Run a `SimulationPlan` as a chain of jobs over staged VCF artifacts.
//!
//! ## State machine
//! `Idle -> StagingIndependents -> (UnusedCleanup) -> StagingFamilies ->
//! (DeNovo) -> (Replay) -> Finalizing -> Done`, with `Failed` reachable from
//! every non-terminal phase.
//!
//! Each job reads the current artifact and writes a new one. The previous
//! artifact is retired only once its successor exists; the population input
//! is never deleted. When a job fails the run stops immediately and the
//! artifact it was writing is left in the output directory.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, info_span, warn};

use crate::config::{output_path, SimulationSettings, MODULE_NAME};
use crate::data::pedigree::PedigreeGraph;
use crate::error::{PedSimError, Result};
use crate::io::artifact::{Artifact, ArtifactStore};
use crate::io::vcf::read_sample_names;
use crate::model::ordering::FamilyOrderer;
use crate::model::seeds::{SeedDerivation, SeedStream, SimulationRole};
use crate::model::simulator::{SampleContext, SampleSimulator};
use crate::model::statistics::GenotypeStatistics;
use crate::pipelines::aggregate::Aggregator;
use crate::pipelines::plan::{SimulationPlan, Stage};
use crate::utils::telemetry::{PipelinePhase, ProgressBoard};

/// The artifact the next job reads
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrentArtifact {
    /// The population input, owned by the caller
    Input(Artifact),
    /// A staged artifact owned by the pipeline
    Staged(Artifact),
}

impl CurrentArtifact {
    pub fn artifact(&self) -> &Artifact {
        match self {
            CurrentArtifact::Input(a) | CurrentArtifact::Staged(a) => a,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, CurrentArtifact::Staged(_))
    }
}

/// State threaded through every stage
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub current: CurrentArtifact,
    /// Samples present in the current artifact
    pub simulated: HashSet<String>,
    /// Samples this run created, in creation order
    pub created: Vec<String>,
    /// Side outputs written by replay jobs
    pub genomes: Vec<PathBuf>,
    pub jobs_done: usize,
    pub total_jobs: usize,
}

impl PipelineState {
    pub fn new(input: Artifact, existing: HashSet<String>, total_jobs: usize) -> Self {
        Self {
            current: CurrentArtifact::Input(input),
            simulated: existing,
            created: Vec::new(),
            genomes: Vec::new(),
            jobs_done: 0,
            total_jobs,
        }
    }
}

/// Job seed streams, one per role
struct JobSeeds {
    mutation: SeedStream,
    inheritance: SeedStream,
    de_novo: SeedStream,
}

impl JobSeeds {
    fn new(seeds: &SeedDerivation) -> Self {
        Self {
            mutation: seeds.stream(SimulationRole::Mutation),
            inheritance: seeds.stream(SimulationRole::Inheritance),
            de_novo: seeds.stream(SimulationRole::DeNovo),
        }
    }
}

/// Executes the job stages of a plan
pub struct JobPipeline<'a> {
    simulator: &'a mut dyn SampleSimulator,
    pedigree: &'a PedigreeGraph,
    store: ArtifactStore,
    settings: SimulationSettings,
    seeds: JobSeeds,
    board: Arc<ProgressBoard>,
    phase: PipelinePhase,
}

impl<'a> JobPipeline<'a> {
    pub fn new(
        simulator: &'a mut dyn SampleSimulator,
        pedigree: &'a PedigreeGraph,
        store: ArtifactStore,
        settings: SimulationSettings,
        seeds: &SeedDerivation,
        board: Arc<ProgressBoard>,
    ) -> Self {
        Self {
            simulator,
            pedigree,
            store,
            settings,
            seeds: JobSeeds::new(seeds),
            board,
            phase: PipelinePhase::Idle,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    fn enter(&mut self, phase: PipelinePhase) {
        if self.phase != phase {
            info!("Phase: {}", phase.as_str());
            self.phase = phase;
            self.board.set_phase(phase);
        }
    }

    /// Run every job stage of `plan`, stopping at `Finalize`
    pub fn run(&mut self, plan: &SimulationPlan, mut state: PipelineState) -> Result<PipelineState> {
        self.board.set_total_jobs(state.total_jobs);
        for stage in plan.stages().iter().filter(|s| s.is_job()) {
            match self.run_stage(state, stage) {
                Ok(next) => state = next,
                Err(e) => {
                    self.enter(PipelinePhase::Failed);
                    error!("{} failed: {}", stage.label(), e);
                    return Err(e);
                }
            }
        }
        self.enter(PipelinePhase::Finalizing);
        Ok(state)
    }

    fn sample_context(&self, sample: &str, seed: u64) -> SampleContext {
        SampleContext::new(sample, self.pedigree.sex(sample), seed)
    }

    /// Make `output` current, retiring the previous staged artifact
    fn advance(&self, mut state: PipelineState, output: Artifact) -> Result<PipelineState> {
        let prior = std::mem::replace(&mut state.current, CurrentArtifact::Staged(output));
        if let CurrentArtifact::Staged(prior) = prior {
            self.store.retire(prior)?;
        }
        Ok(state)
    }

    fn finish_job(&self, mut state: PipelineState) -> PipelineState {
        state.jobs_done += 1;
        self.board.set_jobs_done(state.jobs_done);
        info!("Simulation: {}/{} Finished", state.jobs_done, state.total_jobs);
        state
    }

    /// Execute one job stage
    pub fn run_stage(&mut self, state: PipelineState, stage: &Stage) -> Result<PipelineState> {
        self.enter(stage.phase());
        let state = match stage {
            Stage::Independent { sample } => {
                if state.simulated.contains(sample) {
                    return Err(PedSimError::simulation(sample, "sample simulated twice"));
                }
                let seed = self.seeds.mutation.next_seed();
                let ctx = self.sample_context(sample, seed);
                let output = self.store.create(&stage.label())?;
                self.simulator
                    .mutate_independent(state.current.artifact(), &output, &ctx)?;
                let mut state = self.advance(state, output)?;
                state.simulated.insert(sample.clone());
                state.created.push(sample.clone());
                state
            }
            Stage::Cleanup => {
                let output = self.store.create(&stage.label())?;
                self.simulator.filter_unused(state.current.artifact(), &output)?;
                self.advance(state, output)?
            }
            Stage::FamilyChild { child, father, mother } => {
                if state.simulated.contains(child) {
                    return Err(PedSimError::simulation(child, "sample simulated twice"));
                }
                for parent in [father, mother] {
                    if !state.simulated.contains(parent) {
                        return Err(PedSimError::simulation(
                            child,
                            format!("parent {parent} has not been simulated"),
                        ));
                    }
                }
                let seed = self.seeds.inheritance.next_seed();
                let ctx = self
                    .sample_context(child, seed)
                    .with_parents(father.as_str(), mother.as_str());
                let output = self.store.create(&stage.label())?;
                self.simulator
                    .mutate_child(state.current.artifact(), &output, &ctx)?;
                let mut state = self.advance(state, output)?;
                state.simulated.insert(child.clone());
                state.created.push(child.clone());
                state
            }
            Stage::DeNovo { sample } => {
                let seed = self.seeds.de_novo.next_seed();
                let ctx = self.sample_context(sample, seed);
                let output = self.store.create(&stage.label())?;
                self.simulator.mutate_de_novo(
                    state.current.artifact(),
                    &output,
                    &ctx,
                    self.settings.expected_mutations,
                )?;
                self.advance(state, output)?
            }
            Stage::Replay { sample } => {
                let genome = self
                    .simulator
                    .replay_sample(state.current.artifact(), sample, self.store.dir())?;
                let mut state = state;
                state.genomes.push(genome);
                state
            }
            Stage::Finalize => return Ok(state),
        };
        Ok(self.finish_job(state))
    }
}

/// Result of a complete run
#[derive(Debug)]
pub struct SimulationOutcome {
    pub output: PathBuf,
    pub seed: u64,
    pub created: Vec<String>,
    pub jobs: usize,
    pub genomes: Vec<PathBuf>,
    pub statistics: Option<GenotypeStatistics>,
}

/// Top-level driver: pedigree and population input in, simulated VCF out
pub struct PedigreeSimulation {
    input: PathBuf,
    out_dir: PathBuf,
    settings: SimulationSettings,
    board: Arc<ProgressBoard>,
}

impl PedigreeSimulation {
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, settings: SimulationSettings) -> Self {
        Self {
            input: input.into(),
            out_dir: out_dir.into(),
            settings,
            board: ProgressBoard::new(),
        }
    }

    /// Report progress on a shared board
    pub fn with_progress(mut self, board: Arc<ProgressBoard>) -> Self {
        self.board = board;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        output_path(&self.out_dir, &self.settings)
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Simulate every pedigree sample missing from the input
    ///
    /// The statistics report is written to `report` when samples were created.
    pub fn run<W: Write + ?Sized>(
        &self,
        pedigree: &PedigreeGraph,
        simulator: &mut dyn SampleSimulator,
        report: &mut W,
    ) -> Result<SimulationOutcome> {
        self.settings.validate()?;
        fs::create_dir_all(&self.out_dir).map_err(|e| PedSimError::artifact(&self.out_dir, e))?;

        let existing: HashSet<String> = read_sample_names(&self.input)?.into_iter().collect();
        let order = FamilyOrderer::plan(pedigree, &existing)?;
        let seeds = SeedDerivation::from_optional(self.settings.seed);
        let plan = SimulationPlan::build(order, &self.settings);
        info!(
            seed = seeds.master(),
            samples = plan.n_created(),
            jobs = plan.total_jobs(),
            "simulation planned"
        );
        if plan.order().independents.is_empty() && plan.order().children.is_empty() && !pedigree.is_empty() {
            warn!("every pedigree sample already exists in the input");
        }

        let store = ArtifactStore::new(&self.out_dir, MODULE_NAME);
        let state = PipelineState::new(Artifact::from_path(&self.input), existing, plan.total_jobs());
        let mut pipeline = JobPipeline::new(
            simulator,
            pedigree,
            store.clone(),
            self.settings.clone(),
            &seeds,
            self.board.clone(),
        );
        let state = info_span!("jobs").in_scope(|| pipeline.run(&plan, state))?;

        let aggregator = Aggregator::new(self.output_path(), seeds.master());
        let staged = state.current.is_staged();
        let final_output = aggregator
            .finalize(&store, state.current.artifact().clone(), staged, &state.created, report)
            .inspect_err(|_| self.board.set_phase(PipelinePhase::Failed))?;
        self.board.set_phase(PipelinePhase::Done);

        Ok(SimulationOutcome {
            output: final_output.path,
            seed: seeds.master(),
            created: state.created,
            jobs: state.jobs_done,
            genomes: state.genomes,
            statistics: final_output.statistics,
        })
    }
}
