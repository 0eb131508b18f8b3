//! # Progress Board
//!
//! Thread-safe progress tracking for the simulation pipeline.
//!
//! The pipeline updates atomic counters as jobs finish; an optional
//! background heartbeat thread reads them and reports progress to stderr.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Result;

/// Phase of the job pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelinePhase {
    Idle = 0,
    StagingIndependents = 1,
    UnusedCleanup = 2,
    StagingFamilies = 3,
    DeNovo = 4,
    Replay = 5,
    Finalizing = 6,
    Done = 7,
    Failed = 8,
}

impl PipelinePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelinePhase::Idle => "Idle",
            PipelinePhase::StagingIndependents => "Staging Independents",
            PipelinePhase::UnusedCleanup => "Unused Cleanup",
            PipelinePhase::StagingFamilies => "Staging Families",
            PipelinePhase::DeNovo => "De Novo",
            PipelinePhase::Replay => "Replay",
            PipelinePhase::Finalizing => "Finalizing",
            PipelinePhase::Done => "Done",
            PipelinePhase::Failed => "Failed",
        }
    }

    /// True once the pipeline can no longer advance
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Failed)
    }

    fn from_u64(val: u64) -> Self {
        match val {
            0 => PipelinePhase::Idle,
            1 => PipelinePhase::StagingIndependents,
            2 => PipelinePhase::UnusedCleanup,
            3 => PipelinePhase::StagingFamilies,
            4 => PipelinePhase::DeNovo,
            5 => PipelinePhase::Replay,
            6 => PipelinePhase::Finalizing,
            7 => PipelinePhase::Done,
            _ => PipelinePhase::Failed,
        }
    }
}

/// Shared progress counters.
///
/// Relaxed ordering throughout: the heartbeat only needs approximate values.
pub struct ProgressBoard {
    phase: AtomicU64,
    jobs_done: AtomicU64,
    total_jobs: AtomicU64,
    start_time: Instant,
    last_progress_nanos: AtomicU64,
    shutdown: AtomicBool,
}

impl ProgressBoard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub fn set_phase(&self, phase: PipelinePhase) {
        self.phase.store(phase as u64, Ordering::Relaxed);
        self.touch_progress();
    }

    #[inline]
    pub fn phase(&self) -> PipelinePhase {
        PipelinePhase::from_u64(self.phase.load(Ordering::Relaxed))
    }

    pub fn set_total_jobs(&self, total: usize) {
        self.total_jobs.store(total as u64, Ordering::Relaxed);
    }

    pub fn total_jobs(&self) -> u64 {
        self.total_jobs.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_jobs_done(&self, done: usize) {
        self.jobs_done.store(done as u64, Ordering::Relaxed);
        self.touch_progress();
    }

    pub fn jobs_done(&self) -> u64 {
        self.jobs_done.load(Ordering::Relaxed)
    }

    #[inline]
    fn touch_progress(&self) {
        let elapsed = self.start_time.elapsed().as_nanos() as u64;
        self.last_progress_nanos.store(elapsed, Ordering::Relaxed);
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase(),
            jobs_done: self.jobs_done(),
            total_jobs: self.total_jobs(),
            elapsed_secs: self.elapsed_secs(),
            last_progress_nanos: self.last_progress_nanos.load(Ordering::Relaxed),
            current_nanos: self.start_time.elapsed().as_nanos() as u64,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self {
            phase: AtomicU64::new(PipelinePhase::Idle as u64),
            jobs_done: AtomicU64::new(0),
            total_jobs: AtomicU64::new(0),
            start_time: Instant::now(),
            last_progress_nanos: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        }
    }
}

struct ProgressSnapshot {
    phase: PipelinePhase,
    jobs_done: u64,
    total_jobs: u64,
    elapsed_secs: f64,
    last_progress_nanos: u64,
    current_nanos: u64,
}

/// Heartbeat output configuration
pub struct HeartbeatConfig {
    /// Interval between heartbeats (seconds)
    pub interval_secs: u64,
    /// Stall warning threshold (seconds with no finished job)
    pub stall_threshold_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            stall_threshold_secs: 600,
        }
    }
}

/// Handle to the heartbeat thread
pub struct HeartbeatHandle {
    handle: Option<JoinHandle<()>>,
    board: Arc<ProgressBoard>,
}

impl HeartbeatHandle {
    pub fn spawn(board: Arc<ProgressBoard>, config: HeartbeatConfig) -> Result<Self> {
        let shared = board.clone();
        let is_tty = io::stderr().is_terminal();
        let handle = thread::Builder::new()
            .name("heartbeat".to_string())
            .spawn(move || heartbeat_loop(shared, config, is_tty))?;
        Ok(Self {
            handle: Some(handle),
            board,
        })
    }

    /// Signal shutdown and wait for the thread to finish
    pub fn shutdown(mut self) {
        self.board.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        // don't block in drop
        self.board.signal_shutdown();
    }
}

fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{:.0}m{:.0}s", mins, remaining_secs)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64 * 100.0).min(100.0)
    }
}

fn heartbeat_loop(board: Arc<ProgressBoard>, config: HeartbeatConfig, is_tty: bool) {
    let tick = Duration::from_millis(200);
    let interval = Duration::from_secs(config.interval_secs.max(1));
    let mut last_report = Instant::now();

    loop {
        thread::sleep(tick);
        if board.is_shutdown() {
            break;
        }
        if last_report.elapsed() < interval {
            continue;
        }
        last_report = Instant::now();

        let snap = board.snapshot();
        let stall_secs = snap.current_nanos.saturating_sub(snap.last_progress_nanos) / 1_000_000_000;
        let is_stalled = stall_secs > config.stall_threshold_secs;
        if is_tty {
            print_tty_progress(&snap, is_stalled);
        } else {
            print_log_progress(&snap, is_stalled);
        }
    }

    if is_tty {
        eprint!("\r\x1b[K");
        let _ = io::stderr().flush();
    }
}

fn print_tty_progress(snap: &ProgressSnapshot, is_stalled: bool) {
    let pct = percent(snap.jobs_done, snap.total_jobs);
    let bar_width = 20;
    let filled = ((pct / 100.0) * bar_width as f64) as usize;
    let bar: String = "=".repeat(filled.min(bar_width)) + &" ".repeat(bar_width.saturating_sub(filled));
    let stall_str = if is_stalled { " [STALLED]" } else { "" };
    eprint!(
        "\r[{}] {:>5.1}% | {} | jobs {}/{} | {}{}    \x1b[K",
        bar,
        pct,
        snap.phase.as_str(),
        snap.jobs_done,
        snap.total_jobs,
        format_duration(snap.elapsed_secs),
        stall_str
    );
    let _ = io::stderr().flush();
}

fn print_log_progress(snap: &ProgressSnapshot, is_stalled: bool) {
    eprintln!(
        "[HEARTBEAT] phase=\"{}\" jobs={}/{} elapsed={:.0}s stalled={}",
        snap.phase.as_str(),
        snap.jobs_done,
        snap.total_jobs,
        snap.elapsed_secs,
        is_stalled
    );
}
