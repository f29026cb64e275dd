#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use update_executor::fs::mock::MockFileSystem;
use update_executor::health::{HealthOutcome, HealthVerifier};
use update_executor::report::{ReportFuture, StatusReporter};
use update_executor::target::{RuntimeTarget, StopOutcome, TargetFuture, TargetKind};
use update_executor::types::StatusEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    Stop,
    /// Start, with the live executable contents at that moment.
    Start(Vec<u8>),
}

#[derive(Debug)]
struct FakeTargetState {
    running: bool,
    calls: Vec<TargetCall>,
    stop_fails: bool,
    start_fails: bool,
    crashing: HashSet<Vec<u8>>,
}

/// A runtime target backed by a [`MockFileSystem`].
///
/// "Running" means: the last start happened with contents that are not marked
/// as crashing. Each start records the live executable contents, so tests can
/// check which binary was brought up.
#[derive(Debug, Clone)]
pub struct FakeTarget {
    kind: TargetKind,
    fs: MockFileSystem,
    live: PathBuf,
    state: Arc<Mutex<FakeTargetState>>,
}

impl FakeTarget {
    pub fn new(kind: TargetKind, fs: MockFileSystem, live: PathBuf) -> Self {
        Self {
            kind,
            fs,
            live,
            state: Arc::new(Mutex::new(FakeTargetState {
                running: true,
                calls: Vec::new(),
                stop_fails: false,
                start_fails: false,
                crashing: HashSet::new(),
            })),
        }
    }

    pub fn not_running(self) -> Self {
        self.state.lock().unwrap().running = false;
        self
    }

    pub fn failing_stop(self) -> Self {
        self.state.lock().unwrap().stop_fails = true;
        self
    }

    pub fn failing_start(self) -> Self {
        self.state.lock().unwrap().start_fails = true;
        self
    }

    /// A binary with these contents starts but never reaches "running".
    pub fn crashes_with(self, contents: &[u8]) -> Self {
        self.state.lock().unwrap().crashing.insert(contents.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<TargetCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_up(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Contents of the binary most recently started.
    pub fn last_started(&self) -> Option<Vec<u8>> {
        self.calls().into_iter().rev().find_map(|c| match c {
            TargetCall::Start(contents) => Some(contents),
            TargetCall::Stop => None,
        })
    }
}

impl RuntimeTarget for FakeTarget {
    fn kind(&self) -> TargetKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("fake {}", self.live.display())
    }

    fn stop(&self) -> TargetFuture<'_, StopOutcome> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(TargetCall::Stop);
            if state.stop_fails {
                anyhow::bail!("stop refused");
            }
            if !state.running {
                return Ok(StopOutcome::AlreadyStopped);
            }
            state.running = false;
            Ok(StopOutcome::Stopped)
        })
    }

    fn start(&self) -> TargetFuture<'_, ()> {
        Box::pin(async move {
            let contents = self.fs.contents(&self.live).unwrap_or_default();
            let mut state = self.state.lock().unwrap();
            state.calls.push(TargetCall::Start(contents.clone()));
            if state.start_fails {
                anyhow::bail!("start refused");
            }
            state.running = !state.crashing.contains(&contents);
            Ok(())
        })
    }

    fn is_running(&self) -> TargetFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.lock().unwrap().running) })
    }
}

/// Health verifier returning a fixed outcome.
#[derive(Debug, Clone)]
pub struct FakeHealth {
    outcome: HealthOutcome,
    checks: Arc<Mutex<usize>>,
}

impl FakeHealth {
    pub fn new(outcome: HealthOutcome) -> Self {
        Self {
            outcome,
            checks: Arc::new(Mutex::new(0)),
        }
    }

    pub fn checks(&self) -> usize {
        *self.checks.lock().unwrap()
    }
}

impl HealthVerifier for FakeHealth {
    fn check(&self) -> Pin<Box<dyn Future<Output = HealthOutcome> + Send + '_>> {
        Box::pin(async move {
            *self.checks.lock().unwrap() += 1;
            self.outcome
        })
    }
}

/// Reporter that records every event it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<(String, StatusEvent)>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn versions(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(v, _)| v.clone())
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn report<'a>(&'a self, version: &'a str, event: &'a StatusEvent) -> ReportFuture<'a> {
        Box::pin(async move {
            self.events
                .lock()
                .unwrap()
                .push((version.to_string(), event.clone()));
        })
    }
}
