// src/engine/stage.rs

//! Pure transaction core: stages, allowed transitions and the status trail.
//!
//! Nothing here performs IO. The orchestrator drives a [`Transaction`] and
//! relies on it to reject out-of-order transitions and to guarantee that at
//! most one terminal status is ever recorded.

use std::fmt;

use crate::backup::Backup;
use crate::target::TargetKind;
use crate::types::{StatusEvent, UpdateRequest, UpdateStatus};

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Backup,
    Stopping,
    Replacing,
    Starting,
    HealthCheck,
    Completed,
    RollingBack,
    Failed,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Init,
        Stage::Backup,
        Stage::Stopping,
        Stage::Replacing,
        Stage::Starting,
        Stage::HealthCheck,
        Stage::Completed,
        Stage::RollingBack,
        Stage::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// Whether leaving this stage on failure requires the rollback path.
    pub fn needs_rollback_on_failure(self) -> bool {
        matches!(
            self,
            Stage::Stopping | Stage::Replacing | Stage::Starting | Stage::HealthCheck
        )
    }

    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Init, Backup)
                | (Init, Failed)
                | (Backup, Stopping)
                | (Backup, Failed)
                | (Stopping, Replacing)
                | (Replacing, Starting)
                | (Starting, HealthCheck)
                | (HealthCheck, Completed)
                | (RollingBack, Failed)
        ) || (self.needs_rollback_on_failure() && next == RollingBack)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Backup => "backup",
            Stage::Stopping => "stopping",
            Stage::Replacing => "replacing",
            Stage::Starting => "starting",
            Stage::HealthCheck => "health-check",
            Stage::Completed => "completed",
            Stage::RollingBack => "rolling-back",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Rejected stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid stage transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: Stage,
    pub to: Stage,
}

/// Ordered status events of one transaction; closed by the first terminal one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTrail {
    events: Vec<StatusEvent>,
}

impl StatusTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event`. Returns `false` (and records nothing) once closed.
    pub fn push(&mut self, event: StatusEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.events.last().is_some_and(StatusEvent::is_complete)
    }

    pub fn current(&self) -> UpdateStatus {
        self.events
            .last()
            .map(|e| e.status)
            .unwrap_or(UpdateStatus::Pending)
    }

    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<StatusEvent> {
        self.events
    }
}

/// Mutable record of one update transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub request: UpdateRequest,
    pub target_kind: TargetKind,
    stage: Stage,
    stages: Vec<Stage>,
    trail: StatusTrail,
    pub backup: Option<Backup>,
    /// The staged artifact has been swapped into the live path.
    pub artifact_consumed: bool,
}

impl Transaction {
    pub fn new(request: UpdateRequest, target_kind: TargetKind) -> Self {
        Self {
            request,
            target_kind,
            stage: Stage::Init,
            stages: vec![Stage::Init],
            trail: StatusTrail::new(),
            backup: None,
            artifact_consumed: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn advance(&mut self, next: Stage) -> Result<(), InvalidTransition> {
        if !self.stage.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        self.stages.push(next);
        Ok(())
    }

    pub fn trail_mut(&mut self) -> &mut StatusTrail {
        &mut self.trail
    }

    pub fn into_report(self) -> TransactionReport {
        TransactionReport {
            request: self.request,
            target_kind: self.target_kind,
            final_stage: self.stage,
            stages: self.stages,
            events: self.trail.into_events(),
            backup: self.backup,
            artifact_consumed: self.artifact_consumed,
        }
    }
}

/// What a finished transaction looked like.
#[derive(Debug, Clone)]
pub struct TransactionReport {
    pub request: UpdateRequest,
    pub target_kind: TargetKind,
    pub final_stage: Stage,
    pub stages: Vec<Stage>,
    pub events: Vec<StatusEvent>,
    pub backup: Option<Backup>,
    pub artifact_consumed: bool,
}

impl TransactionReport {
    pub fn succeeded(&self) -> bool {
        self.final_stage == Stage::Completed
    }

    pub fn final_event(&self) -> Option<&StatusEvent> {
        self.events.last()
    }

    pub fn rolled_back(&self) -> bool {
        self.stages.contains(&Stage::RollingBack)
    }
}
