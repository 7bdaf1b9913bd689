//! Run-state machine and progress observers
//!
//! `idle → running → completed | error`. A plan can have at most one run in
//! flight; [`StatusTracker::begin`] rejects a second one until the first
//! run's [`RunGuard`] is dropped.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use super::{SimulationResult, Stage};
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of the simulator state for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub state: RunState,
    /// True while any run is in flight
    pub running: bool,
    /// 0-100 progress of the most recently updated run
    pub progress: u8,
    pub current_stage: Option<Stage>,
    pub active_plans: Vec<String>,
    pub last_error: Option<String>,
    pub last_result: Option<SimulationResult>,
}

/// Progress notification sent to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub plan_id: String,
    pub configuration_id: String,
    pub stage: Stage,
    pub progress: u8,
    pub state: RunState,
}

/// Progress listener callback type
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Listener handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) struct StatusTracker {
    status: RwLock<PipelineStatus>,
    in_flight: Mutex<HashSet<String>>,
    listeners: RwLock<HashMap<ListenerId, Arc<ProgressCallback>>>,
    next_listener: Mutex<u64>,
}

impl StatusTracker {
    pub(crate) fn new() -> Self {
        Self {
            status: RwLock::new(PipelineStatus::default()),
            in_flight: Mutex::new(HashSet::new()),
            listeners: RwLock::new(HashMap::new()),
            next_listener: Mutex::new(0),
        }
    }

    pub(crate) fn snapshot(&self) -> PipelineStatus {
        self.status.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Enter the running state for `plan_id`.
    pub(crate) fn begin<'a>(
        &'a self,
        plan_id: &str,
        configuration_id: &str,
    ) -> Result<RunGuard<'a>> {
        {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| SimError::Validation("run registry unavailable".into()))?;
            if !in_flight.insert(plan_id.to_string()) {
                return Err(SimError::AlreadyRunning(plan_id.to_string()));
            }
        }
        self.update(|s| {
            s.state = RunState::Running;
            s.running = true;
            s.progress = 0;
            s.current_stage = None;
            s.last_error = None;
            if !s.active_plans.iter().any(|p| p == plan_id) {
                s.active_plans.push(plan_id.to_string());
            }
        });
        Ok(RunGuard {
            tracker: self,
            plan_id: plan_id.to_string(),
            configuration_id: configuration_id.to_string(),
            progress: 0,
        })
    }

    pub(crate) fn subscribe(&self, callback: ProgressCallback) -> ListenerId {
        let id = match self.next_listener.lock() {
            Ok(mut next) => {
                *next += 1;
                ListenerId(*next)
            }
            Err(_) => ListenerId(0),
        };
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.insert(id, Arc::new(callback));
        }
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.remove(&id);
        }
    }

    /// Back to idle; in-flight runs keep their guards.
    pub(crate) fn reset(&self) {
        self.update(|s| {
            let active = std::mem::take(&mut s.active_plans);
            *s = PipelineStatus {
                running: !active.is_empty(),
                state: if active.is_empty() {
                    RunState::Idle
                } else {
                    RunState::Running
                },
                active_plans: active,
                ..PipelineStatus::default()
            };
        });
    }

    fn update<F: FnOnce(&mut PipelineStatus)>(&self, f: F) {
        if let Ok(mut status) = self.status.write() {
            f(&mut status);
        }
    }

    fn emit(&self, event: &ProgressEvent) {
        // Clone the handles so callbacks may call back into the simulator.
        let listeners: Vec<Arc<ProgressCallback>> = match self.listeners.read() {
            Ok(l) => l.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in listeners {
            callback(event);
        }
    }
}

/// Held for the duration of one run; releases the plan on drop.
pub(crate) struct RunGuard<'a> {
    tracker: &'a StatusTracker,
    plan_id: String,
    configuration_id: String,
    progress: u8,
}

impl RunGuard<'_> {
    pub(crate) fn enter(&self, stage: Stage) {
        self.tracker.update(|s| s.current_stage = Some(stage));
    }

    /// Report that `stage` returned. Progress never moves backwards.
    pub(crate) fn reached(&mut self, stage: Stage) {
        let Some(checkpoint) = stage.checkpoint() else {
            return;
        };
        if checkpoint < self.progress {
            return;
        }
        self.progress = checkpoint;
        self.tracker.update(|s| {
            s.progress = checkpoint;
            s.current_stage = Some(stage);
        });
        self.tracker.emit(&ProgressEvent {
            plan_id: self.plan_id.clone(),
            configuration_id: self.configuration_id.clone(),
            stage,
            progress: checkpoint,
            state: RunState::Running,
        });
    }

    pub(crate) fn complete(mut self, result: &SimulationResult) {
        self.reached(Stage::Assembly);
        self.tracker.update(|s| {
            s.state = RunState::Completed;
            s.current_stage = None;
            s.last_result = Some(result.clone());
        });
        self.tracker.emit(&ProgressEvent {
            plan_id: self.plan_id.clone(),
            configuration_id: self.configuration_id.clone(),
            stage: Stage::Assembly,
            progress: 100,
            state: RunState::Completed,
        });
    }

    /// Error state; progress stays at the last checkpoint.
    pub(crate) fn fail(self, stage: Option<Stage>, err: &SimError) {
        let progress = self.progress;
        self.tracker.update(|s| {
            s.state = RunState::Error;
            s.progress = progress;
            s.current_stage = stage;
            s.last_error = Some(err.to_string());
        });
        self.tracker.emit(&ProgressEvent {
            plan_id: self.plan_id.clone(),
            configuration_id: self.configuration_id.clone(),
            stage: stage.unwrap_or(Stage::Baseline),
            progress,
            state: RunState::Error,
        });
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.tracker.in_flight.lock() {
            in_flight.remove(&self.plan_id);
        }
        let plan_id = &self.plan_id;
        self.tracker.update(|s| {
            s.active_plans.retain(|p| p != plan_id);
            s.running = !s.active_plans.is_empty();
        });
    }
}
