use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{Instant, timeout};
use tracing::warn;
use uuid::Uuid;

use crate::error::ServiceError;

/// Phases of an attendance recorder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderPhase {
    /// Presence is being captured for the enrolled roster.
    Roster,
    /// The match is running; counters of present players can be edited.
    Live,
    /// Results were persisted.
    Done,
    /// Attendance for the event already exists; nothing can change.
    Locked,
}

/// Events that can be applied to the recorder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderEvent {
    /// Presence gate passed; start the clock.
    StartMatch,
    /// Results persisted.
    FinishMatch,
    /// Another writer recorded the event first.
    Lock,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RecorderPhase,
    /// The event that cannot be applied from this phase.
    pub event: RecorderEvent,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
///
/// Phase and version only move through `apply`, and `plan` refuses while a plan is
/// pending, so a matching plan id is all that needs checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A validated transition that has not been applied yet.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase at planning time.
    pub from: RecorderPhase,
    /// Phase reached once applied.
    pub to: RecorderPhase,
    /// Event that triggered this transition.
    pub event: RecorderEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// When the plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: RecorderPhase,
    /// Incremented on each applied transition.
    pub version: usize,
    /// Target phase of the pending transition, if any.
    pub pending: Option<RecorderPhase>,
}

/// Recorder lifecycle: `Roster → Live → Done`, with `Locked` as a terminal guard.
#[derive(Debug, Clone)]
pub struct RecorderStateMachine {
    phase: RecorderPhase,
    version: usize,
    pending: Option<Plan>,
}

impl RecorderStateMachine {
    /// State machine of a fresh session waiting for presence.
    pub fn new() -> Self {
        Self::starting_at(RecorderPhase::Roster)
    }

    /// State machine of a session opened on an event that was already recorded.
    pub fn locked() -> Self {
        Self::starting_at(RecorderPhase::Locked)
    }

    fn starting_at(phase: RecorderPhase) -> Self {
        Self {
            phase,
            version: 0,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RecorderPhase {
        self.phase
    }

    /// Create a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Validate that `event` can be applied and reserve the transition.
    pub fn plan(&mut self, event: RecorderEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };
        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition and return the new phase.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RecorderPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Drop a planned transition, leaving the phase untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Plan and immediately apply `event`.
    pub fn transition(&mut self, event: RecorderEvent) -> Result<RecorderPhase, ServiceError> {
        let plan = self.plan(event)?;
        Ok(self.apply(plan.id)?)
    }

    /// Plan `event`, run `work`, then apply on success or abort on failure or timeout.
    pub async fn run_transition<F, Fut, T>(
        &mut self,
        event: RecorderEvent,
        limit: Option<Duration>,
        work: F,
    ) -> Result<(T, RecorderPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let Plan { id: plan_id, .. } = self.plan(event)?;

        let work_future = work();
        let outcome = match limit {
            Some(limit) => match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            },
            None => work_future.await,
        };

        match outcome {
            Ok(value) => {
                let next = self.apply(plan_id)?;
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort(plan_id) {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort recorder transition"
                    );
                }
                Err(err)
            }
        }
    }

    fn compute_transition(&self, event: RecorderEvent) -> Result<RecorderPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RecorderPhase::Roster, RecorderEvent::StartMatch) => RecorderPhase::Live,
            (RecorderPhase::Live, RecorderEvent::FinishMatch) => RecorderPhase::Done,
            (RecorderPhase::Roster | RecorderPhase::Live, RecorderEvent::Lock) => {
                RecorderPhase::Locked
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

impl Default for RecorderStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
