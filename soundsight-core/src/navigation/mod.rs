//! Route stepping state machine.
//!
//! ## States
//!
//! ```text
//!            start(route)                advance()            advance() at len-2
//!   Idle ───────────────► Active(0) ───────────► Active(i) ─────────────────────► Arrived
//!    ▲                                                                              │
//!    └──────────────────────────────── stop() (from any state) ◄───────────────────┘
//! ```
//!
//! Reaching the final (`arrived`) step *is* the terminal state, so observers
//! never see "on the last step" and "still navigating" at the same time.
//! `advance()` on `Idle` or `Arrived` is a no-op so repeated timer ticks are
//! harmless.
//!
//! The engine imposes no timing policy. `driver::NavigationDriver` (or a
//! sensor-confirmed step detector) calls `advance()` at its own cadence.

pub mod catalog;
pub mod driver;

pub use catalog::{Destination, DESTINATIONS};
pub use driver::NavigationDriver;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SoundSightError};

/// Turn instruction carried by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Straight,
    Left,
    Right,
    Arrived,
}

/// One instruction in a route. Immutable once the route is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStep {
    pub instruction: String,
    /// Display magnitude for this leg, e.g. `"15m"`.
    pub distance: String,
    pub direction: StepDirection,
    pub hazards: Vec<String>,
}

impl NavigationStep {
    pub fn new(
        instruction: impl Into<String>,
        distance: impl Into<String>,
        direction: StepDirection,
        hazards: &[&str],
    ) -> Self {
        Self {
            instruction: instruction.into(),
            distance: distance.into(),
            direction,
            hazards: hazards.iter().map(|h| (*h).to_string()).collect(),
        }
    }

    pub fn has_hazards(&self) -> bool {
        !self.hazards.is_empty()
    }
}

/// Coarse lifecycle state, as shown to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "step")]
pub enum NavStatus {
    Idle,
    Active(usize),
    Arrived,
}

/// Session-scoped navigation state for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub destination_label: Option<String>,
    pub current_step_index: usize,
    pub is_active: bool,
}

/// What a hazard hook wants the auto-advance driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardDecision {
    Continue,
    /// Stop auto-advancing until `resume()`. Manual `advance()` still works,
    /// and landing on a step without hazards releases the hold.
    Hold,
}

/// Policy hook invoked whenever the engine lands on a step with hazards.
///
/// The engine surfaces hazards but never interprets them; whether they pause
/// route progression is the hook's call.
pub trait HazardHook: Send + 'static {
    fn on_hazard(&mut self, step_index: usize, step: &NavigationStep) -> HazardDecision;
}

/// Default hook: report nothing, never hold.
#[derive(Debug, Default)]
pub struct ContinueOnHazard;

impl HazardHook for ContinueOnHazard {
    fn on_hazard(&mut self, _step_index: usize, _step: &NavigationStep) -> HazardDecision {
        HazardDecision::Continue
    }
}

/// Hook that holds auto-advance on every hazardous step.
#[derive(Debug, Default)]
pub struct HoldOnHazard;

impl HazardHook for HoldOnHazard {
    fn on_hazard(&mut self, step_index: usize, step: &NavigationStep) -> HazardDecision {
        info!(step_index, hazards = ?step.hazards, "holding navigation on hazard");
        HazardDecision::Hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active(usize),
    Arrived,
}

/// Navigation state machine for one session.
pub struct NavigationEngine {
    phase: Phase,
    destination: Option<String>,
    route: Vec<NavigationStep>,
    hook: Box<dyn HazardHook>,
    held: bool,
    /// Bumped on every `start()`/`stop()` so scheduled ticks from a previous
    /// route can be recognised and dropped.
    generation: u64,
}

impl Default for NavigationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NavigationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationEngine")
            .field("phase", &self.phase)
            .field("destination", &self.destination)
            .field("steps", &self.route.len())
            .field("held", &self.held)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl NavigationEngine {
    pub fn new() -> Self {
        Self::with_hook(ContinueOnHazard)
    }

    pub fn with_hook<H: HazardHook>(hook: H) -> Self {
        Self {
            phase: Phase::Idle,
            destination: None,
            route: Vec::new(),
            hook: Box::new(hook),
            held: false,
            generation: 0,
        }
    }

    pub fn set_hazard_hook<H: HazardHook>(&mut self, hook: H) {
        self.hook = Box::new(hook);
    }

    /// Begin guidance to `destination` along `route`, replacing any current route.
    ///
    /// A single-step route is already at its final step and goes straight to
    /// `Arrived`.
    ///
    /// # Errors
    /// `EmptyRoute` if `route` has no steps; the engine state is left untouched.
    pub fn start(
        &mut self,
        destination: impl Into<String>,
        route: Vec<NavigationStep>,
    ) -> Result<()> {
        if route.is_empty() {
            return Err(SoundSightError::EmptyRoute);
        }
        let destination = destination.into();
        if route.last().map(|s| s.direction) != Some(StepDirection::Arrived) {
            debug!(%destination, "route does not end with an arrived step");
        }

        self.generation += 1;
        self.destination = Some(destination.clone());
        self.route = route;
        self.held = false;
        self.phase = if self.route.len() == 1 {
            Phase::Arrived
        } else {
            Phase::Active(0)
        };
        info!(%destination, steps = self.route.len(), "navigation started");
        self.notify_hazards();
        Ok(())
    }

    /// Move to the next step. No-op on `Idle` and `Arrived`.
    ///
    /// Returns the status after the call.
    pub fn advance(&mut self) -> NavStatus {
        if let Phase::Active(i) = self.phase {
            let last = self.route.len() - 1;
            let next = i + 1;
            self.phase = if next >= last {
                info!(destination = ?self.destination, "arrived");
                Phase::Arrived
            } else {
                debug!(step = next, "navigation advanced");
                Phase::Active(next)
            };
            self.notify_hazards();
        }
        self.status()
    }

    /// Return to `Idle` from any state, clearing destination and progress.
    pub fn stop(&mut self) {
        if self.phase != Phase::Idle {
            info!(destination = ?self.destination, "navigation stopped");
        }
        self.generation += 1;
        self.phase = Phase::Idle;
        self.destination = None;
        self.route.clear();
        self.held = false;
    }

    /// Clear a hazard hold so the driver resumes auto-advancing.
    pub fn resume(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> NavStatus {
        match self.phase {
            Phase::Idle => NavStatus::Idle,
            Phase::Active(i) => NavStatus::Active(i),
            Phase::Arrived => NavStatus::Arrived,
        }
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn route(&self) -> &[NavigationStep] {
        &self.route
    }

    /// Index of the step currently shown; `None` while idle.
    fn step_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Idle => None,
            Phase::Active(i) => Some(i),
            Phase::Arrived => Some(self.route.len() - 1),
        }
    }

    /// The step currently shown. On `Arrived` this is the final step.
    ///
    /// # Errors
    /// `NoActiveRoute` while idle.
    pub fn current_step(&self) -> Result<&NavigationStep> {
        self.step_index()
            .and_then(|i| self.route.get(i))
            .ok_or(SoundSightError::NoActiveRoute)
    }

    /// `(index + 1) / len` while `Active`; `None` otherwise.
    pub fn progress_ratio(&self) -> Option<f32> {
        match self.phase {
            Phase::Active(i) => Some((i + 1) as f32 / self.route.len() as f32),
            _ => None,
        }
    }

    /// Up to `n` steps after the current one. Empty when idle, arrived, or
    /// past the end.
    pub fn upcoming(&self, n: usize) -> &[NavigationStep] {
        match self.phase {
            Phase::Active(i) => {
                let from = (i + 1).min(self.route.len());
                let to = from.saturating_add(n).min(self.route.len());
                &self.route[from..to]
            }
            _ => &[],
        }
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            destination_label: self.destination.clone(),
            current_step_index: self.step_index().unwrap_or(0),
            is_active: matches!(self.phase, Phase::Active(_)),
        }
    }

    /// Everything the navigation card needs in one value.
    pub fn snapshot(&self, upcoming: usize) -> NavigationSnapshot {
        NavigationSnapshot {
            status: self.status(),
            state: self.state(),
            total_steps: self.route.len(),
            current_step: self.current_step().ok().cloned(),
            progress: self.progress_ratio(),
            upcoming: self.upcoming(upcoming).to_vec(),
            held: self.held,
        }
    }

    fn notify_hazards(&mut self) {
        let Some(i) = self.step_index() else {
            return;
        };
        let Some(step) = self.route.get(i) else {
            return;
        };
        self.held = step.has_hazards() && self.hook.on_hazard(i, step) == HazardDecision::Hold;
    }
}

/// Point-in-time view of a navigation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub status: NavStatus,
    pub state: NavigationState,
    pub total_steps: usize,
    pub current_step: Option<NavigationStep>,
    pub progress: Option<f32>,
    pub upcoming: Vec<NavigationStep>,
    pub held: bool,
}
