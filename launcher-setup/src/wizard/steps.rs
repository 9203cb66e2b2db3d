// Step routing and the displayed-step controller
//
// Routing is pure: given a session it answers where `next`/`back` lead and whether the
// current step may be left. `StepController` adds the presentation bookkeeping: the step
// being left stays "exiting" for a short hold so both can be shown during the transition.

use crate::models::session::{InstallSession, WizardStep};
use crate::wizard::password;
use crate::wizard::timer::ScheduledSlot;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedSteps {
    pub current: WizardStep,
    pub exiting: Option<WizardStep>,
    pub direction: Direction,
}

pub fn direction(from: WizardStep, to: WizardStep) -> Direction {
    if to.order() > from.order() {
        Direction::Forward
    } else {
        Direction::Back
    }
}

pub fn plan_transition(current: WizardStep, target: WizardStep) -> Transition {
    Transition {
        from: current,
        to: target,
        direction: direction(current, target),
    }
}

/// Where `back` leads from `step`. `None` for steps without a back route.
pub fn back_target(step: WizardStep, requires_login: bool) -> Option<WizardStep> {
    match step {
        WizardStep::Platform => Some(WizardStep::Welcome),
        WizardStep::EpicLogin => Some(WizardStep::Platform),
        WizardStep::Version if requires_login => Some(WizardStep::EpicLogin),
        WizardStep::Version => Some(WizardStep::Platform),
        WizardStep::Import => Some(WizardStep::Version),
        WizardStep::Confirm => Some(WizardStep::Import),
        WizardStep::Welcome
        | WizardStep::Detecting
        | WizardStep::Progress
        | WizardStep::Complete => None,
    }
}

/// Where `next` leads from `step` once its gate is satisfied.
pub fn forward_target(step: WizardStep, requires_login: bool) -> Option<WizardStep> {
    match step {
        WizardStep::Welcome => Some(WizardStep::Detecting),
        WizardStep::Detecting => Some(WizardStep::Platform),
        WizardStep::Platform if requires_login => Some(WizardStep::EpicLogin),
        WizardStep::Platform => Some(WizardStep::Version),
        WizardStep::EpicLogin => Some(WizardStep::Version),
        WizardStep::Version => Some(WizardStep::Import),
        WizardStep::Import => Some(WizardStep::Confirm),
        WizardStep::Confirm => Some(WizardStep::Progress),
        WizardStep::Progress => Some(WizardStep::Complete),
        WizardStep::Complete => None,
    }
}

/// Strict gate for leaving the current step forward.
///
/// At `import` this is only true once a pending archive password has been validated; the
/// wizard's `next` runs that validation just in time before consulting this gate.
pub fn can_advance(session: &InstallSession) -> bool {
    match session.step {
        WizardStep::Welcome => true,
        WizardStep::Detecting => false,
        WizardStep::Platform => session.platform.is_some() && session.has_install_path(),
        WizardStep::EpicLogin => session.login.logged_in,
        WizardStep::Version => session.has_selected_release() && !session.releases_loading,
        WizardStep::Import => {
            password::can_leave_import(session) && import_preview_ready(session)
        }
        WizardStep::Confirm => {
            !session.installing
                && session.platform.is_some()
                && session.has_install_path()
                && session.has_selected_release()
                && password::can_leave_import(session)
                && import_preview_ready(session)
        }
        WizardStep::Progress | WizardStep::Complete => false,
    }
}

/// With save-data import on, a resolved preview is needed before moving on.
pub fn import_preview_ready(session: &InstallSession) -> bool {
    !session.import_enabled
        || (session.import_preview.is_some() && !session.import_preview_loading)
}

/// Steps the user may jump back to directly from `current`.
pub fn can_jump_back(current: WizardStep, target: WizardStep, requires_login: bool) -> bool {
    if matches!(current, WizardStep::Progress | WizardStep::Complete) {
        return false;
    }
    if matches!(target, WizardStep::Detecting | WizardStep::Progress) {
        return false;
    }
    if target == WizardStep::EpicLogin && !requires_login {
        return false;
    }
    target.order() < current.order()
}

/// Current and exiting step for presentation.
pub struct StepController {
    displayed: Arc<Mutex<ControllerState>>,
    slot: ScheduledSlot,
    hold: Duration,
}

#[derive(Debug, Clone, Copy)]
struct ControllerState {
    steps: DisplayedSteps,
    generation: u64,
}

impl StepController {
    pub fn new(initial: WizardStep, hold: Duration) -> Self {
        Self {
            displayed: Arc::new(Mutex::new(ControllerState {
                steps: DisplayedSteps {
                    current: initial,
                    exiting: None,
                    direction: Direction::Forward,
                },
                generation: 0,
            })),
            slot: ScheduledSlot::new("step-exit"),
            hold,
        }
    }

    /// Move the displayed step to `target`, keeping the old one as exiting for the hold.
    pub fn transition(&self, target: WizardStep) -> Transition {
        // Any exit hold from an earlier transition is dropped before this one is planned.
        self.slot.cancel();

        let (plan, generation) = {
            let mut state = lock_state(&self.displayed);
            let plan = plan_transition(state.steps.current, target);
            state.generation += 1;
            state.steps = DisplayedSteps {
                current: target,
                exiting: (plan.from != target).then_some(plan.from),
                direction: plan.direction,
            };
            (plan, state.generation)
        };

        debug!(
            "[PHASE: wizard] [STEP: transition] {} -> {} ({:?})",
            plan.from, plan.to, plan.direction
        );

        if plan.from == target {
            return plan;
        }
        if self.hold.is_zero() {
            clear_exiting(&self.displayed, generation);
            return plan;
        }

        let displayed = Arc::clone(&self.displayed);
        self.slot.schedule(self.hold, move || {
            clear_exiting(&displayed, generation);
        });
        plan
    }

    pub fn displayed(&self) -> DisplayedSteps {
        lock_state(&self.displayed).steps
    }
}

fn lock_state(state: &Mutex<ControllerState>) -> std::sync::MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn clear_exiting(state: &Mutex<ControllerState>, generation: u64) {
    let mut state = lock_state(state);
    // A later transition owns the exiting slot now.
    if state.generation == generation {
        state.steps.exiting = None;
    }
}
