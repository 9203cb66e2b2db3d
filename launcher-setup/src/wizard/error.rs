use crate::api::backend::BackendError;
use crate::models::session::WizardStep;
use thiserror::Error;

/// Failures surfaced by `SetupWizard` operations.
///
/// Input and blocked errors are raised locally and never reach the backend. Backend errors
/// carry the backend's text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Installation is already running.")]
    InstallInProgress,

    #[error("{0}")]
    Blocked(String),

    #[error("cannot move from '{from}' to '{to}'")]
    InvalidTransition { from: WizardStep, to: WizardStep },

    #[error("no route back from '{from}'")]
    NoRoute { from: WizardStep },

    #[error("operation requires step '{expected}' but wizard is on '{actual}'")]
    NotOnStep {
        expected: WizardStep,
        actual: WizardStep,
    },
}

impl WizardError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked(message.into())
    }

    /// True for errors the user fixes by editing a field.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_display_verbatim() {
        let err: WizardError = BackendError::new("Release asset not found").into();
        assert_eq!(err.to_string(), "Release asset not found");
    }

    #[test]
    fn transition_error_names_both_steps() {
        let err = WizardError::InvalidTransition {
            from: WizardStep::Progress,
            to: WizardStep::Confirm,
        };
        assert_eq!(err.to_string(), "cannot move from 'progress' to 'confirm'");
    }
}
