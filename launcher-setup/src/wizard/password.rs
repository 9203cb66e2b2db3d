// Archive password validation
//
// idle -> checking -> valid | invalid
// Any edit to the archive path or password drops back to idle. The wizard pairs every edit
// with a `PasswordValidation` ticket bump so a check that is still in flight can no longer
// land its verdict.

use crate::api::backend::{ArchivePasswordCheck, BackendError, BackendErrorCode};
use crate::models::session::{InstallSession, PasswordValidationState};
use crate::utils::validation;
use crate::wizard::error::WizardError;
use crate::wizard::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFailure {
    WrongPassword,
    Other,
}

/// Decide whether a failed check means "wrong password".
///
/// A structured code from the backend wins. Without one, the text is matched against
/// `markers` case-insensitively.
pub fn classify_failure(error: &BackendError, markers: &[String]) -> PasswordFailure {
    match error.code {
        Some(BackendErrorCode::WrongPassword) => return PasswordFailure::WrongPassword,
        Some(_) => return PasswordFailure::Other,
        None => {}
    }

    let text = error.message.to_lowercase();
    let matched = markers
        .iter()
        .map(|marker| marker.trim().to_lowercase())
        .any(|marker| !marker.is_empty() && text.contains(&marker));
    if matched {
        PasswordFailure::WrongPassword
    } else {
        PasswordFailure::Other
    }
}

/// Leaving `import` is allowed when migration import is off or the password is valid.
pub fn can_leave_import(session: &InstallSession) -> bool {
    !session.migration_import_enabled
        || session.password_state == PasswordValidationState::Valid
}

/// True when a just-in-time check should run before leaving `import`.
pub fn needs_validation(session: &InstallSession) -> bool {
    session.migration_import_enabled
        && matches!(
            session.password_state,
            PasswordValidationState::Idle | PasswordValidationState::Invalid
        )
}

/// Local checks done before any backend call. Returns the trimmed archive path.
pub fn validation_inputs(session: &InstallSession) -> Result<String, WizardError> {
    let path = session.archive_path.trim();
    if path.is_empty() {
        return Err(WizardError::input(messages::archive_path_required(
            session.locale,
        )));
    }
    if session.archive_password.is_empty() {
        let extension = validation::archive_extension(path);
        return Err(WizardError::input(messages::password_required(
            session.locale,
            &extension,
        )));
    }
    Ok(path.to_string())
}

pub fn on_input_edited(session: &mut InstallSession) {
    session.password_state = PasswordValidationState::Idle;
    session.password_error = None;
}

pub fn on_check_started(session: &mut InstallSession) {
    session.password_state = PasswordValidationState::Checking;
    session.password_error = None;
}

/// Apply a finished check. Callers must have confirmed the ticket is still current.
pub fn on_check_finished(
    session: &mut InstallSession,
    result: Result<ArchivePasswordCheck, BackendError>,
    markers: &[String],
) -> PasswordValidationState {
    match result {
        Ok(_) => {
            session.password_state = PasswordValidationState::Valid;
            session.password_error = None;
        }
        Err(error) => {
            let message = match classify_failure(&error, markers) {
                PasswordFailure::WrongPassword => {
                    let extension = validation::archive_extension(&session.archive_path);
                    messages::password_wrong(session.locale, &extension)
                }
                PasswordFailure::Other => {
                    messages::password_check_failed(session.locale, &error.message)
                }
            };
            session.password_state = PasswordValidationState::Invalid;
            session.password_error = Some(message);
        }
    }
    session.password_state
}
