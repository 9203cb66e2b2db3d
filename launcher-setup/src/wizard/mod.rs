// Setup wizard orchestration
//
// `SetupWizard` owns the session and is its only writer. User actions arrive as async
// methods; each one validates locally, calls the backend when needed and folds the result
// back into the session. Results of superseded requests are dropped via `RequestGuard`.

pub mod controls;
pub mod error;
pub mod messages;
pub mod password;
pub mod pipeline;
pub mod progress;
pub mod request_guard;
pub mod steps;
pub mod timer;

use crate::api::backend::{ConfirmPrompt, InstallResult, ReleaseSummary, SetupBackend};
use crate::api::events::{BackendEvent, EventHub, LoginEvent};
use crate::models::session::{
    GamePlatform, InstallSession, LoginState, PasswordValidationState, WizardStep,
};
use crate::models::snapshot::LauncherSnapshot;
use crate::models::state::SessionStore;
use crate::security::crypto::secret_fingerprint;
use crate::utils::config::WizardConfig;
use crate::utils::logging::{mask_home, mask_sensitive};
use crate::utils::validation;
use chrono::{DateTime, FixedOffset};
use controls::ControlState;
use error::WizardError;
use log::{debug, info, warn};
use pipeline::{ImportPipeline, InstallGuard, RunPlan};
use request_guard::{RequestClass, RequestGuard, RequestTicket};
use std::sync::Arc;
use steps::{DisplayedSteps, StepController, Transition};

pub struct SetupWizard {
    backend: Arc<dyn SetupBackend>,
    confirm: Arc<dyn ConfirmPrompt>,
    hub: EventHub,
    store: SessionStore,
    steps: StepController,
    requests: RequestGuard,
    install_guard: InstallGuard,
    config: WizardConfig,
}

impl SetupWizard {
    pub fn new(
        backend: Arc<dyn SetupBackend>,
        confirm: Arc<dyn ConfirmPrompt>,
        hub: EventHub,
        config: WizardConfig,
    ) -> Self {
        Self {
            backend,
            confirm,
            hub,
            store: SessionStore::new(InstallSession::new(config.locale())),
            steps: StepController::new(WizardStep::Welcome, config.transition_duration()),
            requests: RequestGuard::new(),
            install_guard: InstallGuard::default(),
            config,
        }
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> InstallSession {
        self.store.read().await
    }

    pub fn displayed_steps(&self) -> DisplayedSteps {
        self.steps.displayed()
    }

    /// Enablement flags for `base` with the live wizard session folded in.
    pub async fn controls(&self, mut base: LauncherSnapshot) -> ControlState {
        base.wizard = self.snapshot().await;
        controls::compute(&base)
    }

    // ========================================
    // Navigation
    // ========================================

    /// Begin a fresh run on `welcome`.
    pub async fn start(&self) {
        self.reset_session().await;
        self.enter(WizardStep::Welcome).await;
        info!("[PHASE: wizard] [STEP: start] Setup wizard started");
    }

    pub async fn next(&self) -> Result<WizardStep, WizardError> {
        let session = self.store.read().await;
        let locale = session.locale;
        debug!("[PHASE: wizard] [STEP: next] Requested from '{}'", session.step);

        match session.step {
            WizardStep::Welcome => {
                self.enter(WizardStep::Detecting).await;
                self.run_detection().await;
                self.enter(WizardStep::Platform).await;
                Ok(WizardStep::Platform)
            }
            WizardStep::Platform => {
                if session.platform.is_none() {
                    return Err(self
                        .reject(WizardError::input(messages::platform_required(locale)))
                        .await);
                }
                if let Err(e) = validation::validate_install_path(&session.install_path, locale) {
                    return Err(self.reject(e).await);
                }
                if session.requires_login() {
                    self.enter(WizardStep::EpicLogin).await;
                    self.refresh_login_status().await?;
                    Ok(WizardStep::EpicLogin)
                } else {
                    self.advance_to_version().await
                }
            }
            WizardStep::EpicLogin => {
                if !session.login.logged_in {
                    return Err(WizardError::blocked(messages::login_required(locale)));
                }
                self.advance_to_version().await
            }
            WizardStep::Version => {
                let tag = session.selected_release.as_deref().unwrap_or_default();
                if let Err(e) = validation::validate_release_tag(tag, &session.releases, locale) {
                    return Err(self.reject(e).await);
                }
                self.enter(WizardStep::Import).await;
                self.refresh_preserved_status().await;
                Ok(WizardStep::Import)
            }
            WizardStep::Import => self.leave_import().await,
            WizardStep::Confirm => {
                self.confirm_install().await?;
                Ok(self.store.read().await.step)
            }
            from @ (WizardStep::Detecting | WizardStep::Progress | WizardStep::Complete) => {
                Err(WizardError::InvalidTransition {
                    from,
                    to: steps::forward_target(from, session.requires_login()).unwrap_or(from),
                })
            }
        }
    }

    pub async fn back(&self) -> Result<WizardStep, WizardError> {
        let session = self.store.read().await;
        if session.installing {
            return Err(WizardError::InstallInProgress);
        }
        let target = steps::back_target(session.step, session.requires_login())
            .ok_or(WizardError::NoRoute { from: session.step })?;
        self.enter(target).await;
        Ok(target)
    }

    /// Jump straight to an earlier step, or back to `welcome` from `complete`.
    pub async fn go_to(&self, target: WizardStep) -> Result<WizardStep, WizardError> {
        let session = self.store.read().await;
        if session.step == WizardStep::Complete && target == WizardStep::Welcome {
            self.finish().await?;
            return Ok(WizardStep::Welcome);
        }
        if session.installing
            || !steps::can_jump_back(session.step, target, session.requires_login())
        {
            return Err(WizardError::InvalidTransition {
                from: session.step,
                to: target,
            });
        }
        self.enter(target).await;
        Ok(target)
    }

    /// Leave `complete` and start over with an empty session.
    pub async fn finish(&self) -> Result<(), WizardError> {
        let step = self.store.read().await.step;
        if step != WizardStep::Complete {
            return Err(WizardError::NotOnStep {
                expected: WizardStep::Complete,
                actual: step,
            });
        }
        self.reset_session().await;
        self.enter(WizardStep::Welcome).await;
        info!("[PHASE: wizard] [STEP: finish] Session reset to welcome");
        Ok(())
    }

    // ========================================
    // Platform + path
    // ========================================

    pub async fn select_platform(&self, platform: GamePlatform) -> Result<(), WizardError> {
        self.store
            .update(|s| {
                s.platform = Some(platform);
                s.selected_release = None;
                s.login = LoginState::default();
                s.input_error = None;
            })
            .await;
        info!(
            "[PHASE: wizard] [STEP: platform] Selected platform '{}'",
            platform.as_str()
        );
        self.refresh_releases().await
    }

    pub async fn set_install_path(&self, path: &str) {
        let path = path.to_string();
        debug!(
            "[PHASE: wizard] [STEP: platform] Install path set to {}",
            mask_home(&path)
        );
        self.store
            .update(|s| {
                s.install_path = path;
                s.input_error = None;
            })
            .await;
    }

    /// Resolve the platform of a manually entered path.
    pub async fn detect_platform_for_path(&self) -> Result<GamePlatform, WizardError> {
        let session = self.store.read().await;
        let path = match validation::validate_install_path(&session.install_path, session.locale)
        {
            Ok(path) => path,
            Err(e) => return Err(self.reject(e).await),
        };

        match self.backend.detect_platform_for_path(&path).await {
            Ok(platform) => {
                self.store.update(|s| s.detection_error = None).await;
                if session.platform != Some(platform) {
                    self.select_platform(platform).await?;
                }
                Ok(platform)
            }
            Err(e) => {
                warn!(
                    "[PHASE: wizard] [STEP: detect_path] {} could not be resolved: {}",
                    mask_home(&path),
                    e
                );
                let message = e.message.clone();
                self.store.update(|s| s.detection_error = Some(message)).await;
                Err(e.into())
            }
        }
    }

    async fn run_detection(&self) {
        match self.backend.detect_platforms().await {
            Ok(found) => {
                info!(
                    "[PHASE: wizard] [STEP: detecting] {} installation(s) found",
                    found.len()
                );
                self.store
                    .update(|s| {
                        s.detection_error = None;
                        if let Some(first) = found.first() {
                            if !s.has_install_path() {
                                s.install_path = first.path.clone();
                            }
                            if s.platform.is_none() {
                                s.platform = Some(first.platform);
                            }
                        }
                        s.detected = found;
                    })
                    .await;
            }
            Err(e) => {
                warn!("[PHASE: wizard] [STEP: detecting] Detection failed: {}", e);
                self.store
                    .update(|s| s.detection_error = Some(e.message))
                    .await;
            }
        }
    }

    // ========================================
    // Version
    // ========================================

    /// Reload the release list. Only the most recent refresh lands in the session.
    pub async fn refresh_releases(&self) -> Result<(), WizardError> {
        let ticket = self
            .store
            .update(|s| {
                s.releases_loading = true;
                s.releases_error = None;
                self.requests.dispatch(RequestClass::Releases)
            })
            .await;

        let result = self.backend.list_releases().await;

        let applied = self
            .apply_if_current(ticket, |s| {
                s.releases_loading = false;
                match result {
                    Ok(mut releases) => {
                        sort_releases_newest_first(&mut releases);
                        let keep = s
                            .selected_release
                            .as_ref()
                            .is_some_and(|tag| releases.iter().any(|r| &r.tag == tag));
                        if !keep {
                            s.selected_release = releases.first().map(|r| r.tag.clone());
                        }
                        s.releases = releases;
                    }
                    Err(e) => {
                        s.releases = Vec::new();
                        s.releases_error = Some(e.message);
                    }
                }
            })
            .await;

        if applied.is_none() {
            debug!(
                "[PHASE: wizard] [STEP: releases] Dropped stale result for ticket {}",
                ticket.value
            );
        }
        Ok(())
    }

    pub async fn select_release(&self, tag: &str) -> Result<(), WizardError> {
        let session = self.store.read().await;
        let tag = match validation::validate_release_tag(tag, &session.releases, session.locale) {
            Ok(tag) => tag,
            Err(e) => return Err(self.reject(e).await),
        };
        info!("[PHASE: wizard] [STEP: version] Selected release '{}'", tag);
        self.store
            .update(|s| {
                s.selected_release = Some(tag);
                s.input_error = None;
            })
            .await;
        Ok(())
    }

    async fn advance_to_version(&self) -> Result<WizardStep, WizardError> {
        self.enter(WizardStep::Version).await;
        let session = self.store.read().await;
        if session.releases.is_empty() && !session.releases_loading {
            self.refresh_releases().await?;
        }
        Ok(WizardStep::Version)
    }

    // ========================================
    // Import
    // ========================================

    pub async fn set_import_enabled(&self, enabled: bool) -> Result<(), WizardError> {
        let needs_preview = self
            .store
            .update(|s| {
                s.import_enabled = enabled;
                if !enabled {
                    self.requests.invalidate(RequestClass::ImportPreview);
                    s.import_preview_loading = false;
                    s.import_preview_error = None;
                }
                s.step == WizardStep::Import
                    && enabled
                    && !s.import_source.trim().is_empty()
                    && s.import_preview.is_none()
            })
            .await;
        if needs_preview {
            self.refresh_import_preview().await?;
        }
        Ok(())
    }

    /// Off the `import` step the preview stays unresolved, which blocks confirm until
    /// `import` is passed again.
    pub async fn set_import_source(&self, path: &str) -> Result<(), WizardError> {
        let path = path.to_string();
        let needs_preview = self
            .store
            .update(|s| {
                self.requests.invalidate(RequestClass::ImportPreview);
                s.import_source = path;
                s.import_preview = None;
                s.import_preview_loading = false;
                s.import_preview_error = None;
                s.step == WizardStep::Import
                    && s.import_enabled
                    && !s.import_source.trim().is_empty()
            })
            .await;
        if needs_preview {
            self.refresh_import_preview().await?;
        }
        Ok(())
    }

    /// Preview the save data at the current source. Guarded like the release list.
    pub async fn refresh_import_preview(&self) -> Result<(), WizardError> {
        let session = self.store.read().await;
        let source = match validation::require_non_empty(
            &session.import_source,
            messages::import_source_required(session.locale),
        ) {
            Ok(source) => source.to_string(),
            Err(e) => return Err(self.reject(e).await),
        };

        let ticket = self
            .store
            .update(|s| {
                s.import_preview = None;
                s.import_preview_loading = true;
                s.import_preview_error = None;
                self.requests.dispatch(RequestClass::ImportPreview)
            })
            .await;

        let result = self.backend.preview_save_data(&source).await;
        self.apply_if_current(ticket, |s| {
            s.import_preview_loading = false;
            match result {
                Ok(preview) => s.import_preview = Some(preview),
                Err(e) => s.import_preview_error = Some(e.message),
            }
        })
        .await;
        Ok(())
    }

    /// Only honoured when preserved data is available. Returns the effective value.
    pub async fn set_restore_preserved(&self, restore: bool) -> bool {
        self.store
            .update(|s| {
                s.restore_preserved = restore && s.preserved.available;
                s.restore_preserved
            })
            .await
    }

    /// Best effort: a failure leaves the previous status in place.
    async fn refresh_preserved_status(&self) {
        match self.backend.preserved_save_data_status().await {
            Ok(status) => {
                debug!(
                    "[PHASE: wizard] [STEP: import] Preserved save data available={} files={}",
                    status.available, status.files
                );
                self.store
                    .update(|s| {
                        s.preserved = status;
                        if !status.available {
                            s.restore_preserved = false;
                        }
                    })
                    .await;
            }
            Err(e) => warn!(
                "[PHASE: wizard] [STEP: import] Preserved save data status unavailable: {}",
                e
            ),
        }
    }

    pub async fn set_migration_enabled(&self, enabled: bool) {
        self.store
            .update(|s| {
                self.requests.invalidate(RequestClass::PasswordValidation);
                s.migration_import_enabled = enabled;
                password::on_input_edited(s);
            })
            .await;
    }

    /// Select an archive. On `import`, validates right away when a password is already entered.
    pub async fn set_archive_path(&self, path: &str) -> Result<(), WizardError> {
        let path = path.to_string();
        let ready = self
            .store
            .update(|s| {
                self.requests.invalidate(RequestClass::PasswordValidation);
                s.archive_path = path;
                password::on_input_edited(s);
                s.step == WizardStep::Import
                    && !s.archive_path.trim().is_empty()
                    && s.has_archive_password
            })
            .await;
        if ready {
            self.validate_archive_password().await?;
        }
        Ok(())
    }

    pub async fn set_archive_password(&self, password_text: &str) {
        let password_text = password_text.to_string();
        self.store
            .update(|s| {
                self.requests.invalidate(RequestClass::PasswordValidation);
                s.set_archive_password(password_text);
                password::on_input_edited(s);
            })
            .await;
    }

    /// Check the archive password (blur or just-in-time before leaving `import`).
    pub async fn validate_archive_password(
        &self,
    ) -> Result<PasswordValidationState, WizardError> {
        let session = self.store.read().await;
        let path = match password::validation_inputs(&session) {
            Ok(path) => path,
            Err(e) => return Err(self.reject(e).await),
        };
        let password_text = session.archive_password.clone();

        let ticket = self
            .store
            .update(|s| {
                password::on_check_started(s);
                self.requests.dispatch(RequestClass::PasswordValidation)
            })
            .await;
        info!(
            "[PHASE: wizard] [STEP: password] Validating {} (secret_fingerprint={})",
            mask_home(&path),
            secret_fingerprint(&password_text)
        );

        let result = self
            .backend
            .validate_archive_password(&path, &password_text)
            .await;

        let markers = &self.config.wrong_password_markers;
        let applied = self
            .apply_if_current(ticket, |s| password::on_check_finished(s, result, markers))
            .await;

        match applied {
            Some(state) => {
                info!("[PHASE: wizard] [STEP: password] Verdict: {:?}", state);
                Ok(state)
            }
            None => {
                debug!(
                    "[PHASE: wizard] [STEP: password] Dropped stale verdict for ticket {}",
                    ticket.value
                );
                Ok(self.store.read().await.password_state)
            }
        }
    }

    async fn leave_import(&self) -> Result<WizardStep, WizardError> {
        let session = self.store.read().await;
        let locale = session.locale;

        if session.migration_import_enabled {
            if session.password_state == PasswordValidationState::Checking {
                return Err(WizardError::blocked(messages::password_checking(locale)));
            }
            if password::needs_validation(&session) {
                self.validate_archive_password().await?;
            }
        }

        let session = self.store.read().await;
        if !password::can_leave_import(&session) {
            let message = session
                .password_error
                .clone()
                .unwrap_or_else(|| messages::password_not_validated(locale).to_string());
            return Err(WizardError::Blocked(message));
        }

        if session.import_enabled && session.import_preview.is_none() {
            if !session.import_preview_loading {
                self.refresh_import_preview().await?;
            }
            let session = self.store.read().await;
            if !steps::import_preview_ready(&session) {
                let message = session
                    .import_preview_error
                    .clone()
                    .unwrap_or_else(|| messages::import_preview_required(locale).to_string());
                return Err(WizardError::Blocked(message));
            }
        }

        self.enter(WizardStep::Confirm).await;
        Ok(WizardStep::Confirm)
    }

    // ========================================
    // Accounts
    // ========================================

    /// Returns whether the selected platform is ready to launch (always true for Steam).
    pub async fn refresh_login_status(&self) -> Result<bool, WizardError> {
        let session = self.store.read().await;
        let Some(platform) = session.platform.filter(|p| p.requires_authentication()) else {
            return Ok(true);
        };

        self.store
            .update(|s| {
                s.login.checking = true;
                s.login.error = None;
            })
            .await;

        match self.backend.login_status(platform).await {
            Ok(status) => {
                info!(
                    "[PHASE: wizard] [STEP: login] logged_in={} account={}",
                    status.logged_in,
                    status
                        .display_name
                        .as_deref()
                        .map(mask_sensitive)
                        .unwrap_or_default()
                );
                self.store
                    .update(|s| {
                        s.login = LoginState {
                            checking: false,
                            logged_in: status.logged_in,
                            display_name: status.display_name,
                            error: None,
                        };
                    })
                    .await;
                Ok(status.logged_in)
            }
            Err(e) => {
                let message = e.message.clone();
                self.store
                    .update(|s| {
                        s.login.checking = false;
                        s.login.error = Some(message);
                    })
                    .await;
                Err(e.into())
            }
        }
    }

    /// Fold a backend lifecycle event into the session. Install progress is consumed by
    /// the running pipeline and ignored here.
    pub async fn handle_backend_event(&self, event: BackendEvent) -> Result<(), WizardError> {
        match event {
            BackendEvent::Login(LoginEvent::Succeeded) => {
                info!("[PHASE: wizard] [STEP: login] Login succeeded");
                self.store
                    .update(|s| {
                        s.login.logged_in = true;
                        s.login.error = None;
                    })
                    .await;
                self.refresh_login_status().await?;
            }
            BackendEvent::Login(LoginEvent::Failed(message)) => {
                warn!("[PHASE: wizard] [STEP: login] Login failed: {}", message);
                self.store
                    .update(|s| {
                        s.login.checking = false;
                        s.login.logged_in = false;
                        s.login.error = Some(message);
                    })
                    .await;
            }
            BackendEvent::Login(LoginEvent::Cancelled) => {
                info!("[PHASE: wizard] [STEP: login] Login cancelled");
                self.store.update(|s| s.login.checking = false).await;
            }
            BackendEvent::InstallProgress(_) => {}
        }
        Ok(())
    }

    // ========================================
    // Execution
    // ========================================

    /// Run the install and import stages. Only one run may be in flight.
    ///
    /// On a fatal failure the wizard returns to `confirm` with every input intact and the
    /// raw error in `error_message`.
    pub async fn confirm_install(&self) -> Result<InstallResult, WizardError> {
        let Some(_permit) = self.install_guard.try_begin() else {
            warn!("[PHASE: wizard] [STEP: confirm] Rejected: installation already running");
            return Err(WizardError::InstallInProgress);
        };

        let session = self.store.read().await;
        if session.step != WizardStep::Confirm {
            return Err(WizardError::NotOnStep {
                expected: WizardStep::Confirm,
                actual: session.step,
            });
        }
        let plan = match RunPlan::from_session(&session) {
            Ok(plan) => plan,
            Err(e) => return Err(self.reject(e).await),
        };

        self.store
            .update(|s| {
                s.clear_run_state();
                s.installing = true;
            })
            .await;
        self.enter(WizardStep::Progress).await;

        let pipeline = ImportPipeline {
            backend: self.backend.as_ref(),
            confirm: self.confirm.as_ref(),
            hub: &self.hub,
            store: &self.store,
            config: &self.config,
        };

        match pipeline.run(&plan).await {
            Ok(result) => {
                let stored = result.clone();
                self.store
                    .update(|s| {
                        s.installing = false;
                        s.install_result = Some(stored);
                    })
                    .await;
                self.enter(WizardStep::Complete).await;
                Ok(result)
            }
            Err(e) => {
                let message = e.message.clone();
                self.store
                    .update(|s| {
                        s.installing = false;
                        s.pending_prompt = None;
                        s.error_message = Some(message);
                    })
                    .await;
                self.enter(WizardStep::Confirm).await;
                Err(e.into())
            }
        }
    }

    /// Offer a launch shortcut on `complete`. A failure stays inline and never moves the step.
    pub async fn create_shortcut(&self) -> Result<String, WizardError> {
        let session = self.store.read().await;
        if session.step != WizardStep::Complete {
            return Err(WizardError::NotOnStep {
                expected: WizardStep::Complete,
                actual: session.step,
            });
        }
        let started = self
            .store
            .update(|s| {
                if s.creating_shortcut {
                    return false;
                }
                s.creating_shortcut = true;
                s.shortcut_error = None;
                true
            })
            .await;
        if !started {
            return Err(WizardError::blocked(messages::shortcut_busy(session.locale)));
        }

        let result = self.backend.create_shortcut().await;
        self.store
            .update(|s| {
                s.creating_shortcut = false;
                match &result {
                    Ok(path) => s.shortcut_path = Some(path.clone()),
                    Err(e) => s.shortcut_error = Some(e.message.clone()),
                }
            })
            .await;
        result.map_err(WizardError::from)
    }

    // ========================================
    // Internals
    // ========================================

    async fn enter(&self, target: WizardStep) -> Transition {
        let plan = self.steps.transition(target);
        self.store
            .update(|s| {
                s.step = target;
                s.input_error = None;
            })
            .await;
        plan
    }

    async fn reset_session(&self) {
        // Anything still in flight belongs to the discarded session.
        self.requests.invalidate(RequestClass::Releases);
        self.requests.invalidate(RequestClass::PasswordValidation);
        self.requests.invalidate(RequestClass::ImportPreview);
        self.store.reset().await;
    }

    /// Apply `apply` only if `ticket` is still the live ticket, checked under the lock.
    async fn apply_if_current<R>(
        &self,
        ticket: RequestTicket,
        apply: impl FnOnce(&mut InstallSession) -> R,
    ) -> Option<R> {
        self.store
            .update(|s| self.requests.is_current(ticket).then(|| apply(s)))
            .await
    }

    /// Record an input error inline and hand it back.
    async fn reject(&self, error: WizardError) -> WizardError {
        if let WizardError::Input(message) = &error {
            let message = message.clone();
            self.store.update(|s| s.input_error = Some(message)).await;
        }
        warn!("[PHASE: wizard] [STEP: input] {}", error);
        error
    }
}

/// Newest first; releases without a parseable timestamp go last.
pub fn sort_releases_newest_first(releases: &mut [ReleaseSummary]) {
    fn published(release: &ReleaseSummary) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(release.published_at.trim()).ok()
    }
    releases.sort_by(|a, b| published(b).cmp(&published(a)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::backend::{
        ApplySettingsRequest, ArchivePasswordCheck, BackendError, BackendResult, DetectedPlatform,
        InstallRequest, LoginStatus, MigrationImportResult, PresetMergeResult,
        PreservedSaveDataStatus, SaveDataImportResult, SaveDataPreview,
    };
    use crate::api::events::ProgressEmitter;
    use crate::api::simulated::{ScriptedConfirm, SimulatedBackend, SimulatedOp};
    use crate::models::session::Locale;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn test_config() -> WizardConfig {
        WizardConfig {
            transition_ms: 0,
            ..WizardConfig::default()
        }
    }

    fn wizard_with(backend: Arc<dyn SetupBackend>, confirm: ScriptedConfirm) -> SetupWizard {
        SetupWizard::new(backend, Arc::new(confirm), EventHub::new(), test_config())
    }

    fn release(tag: &str, published_at: &str) -> ReleaseSummary {
        ReleaseSummary {
            tag: tag.to_string(),
            name: format!("SNR {tag}"),
            published_at: published_at.to_string(),
        }
    }

    /// Walk a fresh wizard from `welcome` to `import` on the detected Steam install.
    async fn walk_to_import(wizard: &SetupWizard) {
        wizard.start().await;
        assert_eq!(wizard.next().await, Ok(WizardStep::Platform));
        assert_eq!(wizard.next().await, Ok(WizardStep::Version));
        assert_eq!(wizard.next().await, Ok(WizardStep::Import));
    }

    /// Holds selected backend calls until the test releases them.
    struct GatedBackend {
        inner: SimulatedBackend,
        release_gates: Mutex<VecDeque<(oneshot::Receiver<()>, Vec<ReleaseSummary>)>>,
        password_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    }

    impl GatedBackend {
        fn new(inner: SimulatedBackend) -> Self {
            Self {
                inner,
                release_gates: Mutex::new(VecDeque::new()),
                password_gates: Mutex::new(VecDeque::new()),
            }
        }

        fn gate_releases(self, gate: oneshot::Receiver<()>, releases: Vec<ReleaseSummary>) -> Self {
            self.release_gates.lock().unwrap().push_back((gate, releases));
            self
        }

        fn gate_password(self, gate: oneshot::Receiver<()>) -> Self {
            self.password_gates.lock().unwrap().push_back(gate);
            self
        }
    }

    #[async_trait]
    impl SetupBackend for GatedBackend {
        async fn detect_platforms(&self) -> BackendResult<Vec<DetectedPlatform>> {
            self.inner.detect_platforms().await
        }

        async fn detect_platform_for_path(&self, path: &str) -> BackendResult<GamePlatform> {
            self.inner.detect_platform_for_path(path).await
        }

        async fn list_releases(&self) -> BackendResult<Vec<ReleaseSummary>> {
            let gated = self.release_gates.lock().unwrap().pop_front();
            match gated {
                Some((gate, releases)) => {
                    let _ = gate.await;
                    Ok(releases)
                }
                None => self.inner.list_releases().await,
            }
        }

        async fn apply_settings(&self, request: &ApplySettingsRequest) -> BackendResult<()> {
            self.inner.apply_settings(request).await
        }

        async fn install(
            &self,
            request: &InstallRequest,
            progress: ProgressEmitter,
        ) -> BackendResult<InstallResult> {
            self.inner.install(request, progress).await
        }

        async fn preserved_save_data_status(&self) -> BackendResult<PreservedSaveDataStatus> {
            self.inner.preserved_save_data_status().await
        }

        async fn preview_save_data(&self, source_path: &str) -> BackendResult<SaveDataPreview> {
            self.inner.preview_save_data(source_path).await
        }

        async fn import_save_data(
            &self,
            source_path: &str,
        ) -> BackendResult<SaveDataImportResult> {
            self.inner.import_save_data(source_path).await
        }

        async fn validate_archive_password(
            &self,
            archive_path: &str,
            password: &str,
        ) -> BackendResult<ArchivePasswordCheck> {
            let gate = self.password_gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.inner
                .validate_archive_password(archive_path, password)
                .await
        }

        async fn import_migration_archive(
            &self,
            archive_path: &str,
            password: &str,
        ) -> BackendResult<MigrationImportResult> {
            self.inner
                .import_migration_archive(archive_path, password)
                .await
        }

        async fn merge_save_data_presets(
            &self,
            source_path: &str,
        ) -> BackendResult<PresetMergeResult> {
            self.inner.merge_save_data_presets(source_path).await
        }

        async fn merge_preserved_presets(&self) -> BackendResult<PresetMergeResult> {
            self.inner.merge_preserved_presets().await
        }

        async fn create_shortcut(&self) -> BackendResult<String> {
            self.inner.create_shortcut().await
        }

        async fn login_status(&self, platform: GamePlatform) -> BackendResult<LoginStatus> {
            self.inner.login_status(platform).await
        }
    }

    #[tokio::test]
    async fn steam_happy_path_reaches_complete_and_resets_on_finish() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());

        walk_to_import(&wizard).await;
        let session = wizard.snapshot().await;
        assert_eq!(session.platform, Some(GamePlatform::Steam));
        assert_eq!(session.install_path, "/games/Among Us");
        // Newest release first and preselected.
        assert_eq!(session.releases[0].tag, "v6.0.0");
        assert_eq!(session.selected_release.as_deref(), Some("v6.0.0"));

        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));
        assert_eq!(wizard.next().await, Ok(WizardStep::Complete));

        let session = wizard.snapshot().await;
        assert!(!session.installing);
        assert_eq!(session.progress_percent, 100.0);
        assert_eq!(
            session.install_result.as_ref().map(|r| r.tag.as_str()),
            Some("v6.0.0")
        );
        assert!(session.skip_reason.is_empty());
        assert_eq!(backend.calls(SimulatedOp::ApplySettings), 1);
        assert_eq!(backend.calls(SimulatedOp::Install), 1);
        assert_eq!(wizard.displayed_steps().exiting, None);

        wizard.finish().await.expect("finish from complete");
        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Welcome);
        assert_eq!(session.platform, None);
        assert!(session.install_result.is_none());
        assert_eq!(session.locale, Locale::En);
    }

    #[tokio::test]
    async fn go_to_welcome_from_complete_behaves_like_finish() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.next().await.expect("confirm");
        wizard.next().await.expect("install");

        assert_eq!(
            wizard.go_to(WizardStep::Welcome).await,
            Ok(WizardStep::Welcome)
        );
        assert!(wizard.snapshot().await.selected_release.is_none());
    }

    #[tokio::test]
    async fn epic_route_waits_for_login_event() {
        let backend = Arc::new(SimulatedBackend::with_defaults().with_detected(vec![
            DetectedPlatform {
                path: "/games/Epic/AmongUs".to_string(),
                platform: GamePlatform::Epic,
            },
        ]));
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());

        wizard.start().await;
        assert_eq!(wizard.next().await, Ok(WizardStep::Platform));
        assert_eq!(wizard.next().await, Ok(WizardStep::EpicLogin));
        assert!(!wizard.snapshot().await.login.logged_in);

        let blocked = wizard.next().await;
        assert!(matches!(blocked, Err(WizardError::Blocked(_))), "{blocked:?}");

        backend.set_logged_in(true);
        wizard
            .handle_backend_event(BackendEvent::Login(LoginEvent::Succeeded))
            .await
            .expect("login refresh");
        let session = wizard.snapshot().await;
        assert!(session.login.logged_in);
        assert_eq!(session.login.display_name.as_deref(), Some("Crewmate"));

        assert_eq!(wizard.next().await, Ok(WizardStep::Version));
        assert_eq!(wizard.back().await, Ok(WizardStep::EpicLogin));
    }

    #[tokio::test]
    async fn login_failure_event_is_shown_inline() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard
            .handle_backend_event(BackendEvent::Login(LoginEvent::Failed(
                "Epic session expired".to_string(),
            )))
            .await
            .expect("handled");
        let login = wizard.snapshot().await.login;
        assert!(!login.logged_in);
        assert_eq!(login.error.as_deref(), Some("Epic session expired"));
    }

    #[tokio::test]
    async fn failed_detection_leaves_platform_step_usable() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::DetectPlatforms,
            1,
            BackendError::new("Registry unavailable"),
        ));
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());

        wizard.start().await;
        assert_eq!(wizard.next().await, Ok(WizardStep::Platform));
        let session = wizard.snapshot().await;
        assert_eq!(session.detection_error.as_deref(), Some("Registry unavailable"));

        let err = wizard.next().await.expect_err("no platform yet");
        assert!(err.is_input());
        assert_eq!(
            wizard.snapshot().await.input_error.as_deref(),
            Some("Select a game platform")
        );

        wizard.set_install_path("/games/Steam/Among Us").await;
        assert_eq!(
            wizard.detect_platform_for_path().await,
            Ok(GamePlatform::Steam)
        );
        assert_eq!(wizard.next().await, Ok(WizardStep::Version));
    }

    #[tokio::test]
    async fn unresolvable_path_sets_detection_error() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.set_install_path("/nowhere").await;

        let err = wizard.detect_platform_for_path().await.expect_err("not found");
        assert!(matches!(err, WizardError::Backend(_)));
        assert!(wizard
            .snapshot()
            .await
            .detection_error
            .is_some_and(|e| e.contains("not found")));
    }

    #[tokio::test]
    async fn stale_release_list_is_discarded() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let backend = Arc::new(
            GatedBackend::new(SimulatedBackend::with_defaults())
                .gate_releases(first_rx, vec![release("v-old", "2025-01-01T00:00:00Z")])
                .gate_releases(second_rx, vec![release("v-new", "2026-01-01T00:00:00Z")]),
        );
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());

        let releaser = async {
            second_tx.send(()).ok();
            tokio::task::yield_now().await;
            first_tx.send(()).ok();
        };
        let (first, second, ()) = tokio::join!(
            wizard.refresh_releases(),
            wizard.refresh_releases(),
            releaser
        );
        assert!(first.is_ok() && second.is_ok());

        let session = wizard.snapshot().await;
        assert!(!session.releases_loading);
        assert_eq!(session.releases.len(), 1);
        assert_eq!(session.releases[0].tag, "v-new");
        assert_eq!(session.selected_release.as_deref(), Some("v-new"));
    }

    #[tokio::test]
    async fn release_list_failure_keeps_wizard_on_version() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::ListReleases,
            1,
            BackendError::new("GitHub rate limit exceeded"),
        ));
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.start().await;
        wizard.next().await.expect("platform");
        assert_eq!(wizard.next().await, Ok(WizardStep::Version));

        let session = wizard.snapshot().await;
        assert_eq!(
            session.releases_error.as_deref(),
            Some("GitHub rate limit exceeded")
        );
        assert!(wizard.next().await.expect_err("no release").is_input());

        wizard.refresh_releases().await.expect("retry");
        assert_eq!(wizard.next().await, Ok(WizardStep::Import));
    }

    #[tokio::test]
    async fn unknown_release_tag_is_rejected() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.refresh_releases().await.expect("releases");

        let err = wizard.select_release("v0.0.1").await.expect_err("unknown");
        assert_eq!(err, WizardError::input("Unknown release: v0.0.1"));
        wizard.select_release("v5.9.1").await.expect("listed");
        assert_eq!(
            wizard.snapshot().await.selected_release.as_deref(),
            Some("v5.9.1")
        );
    }

    #[test]
    fn unparseable_publish_dates_sort_last() {
        let mut releases = vec![
            release("draft", ""),
            release("old", "2024-05-01T00:00:00Z"),
            release("new", "2026-05-01T00:00:00+09:00"),
        ];
        sort_releases_newest_first(&mut releases);
        let tags: Vec<_> = releases.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["new", "old", "draft"]);
    }

    #[tokio::test]
    async fn editing_password_mid_check_discards_verdict() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let backend = Arc::new(
            GatedBackend::new(SimulatedBackend::with_defaults().with_archive_password("hunter2"))
                .gate_password(gate_rx),
        );
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.set_migration_enabled(true).await;
        wizard
            .set_archive_path("/backups/launcher.snrdata")
            .await
            .expect("no password yet");
        wizard.set_archive_password("hunter2").await;

        let edit = async {
            wizard.set_archive_password("hunter").await;
            gate_tx.send(()).ok();
        };
        let (verdict, ()) = tokio::join!(wizard.validate_archive_password(), edit);

        assert_eq!(verdict, Ok(PasswordValidationState::Idle));
        let session = wizard.snapshot().await;
        assert_eq!(session.password_state, PasswordValidationState::Idle);
        assert!(session.password_error.is_none());
    }

    #[tokio::test]
    async fn wrong_password_blocks_import_until_corrected() {
        let backend = Arc::new(SimulatedBackend::with_defaults().with_archive_password("hunter2"));
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;

        wizard.set_migration_enabled(true).await;
        wizard
            .set_archive_path("/backups/launcher.snrdata")
            .await
            .expect("path only");
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 0);

        wizard.set_archive_password("wrong").await;
        let err = wizard.next().await.expect_err("wrong password");
        assert_eq!(
            err,
            WizardError::Blocked(
                "Failed to decrypt .snrdata. The password may be incorrect or the file is corrupted."
                    .to_string()
            )
        );
        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Import);
        assert_eq!(session.password_state, PasswordValidationState::Invalid);

        wizard.set_archive_password("hunter2").await;
        assert_eq!(
            wizard.snapshot().await.password_state,
            PasswordValidationState::Idle
        );
        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 2);
    }

    #[tokio::test]
    async fn missing_password_is_an_input_error() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.set_migration_enabled(true).await;
        wizard
            .set_archive_path("/backups/launcher.snrdata")
            .await
            .expect("path only");

        let err = wizard.next().await.expect_err("no password");
        assert!(err.is_input());
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 0);
    }

    #[tokio::test]
    async fn import_preview_is_required_before_confirm() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::PreviewSaveData,
            2,
            BackendError::new("SaveData folder not found"),
        ));
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;

        wizard.set_import_enabled(true).await.expect("no source yet");
        assert_eq!(backend.calls(SimulatedOp::PreviewSaveData), 0);
        wizard
            .set_import_source("/old/Among Us")
            .await
            .expect("preview dispatched");
        assert_eq!(
            wizard.snapshot().await.import_preview_error.as_deref(),
            Some("SaveData folder not found")
        );

        let err = wizard.next().await.expect_err("preview still failing");
        assert_eq!(
            err,
            WizardError::Blocked("SaveData folder not found".to_string())
        );

        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));
        let session = wizard.snapshot().await;
        assert_eq!(
            session.import_preview.map(|p| p.presets.len()),
            Some(2)
        );
        assert_eq!(backend.calls(SimulatedOp::PreviewSaveData), 3);
    }

    #[tokio::test]
    async fn disabling_import_drops_preview_in_flight_state() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.set_import_enabled(true).await.expect("enabled");
        wizard.set_import_source("/old/Among Us").await.expect("source");
        assert!(wizard.snapshot().await.import_preview.is_some());

        wizard.set_import_source("/other").await.expect("source");
        wizard.set_import_enabled(false).await.expect("disabled");
        let session = wizard.snapshot().await;
        assert!(!session.import_preview_loading);
        assert!(session.import_preview_error.is_none());
    }

    #[tokio::test]
    async fn restore_preserved_requires_available_data() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        assert!(!wizard.set_restore_preserved(true).await);

        let backend = Arc::new(SimulatedBackend::with_defaults().with_preserved(3));
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        assert!(wizard.set_restore_preserved(true).await);
    }

    #[tokio::test]
    async fn fatal_install_returns_to_confirm_with_inputs_intact() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::Install,
            u32::MAX,
            BackendError::new("Release asset not found"),
        ));
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.set_import_enabled(true).await.expect("enabled");
        wizard.set_import_source("/old/Among Us").await.expect("source");
        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));

        let err = wizard.next().await.expect_err("install fails");
        assert_eq!(
            err,
            WizardError::Backend(BackendError::new("Release asset not found"))
        );
        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Confirm);
        assert!(!session.installing);
        assert_eq!(
            session.error_message.as_deref(),
            Some("Release asset not found")
        );
        assert_eq!(session.selected_release.as_deref(), Some("v6.0.0"));
        assert_eq!(session.import_source, "/old/Among Us");
        assert!(session.stage_reports.is_empty());

        // The guard was released; a retry runs again instead of being rejected.
        let retry = wizard.confirm_install().await;
        assert!(matches!(retry, Err(WizardError::Backend(_))), "{retry:?}");
    }

    #[tokio::test]
    async fn concurrent_confirm_is_rejected() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.next().await.expect("confirm");

        let (first, second) = tokio::join!(wizard.confirm_install(), wizard.confirm_install());
        assert!(first.is_ok(), "{first:?}");
        assert_eq!(second, Err(WizardError::InstallInProgress));
        assert_eq!(backend.calls(SimulatedOp::Install), 1);
    }

    async fn walk_to_confirm_with_migration(wizard: &SetupWizard) {
        walk_to_import(wizard).await;
        wizard.set_migration_enabled(true).await;
        wizard
            .set_archive_path("/backups/launcher.snrdata")
            .await
            .expect("path only");
        wizard.set_archive_password("hunter2").await;
        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));
    }

    #[tokio::test]
    async fn password_edited_on_confirm_blocks_install() {
        let backend = Arc::new(SimulatedBackend::with_defaults().with_archive_password("hunter2"));
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_confirm_with_migration(&wizard).await;
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 1);

        wizard.set_archive_password("").await;
        let err = wizard.confirm_install().await.expect_err("password cleared");
        assert!(err.is_input(), "{err:?}");

        wizard.set_archive_password("wrong").await;
        assert_eq!(
            wizard.confirm_install().await,
            Err(WizardError::blocked(
                "Validate the archive password before continuing."
            ))
        );

        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Confirm);
        assert!(!session.installing);
        assert!(!wizard.controls(LauncherSnapshot::default()).await.wizard_confirm_install);
        assert_eq!(backend.calls(SimulatedOp::ApplySettings), 0);
        assert_eq!(backend.calls(SimulatedOp::Install), 0);
        assert_eq!(backend.calls(SimulatedOp::ImportMigrationArchive), 0);
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 1);
    }

    #[tokio::test]
    async fn archive_path_edited_on_confirm_requires_revalidation() {
        let backend = Arc::new(SimulatedBackend::with_defaults().with_archive_password("hunter2"));
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_confirm_with_migration(&wizard).await;

        wizard
            .set_archive_path("/backups/other.snrdata")
            .await
            .expect("path");
        assert_eq!(
            wizard.snapshot().await.password_state,
            PasswordValidationState::Idle
        );
        assert!(matches!(
            wizard.confirm_install().await,
            Err(WizardError::Blocked(_))
        ));
        assert_eq!(backend.calls(SimulatedOp::ApplySettings), 0);
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 1);

        assert_eq!(wizard.back().await, Ok(WizardStep::Import));
        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));
        assert_eq!(backend.calls(SimulatedOp::ValidateArchivePassword), 2);
        assert!(wizard.confirm_install().await.is_ok());
        assert_eq!(backend.calls(SimulatedOp::ImportMigrationArchive), 1);
    }

    #[tokio::test]
    async fn import_source_edited_on_confirm_blocks_install() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.set_import_enabled(true).await.expect("enabled");
        wizard.set_import_source("/old/Among Us").await.expect("source");
        assert_eq!(wizard.next().await, Ok(WizardStep::Confirm));

        wizard.set_import_source("/other/Among Us").await.expect("source");
        let session = wizard.snapshot().await;
        assert!(session.import_preview.is_none());
        assert_eq!(
            wizard.confirm_install().await,
            Err(WizardError::blocked(
                "Check the save data source before continuing."
            ))
        );

        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Confirm);
        assert_eq!(backend.calls(SimulatedOp::PreviewSaveData), 1);
        assert_eq!(backend.calls(SimulatedOp::ApplySettings), 0);
        assert_eq!(backend.calls(SimulatedOp::ImportSaveData), 0);
    }

    #[tokio::test]
    async fn confirm_outside_confirm_step_is_rejected() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend.clone(), ScriptedConfirm::always_skip());
        wizard.start().await;
        assert_eq!(
            wizard.confirm_install().await,
            Err(WizardError::NotOnStep {
                expected: WizardStep::Confirm,
                actual: WizardStep::Welcome,
            })
        );
        assert_eq!(backend.calls(SimulatedOp::ApplySettings), 0);
    }

    #[tokio::test]
    async fn skipped_stage_is_reported_on_complete() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::ImportSaveData,
            u32::MAX,
            BackendError::new("Access to SaveData denied"),
        ));
        let confirm = ScriptedConfirm::new([true], false);
        let wizard = wizard_with(backend.clone(), confirm);
        walk_to_import(&wizard).await;
        wizard.set_import_enabled(true).await.expect("enabled");
        wizard.set_import_source("/old/Among Us").await.expect("source");
        wizard.next().await.expect("confirm");

        assert_eq!(wizard.next().await, Ok(WizardStep::Complete));
        let session = wizard.snapshot().await;
        assert_eq!(session.skip_reason, "Access to SaveData denied");
        assert!(session.pending_prompt.is_none());
        assert_eq!(backend.calls(SimulatedOp::ImportSaveData), 2);
    }

    #[tokio::test]
    async fn shortcut_failure_stays_on_complete() {
        let backend = Arc::new(SimulatedBackend::with_defaults().fail_times(
            SimulatedOp::CreateShortcut,
            1,
            BackendError::new("Desktop folder is not writable"),
        ));
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.next().await.expect("confirm");
        wizard.next().await.expect("install");

        let err = wizard.create_shortcut().await.expect_err("scripted failure");
        assert_eq!(err.to_string(), "Desktop folder is not writable");
        let session = wizard.snapshot().await;
        assert_eq!(session.step, WizardStep::Complete);
        assert!(!session.creating_shortcut);
        assert_eq!(
            session.shortcut_error.as_deref(),
            Some("Desktop folder is not writable")
        );

        let path = wizard.create_shortcut().await.expect("second attempt");
        let session = wizard.snapshot().await;
        assert_eq!(session.shortcut_path, Some(path));
        assert!(session.shortcut_error.is_none());
    }

    #[tokio::test]
    async fn navigation_rules() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.start().await;
        assert_eq!(
            wizard.back().await,
            Err(WizardError::NoRoute {
                from: WizardStep::Welcome
            })
        );

        walk_to_import(&wizard).await;
        wizard.next().await.expect("confirm");
        assert!(matches!(
            wizard.go_to(WizardStep::Detecting).await,
            Err(WizardError::InvalidTransition { .. })
        ));
        // Steam installs have no login step to jump to.
        assert!(wizard.go_to(WizardStep::EpicLogin).await.is_err());
        assert_eq!(
            wizard.go_to(WizardStep::Platform).await,
            Ok(WizardStep::Platform)
        );
        assert_eq!(wizard.back().await, Ok(WizardStep::Welcome));

        assert!(matches!(
            wizard.finish().await,
            Err(WizardError::NotOnStep { .. })
        ));
    }

    #[tokio::test]
    async fn next_from_complete_is_invalid() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        walk_to_import(&wizard).await;
        wizard.next().await.expect("confirm");
        wizard.next().await.expect("install");

        assert!(matches!(
            wizard.next().await,
            Err(WizardError::InvalidTransition { .. })
        ));
        assert!(matches!(
            wizard.back().await,
            Err(WizardError::NoRoute { .. })
        ));
    }

    #[tokio::test]
    async fn controls_follow_live_session() {
        let backend = Arc::new(SimulatedBackend::with_defaults());
        let wizard = wizard_with(backend, ScriptedConfirm::always_skip());
        wizard.start().await;
        let controls = wizard.controls(LauncherSnapshot::default()).await;
        let again = wizard.controls(LauncherSnapshot::default()).await;
        assert_eq!(controls, again);
    }
}
