// Install + import pipeline
//
// Order of work for one confirmed run:
// 1. apply settings, then the base install (both fatal on failure)
// 2. the import stages, in `ImportStageId::ORDER`, each only when its activation rule
//    holds given the outcomes so far
//
// Every active stage runs inside a retry-or-skip loop driven by the confirmation
// collaborator. A skipped stage never aborts the run; its error text is appended to the
// session's skip reason.

use crate::api::backend::{
    ApplySettingsRequest, BackendError, BackendResult, ConfirmPrompt, InstallRequest,
    InstallResult, SetupBackend,
};
use crate::api::events::{BackendEvent, EventHub};
use crate::models::session::{
    InstallSession, Locale, PasswordValidationState, StageReport, StageStatus,
};
use crate::models::state::SessionStore;
use crate::security::crypto::secret_fingerprint;
use crate::utils::config::WizardConfig;
use crate::utils::logging::mask_home;
use crate::utils::validation;
use crate::wizard::error::WizardError;
use crate::wizard::{messages, password, steps};
use crate::wizard::progress::{ProgressAggregator, ProgressView};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportStageId {
    SaveDataImport,
    MigrationImport,
    SaveDataPresetMerge,
    PreservedPresetMerge,
}

impl ImportStageId {
    pub const ORDER: [ImportStageId; 4] = [
        ImportStageId::SaveDataImport,
        ImportStageId::MigrationImport,
        ImportStageId::SaveDataPresetMerge,
        ImportStageId::PreservedPresetMerge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImportStageId::SaveDataImport => "save-data-import",
            ImportStageId::MigrationImport => "migration-import",
            ImportStageId::SaveDataPresetMerge => "save-data-preset-merge",
            ImportStageId::PreservedPresetMerge => "preserved-preset-merge",
        }
    }
}

/// User choices that decide which stages can run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationInputs {
    pub import_enabled: bool,
    pub migration_enabled: bool,
    pub preserved_available: bool,
    pub restore_preserved: bool,
}

impl ActivationInputs {
    pub fn from_session(session: &InstallSession) -> Self {
        Self {
            import_enabled: session.import_enabled,
            migration_enabled: session.migration_import_enabled,
            preserved_available: session.preserved.available,
            restore_preserved: session.restore_preserved,
        }
    }
}

/// Outcome of the two import stages so far. `None` means the stage has not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageOutcomes {
    pub save_import: Option<bool>,
    pub migration_import: Option<bool>,
}

impl StageOutcomes {
    fn record(&mut self, stage: ImportStageId, succeeded: bool) {
        match stage {
            ImportStageId::SaveDataImport => self.save_import = Some(succeeded),
            ImportStageId::MigrationImport => self.migration_import = Some(succeeded),
            ImportStageId::SaveDataPresetMerge | ImportStageId::PreservedPresetMerge => {}
        }
    }
}

pub fn stage_is_active(
    stage: ImportStageId,
    inputs: &ActivationInputs,
    outcomes: &StageOutcomes,
) -> bool {
    let save_ok = outcomes.save_import == Some(true);
    let migration_ok = outcomes.migration_import == Some(true);
    match stage {
        ImportStageId::SaveDataImport => inputs.import_enabled,
        ImportStageId::MigrationImport => inputs.migration_enabled,
        ImportStageId::SaveDataPresetMerge => {
            inputs.import_enabled && inputs.migration_enabled && save_ok && migration_ok
        }
        ImportStageId::PreservedPresetMerge => {
            inputs.preserved_available && inputs.restore_preserved && (save_ok || migration_ok)
        }
    }
}

/// Everything one run needs, captured from the session when the user confirms.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub settings: ApplySettingsRequest,
    pub install: InstallRequest,
    pub activation: ActivationInputs,
    pub import_source: String,
    pub archive_path: String,
    pub archive_password: String,
    pub locale: Locale,
}

impl RunPlan {
    /// Local validation of the confirmed session. Nothing is sent to the backend on error.
    pub fn from_session(session: &InstallSession) -> Result<Self, WizardError> {
        let locale = session.locale;
        let platform = session
            .platform
            .ok_or_else(|| WizardError::input(messages::platform_required(locale)))?;
        let install_path = validation::validate_install_path(&session.install_path, locale)?;
        let release_tag = validation::require_non_empty(
            session.selected_release.as_deref().unwrap_or_default(),
            messages::release_required(locale),
        )?
        .to_string();

        let import_source = if session.import_enabled {
            validation::require_non_empty(
                &session.import_source,
                messages::import_source_required(locale),
            )?
            .to_string()
        } else {
            String::new()
        };
        if !steps::import_preview_ready(session) {
            let message = session
                .import_preview_error
                .clone()
                .unwrap_or_else(|| messages::import_preview_required(locale).to_string());
            return Err(WizardError::Blocked(message));
        }

        // Archive inputs may have been edited after `import` was left.
        let archive_path = if session.migration_import_enabled {
            let path = password::validation_inputs(session)?;
            if session.password_state != PasswordValidationState::Valid {
                let message = session
                    .password_error
                    .clone()
                    .unwrap_or_else(|| messages::password_not_validated(locale).to_string());
                return Err(WizardError::Blocked(message));
            }
            path
        } else {
            session.archive_path.trim().to_string()
        };

        let activation = ActivationInputs::from_session(session);
        let restore = activation.preserved_available && activation.restore_preserved;

        Ok(Self {
            settings: ApplySettingsRequest {
                platform,
                install_path,
                release_tag: release_tag.clone(),
                locale,
            },
            install: InstallRequest {
                release_tag,
                platform,
                restore_preserved_save_data: restore,
            },
            activation,
            import_source,
            archive_path,
            archive_password: session.archive_password.clone(),
            locale,
        })
    }
}

// ========================================
// Install guard
// ========================================

/// At most one run at a time. Concurrent attempts are rejected, not queued.
#[derive(Debug, Default)]
pub struct InstallGuard {
    running: AtomicBool,
}

/// Held for the duration of a run; releases the guard on drop, including on early return.
#[derive(Debug)]
pub struct InstallPermit<'a> {
    guard: &'a InstallGuard,
}

impl InstallGuard {
    pub fn try_begin(&self) -> Option<InstallPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InstallPermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for InstallPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::SeqCst);
    }
}

// ========================================
// Runner
// ========================================

enum RetryState {
    Attempt { attempt: u32 },
    AwaitingUserChoice { attempt: u32, error: BackendError },
    Finished(StageReport),
}

pub struct ImportPipeline<'a> {
    pub backend: &'a dyn SetupBackend,
    pub confirm: &'a dyn ConfirmPrompt,
    pub hub: &'a EventHub,
    pub store: &'a SessionStore,
    pub config: &'a WizardConfig,
}

impl ImportPipeline<'_> {
    /// Run the base install and every active stage.
    ///
    /// Step changes and fatal-error handling belong to the caller; this only writes
    /// progress, prompts, skip reasons and stage reports into the session.
    pub async fn run(&self, plan: &RunPlan) -> Result<InstallResult, BackendError> {
        let run_id = Uuid::new_v4();
        info!(
            "[PHASE: pipeline] [STEP: start] run={} tag={} platform={} path={} import={} migration={} restore_preserved={}",
            run_id,
            plan.install.release_tag,
            plan.install.platform.as_str(),
            mask_home(&plan.settings.install_path),
            plan.activation.import_enabled,
            plan.activation.migration_enabled,
            plan.install.restore_preserved_save_data
        );

        let mut progress = ProgressAggregator::with_ceiling(self.config.watermark());
        self.publish(ProgressView {
            percent: 0.0,
            stage: String::new(),
            message: messages::install_starting(plan.locale).to_string(),
        })
        .await;

        self.backend
            .apply_settings(&plan.settings)
            .await
            .map_err(|e| {
                error!(
                    "[PHASE: pipeline] [STEP: apply_settings] run={} failed: {}",
                    run_id, e
                );
                e
            })?;

        let result = self.run_base_install(run_id, plan, &mut progress).await?;

        let mut outcomes = StageOutcomes::default();
        for stage in ImportStageId::ORDER {
            if !stage_is_active(stage, &plan.activation, &outcomes) {
                debug!(
                    "[PHASE: pipeline] [STEP: {}] run={} inactive",
                    stage.as_str(),
                    run_id
                );
                continue;
            }

            let view = progress.pin(messages::stage_running(plan.locale, stage));
            self.publish(view).await;

            let report = self.run_stage(run_id, stage, plan).await;
            outcomes.record(stage, report.status == StageStatus::Succeeded);

            let separator = self.config.skip_reason_separator.clone();
            self.store
                .update(|s| {
                    if let Some(reason) = report.reason.as_deref() {
                        s.push_skip_reason(reason, &separator);
                    }
                    s.stage_reports.push(report);
                })
                .await;
        }

        let done = progress.finish(messages::install_complete(plan.locale));
        self.publish(done).await;

        info!(
            "[PHASE: pipeline] [STEP: complete] run={} asset={} restored_save_files={}",
            run_id, result.asset_name, result.restored_save_files
        );
        Ok(result)
    }

    async fn run_base_install(
        &self,
        run_id: Uuid,
        plan: &RunPlan,
        progress: &mut ProgressAggregator,
    ) -> Result<InstallResult, BackendError> {
        let mut subscription = self.hub.subscribe();
        let install = self
            .backend
            .install(&plan.install, self.hub.progress_emitter());
        tokio::pin!(install);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = subscription.recv() => {
                    self.apply_event(progress, event).await;
                }
                result = &mut install => break result,
            }
        };

        // Events published right before completion are still queued.
        while let Some(event) = subscription.try_recv() {
            self.apply_event(progress, event).await;
        }
        subscription.dispose();

        match &result {
            Ok(_) => debug!("[PHASE: pipeline] [STEP: install] run={} base install ok", run_id),
            Err(e) => error!(
                "[PHASE: pipeline] [STEP: install] run={} base install failed: {}",
                run_id, e
            ),
        }
        result
    }

    async fn apply_event(&self, progress: &mut ProgressAggregator, event: BackendEvent) {
        match event {
            BackendEvent::InstallProgress(event) => {
                let view = progress.apply(&event);
                self.publish(view).await;
            }
            other => {
                debug!(
                    "[PHASE: pipeline] [STEP: events] Ignoring '{}' event during install",
                    other.name()
                );
            }
        }
    }

    async fn publish(&self, view: ProgressView) {
        self.store
            .update(|s| {
                s.progress_percent = view.percent;
                s.progress_message = view.message;
            })
            .await;
    }

    /// Attempt -> Finished(success) | AwaitingUserChoice -> Attempt | Finished(skipped)
    async fn run_stage(&self, run_id: Uuid, stage: ImportStageId, plan: &RunPlan) -> StageReport {
        let mut state = RetryState::Attempt { attempt: 1 };
        loop {
            state = match state {
                RetryState::Attempt { attempt } => match self.invoke(stage, plan).await {
                    Ok(()) => {
                        info!(
                            "[PHASE: pipeline] [STEP: {}] run={} succeeded on attempt {}",
                            stage.as_str(),
                            run_id,
                            attempt
                        );
                        RetryState::Finished(StageReport {
                            stage: stage.as_str().to_string(),
                            status: StageStatus::Succeeded,
                            attempts: attempt,
                            reason: None,
                        })
                    }
                    Err(error) => {
                        warn!(
                            "[PHASE: pipeline] [STEP: {}] run={} attempt {} failed: {}",
                            stage.as_str(),
                            run_id,
                            attempt,
                            error
                        );
                        RetryState::AwaitingUserChoice { attempt, error }
                    }
                },
                RetryState::AwaitingUserChoice { attempt, error } => {
                    let prompt = messages::retry_prompt(plan.locale, stage, &error.message);
                    self.store
                        .update(|s| s.pending_prompt = Some(prompt.clone()))
                        .await;
                    let retry = self.confirm.ask_retry(&prompt).await;
                    self.store.update(|s| s.pending_prompt = None).await;

                    if retry {
                        RetryState::Attempt {
                            attempt: attempt + 1,
                        }
                    } else {
                        info!(
                            "[PHASE: pipeline] [STEP: {}] run={} skipped after {} attempt(s)",
                            stage.as_str(),
                            run_id,
                            attempt
                        );
                        RetryState::Finished(StageReport {
                            stage: stage.as_str().to_string(),
                            status: StageStatus::Skipped,
                            attempts: attempt,
                            reason: Some(error.message),
                        })
                    }
                }
                RetryState::Finished(report) => return report,
            };
        }
    }

    async fn invoke(&self, stage: ImportStageId, plan: &RunPlan) -> BackendResult<()> {
        match stage {
            ImportStageId::SaveDataImport => {
                let imported = self.backend.import_save_data(&plan.import_source).await?;
                debug!(
                    "[PHASE: pipeline] [STEP: {}] files={} presets={}",
                    stage.as_str(),
                    imported.imported_files,
                    imported.imported_presets
                );
            }
            ImportStageId::MigrationImport => {
                debug!(
                    "[PHASE: pipeline] [STEP: {}] archive={} password={}",
                    stage.as_str(),
                    mask_home(&plan.archive_path),
                    secret_fingerprint(&plan.archive_password)
                );
                let imported = self
                    .backend
                    .import_migration_archive(&plan.archive_path, &plan.archive_password)
                    .await?;
                debug!(
                    "[PHASE: pipeline] [STEP: {}] files={} encrypted={}",
                    stage.as_str(),
                    imported.imported_files,
                    imported.encrypted
                );
            }
            ImportStageId::SaveDataPresetMerge => {
                let merged = self
                    .backend
                    .merge_save_data_presets(&plan.import_source)
                    .await?;
                debug!(
                    "[PHASE: pipeline] [STEP: {}] presets={}",
                    stage.as_str(),
                    merged.imported_presets
                );
            }
            ImportStageId::PreservedPresetMerge => {
                let merged = self.backend.merge_preserved_presets().await?;
                debug!(
                    "[PHASE: pipeline] [STEP: {}] presets={}",
                    stage.as_str(),
                    merged.imported_presets
                );
            }
        }
        Ok(())
    }
}
