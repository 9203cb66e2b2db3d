// Deterministic in-memory backend
//
// Used by the proof modes and the test suite. Every operation can be scripted to fail a
// fixed number of times before succeeding, and every call is counted.

use crate::api::backend::{
    ApplySettingsRequest, ArchivePasswordCheck, BackendError, BackendErrorCode, BackendResult,
    ConfirmPrompt, DetectedPlatform, InstallRequest, InstallResult, LoginStatus,
    MigrationImportResult, PresetMergeResult, PresetSummary, PreservedSaveDataStatus,
    ReleaseSummary, SaveDataImportResult, SaveDataPreview, SetupBackend,
};
use crate::api::events::{InstallProgressEvent, ProgressEmitter};
use crate::models::session::GamePlatform;
use crate::wizard::progress::{
    STAGE_COMPLETE, STAGE_DOWNLOADING, STAGE_EXTRACTING, STAGE_RESOLVING, STAGE_RESTORING,
};
use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedOp {
    DetectPlatforms,
    DetectPlatformForPath,
    ListReleases,
    ApplySettings,
    Install,
    PreservedStatus,
    PreviewSaveData,
    ImportSaveData,
    ValidateArchivePassword,
    ImportMigrationArchive,
    MergeSaveDataPresets,
    MergePreservedPresets,
    CreateShortcut,
    LoginStatus,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    remaining: u32,
    error: BackendError,
}

#[derive(Debug, Default)]
struct SimState {
    detected: Vec<DetectedPlatform>,
    releases: Vec<ReleaseSummary>,
    preserved: PreservedSaveDataStatus,
    archive_password: Option<String>,
    logged_in: bool,
    failures: HashMap<SimulatedOp, ScriptedFailure>,
    calls: HashMap<SimulatedOp, u32>,
}

#[derive(Debug, Default)]
pub struct SimulatedBackend {
    state: Mutex<SimState>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steam install under a fixed path, two releases, no preserved data.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_detected(vec![DetectedPlatform {
                path: "/games/Among Us".to_string(),
                platform: GamePlatform::Steam,
            }])
            .with_releases(vec![
                ReleaseSummary {
                    tag: "v5.9.1".to_string(),
                    name: "SNR 5.9.1".to_string(),
                    published_at: "2025-11-02T09:00:00Z".to_string(),
                },
                ReleaseSummary {
                    tag: "v6.0.0".to_string(),
                    name: "SNR 6.0.0".to_string(),
                    published_at: "2026-03-14T09:00:00Z".to_string(),
                },
            ])
    }

    pub fn with_detected(self, detected: Vec<DetectedPlatform>) -> Self {
        self.lock().detected = detected;
        self
    }

    pub fn with_releases(self, releases: Vec<ReleaseSummary>) -> Self {
        self.lock().releases = releases;
        self
    }

    pub fn with_preserved(self, files: usize) -> Self {
        self.lock().preserved = PreservedSaveDataStatus {
            available: files > 0,
            files,
        };
        self
    }

    /// Archives are encrypted with `password`; without this they are plain.
    pub fn with_archive_password(self, password: &str) -> Self {
        self.lock().archive_password = Some(password.to_string());
        self
    }

    pub fn with_login(self, logged_in: bool) -> Self {
        self.lock().logged_in = logged_in;
        self
    }

    /// Fail `op` the next `times` calls with `error`. `u32::MAX` fails forever.
    pub fn fail_times(self, op: SimulatedOp, times: u32, error: BackendError) -> Self {
        self.lock().failures.insert(
            op,
            ScriptedFailure {
                remaining: times,
                error,
            },
        );
        self
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.lock().logged_in = logged_in;
    }

    pub fn calls(&self, op: SimulatedOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and return the scripted failure, if one is still armed.
    fn enter(&self, op: SimulatedOp) -> BackendResult<()> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(failure) = state.failures.get_mut(&op) {
            if failure.remaining > 0 {
                if failure.remaining != u32::MAX {
                    failure.remaining -= 1;
                }
                debug!(
                    "[PHASE: simulated] [STEP: {:?}] Scripted failure: {}",
                    op, failure.error.message
                );
                return Err(failure.error.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SetupBackend for SimulatedBackend {
    async fn detect_platforms(&self) -> BackendResult<Vec<DetectedPlatform>> {
        self.enter(SimulatedOp::DetectPlatforms)?;
        Ok(self.lock().detected.clone())
    }

    async fn detect_platform_for_path(&self, path: &str) -> BackendResult<GamePlatform> {
        self.enter(SimulatedOp::DetectPlatformForPath)?;
        let lowered = path.to_ascii_lowercase();
        if lowered.contains("epic") {
            Ok(GamePlatform::Epic)
        } else if lowered.contains("steam") || lowered.contains("among us") {
            Ok(GamePlatform::Steam)
        } else {
            Err(BackendError::with_code(
                format!("Among Us.exe not found under {path}"),
                BackendErrorCode::NotFound,
            ))
        }
    }

    async fn list_releases(&self) -> BackendResult<Vec<ReleaseSummary>> {
        self.enter(SimulatedOp::ListReleases)?;
        Ok(self.lock().releases.clone())
    }

    async fn apply_settings(&self, _request: &ApplySettingsRequest) -> BackendResult<()> {
        self.enter(SimulatedOp::ApplySettings)
    }

    async fn install(
        &self,
        request: &InstallRequest,
        progress: ProgressEmitter,
    ) -> BackendResult<InstallResult> {
        self.enter(SimulatedOp::Install)?;

        progress(InstallProgressEvent::new(
            STAGE_RESOLVING,
            0.0,
            "Resolving release metadata...",
        ));
        for downloaded in [0u64, 512, 1024] {
            progress(
                InstallProgressEvent::new(
                    STAGE_DOWNLOADING,
                    downloaded as f64 / 1024.0 * 80.0,
                    "Downloading SNR package...",
                )
                .with_bytes(downloaded, Some(1024)),
            );
            tokio::task::yield_now().await;
        }
        for current in [0usize, 2, 4] {
            progress(
                InstallProgressEvent::new(
                    STAGE_EXTRACTING,
                    80.0 + current as f64 / 4.0 * 18.0,
                    "Extracting package...",
                )
                .with_entries(current, Some(4)),
            );
        }

        let preserved = self.lock().preserved;
        let restored_save_files = if request.restore_preserved_save_data && preserved.available {
            progress(InstallProgressEvent::new(
                STAGE_RESTORING,
                99.0,
                format!("Restored {} preserved save file(s)", preserved.files),
            ));
            preserved.files
        } else {
            0
        };

        progress(InstallProgressEvent::new(
            STAGE_COMPLETE,
            100.0,
            "Installation complete",
        ));

        Ok(InstallResult {
            tag: request.release_tag.clone(),
            platform: request.platform,
            asset_name: format!("SuperNewRoles-{}.zip", request.platform.as_str()),
            profile_path: "/data/launcher/profile".to_string(),
            restored_save_files,
        })
    }

    async fn preserved_save_data_status(&self) -> BackendResult<PreservedSaveDataStatus> {
        self.enter(SimulatedOp::PreservedStatus)?;
        Ok(self.lock().preserved)
    }

    async fn preview_save_data(&self, source_path: &str) -> BackendResult<SaveDataPreview> {
        self.enter(SimulatedOp::PreviewSaveData)?;
        Ok(SaveDataPreview {
            source_path: source_path.to_string(),
            save_data_path: format!("{}/SuperNewRolesNext/SaveData", source_path),
            presets: vec![
                PresetSummary {
                    id: 0,
                    name: "Default".to_string(),
                    has_data_file: true,
                },
                PresetSummary {
                    id: 1,
                    name: "Tournament".to_string(),
                    has_data_file: true,
                },
            ],
            file_count: 6,
        })
    }

    async fn import_save_data(&self, _source_path: &str) -> BackendResult<SaveDataImportResult> {
        self.enter(SimulatedOp::ImportSaveData)?;
        Ok(SaveDataImportResult {
            imported_files: 6,
            imported_presets: 2,
        })
    }

    async fn validate_archive_password(
        &self,
        _archive_path: &str,
        password: &str,
    ) -> BackendResult<ArchivePasswordCheck> {
        self.enter(SimulatedOp::ValidateArchivePassword)?;
        let expected = self.lock().archive_password.clone();
        match expected {
            None => Ok(ArchivePasswordCheck { encrypted: false }),
            Some(expected) if expected == password => Ok(ArchivePasswordCheck { encrypted: true }),
            Some(_) => Err(BackendError::new(
                "Failed to decrypt .snrdata. The password may be incorrect or the file is corrupted.",
            )),
        }
    }

    async fn import_migration_archive(
        &self,
        _archive_path: &str,
        _password: &str,
    ) -> BackendResult<MigrationImportResult> {
        self.enter(SimulatedOp::ImportMigrationArchive)?;
        let encrypted = self.lock().archive_password.is_some();
        Ok(MigrationImportResult {
            imported_files: 9,
            encrypted,
        })
    }

    async fn merge_save_data_presets(
        &self,
        _source_path: &str,
    ) -> BackendResult<PresetMergeResult> {
        self.enter(SimulatedOp::MergeSaveDataPresets)?;
        Ok(PresetMergeResult {
            imported_presets: 2,
        })
    }

    async fn merge_preserved_presets(&self) -> BackendResult<PresetMergeResult> {
        self.enter(SimulatedOp::MergePreservedPresets)?;
        Ok(PresetMergeResult {
            imported_presets: 1,
        })
    }

    async fn create_shortcut(&self) -> BackendResult<String> {
        self.enter(SimulatedOp::CreateShortcut)?;
        Ok("/home/user/Desktop/SuperNewRoles.desktop".to_string())
    }

    async fn login_status(&self, platform: GamePlatform) -> BackendResult<LoginStatus> {
        self.enter(SimulatedOp::LoginStatus)?;
        let logged_in = !platform.requires_authentication() || self.lock().logged_in;
        Ok(LoginStatus {
            logged_in,
            display_name: logged_in.then(|| "Crewmate".to_string()),
        })
    }
}

/// Confirmation collaborator that answers from a script, then falls back to a fixed answer.
#[derive(Debug)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers "skip".
    pub fn always_skip() -> Self {
        Self::new([], false)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConfirmPrompt for ScriptedConfirm {
    async fn ask_retry(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
