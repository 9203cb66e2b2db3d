// Backend contract used by the setup workflow
//
// The workflow never touches files, archives or the network itself. Everything it needs
// is expressed here as an async trait so production code can bind the launcher backend
// and tests can bind deterministic stubs.

use crate::api::events::ProgressEmitter;
use crate::models::session::{GamePlatform, Locale};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// Errors
// =============================================================================

/// Structured failure categories a backend may attach to an error.
///
/// Older backends only return text, so callers must cope with `code == None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorCode {
    WrongPassword,
    ArchiveUnreadable,
    NotFound,
    Network,
}

/// Error returned by every backend operation.
/// `message` is shown to the user verbatim; it must never contain secrets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub code: Option<BackendErrorCode>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: BackendErrorCode) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPlatform {
    pub path: String,
    pub platform: GamePlatform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub tag: String,
    pub name: String,
    /// RFC 3339; empty when the release was never published.
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySettingsRequest {
    pub platform: GamePlatform,
    pub install_path: String,
    pub release_tag: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    pub release_tag: String,
    pub platform: GamePlatform,
    pub restore_preserved_save_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub tag: String,
    pub platform: GamePlatform,
    pub asset_name: String,
    pub profile_path: String,
    pub restored_save_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreservedSaveDataStatus {
    pub available: bool,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSummary {
    pub id: i32,
    pub name: String,
    pub has_data_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDataPreview {
    pub source_path: String,
    pub save_data_path: String,
    pub presets: Vec<PresetSummary>,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDataImportResult {
    pub imported_files: usize,
    pub imported_presets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePasswordCheck {
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationImportResult {
    pub imported_files: usize,
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetMergeResult {
    pub imported_presets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatus {
    pub logged_in: bool,
    pub display_name: Option<String>,
}

// =============================================================================
// Collaborator traits
// =============================================================================

/// Launcher backend operations the setup workflow depends on.
#[async_trait]
pub trait SetupBackend: Send + Sync {
    async fn detect_platforms(&self) -> BackendResult<Vec<DetectedPlatform>>;

    async fn detect_platform_for_path(&self, path: &str) -> BackendResult<GamePlatform>;

    async fn list_releases(&self) -> BackendResult<Vec<ReleaseSummary>>;

    async fn apply_settings(&self, request: &ApplySettingsRequest) -> BackendResult<()>;

    /// Base install. Progress is pushed through `progress` while the call is outstanding.
    async fn install(
        &self,
        request: &InstallRequest,
        progress: ProgressEmitter,
    ) -> BackendResult<InstallResult>;

    async fn preserved_save_data_status(&self) -> BackendResult<PreservedSaveDataStatus>;

    async fn preview_save_data(&self, source_path: &str) -> BackendResult<SaveDataPreview>;

    async fn import_save_data(&self, source_path: &str) -> BackendResult<SaveDataImportResult>;

    async fn validate_archive_password(
        &self,
        archive_path: &str,
        password: &str,
    ) -> BackendResult<ArchivePasswordCheck>;

    async fn import_migration_archive(
        &self,
        archive_path: &str,
        password: &str,
    ) -> BackendResult<MigrationImportResult>;

    async fn merge_save_data_presets(&self, source_path: &str)
        -> BackendResult<PresetMergeResult>;

    async fn merge_preserved_presets(&self) -> BackendResult<PresetMergeResult>;

    async fn create_shortcut(&self) -> BackendResult<String>;

    async fn login_status(&self, platform: GamePlatform) -> BackendResult<LoginStatus>;
}

/// Abstract "ask yes/no" capability used by the retry loop.
/// `true` means retry, `false` means skip the stage.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn ask_retry(&self, prompt: &str) -> bool;
}
