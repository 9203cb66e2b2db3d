// Launcher snapshot
//
// Everything the control-state computation looks at, gathered into one plain value so
// the derivation can be replayed from a snapshot alone.

use crate::api::backend::{PresetSummary, ReleaseSummary, SaveDataPreview};
use crate::models::session::{GamePlatform, InstallSession, Locale};
use serde::{Deserialize, Serialize};

/// Persisted launcher settings, as the backend reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherSettings {
    pub among_us_path: String,
    pub game_platform: GamePlatform,
    pub selected_release_tag: String,
    pub profile_path: String,
    pub close_to_tray_on_close: bool,
    pub close_webview_on_tray_background: bool,
    pub ui_locale: Locale,
    pub onboarding_completed: bool,
}

/// In-flight operations outside the wizard itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BusyFlags {
    pub installing: bool,
    pub uninstalling: bool,
    pub launching: bool,
    pub creating_shortcut: bool,
    pub exporting_migration: bool,
    pub importing_migration: bool,
    pub exporting_presets: bool,
    pub importing_presets: bool,
    pub importing_save_data: bool,
    pub saving_settings: bool,
    pub checking_update: bool,
    pub sending_report: bool,
    pub epic_auth: bool,
}

impl BusyFlags {
    /// Operations that touch the profile or move data around.
    pub fn any_operation(&self) -> bool {
        self.installing
            || self.uninstalling
            || self.launching
            || self.creating_shortcut
            || self.any_transfer()
    }

    pub fn any_transfer(&self) -> bool {
        self.exporting_migration
            || self.importing_migration
            || self.exporting_presets
            || self.importing_presets
            || self.importing_save_data
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationForm {
    pub encrypt_export: bool,
    pub export_password: String,
    pub import_path: String,
    pub import_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PresetForm {
    pub local: Vec<PresetSummary>,
    pub selected_local: Vec<i32>,
    pub archive_path: String,
    pub archive_entries: Vec<PresetSummary>,
    pub selected_archive: Vec<i32>,
}

impl PresetForm {
    /// Selected archive entries that actually carry preset data.
    pub fn importable_selection(&self) -> usize {
        self.archive_entries
            .iter()
            .filter(|entry| entry.has_data_file && self.selected_archive.contains(&entry.id))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDataForm {
    pub source_path: String,
    pub preview: Option<SaveDataPreview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EpicAccount {
    pub logged_in: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportForm {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherSnapshot {
    pub settings: Option<LauncherSettings>,
    pub profile_ready: bool,
    pub game_running: bool,
    pub busy: BusyFlags,
    pub detecting: bool,
    pub releases_loading: bool,
    pub releases: Vec<ReleaseSummary>,
    pub migration: MigrationForm,
    pub presets: PresetForm,
    pub save_data: SaveDataForm,
    pub epic: EpicAccount,
    pub report: ReportForm,
    pub update_available: bool,
    pub wizard: InstallSession,
}
