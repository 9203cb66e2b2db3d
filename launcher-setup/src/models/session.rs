// Setup session model
//
// `InstallSession` is the single mutable aggregate for one wizard run. It is plain data:
// every mutation goes through `SessionStore::update` (see `models::state`) so the
// orchestrator stays the only writer.

use crate::api::backend::{
    DetectedPlatform, InstallResult, PreservedSaveDataStatus, ReleaseSummary, SaveDataPreview,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    #[default]
    Welcome,
    Detecting,
    Platform,
    EpicLogin,
    Version,
    Import,
    Confirm,
    Progress,
    Complete,
}

impl WizardStep {
    /// Canonical forward sequence. `Detecting` and `EpicLogin` are interposed steps.
    pub const ALL: [WizardStep; 9] = [
        WizardStep::Welcome,
        WizardStep::Detecting,
        WizardStep::Platform,
        WizardStep::EpicLogin,
        WizardStep::Version,
        WizardStep::Import,
        WizardStep::Confirm,
        WizardStep::Progress,
        WizardStep::Complete,
    ];

    /// Position in the forward sequence; only used to derive transition direction.
    pub fn order(self) -> u8 {
        match self {
            WizardStep::Welcome => 0,
            WizardStep::Detecting => 1,
            WizardStep::Platform => 2,
            WizardStep::EpicLogin => 3,
            WizardStep::Version => 4,
            WizardStep::Import => 5,
            WizardStep::Confirm => 6,
            WizardStep::Progress => 7,
            WizardStep::Complete => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Welcome => "welcome",
            WizardStep::Detecting => "detecting",
            WizardStep::Platform => "platform",
            WizardStep::EpicLogin => "epic-login",
            WizardStep::Version => "version",
            WizardStep::Import => "import",
            WizardStep::Confirm => "confirm",
            WizardStep::Progress => "progress",
            WizardStep::Complete => "complete",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePlatform {
    #[default]
    Steam,
    Epic,
}

impl GamePlatform {
    pub fn from_user_value(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "steam" => Ok(Self::Steam),
            "epic" => Ok(Self::Epic),
            other => Err(format!("Unsupported platform: {other}")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Epic => "epic",
        }
    }

    /// Epic builds can only be launched with a live account session.
    pub fn requires_authentication(self) -> bool {
        matches!(self, Self::Epic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Ja,
}

impl Locale {
    /// Anything that is not explicitly English falls back to Japanese.
    pub fn from_user_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Self::En,
            _ => Self::Ja,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PasswordValidationState {
    #[default]
    Idle,
    Checking,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginState {
    pub checking: bool,
    pub logged_in: bool,
    pub display_name: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageStatus {
    Succeeded,
    Skipped,
}

/// Outcome of one import stage as shown on the completion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: String,
    pub status: StageStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallSession {
    pub step: WizardStep,
    pub locale: Locale,

    // Detection + platform
    pub platform: Option<GamePlatform>,
    pub install_path: String,
    pub detected: Vec<DetectedPlatform>,
    pub detection_error: Option<String>,
    pub login: LoginState,

    // Version
    pub releases: Vec<ReleaseSummary>,
    pub releases_loading: bool,
    pub releases_error: Option<String>,
    pub selected_release: Option<String>,

    // Save-data import
    pub preserved: PreservedSaveDataStatus,
    pub restore_preserved: bool,
    pub import_enabled: bool,
    pub import_source: String,
    pub import_preview: Option<SaveDataPreview>,
    pub import_preview_loading: bool,
    pub import_preview_error: Option<String>,

    // Migration archive import
    pub migration_import_enabled: bool,
    pub archive_path: String,
    #[serde(skip)]
    pub archive_password: String,
    /// Serialized stand-in for `archive_password`; kept in sync by `set_archive_password`.
    pub has_archive_password: bool,
    pub password_state: PasswordValidationState,
    pub password_error: Option<String>,

    // Execution
    pub installing: bool,
    pub progress_percent: f64,
    pub progress_message: String,
    pub pending_prompt: Option<String>,
    pub skip_reason: String,
    pub stage_reports: Vec<StageReport>,
    pub install_result: Option<InstallResult>,
    pub error_message: Option<String>,
    pub input_error: Option<String>,

    // Completion
    pub creating_shortcut: bool,
    pub shortcut_path: Option<String>,
    pub shortcut_error: Option<String>,
}

impl InstallSession {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    pub fn has_install_path(&self) -> bool {
        !self.install_path.trim().is_empty()
    }

    pub fn has_selected_release(&self) -> bool {
        self.selected_release
            .as_deref()
            .is_some_and(|tag| !tag.trim().is_empty())
    }

    pub fn requires_login(&self) -> bool {
        self.platform
            .is_some_and(GamePlatform::requires_authentication)
    }

    pub fn set_archive_password(&mut self, password: impl Into<String>) {
        self.archive_password = password.into();
        self.has_archive_password = !self.archive_password.is_empty();
    }

    /// Append a skipped stage's reason to the accumulated skip text.
    pub fn push_skip_reason(&mut self, reason: &str, separator: &str) {
        if self.skip_reason.is_empty() {
            self.skip_reason = reason.to_string();
        } else {
            self.skip_reason.push_str(separator);
            self.skip_reason.push_str(reason);
        }
    }

    /// Clear everything produced by a previous execution attempt, keeping user input.
    pub fn clear_run_state(&mut self) {
        self.progress_percent = 0.0;
        self.progress_message.clear();
        self.pending_prompt = None;
        self.skip_reason.clear();
        self.stage_reports.clear();
        self.install_result = None;
        self.error_message = None;
        self.input_error = None;
    }
}
