// Control enablement
//
// `compute` derives every enablement flag the launcher UI shows from one snapshot. It is
// a pure function: no clock, no I/O, no state of its own.

use crate::models::session::{PasswordValidationState, WizardStep};
use crate::models::snapshot::LauncherSnapshot;
use crate::wizard::steps;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    // Game + profile
    pub install_path_input: bool,
    pub detect_platform: bool,
    pub platform_select: bool,
    pub release_select: bool,
    pub release_refresh: bool,
    pub install: bool,
    pub uninstall: bool,
    pub launch_modded: bool,
    pub launch_vanilla: bool,
    pub create_shortcut: bool,
    pub open_profile_folder: bool,

    // Migration
    pub migration_export: bool,
    pub migration_export_password_input: bool,
    pub migration_import: bool,
    pub migration_import_password_input: bool,

    // Presets
    pub preset_select_local: bool,
    pub preset_export: bool,
    pub preset_archive_browse: bool,
    pub preset_archive_select: bool,
    pub preset_archive_import: bool,

    // Save data
    pub save_data_preview: bool,
    pub save_data_import: bool,

    // Settings
    pub close_to_tray_toggle: bool,
    pub close_webview_on_tray_background: bool,
    pub locale_select: bool,

    // Accounts, reports, updates
    pub epic_login: bool,
    pub epic_logout: bool,
    pub report_send: bool,
    pub update_check: bool,
    pub update_apply: bool,

    // Setup wizard
    pub wizard_back: bool,
    pub wizard_next: bool,
    pub wizard_platform_select: bool,
    pub wizard_detect_path: bool,
    pub wizard_release_select: bool,
    pub wizard_release_retry: bool,
    pub wizard_epic_login: bool,
    pub wizard_import_toggle: bool,
    pub wizard_import_source_input: bool,
    pub wizard_restore_preserved_toggle: bool,
    pub wizard_migration_toggle: bool,
    pub wizard_archive_inputs: bool,
    pub wizard_validate_password: bool,
    pub wizard_confirm_install: bool,
    pub wizard_create_shortcut: bool,
    pub wizard_finish: bool,
}

pub fn compute(snapshot: &LauncherSnapshot) -> ControlState {
    let wizard = &snapshot.wizard;
    let settings = snapshot.settings.as_ref();

    let has_settings = settings.is_some();
    let has_game_path = settings.is_some_and(|s| !s.among_us_path.trim().is_empty());
    let has_release_tag = settings.is_some_and(|s| !s.selected_release_tag.trim().is_empty());
    let close_to_tray = settings.is_some_and(|s| s.close_to_tray_on_close);
    let needs_epic = settings.is_some_and(|s| s.game_platform.requires_authentication());

    let busy = snapshot.busy.any_operation() || wizard.installing || wizard.creating_shortcut;
    let saving = snapshot.busy.saving_settings;
    let running = snapshot.game_running;
    let epic_ready = !needs_epic || snapshot.epic.logged_in;
    let releases_ready = !snapshot.releases_loading && !snapshot.releases.is_empty();

    let migration = &snapshot.migration;
    let export_password_ok = !migration.encrypt_export || !migration.export_password.is_empty();

    let presets = &snapshot.presets;
    let save_data = &snapshot.save_data;
    let preview_has_files = save_data
        .preview
        .as_ref()
        .is_some_and(|preview| preview.file_count > 0);

    let in_wizard_inputs = !wizard.installing
        && !matches!(wizard.step, WizardStep::Progress | WizardStep::Complete);
    let on_import = in_wizard_inputs && wizard.step == WizardStep::Import;

    ControlState {
        install_path_input: !busy,
        detect_platform: !busy && !snapshot.detecting,
        platform_select: !busy,
        release_select: has_settings && releases_ready && !busy,
        release_refresh: !snapshot.releases_loading && !busy,
        install: has_settings && has_game_path && has_release_tag && !busy && !running,
        uninstall: has_settings && snapshot.profile_ready && !busy && !running,
        launch_modded: has_settings && snapshot.profile_ready && !busy && !running && epic_ready,
        launch_vanilla: has_settings && !busy && !running && epic_ready,
        create_shortcut: has_settings && snapshot.profile_ready && !busy,
        open_profile_folder: snapshot.profile_ready,

        migration_export: has_settings && snapshot.profile_ready && !busy && export_password_ok,
        migration_export_password_input: migration.encrypt_export && !busy,
        migration_import: has_settings && !busy && !migration.import_path.trim().is_empty(),
        migration_import_password_input: has_settings
            && !migration.import_path.trim().is_empty()
            && !busy,

        preset_select_local: has_settings && !presets.local.is_empty() && !busy,
        preset_export: has_settings && !presets.selected_local.is_empty() && !busy,
        preset_archive_browse: has_settings && !busy,
        preset_archive_select: presets.archive_entries.iter().any(|e| e.has_data_file) && !busy,
        preset_archive_import: has_settings
            && !presets.archive_path.trim().is_empty()
            && presets.importable_selection() > 0
            && !busy,

        save_data_preview: !save_data.source_path.trim().is_empty() && !busy,
        save_data_import: has_settings && preview_has_files && !busy,

        close_to_tray_toggle: has_settings && !saving,
        close_webview_on_tray_background: has_settings && close_to_tray && !saving,
        locale_select: !saving,

        epic_login: !snapshot.epic.logged_in && !snapshot.busy.epic_auth,
        epic_logout: snapshot.epic.logged_in && !snapshot.busy.epic_auth && !running,
        report_send: !snapshot.report.title.trim().is_empty()
            && !snapshot.report.body.trim().is_empty()
            && !snapshot.busy.sending_report,
        update_check: !snapshot.busy.checking_update && !busy,
        update_apply: snapshot.update_available && !busy && !running,

        wizard_back: !wizard.installing
            && !snapshot.detecting
            && steps::back_target(wizard.step, wizard.requires_login()).is_some(),
        wizard_next: wizard_next_enabled(snapshot),
        wizard_platform_select: in_wizard_inputs && !snapshot.detecting,
        wizard_detect_path: in_wizard_inputs && wizard.has_install_path() && !snapshot.detecting,
        wizard_release_select: in_wizard_inputs
            && !wizard.releases_loading
            && !wizard.releases.is_empty(),
        wizard_release_retry: in_wizard_inputs && !wizard.releases_loading,
        wizard_epic_login: wizard.step == WizardStep::EpicLogin
            && !wizard.login.checking
            && !wizard.login.logged_in
            && !snapshot.busy.epic_auth,
        wizard_import_toggle: on_import,
        wizard_import_source_input: on_import && wizard.import_enabled,
        wizard_restore_preserved_toggle: on_import && wizard.preserved.available,
        wizard_migration_toggle: on_import,
        wizard_archive_inputs: on_import && wizard.migration_import_enabled,
        wizard_validate_password: on_import
            && wizard.migration_import_enabled
            && !wizard.archive_path.trim().is_empty()
            && wizard.has_archive_password
            && wizard.password_state != PasswordValidationState::Checking,
        wizard_confirm_install: wizard.step == WizardStep::Confirm
            && steps::can_advance(wizard)
            && !snapshot.busy.any_operation(),
        wizard_create_shortcut: wizard.step == WizardStep::Complete
            && wizard.install_result.is_some()
            && !wizard.creating_shortcut,
        wizard_finish: wizard.step == WizardStep::Complete && !wizard.creating_shortcut,
    }
}

/// `next` is offered while a just-in-time password check could still unblock `import`.
fn wizard_next_enabled(snapshot: &LauncherSnapshot) -> bool {
    let wizard = &snapshot.wizard;
    if wizard.installing || snapshot.detecting {
        return false;
    }
    match wizard.step {
        WizardStep::Import => {
            let password_ok = !wizard.migration_import_enabled
                || match wizard.password_state {
                    PasswordValidationState::Valid => true,
                    PasswordValidationState::Checking => false,
                    PasswordValidationState::Idle | PasswordValidationState::Invalid => {
                        !wizard.archive_path.trim().is_empty() && wizard.has_archive_password
                    }
                };
            password_ok && steps::import_preview_ready(wizard)
        }
        _ => steps::can_advance(wizard),
    }
}
