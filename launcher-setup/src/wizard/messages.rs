// User-facing message templates (en / ja)

use crate::models::session::Locale;
use crate::wizard::pipeline::ImportStageId;

pub fn stage_label(locale: Locale, stage: ImportStageId) -> &'static str {
    match (locale, stage) {
        (Locale::En, ImportStageId::SaveDataImport) => "Save data import",
        (Locale::En, ImportStageId::MigrationImport) => "Migration data import",
        (Locale::En, ImportStageId::SaveDataPresetMerge) => "Preset merge",
        (Locale::En, ImportStageId::PreservedPresetMerge) => "Preserved preset merge",
        (Locale::Ja, ImportStageId::SaveDataImport) => "セーブデータの取り込み",
        (Locale::Ja, ImportStageId::MigrationImport) => "移行データの取り込み",
        (Locale::Ja, ImportStageId::SaveDataPresetMerge) => "プリセットの統合",
        (Locale::Ja, ImportStageId::PreservedPresetMerge) => "保持済みプリセットの統合",
    }
}

pub fn stage_running(locale: Locale, stage: ImportStageId) -> String {
    match locale {
        Locale::En => format!("{}...", stage_label(locale, stage)),
        Locale::Ja => format!("{}中...", stage_label(locale, stage)),
    }
}

pub fn retry_prompt(locale: Locale, stage: ImportStageId, error: &str) -> String {
    let label = stage_label(locale, stage);
    match locale {
        Locale::En => format!("{label} failed:\n{error}\n\nRetry? Choose No to skip this step."),
        Locale::Ja => format!(
            "{label}に失敗しました:\n{error}\n\n再試行しますか？「いいえ」でこの処理をスキップします。"
        ),
    }
}

pub fn install_starting(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Preparing installation...",
        Locale::Ja => "インストールを準備しています...",
    }
}

pub fn install_complete(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Installation complete",
        Locale::Ja => "インストールが完了しました",
    }
}

pub fn password_wrong(locale: Locale, extension: &str) -> String {
    match locale {
        Locale::En => format!(
            "Failed to decrypt .{extension}. The password may be incorrect or the file is corrupted."
        ),
        Locale::Ja => format!(
            ".{extension} を復号できませんでした。パスワードが違うか、ファイルが破損している可能性があります。"
        ),
    }
}

pub fn password_check_failed(locale: Locale, error: &str) -> String {
    match locale {
        Locale::En => format!("Could not validate the archive: {error}"),
        Locale::Ja => format!("アーカイブを検証できませんでした: {error}"),
    }
}

pub fn password_required(locale: Locale, extension: &str) -> String {
    match locale {
        Locale::En => format!("This .{extension} file is encrypted. Please provide a password."),
        Locale::Ja => format!(".{extension} ファイルは暗号化されています。パスワードを入力してください。"),
    }
}

pub fn archive_path_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Migration archive path is required",
        Locale::Ja => "移行アーカイブのパスを指定してください",
    }
}

pub fn password_not_validated(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Validate the archive password before continuing.",
        Locale::Ja => "続行する前にアーカイブのパスワードを確認してください。",
    }
}

pub fn password_checking(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "The archive password is still being checked.",
        Locale::Ja => "アーカイブのパスワードを確認中です。",
    }
}

pub fn install_path_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Installation path is required",
        Locale::Ja => "インストール先のパスを指定してください",
    }
}

pub fn platform_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Select a game platform",
        Locale::Ja => "ゲームのプラットフォームを選択してください",
    }
}

pub fn release_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Select a version to install",
        Locale::Ja => "インストールするバージョンを選択してください",
    }
}

pub fn release_unknown(locale: Locale, tag: &str) -> String {
    match locale {
        Locale::En => format!("Unknown release: {tag}"),
        Locale::Ja => format!("不明なリリースです: {tag}"),
    }
}

pub fn import_source_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Save data source path is required",
        Locale::Ja => "取り込み元のセーブデータのパスを指定してください",
    }
}

pub fn import_preview_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Check the save data source before continuing.",
        Locale::Ja => "続行する前に取り込み元のセーブデータを確認してください。",
    }
}

pub fn login_required(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Sign in to Epic Games to continue.",
        Locale::Ja => "続行するには Epic Games にログインしてください。",
    }
}

pub fn shortcut_busy(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Shortcut creation is already running.",
        Locale::Ja => "ショートカットを作成中です。",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_prompt_embeds_error_text() {
        let prompt = retry_prompt(Locale::En, ImportStageId::MigrationImport, "disk full");
        assert!(prompt.starts_with("Migration data import failed:"));
        assert!(prompt.contains("disk full"));

        let ja = retry_prompt(Locale::Ja, ImportStageId::SaveDataImport, "disk full");
        assert!(ja.contains("disk full"));
        assert!(ja.contains("再試行"));
    }

    #[test]
    fn password_messages_mention_extension() {
        assert!(password_wrong(Locale::En, "snrdata").contains(".snrdata"));
        assert!(password_required(Locale::En, "snrdata").contains(".snrdata"));
    }

    #[test]
    fn shortcut_busy_is_localized() {
        assert_eq!(
            shortcut_busy(Locale::En),
            "Shortcut creation is already running."
        );
        assert_ne!(shortcut_busy(Locale::Ja), shortcut_busy(Locale::En));
    }
}
