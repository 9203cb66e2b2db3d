// Launcher setup workflow core
// Main library entry point

pub mod api;
pub mod models;
pub mod security;
pub mod utils;
pub mod wizard;

use anyhow::Context;
use api::backend::BackendError;
use api::events::{BackendEvent, EventHub};
use api::simulated::{ScriptedConfirm, SimulatedBackend, SimulatedOp};
use log::{error, info};
use models::session::{GamePlatform, InstallSession, WizardStep};
use models::snapshot::{LauncherSettings, LauncherSnapshot};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use utils::config::WizardConfig;
use wizard::progress::format_detail;
use wizard::SetupWizard;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(with_stdout: bool, level: log::LevelFilter) -> anyhow::Result<PathBuf> {
    let log_dir = utils::path_resolver::resolve_log_folder()?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("setup-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("setup-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new().level(level);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

/// Load configuration, falling back to defaults when the file or environment is invalid.
fn load_config() -> WizardConfig {
    match WizardConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration, using defaults: {}", e);
            WizardConfig::default()
        }
    }
}

fn block_on<F: std::future::Future<Output = anyhow::Result<()>>>(future: F) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?
        .block_on(future)
}

/// Deterministic end-to-end walk through the wizard against the simulated backend.
/// Writes `setup_smoke_transcript.log` under the log folder and exits 0/1.
pub fn run_setup_smoke() {
    let config = load_config();
    let log_dir = match init_logging(false, config.log_level_filter()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            utils::path_resolver::resolve_deployment_folder().join("logs")
        }
    };

    info!(
        "[PHASE: initialization] Setup smoke starting at {}",
        chrono::Utc::now()
    );

    let transcript = log_dir.join("setup_smoke_transcript.log");
    if let Err(e) = block_on(setup_smoke(config, &transcript)) {
        error!(
            "[PHASE: smoke] [STEP: setup] Smoke exited with error: {:?}",
            e
        );
        eprintln!("Setup smoke failed: {:#}", e);
        std::process::exit(1);
    }
    println!("Transcript written to {}", transcript.display());
}

async fn setup_smoke(config: WizardConfig, transcript_path: &Path) -> anyhow::Result<()> {
    let mut transcript = std::fs::File::create(transcript_path)
        .with_context(|| format!("Failed to create {}", transcript_path.display()))?;
    let mut lines: Vec<String> = Vec::new();

    // Save-data import fails once and is retried; the migration archive keeps failing and
    // is skipped.
    let backend = Arc::new(
        SimulatedBackend::with_defaults()
            .with_preserved(2)
            .with_archive_password("crewmate")
            .fail_times(
                SimulatedOp::ImportSaveData,
                1,
                BackendError::new("SaveData is locked by another process"),
            )
            .fail_times(
                SimulatedOp::ImportMigrationArchive,
                u32::MAX,
                BackendError::new("Archive entry profile/options.json is corrupted"),
            ),
    );
    let confirm = Arc::new(ScriptedConfirm::new([true], false));
    let hub = EventHub::new();
    let wizard = SetupWizard::new(backend, confirm.clone(), hub.clone(), config);

    lines.push(format!("=== Setup Smoke ({}) ===", chrono::Utc::now()));

    wizard.start().await;
    for _ in 0..3 {
        let step = wizard.next().await?;
        lines.push(format!("step -> {}", step));
    }
    wizard.set_import_enabled(true).await?;
    wizard.set_import_source("/old/Among Us").await?;
    wizard.set_migration_enabled(true).await;
    wizard.set_archive_path("/backups/launcher.snrdata").await?;
    wizard.set_archive_password("crewmate").await;
    let restore = wizard.set_restore_preserved(true).await;
    lines.push(format!("restore_preserved={}", restore));

    let step = wizard.next().await?;
    lines.push(format!("step -> {}", step));

    let mut subscription = hub.subscribe();
    let result = wizard.confirm_install().await?;
    while let Some(event) = subscription.try_recv() {
        if let BackendEvent::InstallProgress(progress) = event {
            lines.push(format!(
                "progress [{}] {:.0}% {}",
                progress.stage,
                progress.progress,
                format_detail(&progress)
            ));
        }
    }
    subscription.dispose();

    let session = wizard.snapshot().await;
    for prompt in confirm.prompts() {
        lines.push(format!("prompt: {}", prompt.replace('\n', " ")));
    }
    for report in &session.stage_reports {
        lines.push(format!(
            "stage {} {:?} attempts={}{}",
            report.stage,
            report.status,
            report.attempts,
            report
                .reason
                .as_deref()
                .map(|r| format!(" reason={}", r))
                .unwrap_or_default()
        ));
    }
    lines.push(format!("skip_reason={}", session.skip_reason));
    lines.push(format!(
        "result tag={} platform={} restored={}",
        result.tag,
        result.platform.as_str(),
        result.restored_save_files
    ));
    lines.push(format!(
        "final step={} progress={:.0}",
        session.step, session.progress_percent
    ));

    for line in &lines {
        writeln!(transcript, "{}", line)?;
        println!("{}", line);
    }

    anyhow::ensure!(
        session.step == WizardStep::Complete,
        "wizard ended on '{}'",
        session.step
    );
    anyhow::ensure!(
        !session.skip_reason.is_empty(),
        "expected the migration stage to be skipped"
    );
    anyhow::ensure!(
        hub.active_subscriptions() == 0,
        "event subscription leaked"
    );
    wizard.finish().await?;
    info!("[PHASE: smoke] [STEP: setup] Setup smoke completed");
    Ok(())
}

/// Print the derived control state for a launcher snapshot as JSON.
///
/// Reads the snapshot from `snapshot_path` when given, otherwise uses a built-in sample.
pub fn run_controls_smoke(snapshot_path: Option<String>) {
    let result = controls_smoke(snapshot_path.as_deref().map(Path::new));
    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Controls smoke failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn controls_smoke(snapshot_path: Option<&Path>) -> anyhow::Result<String> {
    let snapshot = match snapshot_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<LauncherSnapshot>(&raw)
                .with_context(|| format!("Invalid launcher snapshot in {}", path.display()))?
        }
        None => sample_snapshot(),
    };
    let controls = wizard::controls::compute(&snapshot);
    Ok(serde_json::to_string_pretty(&controls)?)
}

fn sample_snapshot() -> LauncherSnapshot {
    LauncherSnapshot {
        settings: Some(LauncherSettings {
            among_us_path: "/games/Among Us".to_string(),
            game_platform: GamePlatform::Steam,
            selected_release_tag: "v6.0.0".to_string(),
            profile_path: "/data/launcher/profile".to_string(),
            close_to_tray_on_close: true,
            ..LauncherSettings::default()
        }),
        profile_ready: true,
        wizard: InstallSession {
            step: WizardStep::Import,
            platform: Some(GamePlatform::Steam),
            install_path: "/games/Among Us".to_string(),
            selected_release: Some("v6.0.0".to_string()),
            ..InstallSession::default()
        },
        ..LauncherSnapshot::default()
    }
}

/// Print the effective configuration as TOML.
pub fn run_print_config() {
    let rendered = WizardConfig::load()
        .map_err(anyhow::Error::from)
        .and_then(|config| Ok(config.to_toml()?));
    match rendered {
        Ok(toml) => print!("{}", toml),
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    }
}
