// Install progress aggregation
//
// Backend events arrive as {stage, progress, message, counters}. The displayed percentage
// only moves up within one run and stays at or below the ceiling until `finish`; the detail
// line is rebuilt from whichever counters the stage carries.

use crate::api::events::InstallProgressEvent;
use serde::Serialize;

pub const STAGE_RESOLVING: &str = "resolving";
pub const STAGE_DOWNLOADING: &str = "downloading";
pub const STAGE_EXTRACTING: &str = "extracting";
pub const STAGE_PATCHERS: &str = "patchers";
pub const STAGE_RESTORING: &str = "restoring";
pub const STAGE_COMPLETE: &str = "complete";
pub const STAGE_FAILED: &str = "failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub percent: f64,
    pub stage: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    ceiling: f64,
    percent: f64,
    stage: String,
    message: String,
}

impl ProgressAggregator {
    /// Aggregator whose bar never passes `ceiling` before `finish`.
    pub fn with_ceiling(ceiling: f64) -> Self {
        Self {
            ceiling: ceiling.clamp(0.0, 100.0),
            percent: 0.0,
            stage: String::new(),
            message: String::new(),
        }
    }

    pub fn apply(&mut self, event: &InstallProgressEvent) -> ProgressView {
        let incoming = if event.progress.is_finite() {
            event.progress.clamp(0.0, self.ceiling)
        } else {
            0.0
        };
        self.percent = self.percent.max(incoming);
        self.stage = event.stage.clone();
        self.message = format_detail(event);
        self.view()
    }

    /// Hold the bar at the ceiling and show `message` instead of counters.
    pub fn pin(&mut self, message: impl Into<String>) -> ProgressView {
        self.percent = self.percent.max(self.ceiling);
        self.message = message.into();
        self.view()
    }

    pub fn finish(&mut self, message: impl Into<String>) -> ProgressView {
        self.percent = 100.0;
        self.stage = STAGE_COMPLETE.to_string();
        self.message = message.into();
        self.view()
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            percent: self.percent,
            stage: self.stage.clone(),
            message: self.message.clone(),
        }
    }
}

/// Detail line for one event.
pub fn format_detail(event: &InstallProgressEvent) -> String {
    match event.stage.as_str() {
        STAGE_DOWNLOADING => match (event.downloaded, event.total) {
            (Some(downloaded), Some(total)) if total > 0 => {
                let percent = (downloaded.min(total) as f64 / total as f64) * 100.0;
                format!("{} {:.0}%", event.message, percent)
            }
            (Some(downloaded), _) => format!("{} {}", event.message, format_bytes(downloaded)),
            _ => event.message.clone(),
        },
        STAGE_EXTRACTING => match (event.current, event.entries_total) {
            (Some(current), Some(total)) if total > 0 => {
                format!("{} {}/{}", event.message, current, total)
            }
            _ => event.message.clone(),
        },
        _ => event.message.clone(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(downloaded: u64, total: Option<u64>) -> InstallProgressEvent {
        let percent = total
            .map(|t| downloaded as f64 / t as f64 * 100.0)
            .unwrap_or(0.0);
        InstallProgressEvent::new(STAGE_DOWNLOADING, percent, "Downloading SNR package...")
            .with_bytes(downloaded, total)
    }

    #[test]
    fn late_out_of_order_event_never_lowers_percent() {
        let mut agg = ProgressAggregator::with_ceiling(100.0);
        let seen: Vec<f64> = [download(0, Some(100)), download(50, Some(100)), download(30, Some(100))]
            .iter()
            .map(|e| agg.apply(e).percent)
            .collect();
        assert_eq!(seen, vec![0.0, 50.0, 50.0]);
    }

    #[test]
    fn download_detail_uses_bytes() {
        let with_total = format_detail(&download(50, Some(200)));
        assert_eq!(with_total, "Downloading SNR package... 25%");

        let without_total = format_detail(&download(2048, None));
        assert_eq!(without_total, "Downloading SNR package... 2.0 KiB");
    }

    #[test]
    fn extract_detail_shows_entry_counts() {
        let event = InstallProgressEvent::new(STAGE_EXTRACTING, 85.0, "Extracting package...")
            .with_entries(12, Some(40));
        assert_eq!(format_detail(&event), "Extracting package... 12/40");

        let unknown = InstallProgressEvent::new(STAGE_EXTRACTING, 85.0, "Extracting package...")
            .with_entries(0, None);
        assert_eq!(format_detail(&unknown), "Extracting package...");
    }

    #[test]
    fn other_stages_show_message_verbatim() {
        let event = InstallProgressEvent::new(
            STAGE_PATCHERS,
            98.5,
            "Skipping patchers synchronization: timeout",
        );
        assert_eq!(format_detail(&event), "Skipping patchers synchronization: timeout");
    }

    #[test]
    fn failed_stage_keeps_bar_and_message() {
        let mut agg = ProgressAggregator::with_ceiling(100.0);
        agg.apply(&download(80, Some(100)));
        let view = agg.apply(&InstallProgressEvent::new(STAGE_FAILED, 0.0, "Network error"));
        assert_eq!(view.percent, 80.0);
        assert_eq!(view.message, "Network error");
    }

    #[test]
    fn base_install_completion_stops_at_ceiling_until_finish() {
        let mut agg = ProgressAggregator::with_ceiling(99.0);
        let view = agg.apply(&InstallProgressEvent::new(
            STAGE_COMPLETE,
            100.0,
            "Installation complete",
        ));
        assert_eq!(view.percent, 99.0);

        let pinned = agg.pin("Save data import...");
        assert_eq!(pinned.percent, 99.0);
        assert_eq!(pinned.message, "Save data import...");

        let done = agg.finish("Installation complete");
        assert_eq!(done.percent, 100.0);
        assert_eq!(done.stage, STAGE_COMPLETE);
    }
}
