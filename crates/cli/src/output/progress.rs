//! Transfer progress display
//!
//! The bar is drawn on standard error and only when it is a terminal, so
//! piped output and scripts never see control sequences.

use gscp_core::TransferObserver;

use super::OutputConfig;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {bytes} ({bytes_per_sec})";

/// Progress bar wrapper
///
/// Created hidden when progress is suppressed; every method is then a no-op.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a progress bar for one transfer
    ///
    /// `enabled` is false when the transfer writes to standard output or the
    /// configuration turns progress off.
    pub fn for_transfer(config: &OutputConfig, enabled: bool) -> Self {
        let is_term = console::Term::stderr().is_term();
        Self::build(should_display(config, enabled, is_term))
    }

    fn build(visible: bool) -> Self {
        let bar = visible.then(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner().template(SPINNER_TEMPLATE)
            {
                bar.set_style(style);
            }
            bar
        });

        Self { bar }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

fn should_display(config: &OutputConfig, enabled: bool, is_term: bool) -> bool {
    enabled && is_term && !(config.quiet || config.json || config.no_progress)
}

impl TransferObserver for ProgressBar {
    fn started(&self, total: Option<u64>) {
        let (Some(bar), Some(total)) = (&self.bar, total) else {
            return;
        };

        bar.set_length(total);
        if let Ok(style) = indicatif::ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
    }

    fn advanced(&self, bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
        }
    }

    fn finished(&self) {
        self.finish_and_clear();
    }
}
