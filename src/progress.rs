//! # Progress Rendering and Summary Module
//!
//! Questo modulo gestisce la resa a terminale del progresso di una conversione.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` alimentata dal `ProgressFeed`
//! - Riepilogo finale (dimensioni input/output, durata, rapporto)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:07] [========================>---------------] 61% clip.mov
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new("clip.mov");
//! progress.set_percent(42.0);
//! progress.finish(&summary.format_summary());
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress bar for a single conversion
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a percentage bar labelled with the input name
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Move the bar to an estimated percentage
    pub fn set_percent(&self, percent: f64) {
        self.bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    /// Complete the bar with a final message
    pub fn finish(&self, message: &str) {
        self.bar.set_position(100);
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop the bar where it is (cancellation, failure)
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Final report for a successful conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    pub input_size: u64,
    pub output_size: u64,
    pub duration: Duration,
}

impl ConversionSummary {
    /// Output size relative to input, in percent
    pub fn size_ratio_percent(&self) -> f64 {
        if self.input_size > 0 {
            (self.output_size as f64 / self.input_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Converted in {:.1}s | Input: {} | GIF: {} ({:.1}% of input)",
            self.duration.as_secs_f64(),
            FileManager::format_size(self.input_size),
            FileManager::format_size(self.output_size),
            self.size_ratio_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_percent_is_clamped() {
        let progress = ProgressManager::new("clip.mov");
        progress.set_percent(42.4);
        assert_eq!(progress.position(), 42);
        progress.set_percent(250.0);
        assert_eq!(progress.position(), 100);
        progress.set_percent(-3.0);
        assert_eq!(progress.position(), 0);
        progress.abandon("cancelled");
    }

    #[test]
    fn test_summary() {
        let summary = ConversionSummary {
            input_size: 5 * 1024 * 1024,
            output_size: 1024 * 1024,
            duration: Duration::from_millis(6_500),
        };
        assert_eq!(summary.size_ratio_percent(), 20.0);
        assert_eq!(
            summary.format_summary(),
            "Converted in 6.5s | Input: 5.00 MB | GIF: 1.00 MB (20.0% of input)"
        );
    }

    #[test]
    fn test_summary_empty_input() {
        let summary = ConversionSummary::default();
        assert_eq!(summary.size_ratio_percent(), 0.0);
    }
}
