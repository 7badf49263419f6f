//! Console output: spam alerts and startup/shutdown notices.
//!
//! Log records go through `tracing`; this module is for the operator-facing
//! console surface that should stay readable regardless of log filtering.

use crate::classify::Verdict;
use std::sync::Mutex;

const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Where spam alerts go. The console in production, a collector in tests.
pub trait AlertSink: Send + Sync {
    fn spam_alert(&self, verdict: &Verdict);
}

/// Prints a prominent alert block to the console.
#[derive(Debug, Default)]
pub struct ConsoleAlert;

impl AlertSink for ConsoleAlert {
    fn spam_alert(&self, verdict: &Verdict) {
        let rule = "=".repeat(60);
        println!();
        println!("{RED}{BOLD}{rule}{RESET}");
        println!("{RED}{BOLD}SPAM DETECTED!{RESET}");
        println!("Text: {}", verdict.text);
        println!("Confidence: {:.4}", verdict.confidence);
        println!("{RED}{BOLD}{rule}{RESET}");
        println!();
    }
}

/// Records alerted texts instead of printing. Test double.
#[derive(Debug, Default)]
pub struct CollectorAlert {
    alerts: Mutex<Vec<String>>,
}

impl CollectorAlert {
    /// Number of alerts fired so far.
    pub fn count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Texts of all fired alerts, in order.
    pub fn texts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl AlertSink for CollectorAlert {
    fn spam_alert(&self, verdict: &Verdict) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(verdict.text.clone());
        }
    }
}

/// Printed once after the pipeline starts.
pub fn print_startup_banner() {
    println!("{BOLD}Real-time spam detection running.{RESET}");
    println!("Speak into the microphone; press Ctrl+C to stop.");
}

/// Printed once after a clean shutdown.
pub fn print_shutdown_notice() {
    println!("Stopped.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::VerdictLabel;

    #[test]
    fn test_collector_records_alert_texts_in_order() {
        let collector = CollectorAlert::default();
        collector.spam_alert(&Verdict::new("one".to_string(), VerdictLabel::Spam, 0.9));
        collector.spam_alert(&Verdict::new("two".to_string(), VerdictLabel::Spam, 0.8));

        assert_eq!(collector.count(), 2);
        assert_eq!(collector.texts(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_console_alert_does_not_panic() {
        ConsoleAlert.spam_alert(&Verdict::new(
            "free prize".to_string(),
            VerdictLabel::Spam,
            0.99,
        ));
    }
}
