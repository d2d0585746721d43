use {
    indicatif::{ProgressBar, ProgressStyle},
    tracing::debug,
};

use crate::run::DispatchReport;

/// Observer for the send loop.
pub trait Progress {
    fn started(&mut self, total: usize);
    fn sent(&mut self, sent: usize, total: usize);
    fn failed(&mut self, recipient: &str, detail: &str);
    fn finished(&mut self, report: &DispatchReport);
}

/// `Sent: x/total` progress line with failure lines printed above it, then
/// the final counts on stdout.
#[derive(Default)]
pub struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for TerminalProgress {
    fn started(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        match ProgressStyle::with_template("Sent: {pos}/{len}") {
            Ok(style) => bar.set_style(style),
            Err(e) => debug!(error = %e, "invalid progress template"),
        }
        self.bar = Some(bar);
    }

    fn sent(&mut self, sent: usize, total: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total as u64);
            bar.set_position(sent as u64);
        }
    }

    fn failed(&mut self, recipient: &str, detail: &str) {
        let line = format!("Failed to send to {recipient}: {detail}");
        match self.bar {
            Some(ref bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn finished(&mut self, report: &DispatchReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        println!("Done. Sent: {}, Failed: {}", report.sent, report.failed);
    }
}
