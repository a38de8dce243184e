//! Busy-state reporting while a turn runs.
//!
//! Use `NoopProgress` for servers and `IndicatifProgress` for a TTY.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Minimal progress interface used inside a chat turn.
pub trait Progress: Send + Sync {
    /// Advance by one step and show a short message.
    fn step(&self, _msg: &str) {}
    /// Replace current message without advancing.
    fn message(&self, _msg: &str) {}
    /// Finish the UI.
    fn finish(&self, _msg: &str) {}
}

/// No-op reporter for servers/headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

/// Indicatif spinner, cleared when the turn ends.
pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    /// Spinner (unknown total).
    pub fn spinner() -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("-\\|/ ");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { pb }
    }
}

impl Progress for IndicatifProgress {
    fn step(&self, msg: &str) {
        self.pb.inc(1);
        self.pb.set_message(msg.to_string());
    }
    fn message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }
    fn finish(&self, _msg: &str) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Progress for Recorder {
        fn step(&self, msg: &str) {
            if let Ok(mut v) = self.0.lock() {
                v.push(msg.to_string());
            }
        }
    }

    #[test]
    fn default_methods_are_noops() {
        let p = NoopProgress;
        p.step("a");
        p.message("b");
        p.finish("c");
    }

    #[test]
    fn overridden_methods_are_called_through_dyn() {
        let r = Recorder::default();
        let p: &dyn Progress = &r;
        p.step("one");
        p.message("ignored");
        p.step("two");
        assert_eq!(*r.0.lock().unwrap(), ["one", "two"]);
    }
}
