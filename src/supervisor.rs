//! Runs one monitor per configured flag and shuts them all down together.
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::logging::EventLog;
use crate::monitor::Monitor;

pub struct Supervisor {
    monitors: Vec<Monitor>,
    log: Arc<dyn EventLog>,
}

impl Supervisor {
    /// Builds and starts a monitor for every flag. A monitor that fails to
    /// start is reported and left idle; the others still run.
    pub fn launch(config: Config, log: Arc<dyn EventLog>) -> Self {
        let api = Arc::new(config.api);
        let mut monitors = Vec::with_capacity(config.flags.len());

        for flag in config.flags {
            let mut monitor = Monitor::new(flag, Arc::clone(&api), Arc::clone(&log));
            match monitor.start() {
                Ok(()) => log.info(&monitor.flag().path, "Monitor started."),
                Err(e) => log.warn(
                    &monitor.flag().path,
                    &format!("failed to start monitor: {e}"),
                ),
            }
            monitors.push(monitor);
        }

        let supervisor = Self { monitors, log };
        if supervisor.running() == 0 {
            supervisor
                .log
                .critical("No monitor is running; no awards will be submitted.");
        }
        supervisor
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn running(&self) -> usize {
        self.monitors.iter().filter(|m| m.is_running()).count()
    }

    /// Closes every running monitor and returns how many were closed.
    pub fn shutdown(&mut self) -> usize {
        let mut closed = 0;
        for monitor in self.monitors.iter_mut().filter(|m| m.is_running()) {
            match monitor.close() {
                Ok(()) => closed += 1,
                Err(e) => self.log.warn(&monitor.flag().path, &e.to_string()),
            }
        }
        closed
    }

    /// Waits for `signal`, then shuts every monitor down.
    pub async fn run_until<F>(&mut self, signal: F) -> usize
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::{RecordingLog, Severity};

    fn config(base: &str, flags: usize) -> Config {
        let mut toml = format!("[api]\nurl = \"{base}\"\ntoken = \"t\"\n");
        for i in 0..flags {
            toml.push_str(&format!(
                "\n[[flags]]\ninterval = \"1h\"\npath = \"/flags/{i}\"\n\
                 [flags.award]\nname = \"hill {i}\"\ncategory = \"koth\"\n"
            ));
        }
        Config::from_toml_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn launches_and_shuts_down_every_flag() {
        let log = Arc::new(RecordingLog::default());
        let config = config("https://ctf.example.com/api/v1/", 3);
        let mut supervisor = Supervisor::launch(config, log.clone());

        assert_eq!(supervisor.monitors().len(), 3);
        assert_eq!(supervisor.running(), 3);
        assert_eq!(log.with_severity(Severity::Info).len(), 3);

        assert_eq!(supervisor.run_until(async {}).await, 3);
        assert_eq!(supervisor.running(), 0);
        assert_eq!(supervisor.shutdown(), 0);
        assert!(log.with_severity(Severity::Warn).is_empty());
    }

    #[tokio::test]
    async fn start_failures_are_reported_not_fatal() {
        let log = Arc::new(RecordingLog::default());
        let config = config("mailto:admin@example.com", 2);
        let mut supervisor = Supervisor::launch(config, log.clone());

        assert_eq!(supervisor.running(), 0);
        assert_eq!(log.with_severity(Severity::Warn).len(), 2);
        assert_eq!(log.with_severity(Severity::Critical).len(), 1);
        assert_eq!(supervisor.shutdown(), 0);
    }
}
