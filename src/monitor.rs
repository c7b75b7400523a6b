//! Per-flag monitoring task: read the flag file every interval and submit an
//! award for whoever holds it.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::identifier::extract_identifier;
use crate::logging::EventLog;
use crate::model::{ApiConfig, Flag};
use crate::submitter::{AwardSink, AwardSubmitter, SubmitError};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitoring agent already started")]
    AlreadyStarted,
    #[error("monitoring agent needs to be started before a shut-down can be requested")]
    NotRunning,
    #[error("unable to resolve awards endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("flag interval {0:?} cannot be scheduled")]
    InvalidInterval(Duration),
    #[error(transparent)]
    Submitter(#[from] SubmitError),
}

/// Lifecycle of a monitor. `Stopped` is terminal.
#[derive(Debug)]
pub enum MonitorState {
    Idle,
    Running {
        handle: JoinHandle<()>,
        shutdown_tx: oneshot::Sender<()>,
    },
    Stopped,
}

pub struct Monitor {
    flag: Arc<Flag>,
    api: Arc<ApiConfig>,
    log: Arc<dyn EventLog>,
    state: MonitorState,
}

impl Monitor {
    pub fn new(flag: Flag, api: Arc<ApiConfig>, log: Arc<dyn EventLog>) -> Self {
        Self {
            flag: Arc::new(flag),
            api,
            log,
            state: MonitorState::Idle,
        }
    }

    pub fn flag(&self) -> &Flag {
        &self.flag
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, MonitorState::Running { .. })
    }

    /// Spawns the monitoring task and returns without waiting for a tick.
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        self.ensure_idle()?;
        let endpoint = self.api.awards_endpoint()?;
        let submitter = AwardSubmitter::new(&self.api.credentials, endpoint, Utc::now())?;
        self.launch(Arc::new(submitter))
    }

    fn ensure_idle(&self) -> Result<(), MonitorError> {
        match self.state {
            MonitorState::Idle => Ok(()),
            _ => Err(MonitorError::AlreadyStarted),
        }
    }

    fn launch(&mut self, sink: Arc<dyn AwardSink>) -> Result<(), MonitorError> {
        self.ensure_idle()?;
        let interval = self.flag.interval;
        // First tick one full interval after start, like a ticker.
        let first_tick = Instant::now()
            .checked_add(interval)
            .filter(|_| !interval.is_zero())
            .ok_or(MonitorError::InvalidInterval(interval))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_flag_loop(
            Arc::clone(&self.flag),
            first_tick,
            sink,
            Arc::clone(&self.log),
            shutdown_rx,
        ));
        self.state = MonitorState::Running {
            handle,
            shutdown_tx,
        };
        Ok(())
    }

    /// Signals the task to stop at its next wait point. A submission already
    /// in flight is neither cancelled nor awaited.
    pub fn close(&mut self) -> Result<(), MonitorError> {
        match std::mem::replace(&mut self.state, MonitorState::Stopped) {
            MonitorState::Running { shutdown_tx, .. } => {
                if shutdown_tx.send(()).is_err() {
                    self.log.warn(
                        &self.flag.path,
                        "Monitor task had already finished before the shutdown signal.",
                    );
                }
                Ok(())
            }
            previous => {
                self.state = previous;
                Err(MonitorError::NotRunning)
            }
        }
    }
}

async fn run_flag_loop(
    flag: Arc<Flag>,
    first_tick: Instant,
    sink: Arc<dyn AwardSink>,
    log: Arc<dyn EventLog>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(first_tick, flag.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => tick(&flag, sink.as_ref(), log.as_ref()).await,
        }
    }
}

/// One read-parse-submit cycle. Every failure ends the cycle with a warning.
async fn tick(flag: &Flag, sink: &dyn AwardSink, log: &dyn EventLog) {
    let contents = match tokio::fs::read(&flag.path).await {
        Ok(contents) => contents,
        Err(e) => {
            log.warn(&flag.path, &format!("failed to read flag file: {e}"));
            return;
        }
    };

    let user = match extract_identifier(&contents) {
        Ok(user) => user,
        Err(e) => {
            log.warn(&flag.path, &e.to_string());
            return;
        }
    };

    let award = flag.award.award_for(user);
    match sink.submit(&award).await {
        Ok(receipt) => log.info(
            &flag.path,
            &format!("award for user {user} answered {}: {}", receipt.status, receipt.body),
        ),
        Err(e) => log.warn(&flag.path, &e.to_string()),
    }
}
