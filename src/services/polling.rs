//! Timer-driven polling.
//!
//! `PollingService::start` spawns one task that owns the `CycleRunner`. The
//! task runs a cycle immediately, then on every interval tick or `trigger`.
//! Since every cycle runs inside that task, a slow cycle delays the next
//! tick instead of overlapping with it.
//!
//! With `follow_stored_interval` the loop re-reads the stored settings after
//! each cycle and reschedules when the interval there has changed.

use crate::error::AppError;
use crate::models::settings::polling_interval_from_minutes;
use crate::services::cycle::CycleRunner;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Commands accepted by the polling loop.
#[derive(Debug)]
enum PollCommand {
    /// Run a cycle now.
    Trigger,

    /// Restart the timer with a new period.
    SetInterval(Duration),

    /// Leave the loop.
    Stop,
}

/// Background polling loop around a `CycleRunner`.
pub struct PollingService {
    runner: CycleRunner,
    interval: Duration,
    follow_stored: bool,
    command_tx: Option<mpsc::Sender<PollCommand>>,
    task: Option<JoinHandle<()>>,
}

impl PollingService {
    pub fn new(runner: CycleRunner, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            follow_stored: false,
            command_tx: None,
            task: None,
        }
    }

    /// Take the period from the stored settings after every cycle.
    pub fn follow_stored_interval(mut self) -> Self {
        self.follow_stored = true;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn the polling task.
    pub fn start(&mut self) -> Result<(), AppError> {
        if self.is_running() {
            return Err(AppError::internal("Polling is already running"));
        }
        check_interval(self.interval)?;

        let (tx, mut rx) = mpsc::channel::<PollCommand>(16);
        let runner = self.runner.clone();
        let follow_stored = self.follow_stored;
        let mut period = self.interval;

        let task = tokio::spawn(async move {
            log::info!("Polling every {}s", period.as_secs());
            run_logged(&runner, "Initial").await;

            let mut ticker = new_ticker(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_logged(&runner, "Periodic").await;
                    }
                    cmd = rx.recv() => {
                        match cmd {
                            Some(PollCommand::Trigger) => {
                                log::debug!("Manual cycle triggered");
                                run_logged(&runner, "Manual").await;
                            }
                            Some(PollCommand::SetInterval(new_period)) => {
                                log::info!("Polling interval changed to {}s", new_period.as_secs());
                                period = new_period;
                                ticker = new_ticker(new_period);
                                continue;
                            }
                            Some(PollCommand::Stop) | None => break,
                        }
                    }
                }

                if follow_stored {
                    if let Some(stored) = stored_interval(&runner).await {
                        if stored != period {
                            log::info!("Stored polling interval is now {}s", stored.as_secs());
                            period = stored;
                            ticker = new_ticker(stored);
                        }
                    }
                }
            }
            log::info!("Polling stopped");
        });

        self.command_tx = Some(tx);
        self.task = Some(task);
        Ok(())
    }

    /// Ask the loop to run a cycle as soon as the current one (if any) ends.
    pub async fn trigger(&self) -> Result<(), AppError> {
        self.send(PollCommand::Trigger).await
    }

    /// Change the period. Takes effect from now when running.
    pub async fn set_interval(&mut self, interval: Duration) -> Result<(), AppError> {
        check_interval(interval)?;
        self.interval = interval;
        if self.is_running() {
            self.send(PollCommand::SetInterval(interval)).await?;
        }
        Ok(())
    }

    /// Stop the loop and wait for the in-flight cycle to finish.
    pub async fn stop(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.command_tx.take() {
            // The loop may already be gone; joining below is what matters.
            let _ = tx.send(PollCommand::Stop).await;
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| AppError::internal(format!("Polling task failed: {}", e)))?;
        }
        Ok(())
    }

    async fn send(&self, cmd: PollCommand) -> Result<(), AppError> {
        let tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| AppError::internal("Polling is not running"))?;
        tx.send(cmd)
            .await
            .map_err(|_| AppError::internal("Polling is not running"))
    }
}

fn check_interval(interval: Duration) -> Result<(), AppError> {
    if interval.is_zero() {
        return Err(AppError::invalid_input_field(
            "Polling interval must be positive",
            "interval",
        ));
    }
    Ok(())
}

/// Ticker whose first tick is one full period away.
fn new_ticker(period: Duration) -> time::Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// The interval in the stored settings, if there is a usable one.
async fn stored_interval(runner: &CycleRunner) -> Option<Duration> {
    match runner.store().load_settings().await {
        Ok(Some(settings)) => polling_interval_from_minutes(settings.polling_interval_minutes).ok(),
        Ok(None) => None,
        Err(e) => {
            log::warn!("Could not re-read settings: {}", e);
            None
        }
    }
}

async fn run_logged(runner: &CycleRunner, kind: &str) {
    match runner.run_cycle().await {
        Ok(outcome) => log::debug!("{} cycle: {} new item(s)", kind, outcome.new_total()),
        Err(e) => log::warn!("{} cycle error: {}", kind, e),
    }
}
