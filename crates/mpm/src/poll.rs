//! Interval timer driving scheduled polls.
//!
//! The timer only emits [`Event::PollTick`]; whether a tick turns into a
//! request is decided by the engine's scheduler on the main loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::input::Event;

/// Commands accepted by the timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Stop,
}

/// Handle to a running timer task.
#[derive(Debug, Clone)]
pub struct PollTimer {
    command_tx: mpsc::UnboundedSender<TimerCommand>,
}

impl PollTimer {
    pub fn start(&self) {
        self.send(TimerCommand::Start);
    }

    pub fn stop(&self) {
        self.send(TimerCommand::Stop);
    }

    fn send(&self, command: TimerCommand) {
        if self.command_tx.send(command).is_err() {
            debug!(?command, "Poll timer task has exited");
        }
    }
}

/// Spawns the timer task, initially stopped.
///
/// After `Start` the first tick arrives one full `period` later; the
/// immediate poll on resume is issued by the caller.
pub fn spawn_poll_timer(
    period: Duration,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> (PollTimer, JoinHandle<()>) {
    let (command_tx, mut command_rx) = mpsc::unbounded_channel::<TimerCommand>();

    let handle = tokio::spawn(async move {
        let mut ticker: Option<tokio::time::Interval> = None;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Poll timer shutting down");
                    break;
                }
                command = command_rx.recv() => match command {
                    Some(TimerCommand::Start) => {
                        if ticker.is_none() {
                            let mut interval = interval_at(Instant::now() + period, period);
                            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            ticker = Some(interval);
                        }
                    }
                    Some(TimerCommand::Stop) => ticker = None,
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    if event_tx.send(Event::PollTick).is_err() {
                        debug!("Event channel closed, poll timer exiting");
                        break;
                    }
                }
            }
        }
    });

    (PollTimer { command_tx }, handle)
}

async fn next_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
