//! Playback Driver
//!
//! Tokio task that owns a [`PlaybackScheduler`] and turns it into timed
//! frames for the editor-surface collaborator.
//!
//! # Design Philosophy
//!
//! The driver is the only source of timed continuation in the core. Each step
//! is a discrete unit: a snapshot is sent, then a single deadline is armed.
//! Commands arriving in between (retarget, stop) clear that deadline and
//! replace the queue; an in-flight step is never mutated.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::plan::PlaybackTiming;
use super::scheduler::PlaybackScheduler;

/// Command channel depth
const COMMAND_BUFFER: usize = 64;

/// Instructions for a running driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Animate toward new content from whatever is displayed now
    Retarget(String),
    /// Content was replaced outside playback; adopt it without animating
    Replace(String),
    /// Stop playback, optionally applying the target at once
    Stop {
        /// Apply the target immediately instead of leaving the partial buffer
        flush: bool,
    },
    /// End the driver task
    Shutdown,
}

/// One buffer state for the editor surface to display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackFrame {
    /// Content to display
    pub content: String,
    /// Snapshots still queued; zero once playback has converged or stopped
    pub remaining: usize,
}

/// Cloneable handle for sending commands to a driver
#[derive(Clone, Debug)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<PlaybackCommand>,
}

impl PlaybackHandle {
    /// Send a command; returns `false` if the driver has stopped
    pub async fn send(&self, command: PlaybackCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Animate toward `target`
    pub async fn retarget(&self, target: impl Into<String>) -> bool {
        self.send(PlaybackCommand::Retarget(target.into())).await
    }

    /// Adopt externally replaced content
    pub async fn replace(&self, content: impl Into<String>) -> bool {
        self.send(PlaybackCommand::Replace(content.into())).await
    }

    /// Stop playback
    pub async fn stop(&self, flush: bool) -> bool {
        self.send(PlaybackCommand::Stop { flush }).await
    }
}

/// Running playback task
#[derive(Debug)]
pub struct PlaybackDriver {
    handle: PlaybackHandle,
    task: JoinHandle<()>,
}

impl PlaybackDriver {
    /// Spawn a driver showing `initial`, emitting frames on `frames`
    ///
    /// The task ends on [`PlaybackCommand::Shutdown`], when every handle is
    /// dropped, or when the frame receiver goes away.
    pub fn spawn(
        initial: impl Into<String>,
        timing: PlaybackTiming,
        frames: mpsc::Sender<PlaybackFrame>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let scheduler = PlaybackScheduler::new(initial, timing);
        let task = tokio::spawn(run(scheduler, rx, frames));
        Self {
            handle: PlaybackHandle { commands: tx },
            task,
        }
    }

    /// Handle for sending commands
    #[must_use]
    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        self.handle.send(PlaybackCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "playback task ended abnormally");
        }
    }
}

async fn run(
    mut scheduler: PlaybackScheduler,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    frames: mpsc::Sender<PlaybackFrame>,
) {
    let mut rng = StdRng::from_entropy();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    None | Some(PlaybackCommand::Shutdown) => break,
                    Some(PlaybackCommand::Retarget(target)) => {
                        let queued = scheduler.retarget(target);
                        tracing::debug!(queued, "playback retargeted");
                        deadline = (queued > 0).then(Instant::now);
                    }
                    Some(PlaybackCommand::Replace(content)) => {
                        scheduler.replace(content);
                        deadline = None;
                    }
                    Some(PlaybackCommand::Stop { flush }) => {
                        deadline = None;
                        if let Some(content) = scheduler.stop(flush) {
                            if frames.send(PlaybackFrame { content, remaining: 0 }).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let Some(step) = scheduler.next_step(&mut rng) else {
                    continue;
                };
                let frame = PlaybackFrame {
                    content: step.snapshot,
                    remaining: step.remaining,
                };
                if frames.send(frame).await.is_err() {
                    break;
                }
                if step.remaining > 0 {
                    deadline = Some(Instant::now() + step.delay);
                }
            }
        }
    }

    tracing::debug!(displayed_len = scheduler.displayed().len(), "playback driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn slow_timing() -> PlaybackTiming {
        PlaybackTiming {
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            delete_chunk_min: 1,
            delete_chunk_steps: 4,
            append_chunk_min: 1,
            append_chunk_steps: 4,
        }
    }

    async fn collect_until_settled(rx: &mut mpsc::Receiver<PlaybackFrame>) -> Vec<PlaybackFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            let done = frame.remaining == 0;
            frames.push(frame);
            if done {
                break;
            }
        }
        frames
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_target() {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = PlaybackDriver::spawn("abcXYZ", PlaybackTiming::default(), tx);
        assert!(driver.handle().retarget("abcQZ").await);

        let frames = collect_until_settled(&mut rx).await;
        let contents: Vec<&str> = frames.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["abc", "abcQZ"]);

        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_snapshot_is_immediate_then_paced() {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = PlaybackDriver::spawn("", slow_timing(), tx);
        let start = Instant::now();
        driver.handle().retarget("abcdefgh").await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.content, "ab");
        assert_eq!(Instant::now() - start, Duration::ZERO);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.content, "abcd");
        assert_eq!(Instant::now() - start, Duration::from_millis(10));

        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retarget_mid_playback() {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = PlaybackDriver::spawn("", slow_timing(), tx);
        let handle = driver.handle();

        handle.retarget("abcdefgh").await;
        assert_eq!(rx.recv().await.unwrap().content, "ab");

        handle.retarget("abZZ").await;
        let frames = collect_until_settled(&mut rx).await;
        let contents: Vec<&str> = frames.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["abZ", "abZZ"]);

        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_with_flush_emits_target() {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = PlaybackDriver::spawn("", slow_timing(), tx);
        let handle = driver.handle();

        handle.retarget("abcdefgh").await;
        assert_eq!(rx.recv().await.unwrap().content, "ab");
        handle.stop(true).await;

        let flushed = rx.recv().await.unwrap();
        assert_eq!(
            flushed,
            PlaybackFrame {
                content: "abcdefgh".into(),
                remaining: 0
            }
        );

        driver.shutdown().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_flush_goes_quiet() {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = PlaybackDriver::spawn("", slow_timing(), tx);
        let handle = driver.handle();

        handle.retarget("abcdefgh").await;
        assert_eq!(rx.recv().await.unwrap().content, "ab");
        handle.stop(false).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        driver.shutdown().await;
    }

    #[tokio::test]
    async fn test_ends_when_handles_dropped() {
        let (tx, mut rx) = mpsc::channel(16);
        let PlaybackDriver { handle, task } = PlaybackDriver::spawn("x", slow_timing(), tx);
        drop(handle);
        task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
