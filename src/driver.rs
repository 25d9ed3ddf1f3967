//! Async driver
//!
//! Runs an engine on a tokio task: a ticker fires the timed collectors and a command
//! channel carries host observations. Stamps come from the wall clock.

use crate::engine::ProctoringEngine;
use crate::error::ProctorError;
use crate::observation::{ClipboardOperation, KeyChord, Observation};
use crate::types::Disposition;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 100;

enum MonitorCommand {
    Ingest {
        observation: Observation,
        reply: Option<oneshot::Sender<Disposition>>,
    },
    Stop,
}

/// Handle to an engine running on a tokio task
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    task: JoinHandle<ProctoringEngine>,
}

/// Start the engine and drive it until [`MonitorHandle::stop`] is called or every
/// handle is dropped. `tick_period` bounds how late a timed collector may fire and
/// must be non-zero.
pub fn spawn_monitor(
    engine: ProctoringEngine,
    tick_period: Duration,
) -> Result<MonitorHandle, ProctorError> {
    if tick_period.is_zero() {
        return Err(ProctorError::InvalidConfig(
            "tick_period must be positive".to_string(),
        ));
    }
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(engine, tick_period, rx));
    Ok(MonitorHandle { commands, task })
}

async fn run(
    mut engine: ProctoringEngine,
    tick_period: Duration,
    mut commands: mpsc::Receiver<MonitorCommand>,
) -> ProctoringEngine {
    let mut ticker = tokio::time::interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    engine.start(Utc::now());
    info!(session_id = %engine.session_id(), ?tick_period, "monitor task running");

    loop {
        tokio::select! {
            _ = ticker.tick() => engine.tick(Utc::now()),
            command = commands.recv() => match command {
                Some(MonitorCommand::Ingest { observation, reply }) => {
                    let disposition = engine.ingest(Utc::now(), observation);
                    if let Some(reply) = reply {
                        // Caller may have given up waiting
                        let _ = reply.send(disposition);
                    }
                }
                Some(MonitorCommand::Stop) => break,
                None => {
                    debug!("all monitor handles dropped");
                    break;
                }
            },
        }
    }

    engine.stop();
    engine
}

impl MonitorHandle {
    /// Forward an observation without waiting for its classification
    pub async fn observe(&self, observation: Observation) -> Result<(), ProctorError> {
        self.commands
            .send(MonitorCommand::Ingest {
                observation,
                reply: None,
            })
            .await
            .map_err(|_| ProctorError::Stopped)
    }

    /// Forward an observation and wait for the native-event disposition
    pub async fn decide(&self, observation: Observation) -> Result<Disposition, ProctorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(MonitorCommand::Ingest {
                observation,
                reply: Some(reply),
            })
            .await
            .map_err(|_| ProctorError::Stopped)?;
        response.await.map_err(|_| ProctorError::Stopped)
    }

    pub async fn key_down(&self, chord: KeyChord) -> Result<Disposition, ProctorError> {
        self.decide(Observation::Key { chord }).await
    }

    pub async fn clipboard(
        &self,
        operation: ClipboardOperation,
    ) -> Result<Disposition, ProctorError> {
        self.decide(Observation::Clipboard { operation }).await
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop monitoring and hand the engine back for reporting
    pub async fn stop(self) -> Result<ProctoringEngine, ProctorError> {
        // Task may already have exited; the join below still yields the engine
        let _ = self.commands.send(MonitorCommand::Stop).await;
        self.task.await.map_err(|_| ProctorError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::AudioSource;
    use crate::config::ProctorConfig;
    use crate::sink::RecordingSink;
    use crate::types::IncidentType;

    struct LoudMic;

    impl AudioSource for LoudMic {
        fn start(&mut self, _fft_size: usize) -> Result<(), ProctorError> {
            Ok(())
        }

        fn frequency_data(&mut self) -> Result<Option<Vec<u8>>, ProctorError> {
            let mut bins = vec![5u8; 256];
            bins[12] = 250;
            Ok(Some(bins))
        }

        fn release(&mut self) {}
    }

    #[tokio::test]
    async fn test_observations_reach_engine() {
        let recorder = RecordingSink::new();
        let engine = ProctoringEngine::new(ProctorConfig::default(), recorder.clone()).unwrap();
        let handle = spawn_monitor(engine, Duration::from_millis(10)).unwrap();

        handle.observe(Observation::Visibility { hidden: true }).await.unwrap();
        // Outlast the visibility debounce so the return counts
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.observe(Observation::Visibility { hidden: false }).await.unwrap();
        let disposition = handle.key_down(KeyChord::new("c").with_ctrl()).await.unwrap();
        assert_eq!(disposition, Disposition::Prevent);

        let engine = handle.stop().await.unwrap();
        assert!(!engine.is_active());
        assert_eq!(engine.tab_switch_count(), 1);
        assert_eq!(engine.log().count_of(IncidentType::CopyPaste), 1);
        assert_eq!(recorder.violations().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_tick_period_rejected() {
        let engine = ProctoringEngine::new(ProctorConfig::default(), RecordingSink::new()).unwrap();

        let result = spawn_monitor(engine, Duration::ZERO);
        assert!(matches!(result, Err(ProctorError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_clipboard_disposition_round_trip() {
        let engine = ProctoringEngine::new(ProctorConfig::default(), RecordingSink::new()).unwrap();
        let handle = spawn_monitor(engine, Duration::from_millis(10)).unwrap();

        let disposition = handle.clipboard(ClipboardOperation::Copy).await.unwrap();
        assert_eq!(disposition, Disposition::PreventAndClearClipboard);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_ticker_drives_timed_collectors() {
        let config = ProctorConfig {
            audio_interval_ms: 1,
            ..ProctorConfig::default()
        };
        let recorder = RecordingSink::new();
        let engine = ProctoringEngine::builder(config)
            .sink(recorder.clone())
            .audio_source(LoudMic)
            .build()
            .unwrap();
        let handle = spawn_monitor(engine, Duration::from_millis(5)).unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        let engine = handle.stop().await.unwrap();

        // Ten-second dedup window keeps it to one
        assert_eq!(engine.log().count_of(IncidentType::AudioAnomaly), 1);
    }
}
