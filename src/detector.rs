//! Detection worker loop.
//!
//! A dedicated thread drives the acquire/infer/decode cycle at a bounded
//! rate and hands results to the presenter over a bounded channel. The
//! worker never stalls on the consumer and never terminates itself over a
//! single failed cycle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::{Decoder, Detection, OutputView, Scale};
use crate::frame::Frame;
use crate::infer::InferenceBackend;
use crate::ingest::FrameSource;

/// One published detection batch: the frame it was decoded from plus every
/// detection that survived the threshold, in proposal order.
#[derive(Clone, Debug)]
pub struct DetectionEvent {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

/// Shared confidence threshold, written from any thread and read once per
/// cycle by the worker.
///
/// A single f32 with no cross-field consistency requirement, so it lives in
/// an `AtomicU32` bit pattern rather than behind a lock.
#[derive(Clone, Debug)]
pub struct ThresholdHandle {
    bits: Arc<AtomicU32>,
}

impl ThresholdHandle {
    pub fn new(value: f32) -> Self {
        let handle = Self {
            bits: Arc::new(AtomicU32::new(0)),
        };
        handle.set(value);
        handle
    }

    /// Update the threshold. Takes effect on the worker's next decode.
    /// Values outside `[0, 1]` are clamped.
    pub fn set(&self, value: f32) {
        let clamped = value.clamp(0.0, 1.0);
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Worker cadence settings.
#[derive(Clone, Copy, Debug)]
pub struct LoopConfig {
    /// Fixed sleep after each completed cycle (a floor, not a frame-rate
    /// governor). ~33 ms targets 30 Hz.
    pub cycle_interval: Duration,
    /// Bounded capacity of the worker-to-presenter channel.
    pub channel_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_millis(33),
            channel_capacity: 8,
        }
    }
}

/// Clonable stop signal for the worker, safe to fire from a signal handler.
#[derive(Clone, Debug)]
pub struct StopTrigger {
    shutdown: Arc<AtomicBool>,
}

impl StopTrigger {
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Handle to a running detection worker.
#[derive(Debug)]
pub struct DetectorHandle {
    events: Option<Receiver<DetectionEvent>>,
    threshold: ThresholdHandle,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    /// Take the event receiver. Yields `Some` exactly once.
    pub fn take_events(&mut self) -> Option<Receiver<DetectionEvent>> {
        self.events.take()
    }

    /// Clone the shared threshold handle.
    pub fn threshold(&self) -> ThresholdHandle {
        self.threshold.clone()
    }

    /// Detached stop signal for signal handlers. Firing it makes the worker
    /// exit at the next cycle boundary; `stop` still joins the thread.
    pub fn stop_trigger(&self) -> StopTrigger {
        StopTrigger {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Request shutdown and wait for the worker to exit. The wait is
    /// bounded by one in-flight inference plus the fixed cycle sleep.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("detection worker thread panicked"))?;
        }
        Ok(())
    }
}

/// Detection worker: acquire, infer, decode, publish.
pub struct DetectionLoop {
    source: Box<dyn FrameSource>,
    backend: Box<dyn InferenceBackend>,
    decoder: Decoder,
    config: LoopConfig,
}

impl DetectionLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        backend: Box<dyn InferenceBackend>,
        decoder: Decoder,
        config: LoopConfig,
    ) -> Self {
        Self {
            source,
            backend,
            decoder,
            config,
        }
    }

    /// Start the worker thread with the given initial threshold.
    pub fn spawn(self, initial_threshold: f32) -> DetectorHandle {
        let threshold = ThresholdHandle::new(initial_threshold);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = std::sync::mpsc::sync_channel(self.config.channel_capacity);

        let worker_threshold = threshold.clone();
        let worker_shutdown = shutdown.clone();
        let join = std::thread::spawn(move || {
            self.run(tx, worker_threshold, worker_shutdown);
        });

        DetectorHandle {
            events: Some(rx),
            threshold,
            shutdown,
            join: Some(join),
        }
    }

    fn run(
        mut self,
        tx: SyncSender<DetectionEvent>,
        threshold: ThresholdHandle,
        shutdown: Arc<AtomicBool>,
    ) {
        log::info!(
            "detection worker started: backend={} reference={}",
            self.backend.name(),
            self.backend.reference_size()
        );
        if let Err(err) = self.backend.warm_up() {
            log::warn!("backend warm-up failed: {err:#}");
        }

        let mut cycle = 0u64;
        while !shutdown.load(Ordering::SeqCst) {
            cycle += 1;
            match self.cycle(&tx, &threshold, cycle) {
                CycleOutcome::Completed => std::thread::sleep(self.config.cycle_interval),
                // Abandoned cycle: retry immediately, no backoff.
                CycleOutcome::Skipped => {}
                CycleOutcome::ConsumerGone => break,
            }
        }
        log::info!("detection worker stopped after {cycle} cycles");
    }

    fn cycle(
        &mut self,
        tx: &SyncSender<DetectionEvent>,
        threshold: &ThresholdHandle,
        cycle: u64,
    ) -> CycleOutcome {
        let frame = match self.source.try_next_frame() {
            Ok(Some(frame)) if !frame.is_empty() => frame,
            Ok(_) => {
                log::debug!("cycle {cycle}: no frame available");
                return CycleOutcome::Skipped;
            }
            Err(err) => {
                log::warn!("cycle {cycle}: frame acquisition failed: {err:#}");
                return CycleOutcome::Skipped;
            }
        };

        let scale = Scale::for_frame(frame.width, frame.height, self.backend.reference_size());

        // Failed inference is handled like a failed acquisition: the cycle
        // is abandoned and the next attempt starts right away.
        let raw = match self.backend.infer(&frame) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("cycle {cycle}: inference failed: {err:#}");
                return CycleOutcome::Skipped;
            }
        };

        // Shape is validated once here; the decoder itself has no error path.
        let view = match OutputView::new(&raw) {
            Ok(view) => view,
            Err(err) => {
                log::warn!("cycle {cycle}: malformed detection output: {err:#}");
                return CycleOutcome::Skipped;
            }
        };

        let detections =
            self.decoder
                .decode(&view, scale, frame.width, frame.height, threshold.get());
        log::debug!("cycle {cycle}: {} detections", detections.len());

        if detections.is_empty() {
            return CycleOutcome::Completed;
        }

        match tx.try_send(DetectionEvent { frame, detections }) {
            Ok(()) => CycleOutcome::Completed,
            Err(TrySendError::Full(_)) => {
                // Slow consumer: drop the batch rather than stall capture.
                log::debug!("cycle {cycle}: event channel full, batch dropped");
                CycleOutcome::Completed
            }
            Err(TrySendError::Disconnected(_)) => CycleOutcome::ConsumerGone,
        }
    }
}

enum CycleOutcome {
    /// Normal cycle end; the fixed sleep applies.
    Completed,
    /// Cycle abandoned (no frame, failed inference, malformed output);
    /// retry immediately without sleeping.
    Skipped,
    ConsumerGone,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infer::{RawOutput, StubBackend};
    use crate::ingest::{CameraConfig, SyntheticSource};

    fn test_loop(backend: StubBackend) -> DetectionLoop {
        let source = SyntheticSource::new(CameraConfig {
            url: "stub://test".to_string(),
            width: 64,
            height: 64,
        });
        let decoder = Decoder::new(vec!["person".to_string(), "bottle".to_string()]);
        let config = LoopConfig {
            cycle_interval: Duration::from_millis(1),
            channel_capacity: 8,
        };
        DetectionLoop::new(Box::new(source), Box::new(backend), decoder, config)
    }

    #[test]
    fn threshold_handle_clamps_and_round_trips() {
        let handle = ThresholdHandle::new(0.5);
        assert_eq!(handle.get(), 0.5);

        let writer = handle.clone();
        writer.set(0.72);
        assert_eq!(handle.get(), 0.72);

        writer.set(1.5);
        assert_eq!(handle.get(), 1.0);
        writer.set(-0.1);
        assert_eq!(handle.get(), 0.0);
    }

    #[test]
    fn worker_publishes_qualifying_batches() {
        let mut backend = StubBackend::new(64);
        // Single proposal, objectness 0.9, class index 1 ("bottle").
        backend
            .push_output(RawOutput::from_records(&[&[32.0, 32.0, 8.0, 8.0, 0.9, 0.1, 0.8]]).unwrap());

        let mut handle = test_loop(backend).spawn(0.5);
        let events = handle.take_events().expect("receiver");

        let event = events
            .recv_timeout(Duration::from_secs(2))
            .expect("published batch");
        assert_eq!(event.frame.width, 64);
        assert_eq!(event.detections.len(), 1);
        assert_eq!(event.detections[0].label, "bottle");

        handle.stop().expect("clean stop");
    }

    #[test]
    fn worker_skips_failed_and_quiet_cycles() {
        let mut backend = StubBackend::new(64);
        backend.push_failure("backend offline");
        backend.push_output(RawOutput {
            data: Vec::new(),
            proposals: 0,
            record_len: 0,
        });
        // After the script: quiet outputs, below any threshold.

        let mut handle = test_loop(backend).spawn(0.5);
        let events = handle.take_events().expect("receiver");

        // Failed, proposal-free, and below-threshold cycles publish nothing.
        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());

        handle.stop().expect("worker survived failed cycles");
    }

    #[test]
    fn failed_cycles_retry_without_sleeping() {
        let mut backend = StubBackend::new(64);
        for _ in 0..5 {
            backend.push_failure("transient backend error");
        }
        backend
            .push_output(RawOutput::from_records(&[&[32.0, 32.0, 8.0, 8.0, 0.9, 0.1, 0.8]]).unwrap());

        let source = SyntheticSource::new(CameraConfig {
            url: "stub://test".to_string(),
            width: 64,
            height: 64,
        });
        let decoder = Decoder::new(vec!["person".to_string(), "bottle".to_string()]);
        // Long fixed sleep: if failed cycles consumed it, the good batch
        // would not arrive before several intervals had elapsed.
        let config = LoopConfig {
            cycle_interval: Duration::from_millis(200),
            channel_capacity: 8,
        };
        let worker = DetectionLoop::new(Box::new(source), Box::new(backend), decoder, config);

        let started = std::time::Instant::now();
        let mut handle = worker.spawn(0.5);
        let events = handle.take_events().expect("receiver");

        let event = events
            .recv_timeout(Duration::from_millis(150))
            .expect("batch after failed cycles");
        assert_eq!(event.detections[0].label, "bottle");
        assert!(
            started.elapsed() < Duration::from_millis(150),
            "failed cycles must not consume the fixed sleep"
        );

        handle.stop().expect("clean stop");
    }

    #[test]
    fn take_events_yields_receiver_once() {
        let mut handle = test_loop(StubBackend::new(64)).spawn(0.5);
        assert!(handle.take_events().is_some());
        assert!(handle.take_events().is_none());
        handle.stop().unwrap();
    }
}
