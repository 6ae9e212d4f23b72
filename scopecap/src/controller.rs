/*!
Acquisition orchestrator.

Owns acquisition mode and the frame-rate estimate, issues capture
demands to the worker, and turns capture outcomes into consumer events.
All policy lives here; the worker is a pure "wait, capture once,
announce" primitive.
*/

use crate::acquisition::{run_worker, CaptureOutcome, Request};
use crate::device::Device;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use shared::codec::{Timebase, TriggerEdge};
use shared::{Frame, Result, ScopeError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Weight of the newest inter-frame interval in the rate estimate
const SMOOTHING_NEW: f64 = 0.9;
/// Weight of the previous estimate
const SMOOTHING_OLD: f64 = 0.1;

/// Current acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    Idle,
    SingleShot,
    Continuous,
}

/// Exponentially smoothed seconds-per-frame estimate
#[derive(Debug)]
struct RateEstimator {
    seconds_per_frame: f64,
    last_frame: Instant,
}

impl RateEstimator {
    fn new() -> Self {
        Self {
            seconds_per_frame: 1.0,
            last_frame: Instant::now(),
        }
    }

    /// Restart the baseline; the next frame measures from now
    fn reset(&mut self) {
        self.seconds_per_frame = 1.0;
        self.last_frame = Instant::now();
    }

    /// Fold one inter-frame interval into the estimate
    fn update(&mut self, elapsed_seconds: f64) -> f64 {
        self.seconds_per_frame =
            SMOOTHING_NEW * elapsed_seconds + SMOOTHING_OLD * self.seconds_per_frame;
        self.seconds_per_frame
    }

    /// Record a completed frame at the current instant
    fn on_frame(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        self.update(elapsed)
    }

    fn seconds_per_frame(&self) -> f64 {
        self.seconds_per_frame
    }
}

/// Event delivered to the consumer via [`AcquisitionController::poll_event`]
#[derive(Debug)]
pub enum ScopeEvent {
    /// A capture completed; carries the smoothed seconds-per-frame
    FrameReady {
        frame: Frame,
        seconds_per_frame: f64,
    },
    /// A capture failed; continuous acquisition stops re-arming
    CaptureFailed(ScopeError),
}

/// Orchestrates the acquisition worker: mode, demand pacing, rate stats
pub struct AcquisitionController {
    requests: Sender<Request>,
    outcomes: Receiver<CaptureOutcome>,
    worker: Option<JoinHandle<()>>,
    mode: AcquisitionMode,
    connected: bool,
    demand_outstanding: bool,
    worker_gone: bool,
    rate: RateEstimator,
}

impl AcquisitionController {
    /// Spawn the acquisition worker thread around a device session
    pub fn spawn(device: Device) -> Result<Self> {
        let (req_tx, req_rx) = unbounded();
        // One-slot outcome channel: at most one capture is ever in flight
        let (out_tx, out_rx) = bounded(1);

        let worker = thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || run_worker(device, req_rx, out_tx))?;

        Ok(Self {
            requests: req_tx,
            outcomes: out_rx,
            worker: Some(worker),
            mode: AcquisitionMode::Idle,
            connected: false,
            demand_outstanding: false,
            worker_gone: false,
            rate: RateEstimator::new(),
        })
    }

    /// Connect to the device at `port` and synchronize its configuration
    pub fn connect(&mut self, port: &str) -> Result<()> {
        self.request(|reply| Request::Connect {
            port: port.to_string(),
            reply,
        })??;
        self.connected = true;
        Ok(())
    }

    /// Close the connection and return to idle
    pub fn disconnect(&mut self) -> Result<()> {
        self.request(|reply| Request::Disconnect { reply })?;
        self.connected = false;
        self.mode = AcquisitionMode::Idle;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn set_timebase(&mut self, timebase: Timebase) -> Result<()> {
        self.request(|reply| Request::SetTimebase { timebase, reply })?
    }

    pub fn set_trigger_enabled(&mut self, enabled: bool) -> Result<()> {
        self.request(|reply| Request::SetTriggerEnabled { enabled, reply })?
    }

    pub fn set_trigger_edge(&mut self, edge: TriggerEdge) -> Result<()> {
        self.request(|reply| Request::SetTriggerEdge { edge, reply })?
    }

    /// Smoothed seconds-per-frame estimate
    pub fn seconds_per_frame(&self) -> f64 {
        self.rate.seconds_per_frame()
    }

    /// Smoothed frame rate
    pub fn frames_per_second(&self) -> f64 {
        1.0 / self.rate.seconds_per_frame()
    }

    /// Capture exactly one frame. Fails with `NotConnected` while
    /// disconnected, leaving mode untouched and issuing no demand.
    pub fn single_run(&mut self) -> Result<()> {
        if !self.connected {
            return Err(ScopeError::NotConnected);
        }
        self.mode = AcquisitionMode::SingleShot;
        self.issue_demand()
    }

    /// Start continuous capture; each completed frame re-arms the next
    pub fn continuous_run(&mut self) -> Result<()> {
        if !self.connected {
            return Err(ScopeError::NotConnected);
        }
        self.rate.reset();
        self.mode = AcquisitionMode::Continuous;
        self.issue_demand()
    }

    /// Stop re-arming. An in-flight capture completes and its frame is
    /// still delivered; no further demand is issued afterwards.
    pub fn stop(&mut self) {
        self.mode = AcquisitionMode::Idle;
    }

    /// Receive the next acquisition event, waiting at most `timeout`.
    ///
    /// On a completed frame the rate estimate is updated and, in
    /// continuous mode, the next demand is issued. On a capture failure
    /// the mode drops to idle so a dead device cannot spin an error loop.
    pub fn poll_event(&mut self, timeout: Duration) -> Option<ScopeEvent> {
        let outcome = match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => {
                // Report the dead worker once; afterwards the stream is over
                if self.worker_gone {
                    return None;
                }
                self.worker_gone = true;
                self.mode = AcquisitionMode::Idle;
                return Some(ScopeEvent::CaptureFailed(ScopeError::WorkerStopped));
            }
        };
        self.demand_outstanding = false;

        match outcome {
            Ok(frame) => {
                let seconds_per_frame = self.rate.on_frame();
                match self.mode {
                    AcquisitionMode::Continuous => {
                        if self.issue_demand().is_err() {
                            self.mode = AcquisitionMode::Idle;
                        }
                    }
                    AcquisitionMode::SingleShot => self.mode = AcquisitionMode::Idle,
                    AcquisitionMode::Idle => {}
                }
                Some(ScopeEvent::FrameReady {
                    frame,
                    seconds_per_frame,
                })
            }
            Err(e) => {
                self.mode = AcquisitionMode::Idle;
                Some(ScopeEvent::CaptureFailed(e))
            }
        }
    }

    /// Issue one demand unless a capture is already in flight; the
    /// pending outcome then completes under the new mode instead.
    fn issue_demand(&mut self) -> Result<()> {
        if self.demand_outstanding {
            debug!("demand already outstanding, not re-arming");
            return Ok(());
        }
        self.requests
            .send(Request::Capture)
            .map_err(|_| ScopeError::WorkerStopped)?;
        self.demand_outstanding = true;
        Ok(())
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Request) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.requests
            .send(build(reply_tx))
            .map_err(|_| ScopeError::WorkerStopped)?;
        reply_rx.recv().map_err(|_| ScopeError::WorkerStopped)
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
