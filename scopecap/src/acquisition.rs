/*!
Acquisition worker thread.

A single long-lived thread owns the device session and services a
request channel. Configuration and connection requests return their
result synchronously over a one-shot reply channel; a capture demand
performs exactly one capture and publishes the tagged outcome. Because
the device lives on this thread, a configuration write can never
interleave with an in-flight capture read, and because demands are
queued messages, a demand issued while the worker is busy is serviced
next rather than lost.
*/

use crate::device::Device;
use crossbeam_channel::{Receiver, Sender};
use shared::codec::{Timebase, TriggerEdge};
use shared::{Frame, Result};
use tracing::{info, warn};

/// Outcome of one capture demand, published to the orchestrator
pub type CaptureOutcome = Result<Frame>;

/// Requests serviced by the acquisition worker
pub enum Request {
    Connect {
        port: String,
        reply: Sender<Result<()>>,
    },
    Disconnect {
        reply: Sender<()>,
    },
    SetTimebase {
        timebase: Timebase,
        reply: Sender<Result<()>>,
    },
    SetTriggerEnabled {
        enabled: bool,
        reply: Sender<Result<()>>,
    },
    SetTriggerEdge {
        edge: TriggerEdge,
        reply: Sender<Result<()>>,
    },
    /// Demand signal: clear device buffers, perform exactly one capture,
    /// publish the outcome
    Capture,
    Shutdown,
}

/// Worker loop. Runs until `Shutdown`, the request channel closes, or
/// the outcome channel's consumer goes away.
pub fn run_worker(
    mut device: Device,
    requests: Receiver<Request>,
    outcomes: Sender<CaptureOutcome>,
) {
    info!("acquisition worker started");

    while let Ok(request) = requests.recv() {
        match request {
            Request::Connect { port, reply } => {
                let _ = reply.send(device.connect(&port));
            }
            Request::Disconnect { reply } => {
                device.disconnect();
                let _ = reply.send(());
            }
            Request::SetTimebase { timebase, reply } => {
                let _ = reply.send(device.set_timebase(timebase));
            }
            Request::SetTriggerEnabled { enabled, reply } => {
                let _ = reply.send(device.set_trigger_enabled(enabled));
            }
            Request::SetTriggerEdge { edge, reply } => {
                let _ = reply.send(device.set_trigger_edge(edge));
            }
            Request::Capture => {
                // Buffer clear must happen before the start command so a
                // prior aborted capture cannot corrupt this read
                let outcome = device.clear_buffers().and_then(|_| device.capture_one());
                if let Err(ref e) = outcome {
                    warn!("capture failed: {e}");
                }
                if outcomes.send(outcome).is_err() {
                    break;
                }
            }
            Request::Shutdown => break,
        }
    }

    device.disconnect();
    info!("acquisition worker stopped");
}
