//! The worker thread itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::transport::{BmcRequest, BmcResponse, BmcStatus};

#[derive(Debug, Error)]
pub enum BmcWorkerError {
    #[error("request queue is full, backing off")]
    RequestQueueFull,
    #[error("worker thread is not running")]
    NotRunning,
}

/// Lifecycle of the worker thread: the same Stopped/Starting/Running/
/// Crashed shape a child-process supervisor tracks, but for an in-process
/// thread rather than a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcWorkerState {
    Idle,
    InProgress,
    Done,
    Killed,
}

/// A single BMC worker thread for one host. Communicates with the main
/// loop exclusively through `requests`/`responses`; nothing else is
/// shared mutable state, satisfying spec.md §5's "only cross-thread
/// surface" requirement.
pub struct BmcWorker {
    requests: Arc<ArrayQueue<BmcRequest>>,
    responses: Arc<ArrayQueue<BmcResponse>>,
    kill: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    state: BmcWorkerState,
}

impl BmcWorker {
    /// Spawns the worker thread. `perform` is the actual BMC transport
    /// call (IPMI/Redfish); it's injected so this crate stays free of any
    /// concrete BMC protocol dependency — that lives in `fleetmtc-clients`.
    pub fn spawn<F>(queue_capacity: usize, perform: F) -> Self
    where
        F: Fn(&BmcRequest) -> (BmcStatus, String) + Send + 'static,
    {
        let requests = Arc::new(ArrayQueue::new(queue_capacity));
        let responses = Arc::new(ArrayQueue::new(queue_capacity));
        let kill = Arc::new(AtomicBool::new(false));

        let worker_requests = Arc::clone(&requests);
        let worker_responses = Arc::clone(&responses);
        let worker_kill = Arc::clone(&kill);

        let handle = thread::Builder::new()
            .name("fleetmtc-bmc-worker".into())
            .spawn(move || run(worker_requests, worker_responses, worker_kill, perform))
            .expect("failed to spawn BMC worker thread");

        Self {
            requests,
            responses,
            kill,
            handle: Some(handle),
            state: BmcWorkerState::Idle,
        }
    }

    /// `bmc_command_send`: enqueues a request for the worker thread.
    pub fn command_send(&mut self, request: BmcRequest) -> Result<(), BmcWorkerError> {
        if self.handle.is_none() {
            return Err(BmcWorkerError::NotRunning);
        }
        self.requests
            .push(request)
            .map_err(|_| BmcWorkerError::RequestQueueFull)?;
        self.state = BmcWorkerState::InProgress;
        Ok(())
    }

    /// `bmc_command_recv`: polls for a completed response without
    /// blocking. Returns `None` (the caller maps this to `RETRY`) if
    /// nothing has completed yet.
    pub fn command_recv(&mut self) -> Option<BmcResponse> {
        let response = self.responses.pop();
        if response.is_some() {
            self.state = BmcWorkerState::Done;
        }
        response
    }

    pub fn state(&self) -> BmcWorkerState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signals the worker to stop after its current request, then joins
    /// it. Called on Delete (spec.md §3 lifecycle: "kill any in-flight BMC
    /// worker").
    pub fn kill(&mut self) {
        self.kill.store(true, Ordering::SeqCst);
        self.state = BmcWorkerState::Killed;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!("BMC worker killed");
    }
}

impl Drop for BmcWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.kill();
        }
    }
}

fn run<F>(
    requests: Arc<ArrayQueue<BmcRequest>>,
    responses: Arc<ArrayQueue<BmcResponse>>,
    kill: Arc<AtomicBool>,
    perform: F,
) where
    F: Fn(&BmcRequest) -> (BmcStatus, String),
{
    while !kill.load(Ordering::SeqCst) {
        match requests.pop() {
            Some(request) => {
                debug!(host = %request.host, command = ?request.command, "BMC worker processing request");
                let (status, data) = perform(&request);
                let response = BmcResponse {
                    host: request.host.clone(),
                    command: request.command,
                    status,
                    data,
                };
                if responses.push(response).is_err() {
                    warn!(host = %request.host, "BMC response queue full, dropping result");
                }
            }
            None => thread::sleep(Duration::from_millis(20)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::HostName;

    #[test]
    fn send_then_recv_round_trip() {
        let mut worker = BmcWorker::spawn(8, |_req| (BmcStatus::Pass, "ok".to_string()));
        worker
            .command_send(BmcRequest {
                host: HostName::from("compute-0"),
                command: crate::BmcCommand::Ping,
            })
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut response = None;
        while std::time::Instant::now() < deadline {
            if let Some(r) = worker.command_recv() {
                response = Some(r);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let response = response.expect("worker never responded");
        assert_eq!(response.status, BmcStatus::Pass);
    }

    #[test]
    fn kill_stops_the_thread() {
        let mut worker = BmcWorker::spawn(8, |_req| (BmcStatus::Pass, String::new()));
        assert!(worker.is_alive());
        worker.kill();
        assert!(!worker.is_alive());
    }
}
