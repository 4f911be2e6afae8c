//! Per-cover worker thread.
//!
//! Each cover gets exactly one thread that owns its `MovementController`.
//! Commands, snapshot requests and timer wake-ups are all handled on that
//! thread, so they are strictly serialized: a command issued after another
//! is observed after it, and a stop deadline can never fire against state a
//! later command already replaced.
//!
//! The thread shuts down when the owning `CoverHandle` is dropped. A cover
//! that is still moving at that point is stopped first.

use crate::controller::{MovementController, Tick};
use crate::error::{CoverError, Result};
use crate::status::{AxisKind, CoverSnapshot};
use chronoshade_traits::clock::{Clock, MonotonicClock};
use chronoshade_traits::{DirectionalActuator, PositionStore};
use crossbeam_channel as xch;
use eyre::WrapErr;
use std::time::{Duration, Instant};

/// A user-level command for one cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    SetPosition(u8),
    OpenTilt,
    CloseTilt,
    SetTilt(u8),
    Stop,
    StopTilt,
    /// Overwrite the estimate of `axis` without moving.
    Calibrate { axis: AxisKind, value: u8 },
}

enum Request {
    Command(Command, xch::Sender<Result<()>>),
    Snapshot(xch::Sender<CoverSnapshot>),
    Subscribe(xch::Sender<CoverSnapshot>),
    Shutdown,
}

/// Cloneable sender side of a cover worker.
#[derive(Clone)]
pub struct CoverRemote {
    id: String,
    tx: xch::Sender<Request>,
}

impl core::fmt::Debug for CoverRemote {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoverRemote").field("id", &self.id).finish()
    }
}

impl CoverRemote {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `command` on the worker and wait for its outcome.
    pub fn send(&self, command: Command) -> Result<()> {
        let (reply_tx, reply_rx) = xch::bounded(1);
        self.tx
            .send(Request::Command(command, reply_tx))
            .map_err(|_| CoverError::Disconnected)?;
        reply_rx.recv().map_err(|_| CoverError::Disconnected)?
    }

    pub fn open(&self) -> Result<()> {
        self.send(Command::Open)
    }

    pub fn close(&self) -> Result<()> {
        self.send(Command::Close)
    }

    pub fn set_position(&self, position: u8) -> Result<()> {
        self.send(Command::SetPosition(position))
    }

    pub fn open_tilt(&self) -> Result<()> {
        self.send(Command::OpenTilt)
    }

    pub fn close_tilt(&self) -> Result<()> {
        self.send(Command::CloseTilt)
    }

    pub fn set_tilt(&self, tilt: u8) -> Result<()> {
        self.send(Command::SetTilt(tilt))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn stop_tilt(&self) -> Result<()> {
        self.send(Command::StopTilt)
    }

    pub fn set_known_position(&self, position: u8) -> Result<()> {
        self.send(Command::Calibrate {
            axis: AxisKind::Position,
            value: position,
        })
    }

    pub fn set_known_tilt(&self, tilt: u8) -> Result<()> {
        self.send(Command::Calibrate {
            axis: AxisKind::Tilt,
            value: tilt,
        })
    }

    pub fn snapshot(&self) -> Result<CoverSnapshot> {
        let (reply_tx, reply_rx) = xch::bounded(1);
        self.tx
            .send(Request::Snapshot(reply_tx))
            .map_err(|_| CoverError::Disconnected)?;
        Ok(reply_rx.recv().map_err(|_| CoverError::Disconnected)?)
    }

    /// Receive a snapshot every time the observable state changes.
    ///
    /// The receiver closes when the worker exits.
    pub fn subscribe(&self) -> Result<xch::Receiver<CoverSnapshot>> {
        let (tx, rx) = xch::unbounded();
        self.tx
            .send(Request::Subscribe(tx))
            .map_err(|_| CoverError::Disconnected)?;
        Ok(rx)
    }

    /// Block until neither axis is moving, or `timeout` elapses.
    pub fn wait_idle(&self, timeout: Duration) -> Result<CoverSnapshot> {
        let deadline = Instant::now() + timeout;
        // Subscribe before sampling so no transition falls in between.
        let updates = self.subscribe()?;
        let mut snap = self.snapshot()?;
        while snap.is_moving() {
            match updates.recv_deadline(deadline) {
                Ok(s) => snap = s,
                Err(xch::RecvTimeoutError::Timeout) => {
                    eyre::bail!(
                        "cover {} still moving after {} ms",
                        self.id,
                        timeout.as_millis()
                    )
                }
                Err(xch::RecvTimeoutError::Disconnected) => {
                    return Err(CoverError::Disconnected.into());
                }
            }
        }
        Ok(snap)
    }
}

/// Owner of a cover worker thread. Dereferences to its `CoverRemote`.
pub struct CoverHandle {
    remote: CoverRemote,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for CoverHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoverHandle")
            .field("id", &self.remote.id)
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

impl CoverHandle {
    /// Move `controller` onto its own thread, timed by the monotonic clock.
    pub fn spawn<A, S>(controller: MovementController<A, S>) -> Result<Self>
    where
        A: DirectionalActuator + Send + 'static,
        S: PositionStore + Send + 'static,
    {
        Self::spawn_with_clock(controller, MonotonicClock::new())
    }

    pub fn spawn_with_clock<A, S, C>(controller: MovementController<A, S>, clock: C) -> Result<Self>
    where
        A: DirectionalActuator + Send + 'static,
        S: PositionStore + Send + 'static,
        C: Clock + Send + 'static,
    {
        let id = controller.id().to_owned();
        let (tx, rx) = xch::unbounded();
        let join_handle = std::thread::Builder::new()
            .name(format!("cover-{id}"))
            .spawn(move || run(controller, &rx, &clock))
            .wrap_err_with(|| format!("spawn worker thread for cover {id}"))?;
        tracing::debug!(cover = %id, "worker started");
        Ok(Self {
            remote: CoverRemote { id, tx },
            join_handle: Some(join_handle),
        })
    }

    pub fn remote(&self) -> CoverRemote {
        self.remote.clone()
    }
}

impl std::ops::Deref for CoverHandle {
    type Target = CoverRemote;

    fn deref(&self) -> &CoverRemote {
        &self.remote
    }
}

impl Drop for CoverHandle {
    fn drop(&mut self) {
        // Ignore send errors: the worker may already be gone.
        let _ = self.remote.tx.send(Request::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!(cover = %self.remote.id, "worker joined"),
                Err(e) => tracing::warn!(cover = %self.remote.id, ?e, "worker panicked during shutdown"),
            }
        }
    }
}

fn run<A, S, C>(mut controller: MovementController<A, S>, rx: &xch::Receiver<Request>, clock: &C)
where
    A: DirectionalActuator,
    S: PositionStore,
    C: Clock,
{
    let mut subscribers: Vec<xch::Sender<CoverSnapshot>> = Vec::new();
    let mut last_published: Option<CoverSnapshot> = None;

    loop {
        // Timer failures are logged by the controller itself.
        let Tick { next, .. } = controller.poll(clock.now());
        publish(&controller, clock, &mut subscribers, &mut last_published);

        let received = match next {
            Some(at) => rx.recv_timeout(at.saturating_duration_since(clock.now())),
            None => rx.recv().map_err(|_| xch::RecvTimeoutError::Disconnected),
        };
        let request = match received {
            Ok(r) => r,
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => break,
        };

        match request {
            Request::Command(command, reply) => {
                let outcome = apply(&mut controller, command, clock.now());
                if let Err(e) = &outcome {
                    tracing::warn!(cover = %controller.id(), ?command, error = %e, "command failed");
                }
                // The caller may have given up waiting.
                let _ = reply.send(outcome);
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(controller.snapshot(clock.now()));
            }
            Request::Subscribe(sub) => {
                if sub.send(controller.snapshot(clock.now())).is_ok() {
                    subscribers.push(sub);
                }
            }
            Request::Shutdown => break,
        }
    }

    if let Err(e) = controller.shutdown(clock.now()) {
        tracing::error!(cover = %controller.id(), error = %e, "could not stop cover on shutdown");
    }
    publish(&controller, clock, &mut subscribers, &mut last_published);
    tracing::debug!(cover = %controller.id(), "worker exiting");
}

fn apply<A, S>(c: &mut MovementController<A, S>, command: Command, now: Instant) -> Result<()>
where
    A: DirectionalActuator,
    S: PositionStore,
{
    match command {
        Command::Open => c.open(now),
        Command::Close => c.close(now),
        Command::SetPosition(p) => c.request_position(p, now),
        Command::OpenTilt => c.open_tilt(now),
        Command::CloseTilt => c.close_tilt(now),
        Command::SetTilt(t) => c.request_tilt(t, now),
        Command::Stop => c.stop(now),
        Command::StopTilt => c.stop_tilt(now),
        Command::Calibrate {
            axis: AxisKind::Position,
            value,
        } => c.set_known_position(value, now),
        Command::Calibrate {
            axis: AxisKind::Tilt,
            value,
        } => c.set_known_tilt(value, now),
    }
}

/// Send the current snapshot to subscribers if it changed since the last one.
fn publish<A, S, C>(
    controller: &MovementController<A, S>,
    clock: &C,
    subscribers: &mut Vec<xch::Sender<CoverSnapshot>>,
    last: &mut Option<CoverSnapshot>,
) where
    A: DirectionalActuator,
    S: PositionStore,
    C: Clock,
{
    let snap = controller.snapshot(clock.now());
    if last.as_ref() == Some(&snap) {
        return;
    }
    subscribers.retain(|s| s.send(snap.clone()).is_ok());
    *last = Some(snap);
}
