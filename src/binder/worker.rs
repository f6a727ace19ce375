//! Background binding worker.
//!
//! Keeps all daemon I/O off the audio thread.  The RT thread calls
//! [`BindingWorker::request`] while the latch is unset, which drops a token
//! into a single-slot channel; a dedicated worker thread picks it up and
//! runs one binding attempt.  Requests that arrive while a token is
//! already queued, or while the retry backoff is running, are dropped on the
//! calling side without touching the channel, so a waiting worker is never
//! woken just to skip an attempt.
//!
//! Lifecycle:
//!   1. `BindingWorker::spawn()` at plugin activation
//!   2. `request()` from `run()` until the latch is set
//!   3. `shutdown()` at deactivation (or drop): closes the channel, lets
//!      the thread optionally undo the connections it made, and joins it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::latch::ConnectionLatch;
use super::manager::{BindMode, PortBinder};
use crate::routing::PortPair;

const THREAD_NAME: &str = "jackinsert-binder";

/// Doubling retry delay between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    delay: Duration,
    not_before: Option<Instant>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            delay: initial,
            not_before: None,
        }
    }

    /// Whether an attempt may run at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        self.not_before.is_none_or(|t| now >= t)
    }

    /// Record a failed attempt made at `now`.
    pub fn failed(&mut self, now: Instant) {
        self.not_before = Some(now + self.delay);
        self.delay = self.delay.saturating_mul(2).min(self.max);
    }

    pub fn reset(&mut self) {
        self.delay = self.initial;
        self.not_before = None;
    }

    /// Delay that the next failure will impose.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Earliest time the next attempt may run, if it is being held back.
    pub fn not_before(&self) -> Option<Instant> {
        self.not_before
    }
}

/// Request state published by the worker and read by the audio thread.
struct RequestGate {
    origin: Instant,
    /// Nanoseconds after `origin` before which requests are dropped; 0 for
    /// none
    not_before: AtomicU64,
    /// A token is in the channel or being handled
    queued: AtomicBool,
}

impl RequestGate {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            not_before: AtomicU64::new(0),
            queued: AtomicBool::new(false),
        }
    }

    fn offset(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.origin).as_nanos()).unwrap_or(u64::MAX)
    }

    fn defer_until(&self, at: Option<Instant>) {
        let nanos = at.map_or(0, |t| self.offset(t));
        self.not_before.store(nanos, Ordering::Release);
    }

    fn deferred(&self, now: Instant) -> bool {
        let not_before = self.not_before.load(Ordering::Acquire);
        not_before != 0 && self.offset(now) < not_before
    }

    /// Claim the single request slot.  False if a request is already out
    /// or the backoff window is still open.
    fn claim(&self, now: Instant) -> bool {
        if self.queued.load(Ordering::Acquire) || self.deferred(now) {
            return false;
        }
        !self.queued.swap(true, Ordering::AcqRel)
    }

    fn release(&self) {
        self.queued.store(false, Ordering::Release);
    }
}

/// Handle to the running worker thread.
pub struct BindingWorker {
    request_tx: Option<mpsc::SyncSender<()>>,
    gate: Arc<RequestGate>,
    thread: Option<JoinHandle<()>>,
}

impl BindingWorker {
    /// Spawn the worker thread.
    ///
    /// With `disconnect_on_exit`, the thread disconnects the pairs it
    /// connected itself on shutdown, then clears the latch so the next
    /// activation binds again.
    pub fn spawn(
        binder: PortBinder,
        latch: Arc<ConnectionLatch>,
        backoff: Backoff,
        disconnect_on_exit: bool,
    ) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::sync_channel::<()>(1);
        let gate = Arc::new(RequestGate::new());

        let thread_gate = gate.clone();
        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                worker_thread_main(
                    binder,
                    latch,
                    request_rx,
                    thread_gate,
                    backoff,
                    disconnect_on_exit,
                );
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            gate,
            thread: Some(thread),
        })
    }

    /// Ask for a binding attempt.  Never blocks; safe to call from the RT
    /// thread.  Returns true if a new request was queued.
    #[inline]
    pub fn request(&self) -> bool {
        let Some(tx) = &self.request_tx else {
            return false;
        };
        if !self.gate.claim(Instant::now()) {
            return false;
        }
        if tx.try_send(()).is_ok() {
            true
        } else {
            self.gate.release();
            false
        }
    }

    /// Whether requests are currently dropped because the last attempt
    /// failed and its retry delay has not elapsed.
    pub fn is_backing_off(&self) -> bool {
        self.gate.deferred(Instant::now())
    }

    /// Stop the worker and wait for it.  Blocks until any in-flight attempt
    /// (and the optional disconnect pass) has finished.
    pub fn shutdown(&mut self) {
        // Dropping the sender makes recv() return Disconnected
        self.request_tx = None;
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("Binding worker thread panicked");
        }
    }
}

impl Drop for BindingWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_thread_main(
    binder: PortBinder,
    latch: Arc<ConnectionLatch>,
    request_rx: mpsc::Receiver<()>,
    gate: Arc<RequestGate>,
    mut backoff: Backoff,
    disconnect_on_exit: bool,
) {
    log::debug!("Binding worker started");

    // Links made by this worker; anything found already connected is not ours
    let mut created: Vec<PortPair> = Vec::new();

    while request_rx.recv().is_ok() {
        handle_request(&binder, &latch, &mut backoff, &mut created);
        // Publish the deadline before freeing the slot
        gate.defer_until(backoff.not_before());
        gate.release();
    }

    if disconnect_on_exit && !created.is_empty() {
        if let Some(released) = binder.release(&created)
            && !released.failed.is_empty()
        {
            log::warn!("{} pair(s) could not be disconnected", released.failed.len());
        }
        latch.clear();
    }

    log::debug!("Binding worker stopped");
}

fn handle_request(
    binder: &PortBinder,
    latch: &ConnectionLatch,
    backoff: &mut Backoff,
    created: &mut Vec<PortPair>,
) {
    if latch.is_set() {
        return;
    }

    if !backoff.ready(Instant::now()) {
        log::trace!("Binding attempt skipped, backing off");
        return;
    }

    let outcome = binder.attempt_external_binding(BindMode::Connect);
    for pair in outcome.changed() {
        if !created.contains(pair) {
            created.push(pair.clone());
        }
    }

    if outcome.latched() {
        if latch.set() {
            log::info!("{} ports connected", binder.config().peer_label);
        }
        backoff.reset();
    } else {
        backoff.failed(Instant::now());
        log::debug!(
            "Binding attempt failed, retrying in {:?} or later",
            backoff.delay()
        );
    }
}
