use std::sync::Arc;

use super::ports::{PortBuffers, PortIndex};
use crate::binder::{Backoff, BindingWorker, ConnectionLatch, PortBinder};
use crate::config::BinderConfig;
use crate::routing::RoutingDaemon;

/// One plugin instance: the passthrough copy path plus the state needed to
/// get its send/return ports wired up.
pub struct JackInsert {
    ports: PortBuffers,
    latch: Arc<ConnectionLatch>,
    daemon: Arc<dyn RoutingDaemon>,
    config: Arc<BinderConfig>,
    worker: Option<BindingWorker>,
    pub sample_rate: f64,
}

impl JackInsert {
    pub fn new(sample_rate: f64, config: BinderConfig, daemon: Arc<dyn RoutingDaemon>) -> Self {
        Self {
            ports: PortBuffers::default(),
            latch: Arc::new(ConnectionLatch::new()),
            daemon,
            config: Arc::new(config),
            worker: None,
            sample_rate,
        }
    }

    /// Bind a host buffer to a port.  Unknown indices are ignored.
    ///
    /// # Safety
    /// `data` must point to a buffer large enough for every `run()` call
    /// made until the port is rebound.
    pub unsafe fn connect_port(&mut self, port: u32, data: *mut f32) {
        match PortIndex::from_raw(port) {
            Some(index) => self.ports.connect(index, data),
            None => log::warn!("Ignoring connect_port for unknown port {}", port),
        }
    }

    /// Start the binding worker.  Idempotent.
    pub fn activate(&mut self) {
        if self.worker.is_some() {
            return;
        }
        if !self.ports.is_complete() {
            let unbound: Vec<&str> = PortIndex::ALL
                .iter()
                .filter(|&&port| self.ports.get(port).is_null())
                .map(|port| port.symbol())
                .collect();
            log::warn!("Activated with unbound ports: {}", unbound.join(", "));
        }

        let binder = PortBinder::new(self.daemon.clone(), self.config.clone());
        let backoff = Backoff::new(self.config.retry_initial(), self.config.retry_max());

        match BindingWorker::spawn(
            binder,
            self.latch.clone(),
            backoff,
            self.config.disconnect_on_deactivate,
        ) {
            Ok(worker) => {
                log::debug!("Activated at {} Hz", self.sample_rate);
                self.worker = Some(worker);
            }
            Err(e) => {
                log::error!(
                    "Failed to spawn binding worker: {}; send/return ports stay unconnected",
                    e
                );
            }
        }
    }

    /// Process one block.  Never allocates or touches the daemon; binding
    /// is only requested from the worker.
    ///
    /// # Safety
    /// Every bound buffer must be valid for `n_samples` floats.
    pub unsafe fn run(&mut self, n_samples: u32) {
        if !self.latch.is_set()
            && let Some(worker) = &self.worker
        {
            worker.request();
        }

        let n = n_samples as usize;
        unsafe {
            self.ports.copy(PortIndex::InputLeft, PortIndex::SendLeft, n);
            self.ports.copy(PortIndex::InputRight, PortIndex::SendRight, n);
            self.ports.copy(PortIndex::ReturnLeft, PortIndex::OutputLeft, n);
            self.ports.copy(PortIndex::ReturnRight, PortIndex::OutputRight, n);
        }
    }

    /// Stop the binding worker, waiting for any in-flight attempt.
    pub fn deactivate(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
            log::debug!("Deactivated");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.latch.is_set()
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }
}

impl Drop for JackInsert {
    fn drop(&mut self) {
        self.deactivate();
    }
}
