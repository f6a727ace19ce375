use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot "ports are bound" flag shared between the audio thread and the
/// binding worker.
///
/// The worker publishes with `Release`, the audio thread observes with
/// `Acquire`.  Only the disconnect pass at deactivation lowers it again,
/// once the links it guarded are gone.
#[derive(Debug, Default)]
pub struct ConnectionLatch {
    bound: AtomicBool,
}

impl ConnectionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Set the latch.  Returns true only for the call that flipped it.
    pub fn set(&self) -> bool {
        !self.bound.swap(true, Ordering::AcqRel)
    }

    /// Re-arm binding for the next activation.
    pub fn clear(&self) {
        self.bound.store(false, Ordering::Release);
    }
}
