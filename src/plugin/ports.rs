use std::ptr;

/// Fixed LV2 port layout.  Indices must match the bundle's TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PortIndex {
    InputLeft = 0,
    InputRight = 1,
    OutputLeft = 2,
    OutputRight = 3,
    SendLeft = 4,
    SendRight = 5,
    ReturnLeft = 6,
    ReturnRight = 7,
}

impl PortIndex {
    pub const COUNT: usize = 8;

    pub const ALL: [PortIndex; Self::COUNT] = [
        PortIndex::InputLeft,
        PortIndex::InputRight,
        PortIndex::OutputLeft,
        PortIndex::OutputRight,
        PortIndex::SendLeft,
        PortIndex::SendRight,
        PortIndex::ReturnLeft,
        PortIndex::ReturnRight,
    ];

    pub fn from_raw(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// LV2 port symbol
    pub fn symbol(self) -> &'static str {
        match self {
            PortIndex::InputLeft => "in_l",
            PortIndex::InputRight => "in_r",
            PortIndex::OutputLeft => "out_l",
            PortIndex::OutputRight => "out_r",
            PortIndex::SendLeft => "send_l",
            PortIndex::SendRight => "send_r",
            PortIndex::ReturnLeft => "return_l",
            PortIndex::ReturnRight => "return_r",
        }
    }
}

/// Host-owned sample buffers, as bound through `connect_port`.
///
/// Only raw addresses are stored; the host guarantees they stay valid for
/// the duration of each `run()` call.
pub struct PortBuffers {
    ptrs: [*mut f32; PortIndex::COUNT],
}

impl Default for PortBuffers {
    fn default() -> Self {
        Self {
            ptrs: [ptr::null_mut(); PortIndex::COUNT],
        }
    }
}

impl PortBuffers {
    pub fn connect(&mut self, port: PortIndex, data: *mut f32) {
        self.ptrs[port as usize] = data;
    }

    pub fn get(&self, port: PortIndex) -> *mut f32 {
        self.ptrs[port as usize]
    }

    /// All eight ports have a buffer bound.
    pub fn is_complete(&self) -> bool {
        self.ptrs.iter().all(|p| !p.is_null())
    }

    /// Copy `n_samples` from one port's buffer to another's.  Returns false
    /// (and copies nothing) if either side is unbound.
    ///
    /// Uses a memmove, so hosts running us in-place are fine.
    ///
    /// # Safety
    /// Both buffers must be valid for `n_samples` floats.
    #[inline]
    pub unsafe fn copy(&self, from: PortIndex, to: PortIndex, n_samples: usize) -> bool {
        let src = self.get(from);
        let dst = self.get(to);
        if src.is_null() || dst.is_null() {
            return false;
        }
        unsafe { ptr::copy(src as *const f32, dst, n_samples) };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_index_roundtrip() {
        for (i, port) in PortIndex::ALL.iter().enumerate() {
            assert_eq!(*port as usize, i);
            assert_eq!(PortIndex::from_raw(i as u32), Some(*port));
        }
        assert_eq!(PortIndex::from_raw(8), None);
        assert_eq!(PortIndex::from_raw(u32::MAX), None);
    }

    #[test]
    fn test_copy_skips_unbound() {
        let mut src = [1.0f32; 4];
        let mut buffers = PortBuffers::default();
        buffers.connect(PortIndex::InputLeft, src.as_mut_ptr());
        assert!(!buffers.is_complete());
        assert!(!unsafe { buffers.copy(PortIndex::InputLeft, PortIndex::SendLeft, 4) });
    }

    #[test]
    fn test_copy_in_place() {
        let mut shared = [0.25f32, 0.5, 0.75, 1.0];
        let mut buffers = PortBuffers::default();
        buffers.connect(PortIndex::InputLeft, shared.as_mut_ptr());
        buffers.connect(PortIndex::SendLeft, shared.as_mut_ptr());
        assert!(unsafe { buffers.copy(PortIndex::InputLeft, PortIndex::SendLeft, 4) });
        assert_eq!(shared, [0.25, 0.5, 0.75, 1.0]);
    }
}
