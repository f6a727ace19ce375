//! LV2 entry points.
//!
//! `lv2_descriptor` is the only exported symbol.  Every entry point is a
//! thin shim that casts the handle back to [`JackInsert`] and forwards;
//! panics are caught here so they never unwind into the host.

use std::ffi::{CStr, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use lv2_raw::core::LV2Feature;

use super::instance::JackInsert;
use crate::config::BinderConfig;
use crate::routing::JackDaemon;

pub const PLUGIN_URI: &CStr = c"https://github.com/he-leon/jackinsert";

#[allow(non_camel_case_types)]
pub type LV2_Handle = *mut c_void;

// ── C-compatible struct definition matching lv2/core/lv2.h ──

#[repr(C)]
#[allow(non_camel_case_types)]
pub struct LV2_Descriptor {
    pub uri: *const c_char,
    pub instantiate: unsafe extern "C" fn(
        descriptor: *const LV2_Descriptor,
        sample_rate: f64,
        bundle_path: *const c_char,
        features: *const *const LV2Feature,
    ) -> LV2_Handle,
    pub connect_port: unsafe extern "C" fn(instance: LV2_Handle, port: u32, data: *mut c_void),
    pub activate: Option<unsafe extern "C" fn(instance: LV2_Handle)>,
    pub run: unsafe extern "C" fn(instance: LV2_Handle, sample_count: u32),
    pub deactivate: Option<unsafe extern "C" fn(instance: LV2_Handle)>,
    pub cleanup: unsafe extern "C" fn(instance: LV2_Handle),
    pub extension_data: Option<unsafe extern "C" fn(uri: *const c_char) -> *const c_void>,
}

// SAFETY: The descriptor is immutable static data; the URI points into a
// 'static C string literal.
unsafe impl Sync for LV2_Descriptor {}

static DESCRIPTOR: LV2_Descriptor = LV2_Descriptor {
    uri: PLUGIN_URI.as_ptr(),
    instantiate,
    connect_port,
    activate: Some(activate),
    run,
    deactivate: Some(deactivate),
    cleanup,
    extension_data: Some(extension_data),
};

#[unsafe(no_mangle)]
pub extern "C" fn lv2_descriptor(index: u32) -> *const LV2_Descriptor {
    if index == 0 {
        ptr::from_ref(&DESCRIPTOR)
    } else {
        ptr::null()
    }
}

/// Run `f`, turning a panic into a log line and `fallback`.
fn guard<T>(entry: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("Panic in LV2 {}", entry);
            fallback
        }
    }
}

unsafe fn bundle_dir(bundle_path: *const c_char) -> Option<PathBuf> {
    if bundle_path.is_null() {
        return None;
    }
    let path = unsafe { CStr::from_ptr(bundle_path) };
    path.to_str().ok().map(PathBuf::from)
}

unsafe fn log_features(features: *const *const LV2Feature) {
    if features.is_null() {
        return;
    }
    let mut cursor = features;
    unsafe {
        while !(*cursor).is_null() {
            let feature = &**cursor;
            if !feature.uri.is_null() {
                log::debug!(
                    "Host feature: {}",
                    CStr::from_ptr(feature.uri).to_string_lossy()
                );
            }
            cursor = cursor.add(1);
        }
    }
}

/// Cast the host's handle back to the instance.
///
/// # Safety
/// `instance` must be null or a handle returned by `instantiate` and not
/// yet passed to `cleanup`.
unsafe fn plugin<'a>(instance: LV2_Handle) -> Option<&'a mut JackInsert> {
    unsafe { (instance as *mut JackInsert).as_mut() }
}

unsafe extern "C" fn instantiate(
    _descriptor: *const LV2_Descriptor,
    sample_rate: f64,
    bundle_path: *const c_char,
    features: *const *const LV2Feature,
) -> LV2_Handle {
    crate::init_logging();

    guard("instantiate", ptr::null_mut(), || {
        let config = match unsafe { bundle_dir(bundle_path) } {
            Some(dir) => BinderConfig::load(&dir),
            None => BinderConfig::default(),
        };
        unsafe { log_features(features) };

        log::debug!("Instantiating {:?} at {} Hz", PLUGIN_URI, sample_rate);
        let plugin = JackInsert::new(sample_rate, config, Arc::new(JackDaemon));
        Box::into_raw(Box::new(plugin)) as LV2_Handle
    })
}

unsafe extern "C" fn connect_port(instance: LV2_Handle, port: u32, data: *mut c_void) {
    if let Some(plugin) = unsafe { plugin(instance) } {
        guard("connect_port", (), || unsafe {
            plugin.connect_port(port, data as *mut f32)
        });
    }
}

unsafe extern "C" fn activate(instance: LV2_Handle) {
    if let Some(plugin) = unsafe { plugin(instance) } {
        guard("activate", (), || plugin.activate());
    }
}

unsafe extern "C" fn run(instance: LV2_Handle, sample_count: u32) {
    if let Some(plugin) = unsafe { plugin(instance) } {
        guard("run", (), || unsafe { plugin.run(sample_count) });
    }
}

unsafe extern "C" fn deactivate(instance: LV2_Handle) {
    if let Some(plugin) = unsafe { plugin(instance) } {
        guard("deactivate", (), || plugin.deactivate());
    }
}

unsafe extern "C" fn cleanup(instance: LV2_Handle) {
    if instance.is_null() {
        return;
    }
    let plugin = unsafe { Box::from_raw(instance as *mut JackInsert) };
    guard("cleanup", (), move || drop(plugin));
}

unsafe extern "C" fn extension_data(_uri: *const c_char) -> *const c_void {
    ptr::null()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PortIndex;
    use crate::routing::mock::MockDaemon;
    use std::time::{Duration, Instant};

    fn descriptor() -> &'static LV2_Descriptor {
        unsafe { &*lv2_descriptor(0) }
    }

    fn handle_with(daemon: &MockDaemon) -> LV2_Handle {
        let config = BinderConfig {
            retry_initial_ms: 0,
            retry_max_ms: 0,
            ..BinderConfig::default()
        };
        let plugin = JackInsert::new(44100.0, config, Arc::new(daemon.clone()));
        Box::into_raw(Box::new(plugin)) as LV2_Handle
    }

    #[test]
    fn test_descriptor_index() {
        assert!(!lv2_descriptor(0).is_null());
        assert!(lv2_descriptor(1).is_null());
        assert!(lv2_descriptor(u32::MAX).is_null());

        let uri = unsafe { CStr::from_ptr(descriptor().uri) };
        assert_eq!(uri, PLUGIN_URI);
        assert_eq!(
            uri.to_str().unwrap(),
            "https://github.com/he-leon/jackinsert"
        );
    }

    #[test]
    fn test_extension_data_is_empty() {
        let ext = descriptor().extension_data.unwrap();
        let uri = c"http://lv2plug.in/ns/ext/worker#interface";
        assert!(unsafe { ext(uri.as_ptr()) }.is_null());
    }

    #[test]
    fn test_instantiate_and_cleanup() {
        let d = descriptor();
        let handle = unsafe { (d.instantiate)(d, 48000.0, ptr::null(), ptr::null()) };
        assert!(!handle.is_null());
        unsafe { (d.cleanup)(handle) };
    }

    #[test]
    fn test_instantiate_reads_features() {
        let d = descriptor();
        let uri = c"http://lv2plug.in/ns/ext/urid#map";
        let feature = LV2Feature {
            uri: uri.as_ptr(),
            data: ptr::null_mut(),
        };
        let features: [*const LV2Feature; 2] = [&feature, ptr::null()];
        let bundle = c"/nonexistent/jackinsert.lv2/";

        let handle =
            unsafe { (d.instantiate)(d, 48000.0, bundle.as_ptr(), features.as_ptr()) };
        assert!(!handle.is_null());
        let plugin = unsafe { plugin(handle) }.unwrap();
        assert_eq!(plugin.config(), &BinderConfig::default());
        assert_eq!(plugin.sample_rate, 48000.0);
        unsafe { (d.cleanup)(handle) };
    }

    #[test]
    fn test_null_handle_is_ignored() {
        let d = descriptor();
        let mut buf = [0.0f32; 4];
        unsafe {
            (d.connect_port)(ptr::null_mut(), 0, buf.as_mut_ptr() as *mut c_void);
            (d.activate.unwrap())(ptr::null_mut());
            (d.run)(ptr::null_mut(), 4);
            (d.deactivate.unwrap())(ptr::null_mut());
            (d.cleanup)(ptr::null_mut());
        }
    }

    #[test]
    fn test_host_lifecycle() {
        let daemon = MockDaemon::with_sooperlooper();
        let d = descriptor();
        let handle = handle_with(&daemon);

        let mut bufs = [[0.0f32; 64]; PortIndex::COUNT];
        for (port, buf) in bufs.iter_mut().enumerate() {
            for (i, sample) in buf.iter_mut().enumerate() {
                *sample = port as f32 * 100.0 + i as f32;
            }
        }
        let expected = bufs;

        unsafe {
            for (port, buf) in bufs.iter_mut().enumerate() {
                (d.connect_port)(handle, port as u32, buf.as_mut_ptr() as *mut c_void);
            }
            (d.activate.unwrap())(handle);
            (d.run)(handle, 64);
        }

        assert_eq!(bufs[PortIndex::SendLeft as usize], expected[0]);
        assert_eq!(bufs[PortIndex::SendRight as usize], expected[1]);
        assert_eq!(bufs[PortIndex::OutputLeft as usize], expected[6]);
        assert_eq!(bufs[PortIndex::OutputRight as usize], expected[7]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !unsafe { plugin(handle) }.unwrap().is_bound() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(unsafe { plugin(handle) }.unwrap().is_bound());

        unsafe {
            for _ in 0..20 {
                (d.run)(handle, 64);
            }
            (d.deactivate.unwrap())(handle);
            (d.cleanup)(handle);
        }

        // "Connecting JACK ports" is only ever logged by the first attempt
        assert_eq!(daemon.open_count(), 1);
        assert_eq!(daemon.links().len(), 4);
    }
}
