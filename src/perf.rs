//! Perf sampler (component C).
//!
//! Opens cgroup-scoped hardware cache-miss/cache-reference counters for a
//! bounded window and returns the raw counts plus the enabled/running
//! times needed to scale them. One call samples exactly one cgroup;
//! multiplexing across siblings is the dynamic controller's job.

use crate::error::{CacheLimitError, Result};
use perf_event_open_sys::bindings::{
    perf_event_attr, perf_hw_id_PERF_COUNT_HW_CACHE_MISSES, perf_hw_id_PERF_COUNT_HW_CACHE_REFERENCES,
    perf_type_id_PERF_TYPE_HARDWARE,
};
use perf_event_open_sys::{ioctls, perf_event_open};
use std::ffi::CString;
use std::path::Path;
use std::time::Duration;

const PERF_FORMAT_TOTAL_TIME_ENABLED: u64 = 1 << 0;
const PERF_FORMAT_TOTAL_TIME_RUNNING: u64 = 1 << 1;
const PERF_FLAG_PID_CGROUP: libc::c_ulong = 1 << 2;

/// Result of sampling one hardware event over the configured window.
#[derive(Debug, Clone, Copy, Default)]
struct RawCount {
    value: u64,
    time_enabled: u64,
    time_running: u64,
}

/// Cache-miss sample for one cgroup over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfSample {
    pub misses: u64,
    pub references: u64,
    pub enabled_ns: u64,
    pub running_ns: u64,
}

/// An owned file descriptor, closed on drop so no exit path (including an
/// error return partway through sampling) leaks a perf or cgroup fd.
struct OwnedFd(libc::c_int);

impl Drop for OwnedFd {
    fn drop(&mut self) {
        if self.0 >= 0 {
            unsafe {
                libc::close(self.0);
            }
        }
    }
}

/// Whether this platform exposes the hardware cache-miss event the
/// dynamic controller needs. Probes by attempting to open (and
/// immediately close) a self-scoped `CACHE_MISSES` counter.
pub fn hw_support() -> bool {
    let mut attr = new_attr(perf_hw_id_PERF_COUNT_HW_CACHE_MISSES);
    let fd = unsafe { perf_event_open(&mut attr, 0, -1, -1, 0) };
    if fd >= 0 {
        unsafe {
            libc::close(fd);
        }
        true
    } else {
        false
    }
}

fn new_attr(config: u32) -> perf_event_attr {
    let mut attr: perf_event_attr = unsafe { std::mem::zeroed() };
    attr.type_ = perf_type_id_PERF_TYPE_HARDWARE;
    attr.size = std::mem::size_of::<perf_event_attr>() as u32;
    attr.config = config as u64;
    attr.read_format = PERF_FORMAT_TOTAL_TIME_ENABLED | PERF_FORMAT_TOTAL_TIME_RUNNING;
    attr.set_disabled(1);
    attr
}

fn open_cgroup_fd(cgroup_path: &Path) -> Result<OwnedFd> {
    let c_path = CString::new(cgroup_path.as_os_str().to_string_lossy().as_bytes()).map_err(|e| {
        CacheLimitError::Io {
            path: cgroup_path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        }
    })?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY) };
    if fd < 0 {
        return Err(CacheLimitError::Io {
            path: cgroup_path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(OwnedFd(fd))
}

fn open_cgroup_event(cgroup_fd: &OwnedFd, config: u32) -> Result<OwnedFd> {
    let mut attr = new_attr(config);
    let fd = unsafe { perf_event_open(&mut attr, cgroup_fd.0, -1, -1, PERF_FLAG_PID_CGROUP) };
    if fd < 0 {
        return Err(CacheLimitError::PerfUnsupported(format!(
            "perf_event_open failed for config {config:#x}: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(OwnedFd(fd))
}

fn enable(fd: &OwnedFd) -> Result<()> {
    unsafe { ioctls::ENABLE(fd.0) }.map(|_| ()).map_err(|e| CacheLimitError::Io {
        path: std::path::PathBuf::from(format!("perf fd {}", fd.0)),
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    })
}

fn disable(fd: &OwnedFd) -> Result<()> {
    unsafe { ioctls::DISABLE(fd.0) }.map(|_| ()).map_err(|e| CacheLimitError::Io {
        path: std::path::PathBuf::from(format!("perf fd {}", fd.0)),
        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    })
}

fn read_count(fd: &OwnedFd) -> Result<RawCount> {
    let mut raw = RawCount::default();
    let buf = &mut raw as *mut RawCount as *mut libc::c_void;
    let n = unsafe { libc::read(fd.0, buf, std::mem::size_of::<RawCount>()) };
    if n != std::mem::size_of::<RawCount>() as isize {
        return Err(CacheLimitError::Io {
            path: std::path::PathBuf::from(format!("perf fd {}", fd.0)),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(raw)
}

/// Sample `CACHE_MISSES` and `CACHE_REFERENCES` for `cgroup_path` over
/// `window`: open both counters disabled, enable, sleep, disable, read,
/// close — on every exit path, including an early error return.
pub fn sample_cgroup(cgroup_path: &Path, window: Duration) -> Result<PerfSample> {
    let cgroup_fd = open_cgroup_fd(cgroup_path)?;
    let misses_fd = open_cgroup_event(&cgroup_fd, perf_hw_id_PERF_COUNT_HW_CACHE_MISSES)?;
    let refs_fd = open_cgroup_event(&cgroup_fd, perf_hw_id_PERF_COUNT_HW_CACHE_REFERENCES)?;

    enable(&misses_fd)?;
    enable(&refs_fd)?;

    std::thread::sleep(window);

    disable(&misses_fd)?;
    disable(&refs_fd)?;

    let misses = read_count(&misses_fd)?;
    let refs = read_count(&refs_fd)?;

    Ok(PerfSample {
        misses: misses.value,
        references: refs.value,
        enabled_ns: misses.time_enabled,
        running_ns: misses.time_running,
    })
}
