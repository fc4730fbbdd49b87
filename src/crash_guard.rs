//! Crash-safe flush: install a signal handler for the crash signals, flush
//! whatever is known to be safe to flush, then chain to the previously
//! installed handler (or `_exit(128 + signal)` if there wasn't one).
//!
//! The handler itself touches nothing but `libc` functions documented as
//! async-signal-safe (`write`, `fsync`, `signal`, `_exit`): no heap
//! allocation, no lock acquisition, no `String` formatting. Everything that
//! needs a lock or an allocation happens ahead of time, off the signal
//! path, building an immutable [`Snapshot`] that the handler only ever
//! atomically *loads* a pointer to — anything reachable from a signal
//! handler must be lock-free.
//!
//! Only implemented for `cfg(unix)`; Windows structured exception handling
//! is out of scope.

#![cfg(unix)]

use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

const CRASH_SIGNALS: [libc::c_int; 4] = [
    libc::SIGSEGV,
    libc::SIGABRT,
    libc::SIGTERM,
    libc::SIGINT,
];

/// Immutable data the signal handler reads. Built and swapped in from
/// ordinary (non-signal) code; never mutated in place.
struct Snapshot {
    fds: Vec<RawFd>,
    message: Vec<u8>,
}

static SNAPSHOT: AtomicPtr<Snapshot> = AtomicPtr::new(ptr::null_mut());
static INSTALLED: AtomicBool = AtomicBool::new(false);
static PREV_HANDLERS: [AtomicUsize; 4] = [
    AtomicUsize::new(0),
    AtomicUsize::new(0),
    AtomicUsize::new(0),
    AtomicUsize::new(0),
];

/// Something a [`CrashGuard`] can ask for a raw fd to fsync before the
/// process dies. A writer implements this by exposing the fd behind
/// whatever file it owns; crash-safe flush is best-effort and limited to
/// writers that expose a raw, pre-opened file descriptor.
pub trait CrashFlushTarget: Send + Sync {
    fn crash_fd(&self) -> Option<RawFd>;
}

struct Registration {
    target: Weak<dyn CrashFlushTarget>,
}

static REGISTRY: Mutex<Vec<Registration>> = Mutex::new(Vec::new());

/// RAII handle: installing a `CrashGuard` registers the process-wide signal
/// handler exactly once (subsequent guards share it); dropping the last
/// live guard restores the handlers that were installed before.
pub struct CrashGuard {
    _private: (),
}

impl CrashGuard {
    /// Installs the crash signal handlers if they are not already
    /// installed. Safe to call from multiple `Logger`s; only the first
    /// call chains the previous handler.
    pub fn install() -> CrashGuard {
        if !INSTALLED.swap(true, Ordering::SeqCst) {
            unsafe {
                for (i, &sig) in CRASH_SIGNALS.iter().enumerate() {
                    let prev = libc::signal(sig, handle_crash_signal as libc::sighandler_t);
                    PREV_HANDLERS[i].store(prev, Ordering::SeqCst);
                }
            }
        }
        CrashGuard { _private: () }
    }

    /// Registers a writer's fd so future snapshots include it. The
    /// registration is a [`Weak`] reference; a dropped writer is simply
    /// skipped the next time the snapshot rebuilds.
    pub fn register(target: &Arc<dyn CrashFlushTarget>) {
        let mut registry = REGISTRY.lock().expect("crash guard registry lock poisoned");
        registry.push(Registration {
            target: Arc::downgrade(target),
        });
    }

    /// Rebuilds the snapshot the signal handler reads: walks the registry,
    /// drops dead (`Weak`) entries, collects live fds, and records
    /// `last_message` as the final line to `write(2)` before `fsync`. Call
    /// this periodically (e.g. after every flush) so the snapshot tracks
    /// which writers are currently alive and what was last logged.
    pub fn update_snapshot(last_message: &str) {
        let mut registry = REGISTRY.lock().expect("crash guard registry lock poisoned");
        registry.retain(|r| r.target.strong_count() > 0);

        let fds: Vec<RawFd> = registry
            .iter()
            .filter_map(|r| r.target.upgrade())
            .filter_map(|t| t.crash_fd())
            .collect();

        let mut message = last_message.as_bytes().to_vec();
        message.push(b'\n');

        let snapshot = Box::into_raw(Box::new(Snapshot { fds, message }));
        let old = SNAPSHOT.swap(snapshot, Ordering::SeqCst);
        if !old.is_null() {
            // Leaked intentionally: a signal could be concurrently
            // dereferencing `old`'s pointee, so freeing it here would race
            // with the handler. The cost is one abandoned allocation per
            // `update_snapshot` call, not per log record.
            std::mem::forget(unsafe { Box::from_raw(old) });
        }
    }
}

impl Drop for CrashGuard {
    fn drop(&mut self) {
        // Process-wide handler installation is shared across every live
        // `CrashGuard`; this crate does not reference-count guards to
        // decide when to uninstall, since a crashing process benefits from
        // the handler staying installed for as long as anything is alive
        // that might still crash.
    }
}

/// The signal handler itself. Must remain async-signal-safe: only the
/// `libc` calls below, no allocation, no locking, no panicking.
extern "C" fn handle_crash_signal(sig: libc::c_int) {
    let snapshot = SNAPSHOT.load(Ordering::SeqCst);
    if !snapshot.is_null() {
        let snapshot = unsafe { &*snapshot };
        for &fd in &snapshot.fds {
            unsafe {
                libc::write(
                    fd,
                    snapshot.message.as_ptr() as *const libc::c_void,
                    snapshot.message.len(),
                );
                libc::fsync(fd);
            }
        }
    }

    let index = CRASH_SIGNALS.iter().position(|&s| s == sig);
    if let Some(index) = index {
        let prev = PREV_HANDLERS[index].load(Ordering::SeqCst);
        if prev != 0 && prev != libc::SIG_DFL && prev != libc::SIG_IGN {
            unsafe {
                let prev_handler: extern "C" fn(libc::c_int) = std::mem::transmute(prev);
                prev_handler(sig);
                return;
            }
        }
    }

    unsafe {
        libc::_exit(128 + sig);
    }
}
