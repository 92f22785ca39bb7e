use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Block while `atomic == expected`, for at most `timeout`.
///
/// Returns early on wake, on a changed value, or spuriously; callers re-check
/// their condition.
#[cfg(target_os = "linux")]
pub fn futex_wait_timeout(atomic: &AtomicU32, expected: u32, timeout: Duration) {
    use std::sync::atomic::Ordering;

    // Check condition first to avoid syscall if possible
    if atomic.load(Ordering::Relaxed) != expected || timeout.is_zero() {
        return;
    }

    let ts = libc::timespec {
        tv_sec: timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long,
    };

    unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            &ts as *const libc::timespec,
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

/// Wake every thread parked on `atomic`.
#[cfg(target_os = "linux")]
pub fn futex_wake_all(atomic: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            atomic as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            i32::MAX,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wait_timeout(atomic: &AtomicU32, expected: u32, timeout: Duration) {
    use std::sync::atomic::Ordering;

    // Fallback for non-Linux: short sleep bounded by the timeout
    if atomic.load(Ordering::Relaxed) == expected {
        std::thread::sleep(timeout.min(Duration::from_millis(1)));
    }
}

#[cfg(not(target_os = "linux"))]
pub fn futex_wake_all(_atomic: &AtomicU32) {
    // No-op on non-Linux
}
