use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Wait for `fd` to become readable using `select()`.
///
/// Unlike a plain retry loop, an interrupted wait is reported as "not ready":
/// the daemon's signal handlers only set flags, and the caller must get back
/// to its loop to look at them.
pub(crate) fn readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    unsafe {
        let mut read_fds: libc::fd_set = std::mem::zeroed();
        libc::FD_ZERO(&mut read_fds);
        libc::FD_SET(fd, &mut read_fds);

        let mut tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        let ret = libc::select(
            fd + 1,
            &mut read_fds,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut tv,
        );
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ret > 0)
    }
}
