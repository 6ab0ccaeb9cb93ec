//! Level-triggered completion signal backed by Linux `eventfd(2)`.
//!
//! Workers add one unit per finished request; the consumer's poll loop sees the
//! descriptor as readable until [`Notifier::acknowledge`] reads the counter back
//! to zero. One wake-up may therefore stand for many results.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::eventfd::{EfdFlags, EventFd};

use crate::error::Result;

/// Longest single `poll(2)` slice, in milliseconds.
const MAX_POLL_MS: u16 = u16::MAX;

#[derive(Debug)]
pub struct Notifier {
    fd: EventFd,
}

impl Notifier {
    pub fn new() -> Result<Self> {
        let fd = EventFd::from_value_and_flags(0, EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)?;
        Ok(Self { fd })
    }

    /// Adds one unit to the counter, making the descriptor readable.
    pub fn signal(&self) -> Result<()> {
        self.fd.write(1)?;
        Ok(())
    }

    /// Resets the counter to zero. Returns how many signals were pending.
    pub fn acknowledge(&self) -> Result<u64> {
        match self.fd.read() {
            Ok(count) => Ok(count),
            Err(Errno::EAGAIN) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// Waits up to `timeout` for the descriptor to become readable.
    ///
    /// For hosts without their own event loop; does not acknowledge. Timeouts
    /// longer than `poll(2)` accepts in one call are waited out in slices.
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(u128::from(MAX_POLL_MS)) as u16;
            match poll(&mut fds, PollTimeout::from(millis)) {
                Ok(ready) if ready > 0 => return Ok(true),
                Ok(_) if remaining.as_millis() <= u128::from(MAX_POLL_MS) => return Ok(false),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> Result<bool> {
        self.wait(Duration::ZERO)
    }
}

impl AsFd for Notifier {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for Notifier {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_fd().as_raw_fd()
    }
}
