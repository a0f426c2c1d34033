use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;
use parking_lot::Mutex;
use crate::server::poller::{Event, Interest, Poller, Token};

/// `Poller` backed by Linux epoll.
pub struct Epoll {
    fd: OwnedFd,
    buffer: Mutex<Vec<libc::epoll_event>>,
}

impl Epoll {
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Epoll {
            // SAFETY: epoll_create1 returned a fresh descriptor we now own
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
            buffer: Mutex::new(Vec::new()),
        })
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: flags(interest),
            u64: token,
        };

        let rc = unsafe { libc::epoll_ctl(self.fd.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

fn flags(interest: Interest) -> u32 {
    let mut bits = 0u32;
    if interest.readable {
        bits |= libc::EPOLLIN as u32;
        // EPOLLEXCLUSIVE only tolerates IN/OUT/ET/WAKEUP
        if !interest.exclusive {
            bits |= libc::EPOLLRDHUP as u32;
        }
    }
    if interest.writable {
        bits |= libc::EPOLLOUT as u32;
    }
    if interest.edge {
        bits |= libc::EPOLLET as u32;
    }
    if interest.oneshot {
        bits |= libc::EPOLLONESHOT as u32;
    }
    if interest.exclusive {
        bits |= libc::EPOLLEXCLUSIVE as u32;
    }
    bits
}

impl Poller for Epoll {
    fn register(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, token, interest)
    }

    fn reregister(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, token, interest)
    }

    fn deregister(&self, fd: RawFd) -> io::Result<()> {
        // Pre-2.6.9 kernels insist on a non-null event even for DEL
        let mut event = libc::epoll_event { events: 0, u64: 0 };
        let rc = unsafe { libc::epoll_ctl(self.fd.as_raw_fd(), libc::EPOLL_CTL_DEL, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn wait(&self, events: &mut Vec<Event>, capacity: usize, timeout: Option<Duration>) -> io::Result<usize> {
        events.clear();
        let capacity = capacity.clamp(1, i32::MAX as usize);

        let mut buffer = self.buffer.lock();
        if buffer.len() < capacity {
            buffer.resize(capacity, libc::epoll_event { events: 0, u64: 0 });
        }

        let timeout_ms = match timeout {
            None => -1,
            Some(d) if d.is_zero() => 0,
            Some(d) => d.as_millis().clamp(1, i32::MAX as u128) as i32,
        };

        let ready = unsafe {
            libc::epoll_wait(self.fd.as_raw_fd(), buffer.as_mut_ptr(), capacity as i32, timeout_ms)
        };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }

        for raw in &buffer[..ready as usize] {
            // epoll_event is packed on x86_64: copy fields out, never borrow them
            let bits = raw.events;
            let token = raw.u64;
            events.push(Event {
                token,
                readable: bits & libc::EPOLLIN as u32 != 0,
                writable: bits & libc::EPOLLOUT as u32 != 0,
                closed: bits & (libc::EPOLLHUP | libc::EPOLLRDHUP) as u32 != 0,
                error: bits & libc::EPOLLERR as u32 != 0,
            });
        }

        Ok(events.len())
    }
}
