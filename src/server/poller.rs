use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Caller-chosen value echoed back with every event for a registration.
pub type Token = u64;

/// What a registration waits for and how readiness is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub readable: bool,
    pub writable: bool,
    /// Report transitions only, not the level.
    pub edge: bool,
    /// Disarm after one event until re-registered.
    pub oneshot: bool,
    /// Wake a single waiter when several watch the same socket.
    pub exclusive: bool,
}

impl Interest {
    /// Listening sockets.
    pub const ACCEPT: Interest = Interest {
        readable: true,
        writable: false,
        edge: true,
        oneshot: false,
        exclusive: true,
    };

    /// A connection waiting for (more of) its request.
    pub const READ_ONCE: Interest = Interest {
        readable: true,
        writable: false,
        edge: true,
        oneshot: true,
        exclusive: false,
    };

    /// A connection whose response did not fit the socket buffer.
    pub const WRITE_ONCE: Interest = Interest {
        readable: false,
        writable: true,
        edge: true,
        oneshot: true,
        exclusive: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    /// Peer hung up (fully or its write half).
    pub closed: bool,
    pub error: bool,
}

/// OS readiness notification facility.
///
/// Registrations may be added from one thread while another blocks in
/// `wait`; implementations must allow that.
pub trait Poller: Send + Sync {
    fn register(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()>;

    /// Change or re-arm an existing registration.
    fn reregister(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()>;

    fn deregister(&self, fd: RawFd) -> io::Result<()>;

    /// Block until at least one event is ready or `timeout` elapses, then
    /// replace the contents of `events` with at most `capacity` events.
    /// An interrupted wait returns zero events.
    fn wait(&self, events: &mut Vec<Event>, capacity: usize, timeout: Option<Duration>) -> io::Result<usize>;
}
