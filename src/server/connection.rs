use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};
use bytes::Bytes;
use socket2::Socket;
use crate::api::router::Router;
use crate::server::http::{self, Parsed, Reply};
use crate::server::poller::{Interest, Token};

/// Per-connection I/O limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_request_bytes: usize,
    pub read_chunk_bytes: usize,
    pub timeout: Duration,
}

/// Where a connection is in its single request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Accepted and registered; request bytes accumulate here.
    Reading,
    /// Response rendered; `written` bytes already sent.
    Responding { response: Bytes, written: usize },
}

/// What the event loop must do with the connection after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rearm(Interest),
    Close,
}

/// One accepted socket serving exactly one request. Dropping it closes the
/// socket, which also removes it from its poller.
pub struct Connection {
    pub socket: Socket,
    pub deadline: Instant,
    pub state: State,
    buffer: Vec<u8>,
}

impl Connection {
    pub fn new(socket: Socket, deadline: Instant) -> Self {
        Connection {
            socket,
            deadline,
            state: State::Reading,
            buffer: Vec::new(),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    pub fn token(&self) -> Token {
        self.fd() as Token
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Advance the state machine after a readiness event.
    pub fn on_ready(&mut self, router: &Router, limits: &Limits) -> Step {
        match self.state {
            State::Reading => self.on_readable(router, limits),
            State::Responding { .. } => self.flush(),
        }
    }

    fn on_readable(&mut self, router: &Router, limits: &Limits) -> Step {
        let eof = match self.fill(limits) {
            Ok(eof) => eof,
            Err(_) => return Step::Close,
        };

        if self.buffer.len() > limits.max_request_bytes {
            return self.respond(Reply::bad_request());
        }

        let reply = match http::parse_request(&self.buffer) {
            Ok(Parsed::Complete(request)) => router.dispatch(&request),
            Ok(Parsed::Partial) => {
                if eof {
                    return Step::Close;
                }
                match http::declared_length(&self.buffer) {
                    Some(length) if length > limits.max_request_bytes => Reply::bad_request(),
                    _ => return Step::Rearm(Interest::READ_ONCE),
                }
            }
            Err(_) => Reply::bad_request(),
        };

        self.respond(reply)
    }

    /// Read until the socket would block, the peer closes, or the request
    /// grows past the limit. Returns whether the peer closed.
    fn fill(&mut self, limits: &Limits) -> io::Result<bool> {
        let chunk = limits.read_chunk_bytes.max(1);

        loop {
            let start = self.buffer.len();
            self.buffer.resize(start + chunk, 0);

            match (&self.socket).read(&mut self.buffer[start..]) {
                Ok(0) => {
                    self.buffer.truncate(start);
                    return Ok(true);
                }
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    if self.buffer.len() > limits.max_request_bytes {
                        return Ok(false);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.buffer.truncate(start);
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.buffer.truncate(start);
                }
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    fn respond(&mut self, reply: Reply) -> Step {
        self.buffer = Vec::new();
        self.state = State::Responding {
            response: reply.render(),
            written: 0,
        };
        self.flush()
    }

    /// Write what is left of the response. Finished or failed, the
    /// connection closes; only a full socket buffer keeps it open.
    fn flush(&mut self) -> Step {
        let State::Responding { response, written } = &mut self.state else {
            return Step::Close;
        };

        while *written < response.len() {
            match (&self.socket).write(&response[*written..]) {
                Ok(0) => return Step::Close,
                Ok(n) => *written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Step::Rearm(Interest::WRITE_ONCE);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return Step::Close,
            }
        }

        Step::Close
    }
}
