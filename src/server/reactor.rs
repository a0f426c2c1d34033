use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam::channel::{unbounded, Receiver, Sender};
use socket2::Socket;
use tracing::{debug, error, info, warn};
use crate::api::router::Router;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::server::connection::{Connection, Limits, Step};
use crate::server::epoll::Epoll;
use crate::server::listener::{bind_listener, prepare_connection};
use crate::server::poller::{Event, Interest, Poller, Token};

const LISTENER_TOKEN: Token = u64::MAX;
const ACCEPT_EVENTS: usize = 64;

/// Listening sockets bound and ready, one per reactor pair.
pub struct Server {
    pub config: Config,
    pub router: Arc<Router>,
    listeners: Vec<Socket>,
    local_addr: SocketAddr,
}

/// Handle to the running reactor threads.
pub struct RunningServer {
    pub local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Server {
    /// Bind `config.reactors` port-sharing listeners. The first bind resolves
    /// an ephemeral port; the rest join it.
    pub fn bind(config: Config, router: Arc<Router>) -> Result<Server> {
        let slots = config.reactors.max(1);

        let first = bind_listener(config.listen_addr).map_err(|e| bind_error(config.listen_addr, e))?;
        let local_addr = first
            .local_addr()?
            .as_socket()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "Listener has no inet address".to_string()))?;

        let mut listeners = vec![first];
        for _ in 1..slots {
            listeners.push(bind_listener(local_addr).map_err(|e| bind_error(local_addr, e))?);
        }

        Ok(Server { config, router, listeners, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start every reactor pair on its own threads and return immediately.
    pub fn start(self) -> Result<RunningServer> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let limits = Limits {
            max_request_bytes: self.config.max_request_bytes,
            read_chunk_bytes: self.config.read_chunk_bytes,
            timeout: self.config.connection_timeout,
        };
        let tick = self.config.poll_tick;
        let max_events = self.config.max_events;
        let reactors = self.listeners.len();
        let mut threads = Vec::with_capacity(reactors * 2);

        for (slot, listener) in self.listeners.into_iter().enumerate() {
            let connection_poller = Arc::new(Epoll::new()?);
            let accept_poller = Epoll::new()?;
            accept_poller.register(listener.as_raw_fd(), LISTENER_TOKEN, Interest::ACCEPT)?;

            let (handoff, incoming) = unbounded();

            let connections = ConnectionLoop {
                slot,
                poller: connection_poller.clone(),
                incoming,
                router: self.router.clone(),
                limits,
                tick,
                max_events,
                shutdown: shutdown.clone(),
            };
            threads.push(spawn(format!("conn-{}", slot), move || connections.run())?);

            let acceptor = AcceptLoop {
                slot,
                listener,
                poller: accept_poller,
                connection_poller,
                handoff,
                timeout: limits.timeout,
                tick,
                shutdown: shutdown.clone(),
            };
            threads.push(spawn(format!("accept-{}", slot), move || acceptor.run())?);
        }

        info!(addr = %self.local_addr, reactors, "Server is listening");

        Ok(RunningServer {
            local_addr: self.local_addr,
            shutdown,
            threads,
        })
    }

    /// Start and block until every reactor thread exits.
    pub fn run(self) -> Result<()> {
        self.start()?.join();
        Ok(())
    }
}

impl RunningServer {
    /// Ask every loop to exit at its next tick and wait for them.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        self.join();
    }

    pub fn join(self) {
        for handle in self.threads {
            if handle.join().is_err() {
                error!("Reactor thread panicked");
            }
        }
    }
}

fn spawn<F>(name: String, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(body)
        .map_err(Error::from)
}

fn bind_error(addr: SocketAddr, err: io::Error) -> Error {
    Error::new(ErrorKind::Io, format!("Cannot listen on {}: {}", addr, err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFailure {
    /// Backlog empty.
    Drained,
    /// This connection is gone; keep accepting.
    Skip,
    /// Out of descriptors or memory; connections may still be queued.
    RetryLater,
}

fn accept_failure(err: &io::Error) -> AcceptFailure {
    match err.kind() {
        io::ErrorKind::WouldBlock => AcceptFailure::Drained,
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted => AcceptFailure::Skip,
        _ if err.raw_os_error() == Some(libc::EPROTO) => AcceptFailure::Skip,
        _ => AcceptFailure::RetryLater,
    }
}

/// Accepts connections from one listener and hands them to its paired
/// connection loop.
struct AcceptLoop<P: Poller> {
    slot: usize,
    listener: Socket,
    poller: P,
    connection_poller: Arc<P>,
    handoff: Sender<Connection>,
    timeout: Duration,
    tick: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<P: Poller> AcceptLoop<P> {
    fn run(self) {
        let mut events = Vec::with_capacity(ACCEPT_EVENTS);
        let mut backlog_pending = false;

        while !self.shutdown.load(Ordering::Acquire) {
            if let Err(err) = self.poller.wait(&mut events, ACCEPT_EVENTS, Some(self.tick)) {
                error!(slot = self.slot, error = %err, "Accept wait failed");
                break;
            }
            // Edge-triggered: a backlog left behind by a failed accept raises
            // no new event, so it is retried on the next tick instead
            if events.is_empty() && !backlog_pending {
                continue;
            }

            backlog_pending = self.drain_backlog();
        }

        debug!(slot = self.slot, "Acceptor stopped");
    }

    /// Accept until the backlog is empty. Returns true when an accept failed
    /// with connections possibly still queued.
    fn drain_backlog(&self) -> bool {
        loop {
            match self.listener.accept() {
                Ok((socket, _peer)) => self.admit(socket),
                Err(e) => match accept_failure(&e) {
                    AcceptFailure::Drained => return false,
                    AcceptFailure::Skip => continue,
                    AcceptFailure::RetryLater => {
                        warn!(slot = self.slot, error = %e, "Accept failed, retrying next tick");
                        return true;
                    }
                },
            }
        }
    }

    fn admit(&self, socket: Socket) {
        if let Err(err) = prepare_connection(&socket) {
            debug!(slot = self.slot, error = %err, "Dropping connection");
            return;
        }

        let connection = Connection::new(socket, Instant::now() + self.timeout);
        let (fd, token) = (connection.fd(), connection.token());

        // Hand off before registering so the connection loop knows the token
        // by the time its first event can arrive.
        if self.handoff.send(connection).is_err() {
            return;
        }
        if let Err(err) = self.connection_poller.register(fd, token, Interest::READ_ONCE) {
            warn!(slot = self.slot, error = %err, "Cannot register connection");
        }
    }
}

/// Services every connection accepted by its paired acceptor.
struct ConnectionLoop<P: Poller> {
    slot: usize,
    poller: Arc<P>,
    incoming: Receiver<Connection>,
    router: Arc<Router>,
    limits: Limits,
    tick: Duration,
    max_events: usize,
    shutdown: Arc<AtomicBool>,
}

impl<P: Poller> ConnectionLoop<P> {
    fn run(self) {
        let mut connections: HashMap<Token, Connection> = HashMap::new();
        let mut events: Vec<Event> = Vec::with_capacity(self.max_events);
        let mut next_sweep = Instant::now() + self.tick;

        while !self.shutdown.load(Ordering::Acquire) {
            if let Err(err) = self.poller.wait(&mut events, self.max_events, Some(self.tick)) {
                error!(slot = self.slot, error = %err, "Connection wait failed");
                break;
            }

            for connection in self.incoming.try_iter() {
                connections.insert(connection.token(), connection);
            }

            for event in &events {
                let Some(connection) = connections.get_mut(&event.token) else {
                    continue;
                };

                let step = if event.error || (event.closed && !event.readable && !event.writable) {
                    Step::Close
                } else {
                    connection.on_ready(&self.router, &self.limits)
                };

                match step {
                    Step::Rearm(interest) => {
                        if let Err(err) = self.poller.reregister(connection.fd(), event.token, interest) {
                            debug!(slot = self.slot, error = %err, "Cannot re-arm connection");
                            self.close(&mut connections, event.token);
                        }
                    }
                    Step::Close => self.close(&mut connections, event.token),
                }
            }

            let now = Instant::now();
            if now >= next_sweep {
                let expired: Vec<Token> = connections
                    .iter()
                    .filter(|(_, connection)| connection.is_expired(now))
                    .map(|(&token, _)| token)
                    .collect();
                for &token in &expired {
                    self.close(&mut connections, token);
                }
                if !expired.is_empty() {
                    debug!(slot = self.slot, expired = expired.len(), "Closed connections past their deadline");
                }
                next_sweep = now + self.tick;
            }
        }

        debug!(slot = self.slot, open = connections.len(), "Connection loop stopped");
    }

    fn close(&self, connections: &mut HashMap<Token, Connection>, token: Token) {
        if let Some(connection) = connections.remove(&token) {
            if let Err(err) = self.poller.deregister(connection.fd()) {
                debug!(slot = self.slot, error = %err, "Cannot deregister connection");
            }
        }
    }
}
