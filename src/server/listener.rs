use std::io;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use socket2::{Domain, Protocol, Socket, Type};

/// Pending-connection queue length for each listener.
pub const BACKLOG: i32 = libc::SOMAXCONN;

/// Non-blocking listener on `addr` that shares the port with every other
/// listener bound the same way, so the kernel spreads connections across them.
pub fn bind_listener(addr: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.set_nodelay(true)?;
    set_quickack(&socket)?;

    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    Ok(socket)
}

/// Tune an accepted connection for one small request and one small response.
pub fn prepare_connection(socket: &Socket) -> io::Result<()> {
    socket.set_nonblocking(true)?;
    socket.set_nodelay(true)?;
    set_quickack(socket)
}

// TCP_QUICKACK is not exposed by socket2
fn set_quickack(socket: &Socket) -> io::Result<()> {
    let enabled: libc::c_int = 1;
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_QUICKACK,
            &enabled as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
