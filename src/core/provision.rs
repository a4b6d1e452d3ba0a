//! # Listener provisioning.
//!
//! Creates, binds and (for stream services) marks listening each service
//! socket, then attaches it to the owning descriptor. Provisioning happens
//! once at startup; a service whose socket cannot be provisioned is left
//! without a listener and is simply never dispatched.
//!
//! ## Socket disciplines
//! - **Stream**: the listening socket is converted to a nonblocking tokio
//!   [`TcpListener`]. Accepted connections are converted back to blocking
//!   before being handed to a worker.
//! - **Datagram**: the socket itself is handed to workers, so it must stay
//!   blocking. `O_NONBLOCK` lives in the file description and would leak
//!   through `dup()` into the worker's stdio. The loop therefore only
//!   *watches* the blocking socket through an [`AsyncFd`] registered for
//!   read interest and never reads from it.

use std::io;
use std::net::UdpSocket as StdUdpSocket;
use std::os::fd::{AsRawFd, OwnedFd};

use futures::FutureExt;
use nix::sys::socket::{
    bind, listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag, SockProtocol,
    SockType, SockaddrIn,
};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::net::TcpListener;

use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{ServiceDescriptor, Transport};

/// A provisioned, bound service socket.
#[derive(Debug)]
pub enum Listener {
    /// Nonblocking listening socket; connections are accepted by the loop.
    Stream(TcpListener),
    /// Blocking socket watched for readability; workers read it directly.
    Datagram(UdpEndpoint),
}

impl Listener {
    /// Raw descriptor number, for diagnostics only.
    pub fn raw_fd(&self) -> i32 {
        match self {
            Listener::Stream(l) => l.as_raw_fd(),
            Listener::Datagram(e) => e.inner.as_raw_fd(),
        }
    }
}

/// Readiness watcher around a blocking datagram socket.
#[derive(Debug)]
pub struct UdpEndpoint {
    inner: AsyncFd<StdUdpSocket>,
}

impl UdpEndpoint {
    fn new(socket: StdUdpSocket) -> io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::with_interest(socket, Interest::READABLE)?,
        })
    }

    /// Resolves when the socket has a readable datagram queued.
    ///
    /// The readiness guard is dropped without clearing, so readiness is
    /// retained until [`UdpEndpoint::resync`] decides otherwise.
    pub async fn wait_readable(&self) -> io::Result<()> {
        let _guard = self.inner.readable().await?;
        Ok(())
    }

    /// Reconciles cached readiness with the actual receive queue.
    ///
    /// Epoll reports edges, but the loop never drains this socket itself;
    /// a worker does. If the worker consumed the queue, the cached edge is
    /// stale and must be cleared or the loop would spin dispatching into
    /// an empty socket. If datagrams are still queued the edge is kept so
    /// the next wait fires immediately.
    pub fn resync(&self) {
        if self.has_queued() {
            return;
        }
        if let Some(Ok(mut guard)) = self.inner.readable().now_or_never() {
            guard.clear_ready();
        }
    }

    /// Non-destructive check for a queued datagram.
    fn has_queued(&self) -> bool {
        let mut probe = [0u8; 1];
        let n = unsafe {
            libc::recv(
                self.inner.as_raw_fd(),
                probe.as_mut_ptr().cast(),
                probe.len(),
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };
        n >= 0
    }

    /// A blocking clone of the socket for a worker's stdio.
    pub fn worker_socket(&self) -> io::Result<StdUdpSocket> {
        self.inner.get_ref().try_clone()
    }
}

/// Provisions a listener for every service, attaching on success.
///
/// Failures are published as [`EventKind::ProvisionFailed`] and leave the
/// descriptor without a listener; the remaining services proceed.
pub fn provision_all(services: &mut [ServiceDescriptor], backlog: i32, bus: &Bus) {
    for svc in services.iter_mut() {
        match provision_one(svc.transport(), svc.port(), backlog) {
            Ok(listener) => {
                bus.publish(
                    Event::now(EventKind::ServiceProvisioned)
                        .with_service(svc.name())
                        .with_port(svc.port())
                        .with_fd(listener.raw_fd()),
                );
                svc.attach_listener(listener);
            }
            Err(err) => {
                bus.publish(
                    Event::now(EventKind::ProvisionFailed)
                        .with_service(svc.name())
                        .with_port(svc.port())
                        .with_reason(err.to_string()),
                );
            }
        }
    }
}

/// Creates one bound socket for the given transport and port.
pub(crate) fn provision_one(
    transport: Transport,
    port: u16,
    backlog: i32,
) -> Result<Listener, ServiceError> {
    let (sock_type, protocol) = match transport {
        Transport::Stream => (SockType::Stream, SockProtocol::Tcp),
        Transport::Datagram => (SockType::Datagram, SockProtocol::Udp),
    };

    let fd: OwnedFd = socket(AddressFamily::Inet, sock_type, SockFlag::SOCK_CLOEXEC, Some(protocol))
        .map_err(provision_errno)?;
    setsockopt(&fd, sockopt::ReuseAddr, &true).map_err(provision_errno)?;

    let addr = SockaddrIn::new(0, 0, 0, 0, port);
    bind(fd.as_raw_fd(), &addr).map_err(provision_errno)?;

    match transport {
        Transport::Stream => {
            let backlog = Backlog::new(backlog).map_err(provision_errno)?;
            listen(&fd, backlog).map_err(provision_errno)?;
            let std_listener = std::net::TcpListener::from(fd);
            std_listener
                .set_nonblocking(true)
                .map_err(|source| ServiceError::Provision { source })?;
            let listener = TcpListener::from_std(std_listener)
                .map_err(|source| ServiceError::Provision { source })?;
            Ok(Listener::Stream(listener))
        }
        Transport::Datagram => {
            let socket = StdUdpSocket::from(fd);
            let endpoint = UdpEndpoint::new(socket)
                .map_err(|source| ServiceError::Provision { source })?;
            Ok(Listener::Datagram(endpoint))
        }
    }
}

fn provision_errno(errno: nix::errno::Errno) -> ServiceError {
    ServiceError::Provision {
        source: io::Error::from_raw_os_error(errno as i32),
    }
}
