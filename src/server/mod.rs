//! Server context and listener setup
//!
//! The context is constructed once at startup and passed by `Arc` into every
//! request-scoped operation; nothing in it is mutated after construction.

use crate::config::Config;
use crate::handler::hooks::HookRegistry;
use crate::storage::ObjectStore;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

/// Shared per-process server state.
pub struct ServerContext {
    pub config: Config,
    /// Root directory local paths resolve under.
    pub root: PathBuf,
    /// Base URL requests are normalized against. Joining the raw request
    /// target onto this collapses dot segments before any filesystem lookup.
    pub base_url: Url,
    pub store: Arc<dyn ObjectStore>,
    pub hooks: HookRegistry,
}

impl ServerContext {
    /// Build the context from loaded configuration and the bound address.
    ///
    /// `addr` must come from the listener so that a randomly assigned port
    /// (configured port 0) is reflected in the normalization base.
    pub fn new(
        config: Config,
        addr: SocketAddr,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!(
            "http://{}:{}/",
            config.server.host,
            addr.port()
        ))?;
        let root = PathBuf::from(&config.server.root);
        Ok(Self {
            config,
            root,
            base_url,
            store,
            hooks: HookRegistry::with_default_hooks(),
        })
    }

    pub const fn verbose(&self) -> bool {
        self.config.logging.verbose
    }
}

/// Resolve the configured host/port to a socket address.
///
/// Hostnames such as `localhost` are resolved through the system resolver;
/// the first address wins.
pub fn resolve_addr(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    format!("{host}:{port}")
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no address found for {host}:{port}"),
            )
        })
}

/// Create a non-blocking `TcpListener` with `SO_REUSEADDR` enabled.
///
/// Reusing the address lets a restarted dev server rebind a port still in
/// TIME_WAIT. Binding port 0 picks a random free port; callers read the
/// actual port back via `local_addr()`.
pub fn create_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    // Non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
