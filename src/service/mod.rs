//! Embeddable reference employee service.
//!
//! Implements the registry contract over a single SQLite table so the
//! harness can run self-contained: spawn two instances, point the clients
//! at them, replay sequences. Instances run on a background tokio runtime
//! thread and shut down gracefully when their handle drops.

pub mod quirks;
pub mod repository;
pub mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

pub use quirks::ServiceQuirks;
pub use repository::{EmployeeRepository, InsertOutcome, StoredEmployee};
pub use routes::{AppState, build_router};

use crate::core::errors::{EpyError, Result};

/// Spawn-time options for one instance.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Bind address; port 0 picks an ephemeral port.
    pub bind_addr: SocketAddr,
    /// File-backed store when set; fresh in-memory store otherwise.
    pub db_path: Option<PathBuf>,
    /// Behavior deviations for this instance.
    pub quirks: ServiceQuirks,
    /// Also stop on Ctrl-C (foreground `serve` mode).
    pub shutdown_on_ctrl_c: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path: None,
            quirks: ServiceQuirks::none(),
            shutdown_on_ctrl_c: false,
        }
    }
}

/// A running service instance. Dropping the handle shuts the server down
/// and joins its thread.
#[derive(Debug)]
pub struct ServiceHandle {
    addr: SocketAddr,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl ServiceHandle {
    /// Spawn an ephemeral in-memory instance on `127.0.0.1:0`.
    pub fn spawn(quirks: ServiceQuirks) -> Result<Self> {
        Self::spawn_with(ServeOptions {
            quirks,
            ..ServeOptions::default()
        })
    }

    /// Spawn with full options.
    pub fn spawn_with(options: ServeOptions) -> Result<Self> {
        let repo = match &options.db_path {
            Some(path) => EmployeeRepository::open(path)?,
            None => EmployeeRepository::open_in_memory()?,
        };
        let state = AppState {
            repo: Arc::new(repo),
            quirks: options.quirks,
        };

        let (addr_tx, addr_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let bind_addr = options.bind_addr;
        let ctrl_c = options.shutdown_on_ctrl_c;

        let join = thread::Builder::new()
            .name("epy-service".to_string())
            .spawn(move || serve_blocking(state, bind_addr, ctrl_c, shutdown_rx, &addr_tx))
            .map_err(|e| EpyError::ServiceSpawn {
                details: e.to_string(),
            })?;

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(10))
            .map_err(|_| EpyError::ChannelClosed {
                component: "service spawn handshake",
            })?
            .map_err(|details| EpyError::ServiceSpawn { details })?;

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        })
    }

    /// Bound socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL clients should target.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Block until the server exits on its own (Ctrl-C in foreground
    /// mode). Keeps the shutdown channel armed so drop semantics still
    /// apply afterwards.
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn serve_blocking(
    state: AppState,
    bind_addr: SocketAddr,
    ctrl_c: bool,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    addr_tx: &Sender<std::result::Result<SocketAddr, String>>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = addr_tx.send(Err(format!("tokio runtime: {e}")));
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::bind(bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let _ = addr_tx.send(Err(format!("bind {bind_addr}: {e}")));
                return;
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                let _ = addr_tx.send(Err(format!("local_addr: {e}")));
                return;
            }
        };
        let _ = addr_tx.send(Ok(local_addr));

        let app = build_router(state);
        let shutdown = async move {
            if ctrl_c {
                tokio::select! {
                    _ = shutdown_rx => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            } else {
                let _ = shutdown_rx.await;
            }
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            eprintln!("[epy-service] server error: {e}");
        }
    });
}
