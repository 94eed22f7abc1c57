//! An authoritative, non-recursive DNS server answering from JSON zone files
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! let resolver = authdns::ZoneResolver::from_json_files(&["example.com.json"]).unwrap();
//! let config = authdns::Config {
//!     listen: "127.0.0.1:5353".parse().unwrap(),
//!     ..authdns::Config::default()
//! };
//! let responder = authdns::Responder::new(config, Arc::new(resolver)).unwrap();
//! ```

use futures_util::{future, FutureExt};
use log::{debug, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use tokio::{runtime::Handle, sync::mpsc};

mod config;
pub mod dns_parser;
mod error;
mod fsm;
mod message;
mod record;
pub mod resolver;
mod socket;
mod tcp;

pub use crate::config::{Config, DEFAULT_MAX_UDP_SIZE, DNS_PORT};
pub use crate::error::{Error, ZoneLoadError};
pub use crate::fsm::{handle_query, Transport};
pub use crate::message::{peek_id, Message};
pub use crate::record::ResourceRecord;
pub use crate::resolver::{Resolver, StackableResolver, ZoneResolver};

use crate::fsm::{Command, FSM};
use crate::tcp::TcpServer;

/// A running server; dropping it stops every listener
pub struct Responder {
    commands: CommandSender,
    udp_addr: SocketAddr,
    tcp_addr: Option<SocketAddr>,
}

/// Future driving the listeners of a [`Responder`]
pub type ResponderTask = Pin<Box<dyn Future<Output = ()> + Send>>;

impl Responder {
    /// Runs the server on its own thread with a current-thread runtime
    pub fn new(config: Config, resolver: Arc<dyn Resolver>) -> io::Result<Responder> {
        let (tx, rx) = std_mpsc::sync_channel(0);
        thread::Builder::new()
            .name("dns-responder".to_owned())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = tx.send(Err(err));
                        return;
                    }
                };
                rt.block_on(async {
                    match Self::with_config(&config, resolver) {
                        Ok((responder, task)) => {
                            if tx.send(Ok(responder)).is_ok() {
                                task.await;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err));
                        }
                    }
                })
            })?;

        rx.recv().map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "responder thread exited during startup")
        })?
    }

    /// Spawns the server onto an existing runtime
    pub fn spawn(handle: &Handle, config: &Config, resolver: Arc<dyn Resolver>) -> io::Result<Responder> {
        let _guard = handle.enter();
        let (responder, task) = Self::with_config(config, resolver)?;
        handle.spawn(task);
        Ok(responder)
    }

    /// Binds the listeners and returns the future serving them
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_config(
        config: &Config,
        resolver: Arc<dyn Resolver>,
    ) -> io::Result<(Responder, ResponderTask)> {
        let udp = socket::bind_udp(config.listen)?;
        let (fsm, udp_tx) = FSM::new(udp, resolver.clone(), config.udp_payload_limit())?;
        let udp_addr = fsm.local_addr()?;
        debug!("listening on udp {}", udp_addr);

        let mut commands = vec![udp_tx];
        let (task, tcp_addr) = if config.tcp {
            // an ephemeral UDP port is reused for TCP
            let listen = SocketAddr::new(config.listen.ip(), udp_addr.port());
            let listener = socket::bind_tcp(listen)?;
            let (server, tcp_tx) = TcpServer::new(listener, resolver, config.idle_timeout())?;
            let tcp_addr = server.local_addr()?;
            debug!("listening on tcp {}", tcp_addr);
            commands.push(tcp_tx);

            let task: ResponderTask = Box::pin(future::join(fsm, server.run()).map(|_| ()));
            (task, Some(tcp_addr))
        } else {
            let task: ResponderTask = Box::pin(fsm);
            (task, None)
        };

        let responder = Responder {
            commands: CommandSender(commands),
            udp_addr,
            tcp_addr,
        };

        Ok((responder, task))
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// `None` when TCP is disabled
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.commands.send_shutdown();
    }
}

#[derive(Clone)]
struct CommandSender(Vec<mpsc::UnboundedSender<Command>>);

impl CommandSender {
    fn send(&self, cmd: Command) {
        for tx in self.0.iter() {
            if tx.send(cmd.clone()).is_err() {
                warn!("responder task already stopped");
            }
        }
    }

    fn send_shutdown(&self) {
        self.send(Command::Shutdown);
    }
}
