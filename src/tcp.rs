//! DNS over TCP: every message is preceded by its length as a big-endian u16

use std::convert::TryFrom;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::fsm::{handle_query, Command, Transport};
use crate::resolver::Resolver;

pub struct TcpServer {
    listener: TcpListener,
    resolver: Arc<dyn Resolver>,
    idle_timeout: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl TcpServer {
    // Will panic if called from outside the context of a runtime
    pub fn new(
        listener: std::net::TcpListener,
        resolver: Arc<dyn Resolver>,
        idle_timeout: Duration,
    ) -> io::Result<(TcpServer, mpsc::UnboundedSender<Command>)> {
        let listener = TcpListener::from_std(listener)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let server = TcpServer {
            listener,
            resolver,
            idle_timeout,
            commands: rx,
        };
        Ok((server, tx))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until told to shut down
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Shutdown) => return,
                        None => {
                            warn!("responder disconnected without shutdown");
                            return;
                        }
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            trace!("accepted connection from {:?}", peer);
                            let connection = Connection {
                                stream,
                                peer,
                                resolver: self.resolver.clone(),
                                idle_timeout: self.idle_timeout,
                            };
                            tokio::spawn(connection.serve());
                        }
                        Err(err) => warn!("couldn't accept connection: {:?}", err),
                    }
                }
            }
        }
    }
}

struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    resolver: Arc<dyn Resolver>,
    idle_timeout: Duration,
}

impl Connection {
    async fn serve(mut self) {
        loop {
            match self.serve_one().await {
                Ok(true) => (),
                Ok(false) => break,
                Err(err) => {
                    debug!("closing connection from {:?}: {}", self.peer, err);
                    break;
                }
            }
        }
        trace!("connection from {:?} closed", self.peer);
    }

    /// Answers one message; `false` once the peer is done
    async fn serve_one(&mut self) -> io::Result<bool> {
        let len = match timeout(self.idle_timeout, self.stream.read_u16()).await {
            Err(_) => {
                trace!("idle connection from {:?} timed out", self.peer);
                return Ok(false);
            }
            Ok(Err(ref err)) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
            Ok(result) => result?,
        };

        let mut query = vec![0u8; usize::from(len)];
        timeout(self.idle_timeout, self.stream.read_exact(&mut query))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "message body timed out"))??;

        let response = match handle_query(&*self.resolver, &query, Transport::Tcp) {
            Some(response) => response,
            None => return Ok(true),
        };
        let len = u16::try_from(response.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response exceeds 65535 bytes"))?;

        let mut framed = Vec::with_capacity(response.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(&response);
        self.stream.write_all(&framed).await?;
        Ok(true)
    }
}
