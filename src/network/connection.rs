//! Connection - handles an individual client connection.
//!
//! Each connection runs in its own Tokio task and moves through a small
//! state machine:
//!
//! ```text
//! Accepted ──▶ AwaitingJoin ──▶ Active ──▶ Closed
//! ```
//!
//! The task is attached to the [`Hub`] the moment it starts, before the
//! first read, so traffic routed to it while it is still waiting for the
//! `join` handshake is delivered rather than lost. A single
//! `tokio::select!` drives both directions: inbound frames from the
//! transport and outbound deliveries from the hub queue. Whatever ends the
//! loop, cleanup runs exactly once through [`Hub::disconnect`].

use std::net::SocketAddr;
use std::sync::Arc;

use papo_proto::{Message, ProtocolError, Transport};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::HandlerError;
use crate::router::Router;
use crate::state::{ConnId, Hub, OUTBOUND_QUEUE};

/// A client connection handler.
pub struct Connection {
    conn: ConnId,
    addr: SocketAddr,
    hub: Arc<Hub>,
    router: Arc<Router>,
    transport: Transport,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(
        conn: ConnId,
        stream: TcpStream,
        addr: SocketAddr,
        hub: Arc<Hub>,
        router: Arc<Router>,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            conn,
            addr,
            hub,
            router,
            transport: Transport::with_max_line(stream, max_line_bytes),
        }
    }

    /// Run the connection until the client leaves, disconnects, or breaks
    /// protocol during the join phase.
    #[instrument(skip(self), fields(conn = %self.conn, addr = %self.addr), name = "connection")]
    pub async fn run(mut self) -> anyhow::Result<()> {
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel(OUTBOUND_QUEUE);
        // live from the first moment: traffic routed here before the join
        // completes is delivered, not dropped
        self.hub.register_sender(self.conn, outgoing_tx);

        let result = self.serve(&mut outgoing_rx).await;
        self.hub.disconnect(self.conn);
        result
    }

    async fn serve(&mut self, outgoing_rx: &mut mpsc::Receiver<Message>) -> anyhow::Result<()> {
        let Some(name) = self.await_join(outgoing_rx).await? else {
            return Ok(());
        };
        self.active_loop(&name, outgoing_rx).await
    }

    /// Join phase: the first inbound message must be a valid `join`.
    ///
    /// Returns the registered name, or `None` when the connection was
    /// rejected or the client went away before joining. Hub deliveries are
    /// drained even while waiting.
    async fn await_join(
        &mut self,
        outgoing_rx: &mut mpsc::Receiver<Message>,
    ) -> anyhow::Result<Option<String>> {
        loop {
            tokio::select! {
                inbound = self.transport.read_message() => {
                    let msg = match inbound {
                        Ok(Some(msg)) => msg,
                        Ok(None) => {
                            debug!("client disconnected before joining");
                            return Ok(None);
                        }
                        Err(err) => return self.reject_join_line(err).await,
                    };
                    debug!(kind = %msg.kind(), "received");
                    return match self.router.register_session(self.conn, &msg) {
                        Ok((name, welcome)) => {
                            self.transport.write_message(&welcome).await?;
                            info!(name = %name, online = self.hub.registry.len(), "joined");
                            Ok(Some(name))
                        }
                        Err(err) => {
                            debug!(code = err.error_code(), "join rejected");
                            if let Some(reply) = err.to_error_reply() {
                                let _ = self.transport.write_message(&reply).await;
                            }
                            Ok(None)
                        }
                    };
                }
                outbound = outgoing_rx.recv() => {
                    match outbound {
                        Some(msg) => self.transport.write_message(&msg).await?,
                        // queue closed: another task already reaped us
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// A bad line during the join phase: reply with the matching error,
    /// then close. The join phase is strict.
    async fn reject_join_line(&mut self, err: ProtocolError) -> anyhow::Result<Option<String>> {
        let code = match err {
            ProtocolError::Json(_) | ProtocolError::InvalidUtf8(_) => {
                HandlerError::InvalidJson.error_code()
            }
            ProtocolError::LineTooLong { .. } => HandlerError::MessageTooLong.error_code(),
            err => return Err(err.into()),
        };
        warn!(code, "undecodable line during join");
        let _ = self.transport.write_message(&Message::error(code)).await;
        Ok(None)
    }

    /// Active phase: dispatch inbound messages through the router and
    /// forward hub deliveries to the client.
    async fn active_loop(
        &mut self,
        name: &str,
        outgoing_rx: &mut mpsc::Receiver<Message>,
    ) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                inbound = self.transport.read_message() => {
                    match inbound {
                        Ok(Some(msg)) => {
                            debug!(kind = %msg.kind(), "received");
                            match self.router.dispatch(self.conn, name, msg) {
                                Ok(replies) => {
                                    for reply in &replies {
                                        self.transport.write_message(reply).await?;
                                    }
                                }
                                Err(HandlerError::Leave) => {
                                    debug!("client leaving");
                                    return Ok(());
                                }
                                Err(err) => {
                                    debug!(code = err.error_code(), "rejected message");
                                    if let Some(reply) = err.to_error_reply() {
                                        self.transport.write_message(&reply).await?;
                                    }
                                }
                            }
                        }
                        Ok(None) => {
                            debug!("client disconnected");
                            return Ok(());
                        }
                        // undecodable input is answered and skipped; only
                        // transport failures end the session
                        Err(ProtocolError::Json(_)) | Err(ProtocolError::InvalidUtf8(_)) => {
                            let reply = Message::error(HandlerError::InvalidJson.error_code());
                            self.transport.write_message(&reply).await?;
                        }
                        Err(ProtocolError::LineTooLong { limit }) => {
                            warn!(limit, "oversized line");
                            let reply = Message::error(HandlerError::MessageTooLong.error_code());
                            self.transport.write_message(&reply).await?;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                outbound = outgoing_rx.recv() => {
                    match outbound {
                        Some(msg) => self.transport.write_message(&msg).await?,
                        // queue closed: another task already reaped us
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}
