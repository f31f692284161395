//! Framed JSON transport over a byte stream.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::error::Result;
use crate::json::{Frame, JsonCodec};
use crate::message::Message;

/// Message-level transport: a byte stream framed with [`JsonCodec`].
///
/// Used by the server's per-connection task and by clients; generic over the
/// stream so tests can run it over in-memory pipes.
pub struct Transport<S = TcpStream> {
    framed: Framed<S, JsonCodec>,
}

impl Transport<TcpStream> {
    /// Connect to a server and wrap the stream.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream with the default line-length cap.
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, JsonCodec::new()),
        }
    }

    /// Wrap a connected stream with a custom line-length cap in bytes.
    pub fn with_max_line(stream: S, max_line_bytes: usize) -> Self {
        Self {
            framed: Framed::new(stream, JsonCodec::with_max_length(max_line_bytes)),
        }
    }

    /// Read the next message from the transport.
    ///
    /// Returns `Ok(None)` when the peer closed the connection. A decode error
    /// applies to one line, which has already been consumed and skipped, so
    /// the caller may keep reading afterwards; only io errors are fatal.
    /// Cancel-safe: dropping the future loses no input.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        match self.framed.next().await {
            Some(Ok(Frame::Message(msg))) => Ok(Some(msg)),
            Some(Ok(Frame::Invalid(err))) => Err(err),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Write one message to the transport and flush it.
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        self.framed.send(message).await
    }

    /// Consume the transport, returning the underlying framed stream.
    pub fn into_inner(self) -> Framed<S, JsonCodec> {
        self.framed
    }
}
