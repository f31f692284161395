//! Test chat client.
//!
//! Speaks raw JSON lines over the split TCP stream so tests can send
//! malformed input just as easily as well-formed messages, and assert on
//! exactly what arrives.

use std::time::Duration;

use papo_proto::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test chat client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    name: String,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str, name: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            name: name.to_string(),
        })
    }

    /// Send one raw line. A newline is appended when missing.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Send a message.
    pub async fn send(&mut self, msg: &Message) -> anyhow::Result<()> {
        self.send_raw(&serde_json::to_string(msg)?).await
    }

    /// Receive a single message from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Receive messages until the given predicate returns true.
    #[allow(dead_code)]
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    /// Complete the join handshake, returning the effective name.
    pub async fn join(&mut self) -> anyhow::Result<String> {
        let join = Message::Join { name: Some(self.name.clone()) };
        self.send(&join).await?;
        match self.recv().await? {
            Message::Welcome { you } => Ok(you),
            other => anyhow::bail!("expected welcome, got {other:?}"),
        }
    }

    /// Assert the server closed this connection.
    #[allow(dead_code)]
    pub async fn assert_closed(&mut self) {
        let mut line = String::new();
        match timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(_)) => panic!("expected close, got line: {line:?}"),
            Ok(Err(err)) => panic!("read failed instead of clean close: {err}"),
            Err(_) => panic!("connection still open after 5s"),
        }
    }

    /// Assert nothing arrives within `dur`.
    #[allow(dead_code)]
    pub async fn assert_silent(&mut self, dur: Duration) {
        let mut line = String::new();
        match timeout(dur, self.reader.read_line(&mut line)).await {
            Err(_) => {}
            Ok(Ok(0)) => panic!("connection closed while expecting silence"),
            Ok(Ok(_)) => panic!("unexpected message: {line:?}"),
            Ok(Err(err)) => panic!("read failed while expecting silence: {err}"),
        }
    }
}
