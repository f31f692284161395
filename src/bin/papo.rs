//! papo - terminal client for the papod chat server.
//!
//! Connects, joins under the given name, and then runs one select loop
//! over stdin and the server stream. Plain input is public chat; slash
//! commands cover private messages, groups, and file transfers. Incoming
//! file frames are assembled in memory keyed by (sender, file name) and
//! written to the current directory when the transfer ends.

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use papo_proto::{Message, ProtocolError, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_ADDR: &str = "127.0.0.1:9999";

/// Raw bytes per `file_data` chunk. Base64 expansion keeps the encoded
/// line comfortably under the 64 KiB line limit.
const CHUNK_BYTES: usize = 32 * 1024;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(name) = args.next() else {
        eprintln!("usage: papo <name> [addr]");
        return ExitCode::FAILURE;
    };
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());

    if let Err(err) = run(&name, &addr).await {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(name: &str, addr: &str) -> anyhow::Result<()> {
    let mut transport = Transport::connect(addr).await?;
    transport
        .write_message(&Message::Join { name: Some(name.to_string()) })
        .await?;

    let mut downloads = Downloads::default();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            incoming = transport.read_message() => {
                match incoming {
                    Ok(Some(msg)) => downloads.render(msg).await,
                    Ok(None) => {
                        println!("<< disconnected from server >>");
                        return Ok(());
                    }
                    Err(ProtocolError::Io(err)) => return Err(err.into()),
                    // skip undecodable output, the codec resynchronizes
                    Err(_) => {}
                }
            }
            line = stdin.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_input(&mut transport, line.trim()).await? {
                            return Ok(());
                        }
                    }
                    None => {
                        // EOF on stdin behaves like /sair
                        let _ = transport.write_message(&Message::Leave).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Turns one line of input into wire traffic. Returns `false` when the
/// user asked to quit.
async fn handle_input(transport: &mut Transport, text: &str) -> anyhow::Result<bool> {
    if text.is_empty() {
        return Ok(true);
    }
    if !text.starts_with('/') {
        let chat = Message::Chat { from: None, msg: Some(text.to_string()) };
        transport.write_message(&chat).await?;
        return Ok(true);
    }

    let (command, rest) = match text.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (text, ""),
    };
    match command.to_ascii_lowercase().as_str() {
        "/sair" | "/quit" | "/exit" => {
            transport.write_message(&Message::Leave).await?;
            return Ok(false);
        }
        "/quem" => {
            transport.write_message(&Message::Who { users: None }).await?;
        }
        "/pm" => match rest.split_once(char::is_whitespace) {
            Some((user, text)) if !text.trim().is_empty() => {
                let pm = Message::Pm {
                    from: None,
                    to: Some(user.to_string()),
                    msg: Some(text.trim().to_string()),
                };
                transport.write_message(&pm).await?;
            }
            _ => println!("usage: /pm <user> <text>"),
        },
        "/criargrupo" => {
            if rest.is_empty() {
                println!("usage: /criargrupo <group>");
            } else {
                let create = Message::CreateGroup { group: Some(rest.to_string()) };
                transport.write_message(&create).await?;
            }
        }
        "/entrargrupo" => {
            if rest.is_empty() {
                println!("usage: /entrargrupo <group>");
            } else {
                let join = Message::JoinGroup { group: Some(rest.to_string()) };
                transport.write_message(&join).await?;
            }
        }
        "/g" => match rest.split_once(char::is_whitespace) {
            Some((group, text)) if !text.trim().is_empty() => {
                let msg = Message::GroupMsg {
                    group: Some(group.to_string()),
                    from: None,
                    msg: Some(text.trim().to_string()),
                };
                transport.write_message(&msg).await?;
            }
            _ => println!("usage: /g <group> <text>"),
        },
        "/enviar" => {
            if rest.is_empty() {
                println!("usage: /enviar <path>");
            } else {
                send_file(transport, rest, None, None).await?;
            }
        }
        "/pmfile" => match rest.split_once(char::is_whitespace) {
            Some((user, path)) if !path.trim().is_empty() => {
                send_file(transport, path.trim(), Some(user.to_string()), None).await?;
            }
            _ => println!("usage: /pmfile <user> <path>"),
        },
        "/gfile" => match rest.split_once(char::is_whitespace) {
            Some((group, path)) if !path.trim().is_empty() => {
                send_file(transport, path.trim(), None, Some(group.to_string())).await?;
            }
            _ => println!("usage: /gfile <group> <path>"),
        },
        _ => print_help(),
    }
    Ok(true)
}

/// Reads a local file and relays it as `file_info` → base64 `file_data`
/// chunks → `file_end`. A local read failure prints here and sends
/// nothing.
async fn send_file(
    transport: &mut Transport,
    path: &str,
    to: Option<String>,
    group: Option<String>,
) -> anyhow::Result<()> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("[file] cannot read '{path}': {err}");
            return Ok(());
        }
    };
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let info = Message::FileInfo {
        name: Some(name.clone()),
        size: Some(bytes.len() as u64),
        from: None,
        to: to.clone(),
        group: group.clone(),
    };
    transport.write_message(&info).await?;
    for chunk in bytes.chunks(CHUNK_BYTES) {
        let data = Message::FileData {
            name: Some(name.clone()),
            data: Some(STANDARD.encode(chunk)),
            from: None,
            to: to.clone(),
            group: group.clone(),
        };
        transport.write_message(&data).await?;
    }
    let end = Message::FileEnd { name: Some(name), from: None, to, group };
    transport.write_message(&end).await?;

    println!("[file] sent '{path}' ({} bytes)", bytes.len());
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  /pm <user> <text>        private message");
    println!("  /quem                    list connected users");
    println!("  /enviar <path>           send a file to everyone");
    println!("  /pmfile <user> <path>    send a file to one user");
    println!("  /criargrupo <group>      create a group");
    println!("  /entrargrupo <group>     join a group");
    println!("  /g <group> <text>        message a group");
    println!("  /gfile <group> <path>    send a file to a group");
    println!("  /sair                    leave (/quit and /exit work too)");
}

/// In-flight downloads keyed by (sender, file name).
#[derive(Default)]
struct Downloads {
    pending: HashMap<(String, String), Vec<u8>>,
}

impl Downloads {
    /// Prints one incoming message, feeding file frames into the
    /// assembly buffers.
    async fn render(&mut self, msg: Message) {
        match msg {
            Message::Welcome { you } => println!("<< connected as {you} >>"),
            Message::System { msg } => println!("[*] {msg}"),
            Message::Chat { from, msg } => {
                println!("{}: {}", from.as_deref().unwrap_or("?"), msg.as_deref().unwrap_or(""));
            }
            Message::Pm { from: Some(from), msg, .. } => {
                println!("[pm from {from}] {}", msg.as_deref().unwrap_or(""));
            }
            Message::Pm { to: Some(to), msg, .. } => {
                println!("[pm to {to}] {}", msg.as_deref().unwrap_or(""));
            }
            Message::GroupMsg { group, from, msg } => {
                println!(
                    "[{}] {}: {}",
                    group.as_deref().unwrap_or("?"),
                    from.as_deref().unwrap_or("?"),
                    msg.as_deref().unwrap_or(""),
                );
            }
            Message::Who { users } => {
                println!("online: {}", users.unwrap_or_default().join(", "));
            }
            Message::Error { code } => println!("[error] {code}"),
            Message::FileInfo { name, size, from, .. } => self.begin(from, name, size),
            Message::FileData { name, data, from, .. } => self.chunk(from, name, data),
            Message::FileEnd { name, from, .. } => self.finish(from, name).await,
            _ => {}
        }
    }

    fn begin(&mut self, from: Option<String>, name: Option<String>, size: Option<u64>) {
        let from = from.unwrap_or_default();
        let name = name.unwrap_or_default();
        println!("[file] receiving '{name}' from {from} ({} bytes)", size.unwrap_or(0));
        self.pending.insert((from, name), Vec::new());
    }

    fn chunk(&mut self, from: Option<String>, name: Option<String>, data: Option<String>) {
        let from = from.unwrap_or_default();
        let Some(key) = self.resolve(&from, name) else {
            println!("[file] dropping chunk from {from}: no matching transfer");
            return;
        };
        let Some(data) = data else { return };
        match STANDARD.decode(data.as_bytes()) {
            Ok(bytes) => {
                self.pending.entry(key).or_default().extend_from_slice(&bytes);
            }
            Err(_) => println!("[file] dropping undecodable chunk from {from}"),
        }
    }

    async fn finish(&mut self, from: Option<String>, name: Option<String>) {
        let from = from.unwrap_or_default();
        let Some(key) = self.resolve(&from, name) else {
            println!("[file] ignoring end of unknown transfer from {from}");
            return;
        };
        let Some(bytes) = self.pending.remove(&key) else {
            println!("[file] ignoring end of unknown transfer from {from}");
            return;
        };
        let file_name = sanitize(&key.1);
        match tokio::fs::write(&file_name, &bytes).await {
            Ok(()) => println!("[file] saved '{file_name}' ({} bytes)", bytes.len()),
            Err(err) => println!("[file] failed to save '{file_name}': {err}"),
        }
    }

    /// Picks the transfer a frame belongs to. A frame without a name
    /// falls back to the sender's single pending transfer; anything
    /// ambiguous resolves to nothing.
    fn resolve(&self, from: &str, name: Option<String>) -> Option<(String, String)> {
        if let Some(name) = name {
            return Some((from.to_string(), name));
        }
        let mut candidates = self.pending.keys().filter(|(sender, _)| sender == from);
        match (candidates.next(), candidates.next()) {
            (Some(key), None) => Some(key.clone()),
            _ => None,
        }
    }
}

/// Strips path components so a relayed name can never escape the current
/// directory.
fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match base {
        "" | "." | ".." => "unnamed".to_string(),
        other => other.to_string(),
    }
}
