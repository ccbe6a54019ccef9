//! Outbound relay client: submission sessions relay to a
//! configured pool of upstream relays (standard/premium classes,
//! selected uniformly at random within the chosen class), speaking the
//! same `HELO/EHLO -> MAIL FROM -> RCPT TO* -> DATA` protocol the
//! inbound session accepts, over a plain `tokio::net::TcpStream`.

use rand::seq::SliceRandom;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::dotstuff::stuff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayClass {
    Standard,
    Premium,
}

#[derive(Debug, Clone)]
pub struct RelayTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub class: RelayClass,
}

#[derive(Debug)]
pub struct RelayPool {
    pub targets: Vec<RelayTarget>,
}

impl RelayPool {
    /// Picks a target uniformly at random among members of `class`
    ///.
    pub fn select(&self, class: RelayClass) -> Option<&RelayTarget> {
        let candidates: Vec<&RelayTarget> = self.targets.iter().filter(|t| t.class == class).collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }
}

#[derive(Debug)]
pub enum RelayError {
    Connect(std::io::Error),
    Io(std::io::Error),
    Rejected { stage: &'static str, line: String },
    NoUpstream,
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Connect(err) => write!(f, "could not connect to upstream relay: {err}"),
            RelayError::Io(err) => write!(f, "relay I/O error: {err}"),
            RelayError::Rejected { stage, line } => write!(f, "upstream rejected at {stage}: {line}"),
            RelayError::NoUpstream => write!(f, "no upstream relay configured for the requested class"),
        }
    }
}

pub struct RelayOutcome {
    pub final_line: String,
}

/// Relays one message to `recipients` via a randomly-selected upstream
/// in `class`. The body is dot-stuffed here unless `pre_stuffed` is set.
pub async fn relay(
    pool: &RelayPool,
    class: RelayClass,
    helo_hostname: &str,
    from: Option<&str>,
    recipients: &[String],
    body: &[u8],
    pre_stuffed: bool,
) -> Result<RelayOutcome, RelayError> {
    let target = pool.select(class).ok_or(RelayError::NoUpstream)?;
    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(RelayError::Connect)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    read_reply(&mut reader).await?;

    send_line(&mut write_half, &format!("EHLO {helo_hostname}")).await?;
    expect_2xx(&mut reader, "EHLO").await?;

    let from_path = from.unwrap_or("");
    send_line(&mut write_half, &format!("MAIL FROM:<{from_path}>")).await?;
    expect_2xx(&mut reader, "MAIL FROM").await?;

    for recipient in recipients {
        send_line(&mut write_half, &format!("RCPT TO:<{recipient}>")).await?;
        expect_2xx(&mut reader, "RCPT TO").await?;
    }

    send_line(&mut write_half, "DATA").await?;
    expect_2xx(&mut reader, "DATA").await?;

    let wire_body = if pre_stuffed { body.to_vec() } else { stuff(body) };
    write_half.write_all(&wire_body).await.map_err(RelayError::Io)?;
    if !wire_body.ends_with(b"\r\n") {
        write_half.write_all(b"\r\n").await.map_err(RelayError::Io)?;
    }
    write_half.write_all(b".\r\n").await.map_err(RelayError::Io)?;

    let final_line = expect_2xx(&mut reader, "end-of-DATA").await?;

    send_line(&mut write_half, "QUIT").await?;

    Ok(RelayOutcome { final_line })
}

async fn send_line<W: AsyncWriteExt + Unpin>(writer: &mut W, line: &str) -> Result<(), RelayError> {
    writer
        .write_all(format!("{line}\r\n").as_bytes())
        .await
        .map_err(RelayError::Io)
}

async fn read_reply<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<String, RelayError> {
    let mut line = String::new();
    reader.read_line(&mut line).await.map_err(RelayError::Io)?;
    Ok(line)
}

async fn expect_2xx<R: AsyncBufReadExt + Unpin>(reader: &mut R, stage: &'static str) -> Result<String, RelayError> {
    let line = read_reply(reader).await?;
    if line.starts_with('2') {
        Ok(line)
    } else {
        Err(RelayError::Rejected { stage, line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> RelayPool {
        RelayPool {
            targets: vec![
                RelayTarget {
                    name: "std1".into(),
                    host: "10.0.0.1".into(),
                    port: 25,
                    secure: false,
                    class: RelayClass::Standard,
                },
                RelayTarget {
                    name: "prem1".into(),
                    host: "10.0.0.2".into(),
                    port: 25,
                    secure: true,
                    class: RelayClass::Premium,
                },
            ],
        }
    }

    #[test]
    fn select_respects_class() {
        let pool = pool();
        let picked = pool.select(RelayClass::Premium).unwrap();
        assert_eq!(picked.name, "prem1");
    }

    #[test]
    fn select_returns_none_for_empty_class() {
        let pool = RelayPool { targets: vec![] };
        assert!(pool.select(RelayClass::Standard).is_none());
    }
}
