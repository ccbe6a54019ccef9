//! Line-framed connection I/O: a bounded buffer is filled until a line
//! terminator appears; unused trailing bytes are preserved across
//! calls; exceeding capacity without a terminator is an error. TLS and
//! plain sockets share the same code path since both sides only need
//! `AsyncRead + AsyncWrite`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Open and usable.
    Open,
    /// The peer closed the connection (EOF observed). Matches the
    /// original's `con_status() == 2`; subsequent reads fail.
    Closed,
    /// An unrecoverable I/O error occurred.
    Error,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full line (including the trailing `\n`) is available.
    Line(Vec<u8>),
    /// No full line yet; the caller should read again. On a non-blocking
    /// TLS transport this also covers `WANT_READ`/`WANT_WRITE`, which are
    /// "no progress", not an error.
    Pending,
    /// The peer closed the connection.
    Closed,
}

#[derive(Debug)]
pub enum ConnError {
    BufferFull,
    Io(std::io::Error),
}

impl std::fmt::Display for ConnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnError::BufferFull => write!(f, "line exceeded buffer capacity without a terminator"),
            ConnError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ConnError {}

impl From<std::io::Error> for ConnError {
    fn from(err: std::io::Error) -> Self {
        ConnError::Io(err)
    }
}

pub struct Connection<S> {
    stream: S,
    buffer: Vec<u8>,
    capacity: usize,
    filled: usize,
    status: Status,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, capacity: usize) -> Self {
        Connection {
            stream,
            buffer: vec![0u8; capacity],
            capacity,
            filled: 0,
            status: Status::Open,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Reads bytes from the stream until a line terminator is found,
    /// returning the line (with its trailing `\n`, matching the original's
    /// `con_read_line`) and compacting any leftover bytes to the front of
    /// the buffer for the next call.
    pub async fn read_line(&mut self) -> Result<ReadOutcome, ConnError> {
        if self.status == Status::Closed {
            return Ok(ReadOutcome::Closed);
        }
        if self.status == Status::Error {
            return Err(ConnError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "connection is in an error state",
            )));
        }

        if let Some(pos) = find_terminator(&self.buffer[..self.filled]) {
            return Ok(ReadOutcome::Line(self.take_line(pos)));
        }

        if self.filled >= self.capacity {
            self.status = Status::Error;
            return Err(ConnError::BufferFull);
        }

        let bytes_read = self.stream.read(&mut self.buffer[self.filled..]).await?;
        if bytes_read == 0 {
            self.status = Status::Closed;
            return Ok(ReadOutcome::Closed);
        }
        self.filled += bytes_read;

        match find_terminator(&self.buffer[..self.filled]) {
            Some(pos) => Ok(ReadOutcome::Line(self.take_line(pos))),
            None => Ok(ReadOutcome::Pending),
        }
    }

    fn take_line(&mut self, terminator_pos: usize) -> Vec<u8> {
        let line_len = terminator_pos + 1;
        let line = self.buffer[..line_len].to_vec();
        self.buffer.copy_within(line_len..self.filled, 0);
        self.filled -= line_len;
        line
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), ConnError> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads exactly `len` bytes, used for the SMTP DATA phase once the
    /// declared body size is known (e.g. via a BDAT chunk length).
    pub async fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ConnError> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            if self.filled > 0 {
                let take = (len - out.len()).min(self.filled);
                out.extend_from_slice(&self.buffer[..take]);
                self.buffer.copy_within(take..self.filled, 0);
                self.filled -= take;
                continue;
            }
            let bytes_read = self.stream.read(&mut self.buffer).await?;
            if bytes_read == 0 {
                self.status = Status::Closed;
                break;
            }
            self.filled = bytes_read;
        }
        Ok(out)
    }
}

fn find_terminator(data: &[u8]) -> Option<usize> {
    data.iter().position(|&b| b == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_one_line_at_a_time() {
        let (mut client, server) = duplex(64);
        let mut conn = Connection::new(server, 64);
        client.write_all(b"HELO a\r\nMAIL FROM:<a>\r\n").await.unwrap();

        let first = conn.read_line().await.unwrap();
        assert_eq!(first, ReadOutcome::Line(b"HELO a\r\n".to_vec()));
        let second = conn.read_line().await.unwrap();
        assert_eq!(second, ReadOutcome::Line(b"MAIL FROM:<a>\r\n".to_vec()));
    }

    #[tokio::test]
    async fn closed_connection_reports_closed() {
        let (client, server) = duplex(64);
        drop(client);
        let mut conn = Connection::new(server, 64);
        assert_eq!(conn.read_line().await.unwrap(), ReadOutcome::Closed);
        assert_eq!(conn.status(), Status::Closed);
    }

    #[tokio::test]
    async fn overlong_line_is_an_error() {
        let (mut client, server) = duplex(128);
        let mut conn = Connection::new(server, 8);
        client.write_all(b"01234567890123\r\n").await.unwrap();
        let result = conn.read_line().await;
        assert!(matches!(result, Err(ConnError::BufferFull)));
    }
}
