use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

const REPLY_BUF_SIZE: usize = 4096;

/// One line of structured text sent to the advisory service. serde_json
/// escapes quotes, backslashes and newlines in the prefix, so the framing
/// survives arbitrary command text.
#[derive(Serialize)]
struct SuggestionRequest<'a> {
    cmd: &'a str,
    model: &'a str,
}

/// Advisory transport, tried in fixed order: the local socket first, the
/// loopback TCP endpoint if the local connect fails. Failures past the
/// connect stage do not fall through; one round trip per call.
#[derive(Debug)]
pub enum Transport {
    Unix(PathBuf),
    Tcp(SocketAddr),
}

trait Channel: Read + Write {}
impl Channel for UnixStream {}
impl Channel for TcpStream {}

impl Transport {
    /// Connects and arms the stream with whatever is left of the budget,
    /// so connect, write and read share one hard ceiling instead of
    /// stacking per-stage timeouts.
    fn connect(&self, deadline: Instant) -> io::Result<Box<dyn Channel>> {
        match self {
            Transport::Unix(path) => {
                remaining(deadline)?;
                let stream = UnixStream::connect(path)?;
                let left = remaining(deadline)?;
                stream.set_read_timeout(Some(left))?;
                stream.set_write_timeout(Some(left))?;
                Ok(Box::new(stream))
            }
            Transport::Tcp(addr) => {
                let stream = TcpStream::connect_timeout(addr, remaining(deadline)?)?;
                let left = remaining(deadline)?;
                stream.set_read_timeout(Some(left))?;
                stream.set_write_timeout(Some(left))?;
                Ok(Box::new(stream))
            }
        }
    }
}

fn remaining(deadline: Instant) -> io::Result<Duration> {
    let now = Instant::now();
    if now >= deadline {
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "suggestion deadline expired",
        ))
    } else {
        Ok(deadline - now)
    }
}

/// Client for the external completion service. Entirely optional to shell
/// operation: every failure mode collapses to "no suggestion".
pub struct SuggestionClient {
    transports: Vec<Transport>,
    model: String,
}

impl SuggestionClient {
    pub fn new(transports: Vec<Transport>, model: String) -> SuggestionClient {
        SuggestionClient { transports, model }
    }

    /// Fetches a completion hint for `prefix`, waiting at most `timeout`.
    /// Returns `None` on connect failure, write failure, deadline expiry,
    /// or an empty reply; the shell never blocks past the deadline and
    /// never sees an error from this path.
    pub fn fetch(&self, prefix: &str, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        for transport in &self.transports {
            match transport.connect(deadline) {
                Ok(channel) => return self.exchange(channel, prefix),
                Err(e) => debug!("suggestion transport {:?} unavailable: {}", transport, e),
            }
        }
        None
    }

    fn exchange(&self, mut channel: Box<dyn Channel>, prefix: &str) -> Option<String> {
        let request = SuggestionRequest {
            cmd: prefix,
            model: &self.model,
        };
        let mut line = serde_json::to_string(&request).ok()?;
        line.push('\n');

        if let Err(e) = channel.write_all(line.as_bytes()) {
            debug!("suggestion request write failed: {}", e);
            return None;
        }

        // one buffered read; a reply longer than the buffer is truncated
        let mut buf = [0u8; REPLY_BUF_SIZE];
        let n = match channel.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => n,
        };

        let reply = String::from_utf8_lossy(&buf[..n]);
        let reply = reply.trim_end_matches('\n').trim_end_matches('\r');
        if reply.is_empty() {
            None
        } else {
            Some(reply.to_string())
        }
    }
}
