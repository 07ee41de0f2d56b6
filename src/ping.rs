use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, UtilifiError};

const WAIT_POLL: Duration = Duration::from_millis(50);

// English, Russian, then the compact Windows form ("time=4ms").
static RTT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)time[=<]\s*(\d+\.?\d*)\s*ms",
        r"(?i)время[=<]\s*(\d+\.?\d*)\s*мс",
        r"(?i)time[=<]\s*(\d+)ms",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static pattern"))
    .collect()
});

#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    /// Host answered. `rtt` is e.g. `"12.4 ms"` when the output carried a time.
    Reachable { rtt: Option<String> },
    NoReply,
    Timeout,
    Failed(String),
}

impl PingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PingOutcome::Reachable { .. })
    }
}

impl fmt::Display for PingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingOutcome::Reachable { rtt: Some(rtt) } => write!(f, "✅ {}", rtt),
            PingOutcome::Reachable { rtt: None } => write!(f, "✅ OK"),
            PingOutcome::NoReply => write!(f, "❌ No reply"),
            PingOutcome::Timeout => write!(f, "⏱️ Timeout"),
            PingOutcome::Failed(_) => write!(f, "⚠️ Error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PingRequest {
    pub host: String,
    pub timeout: Duration,
}

impl PingRequest {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(UtilifiError::EmptyHost);
        }
        Ok(PingRequest { host: host.to_string(), timeout })
    }

    pub fn run(&self) -> PingOutcome {
        debug!(host = %self.host, "pinging");
        let outcome = execute(ping_command(&self.host), self.timeout);
        if let PingOutcome::Failed(reason) = &outcome {
            warn!(host = %self.host, %reason, "ping failed");
        }
        outcome
    }
}

/// One echo request with the platform's count flag.
pub fn ping_command(host: &str) -> Command {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    let mut cmd = Command::new("ping");
    cmd.args([count_flag, "1", host]);
    cmd
}

/// Runs `cmd` to completion or until `timeout`, then classifies the result.
/// Both pipes are drained on reader threads so a chatty child can't block on write.
pub fn execute(mut cmd: Command, timeout: Duration) -> PingOutcome {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return PingOutcome::Failed(e.to_string()),
    };
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return PingOutcome::Timeout;
            }
            Ok(None) => thread::sleep(WAIT_POLL),
            Err(e) => return PingOutcome::Failed(e.to_string()),
        }
    };
    if !status.success() {
        return PingOutcome::NoReply;
    }

    let mut text = collect(stdout);
    text.push_str(&collect(stderr));
    PingOutcome::Reachable { rtt: parse_rtt(&text) }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!(error = %e, "reading ping output failed");
        }
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// First round-trip time found in ping output, formatted as `"<value> ms"`.
pub fn parse_rtt(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        RTT_PATTERNS
            .iter()
            .find_map(|re| re.captures(line))
            .map(|caps| format!("{} ms", &caps[1]))
    })
}
