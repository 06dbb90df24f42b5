//! Best-effort probes: executable smoke test and server reachability.
//!
//! Nothing here is fatal. Callers turn failures into warnings.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;

/// Poll interval while waiting for a probed child.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `exe <flag>` with a deadline; kill it if it does not exit in time.
///
/// An agent that ignores unknown flags enters its main loop, so the kill
/// path is the normal way such a probe ends. The child runs in the
/// executable's own directory so anything it writes lands there.
#[must_use]
pub fn run_with_deadline(exe: &Path, flag: &str, timeout: Duration) -> bool {
    let mut command = Command::new(exe);
    if let Some(dir) = exe.parent().filter(|p| !p.as_os_str().is_empty()) {
        command.current_dir(dir);
    }

    let child = command
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(error = %e, flag, "Probe could not spawn");
            return false;
        }
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) | Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(flag, "Probe timed out");
                return false;
            }
        }
    }
}

/// Try `--help`, then `--version`; true if either exits successfully.
#[must_use]
pub fn smoke_test(exe: &Path, timeout: Duration) -> bool {
    ["--help", "--version"]
        .iter()
        .any(|flag| run_with_deadline(exe, flag, timeout))
}

/// Server address found in the agent's reference copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Find `<host_key> = "<host>"` and `<port_key> = <port>` assignments.
#[must_use]
pub fn extract_endpoint(text: &str, host_key: &str, port_key: &str) -> Option<Endpoint> {
    let host_re = Regex::new(&format!(
        r#"(?m)^\s*{}\s*[:=]\s*['"]([^'"\s]+)['"]"#,
        regex::escape(host_key)
    ))
    .ok()?;
    let port_re = Regex::new(&format!(
        r#"(?m)^\s*{}\s*[:=]\s*['"]?(\d{{1,5}})\b"#,
        regex::escape(port_key)
    ))
    .ok()?;

    let host = host_re.captures(text)?.get(1)?.as_str().to_string();
    let port = port_re.captures(text)?.get(1)?.as_str().parse().ok()?;

    Some(Endpoint { host, port })
}

/// Attempt a TCP connection to every resolved address within `timeout`.
///
/// # Errors
/// Returns a human-readable reason when no address accepted the connection.
pub fn tcp_probe(endpoint: &Endpoint, timeout: Duration) -> Result<(), String> {
    let addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {endpoint}: {e}"))?;

    let mut last_error = String::from("no address resolved");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => return Ok(()),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(last_error)
}
