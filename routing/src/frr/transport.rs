// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Command transports for the control-plane suite.
//!
//! A [`Transport`] carries one textual command to the suite and returns its
//! textual output. Two real transports exist: shelling out to `vtysh`, and
//! a line exchange over the suite's local unix socket. The bridge owns
//! exactly one transport and serializes commands through it.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::errors::RouterError;

#[allow(unused)]
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A way of delivering one command to the suite.
pub trait Transport: Send {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Execute one command, bounded by `timeout`. Returns the suite's raw
    /// textual output.
    fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, RouterError>;
}

/// Shells out to the suite's interactive vty shell, one `-c` per command.
pub struct VtyshTransport {
    vtysh_path: String,
}

impl VtyshTransport {
    #[must_use]
    pub fn new<T: Into<String>>(vtysh_path: T) -> Self {
        Self {
            vtysh_path: vtysh_path.into(),
        }
    }
}

impl Transport for VtyshTransport {
    fn name(&self) -> &'static str {
        "vtysh"
    }

    fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, RouterError> {
        let mut child = Command::new(&self.vtysh_path)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RouterError::Daemon {
                daemon: self.vtysh_path.clone(),
                reason: e.to_string(),
            })?;

        // bounded wait; vtysh output is small enough not to fill the pipes
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait()? {
                Some(_) => break,
                None if Instant::now() >= deadline => {
                    if let Err(e) = child.kill() {
                        warn!("Failed to kill timed-out vtysh: {e}");
                    }
                    let _ = child.wait();
                    return Err(RouterError::CommandTimeout {
                        command: command.to_owned(),
                        timeout,
                    });
                }
                None => std::thread::sleep(POLL_INTERVAL),
            }
        }

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RouterError::Command {
                command: command.to_owned(),
                output: if stderr.is_empty() { stdout } else { stderr.to_string() },
            })
        }
    }
}

/// Line exchange over the suite's local unix socket. The connection is
/// opened lazily and dropped on any I/O fault so the next command retries.
pub struct SocketTransport {
    path: String,
    stream: Option<UnixStream>,
}

impl SocketTransport {
    #[must_use]
    pub fn new<T: Into<String>>(path: T) -> Self {
        Self {
            path: path.into(),
            stream: None,
        }
    }

    fn connect(&mut self, timeout: Duration) -> Result<&mut UnixStream, RouterError> {
        if self.stream.is_none() {
            let stream = UnixStream::connect(&self.path).map_err(|e| RouterError::Daemon {
                daemon: self.path.clone(),
                reason: e.to_string(),
            })?;
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
            self.stream = Some(stream);
        }
        // just stored above when absent
        self.stream.as_mut().ok_or_else(|| RouterError::Daemon {
            daemon: self.path.clone(),
            reason: "socket unavailable".to_owned(),
        })
    }
}

impl Transport for SocketTransport {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, RouterError> {
        let result = (|| -> Result<String, RouterError> {
            let stream = self.connect(timeout)?;
            stream.write_all(command.as_bytes())?;
            stream.write_all(b"\n")?;

            let mut output = String::new();
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        output.push_str(&String::from_utf8_lossy(&buf[..n]));
                        // the suite terminates a reply with its prompt
                        if output.ends_with("# ") || output.ends_with("#\n") {
                            break;
                        }
                    }
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        if output.is_empty() {
                            return Err(RouterError::CommandTimeout {
                                command: command.to_owned(),
                                timeout,
                            });
                        }
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(output)
        })();

        // drop the connection on fault so the next command reconnects
        if result.is_err() {
            self.stream = None;
        }
        result
    }
}
