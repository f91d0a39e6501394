// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Line-oriented serial transport to the device.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Default timeout for serial operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// What the transport needs from a serial port.
pub trait Port: Read + Write {
    fn timeout(&self) -> Duration;
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}

impl Port for Box<dyn SerialPort> {
    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self)
            .set_timeout(timeout)
            .context("Failed to set timeout")
    }
}

/// USB CDC transport for talking to the device.
pub struct Transport<P = Box<dyn SerialPort>> {
    port: P,
    rx_buf: Vec<u8>,
}

impl Transport {
    /// Open the named serial port.
    pub fn open(port_name: &str, baud: u32, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self::from_port(port))
    }
}

impl<P: Port> Transport<P> {
    pub fn from_port(port: P) -> Self {
        Self {
            port,
            rx_buf: Vec::with_capacity(256),
        }
    }

    /// Write one line. The caller supplies the line ending.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.port
            .write_all(line.as_bytes())
            .context("Failed to write to serial port")?;
        self.port.flush()?;
        Ok(())
    }

    /// Read up to and including the next `\n`.
    pub fn read_line(&mut self) -> Result<String> {
        self.rx_buf.clear();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {
                    self.rx_buf.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    bail!("Timeout waiting for device");
                }
                Err(e) => bail!("Serial read error: {}", e),
            }
        }

        Ok(String::from_utf8_lossy(&self.rx_buf).into_owned())
    }

    /// Throw away whatever the device sent before we start talking.
    pub fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    #[cfg(test)]
    pub fn port(&self) -> &P {
        &self.port
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedPort;
    use super::*;

    #[test]
    fn test_read_line_keeps_terminator() {
        let mut t = Transport::from_port(ScriptedPort::pending("\rACK a;1\nnext\n"));
        assert_eq!(t.read_line().unwrap(), "\rACK a;1\n");
        assert_eq!(t.read_line().unwrap(), "next\n");
    }

    #[test]
    fn test_read_line_times_out_on_partial_line() {
        let mut t = Transport::from_port(ScriptedPort::pending("partial"));
        let err = t.read_line().unwrap_err();
        assert!(err.to_string().contains("Timeout"));
    }

    #[test]
    fn test_send_line_writes_verbatim() {
        let mut t = Transport::from_port(ScriptedPort::default());
        t.send_line("a;00\r\n").unwrap();
        assert_eq!(t.port().sent(), "a;00\r\n");
    }

    #[test]
    fn test_reply_follows_written_line() {
        let mut t = Transport::from_port(ScriptedPort::replying(&["pong\n"]));
        assert!(t.read_line().is_err());
        t.send_line("ping\r\n").unwrap();
        assert_eq!(t.read_line().unwrap(), "pong\n");
    }

    #[test]
    fn test_drain_rx_restores_timeout() {
        let mut port = ScriptedPort::pending("stale output");
        port.timeout = Duration::from_secs(5);
        let mut t = Transport::from_port(port);
        t.drain_rx();
        assert!(t.port().rx.is_empty());
        assert_eq!(t.port().timeout, Duration::from_secs(5));
    }
}
