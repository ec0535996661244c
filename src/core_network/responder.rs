use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// The single send path for control-channel responses. Both synchronous
/// command replies and the transfer engine's asynchronous terminal
/// responses go through here, so two responses are never interleaved
/// mid-line.
pub struct Responder {
    writer: Mutex<OwnedWriteHalf>,
}

impl Responder {
    pub fn new(writer: OwnedWriteHalf) -> Arc<Self> {
        Arc::new(Responder {
            writer: Mutex::new(writer),
        })
    }

    /// Sends one complete response line; CRLF is appended here.
    pub async fn send(&self, line: &str) -> Result<(), std::io::Error> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Sends a well-formed multi-line block using the `nnn-`/`nnn `
    /// continuation convention, atomically with respect to other sends.
    pub async fn send_block(
        &self,
        code: u16,
        header: &str,
        lines: &[String],
        trailer: &str,
    ) -> Result<(), std::io::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(format!("{}-{}\r\n", code, header).as_bytes())
            .await?;
        for line in lines {
            writer.write_all(format!(" {}\r\n", line).as_bytes()).await?;
        }
        writer
            .write_all(format!("{} {}\r\n", code, trailer).as_bytes())
            .await?;
        writer.flush().await?;
        Ok(())
    }

    /// Force-closes the control channel's write side. Used by the idle
    /// reaper and by QUIT.
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}
