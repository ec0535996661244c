use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Negotiated but not yet connected data-channel endpoint. One endpoint
/// serves one transfer and is consumed by it.
pub enum DataEndpoint {
    None,
    /// PASV/SPAS: we listen, the client connects.
    Passive { listener: TcpListener },
    /// PORT/SPOR: the client listens, we connect.
    Active { addr: SocketAddr },
}

impl DataEndpoint {
    pub fn is_none(&self) -> bool {
        matches!(self, DataEndpoint::None)
    }
}

/// A connected data channel, split so slot tasks can read and write
/// concurrently under their own locks.
pub struct DataConn {
    pub reader: Mutex<OwnedReadHalf>,
    pub writer: Mutex<OwnedWriteHalf>,
}

impl DataConn {
    pub fn from_stream(stream: TcpStream) -> Arc<Self> {
        let (reader, writer) = stream.into_split();
        Arc::new(DataConn {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    /// Shuts down the write side; in-flight peers observe EOF/error and
    /// funnel into the abort path.
    pub async fn force_close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("data channel shutdown: {}", e);
        }
    }
}

/// Connects the negotiated endpoint: accepts the pending PASV connection
/// or dials the PORT address, bounded by `grace`.
pub async fn establish(
    endpoint: DataEndpoint,
    grace: Duration,
) -> Result<Arc<DataConn>, std::io::Error> {
    match endpoint {
        DataEndpoint::None => Err(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "no data-channel endpoint negotiated",
        )),
        DataEndpoint::Passive { listener } => {
            let (stream, peer) = timeout(grace, listener.accept())
                .await
                .map_err(|_| {
                    warn!("timed out waiting for passive data connection");
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "data connection timeout")
                })??;
            debug!("accepted data connection from {}", peer);
            Ok(DataConn::from_stream(stream))
        }
        DataEndpoint::Active { addr } => {
            let stream = timeout(grace, TcpStream::connect(addr))
                .await
                .map_err(|_| {
                    warn!("timed out connecting data channel to {}", addr);
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "data connection timeout")
                })??;
            debug!("connected data channel to {}", addr);
            Ok(DataConn::from_stream(stream))
        }
    }
}

/// Formats the `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).` payload.
pub fn format_pasv_response(addr: &SocketAddr) -> Option<String> {
    match addr {
        SocketAddr::V4(v4) => {
            let ip = v4.ip().octets();
            Some(format!(
                "227 Entering Passive Mode ({},{},{},{},{},{}).",
                ip[0],
                ip[1],
                ip[2],
                ip[3],
                v4.port() / 256,
                v4.port() % 256
            ))
        }
        SocketAddr::V6(_) => None,
    }
}

/// Parses the `PORT h1,h2,h3,h4,p1,p2` argument.
pub fn parse_port_arg(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<u8> = arg
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.len() != 6 {
        return None;
    }
    let ip = std::net::Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = u16::from(parts[4]) * 256 + u16::from(parts[5]);
    if port == 0 {
        return None;
    }
    Some(SocketAddr::from((ip, port)))
}
