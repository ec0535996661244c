use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};

use crate::config::Config;
use crate::constants::MAX_COMMAND_LINE;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::handlers::initialize_command_handlers;
use crate::core_ftpcommand::utils::CommandContext;
use crate::core_network::responder::Responder;
use crate::core_transfer::state::TransferCtl;
use crate::core_vfs::registry::BackendRegistry;
use crate::core_watchdog::{ActivityClock, SessionEntry, SessionRegistry};
use crate::session::{Session, SessionState};

pub async fn start_server(
    config: Arc<Config>,
    backends: Arc<BackendRegistry>,
    sessions: Arc<SessionRegistry>,
) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.server.listen_port)).await?;
    info!("server listening on port {}", config.server.listen_port);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("new connection from {}", addr);

        let config = Arc::clone(&config);
        let backends = Arc::clone(&backends);
        let sessions = Arc::clone(&sessions);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, config, backends, sessions).await {
                warn!("connection error for {}: {:?}", addr, e);
            }
            info!("connection closed for {}", addr);
        });
    }
}

pub async fn handle_connection(
    socket: TcpStream,
    config: Arc<Config>,
    backends: Arc<BackendRegistry>,
    sessions: Arc<SessionRegistry>,
) -> Result<()> {
    let peer = socket
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let local_ip = socket
        .local_addr()
        .map(|a| a.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let (read_half, write_half) = socket.into_split();
    let responder = Responder::new(write_half);

    let mounts = match backends.build_mount_table(&config) {
        Ok(table) => Arc::new(table),
        Err(e) => {
            let _ = responder.send("421 Service not available.").await;
            return Err(e);
        }
    };
    let ctl = TransferCtl::new();
    let clock = ActivityClock::new();
    let hangup = Arc::new(Notify::new());
    let session = Arc::new(Mutex::new(Session::new(
        mounts,
        local_ip,
        Arc::clone(&ctl),
        Arc::clone(&clock),
    )));

    let registered = sessions.add(SessionEntry {
        peer: peer.clone(),
        clock: Arc::clone(&clock),
        responder: Arc::clone(&responder),
        ctl: Arc::clone(&ctl),
        hangup: Arc::clone(&hangup),
    });

    let result = command_loop(read_half, &responder, &config, &session, &clock, &hangup).await;
    sessions.remove(registered);
    result
}

async fn command_loop(
    read_half: tokio::net::tcp::OwnedReadHalf,
    responder: &Arc<Responder>,
    config: &Arc<Config>,
    session: &Arc<Mutex<Session>>,
    clock: &Arc<ActivityClock>,
    hangup: &Arc<Notify>,
) -> Result<()> {
    responder
        .send(&format!("220 {}", config.server.banner))
        .await?;

    let handlers = initialize_command_handlers();
    let mut reader = BufReader::new(read_half);
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let n = tokio::select! {
            read = reader.read_line(&mut buffer) => read?,
            _ = hangup.notified() => {
                debug!("control connection force-closed");
                break;
            }
        };
        if n == 0 {
            debug!("client disconnected");
            break;
        }
        if n > MAX_COMMAND_LINE {
            responder.send("500 Command line too long.").await?;
            continue;
        }
        let line = buffer.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        clock.touch();

        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim().to_string()),
            None => (line, String::new()),
        };
        debug!("command from client: {} {}", verb, arg);

        let cmd = match FtpCommand::from_str(verb) {
            Some(cmd) => cmd,
            None => {
                responder.send("502 Command not implemented.").await?;
                continue;
            }
        };
        {
            let session = session.lock().await;
            if !cmd.allowed_unauthenticated() && !session.is_authenticated() {
                drop(session);
                responder.send("530 Please login with USER and PASS.").await?;
                continue;
            }
        }

        let ctx = CommandContext {
            responder: Arc::clone(responder),
            config: Arc::clone(config),
            session: Arc::clone(session),
        };
        // handlers covers every parseable command.
        if let Some(handler) = handlers.get(&cmd) {
            if let Err(e) = handler(ctx, arg).await {
                warn!("error handling {:?}: {:?}", cmd, e);
                break;
            }
        }

        let closed = {
            let session = session.lock().await;
            session.state == SessionState::Closed
        };
        if closed {
            break;
        }
    }
    Ok(())
}
