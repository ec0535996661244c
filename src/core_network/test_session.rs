use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::core_network::network::handle_connection;
use crate::core_vfs::registry::BackendRegistry;
use crate::core_watchdog::{spawn_reaper, SessionRegistry};

fn tempdir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "grilleftpd-session-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_config(root: &std::path::Path) -> Config {
    config_with_pasv(root, Some("127.0.0.1"))
}

fn config_with_pasv(root: &std::path::Path, pasv_address: Option<&str>) -> Config {
    let pasv_line = match pasv_address {
        Some(addr) => format!("pasv_address = \"{}\"", addr),
        None => String::new(),
    };
    let raw = format!(
        r#"
        [server]
        listen_port = 0
        {}
        banner = "grilleftpd test"
        data_grace_secs = 5

        [[mounts]]
        prefix = "/data"
        backend = "localfs"
        root = "{}"
    "#,
        pasv_line,
        root.display()
    );
    toml::from_str(&raw).unwrap()
}

struct Client {
    reader: BufReader<TcpStream>,
}

impl Client {
    async fn connect(config: Config) -> Self {
        Self::connect_inner(config, None).await
    }

    /// Like `connect`, but with the idle reaper running over the session.
    async fn connect_with_reaper(config: Config, idle_timeout: Duration) -> Self {
        Self::connect_inner(config, Some(idle_timeout)).await
    }

    async fn connect_inner(config: Config, reaper: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (server, _) = accepted.unwrap();

        let config = Arc::new(config);
        let backends = Arc::new(BackendRegistry::new());
        let sessions = SessionRegistry::new();
        if let Some(idle_timeout) = reaper {
            spawn_reaper(Arc::clone(&sessions), idle_timeout);
        }
        tokio::spawn(async move {
            let _ = handle_connection(server, config, backends, sessions).await;
        });

        let mut client = Client {
            reader: BufReader::new(client.unwrap()),
        };
        client.expect("220 ").await;
        client
    }

    async fn send(&mut self, line: &str) {
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(10), self.reader.read_line(&mut line))
            .await
            .expect("no response from server")
            .unwrap();
        line.trim_end().to_string()
    }

    async fn expect(&mut self, prefix: &str) -> String {
        let line = self.line().await;
        assert!(
            line.starts_with(prefix),
            "expected '{}', got '{}'",
            prefix,
            line
        );
        line
    }

    /// Reads a multi-line reply through its `nnn ` terminator.
    async fn drain_block(&mut self, code: &str) {
        let terminator = format!("{} ", code);
        loop {
            let line = self.line().await;
            if line.starts_with(&terminator) {
                return;
            }
        }
    }

    async fn login(&mut self) {
        self.send("USER grid").await;
        self.expect("331 ").await;
        self.send("PASS x").await;
        self.expect("230 ").await;
    }

    /// Issues PASV and connects the data socket it advertises.
    async fn open_passive(&mut self) -> TcpStream {
        self.send("PASV").await;
        let reply = self.expect("227 ").await;
        let addr = parse_pasv(&reply);
        TcpStream::connect(addr).await.unwrap()
    }
}

/// Parses the `h1,h2,h3,h4,p1,p2` element used by PASV replies and
/// SPAS stripe lines.
fn parse_host_port(spec: &str) -> SocketAddr {
    let parts: Vec<u16> = spec.trim().split(',').map(|p| p.parse().unwrap()).collect();
    assert_eq!(parts.len(), 6);
    let ip = format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3]);
    let port = parts[4] * 256 + parts[5];
    format!("{}:{}", ip, port).parse().unwrap()
}

fn parse_pasv(reply: &str) -> SocketAddr {
    let inner = reply
        .split('(')
        .nth(1)
        .and_then(|s| s.split(')').next())
        .expect("malformed 227");
    parse_host_port(inner)
}

#[tokio::test]
async fn commands_are_gated_until_login() {
    let root = tempdir("gate");
    let mut client = Client::connect(test_config(&root)).await;

    client.send("PWD").await;
    client.expect("530 ").await;
    client.send("FEAT").await;
    client.drain_block("211").await;
    client.send("SYST").await;
    client.expect("215 ").await;

    client.login().await;
    client.send("PWD").await;
    client.expect("257 ").await;
}

#[tokio::test]
async fn pasv_store_then_retrieve_round_trip() {
    let root = tempdir("roundtrip");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("TYPE I").await;
    client.expect("200 ").await;

    let mut data = client.open_passive().await;
    client.send("STOR /data/hello.txt").await;
    client.expect("150 ").await;
    data.write_all(b"hello world").await.unwrap();
    data.shutdown().await.unwrap();
    client.expect("226 Transfer complete.").await;

    client.send("SIZE /data/hello.txt").await;
    client.expect("213 11").await;

    let mut data = client.open_passive().await;
    client.send("RETR /data/hello.txt").await;
    client.expect("150 ").await;
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"hello world");
    client.expect("226 Transfer complete.").await;
}

#[tokio::test]
async fn eret_retrieves_an_explicit_range() {
    let root = tempdir("eret");
    std::fs::write(root.join("blob.bin"), b"0123456789abcdef").unwrap();
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    let mut data = client.open_passive().await;
    client.send("ERET P 4 6 /data/blob.bin").await;
    client.expect("150 ").await;
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"456789");
    client.expect("226 Transfer complete.").await;
}

#[tokio::test]
async fn retr_of_unbound_path_is_a_single_reply() {
    let root = tempdir("unbound");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("RETR /elsewhere/file.txt").await;
    client.expect("550 ").await;

    // The session stays idle and the control channel keeps its ordering.
    client.send("NOOP").await;
    client.expect("200 ").await;
}

#[tokio::test]
async fn abor_mid_store_discards_the_partial_file() {
    let root = tempdir("abor");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    let mut data = client.open_passive().await;
    client.send("STOR /data/partial.bin").await;
    client.expect("150 ").await;
    data.write_all(b"some bytes that never finish").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    client.send("ABOR").await;
    client.expect("426").await;
    client.expect("226 Abort finished.").await;

    client.send("SIZE /data/partial.bin").await;
    client.expect("550 ").await;
}

#[tokio::test]
async fn opts_parallelism_bounds_are_enforced() {
    let root = tempdir("opts");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("OPTS RETR Parallelism=0,0,0;").await;
    client.expect("501 ").await;
    client.send("OPTS RETR Parallelism=51,51,51;").await;
    client.expect("501 ").await;
    client.send("OPTS RETR Parallelism=50,50,50;").await;
    client.expect("200 ").await;
}

#[tokio::test]
async fn directory_lifecycle_over_the_control_channel() {
    let root = tempdir("dirs");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("MKD /data/sub").await;
    client.expect("257 ").await;
    client.send("CWD /data/sub").await;
    client.expect("250 ").await;
    client.send("PWD").await;
    client.expect("257 \"/data/sub\"").await;
    client.send("CDUP").await;
    client.expect("250 ").await;
    client.send("RMD /data/sub").await;
    client.expect("250 ").await;
    client.send("CWD /data/sub").await;
    client.expect("550 ").await;
}

#[tokio::test]
async fn mlsd_lists_facts_over_the_data_channel() {
    let root = tempdir("mlsd");
    std::fs::write(root.join("a.txt"), b"abc").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    let mut data = client.open_passive().await;
    client.send("MLSD /data").await;
    client.expect("150 ").await;
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    client.expect("226 Transfer complete.").await;

    assert!(listing.contains("type=file;size=3;"), "{}", listing);
    assert!(listing.contains(" a.txt\r\n"), "{}", listing);
    assert!(listing.contains("type=dir;"), "{}", listing);
}

#[tokio::test]
async fn synthetic_root_lists_the_mount_point() {
    let root = tempdir("synthetic");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    // "/" has no backend of its own; it is synthesized from the mount
    // prefixes.
    let mut data = client.open_passive().await;
    client.send("NLST /").await;
    client.expect("150 ").await;
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    client.expect("226 Transfer complete.").await;
    assert_eq!(listing, "data\r\n");
}

#[tokio::test]
async fn auth_establishes_a_mapped_login() {
    let root = tempdir("auth");
    let mut client = Client::connect(test_config(&root)).await;

    client.send("AUTH GSSAPI").await;
    client.expect("234 ").await;
    // The secure context carries its own mapped identity; no USER/PASS
    // needed before authenticated commands.
    client.send("PWD").await;
    client.expect("257 ").await;

    client.send("AUTH GSSAPI").await;
    client.expect("534 ").await;
}

#[tokio::test]
async fn pasv_without_override_advertises_the_control_address() {
    let root = tempdir("pasvlocal");
    std::fs::write(root.join("f.txt"), b"egress").unwrap();
    let mut client = Client::connect(config_with_pasv(&root, None)).await;
    client.login().await;

    client.send("PASV").await;
    let reply = client.expect("227 ").await;
    let addr = parse_pasv(&reply);
    // The control connection is loopback, so that is what gets
    // advertised; never the unspecified bind address.
    assert_eq!(addr.ip().to_string(), "127.0.0.1");

    let mut data = TcpStream::connect(addr).await.unwrap();
    client.send("RETR /data/f.txt").await;
    client.expect("150 ").await;
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"egress");
    client.expect("226 Transfer complete.").await;
}

#[tokio::test]
async fn spas_stripe_block_accepts_the_data_connection() {
    let root = tempdir("spas");
    std::fs::write(root.join("s.bin"), b"striped payload").unwrap();
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("SPAS").await;
    client.expect("229-").await;
    let stripe = client.line().await;
    client.expect("229 ").await;
    let mut data = TcpStream::connect(parse_host_port(&stripe)).await.unwrap();

    client.send("RETR /data/s.bin").await;
    client.expect("150 ").await;
    let mut received = Vec::new();
    data.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"striped payload");
    client.expect("226 Transfer complete.").await;
}

#[tokio::test]
async fn spor_dials_the_client_stripe_for_a_store() {
    let root = tempdir("spor");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let stripe = format!("127,0,0,1,{},{}", port / 256, port % 256);
    // Space-separated stripe list; a single-stripe server uses the first.
    client.send(&format!("SPOR {} {}", stripe, stripe)).await;
    client.expect("200 ").await;

    client.send("STOR /data/pushed.bin").await;
    let (mut data, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("server did not dial the stripe")
        .unwrap();
    client.expect("150 ").await;
    data.write_all(b"active stripe").await.unwrap();
    data.shutdown().await.unwrap();
    client.expect("226 Transfer complete.").await;
    assert_eq!(
        std::fs::read(root.join("pushed.bin")).unwrap(),
        b"active stripe"
    );
}

#[tokio::test]
async fn idle_reaper_aborts_a_stalled_store() {
    let root = tempdir("reaped");
    let mut client =
        Client::connect_with_reaper(test_config(&root), Duration::from_millis(300)).await;
    client.login().await;

    let mut data = client.open_passive().await;
    client.send("STOR /data/stall.bin").await;
    client.expect("150 ").await;
    data.write_all(b"stalling").await.unwrap();

    // Go quiet: the reaper must abort the transfer, discard the staging
    // file and close the control connection.
    let terminal = client.line().await;
    assert!(terminal.starts_with("426"), "unexpected terminal: {}", terminal);
    client.expect("421 Idle timeout").await;
    assert!(!root.join(".stall.bin.in").exists());
    assert!(!root.join("stall.bin").exists());

    let mut rest = String::new();
    let n = tokio::time::timeout(
        Duration::from_secs(5),
        client.reader.read_to_string(&mut rest),
    )
    .await
    .expect("server did not close the connection")
    .unwrap();
    assert_eq!(n, 0, "unexpected trailing data: {}", rest);
}

#[tokio::test]
async fn quit_aborts_and_closes_the_session() {
    let root = tempdir("quit");
    let mut client = Client::connect(test_config(&root)).await;
    client.login().await;

    client.send("QUIT").await;
    client.expect("221 ").await;
    let mut rest = String::new();
    let n = tokio::time::timeout(
        Duration::from_secs(5),
        client.reader.read_to_string(&mut rest),
    )
    .await
    .expect("server did not close the connection")
    .unwrap();
    assert_eq!(n, 0, "unexpected trailing data: {}", rest);
}
