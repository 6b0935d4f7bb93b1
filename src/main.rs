mod common;
mod config;
mod network;
mod storage;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use common::{ChatMessage, Direction, NetworkCommand, NetworkEvent};
use network::P2PClient;
use storage::ArchiveStore;

#[derive(Parser)]
#[command(
    name = "rust_lan_chat",
    version,
    about = "Serverless LAN chat over UDP broadcast discovery"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Override the chat port from the config (0 = auto)
    #[arg(long)]
    port: Option<u16>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Run without the console (announce/receive only, events go to the log)
    Headless,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    if !std::path::Path::new(&cli.config).exists() {
        // Ghi file mặc định cho lần chạy đầu, để người dùng có mẫu mà sửa.
        if let Err(err) = config::save_config(&cli.config, &app_config) {
            log::warn!("Failed to write default config {}: {err}", cli.config);
        }
    }
    if let Some(port) = cli.port {
        app_config.local_port = port;
    }

    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Network
    let (command_sender, command_receiver) = mpsc::channel(100);
    // Network -> UI
    let (event_sender, event_receiver) = mpsc::channel(100);

    // 2. Khởi chạy Network (Chạy ngầm)
    let network_config = app_config.clone();
    tokio::spawn(async move {
        let client = P2PClient::new(event_sender, command_receiver, network_config);
        if let Err(err) = client.run().await {
            log::error!("Network client terminated: {err}");
        }
    });

    // 3. Kho lưu trữ với vòng purge riêng của nó
    let archive = Arc::new(ArchiveStore::new(app_config.archive_ttl_ms));
    let (purge_stop, purge_stop_receiver) = watch::channel(false);
    tokio::spawn(storage::archive::run_purge_loop(
        Arc::clone(&archive),
        app_config.archive_purge_interval_ms,
        purge_stop_receiver,
    ));

    // 4. Tầng hiển thị: console đọc stdin, hoặc headless chỉ ghi log
    if cli.mode == Some(Mode::Headless) {
        run_headless(event_receiver).await;
    } else {
        run_console(command_sender, event_receiver, archive).await;
    }

    let _ = purge_stop.send(true);
    Ok(())
}

async fn run_headless(mut event_receiver: mpsc::Receiver<NetworkEvent>) {
    while let Some(event) = event_receiver.recv().await {
        match event {
            NetworkEvent::MessageReceived(message) => {
                let source = message.source.map(|addr| addr.to_string());
                log::info!("Message from {}: {}", source.unwrap_or_default(), message.content);
            }
            NetworkEvent::MessageSent(_) => {}
            NetworkEvent::PeerAdded(peer) => log::info!("Peer online: {peer}"),
            NetworkEvent::PeerRemoved(peer) => log::info!("Peer offline: {peer}"),
            NetworkEvent::Error { component, message } => {
                log::error!("[{component}] {message}");
            }
        }
    }
}

/// Trạng thái cục bộ của console — bản thay thế tối giản cho cửa sổ chat.
struct ConsoleState {
    lines: Vec<String>,
    peers: Vec<SocketAddr>,
    remote_ip: String,
    remote_port: String,
}

impl ConsoleState {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            peers: Vec::new(),
            remote_ip: String::new(),
            remote_port: String::new(),
        }
    }

    fn push_line(&mut self, line: String) {
        println!("{line}");
        self.lines.push(line);
    }

    fn add_peer(&mut self, peer: SocketAddr) {
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
    }

    fn remove_peer(&mut self, peer: SocketAddr) {
        self.peers.retain(|known| *known != peer);
    }

    fn apply_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::MessageSent(message) | NetworkEvent::MessageReceived(message) => {
                self.push_line(format_message(&message));
            }
            NetworkEvent::PeerAdded(peer) => {
                self.add_peer(peer);
                println!("* {peer} is online");
            }
            NetworkEvent::PeerRemoved(peer) => {
                self.remove_peer(peer);
                println!("* {peer} went offline");
            }
            NetworkEvent::Error { component, message } => {
                // Lỗi hiện ngay trong khung chat, như một dòng tin nhắn.
                self.push_line(format!("[{component}] Error: {message}"));
            }
        }
    }
}

async fn run_console(
    command_sender: mpsc::Sender<NetworkCommand>,
    mut event_receiver: mpsc::Receiver<NetworkEvent>,
    archive: Arc<ArchiveStore>,
) {
    let mut state = ConsoleState::new();
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();
    loop {
        tokio::select! {
            event = event_receiver.recv() => {
                match event {
                    Some(event) => state.apply_event(event),
                    // Tầng mạng đã chết — console không còn gì để hiển thị.
                    None => break,
                }
            }
            line = input_lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_input(line.trim(), &mut state, &command_sender, &archive).await {
                            break;
                        }
                    }
                    // EOF hoặc stdin lỗi: thoát như người dùng đóng cửa sổ.
                    _ => break,
                }
            }
        }
    }
}

async fn handle_input(
    input: &str,
    state: &mut ConsoleState,
    command_sender: &mpsc::Sender<NetworkCommand>,
    archive: &ArchiveStore,
) -> bool {
    match input {
        "" => {}
        "/quit" => return false,
        "/help" => print_help(),
        "/peers" => {
            if state.peers.is_empty() {
                println!("No peers discovered yet");
            }
            for (index, peer) in state.peers.iter().enumerate() {
                println!("{}. {peer}", index + 1);
            }
        }
        "/list" => {
            for (index, line) in state.lines.iter().enumerate() {
                println!("{}. {line}", index + 1);
            }
        }
        "/delall" => {
            let lines = std::mem::take(&mut state.lines);
            println!("Archived {} line(s)", lines.len());
            archive.archive_all(lines);
        }
        "/restore" => {
            let restored = archive.restore_all();
            if restored.is_empty() {
                println!("Archive is empty");
            }
            for line in restored {
                state.push_line(line);
            }
        }
        "/archive" => {
            if archive.is_empty() {
                println!("Archive is empty");
            } else {
                println!("Archive holds {} line(s)", archive.len());
            }
        }
        _ => {
            if let Some(argument) = input.strip_prefix("/to ") {
                select_target(argument.trim(), state);
            } else if let Some(argument) = input.strip_prefix("/del ") {
                delete_line(argument.trim(), state, archive);
            } else if input.starts_with('/') {
                println!("Unknown command, try /help");
            } else {
                let command = NetworkCommand::SendMessage {
                    content: input.to_string(),
                    remote_ip: state.remote_ip.clone(),
                    remote_port: state.remote_port.clone(),
                };
                if let Err(err) = command_sender.send(command).await {
                    log::warn!("Failed to send command to network: {err}");
                }
            }
        }
    }
    true
}

/// `/to 2` chọn peer thứ 2 trong `/peers`; `/to ip:cổng` nhập tay.
fn select_target(argument: &str, state: &mut ConsoleState) {
    if let Ok(index) = argument.parse::<usize>() {
        match state.peers.get(index.wrapping_sub(1)) {
            Some(peer) => {
                state.remote_ip = peer.ip().to_string();
                state.remote_port = peer.port().to_string();
                println!("Sending to {peer}");
            }
            None => println!("No peer #{argument}, see /peers"),
        }
        return;
    }
    // Chỉ tách chuỗi; kiểm tra thật nằm ở tầng vận chuyển.
    match argument.rsplit_once(':') {
        Some((ip, port)) => {
            state.remote_ip = ip.trim().to_string();
            state.remote_port = port.trim().to_string();
            println!("Sending to {}:{}", state.remote_ip, state.remote_port);
        }
        None => println!("Usage: /to <n> or /to <ip>:<port>"),
    }
}

/// Gỡ dòng thứ n khỏi khung chat và đưa vào kho lưu trữ.
fn delete_line(argument: &str, state: &mut ConsoleState, archive: &ArchiveStore) {
    let Ok(index) = argument.parse::<usize>() else {
        println!("Usage: /del <line number>");
        return;
    };
    if index == 0 || index > state.lines.len() {
        println!("No line #{index}, see /list");
        return;
    }
    let line = state.lines.remove(index - 1);
    println!("Archived: {line}");
    archive.archive(line);
}

/// Dựng dòng hiển thị đúng kiểu `Me:` / `Rem:` của khung chat.
fn format_message(message: &ChatMessage) -> String {
    match message.direction {
        Direction::Outgoing => format!(
            "Me: {} [{}]",
            message.content,
            format_time(message.timestamp)
        ),
        Direction::Incoming => {
            let source = message
                .source
                .map(|addr| addr.to_string())
                .unwrap_or_default();
            format!(
                "Rem: {} [{}, {}]",
                message.content,
                format_time(message.timestamp),
                source
            )
        }
    }
}

fn format_time(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "??:??:??".to_string())
}

fn print_help() {
    println!("Commands:");
    println!("  /peers            list discovered peers");
    println!("  /to <n|ip:port>   choose who to send to");
    println!("  /list             show chat lines with numbers");
    println!("  /del <n>          archive chat line n");
    println!("  /delall           archive the whole chat view");
    println!("  /restore          bring archived lines back");
    println!("  /archive          show archive size");
    println!("  /quit             exit");
    println!("Anything else is sent as a message.");
}
