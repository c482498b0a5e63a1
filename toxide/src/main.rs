use clap::Parser;
use crossterm::event::{self};
use directories::{ProjectDirs, UserDirs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use toxide::app::AppContext;
use toxide::config;
use toxide::friends::BlockList;
use toxide::model::{Model, Paths, SelfInfo};
use toxide::msg::{Msg, SystemEvent, ToxAction};
use toxide::terminal::TerminalHandle;
use toxide::time::RealTimeProvider;
use toxide::ui::draw;
use toxide::update::update;
use toxide::{io, worker};
use toxide_net::sim::SimNetlink;
use toxide_net::{Netlink, PublicKey};

/// toxide - a terminal Tox client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Use a specific data file
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Use a specific config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Disable IPv6 (IPv4 only)
    #[arg(long)]
    ipv4: bool,

    /// Skip bootstrapping
    #[arg(long)]
    no_connect: bool,

    /// Ignore the locale environment and use the default locale
    #[arg(long)]
    default_locale: bool,

    /// Use a specific bootstrap nodes list
    #[arg(long)]
    nodes: Option<PathBuf>,
}

struct Runtime {
    should_stop: Arc<AtomicBool>,
    tick_handle: tokio::task::JoinHandle<()>,
    input_handle: tokio::task::JoinHandle<()>,
}

impl Runtime {
    fn new(tx: mpsc::Sender<Msg>) -> Self {
        let should_stop = Arc::new(AtomicBool::new(false));

        let should_stop_tick = should_stop.clone();
        let tx_tick = tx.clone();
        let tick_handle = tokio::spawn(async move {
            let tick_rate = Duration::from_millis(200);
            loop {
                if should_stop_tick.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(tick_rate).await;
                if tx_tick.send(Msg::System(SystemEvent::Tick)).is_err() {
                    break;
                }
            }
        });

        let should_stop_input = should_stop.clone();
        let tx_input = tx.clone();
        let input_handle = tokio::spawn(async move {
            loop {
                if should_stop_input.load(Ordering::Relaxed) {
                    break;
                }
                if let Ok(true) = event::poll(Duration::from_millis(100))
                    && let Ok(ev) = event::read()
                    && tx_input.send(Msg::Input(ev)).is_err()
                {
                    break;
                }
            }
        });

        Self {
            should_stop,
            tick_handle,
            input_handle,
        }
    }

    async fn shutdown(self) {
        self.should_stop.store(true, Ordering::Relaxed);
        let _ = self.input_handle.await;
        let _ = self.tick_handle.await;
    }
}

/// Bootstrap nodes: one `host port key` entry per line, `#` comments.
fn load_nodes(path: &std::path::Path) -> Vec<(String, u16, PublicKey)> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    data.lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .filter_map(|l| {
            let mut parts = l.split_whitespace();
            let host = parts.next()?.to_owned();
            let port = parts.next()?.parse().ok()?;
            let key = PublicKey::from_hex(&parts.next()?.to_lowercase())?;
            Some((host, port, key))
        })
        .collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.default_locale {
        // Bypass locale inheritance from the environment.
        unsafe {
            std::env::set_var("LC_ALL", "C");
        }
    }

    let data_dir = ProjectDirs::from("", "", "toxide")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&data_dir);

    let data_file = args.data_file.unwrap_or_else(|| data_dir.join("profile.json"));
    let config_file = args.config.unwrap_or_else(|| data_dir.join("toxide.toml"));

    let config = match config::load(&config_file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("toxide: {}", e);
            return ExitCode::from(4);
        }
    };

    let net = match SimNetlink::load(&data_file) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("toxide: data file error: {}", e);
            return ExitCode::from(3);
        }
    };

    let download_dir = config
        .tox
        .download_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| UserDirs::new().and_then(|d| d.download_dir().map(|p| p.to_path_buf())))
        .unwrap_or_else(|| data_dir.join("downloads"));
    let chatlogs_dir = config
        .tox
        .chatlogs_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("chatlogs"));

    let paths = Paths {
        data_file: data_file.clone(),
        config_file,
        blocklist_file: data_dir.join("blocklist"),
        download_dir,
        chatlogs_dir,
    };

    let me = SelfInfo {
        address: net.self_address(),
        pk: net.self_public_key(),
        name: {
            let n = net.self_name();
            if n.is_empty() { "toxide user".to_owned() } else { n }
        },
        status: net.self_status(),
        note: net.self_status_message(),
        connection: toxide_net::Connection::None,
    };

    let time = Arc::new(RealTimeProvider::new(None));
    let mut model = Model::new(me, config, paths.clone(), time);

    // Contacts from the data file, with per-key config overrides.
    for number in net.friend_list() {
        if let Some(pk) = net.friend_public_key(number) {
            let cfg = model.config.clone();
            let friend = model.friends.add(number, pk, &cfg);
            if let Some(name) = net.friend_name(number).filter(|n| !n.is_empty()) {
                friend.name = name;
            }
        }
    }
    model.friends.sort();

    match BlockList::load(&paths.blocklist_file) {
        Ok(list) => model.blocklist = list,
        Err(e) => {
            model.sys_prompt(format!("Failed to load the block list: {}", e));
        }
    }

    if model.config.ui.show_welcome_msg {
        model.sys_prompt("Welcome to toxide!".to_owned());
        model.sys_prompt(format!("Your Tox ID: {}", model.me.address));
        model.sys_prompt("Type /help for a list of commands.".to_owned());
    }

    let (tx, rx) = mpsc::channel();
    let (tx_tox_action, rx_tox_action) = mpsc::channel();
    let (tx_io, rx_io) = mpsc::channel();

    let runtime = Runtime::new(tx.clone());
    let net_handle = worker::spawn_net(tx.clone(), rx_tox_action, Box::new(net), data_file);
    let _io_handle = io::spawn_io_worker(tx.clone(), tx_tox_action.clone(), rx_io);

    let mut ctx = AppContext {
        tx_tox_action,
        tx_io,
        net_handle: Some(net_handle),
    };

    if !args.no_connect {
        let nodes = args
            .nodes
            .map(|p| load_nodes(&p))
            .unwrap_or_default();
        for (host, port, key) in nodes {
            let _ = ctx.tx_tox_action.send(ToxAction::Bootstrap(host, port, key));
        }
    }
    let _ = args.ipv4; // transport options belong to the network layer

    let mut tui = match TerminalHandle::new() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("toxide: failed to initialize the terminal: {}", e);
            return ExitCode::from(2);
        }
    };

    while let Ok(first_msg) = rx.recv() {
        let mut batch = vec![first_msg];
        while let Ok(msg) = rx.try_recv() {
            batch.push(msg);
        }

        let mut should_break = false;
        for msg in batch {
            let cmds = update(&mut model, msg);
            let res = ctx.execute(cmds, &mut model).await;
            if res.should_quit {
                should_break = true;
                break;
            }
            if res.needs_redraw && tui.terminal.clear().is_err() {
                should_break = true;
                break;
            }
        }
        if should_break {
            break;
        }

        // One queued scrollback line per window per render pass.
        model.windows.flush_scrollback_step();

        if model.windows.refresh && tui.terminal.draw(|f| draw(f, &mut model)).is_err() {
            break;
        }
    }

    runtime.shutdown().await;

    // Final drain so late events still land in the data file.
    while let Ok(msg) = rx.try_recv() {
        let cmds = update(&mut model, msg);
        let _ = ctx.execute(cmds, &mut model).await;
    }
    let _ = ctx.tx_tox_action.send(ToxAction::StoreData);
    let _ = model.blocklist.save(&paths.blocklist_file);

    drop(tui);
    ExitCode::SUCCESS
}
