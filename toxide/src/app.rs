//! Command execution: the bridge between `update`'s returned commands
//! and the worker channels.

use crate::model::Model;
use crate::msg::{AppCmd, Cmd, IOAction, ToxAction};
use std::io::Write;
use std::sync::mpsc;
use tokio::task::JoinHandle;

pub struct AppContext {
    pub tx_tox_action: mpsc::Sender<ToxAction>,
    pub tx_io: mpsc::Sender<IOAction>,
    pub net_handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct ExecutionResult {
    pub should_quit: bool,
    pub needs_redraw: bool,
}

impl AppContext {
    pub async fn execute(&mut self, cmds: Vec<Cmd>, model: &mut Model) -> ExecutionResult {
        let mut result = ExecutionResult::default();
        for cmd in cmds {
            match cmd {
                Cmd::Tox(action) => {
                    let _ = self.tx_tox_action.send(action);
                }
                Cmd::IO(action) => {
                    let _ = self.tx_io.send(action);
                }
                Cmd::App(AppCmd::Quit) => {
                    let _ = self.tx_tox_action.send(ToxAction::Shutdown);
                    if let Some(handle) = self.net_handle.take() {
                        let _ = handle.await;
                    }
                    model.quit = true;
                    result.should_quit = true;
                }
                Cmd::App(AppCmd::Redraw) => {
                    result.needs_redraw = true;
                }
                Cmd::App(AppCmd::Bell) => {
                    let mut out = std::io::stdout();
                    let _ = out.write_all(b"\x07");
                    let _ = out.flush();
                }
            }
        }
        result
    }
}
