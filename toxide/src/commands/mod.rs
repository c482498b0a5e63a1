//! The `/command` executor: a quote-aware tokenizer and per-scope
//! command tables. The global table is reachable from every window;
//! chat, conference and group windows each add their own set.

use crate::model::Model;
use crate::msg::Cmd;
use crate::windows::WindowKind;
use toxide_net::{ConferenceNumber, FriendNumber, GroupNumber};

pub mod chat;
pub mod conference;
pub mod global;
pub mod group;

#[derive(Clone, Copy)]
pub struct CommandDef {
    pub name: &'static str,
    pub args: &'static str,
    pub desc: &'static str,
    pub exec: fn(&mut Model, &[&str]) -> Vec<Cmd>,
}

/// Splits a command line into argv, honoring double-quoted strings
/// and swallowing leading whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn tables_for(kind: WindowKind) -> Vec<&'static [CommandDef]> {
    let mut tables: Vec<&'static [CommandDef]> = vec![global::COMMANDS];
    match kind {
        WindowKind::Chat(_) => tables.push(chat::COMMANDS),
        WindowKind::Conference(_) => tables.push(conference::COMMANDS),
        WindowKind::Group(_) => tables.push(group::COMMANDS),
        _ => {}
    }
    tables
}

/// Command names available in the given window, for tab completion.
pub fn command_names(kind: WindowKind) -> Vec<String> {
    tables_for(kind)
        .iter()
        .flat_map(|t| t.iter())
        .map(|c| format!("/{}", c.name))
        .collect()
}

/// Tokenizes and dispatches one `/cmd` line against the active
/// window's command tables.
pub fn execute(model: &mut Model, line: &str) -> Vec<Cmd> {
    let args = tokenize(line);
    let Some(head) = args.first() else {
        return Vec::new();
    };
    let name = head.trim_start_matches('/');
    let Some(kind) = model.windows.active().map(|w| w.kind) else {
        return Vec::new();
    };

    for table in tables_for(kind) {
        if let Some(def) = table.iter().find(|c| c.name == name) {
            let rest: Vec<&str> = args[1..].iter().map(String::as_str).collect();
            return (def.exec)(model, &rest);
        }
    }

    model.sys_active(format!("Invalid command: /{}", name));
    Vec::new()
}

// Helpers shared by the command tables.

pub(crate) fn active_chat(model: &Model) -> Option<FriendNumber> {
    match model.windows.active()?.kind {
        WindowKind::Chat(n) => Some(n),
        _ => None,
    }
}

pub(crate) fn active_conference(model: &Model) -> Option<ConferenceNumber> {
    match model.windows.active()?.kind {
        WindowKind::Conference(n) => Some(n),
        _ => None,
    }
}

pub(crate) fn active_group(model: &Model) -> Option<GroupNumber> {
    match model.windows.active()?.kind {
        WindowKind::Group(n) => Some(n),
        _ => None,
    }
}

pub(crate) fn usage(model: &mut Model, text: &str) -> Vec<Cmd> {
    model.sys_active(format!("Usage: {}", text));
    Vec::new()
}

pub(crate) fn info(model: &mut Model, text: String) -> Vec<Cmd> {
    model.sys_active(text);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[test]
    fn tokenizer_respects_quotes() {
        assert_eq!(tokenize("/add 123 hello"), vec!["/add", "123", "hello"]);
        assert_eq!(
            tokenize("/sendfile \"my file.txt\" trailing"),
            vec!["/sendfile", "my file.txt", "trailing"]
        );
        assert_eq!(tokenize("   /nick   roo  "), vec!["/nick", "roo"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn unknown_command_prints_a_system_line() {
        let ctx = TestContext::new();
        let mut model = ctx.create_model();
        let cmds = execute(&mut model, "/definitely-not-a-command");
        assert!(cmds.is_empty());
        let w = model.windows.active_mut().unwrap();
        w.scrollback.flush_all();
        let text: Vec<String> = w.scrollback.iter().map(|l| l.text.clone()).collect();
        assert!(text.iter().any(|t| t.contains("Invalid command")));
    }

    #[test]
    fn chat_commands_are_not_reachable_from_the_prompt() {
        let ctx = TestContext::new();
        let mut model = ctx.create_model();
        execute(&mut model, "/sendfile /tmp/x");
        let w = model.windows.active_mut().unwrap();
        w.scrollback.flush_all();
        let text: Vec<String> = w.scrollback.iter().map(|l| l.text.clone()).collect();
        assert!(text.iter().any(|t| t.contains("Invalid command")));
    }
}
