//! The message pipeline: blocked words, offline noread marks, read
//! receipts and retries.

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use toxide::msg::{Cmd, Msg, ToxAction, ToxEvent};
use toxide::scrollback::LineKind;
use toxide::testing::TestContext;
use toxide::update::update;
use toxide_net::{Connection, MessageKind, ReceiptId, SendError};

fn press(model: &mut toxide::model::Model, code: KeyCode) -> Vec<Cmd> {
    update(
        model,
        Msg::Input(CrosstermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))),
    )
}

fn type_line(model: &mut toxide::model::Model, text: &str) {
    for c in text.chars() {
        press(model, KeyCode::Char(c));
    }
}

#[test]
fn blocked_word_suppresses_send_and_keeps_the_buffer() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    model.config.blocked_words.push("secret".into());
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    type_line(&mut model, "the secret handshake");
    let cmds = press(&mut model, KeyCode::Enter);

    assert!(
        !cmds.iter().any(|c| matches!(c, Cmd::Tox(ToxAction::SendMessage(..)))),
        "no outbound message"
    );
    let w = model.windows.chat_mut(friend).unwrap();
    assert_eq!(w.input.text(), "the secret handshake", "buffer intact");
    w.scrollback.flush_all();
    assert!(
        w.scrollback
            .iter()
            .any(|l| l.text == "* Message contains blocked word")
    );
}

#[test]
fn enter_sends_and_clears_the_buffer() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    type_line(&mut model, "hello there   ");
    let cmds = press(&mut model, KeyCode::Enter);

    // Trailing spaces are stripped before the send.
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::SendMessage(_, MessageKind::Normal, text, _)) if text == "hello there"
    )));
    let w = model.windows.chat_mut(friend).unwrap();
    assert!(w.input.is_empty());
    w.scrollback.flush_all();
    assert!(w.scrollback.iter().any(|l| l.kind == LineKind::OutMessage));
}

#[test]
fn offline_send_gets_noread_and_reconnect_resends() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    type_line(&mut model, "are you there?");
    press(&mut model, KeyCode::Enter);

    // The worker reports the failure; the line keeps its unread mark.
    let line_id = {
        let w = model.windows.chat_mut(friend).unwrap();
        w.scrollback.flush_all();
        w.scrollback.iter().last().unwrap().id
    };
    update(
        &mut model,
        Msg::Tox(ToxEvent::MessageSendFailed(
            friend,
            line_id,
            SendError::FriendNotConnected,
        )),
    );
    {
        let w = model.windows.chat_mut(friend).unwrap();
        assert!(w.scrollback.get(line_id).unwrap().noread);
    }

    // Reconnection re-sends the unreceipted entry.
    let cmds = update(
        &mut model,
        Msg::Tox(ToxEvent::FriendConnectionStatus(friend, Connection::Udp)),
    );
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::SendMessage(_, _, text, id)) if text == "are you there?" && *id == line_id
    )));
}

#[test]
fn read_receipt_flips_noread_and_pops_the_queue() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    type_line(&mut model, "ping");
    press(&mut model, KeyCode::Enter);
    let line_id = {
        let w = model.windows.chat_mut(friend).unwrap();
        w.scrollback.flush_all();
        w.scrollback.iter().last().unwrap().id
    };

    update(
        &mut model,
        Msg::Tox(ToxEvent::MessageSent(friend, ReceiptId(5), line_id)),
    );
    assert_eq!(model.friends.get(friend).unwrap().queue.len(), 1);

    update(
        &mut model,
        Msg::Tox(ToxEvent::ReadReceipt(friend, ReceiptId(5))),
    );
    assert_eq!(model.friends.get(friend).unwrap().queue.len(), 0);
    let w = model.windows.chat_mut(friend).unwrap();
    let line = w.scrollback.get(line_id).unwrap();
    assert_eq!(line.kind, LineKind::OutMessageRead);
    assert!(!line.noread);
}

#[test]
fn incoming_message_raises_an_alert_on_inactive_windows() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();
    // Active window stays the prompt.

    update(
        &mut model,
        Msg::Tox(ToxEvent::FriendMessage(friend, MessageKind::Normal, "hi!".into())),
    );
    let w = model.windows.chat_mut(friend).unwrap();
    assert_eq!(w.pending_messages, 1);
    assert_ne!(w.alert, toxide::windows::AlertLevel::None);
    let id = w.id;

    // Activating the window clears both.
    model.windows.set_active(id);
    let w = model.windows.chat_mut(friend).unwrap();
    assert_eq!(w.pending_messages, 0);
    assert_eq!(w.alert, toxide::windows::AlertLevel::None);
}

#[test]
fn typing_notifications_follow_the_input_state() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    let cmds = press(&mut model, KeyCode::Char('h'));
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::SetTyping(_, true))
    )));

    let cmds = press(&mut model, KeyCode::Backspace);
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::SetTyping(_, false))
    )));

    // Commands never advertise typing.
    let cmds = press(&mut model, KeyCode::Char('/'));
    assert!(
        !cmds.iter().any(|c| matches!(c, Cmd::Tox(ToxAction::SetTyping(_, true))))
    );
}
