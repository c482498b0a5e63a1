//! File transfer flows: resume across disconnect, destination
//! collision handling, the pending-send queue and avatar broadcast.

use toxide::msg::{Cmd, IOAction, Msg, ToxAction, ToxEvent};
use toxide::testing::TestContext;
use toxide::transfers::{TransferDirection, TransferState};
use toxide::update::{self, update};
use toxide_net::{Connection, FileControl, FileId, FileKind, FileNumber, FriendNumber};

fn tox(model: &mut toxide::model::Model, ev: ToxEvent) -> Vec<Cmd> {
    update(model, Msg::Tox(ev))
}

fn scrollback_text(model: &mut toxide::model::Model, friend: FriendNumber) -> Vec<String> {
    let w = model.windows.chat_mut(friend).unwrap();
    w.scrollback.flush_all();
    w.scrollback.iter().map(|l| l.text.clone()).collect()
}

fn file_send_cmds(cmds: &[Cmd]) -> Vec<&Cmd> {
    cmds.iter()
        .filter(|c| matches!(c, Cmd::Tox(ToxAction::FileSend(..))))
        .collect()
}

#[test]
fn send_resumes_after_disconnect_and_completes() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    let src = ctx.data_dir.join("payload.bin");
    std::fs::write(&src, vec![7u8; 10240]).unwrap();

    let cmds = update::send_file(&mut model, friend, src.to_str().unwrap());
    assert!(matches!(
        cmds.as_slice(),
        [Cmd::Tox(ToxAction::FileSend(_, FileKind::Data, 10240, None, _, 0))]
    ));

    // The worker assigns the session file number and the stable id.
    let file_id = FileId([0xAB; 32]);
    let cmds = tox(
        &mut model,
        ToxEvent::FileSendStarted(friend, FileNumber(7), file_id, FileKind::Data, 0),
    );
    assert!(matches!(cmds.as_slice(), [Cmd::IO(IOAction::FileOpenRead(..))]));

    // Peer acks; chunk pump moves 4 KiB.
    tox(&mut model, ToxEvent::FileControlRecv(friend, FileNumber(7), FileControl::Resume));
    for i in 0..4u64 {
        let cmds = tox(
            &mut model,
            ToxEvent::FileChunkRequest(friend, FileNumber(7), i * 1024, 1024),
        );
        assert!(matches!(cmds.as_slice(), [Cmd::IO(IOAction::ReadChunk(..))]));
        update(
            &mut model,
            Msg::IO(toxide::msg::IOEvent::ChunkRead(friend, file_id, i * 1024, 1024)),
        );
    }

    {
        let f = model.friends.get(friend).unwrap();
        let ft = f.transfers.get(TransferDirection::Send, 0).unwrap();
        assert_eq!(ft.state, TransferState::Started);
        assert_eq!(ft.position, 4096);
    }

    // Disconnect pauses the data sender.
    tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::None));
    assert_eq!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Send, 0)
            .unwrap()
            .state,
        TransferState::Paused
    );

    // Reconnect restarts the send with the same stable id.
    let cmds = tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::Udp));
    let restarts = file_send_cmds(&cmds);
    assert_eq!(restarts.len(), 1);
    assert!(matches!(
        restarts[0],
        Cmd::Tox(ToxAction::FileSend(_, FileKind::Data, 10240, Some(id), _, 0)) if *id == file_id
    ));

    // New session file number replaces the old one.
    tox(
        &mut model,
        ToxEvent::FileSendStarted(friend, FileNumber(8), file_id, FileKind::Data, 0),
    );
    tox(&mut model, ToxEvent::FileControlRecv(friend, FileNumber(8), FileControl::Resume));
    assert_eq!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Send, 0)
            .unwrap()
            .file_number,
        FileNumber(8)
    );

    for i in 4..10u64 {
        tox(
            &mut model,
            ToxEvent::FileChunkRequest(friend, FileNumber(8), i * 1024, 1024),
        );
        update(
            &mut model,
            Msg::IO(toxide::msg::IOEvent::ChunkRead(friend, file_id, i * 1024, 1024)),
        );
    }
    assert_eq!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Send, 0)
            .unwrap()
            .position,
        10240
    );

    // Zero-length request: transfer complete, slot released.
    tox(&mut model, ToxEvent::FileChunkRequest(friend, FileNumber(8), 10240, 0));
    assert!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Send, 0)
            .is_none()
    );
    let text = scrollback_text(&mut model, friend);
    assert!(
        text.iter()
            .any(|t| t.contains("File 'payload.bin' successfully sent."))
    );
}

#[test]
fn incoming_filename_collisions_get_numbered_suffixes() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    std::fs::write(model.paths.download_dir.join("photo.png"), b"existing").unwrap();

    tox(
        &mut model,
        ToxEvent::FileRecv(friend, FileNumber(1), FileKind::Data, 100, "photo.png".into(), FileId([1; 32])),
    );
    tox(
        &mut model,
        ToxEvent::FileRecv(friend, FileNumber(2), FileKind::Data, 100, "photo.png".into(), FileId([2; 32])),
    );

    let f = model.friends.get(friend).unwrap();
    let first = f.transfers.get(TransferDirection::Receive, 0).unwrap();
    let second = f.transfers.get(TransferDirection::Receive, 1).unwrap();
    assert_eq!(first.path, model.paths.download_dir.join("photo.png(1)"));
    assert_eq!(second.path, model.paths.download_dir.join("photo.png(2)"));
}

#[test]
fn invalid_filenames_are_rejected_with_a_cancel() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    for bad in ["", "..", "a/b", " leading", "-flag"] {
        let cmds = tox(
            &mut model,
            ToxEvent::FileRecv(friend, FileNumber(9), FileKind::Data, 10, bad.into(), FileId([9; 32])),
        );
        assert!(
            cmds.iter().any(|c| matches!(
                c,
                Cmd::Tox(ToxAction::FileControl(_, _, FileControl::Cancel))
            )),
            "{:?} should be cancelled",
            bad
        );
    }
    assert!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Receive, 0)
            .is_none()
    );
}

#[test]
fn pending_queue_drains_in_order_after_cancel() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    let win = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(win);

    for name in ["a", "b", "c"] {
        let path = ctx.data_dir.join(name);
        std::fs::write(&path, b"data").unwrap();
        let cmds = update::send_file(&mut model, friend, path.to_str().unwrap());
        assert!(cmds.is_empty(), "offline sends are queued, not sent");
    }
    assert_eq!(model.friends.get(friend).unwrap().transfers.pending.len(), 3);

    let text = scrollback_text(&mut model, friend);
    assert!(text.iter().any(|t| t.contains("File transfer queued") && t.contains("(0)")));
    assert!(text.iter().any(|t| t.contains("(1)")));
    assert!(text.iter().any(|t| t.contains("(2)")));

    // Cancel the middle entry by its queue index.
    toxide::commands::execute(&mut model, "/cancel out 1");
    assert_eq!(model.friends.get(friend).unwrap().transfers.pending.len(), 2);

    // Reconnect drains the queue in order: a then c.
    let cmds = tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::Udp));
    let sends = file_send_cmds(&cmds);
    assert_eq!(sends.len(), 2);
    match (sends[0], sends[1]) {
        (
            Cmd::Tox(ToxAction::FileSend(_, _, _, _, first, _)),
            Cmd::Tox(ToxAction::FileSend(_, _, _, _, second, _)),
        ) => {
            assert_eq!(first, "a");
            assert_eq!(second, "c");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn avatar_transfers_are_killed_on_disconnect_not_paused() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    // A started avatar send and a started data send.
    let png = ctx.data_dir.join("me.png");
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 64]);
    std::fs::write(&png, &data).unwrap();
    model.avatar = Some(toxide::avatar::Avatar::set(&png).unwrap());

    let cmds = update::avatar_send(&mut model, friend);
    assert_eq!(file_send_cmds(&cmds).len(), 1);
    tox(
        &mut model,
        ToxEvent::FileSendStarted(friend, FileNumber(1), FileId([1; 32]), FileKind::Avatar, 0),
    );
    tox(&mut model, ToxEvent::FileControlRecv(friend, FileNumber(1), FileControl::Resume));

    let src = ctx.data_dir.join("doc.txt");
    std::fs::write(&src, b"hello").unwrap();
    update::send_file(&mut model, friend, src.to_str().unwrap());
    tox(
        &mut model,
        ToxEvent::FileSendStarted(friend, FileNumber(2), FileId([2; 32]), FileKind::Data, 1),
    );
    tox(&mut model, ToxEvent::FileControlRecv(friend, FileNumber(2), FileControl::Resume));

    tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::None));

    let f = model.friends.get(friend).unwrap();
    assert!(f.transfers.get(TransferDirection::Send, 0).is_none(), "avatar killed");
    assert_eq!(
        f.transfers.get(TransferDirection::Send, 1).unwrap().state,
        TransferState::Paused,
        "data send paused"
    );
}

#[test]
fn idle_transfers_time_out_with_one_visible_line() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    let src = ctx.data_dir.join("slow.bin");
    std::fs::write(&src, vec![0u8; 2048]).unwrap();
    update::send_file(&mut model, friend, src.to_str().unwrap());
    tox(
        &mut model,
        ToxEvent::FileSendStarted(friend, FileNumber(3), FileId([3; 32]), FileKind::Data, 0),
    );
    tox(&mut model, ToxEvent::FileControlRecv(friend, FileNumber(3), FileControl::Resume));

    ctx.advance(std::time::Duration::from_secs(121));
    let cmds = update(&mut model, Msg::System(toxide::msg::SystemEvent::Tick));
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::FileControl(_, _, FileControl::Cancel))
    )));
    assert!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Send, 0)
            .is_none()
    );
    let text = scrollback_text(&mut model, friend);
    assert_eq!(
        text.iter().filter(|t| t.contains("timed out")).count(),
        1
    );
}

#[test]
fn auto_accept_opens_the_file_immediately() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.friends.get_mut(friend).unwrap().auto_accept_files = true;
    model.ensure_chat_window(friend).unwrap();

    let cmds = tox(
        &mut model,
        ToxEvent::FileRecv(friend, FileNumber(4), FileKind::Data, 64, "gift.txt".into(), FileId([4; 32])),
    );
    assert!(cmds.iter().any(|c| matches!(c, Cmd::IO(IOAction::FileOpenWrite(..)))));
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::FileControl(_, _, FileControl::Resume))
    )));
    assert_eq!(
        model
            .friends
            .get(friend)
            .unwrap()
            .transfers
            .get(TransferDirection::Receive, 0)
            .unwrap()
            .state,
        TransferState::Started
    );
}

#[test]
fn incoming_resume_matches_paused_slot_by_file_id() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    ctx.set_online(&mut model, friend);
    model.ensure_chat_window(friend).unwrap();

    let file_id = FileId([0x42; 32]);
    tox(
        &mut model,
        ToxEvent::FileRecv(friend, FileNumber(5), FileKind::Data, 4096, "big.bin".into(), file_id),
    );
    let cmds = toxide::update::save_file(&mut model, friend, 0);
    assert!(cmds.iter().any(|c| matches!(c, Cmd::IO(IOAction::FileOpenWrite(..)))));

    // 1 KiB lands, then the peer disconnects.
    tox(&mut model, ToxEvent::FileRecvChunk(friend, FileNumber(5), 0, vec![0u8; 1024]));
    update(
        &mut model,
        Msg::IO(toxide::msg::IOEvent::ChunkWritten(friend, file_id, 0, 1024)),
    );
    tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::None));
    tox(&mut model, ToxEvent::FriendConnectionStatus(friend, Connection::Udp));

    // The sender re-offers under a new file number; the paused slot
    // matches on the stable id and asks to seek.
    let cmds = tox(
        &mut model,
        ToxEvent::FileRecv(friend, FileNumber(6), FileKind::Data, 4096, "big.bin".into(), file_id),
    );
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::FileSeek(_, FileNumber(6), 1024))
    )));
    assert!(cmds.iter().any(|c| matches!(
        c,
        Cmd::Tox(ToxAction::FileControl(_, FileNumber(6), FileControl::Resume))
    )));
    let f = model.friends.get(friend).unwrap();
    let ft = f.transfers.get(TransferDirection::Receive, 0).unwrap();
    assert_eq!(ft.state, TransferState::Started);
    assert_eq!(ft.file_number, FileNumber(6));
}
