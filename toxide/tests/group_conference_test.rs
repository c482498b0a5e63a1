//! Group and conference windows: creation, peer churn announcements,
//! ignore filtering and moderation events.

use std::time::Duration;
use toxide::msg::{Msg, ToxEvent};
use toxide::testing::TestContext;
use toxide::update::update;
use toxide::windows::WindowKind;
use toxide_net::{
    ChatId, ConferenceId, ConferenceNumber, ConferencePeerNumber, ConferenceType, GroupModEvent,
    GroupNumber, GroupPeerId, GroupRole, MessageKind, PublicKey,
};

fn group_text(model: &mut toxide::model::Model, number: GroupNumber) -> Vec<String> {
    let w = model.windows.group_mut(number).unwrap();
    w.scrollback.flush_all();
    w.scrollback.iter().map(|l| l.text.clone()).collect()
}

fn conference_text(model: &mut toxide::model::Model, number: ConferenceNumber) -> Vec<String> {
    let w = model.windows.conference_mut(number).unwrap();
    w.scrollback.flush_all();
    w.scrollback.iter().map(|l| l.text.clone()).collect()
}

fn make_group(model: &mut toxide::model::Model) -> GroupNumber {
    let number = GroupNumber(0);
    update(
        model,
        Msg::Tox(ToxEvent::GroupCreated(
            number,
            ChatId([9; 32]),
            "rustaceans".into(),
            "tester".into(),
            GroupRole::Founder,
        )),
    );
    number
}

#[test]
fn group_creation_opens_and_activates_a_window() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = make_group(&mut model);
    let active = model.windows.active().unwrap();
    assert_eq!(active.kind, WindowKind::Group(number));
    assert_eq!(active.name, "rustaceans");
    assert_eq!(model.groups.get(number).unwrap().self_role, GroupRole::Founder);
}

#[test]
fn late_joins_are_announced_but_initial_sync_is_not() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = make_group(&mut model);

    // Within the sync debounce: silent.
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupPeerJoin(
            number,
            GroupPeerId(1),
            PublicKey([1; 32]),
            "early".into(),
            GroupRole::User,
        )),
    );
    let text = group_text(&mut model, number);
    assert!(!text.iter().any(|t| t.contains("has joined")));

    ctx.advance(Duration::from_secs(11));
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupPeerJoin(
            number,
            GroupPeerId(2),
            PublicKey([2; 32]),
            "late".into(),
            GroupRole::User,
        )),
    );
    let text = group_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("late has joined")));

    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupPeerExit(
            number,
            GroupPeerId(2),
            "late".into(),
            "bye all".into(),
        )),
    );
    let text = group_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("late has left") && t.contains("bye all")));
}

#[test]
fn ignored_peers_messages_are_filtered_out_of_band() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = make_group(&mut model);
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupPeerJoin(
            number,
            GroupPeerId(1),
            PublicKey([1; 32]),
            "troll".into(),
            GroupRole::User,
        )),
    );

    let cmds = toxide::commands::execute(&mut model, "/ignore troll");
    assert!(!cmds.is_empty(), "in-band network call issued");

    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupMessage(
            number,
            GroupPeerId(1),
            "troll".into(),
            MessageKind::Normal,
            "you all suck".into(),
        )),
    );
    let text = group_text(&mut model, number);
    assert!(!text.iter().any(|t| t.contains("you all suck")));

    toxide::commands::execute(&mut model, "/unignore troll");
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupMessage(
            number,
            GroupPeerId(1),
            "troll".into(),
            MessageKind::Normal,
            "sorry".into(),
        )),
    );
    let text = group_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("sorry")));
}

#[test]
fn moderation_events_update_roles_and_print_lines() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = make_group(&mut model);
    for (id, name) in [(1u32, "frank"), (2, "vic")] {
        update(
            &mut model,
            Msg::Tox(ToxEvent::GroupPeerJoin(
                number,
                GroupPeerId(id),
                PublicKey([id as u8; 32]),
                name.into(),
                GroupRole::User,
            )),
        );
    }

    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupModeration(
            number,
            GroupPeerId(1),
            GroupPeerId(2),
            GroupModEvent::Observer,
        )),
    );
    assert_eq!(
        model.groups.get(number).unwrap().peer(GroupPeerId(2)).unwrap().role,
        GroupRole::Observer
    );
    let text = group_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("frank has silenced vic")));

    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupModeration(
            number,
            GroupPeerId(1),
            GroupPeerId(2),
            GroupModEvent::Kick,
        )),
    );
    assert!(model.groups.get(number).unwrap().peer(GroupPeerId(2)).is_none());
}

#[test]
fn nick_changes_rename_and_announce() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = make_group(&mut model);
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupPeerJoin(
            number,
            GroupPeerId(1),
            PublicKey([1; 32]),
            "oldname".into(),
            GroupRole::User,
        )),
    );
    update(
        &mut model,
        Msg::Tox(ToxEvent::GroupNickChange(number, GroupPeerId(1), "newname".into())),
    );
    let text = group_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("oldname is now known as newname")));
    assert!(model.groups.get(number).unwrap().name_list.contains(&"newname".to_owned()));
}

#[test]
fn conference_peer_list_churn_announces_after_debounce() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = ConferenceNumber(0);
    update(
        &mut model,
        Msg::Tox(ToxEvent::ConferenceCreated(
            number,
            ConferenceId([5; 32]),
            ConferenceType::Text,
        )),
    );

    let peers = vec![
        (ConferencePeerNumber(0), PublicKey([1; 32]), "ana".to_owned()),
        (ConferencePeerNumber(1), PublicKey([2; 32]), "ben".to_owned()),
    ];
    update(&mut model, Msg::Tox(ToxEvent::ConferencePeerList(number, peers)));
    let text = conference_text(&mut model, number);
    assert!(!text.iter().any(|t| t.contains("joined")), "initial sync is silent");

    ctx.advance(Duration::from_secs(11));
    let peers = vec![(ConferencePeerNumber(0), PublicKey([2; 32]), "ben".to_owned())];
    update(&mut model, Msg::Tox(ToxEvent::ConferencePeerList(number, peers)));
    let text = conference_text(&mut model, number);
    assert!(text.iter().any(|t| t.contains("ana has left the conference")));

    assert_eq!(model.conferences.get(number).unwrap().name_list, vec!["ben"]);
}

#[test]
fn conference_title_renames_the_tab() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = ConferenceNumber(0);
    update(
        &mut model,
        Msg::Tox(ToxEvent::ConferenceCreated(
            number,
            ConferenceId([5; 32]),
            ConferenceType::Text,
        )),
    );
    update(
        &mut model,
        Msg::Tox(ToxEvent::ConferenceTitle(number, "weekend plans".into())),
    );
    assert_eq!(model.windows.active().unwrap().name, "weekend plans");
    assert_eq!(model.conferences.get(number).unwrap().title, "weekend plans");
}

#[test]
fn own_conference_messages_echo_as_outgoing() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let number = ConferenceNumber(0);
    update(
        &mut model,
        Msg::Tox(ToxEvent::ConferenceCreated(
            number,
            ConferenceId([5; 32]),
            ConferenceType::Text,
        )),
    );

    let me = model.me.pk;
    update(
        &mut model,
        Msg::Tox(ToxEvent::ConferenceMessage(
            number,
            ConferencePeerNumber(0),
            me,
            "tester".into(),
            MessageKind::Normal,
            "echoed".into(),
        )),
    );
    let w = model.windows.conference_mut(number).unwrap();
    w.scrollback.flush_all();
    let line = w.scrollback.iter().last().unwrap();
    assert_eq!(line.kind, toxide::scrollback::LineKind::OutMessage);
    // No alert for our own echo.
    assert_eq!(w.pending_messages, 0);
}
