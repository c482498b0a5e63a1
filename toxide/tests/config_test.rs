//! Configuration: startup application order, per-key overrides and
//! hot reload.

use toxide::config::{Config, FriendOverrides, TabColor};
use toxide::testing::TestContext;

#[test]
fn per_key_overrides_apply_on_top_of_defaults() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    let other = ctx.add_friend(&mut model, 1, "bob");
    let pk = model.friends.get(friend).unwrap().pk;

    let mut config = Config::default();
    config.ui.autolog = true;
    config.friends.insert(
        Config::pk_key(&pk),
        FriendOverrides {
            alias: Some("allie".into()),
            autolog: Some(false),
            auto_accept_files: Some(true),
            tab_color: Some(TabColor::Magenta),
            ..Default::default()
        },
    );
    model.config = config;
    model.apply_config();

    let f = model.friends.get(friend).unwrap();
    assert_eq!(f.display_name(), "allie");
    assert!(!f.logging_on, "override beats the autolog default");
    assert!(f.auto_accept_files);
    assert_eq!(f.tab_color, TabColor::Magenta);

    // The other friend only gets the defaults.
    let g = model.friends.get(other).unwrap();
    assert_eq!(g.display_name(), "bob");
    assert!(g.logging_on);
    assert!(!g.auto_accept_files);
}

#[test]
fn hot_reload_rereads_the_file_and_reapplies() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    let friend = ctx.add_friend(&mut model, 0, "alice");
    let pk = model.friends.get(friend).unwrap().pk;

    let toml = format!(
        "blocked_words = [\"spoiler\"]\n\n[ui]\nhistory_size = 42\n\n[friends.{}]\nalias = \"nightowl\"\n",
        Config::pk_key(&pk)
    );
    std::fs::write(&model.paths.config_file, toml).unwrap();

    toxide::commands::global::reload_config(&mut model);

    assert_eq!(model.config.ui.history_size, 42);
    assert!(model.config.matches_blocked_word("no SPOILER please"));
    assert_eq!(model.friends.get(friend).unwrap().display_name(), "nightowl");
    // Window history bounds and names follow the reload.
    let id = model.ensure_chat_window(friend).unwrap();
    assert_eq!(model.windows.get(id).unwrap().name, "nightowl");
    assert_eq!(model.windows.prompt_mut().unwrap().scrollback.history_size, 42);
}

#[test]
fn reload_survives_a_broken_file() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    model.config.ui.history_size = 77;
    std::fs::write(&model.paths.config_file, "[ui\nbroken =").unwrap();

    toxide::commands::global::reload_config(&mut model);
    // Old config stays in effect; a system line reports the failure.
    assert_eq!(model.config.ui.history_size, 77);
    let w = model.windows.active_mut().unwrap();
    w.scrollback.flush_all();
    assert!(
        w.scrollback
            .iter()
            .any(|l| l.text.contains("Config reload failed"))
    );
}

#[test]
fn runtime_log_toggle_diverges_until_reopen() {
    let ctx = TestContext::new();
    let mut model = ctx.create_model();
    model.config.ui.autolog = true;
    let friend = ctx.add_friend(&mut model, 0, "alice");
    let cfg = model.config.clone();
    model.friends.get_mut(friend).unwrap().apply_config(&cfg);
    let id = model.ensure_chat_window(friend).unwrap();
    model.windows.set_active(id);

    toxide::commands::execute(&mut model, "/log off");
    assert!(!model.friends.get(friend).unwrap().logging_on);

    // Close and reopen: the configured default is restored.
    let cmds = toxide::commands::execute(&mut model, "/close");
    let _ = cmds;
    model.ensure_chat_window(friend).unwrap();
    assert!(model.friends.get(friend).unwrap().logging_on);
}
