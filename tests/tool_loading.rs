mod support;

use std::fs;

use deskgame_engine::config::RuntimeConfig;
use deskgame_engine::tools::{ToolHandle, ToolLoadError, MOUSE_MOVE};
use deskgame_engine::types::Vector;
use support::{tool_path, FakeEntity, FakeTool, Rig};
use tempfile::tempdir;

#[test]
fn loaded_tools_get_dense_handles_and_metadata() {
    let mut rig = Rig::new();
    let rock = rig.load(FakeTool::with_delay("Rock", 250));
    let paint = rig.load(FakeTool::named("Paint"));

    assert_eq!((rock, paint), (ToolHandle(0), ToolHandle(1)));
    assert_eq!(rig.manager.count(), 2);
    let info = rig.manager.info(rock).expect("rock info");
    assert_eq!(info.name, "Rock");
    assert_eq!(info.trigger_delay, 250);
    assert_eq!(info.cursor_width, 32);
    assert_eq!(rig.manager.tool(paint).map(|tool| tool.script_name()), Some("Paint.rhai"));
    assert!(rig.manager.preview_image(rock).is_some());
    assert!(rig.manager.info(ToolHandle(2)).is_none());
    // Two cursors owned by the manager plus preview and cursor per tool.
    assert_eq!(rig.renderer.live_sprites(), 6);
    assert_eq!(rig.bridge.live_modules(), 2);
    assert_eq!(rig.bridge.calls(), vec!["Rock:QueryToolInfo", "Rock:Initialize", "Paint:QueryToolInfo", "Paint:Initialize"]);
}

#[test]
fn every_failed_load_step_releases_what_it_acquired() {
    let cases: Vec<(&str, Box<dyn Fn(&Rig)>, u8)> = vec![
        ("Unregistered", Box::new(|_: &Rig| {}), 2),
        (
            "Declined",
            Box::new(|rig: &Rig| rig.bridge.register_tool(tool_path("Declined"), FakeTool { info: None, ..FakeTool::named("Declined") })),
            3,
        ),
        (
            "NoPreview",
            Box::new(|rig: &Rig| {
                rig.bridge.register_tool(tool_path("NoPreview"), FakeTool::named("NoPreview"));
                rig.renderer.fail_on("preview.png");
            }),
            5,
        ),
        (
            "NoCursor",
            Box::new(|rig: &Rig| {
                rig.bridge.register_tool(tool_path("NoCursor"), FakeTool::named("NoCursor"));
                rig.renderer.fail_on("cursor.png");
            }),
            6,
        ),
        (
            "Refuses",
            Box::new(|rig: &Rig| {
                rig.bridge.register_tool(tool_path("Refuses"), FakeTool { initialize: false, ..FakeTool::named("Refuses") })
            }),
            7,
        ),
    ];

    for (name, setup, step) in cases {
        let mut rig = Rig::new();
        setup(&rig);
        let err = rig.manager.load_tool(&tool_path(name)).expect_err(name);
        assert_eq!(err.step(), step, "{name}: {err}");
        assert_eq!(rig.manager.count(), 0, "{name}: no partial tool");
        assert_eq!(rig.bridge.live_modules(), 0, "{name}: module unloaded");
        assert_eq!(rig.renderer.live_sprites(), 2, "{name}: only the manager cursors remain");
    }
}

#[test]
fn path_without_file_name_fails_before_loading_anything() {
    let mut rig = Rig::new();
    let err = rig.manager.load_tool_from_path("").expect_err("empty path");
    assert!(matches!(err, ToolLoadError::InvalidPath(_)));
    assert!(rig.bridge.calls().is_empty());
}

#[test]
fn out_of_range_select_keeps_current_selection() {
    let mut rig = Rig::new();
    let rock = rig.load(FakeTool::named("Rock"));
    assert!(rig.manager.select(rock));
    rig.bridge.clear_calls();

    assert!(!rig.manager.select(ToolHandle(1)));
    assert!(!rig.manager.select(ToolHandle::INVALID));
    assert_eq!(rig.manager.selection(), rock);
    assert!(rig.bridge.calls().is_empty());
}

#[test]
fn selecting_notifies_previous_tool_first() {
    let mut rig = Rig::new();
    rig.load(FakeTool::named("Rock"));
    rig.load(FakeTool::named("Paint"));
    rig.bridge.clear_calls();

    assert!(rig.manager.select_by_name("Rock.rhai"));
    assert!(rig.manager.select_by_name("Paint.rhai"));
    assert!(!rig.manager.select_by_name("Missing.rhai"));
    assert_eq!(
        rig.bridge.calls(),
        vec!["Rock:SelectionStatus(true)", "Rock:SelectionStatus(false)", "Paint:SelectionStatus(true)"]
    );
    assert_eq!(rig.manager.selection(), ToolHandle(1));

    rig.manager.unselect();
    assert_eq!(rig.manager.selection(), ToolHandle::INVALID);
}

#[test]
fn held_trigger_repeats_at_the_declared_delay() {
    let mut rig = Rig::new();
    let rock = rig.load(FakeTool::with_delay("Rock", 100));
    rig.manager.select(rock);
    rig.manager.on_mouse_event(Vector::new(5, 7), MOUSE_MOVE, false, false);
    assert!(rig.manager.trigger(true));

    for _ in 0..10 {
        rig.clock.advance(50);
        rig.manager.process();
    }
    assert_eq!(rig.bridge.calls_matching("Rock:Trigger").len(), 5);
    assert_eq!(rig.bridge.calls_matching("Rock:Trigger(5,7)").len(), 5);

    rig.manager.trigger(false);
    rig.clock.advance(1_000);
    rig.manager.process();
    assert_eq!(rig.bridge.calls_matching("Rock:Trigger").len(), 5);
}

#[test]
fn trigger_needs_a_selected_tool() {
    let mut rig = Rig::new();
    rig.load(FakeTool::named("Rock"));
    assert!(!rig.manager.trigger(true));
    rig.clock.advance(1_000);
    rig.manager.process();
    assert!(rig.bridge.calls_matching("Rock:Trigger").is_empty());
}

#[test]
fn frame_calls_reach_every_tool_and_input_only_the_selected_one() {
    let mut rig = Rig::new();
    rig.load(FakeTool::named("Rock"));
    let paint = rig.load(FakeTool::named("Paint"));
    rig.manager.select(paint);
    rig.bridge.clear_calls();

    rig.manager.process();
    rig.manager.draw(true);
    rig.manager.draw_on_top(false);
    rig.manager.on_key_event(0x41, true);
    rig.manager.on_mouse_event(Vector::new(3, 4), 2, true, false);

    assert_eq!(
        rig.bridge.calls(),
        vec![
            "Rock:Process",
            "Paint:Process",
            "Rock:Draw",
            "Paint:Draw",
            "Rock:DrawOnTop",
            "Paint:DrawOnTop",
            "Paint:KeyEvent(65,true)",
            "Paint:MouseEvent(3,4,2)",
        ]
    );
    // Only the on-top pass draws cursors, and it was asked not to.
    assert!(rig.renderer.draws().is_empty());
}

#[test]
fn draw_on_top_shows_the_selected_tool_cursor_with_offset() {
    let mut rig = Rig::new();
    let rock = rig.load(FakeTool::named("Rock"));
    rig.manager.draw_on_top(true);
    assert!(rig.renderer.draws().is_empty(), "no cursor without a selection");

    rig.manager.select(rock);
    rig.manager.set_cursor_offset(Vector::new(-16, -16));
    rig.manager.set_cursor_rotation(1.5);
    rig.manager.on_mouse_event(Vector::new(100, 100), MOUSE_MOVE, false, false);
    rig.manager.draw_on_top(true);

    let draws = rig.renderer.draws();
    assert_eq!(draws.len(), 1);
    assert!(draws[0].0.ends_with("cursor.png"));
    assert_eq!(draws[0].1.position, Vector::new(84, 84));
    assert_eq!(draws[0].1.rotation, 1.5);
}

#[test]
fn trigger_spawns_join_after_the_entity_pass() {
    let mut rig = Rig::new();
    let tool = FakeTool { spawn_on_trigger: Some(FakeEntity::named("Rock")), ..FakeTool::with_delay("Rock", 10) };
    let rock = rig.load(tool);
    rig.manager.select(rock);
    rig.manager.on_mouse_event(Vector::new(40, 50), MOUSE_MOVE, false, false);
    rig.manager.trigger(true);

    rig.clock.advance(10);
    rig.manager.process();
    assert_eq!(rig.manager.entities().len(), 1);
    let object = rig.manager.entities().object_at(0).expect("spawned entity");
    assert_eq!(rig.bridge.calls_matching(&format!("{object}:")), vec![format!("{object}:OnSpawn(40,50)")]);
    assert_eq!(rig.manager.entity(object).map(|entity| entity.position()), Some(Vector::new(40, 50)));
}

#[test]
fn find_tool_and_version_match_the_full_script_path() {
    let mut rig = Rig::new();
    rig.load(FakeTool::named("Rock"));
    let paint = rig.load(FakeTool::named("Paint"));

    assert_eq!(rig.manager.find_tool(tool_path("Paint")), paint);
    assert_eq!(rig.manager.find_tool("Paint.rhai"), ToolHandle::INVALID);
    assert_eq!(rig.manager.tool_version(tool_path("Rock")), Some("1.0"));
    assert_eq!(rig.manager.tool_version(tool_path("Missing")), None);
}

#[test]
fn unloading_shifts_later_handles_and_fixes_the_selection() {
    let mut rig = Rig::new();
    let rock = rig.load(FakeTool::named("Rock"));
    rig.load(FakeTool::named("Paint"));
    rig.manager.select(ToolHandle(1));

    assert!(rig.manager.unload_tool(rock));
    assert!(!rig.manager.unload_tool(ToolHandle(5)));
    assert_eq!(rig.manager.count(), 1);
    assert_eq!(rig.manager.selection(), ToolHandle(0));
    assert_eq!(rig.manager.info(ToolHandle(0)).map(|info| info.name.as_str()), Some("Paint"));
    assert_eq!(rig.bridge.live_modules(), 1);
    assert_eq!(rig.renderer.live_sprites(), 4);
    assert_eq!(rig.bridge.calls_matching("Rock:Release").len(), 1);
}

#[test]
fn dropping_the_manager_releases_entities_before_tools() {
    let mut rig = Rig::new();
    rig.load(FakeTool::named("Rock"));
    let object = rig.spawn(FakeEntity::named("Pebble"), Vector::new(1, 1));
    rig.bridge.clear_calls();

    let support::Rig { bridge, renderer, manager, .. } = rig;
    drop(manager);

    assert_eq!(bridge.calls(), vec![format!("{object}:OnRelease"), "Rock:Release".to_string()]);
    assert_eq!(bridge.live_modules(), 0);
    assert_eq!(bridge.live_objects(), 0);
    assert_eq!(renderer.live_sprites(), 0);
}

#[test]
fn load_all_tools_scans_directories_with_entry_scripts() {
    let dir = tempdir().expect("temp dir");
    let tools = dir.path().join("tools");
    for name in ["Rock", "Broken", "Assets"] {
        fs::create_dir_all(tools.join(name)).expect("tool dir");
    }
    fs::write(tools.join("Rock").join("Rock.rhai"), "").expect("rock script");
    fs::write(tools.join("Broken").join("Broken.rhai"), "").expect("broken script");
    fs::write(tools.join("Assets").join("readme.txt"), "").expect("stray file");

    let config = RuntimeConfig { base_path: dir.path().to_path_buf(), ..RuntimeConfig::default() };
    let mut rig = Rig::with_config(config);
    rig.bridge.register_tool(tools.join("Rock").join("Rock.rhai"), FakeTool::named("Rock"));

    let scan = rig.manager.load_all_tools().expect("scan tools");
    assert_eq!(scan.loaded, vec![ToolHandle(0)]);
    assert_eq!(scan.failed.len(), 1);
    assert_eq!(scan.failed[0].name, "Broken");
    assert_eq!(scan.failed[0].step, 2);
    assert_eq!(rig.manager.info(ToolHandle(0)).map(|info| info.name.as_str()), Some("Rock"));
}

#[test]
fn load_all_tools_reports_a_missing_tools_directory() {
    let dir = tempdir().expect("temp dir");
    let config = RuntimeConfig { base_path: dir.path().join("nowhere"), ..RuntimeConfig::default() };
    let mut rig = Rig::with_config(config);
    let err = rig.manager.load_all_tools().unwrap_err();
    assert!(err.to_string().contains("tools directory"));
}

#[test]
fn scripts_see_the_live_entities_before_each_callback_batch() {
    let mut rig = Rig::new();
    let tool = rig.load(FakeTool::named("Rock"));
    rig.manager.select(tool);
    let object = rig.spawn(FakeEntity::named("Crate"), Vector::new(5, 7));

    let before = rig.bridge.published().len();
    rig.manager.draw(true);
    let published = rig.bridge.published();
    assert_eq!(published.len(), before + 1);
    let snapshot = published.last().expect("snapshot");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.index_of(object), Some(0));
    let view = snapshot.find(object).expect("crate view");
    assert_eq!(view.position, Vector::new(5, 7));
    assert!(view.bbox.is_none());
}
