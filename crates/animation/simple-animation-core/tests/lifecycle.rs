use std::cell::Cell;
use std::rc::Rc;

use simple_animation_core::{
    BlendError, Clip, Config, Engine, EngineEvent, Mixer, QueueMode, WrapMode,
};
use simple_animation_test_fixtures::clips;

fn locomotion() -> Engine {
    let mut eng = Engine::new(Config::default());
    let set: Vec<Clip> = clips::load("locomotion").expect("locomotion clips");
    for clip in set {
        let name = clip.name.clone();
        let id = eng.load_clip(clip);
        eng.add_clip(id, &name).unwrap();
    }
    eng
}

fn counter(eng: &mut Engine) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let hook = Rc::clone(&count);
    eng.set_on_done(move || hook.set(hook.get() + 1));
    count
}

/// it should add, remove and re-add a state under the same name
#[test]
fn add_remove_add_round_trip() {
    let mut eng = locomotion();
    let jump = eng.get_state("jump").unwrap();
    let id = eng.state_clip_id(jump).unwrap();
    assert_eq!(eng.clip_count(), 4);

    assert_eq!(
        eng.add_clip(id, "jump"),
        Err(BlendError::DuplicateName {
            name: "jump".into()
        })
    );

    eng.remove_clip("jump").unwrap();
    assert_eq!(eng.clip_count(), 3);
    assert!(eng.get_state("jump").is_none());
    assert!(!eng.is_valid(jump));

    let again = eng.add_clip(id, "jump").unwrap();
    assert_eq!(again.slot(), jump.slot());
    assert_ne!(again, jump);
    assert_eq!(eng.clip_count(), 4);
    assert_eq!(eng.state_wrap_mode(again).unwrap(), WrapMode::Once);
    assert_eq!(eng.mixer().duration(again.slot()), 1.0);
}

/// it should remove every state built from a clip, clones included
#[test]
fn remove_clips_using_removes_all_users() {
    let mut eng = locomotion();
    let jump = eng.get_state("jump").unwrap();
    let id = eng.state_clip_id(jump).unwrap();
    eng.add_clip(id, "hop").unwrap();
    eng.play("walk").unwrap();
    let clone = eng.play_queued("jump", QueueMode::CompleteOthers).unwrap();
    assert_eq!(eng.clip_count(), 6);

    assert!(eng.remove_clips_using(id));
    assert_eq!(eng.clip_count(), 3);
    assert_eq!(eng.queued_len(), 0);
    assert!(!eng.is_valid(clone));
    assert!(eng.get_state("hop").is_none());
    assert!(eng.is_state_playing("walk"));

    assert!(!eng.remove_clips_using(id));
}

/// it should call the done callback once per stop_all
#[test]
fn stop_all_notifies_once() {
    let mut eng = locomotion();
    let count = counter(&mut eng);

    eng.play("walk").unwrap();
    eng.update(0.1);
    assert!(!eng.is_done());

    eng.stop_all();
    assert_eq!(count.get(), 1);
    assert!(eng.is_done());
    assert!(!eng.is_playing());

    let ev = eng.update(0.1).events.clone();
    assert!(ev.contains(&EngineEvent::Done));
    eng.update(0.1);
    assert_eq!(count.get(), 1);

    eng.stop_all();
    assert_eq!(count.get(), 1);
}

/// it should start a new episode as soon as a state is enabled, without a tick
#[test]
fn stop_all_right_after_play_notifies() {
    let mut eng = locomotion();
    let count = counter(&mut eng);
    assert!(eng.is_done());

    eng.play("walk").unwrap();
    assert!(!eng.is_done());
    eng.stop_all();
    assert_eq!(count.get(), 1);

    let run = eng.get_state("run").unwrap();
    eng.set_state_enabled(run, true).unwrap();
    eng.stop_all();
    assert_eq!(count.get(), 2);

    eng.blend("idle", 0.5, 0.0).unwrap();
    eng.stop_all();
    assert_eq!(count.get(), 3);
    assert!(!eng.is_playing());
}

/// it should call the done callback when the last Once state finishes
#[test]
fn once_completion_notifies() {
    let mut eng = locomotion();
    let count = counter(&mut eng);

    eng.play("jump").unwrap();
    eng.update(0.5);
    eng.update(0.5);
    assert_eq!(count.get(), 0);
    assert!(eng.is_state_playing("jump"));

    let ev = eng.update(0.5).events.clone();
    assert_eq!(count.get(), 1);
    assert!(ev.contains(&EngineEvent::StateFinished {
        state: "jump".into()
    }));
    assert!(!eng.is_state_playing("jump"));
    let jump = eng.get_state("jump").unwrap();
    assert_eq!(eng.state_time(jump).unwrap(), 0.0);

    // Replaying starts a new episode.
    eng.play("jump").unwrap();
    for _ in 0..3 {
        eng.update(0.5);
    }
    assert_eq!(count.get(), 2);
}

/// it should keep ClampForever states enabled past their end
#[test]
fn clamp_forever_holds() {
    let mut eng = Engine::default();
    let id = eng.load_clip(Clip::new("bow", 1.0).with_wrap_mode(WrapMode::ClampForever));
    eng.add_clip(id, "bow").unwrap();
    eng.play("bow").unwrap();
    for _ in 0..6 {
        eng.update(0.5);
    }
    assert!(eng.is_state_playing("bow"));
    assert!(!eng.is_done());
}

/// it should rewind only settled zero-weight states when the graph stops
#[test]
fn graph_stop_rewinds_idle_states() {
    let mut eng = locomotion();
    eng.play("walk").unwrap();
    eng.update(0.0);
    eng.update(0.3);
    let walk = eng.get_state("walk").unwrap();
    let idle = eng.get_state("idle").unwrap();
    eng.set_state_time(idle, 0.7).unwrap();

    eng.on_graph_stop();
    assert_eq!(eng.state_time(idle).unwrap(), 0.0);
    assert!((eng.state_time(walk).unwrap() - 0.3).abs() < 1e-6);
}

/// it should disconnect stopped inputs when asked not to keep them
#[test]
fn disconnected_mode_tracks_enabled_states() {
    let mut eng = locomotion();
    eng.set_keep_stopped_playables_connected(false);
    let id = eng.load_clip(Clip::looping("crawl", 1.5));
    let crawl = eng.add_clip(id, "crawl").unwrap();
    assert!(!eng.mixer().is_connected(crawl.slot()));

    eng.crossfade("crawl", 0.2).unwrap();
    eng.update(0.1);
    assert!(eng.mixer().is_connected(crawl.slot()));

    eng.play("walk").unwrap();
    eng.update(0.1);
    assert!(!eng.mixer().is_connected(crawl.slot()));
    assert!(!eng.mixer().is_playing(crawl.slot()));
}

/// it should cap the events reported by a single tick
#[test]
fn event_budget_is_enforced() {
    let mut eng = Engine::new(Config {
        max_events_per_tick: 1,
        ..Config::default()
    });
    for name in ["a", "b", "c"] {
        let id = eng.load_clip(Clip::looping(name, 1.0));
        eng.add_clip(id, name).unwrap();
        eng.blend(name, 0.5, 0.0).unwrap();
    }
    let out = eng.update(0.1);
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.weights.len(), 3);
}

/// it should deliver the final weights of every state through the mixer
#[test]
fn mixer_receives_normalized_weights() {
    let mut eng = locomotion();
    eng.blend("walk", 3.0, 0.0).unwrap();
    eng.blend("run", 1.0, 0.0).unwrap();
    eng.update(0.1);
    let walk = eng.get_state("walk").unwrap().slot();
    let run = eng.get_state("run").unwrap().slot();
    assert_eq!(eng.mixer().input_weight(walk), 0.75);
    assert_eq!(eng.mixer().input_weight(run), 0.25);
    assert_eq!(eng.mixer().connected_weight(), 1.0);
}

/// it should enumerate states through a cursor until the table changes
#[test]
fn cursor_sees_clones_and_detects_changes() {
    let mut eng = locomotion();
    eng.play("walk").unwrap();
    eng.play_queued("jump", QueueMode::CompleteOthers).unwrap();

    let mut cursor = eng.cursor();
    let mut names = Vec::new();
    while let Some(handle) = cursor.next(&eng).unwrap() {
        names.push(eng.state_name(handle).unwrap().to_string());
    }
    assert_eq!(names, ["idle", "walk", "run", "jump", "jumpQueued Clone"]);

    // Firing the queued clone changes no membership.
    eng.stop("walk").unwrap();
    eng.update(0.1);
    cursor.reset(&eng).unwrap();

    eng.remove_clip("run").unwrap();
    assert_eq!(cursor.next(&eng), Err(BlendError::CollectionModified));
}
