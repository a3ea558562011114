//! Integration tests for the recitation engine
//!
//! Drives the engine against a recording output: source resolution,
//! sequential advance, stop semantics, reciter switching and persistence.

mod helpers;

use helpers::{positions, stop_reasons, EngineBuilder, OutputCall, TestEngine, UnavailableChapters};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilawa_ap::audio::{AudioSource, AudioStatus};
use tilawa_ap::db::settings::{load_selected_reciter, save_selected_reciter};
use tilawa_ap::playback::PlaybackMode;
use tilawa_common::events::{PlaybackPosition, StopReason, TilawaEvent};

fn pos(chapter: u16, verse: u16) -> PlaybackPosition {
    PlaybackPosition::new(chapter, verse)
}

fn remote(url: &str) -> AudioSource {
    AudioSource::RemoteUrl(url.to_string())
}

// ============================================================================
// Initialization and persistence
// ============================================================================

#[tokio::test]
async fn test_initialize_selects_first_reciter() {
    let t = TestEngine::new().await;

    assert_eq!(t.engine.current_reciter().unwrap().id, "alpha");
    assert_eq!(t.output.calls(), vec![OutputCall::Prepare]);
    assert!(!t.engine.is_playing());
    assert!(t.engine.current_position().is_none());
    assert!(t.cache.root().is_dir());
}

#[tokio::test]
async fn test_reciter_selection_survives_restart() {
    let builder = EngineBuilder::new().await;
    let cache_dir = tempfile::tempdir().unwrap();

    let (first, _) = builder.build(cache_dir.path()).await;
    let beta = first.find_reciter("beta").unwrap();
    first.set_reciter(Some(beta)).await;
    assert_eq!(
        load_selected_reciter(builder.settings.as_ref()).await.unwrap(),
        Some("beta".to_string())
    );

    let (second, _) = builder.build(cache_dir.path()).await;
    assert_eq!(second.current_reciter().unwrap().id, "beta");
}

#[tokio::test]
async fn test_unknown_persisted_reciter_falls_back_to_first() {
    let builder = EngineBuilder::new().await;
    save_selected_reciter(builder.settings.as_ref(), Some("retired"))
        .await
        .unwrap();

    let t = TestEngine::with_builder(builder).await;
    assert_eq!(t.engine.current_reciter().unwrap().id, "alpha");
}

#[tokio::test]
async fn test_clearing_reciter_removes_persisted_value() {
    let mut t = TestEngine::new().await;

    t.engine.set_reciter(None).await;

    assert!(t.engine.current_reciter().is_none());
    assert_eq!(load_selected_reciter(t.settings.as_ref()).await.unwrap(), None);
    let events = t.drain_events();
    assert!(matches!(
        events.as_slice(),
        [TilawaEvent::ReciterChanged { reciter_id: None, .. }]
    ));
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_play_surah_announces_then_loads_remote_verse() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(2, 255).await;

    assert_eq!(
        t.output.last_load().unwrap().1,
        remote("https://alpha.example/audio/002255.mp3")
    );
    assert!(t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(2, 255)));
    assert_eq!(t.engine.mode(), PlaybackMode::Sequential);

    let events = t.drain_events();
    assert!(matches!(
        events.as_slice(),
        [
            TilawaEvent::PositionChanged { position: Some(_), .. },
            TilawaEvent::PlayingStateChanged { is_playing: true, .. },
        ]
    ));
}

#[tokio::test]
async fn test_play_surah_from_start_begins_at_first_verse() {
    let t = TestEngine::new().await;

    t.engine.play_surah_from_start(36).await;

    assert_eq!(t.engine.current_position(), Some(pos(36, 1)));
    assert_eq!(t.engine.mode(), PlaybackMode::Sequential);
    assert_eq!(
        t.output.last_load().unwrap().1,
        remote("https://alpha.example/audio/036001.mp3")
    );
}

#[tokio::test]
async fn test_cached_verse_is_played_from_disk() {
    let t = TestEngine::new().await;
    t.cache_verse("alpha", 1, 1).await;

    t.engine.play_verse(1, 1).await;

    let (_, source) = t.output.last_load().unwrap();
    assert_eq!(source, AudioSource::LocalFile(t.cache.verse_path("alpha", 1, 1)));
}

#[tokio::test]
async fn test_cache_of_other_reciter_is_not_used() {
    let t = TestEngine::new().await;
    t.cache_verse("beta", 1, 1).await;

    t.engine.play_verse(1, 1).await;

    assert_eq!(
        t.output.last_load().unwrap().1,
        remote("https://alpha.example/audio/001001.mp3")
    );
}

#[tokio::test]
async fn test_resolution_failure_stops_without_loading() {
    let mut t = TestEngine::new().await;
    let broken = t.engine.find_reciter("broken").unwrap();
    t.engine.set_reciter(Some(broken)).await;
    t.drain_events();

    t.engine.play_verse(1, 1).await;

    assert!(t.output.loads().is_empty());
    assert!(!t.engine.is_playing());
    assert!(t.engine.current_position().is_none());

    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(1, 1)), None]);
    assert!(matches!(
        stop_reasons(&events).as_slice(),
        [StopReason::ResolutionError { .. }]
    ));
}

#[tokio::test]
async fn test_play_without_reciter_is_ignored() {
    let mut t = TestEngine::new().await;
    t.engine.set_reciter(None).await;
    t.drain_events();

    t.engine.play_surah(1, 1).await;
    t.engine.play_verse(1, 1).await;

    assert!(t.output.loads().is_empty());
    assert!(t.drain_events().is_empty());
    assert!(t.engine.current_position().is_none());
}

// ============================================================================
// Sequential advance
// ============================================================================

#[tokio::test]
async fn test_sequential_advance_within_and_across_chapters() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 6).await;
    t.finish_current().await;
    assert_eq!(t.engine.current_position(), Some(pos(1, 7)));

    // Al-Fatihah has 7 verses
    t.finish_current().await;
    assert_eq!(t.engine.current_position(), Some(pos(2, 1)));

    let urls: Vec<_> = t.output.loads().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        urls,
        vec![
            remote("https://alpha.example/audio/001006.mp3"),
            remote("https://alpha.example/audio/001007.mp3"),
            remote("https://alpha.example/audio/002001.mp3"),
        ]
    );

    // Advancing never clears the position or toggles playing
    let events = t.drain_events();
    assert_eq!(
        positions(&events),
        vec![Some(pos(1, 6)), Some(pos(1, 7)), Some(pos(2, 1))]
    );
    assert!(stop_reasons(&events).is_empty());
    assert!(t.engine.is_playing());
}

#[tokio::test]
async fn test_load_ids_increase() {
    let t = TestEngine::new().await;

    t.engine.play_surah(112, 1).await;
    t.finish_current().await;
    t.finish_current().await;

    let ids: Vec<_> = t.output.loads().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_single_verse_does_not_advance() {
    let mut t = TestEngine::new().await;

    t.engine.play_verse(2, 255).await;
    t.finish_current().await;

    assert_eq!(t.output.loads().len(), 1);
    assert!(t.engine.current_position().is_none());
    assert!(!t.engine.is_playing());

    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(2, 255)), None]);
    assert_eq!(stop_reasons(&events), vec![StopReason::Completed]);
}

#[tokio::test]
async fn test_final_verse_of_final_chapter_stops() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(114, 6).await;
    t.finish_current().await;

    assert_eq!(t.output.loads().len(), 1);
    assert!(t.engine.current_position().is_none());
    assert_eq!(t.engine.mode(), PlaybackMode::Single);

    let events = t.drain_events();
    assert_eq!(positions(&events).last(), Some(&None));
    assert_eq!(stop_reasons(&events), vec![StopReason::CompletedCorpus]);
}

#[tokio::test]
async fn test_unknown_chapter_lengths_stop_sequential_playback() {
    let builder = EngineBuilder::new()
        .await
        .with_chapters(Arc::new(UnavailableChapters));
    let mut t = TestEngine::with_builder(builder).await;

    t.engine.play_surah(1, 1).await;
    assert_eq!(t.output.loads().len(), 1);

    t.finish_current().await;

    assert_eq!(t.output.loads().len(), 1);
    assert!(t.engine.current_position().is_none());
    let events = t.drain_events();
    assert_eq!(stop_reasons(&events), vec![StopReason::MetadataUnavailable]);
}

#[tokio::test]
async fn test_single_verse_plays_without_chapter_lengths() {
    let builder = EngineBuilder::new()
        .await
        .with_chapters(Arc::new(UnavailableChapters));
    let mut t = TestEngine::with_builder(builder).await;

    t.engine.play_verse(3, 2).await;
    t.finish_current().await;

    let events = t.drain_events();
    assert_eq!(stop_reasons(&events), vec![StopReason::Completed]);
}

// ============================================================================
// Status handling
// ============================================================================

#[tokio::test]
async fn test_status_for_unloaded_verse_is_ignored() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    let stale = t.output.current_load_id().unwrap();
    t.engine.play_verse(1, 5).await;
    t.drain_events();

    t.engine.handle_status(AudioStatus::finished(stale)).await;
    t.engine.handle_status(AudioStatus::failed(stale, "late")).await;

    assert_eq!(t.engine.current_position(), Some(pos(1, 5)));
    assert!(t.engine.is_playing());
    assert!(t.drain_events().is_empty());
}

#[tokio::test]
async fn test_status_after_stop_is_ignored() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    let load_id = t.output.current_load_id().unwrap();
    t.engine.stop().await;
    t.drain_events();

    t.engine.handle_status(AudioStatus::finished(load_id)).await;

    assert!(t.output.loads().len() == 1);
    assert!(t.drain_events().is_empty());
}

#[tokio::test]
async fn test_device_error_stops_playback() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(18, 10).await;
    let load_id = t.output.current_load_id().unwrap();
    t.drain_events();

    t.engine
        .handle_status(AudioStatus::failed(load_id, "stream ended unexpectedly"))
        .await;

    assert!(t.engine.current_position().is_none());
    assert!(!t.engine.is_playing());
    let events = t.drain_events();
    assert_eq!(
        stop_reasons(&events),
        vec![StopReason::PlaybackError {
            message: "stream ended unexpectedly".to_string()
        }]
    );
    // No retry and no skip to the next verse
    assert_eq!(t.output.loads().len(), 1);
}

#[tokio::test]
async fn test_load_failure_stops_playback() {
    let mut t = TestEngine::new().await;
    t.output.fail_next_load("not an mp3");

    t.engine.play_surah(1, 1).await;

    assert!(!t.engine.is_playing());
    assert!(t.engine.current_position().is_none());
    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(1, 1)), None]);
    match stop_reasons(&events).as_slice() {
        [StopReason::PlaybackError { message }] => assert!(message.contains("not an mp3")),
        other => panic!("unexpected stop reasons: {:?}", other),
    }
}

#[tokio::test]
async fn test_device_pause_report_updates_playing_flag() {
    let mut t = TestEngine::new().await;

    t.engine.play_verse(1, 1).await;
    let load_id = t.output.current_load_id().unwrap();
    t.drain_events();

    t.engine.handle_status(AudioStatus::paused(load_id)).await;
    t.engine.handle_status(AudioStatus::paused(load_id)).await;

    assert!(!t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(1, 1)));
    let events = t.drain_events();
    assert!(matches!(
        events.as_slice(),
        [TilawaEvent::PlayingStateChanged { is_playing: false, .. }]
    ));
}

#[tokio::test]
async fn test_started_engine_consumes_status_channel() {
    let t = TestEngine::new().await;
    t.engine.start();
    // Second start is a no-op
    t.engine.start();

    t.engine.play_verse(1, 1).await;
    t.output.finish_current();

    let stopped = tokio::time::timeout(Duration::from_secs(2), async {
        while t.engine.current_position().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(stopped.is_ok(), "finish status was not processed");
}

// ============================================================================
// Pause / resume
// ============================================================================

#[tokio::test]
async fn test_pause_and_resume() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(36, 1).await;
    t.output.clear_calls();
    t.drain_events();

    t.engine.pause().await;
    t.engine.pause().await;
    assert!(!t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(36, 1)));
    assert_eq!(t.engine.mode(), PlaybackMode::Sequential);

    t.engine.resume().await;
    t.engine.resume().await;
    assert!(t.engine.is_playing());

    assert_eq!(t.output.calls(), vec![OutputCall::Pause, OutputCall::Resume]);
    let events = t.drain_events();
    assert!(matches!(
        events.as_slice(),
        [
            TilawaEvent::PlayingStateChanged { is_playing: false, .. },
            TilawaEvent::PlayingStateChanged { is_playing: true, .. },
        ]
    ));
}

#[tokio::test]
async fn test_resume_replays_verse_after_output_released() {
    let mut t = TestEngine::new().await;

    t.engine.play_verse(2, 5).await;
    let (first_load, _) = t.output.last_load().unwrap();
    t.drain_events();

    t.engine
        .handle_status(AudioStatus::unloaded(first_load))
        .await;
    assert!(!t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(2, 5)));
    assert_eq!(t.engine.mode(), PlaybackMode::Single);

    t.engine.resume().await;

    let loads = t.output.loads();
    assert_eq!(loads.len(), 2);
    assert!(loads[1].0 > first_load);
    assert_eq!(loads[1].1, remote("https://alpha.example/audio/002005.mp3"));
    assert!(!t.output.calls().contains(&OutputCall::Resume));
    assert!(t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(2, 5)));

    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(2, 5))]);
    assert!(stop_reasons(&events).is_empty());
}

#[tokio::test]
async fn test_release_report_for_old_load_is_ignored() {
    let t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    let (first_load, _) = t.output.last_load().unwrap();
    t.finish_current().await;

    t.engine
        .handle_status(AudioStatus::unloaded(first_load))
        .await;

    assert!(t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(1, 2)));
}

#[tokio::test]
async fn test_pause_and_resume_during_load_are_ignored() {
    let t = TestEngine::new().await;
    t.output.set_load_delay(Duration::from_millis(300));

    let engine = Arc::clone(&t.engine);
    let play = tokio::spawn(async move { engine.play_verse(1, 1).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_millis(100), t.engine.pause())
        .await
        .expect("pause waited for the load");
    tokio::time::timeout(Duration::from_millis(100), t.engine.resume())
        .await
        .expect("resume waited for the load");

    play.await.unwrap();
    assert!(t.engine.is_playing());
    assert_eq!(t.engine.current_position(), Some(pos(1, 1)));
    assert!(!t
        .output
        .calls()
        .iter()
        .any(|call| matches!(call, OutputCall::Pause | OutputCall::Resume)));
    assert_eq!(
        t.output.current_load_id(),
        t.output.last_load().map(|(id, _)| id)
    );
}

#[tokio::test]
async fn test_pause_and_resume_when_idle_do_nothing() {
    let mut t = TestEngine::new().await;
    t.output.clear_calls();

    t.engine.pause().await;
    t.engine.resume().await;

    assert!(t.output.calls().is_empty());
    assert!(t.drain_events().is_empty());
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    t.drain_events();

    t.engine.stop().await;
    let first = t.drain_events();
    t.engine.stop().await;
    let second = t.drain_events();

    for events in [&first, &second] {
        assert_eq!(positions(events), vec![None]);
        assert_eq!(stop_reasons(events), vec![StopReason::UserStopped]);
    }
    assert!(!t.engine.is_playing());
    assert!(t.engine.current_position().is_none());
    assert_eq!(t.engine.mode(), PlaybackMode::Single);

    let unloads = t
        .output
        .calls()
        .into_iter()
        .filter(|c| *c == OutputCall::Unload)
        .count();
    assert_eq!(unloads, 1);
}

#[tokio::test]
async fn test_stop_during_load_cancels_it() {
    let mut t = TestEngine::new().await;
    t.output.set_load_delay(Duration::from_millis(800));

    let engine = Arc::clone(&t.engine);
    let play = tokio::spawn(async move { engine.play_surah(1, 1).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_millis(200), t.engine.stop())
        .await
        .expect("stop waited for the load");
    assert!(t.engine.current_position().is_none());

    play.await.unwrap();
    assert!(!t.engine.is_playing());
    assert!(t.engine.current_position().is_none());
    assert_eq!(t.engine.mode(), PlaybackMode::Single);
    assert_eq!(t.output.current_load_id(), None);

    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(1, 1)), None]);
    assert_eq!(stop_reasons(&events), vec![StopReason::UserStopped]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, TilawaEvent::PlayingStateChanged { is_playing: true, .. })));
}

#[tokio::test]
async fn test_new_verse_during_load_supersedes_it() {
    let t = TestEngine::new().await;
    t.output.set_load_delay(Duration::from_millis(200));

    let engine = Arc::clone(&t.engine);
    let first = tokio::spawn(async move { engine.play_verse(1, 1).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    t.engine.play_verse(3, 3).await;
    first.await.unwrap();

    let (second_load, source) = t.output.last_load().unwrap();
    assert_eq!(source, remote("https://alpha.example/audio/003003.mp3"));
    assert_eq!(t.output.current_load_id(), Some(second_load));
    assert_eq!(t.engine.current_position(), Some(pos(3, 3)));
    assert!(t.engine.is_playing());
}

#[tokio::test]
async fn test_stop_reports_stopped_position() {
    let mut t = TestEngine::new().await;

    t.engine.play_verse(55, 13).await;
    t.drain_events();
    t.engine.stop().await;

    let events = t.drain_events();
    let stopped = events
        .iter()
        .find_map(|e| match e {
            TilawaEvent::PlaybackStopped { position, .. } => Some(*position),
            _ => None,
        })
        .unwrap();
    assert_eq!(stopped, Some(pos(55, 13)));
}

#[tokio::test]
async fn test_transition_stop_does_not_clear_now_playing() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    t.drain_events();

    t.engine.stop_for_transition().await;

    assert!(t.engine.current_position().is_none());
    assert!(!t.engine.is_playing());
    let events = t.drain_events();
    assert!(positions(&events).is_empty());
    assert!(stop_reasons(&events).is_empty());

    t.engine.stop().await;
    assert_eq!(positions(&t.drain_events()), vec![None]);
}

#[tokio::test]
async fn test_new_session_replaces_current_without_clearing() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(1, 1).await;
    t.engine.play_verse(2, 3).await;

    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(1, 1)), Some(pos(2, 3))]);
    assert_eq!(t.engine.mode(), PlaybackMode::Single);
    assert!(t.engine.is_playing());
}

// ============================================================================
// Reciter changes
// ============================================================================

#[tokio::test]
async fn test_switch_reciter_replays_same_verse_with_new_voice() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(18, 10).await;
    t.output.clear_calls();
    t.drain_events();

    let beta = t.engine.find_reciter("beta").unwrap();
    t.engine.switch_reciter(beta).await;

    assert_eq!(t.engine.current_reciter().unwrap().id, "beta");
    assert_eq!(t.engine.current_position(), Some(pos(18, 10)));
    assert_eq!(t.engine.mode(), PlaybackMode::Sequential);
    assert!(t.engine.is_playing());

    let calls = t.output.calls();
    assert_eq!(calls[0], OutputCall::Pause);
    assert_eq!(
        t.output.last_load().unwrap().1,
        remote("https://beta.example/audio/018010.mp3")
    );

    // The now-playing indicator is never cleared during the switch
    let events = t.drain_events();
    assert_eq!(positions(&events), vec![Some(pos(18, 10))]);
    assert!(stop_reasons(&events).is_empty());
}

#[tokio::test]
async fn test_switch_reciter_keeps_single_mode() {
    let mut t = TestEngine::new().await;

    t.engine.play_verse(2, 255).await;
    let beta = t.engine.find_reciter("beta").unwrap();
    t.engine.switch_reciter(beta).await;
    t.finish_current().await;

    assert_eq!(t.output.loads().len(), 2);
    assert!(stop_reasons(&t.drain_events()).contains(&StopReason::Completed));
}

#[tokio::test]
async fn test_switch_reciter_when_idle_only_selects() {
    let t = TestEngine::new().await;
    let beta = t.engine.find_reciter("beta").unwrap();

    t.engine.switch_reciter(beta).await;

    assert_eq!(t.engine.current_reciter().unwrap().id, "beta");
    assert!(t.output.loads().is_empty());
}

#[tokio::test]
async fn test_set_reciter_applies_from_next_verse() {
    let mut t = TestEngine::new().await;

    t.engine.play_surah(112, 1).await;
    let beta = t.engine.find_reciter("beta").unwrap();
    t.engine.set_reciter(Some(beta)).await;

    // Loaded verse keeps playing untouched
    assert_eq!(t.output.loads().len(), 1);
    assert!(t.engine.is_playing());

    t.finish_current().await;
    assert_eq!(
        t.output.last_load().unwrap().1,
        remote("https://beta.example/audio/112002.mp3")
    );

    let events = t.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TilawaEvent::ReciterChanged { reciter_id: Some(id), .. } if id == "beta"
    )));
}

// ============================================================================
// Listeners
// ============================================================================

#[tokio::test]
async fn test_verse_listener_until_handle_dropped() {
    let t = TestEngine::new().await;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let handle = t.engine.on_verse_change(move |position| {
        sink.lock().unwrap().push(position);
    });

    t.engine.play_verse(1, 1).await;
    t.engine.stop().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*seen.lock().unwrap(), vec![Some(pos(1, 1)), None]);

    drop(handle);
    tokio::time::sleep(Duration::from_millis(20)).await;
    t.engine.play_verse(1, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_multiple_state_listeners() {
    let t = TestEngine::new().await;
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&first);
    let _a = t.engine.on_playback_state_change(move |playing| {
        sink.lock().unwrap().push(playing);
    });
    let sink = Arc::clone(&second);
    let b = t.engine.on_playback_state_change(move |playing| {
        sink.lock().unwrap().push(playing);
    });

    t.engine.play_verse(1, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    b.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    t.engine.pause().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*first.lock().unwrap(), vec![true, false]);
    assert_eq!(*second.lock().unwrap(), vec![true]);
}

// ============================================================================
// Offline cache
// ============================================================================

#[tokio::test]
async fn test_cache_operations_use_current_reciter() {
    let t = TestEngine::new().await;

    for verse in 1..=4 {
        t.cache_verse("alpha", 112, verse).await;
    }
    assert!(t.engine.is_surah_downloaded(112).await.unwrap());

    let summary = t.engine.download_surah(112).await.unwrap();
    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.skipped, 4);

    let beta = t.engine.find_reciter("beta").unwrap();
    t.engine.set_reciter(Some(beta)).await;
    assert!(!t.engine.is_surah_downloaded(112).await.unwrap());

    let alpha = t.engine.find_reciter("alpha").unwrap();
    t.engine.set_reciter(Some(alpha)).await;
    t.engine.remove_surah(112).await.unwrap();
    assert!(!t.engine.is_surah_downloaded(112).await.unwrap());
}

#[tokio::test]
async fn test_cache_operations_require_reciter() {
    let t = TestEngine::new().await;
    t.engine.set_reciter(None).await;

    assert!(matches!(
        t.engine.is_surah_downloaded(1).await,
        Err(tilawa_ap::Error::InvalidState(_))
    ));
}
