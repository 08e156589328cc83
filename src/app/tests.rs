use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::catalog::{RawRecord, normalize_record};
use crate::player::{self, EmbeddedPlayer, PlayerFactory, PlayerRequest};
use crate::search;

use super::playback::{Clock, POLL_INTERVAL_MS, PlaybackSession};
use super::view::{Session, View};

struct FakeClock(Cell<u64>);

impl FakeClock {
    fn at(ms: u64) -> Self {
        Self(Cell::new(ms))
    }

    fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

struct FakePlayer {
    tag: String,
    log: Rc<RefCell<Vec<String>>>,
    position: f64,
    duration: f64,
    fail_destroy: bool,
}

impl EmbeddedPlayer for FakePlayer {
    fn play(&mut self) {
        self.log.borrow_mut().push(format!("play {}", self.tag));
    }

    fn pause(&mut self) {
        self.log.borrow_mut().push(format!("pause {}", self.tag));
    }

    fn seek_to(&mut self, seconds: f64) {
        self.position = seconds;
        self.log
            .borrow_mut()
            .push(format!("seek {} {seconds}", self.tag));
    }

    fn current_time(&mut self) -> Option<f64> {
        Some(self.position)
    }

    fn duration(&mut self) -> Option<f64> {
        Some(self.duration)
    }

    fn set_volume(&mut self, volume: u8) {
        self.log
            .borrow_mut()
            .push(format!("volume {} {volume}", self.tag));
    }

    fn destroy(&mut self) -> Result<(), String> {
        self.log.borrow_mut().push(format!("destroy {}", self.tag));
        if self.fail_destroy {
            Err("already gone".to_string())
        } else {
            Ok(())
        }
    }
}

fn event_log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn logging_factory(log: Rc<RefCell<Vec<String>>>, duration: f64) -> PlayerFactory {
    factory_with(log, duration, false)
}

fn factory_with(
    log: Rc<RefCell<Vec<String>>>,
    duration: f64,
    fail_destroy: bool,
) -> PlayerFactory {
    let counter = Cell::new(0usize);
    Box::new(move |request: &PlayerRequest| {
        counter.set(counter.get() + 1);
        let tag = format!("p{}", counter.get());
        log.borrow_mut()
            .push(format!("create {tag} {}", request.video_id));
        Ok(Box::new(FakePlayer {
            tag,
            log: log.clone(),
            position: 0.0,
            duration,
            fail_destroy,
        }) as Box<dyn EmbeddedPlayer>)
    })
}

fn book(id: &str, title: &str, video_id: &str) -> crate::catalog::Book {
    normalize_record(
        id,
        RawRecord {
            real_title: Some(title.to_string()),
            url: Some(format!("https://youtu.be/{video_id}")),
            duration: Some(600.0),
            ..RawRecord::default()
        },
    )
}

fn sample_catalog() -> Vec<crate::catalog::Book> {
    vec![
        book("1", "Alpha Tales", "AAAAAAAAAAA"),
        book("2", "Beta Nights", "BBBBBBBBBBB"),
        book("3", "Gamma Roads", "CCCCCCCCCCC"),
        book("4", "Delta Winds", "DDDDDDDDDDD"),
    ]
}

#[test]
fn finish_load_picks_a_book_and_enters_single_view() {
    let mut session = Session::new();
    let picked = session.finish_load(sample_catalog(), 0).expect("non-empty");
    assert_eq!(picked.title, "Alpha Tales");
    assert_eq!(session.view(), &View::SingleBook);
    assert_eq!(session.current_book().map(|b| b.id.as_str()), Some("1"));
    assert_eq!(session.history_len(), 0);
}

#[test]
fn finish_load_with_empty_catalog_is_terminal() {
    let mut session = Session::new();
    assert!(session.finish_load(Vec::new(), 7).is_none());
    let View::Empty { can_go_back, .. } = session.view() else {
        panic!("expected the empty view");
    };
    assert!(!*can_go_back);
}

#[test]
fn history_pushes_on_navigation_and_pops_in_lifo_order() {
    let mut session = Session::new();
    session.finish_load(sample_catalog(), 0);

    session.submit_search("Beta").expect("match");
    session.submit_search("Gamma").expect("match");
    assert_eq!(session.history_len(), 2);
    assert_eq!(session.current_book().map(|b| b.id.as_str()), Some("3"));

    let back1 = session.go_back(0).expect("history entry");
    assert_eq!(back1.id, "2");
    let back2 = session.go_back(0).expect("history entry");
    assert_eq!(back2.id, "1");
    assert_eq!(session.history_len(), 0);

    // Empty history falls back to redisplaying the current book.
    let back3 = session.go_back(0).expect("current book");
    assert_eq!(back3.id, "1");
    assert_eq!(session.view(), &View::SingleBook);
}

#[test]
fn go_back_from_zero_results_restores_the_previous_book() {
    let mut session = Session::new();
    session.finish_load(sample_catalog(), 0);

    assert!(session.submit_search("zzz-no-match").is_none());
    let View::Empty { can_go_back, .. } = session.view() else {
        panic!("expected the empty view");
    };
    assert!(*can_go_back);
    // A dead-end search never pushed anything, so back lands on the book
    // that was showing before it.
    assert_eq!(session.go_back(0).map(|b| b.id), Some("1".to_string()));
}

#[test]
fn genre_selection_shows_grid_and_displays_first_match() {
    let mut catalog = Vec::new();
    for i in 0..12 {
        let mut b = book(&format!("f{i}"), &format!("Fantasy {i}"), "AAAAAAAAAAA");
        b.genre = "fantasy".to_string();
        catalog.push(b);
    }
    catalog.push(book("x", "Stray", "BBBBBBBBBBB"));

    let pills = search::genre_pills(&catalog);
    assert_eq!(pills.len(), 1);
    assert_eq!(pills[0].count, 12);

    let mut session = Session::new();
    session.finish_load(catalog, 0);
    let shown = session.show_genre("fantasy").expect("non-empty genre");
    assert_eq!(shown.id, "f0");
    let View::GenreGrid { genre, books } = session.view() else {
        panic!("expected the genre grid");
    };
    assert_eq!(genre, "fantasy");
    assert_eq!(books.len(), 12);
    assert_eq!(session.history_len(), 1);
}

#[test]
fn select_from_grid_out_of_bounds_is_ignored() {
    let mut session = Session::new();
    session.finish_load(sample_catalog(), 0);
    session.submit_search("a");

    let before = session.current_book().cloned();
    let before_history = session.history_len();
    assert!(session.select_from_grid(999).is_none());
    assert_eq!(session.current_book().cloned(), before);
    assert_eq!(session.history_len(), before_history);
}

#[test]
fn search_results_paginate_without_wraparound() {
    let mut catalog = Vec::new();
    for i in 0..25 {
        catalog.push(book(&format!("b{i}"), &format!("Common Tale {i}"), "AAAAAAAAAAA"));
    }
    let mut session = Session::new();
    session.finish_load(catalog, 0);
    session.submit_search("Common").expect("match");

    let View::SearchResults { pager, .. } = session.view() else {
        panic!("expected search results");
    };
    assert_eq!(pager.total_pages(), 3);

    assert!(session.next_page());
    assert!(session.next_page());
    assert!(!session.next_page());
    let View::SearchResults { pager, .. } = session.view() else {
        panic!("expected search results");
    };
    assert_eq!(pager.range(), 20..25);
}

#[test]
fn display_keeps_at_most_one_live_poll() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();

    let books = sample_catalog();
    playback.display(&books[0], &clock);
    assert_eq!(playback.live_poll_count(), 1);
    playback.display(&books[1], &clock);
    assert_eq!(playback.live_poll_count(), 1);

    // The first player is gone strictly before the second exists.
    let entries = log.borrow();
    let destroy_p1 = entries.iter().position(|e| e == "destroy p1").expect("p1 destroyed");
    let create_p2 = entries
        .iter()
        .position(|e| e.starts_with("create p2"))
        .expect("p2 created");
    assert!(destroy_p1 < create_p2);
}

#[test]
fn player_construction_waits_for_the_api_signal() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));

    let books = sample_catalog();
    playback.display(&books[0], &clock);
    playback.display(&books[1], &clock);
    assert!(!playback.has_player());
    assert!(log.borrow().is_empty());

    // Whichever book is current when the signal lands wins.
    playback.mark_api_ready();
    assert!(playback.has_player());
    let entries = log.borrow();
    let creates: Vec<&String> = entries.iter().filter(|e| e.starts_with("create")).collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].as_str(), "create p1 BBBBBBBBBBB");
}

#[test]
fn autoplay_starts_playback_and_applies_the_session_volume() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();
    playback.set_volume(40);

    playback.display(&sample_catalog()[0], &clock);
    assert!(playback.state().is_playing);
    assert_eq!(playback.state().volume, 40);
    let entries = log.borrow();
    assert!(entries.iter().any(|e| e == "volume p1 40"));
    assert!(entries.iter().any(|e| e == "play p1"));
}

#[test]
fn volume_carries_across_displayed_books() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();

    let books = sample_catalog();
    playback.display(&books[0], &clock);
    playback.set_volume(25);
    playback.display(&books[1], &clock);
    assert_eq!(playback.state().volume, 25);
    assert!(log.borrow().iter().any(|e| e == "volume p2 25"));
}

#[test]
fn tick_fires_only_when_the_poll_interval_elapses() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log, 600.0));
    playback.mark_api_ready();
    playback.display(&sample_catalog()[0], &clock);

    assert!(playback.tick(&clock).is_none());
    clock.set(POLL_INTERVAL_MS - 1);
    assert!(playback.tick(&clock).is_none());

    clock.set(POLL_INTERVAL_MS);
    let update = playback.tick(&clock).expect("poll due");
    assert_eq!(update.current_time, 0.0);
    assert_eq!(update.percentage, 0.0);

    // Re-armed: not due again until another full interval passes.
    clock.set(POLL_INTERVAL_MS + 500);
    assert!(playback.tick(&clock).is_none());
    clock.set(2 * POLL_INTERVAL_MS);
    assert!(playback.tick(&clock).is_some());
}

#[test]
fn seeks_clamp_to_the_book_bounds() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();
    playback.display(&sample_catalog()[0], &clock);

    // Rewinding at the start stays at zero.
    playback.rewind();
    assert_eq!(playback.state().current_time, 0.0);

    playback.forward();
    assert_eq!(playback.state().current_time, 10.0);

    playback.seek_fraction(0.5);
    assert_eq!(playback.state().current_time, 300.0);

    // Fractions beyond the bar clamp to the end.
    playback.seek_fraction(2.0);
    assert_eq!(playback.state().current_time, 600.0);
    playback.forward();
    assert_eq!(playback.state().current_time, 600.0);
}

#[test]
fn progress_is_zero_when_the_duration_is_unknown() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log, 0.0));
    playback.mark_api_ready();

    let zero = normalize_record(
        "z",
        RawRecord {
            real_title: Some("No Duration".to_string()),
            url: Some("https://youtu.be/EEEEEEEEEEE".to_string()),
            ..RawRecord::default()
        },
    );
    playback.display(&zero, &clock);
    clock.set(POLL_INTERVAL_MS);
    let update = playback.tick(&clock).expect("poll due");
    assert_eq!(update.percentage, 0.0);
    assert_eq!(playback.progress_percentage(), 0.0);
}

#[test]
fn toggle_play_flips_between_playing_and_paused() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();
    playback.display(&sample_catalog()[0], &clock);

    assert!(playback.state().is_playing);
    playback.toggle_play();
    assert!(!playback.state().is_playing);
    playback.toggle_play();
    assert!(playback.state().is_playing);
    let entries = log.borrow();
    assert!(entries.iter().any(|e| e == "pause p1"));
}

#[test]
fn failed_teardown_is_reported_but_never_blocks_the_next_book() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(factory_with(log.clone(), 600.0, true));
    playback.mark_api_ready();

    let books = sample_catalog();
    playback.display(&books[0], &clock);
    playback.display(&books[1], &clock);

    let warnings = playback.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("already gone"));
    assert!(playback.has_player());
    assert!(log.borrow().iter().any(|e| e.starts_with("create p2")));
}

#[test]
fn player_error_codes_map_to_the_fixed_messages() {
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(event_log(), 600.0));
    playback.mark_api_ready();
    playback.display(&sample_catalog()[0], &clock);

    playback.report_player_error(100);
    assert_eq!(playback.last_error(), Some("Video not found or removed."));
    playback.report_player_error(150);
    assert_eq!(playback.last_error(), Some(player::error_message(101)));
    playback.report_player_error(9_999);
    assert_eq!(playback.last_error(), Some("Unknown playback error."));

    // A fresh display clears the sticky error.
    playback.display(&sample_catalog()[1], &clock);
    assert!(playback.last_error().is_none());
}

#[test]
fn shutdown_cancels_the_poll_and_destroys_the_player() {
    let log = event_log();
    let clock = FakeClock::at(0);
    let mut playback = PlaybackSession::new(logging_factory(log.clone(), 600.0));
    playback.mark_api_ready();
    playback.display(&sample_catalog()[0], &clock);

    playback.shutdown();
    assert_eq!(playback.live_poll_count(), 0);
    assert!(!playback.has_player());
    assert!(log.borrow().iter().any(|e| e == "destroy p1"));
    clock.set(10 * POLL_INTERVAL_MS);
    assert!(playback.tick(&clock).is_none());
}
