mod render;
mod session;

use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::catalog::{self, LibraryStats};
use crate::changelog::{self, ChangelogEntry};
use crate::db::{PREF_CHANGELOG_COLLAPSED, PREF_DARK_MODE, Store};
use crate::loader::{self, LoadOptions, LoadSource};
use crate::player;
use crate::search::{self, GenrePill};

use super::playback::{Clock, PlaybackSession, SystemClock};
use super::truncate;
use super::view::{Session, View};

use self::render::draw_tui;
use self::session::TuiSession;

/// Typing pauses this long before a live search fires.
const SEARCH_DEBOUNCE_MS: u64 = 500;
/// Live search needs at least this many characters; shorter input waits
/// for an explicit Enter.
const SEARCH_MIN_CHARS: usize = 3;
const VOLUME_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Focus {
    Browse,
    Search,
}

#[derive(Debug, Clone)]
struct PendingSearch {
    term: String,
    due_ms: u64,
}

#[derive(Debug, Clone)]
pub(super) enum ChangelogPanel {
    Hidden,
    Loading,
    Ready(Vec<ChangelogEntry>),
    Failed(String),
}

pub(crate) fn run_tui(store: &Store, opts: &LoadOptions) -> Result<()> {
    let mut tui = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let clock = SystemClock;
    let mut session = Session::new();
    let mut playback = PlaybackSession::new(player::default_factory());
    let mut pills: Vec<GenrePill> = Vec::new();
    let mut pill_index = 0usize;
    let mut stats = LibraryStats {
        total_books: 0,
        total_authors: 0,
        total_channels: 0,
        total_duration_seconds: 0,
    };
    let mut table_state = TableState::default();
    let mut focus = Focus::Browse;
    let mut search_input = String::new();
    let mut pending_search = None::<PendingSearch>;
    let mut dark_mode = store.bool_preference(PREF_DARK_MODE)?.unwrap_or(true);
    let mut changelog_collapsed = store
        .bool_preference(PREF_CHANGELOG_COLLAPSED)?
        .unwrap_or(false);
    let mut status = status_info("Loading the audiobook library...");

    let (changelog_tx, changelog_rx) = mpsc::channel::<Result<Vec<ChangelogEntry>, String>>();
    let mut changelog_panel = match opts.base_url.as_deref() {
        Some(base) => {
            spawn_changelog_fetch(base.to_string(), changelog_tx.clone());
            ChangelogPanel::Loading
        }
        None => ChangelogPanel::Hidden,
    };

    // First frame shows the loading view before the (possibly slow) catalog
    // fetch happens.
    draw(
        &mut terminal,
        &session,
        &playback,
        &mut table_state,
        &pills,
        pill_index,
        &stats,
        focus,
        &search_input,
        &changelog_panel,
        changelog_collapsed,
        dark_mode,
        &status,
    )?;
    attempt_load(
        store,
        opts,
        &clock,
        &mut session,
        &mut playback,
        &mut pills,
        &mut pill_index,
        &mut stats,
        &mut status,
    );
    // The player backend is considered ready once the terminal is up; a
    // book displayed during the load is constructed here.
    playback.mark_api_ready();

    loop {
        while let Ok(result) = changelog_rx.try_recv() {
            changelog_panel = match result {
                Ok(entries) => ChangelogPanel::Ready(entries),
                Err(err) => ChangelogPanel::Failed(err),
            };
        }

        if let Some(pending) = pending_search.as_ref()
            && clock.now_millis() >= pending.due_ms
        {
            let term = pending.term.clone();
            pending_search = None;
            run_search(
                &term,
                &clock,
                &mut session,
                &mut playback,
                &mut table_state,
                &mut status,
            );
        }

        playback.tick(&clock);
        for warning in playback.take_warnings() {
            status = status_error(&warning);
        }

        draw(
            &mut terminal,
            &session,
            &playback,
            &mut table_state,
            &pills,
            pill_index,
            &stats,
            focus,
            &search_input,
            &changelog_panel,
            changelog_collapsed,
            dark_mode,
            &status,
        )?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if focus == Focus::Search {
            match key.code {
                KeyCode::Esc => {
                    focus = Focus::Browse;
                    pending_search = None;
                    status = status_info("Search canceled.");
                }
                KeyCode::Enter => {
                    let term = search_input.trim().to_string();
                    pending_search = None;
                    if term.is_empty() {
                        status = status_error("Enter a search term.");
                        continue;
                    }
                    focus = Focus::Browse;
                    run_search(
                        &term,
                        &clock,
                        &mut session,
                        &mut playback,
                        &mut table_state,
                        &mut status,
                    );
                }
                KeyCode::Backspace => {
                    search_input.pop();
                    pending_search = schedule_search(&search_input, &clock);
                }
                KeyCode::Char(c) => {
                    search_input.push(c);
                    pending_search = schedule_search(&search_input, &clock);
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Char('s') | KeyCode::Char('/') => {
                focus = Focus::Search;
                search_input.clear();
                pending_search = None;
                status = status_info("Type to search; Enter submits, Esc cancels.");
            }
            KeyCode::Tab => {
                if !pills.is_empty() {
                    pill_index = (pill_index + 1) % pills.len();
                }
            }
            KeyCode::BackTab => {
                if !pills.is_empty() {
                    pill_index = (pill_index + pills.len() - 1) % pills.len();
                }
            }
            KeyCode::Char('g') => {
                let Some(pill) = pills.get(pill_index) else {
                    status = status_error("No genre categories available.");
                    continue;
                };
                let genre = pill.genre.clone();
                match session.show_genre(&genre) {
                    Some(book) => {
                        table_state.select(Some(0));
                        show_book(&mut playback, &clock, &mut status, &book);
                    }
                    None => {
                        playback.shutdown();
                        status = status_info(&format!("No audiobooks in \"{genre}\"."));
                    }
                }
            }
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                let rows = visible_rows(&session);
                if let Some(selected) = table_state.selected()
                    && rows > 0
                {
                    table_state.select(Some((selected + 1).min(rows - 1)));
                }
            }
            KeyCode::Enter => {
                let Some(selected) = table_state.selected() else {
                    continue;
                };
                let index = match session.view() {
                    View::SearchResults { pager, .. } => pager.range().start + selected,
                    View::GenreGrid { .. } => selected,
                    _ => continue,
                };
                if let Some(book) = session.select_from_grid(index) {
                    show_book(&mut playback, &clock, &mut status, &book);
                }
            }
            KeyCode::Char('n') => {
                if session.next_page() {
                    table_state.select(Some(0));
                }
            }
            KeyCode::Char('p') => {
                if session.prev_page() {
                    table_state.select(Some(0));
                }
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                match session.go_back(clock.now_millis()) {
                    Some(book) => {
                        table_state.select(None);
                        show_book(&mut playback, &clock, &mut status, &book);
                    }
                    None => playback.shutdown(),
                }
            }
            KeyCode::Char(' ') => {
                playback.toggle_play();
                status = if playback.state().is_playing {
                    status_info("Playing.")
                } else {
                    status_info("Paused.")
                };
            }
            KeyCode::Left => playback.rewind(),
            KeyCode::Right => playback.forward(),
            KeyCode::Char('-') => {
                let volume = playback.state().volume.saturating_sub(VOLUME_STEP);
                playback.set_volume(volume);
                status = status_info(&format!("Volume {volume}%."));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let volume = playback.state().volume.saturating_add(VOLUME_STEP);
                playback.set_volume(volume);
                status = status_info(&format!("Volume {}%.", playback.state().volume));
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let digit = c.to_digit(10).unwrap_or(0) as f64;
                playback.seek_fraction(digit / 10.0);
            }
            KeyCode::Char('c') => {
                changelog_collapsed = !changelog_collapsed;
                store.set_bool_preference(PREF_CHANGELOG_COLLAPSED, changelog_collapsed)?;
            }
            KeyCode::Char('t') => {
                dark_mode = !dark_mode;
                store.set_bool_preference(PREF_DARK_MODE, dark_mode)?;
            }
            KeyCode::Char('u') => {
                if let Some(base) = opts.base_url.as_deref() {
                    changelog_panel = ChangelogPanel::Loading;
                    spawn_changelog_fetch(base.to_string(), changelog_tx.clone());
                }
            }
            KeyCode::Char('r') => {
                if matches!(session.view(), View::Error { .. }) {
                    session.retry_load();
                    status = status_info("Loading the audiobook library...");
                    draw(
                        &mut terminal,
                        &session,
                        &playback,
                        &mut table_state,
                        &pills,
                        pill_index,
                        &stats,
                        focus,
                        &search_input,
                        &changelog_panel,
                        changelog_collapsed,
                        dark_mode,
                        &status,
                    )?;
                    attempt_load(
                        store,
                        opts,
                        &clock,
                        &mut session,
                        &mut playback,
                        &mut pills,
                        &mut pill_index,
                        &mut stats,
                        &mut status,
                    );
                }
            }
            _ => {}
        }
    }

    playback.shutdown();
    terminal.show_cursor()?;
    tui.leave()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &Session,
    playback: &PlaybackSession,
    table_state: &mut TableState,
    pills: &[GenrePill],
    pill_index: usize,
    stats: &LibraryStats,
    focus: Focus,
    search_input: &str,
    changelog_panel: &ChangelogPanel,
    changelog_collapsed: bool,
    dark_mode: bool,
    status: &str,
) -> Result<()> {
    terminal.draw(|frame| {
        draw_tui(
            frame,
            session,
            playback,
            table_state,
            pills,
            pill_index,
            stats,
            focus,
            search_input,
            changelog_panel,
            changelog_collapsed,
            dark_mode,
            status,
        )
    })?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn attempt_load(
    store: &Store,
    opts: &LoadOptions,
    clock: &dyn Clock,
    session: &mut Session,
    playback: &mut PlaybackSession,
    pills: &mut Vec<GenrePill>,
    pill_index: &mut usize,
    stats: &mut LibraryStats,
    status: &mut String,
) {
    match loader::load(store, opts) {
        Ok(loaded) => {
            *pills = search::genre_pills(&loaded.books);
            *pill_index = 0;
            *stats = catalog::library_stats(&loaded.books);
            let source = match loaded.source {
                LoadSource::Cache => "cache",
                LoadSource::Network => "network",
            };
            let count = loaded.books.len();
            match session.finish_load(loaded.books, clock.now_millis()) {
                Some(book) => {
                    show_book(playback, clock, status, &book);
                    if playback.last_error().is_none() {
                        *status = status_info(&format!(
                            "Loaded {count} audiobooks from {source}. Now playing: {}",
                            truncate(&book.title, 50)
                        ));
                    }
                }
                None => *status = status_info("The audiobook library is empty."),
            }
        }
        Err(err) => {
            session.fail_load(format!("{err:#}"));
            *status = status_error("Could not load the audiobook library.");
        }
    }
}

fn run_search(
    term: &str,
    clock: &dyn Clock,
    session: &mut Session,
    playback: &mut PlaybackSession,
    table_state: &mut TableState,
    status: &mut String,
) {
    match session.submit_search(term) {
        Some(book) => {
            table_state.select(Some(0));
            show_book(playback, clock, status, &book);
        }
        None => {
            playback.shutdown();
            table_state.select(None);
            *status = status_info(&format!("No audiobooks found for \"{term}\"."));
        }
    }
}

fn show_book(
    playback: &mut PlaybackSession,
    clock: &dyn Clock,
    status: &mut String,
    book: &crate::catalog::Book,
) {
    playback.display(book, clock);
    *status = match playback.last_error() {
        Some(err) => status_error(&format!("Player error: {err}")),
        None => status_info(&format!("Now playing: {}", truncate(&book.title, 50))),
    };
}

fn schedule_search(input: &str, clock: &dyn Clock) -> Option<PendingSearch> {
    let term = input.trim();
    if term.chars().count() < SEARCH_MIN_CHARS {
        return None;
    }
    Some(PendingSearch {
        term: term.to_string(),
        due_ms: clock.now_millis() + SEARCH_DEBOUNCE_MS,
    })
}

fn visible_rows(session: &Session) -> usize {
    match session.view() {
        View::SearchResults { pager, .. } => pager.range().len(),
        View::GenreGrid { books, .. } => books.len(),
        _ => 0,
    }
}

fn spawn_changelog_fetch(base: String, tx: mpsc::Sender<Result<Vec<ChangelogEntry>, String>>) {
    std::thread::spawn(move || {
        let _ = tx.send(changelog::fetch(&base));
    });
}

pub(super) fn status_info(message: &str) -> String {
    format!("INFO: {message}")
}

pub(super) fn status_error(message: &str) -> String {
    format!("ERROR: {message}")
}
