//! Playback session: bridges the UI controls to the single external player
//! instance and keeps the progress display in sync through one polling
//! task. The discipline throughout is cancel/destroy before replace.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::Book;
use crate::player::{self, EmbeddedPlayer, PlayerFactory, PlayerRequest};

pub(crate) const POLL_INTERVAL_MS: u64 = 1_000;
pub(crate) const SEEK_STEP_SECONDS: f64 = 10.0;
const DEFAULT_VOLUME: u8 = 100;

pub(crate) trait Clock {
    fn now_millis(&self) -> u64;
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub volume: u8,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// The single recurring sampling task. Owning it through an `Option` on the
/// session makes "at most one alive" structural.
#[derive(Debug, Clone, Copy)]
struct PollTimer {
    next_due_ms: u64,
}

impl PollTimer {
    fn armed(now_ms: u64) -> Self {
        Self {
            next_due_ms: now_ms + POLL_INTERVAL_MS,
        }
    }

    fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        self.next_due_ms = now_ms + POLL_INTERVAL_MS;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProgressUpdate {
    pub current_time: f64,
    pub percentage: f64,
}

pub(crate) struct PlaybackSession {
    state: PlaybackState,
    player: Option<Box<dyn EmbeddedPlayer>>,
    poll: Option<PollTimer>,
    factory: PlayerFactory,
    api_ready: bool,
    pending_video: Option<String>,
    last_error: Option<String>,
    warnings: Vec<String>,
}

impl PlaybackSession {
    pub(crate) fn new(factory: PlayerFactory) -> Self {
        Self {
            state: PlaybackState::default(),
            player: None,
            poll: None,
            factory,
            api_ready: false,
            pending_video: None,
            last_error: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub(crate) fn live_poll_count(&self) -> usize {
        usize::from(self.poll.is_some())
    }

    pub(crate) fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// One-shot readiness signal from the external player API. A video set
    /// before this fires is constructed now — whichever book is current at
    /// this moment wins.
    pub(crate) fn mark_api_ready(&mut self) {
        if self.api_ready {
            return;
        }
        self.api_ready = true;
        if let Some(video_id) = self.pending_video.take() {
            self.construct_player(&video_id);
        }
    }

    /// Resets the session for a newly displayed book. Ordering is part of
    /// the contract: cancel the poll, then tear down the old player, then
    /// build the new one, then re-arm the poll.
    pub(crate) fn display(&mut self, book: &Book, clock: &dyn Clock) {
        self.poll = None;
        self.teardown_player();
        self.pending_video = None;
        self.last_error = None;

        // Time, duration and play flag reset per book; volume carries over.
        self.state = PlaybackState {
            current_time: 0.0,
            duration: book.duration_seconds as f64,
            is_playing: false,
            volume: self.state.volume,
        };

        if let Some(video_id) = book.video_id.as_deref() {
            if self.api_ready {
                self.construct_player(video_id);
            } else {
                self.pending_video = Some(video_id.to_string());
            }
        }

        self.poll = Some(PollTimer::armed(clock.now_millis()));
    }

    fn construct_player(&mut self, video_id: &str) {
        let request = PlayerRequest::for_video(video_id);
        match (self.factory)(&request) {
            Ok(mut player) => {
                player.set_volume(self.state.volume);
                if request.options.autoplay {
                    player.play();
                    self.state.is_playing = true;
                }
                if let Some(duration) = player.duration()
                    && duration > 0.0
                {
                    self.state.duration = duration;
                }
                self.player = Some(player);
            }
            Err(message) => {
                self.last_error = Some(message);
            }
        }
    }

    /// The external instance may already be torn down on its side; failures
    /// are logged and swallowed.
    fn teardown_player(&mut self) {
        if let Some(mut player) = self.player.take()
            && let Err(err) = player.destroy()
        {
            self.warnings
                .push(format!("could not destroy previous player: {err}"));
        }
    }

    /// One scheduler step. Samples the player when the poll is due and a
    /// current time is readable.
    pub(crate) fn tick(&mut self, clock: &dyn Clock) -> Option<ProgressUpdate> {
        let poll = self.poll.as_mut()?;
        if !poll.due(clock.now_millis()) {
            return None;
        }

        let player = self.player.as_mut()?;
        if let Some(duration) = player.duration()
            && duration > 0.0
        {
            self.state.duration = duration;
        }
        let current_time = player.current_time()?;
        self.state.current_time = current_time;
        Some(ProgressUpdate {
            current_time,
            percentage: self.progress_percentage(),
        })
    }

    pub(crate) fn progress_percentage(&self) -> f64 {
        if self.state.duration > 0.0 {
            self.state.current_time / self.state.duration * 100.0
        } else {
            0.0
        }
    }

    pub(crate) fn toggle_play(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if self.state.is_playing {
            player.pause();
            self.state.is_playing = false;
        } else {
            player.play();
            self.state.is_playing = true;
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.seek_relative(-SEEK_STEP_SECONDS);
    }

    pub(crate) fn forward(&mut self) {
        self.seek_relative(SEEK_STEP_SECONDS);
    }

    fn seek_relative(&mut self, delta: f64) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let base = player.current_time().unwrap_or(self.state.current_time);
        let target = (base + delta).clamp(0.0, self.state.duration);
        player.seek_to(target);
        self.state.current_time = target;
    }

    /// Progress-bar click: a fraction of the bar width becomes an absolute
    /// seek, with the state updated optimistically before the next tick.
    pub(crate) fn seek_fraction(&mut self, fraction: f64) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let fraction = fraction.clamp(0.0, 1.0);
        let target = if self.state.duration > 0.0 {
            fraction * self.state.duration
        } else {
            0.0
        };
        player.seek_to(target);
        self.state.current_time = target;
    }

    pub(crate) fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.state.volume = volume;
        if let Some(player) = self.player.as_mut() {
            player.set_volume(volume);
        }
    }

    /// Player error event; maps the code and parks the message for the
    /// inline panel. Never propagates.
    pub(crate) fn report_player_error(&mut self, code: i64) {
        self.last_error = Some(player::error_message(code).to_string());
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Page-teardown equivalent: cancel the poll and destroy the player.
    pub(crate) fn shutdown(&mut self) {
        self.poll = None;
        self.teardown_player();
    }
}
