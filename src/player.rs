//! External player collaborator. The playback session only ever talks to
//! the `EmbeddedPlayer` trait so it can run against a fake in tests; the
//! production backend drives an mpv subprocess over its JSON IPC socket.

use serde_json::{Value, json};

/// Options bag handed to the player factory. Inline playback and hidden
/// native controls are iframe-era knobs kept for interface parity; the mpv
/// backend only honors `autoplay`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlayerOptions {
    pub autoplay: bool,
    pub inline_playback: bool,
    pub hide_native_controls: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            inline_playback: true,
            hide_native_controls: true,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PlayerRequest {
    pub video_id: String,
    pub width: u32,
    pub height: u32,
    pub options: PlayerOptions,
}

impl PlayerRequest {
    pub(crate) fn for_video(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            width: 320,
            height: 180,
            options: PlayerOptions::default(),
        }
    }

    pub(crate) fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

pub(crate) trait EmbeddedPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, seconds: f64);
    fn current_time(&mut self) -> Option<f64>;
    fn duration(&mut self) -> Option<f64>;
    fn set_volume(&mut self, volume: u8);
    /// Tears the instance down. May fail when the player is already gone;
    /// callers log and continue.
    fn destroy(&mut self) -> Result<(), String>;
}

pub(crate) type PlayerFactory =
    Box<dyn FnMut(&PlayerRequest) -> Result<Box<dyn EmbeddedPlayer>, String>>;

/// Fixed mapping for the numeric error codes the embedded player reports.
pub(crate) fn error_message(code: i64) -> &'static str {
    match code {
        2 => "Invalid request. Check the video id.",
        5 => "Embedded player error.",
        100 => "Video not found or removed.",
        101 | 150 => "The video owner does not allow embedded playback.",
        _ => "Unknown playback error.",
    }
}

#[cfg(unix)]
pub(crate) use mpv::MpvPlayer;

#[cfg(unix)]
pub(crate) fn default_factory() -> PlayerFactory {
    Box::new(|request| {
        MpvPlayer::spawn(request).map(|player| Box::new(player) as Box<dyn EmbeddedPlayer>)
    })
}

#[cfg(not(unix))]
pub(crate) fn default_factory() -> PlayerFactory {
    Box::new(|_request| Err("embedded playback is not supported on this platform".to_string()))
}

#[cfg(unix)]
mod mpv {
    use std::env;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;
    use std::path::PathBuf;
    use std::process::{Child, Command, Stdio};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;

    const CONNECT_ATTEMPTS: usize = 40;
    const CONNECT_DELAY: Duration = Duration::from_millis(50);

    /// mpv subprocess plus the IPC socket used to drive it. The process is
    /// audio-only; the pixel dimensions from the request are ignored.
    pub(crate) struct MpvPlayer {
        child: Child,
        socket_path: PathBuf,
        stream: UnixStream,
        next_request_id: u64,
    }

    impl MpvPlayer {
        pub(crate) fn spawn(request: &PlayerRequest) -> Result<Self, String> {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            let socket_path =
                env::temp_dir().join(format!("audioteca-mpv-{}-{ts}.sock", std::process::id()));

            let mut cmd = Command::new("mpv");
            cmd.arg("--no-video")
                .arg("--really-quiet")
                .arg(format!("--input-ipc-server={}", socket_path.display()))
                .arg("--volume=100");
            if !request.options.autoplay {
                cmd.arg("--pause");
            }
            cmd.arg(request.watch_url())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            let mut child = cmd
                .spawn()
                .map_err(|err| format!("failed to launch mpv: {err}"))?;

            let Some(stream) = connect_with_retries(&socket_path) else {
                let _ = child.kill();
                let _ = child.wait();
                let _ = std::fs::remove_file(&socket_path);
                return Err("mpv IPC socket never became ready".to_string());
            };

            if let Err(err) = stream.set_read_timeout(Some(Duration::from_millis(500))) {
                let _ = child.kill();
                let _ = child.wait();
                let _ = std::fs::remove_file(&socket_path);
                return Err(format!("failed to configure mpv socket: {err}"));
            }

            Ok(Self {
                child,
                socket_path,
                stream,
                next_request_id: 1,
            })
        }

        fn command(&mut self, command: Value) -> Result<Value, String> {
            let request_id = self.next_request_id;
            self.next_request_id += 1;

            let payload = json!({ "command": command, "request_id": request_id });
            let mut line = payload.to_string();
            line.push('\n');
            (&self.stream)
                .write_all(line.as_bytes())
                .map_err(|err| format!("mpv write failed: {err}"))?;

            // Replies interleave with asynchronous events; skip anything
            // that is not the answer to this request.
            let mut reader = BufReader::new(&self.stream);
            let mut buf = String::new();
            loop {
                buf.clear();
                let read = reader
                    .read_line(&mut buf)
                    .map_err(|err| format!("mpv read failed: {err}"))?;
                if read == 0 {
                    return Err("mpv closed the IPC socket".to_string());
                }
                let Ok(reply) = serde_json::from_str::<Value>(&buf) else {
                    continue;
                };
                if reply.get("event").is_some() {
                    continue;
                }
                if reply.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                    continue;
                }
                let status = reply.get("error").and_then(Value::as_str).unwrap_or("");
                if status != "success" {
                    return Err(format!("mpv command failed: {status}"));
                }
                return Ok(reply.get("data").cloned().unwrap_or(Value::Null));
            }
        }

        fn set_property(&mut self, name: &str, value: Value) {
            let _ = self.command(json!(["set_property", name, value]));
        }

        fn get_f64_property(&mut self, name: &str) -> Option<f64> {
            self.command(json!(["get_property", name]))
                .ok()
                .and_then(|data| data.as_f64())
        }
    }

    fn connect_with_retries(path: &PathBuf) -> Option<UnixStream> {
        for _ in 0..CONNECT_ATTEMPTS {
            if let Ok(stream) = UnixStream::connect(path) {
                return Some(stream);
            }
            std::thread::sleep(CONNECT_DELAY);
        }
        None
    }

    impl EmbeddedPlayer for MpvPlayer {
        fn play(&mut self) {
            self.set_property("pause", Value::Bool(false));
        }

        fn pause(&mut self) {
            self.set_property("pause", Value::Bool(true));
        }

        fn seek_to(&mut self, seconds: f64) {
            let _ = self.command(json!(["seek", seconds, "absolute"]));
        }

        fn current_time(&mut self) -> Option<f64> {
            self.get_f64_property("time-pos")
        }

        fn duration(&mut self) -> Option<f64> {
            self.get_f64_property("duration")
        }

        fn set_volume(&mut self, volume: u8) {
            self.set_property("volume", json!(volume));
        }

        fn destroy(&mut self) -> Result<(), String> {
            let quit = self.command(json!(["quit"]));
            let _ = self.child.kill();
            let _ = self.child.wait();
            let _ = std::fs::remove_file(&self.socket_path);
            quit.map(|_| ())
                .map_err(|err| format!("mpv did not quit cleanly: {err}"))
        }
    }

    impl Drop for MpvPlayer {
        fn drop(&mut self) {
            let _ = self.child.kill();
            let _ = self.child.wait();
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}
