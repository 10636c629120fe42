//! Local direct-play engine driving a speech program such as `espeak-ng`.

use super::{fill_template, SpeechEngine};
use crate::descriptors::EngineConfig;
use crate::params::ResolvedParams;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Program and argument templates; arguments take the same placeholders as
/// HTTP templates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplate {
    /// Executable name or path
    pub program: String,
    /// Argument templates
    pub args: Vec<String>,
}

/// Token of the playback currently running, if any
#[derive(Debug, Default)]
struct ActivePlayback {
    latest_id: u64,
    token: Option<CancellationToken>,
}

/// Engine that plays speech itself by running a local program
#[derive(Debug)]
pub struct CommandEngine {
    config: EngineConfig,
    command: CommandTemplate,
    active: Mutex<ActivePlayback>,
}

impl CommandEngine {
    /// Create a new command engine
    #[must_use]
    pub fn new(config: EngineConfig, command: CommandTemplate) -> Self {
        Self {
            config,
            command,
            active: Mutex::new(ActivePlayback::default()),
        }
    }

    /// Register a new playback; a stop from here on cancels it
    fn begin_playback(&self) -> (u64, CancellationToken) {
        let mut active = self.active.lock();
        if let Some(old) = active.token.take() {
            old.cancel();
        }
        active.latest_id = active.latest_id.wrapping_add(1);
        let token = CancellationToken::new();
        active.token = Some(token.clone());
        (active.latest_id, token)
    }

    fn finish_playback(&self, id: u64) {
        let mut active = self.active.lock();
        if active.latest_id == id {
            active.token = None;
        }
    }

    fn cancel_playback(&self) {
        if let Some(token) = self.active.lock().token.take() {
            token.cancel();
        }
    }

    fn render_args(&self, text: &str, params: &ResolvedParams) -> Vec<String> {
        let text = self.config.speech_rule.apply(text);
        self.command
            .args
            .iter()
            .map(|arg| fill_template(arg, &text, params))
            .collect()
    }

    async fn play(&self, text: &str, params: &ResolvedParams, cancel: &CancellationToken) -> bool {
        let args = self.render_args(text, params);
        if cancel.is_cancelled() {
            debug!("Playback stopped before {} started", self.command.program);
            return false;
        }
        let mut child = match Command::new(&self.command.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                warn!("Failed to start {}: {}", self.command.program, err);
                return false;
            }
        };
        debug!("Started {} for direct play", self.command.program);

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => true,
                Ok(status) => {
                    warn!("{} exited with {}", self.command.program, status);
                    false
                }
                Err(err) => {
                    warn!("Failed waiting for {}: {}", self.command.program, err);
                    false
                }
            },
            () = cancel.cancelled() => {
                debug!("Stopping {}", self.command.program);
                if let Err(err) = child.kill().await {
                    warn!("Failed to kill {}: {}", self.command.program, err);
                }
                false
            }
        }
    }
}

#[async_trait]
impl SpeechEngine for CommandEngine {
    fn type_tag(&self) -> &'static str {
        "command"
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn is_direct_play(&self) -> bool {
        true
    }

    async fn on_stop(&self) {
        self.cancel_playback();
    }

    async fn start_direct_play(&self, text: &str, params: &ResolvedParams) -> bool {
        let (id, cancel) = self.begin_playback();
        let played = self.play(text, params, &cancel).await;
        self.finish_playback(id);
        played
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn params() -> ResolvedParams {
        ResolvedParams {
            rate: 175,
            pitch: 50,
            volume: 100,
            rate_follows_system: false,
            pitch_follows_system: true,
        }
    }

    #[test]
    fn test_render_args() {
        let engine = CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "espeak-ng".to_string(),
                args: vec![
                    "-s".to_string(),
                    "{{rate}}".to_string(),
                    "-p".to_string(),
                    "{{pitch}}".to_string(),
                    "{{text}}".to_string(),
                ],
            },
        );
        assert_eq!(
            engine.render_args("hello & bye", &params()),
            vec!["-s", "175", "-p", "50", "hello & bye"]
        );
        assert!(engine.is_direct_play());

        // placeholders typed by the user reach the program verbatim
        assert_eq!(
            engine.render_args("read {{pitch}} aloud", &params()),
            vec!["-s", "175", "-p", "50", "read {{pitch}} aloud"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_reports_false() {
        let engine = CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "voxbridge-no-such-program".to_string(),
                args: Vec::new(),
            },
        );
        assert!(!engine.start_direct_play("hi", &params()).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_drives_result() {
        let ok = CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "exit 0".to_string()],
            },
        );
        assert!(ok.start_direct_play("hi", &params()).await);

        let failing = CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "exit 3".to_string()],
            },
        );
        assert!(!failing.start_direct_play("hi", &params()).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_interrupts_playback() {
        let engine = Arc::new(CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "sleep".to_string(),
                args: vec!["10".to_string()],
            },
        ));

        let player = Arc::clone(&engine);
        let playing = tokio::spawn(async move { player.start_direct_play("hi", &params()).await });
        tokio::time::sleep(Duration::from_millis(200)).await;

        engine.on_stop().await;
        let played = tokio::time::timeout(Duration::from_secs(5), playing)
            .await
            .expect("stop should end playback")
            .unwrap();
        assert!(!played);

        // Stopping again with nothing playing is harmless
        engine.on_stop().await;
    }

    fn sleeper() -> CommandEngine {
        CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "sleep".to_string(),
                args: vec!["10".to_string()],
            },
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_before_spawn_skips_the_program() {
        let engine = sleeper();
        let (id, cancel) = engine.begin_playback();
        engine.on_stop().await;

        let played = tokio::time::timeout(Duration::from_secs(2), engine.play("hi", &params(), &cancel))
            .await
            .expect("a stopped playback must not run the program");
        assert!(!played);
        engine.finish_playback(id);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_right_after_start_ends_playback() {
        let engine = sleeper();
        let stopper = async {
            tokio::task::yield_now().await;
            engine.on_stop().await;
        };
        let p = params();

        let (played, ()) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(engine.start_direct_play("hi", &p), stopper) },
        )
        .await
        .expect("stop should end playback");
        assert!(!played);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_earlier_stop_does_not_cancel_next_playback() {
        let engine = CommandEngine::new(
            EngineConfig::default(),
            CommandTemplate {
                program: "true".to_string(),
                args: Vec::new(),
            },
        );
        engine.on_stop().await;
        assert!(engine.start_direct_play("hi", &params()).await);
        engine.on_stop().await;
        assert!(engine.start_direct_play("hi", &params()).await);
    }
}
