//! Engine construction from configuration entries.

use super::{CommandEngine, CommandTemplate, HttpEngine, HttpRequestTemplate, SpeechEngine, ToneEngine};
use crate::config::VoxConfig;
use crate::descriptors::EngineConfig;
use crate::error::{VoxError, VoxResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One configured engine, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineSpec {
    /// Network engine
    Http {
        /// Engine configuration
        #[serde(default)]
        config: EngineConfig,
        /// Request template
        request: HttpRequestTemplate,
    },
    /// Local direct-play engine
    Command {
        /// Engine configuration
        #[serde(default)]
        config: EngineConfig,
        /// Program to run
        command: CommandTemplate,
    },
    /// Offline tone engine
    Tone {
        /// Engine configuration
        #[serde(default)]
        config: EngineConfig,
    },
}

impl EngineSpec {
    /// Engine configuration carried by this entry
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        match self {
            Self::Http { config, .. } | Self::Command { config, .. } | Self::Tone { config } => config,
        }
    }
}

/// Build an engine instance from its configuration entry
///
/// # Errors
///
/// Returns a configuration error if the entry is incomplete.
pub fn build_engine(spec: &EngineSpec, settings: &VoxConfig) -> VoxResult<Box<dyn SpeechEngine>> {
    let engine: Box<dyn SpeechEngine> = match spec {
        EngineSpec::Http { config, request } => {
            if request.url.trim().is_empty() {
                return Err(VoxError::configuration("http engine requires a url"));
            }
            Box::new(
                HttpEngine::new(config.clone(), request.clone())
                    .with_timeout(Duration::from_secs(settings.http.timeout_secs))
                    .with_user_agent(settings.http.user_agent.clone()),
            )
        }
        EngineSpec::Command { config, command } => {
            if command.program.trim().is_empty() {
                return Err(VoxError::configuration("command engine requires a program"));
            }
            Box::new(CommandEngine::new(config.clone(), command.clone()))
        }
        EngineSpec::Tone { config } => Box::new(ToneEngine::new(config.clone())),
    };
    debug!("Built {} engine", engine.type_tag());
    Ok(engine)
}
