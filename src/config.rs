use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub beep: BeepConfig,
    pub silence: SilenceConfig,
    pub engine: EngineConfig,
    pub stt: SttConfig,
}

/// Audio streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Nominal chunk duration in milliseconds.
    pub chunk_duration_ms: u64,
    /// Expected input sample rate in Hz. Files with other rates are
    /// accepted; the pipeline is parameterized on the actual rate.
    pub sample_rate: u32,
}

/// Beep detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeepConfig {
    /// Lower edge of the tone band in Hz.
    pub min_freq: f32,
    /// Upper edge of the tone band in Hz.
    pub max_freq: f32,
    /// Advisory minimum beep length in milliseconds; enforcement uses the
    /// detector's consecutive-hit floor.
    pub min_duration_ms: u64,
    /// Amplitude floor for a spectral peak to qualify.
    pub min_amplitude: f32,
}

/// Silence detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SilenceConfig {
    /// RMS ceiling for a chunk to count as silent.
    pub threshold: f32,
    /// Minimum elapsed silence before an event is emitted, in milliseconds.
    pub min_duration_ms: u64,
}

/// Decision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// How long confirmed silence may run before dropping without a beep,
    /// in milliseconds.
    pub beep_wait_timeout_ms: u64,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Deepgram API key. Usually supplied via `DEEPGRAM_API_KEY`.
    pub api_key: Option<String>,
    /// End-of-greeting phrases matched against transcripts.
    pub end_phrases: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_duration_ms: defaults::CHUNK_DURATION_MS,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for BeepConfig {
    fn default() -> Self {
        Self {
            min_freq: defaults::BEEP_MIN_FREQ,
            max_freq: defaults::BEEP_MAX_FREQ,
            min_duration_ms: defaults::BEEP_MIN_DURATION_MS,
            min_amplitude: defaults::BEEP_MIN_AMPLITUDE,
        }
    }
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::SILENCE_THRESHOLD,
            min_duration_ms: defaults::SILENCE_MIN_DURATION_MS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beep_wait_timeout_ms: defaults::BEEP_WAIT_TIMEOUT_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            end_phrases: defaults::END_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl AudioConfig {
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_millis(self.chunk_duration_ms)
    }
}

impl SilenceConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }
}

impl EngineConfig {
    pub fn beep_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.beep_wait_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Propagates errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DEEPGRAM_API_KEY → stt.api_key (also activates STT)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY")
            && !key.is_empty()
        {
            self.stt.api_key = Some(key);
        }

        self
    }

    /// Checks the values a malformed config file could break.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(crate::error::DropcueError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.chunk_duration_ms == 0 {
            return Err(crate::error::DropcueError::ConfigInvalidValue {
                key: "audio.chunk_duration_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.beep.min_freq >= self.beep.max_freq || self.beep.min_freq <= 0.0 {
            return Err(crate::error::DropcueError::ConfigInvalidValue {
                key: "beep.min_freq".to_string(),
                message: "band must satisfy 0 < min_freq < max_freq".to_string(),
            });
        }
        if self.silence.threshold <= 0.0 {
            return Err(crate::error::DropcueError::ConfigInvalidValue {
                key: "silence.threshold".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the speech-to-text path is active.
    ///
    /// STT is gated purely on API key presence; everything else degrades
    /// gracefully when it is absent.
    pub fn stt_enabled(&self) -> bool {
        self.stt.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/dropcue/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("dropcue")
            .join("config.toml")
    }
}
