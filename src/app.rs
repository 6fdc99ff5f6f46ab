//! Application entry: resolves configuration, collects input files and
//! runs the decision engine over each of them.

use crate::audio::{ChunkStreamer, StreamParams, WavAudio};
use crate::cli::Cli;
use crate::config::Config;
use crate::engine::{Decision, DecisionEngine};
use crate::error::Result;
use crate::output;
use crate::stt::SttAdapter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runs the CLI invocation. Returns the process exit code: 0 when every
/// input produced a decision, 1 when any file failed fatally.
pub async fn run(cli: Cli) -> i32 {
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dropcue: {:#}", e);
            return 1;
        }
    };

    let files = match collect_inputs(&cli.input) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("dropcue: {}: {}", cli.input.display(), e);
            return 1;
        }
    };

    let mut failures = 0usize;
    for path in &files {
        match process_file(&config, path, cli.paced, cli.no_stt).await {
            Ok(decision) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                if cli.quiet {
                    println!("{}", output::render_compact(&name, &decision));
                } else {
                    println!("{}", output::render_result(&name, &decision));
                }
            }
            Err(e) => {
                eprintln!("dropcue: {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 { 1 } else { 0 }
}

/// Loads the config file, then applies environment and CLI overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?.with_env_overrides();

    if let Some(wait) = cli.beep_wait {
        config.engine.beep_wait_timeout_ms = wait.as_millis() as u64;
    }
    if cli.no_stt {
        config.stt.api_key = None;
    }

    config.validate()?;
    Ok(config)
}

/// Expands the input path into the list of WAV files to analyze.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        files.sort();
        Ok(files)
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

/// Analyzes one greeting recording end to end.
pub async fn process_file(
    config: &Config,
    path: &Path,
    force_paced: bool,
    no_stt: bool,
) -> Result<Decision> {
    let wav = WavAudio::open(path)?;
    let sample_rate = wav.sample_rate();
    info!(file = %path.display(), sample_rate, "processing");

    let stt = if !no_stt && config.stt_enabled() {
        match SttAdapter::connect(config, sample_rate).await {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                warn!("STT unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    // A live transcription session needs audio at call speed; otherwise
    // pacing is opt-in.
    let paced = force_paced || stt.is_some();

    let params = StreamParams::new(sample_rate, config.audio.chunk_duration());
    let streamer = ChunkStreamer::new(wav.into_samples(), params);
    let chunks = streamer.stream(paced);

    let engine = DecisionEngine::new(config, sample_rate);
    Ok(engine.run(chunks, stt).await)
}
