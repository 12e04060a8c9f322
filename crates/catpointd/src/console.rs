//! Interactive operator console.
//!
//! Each input line is parsed with clap into a [`ConsoleCommand`] and run
//! against an [`EngineHandle`]. The same command enum is the binary's
//! subcommand set, so `catpoint arm home` and typing `arm home` at the
//! prompt behave identically.
//!
//! Sensors are referenced by exact name, full id, or a unique id prefix
//! (the 8-character short id printed by `sensors` always works).

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use catpoint_core::{ArmingStatus, Sensor, SensorId, SensorType};

use crate::display::Renderer;
use crate::engine::{EngineError, EngineHandle};

// ============================================================================
// Commands
// ============================================================================

/// Operator commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ConsoleCommand {
    /// Show alarm, arming and camera status
    Status,

    /// List sensors
    Sensors,

    /// Add an inactive sensor
    AddSensor {
        kind: SensorKind,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Remove a sensor
    RemoveSensor {
        #[arg(required = true, num_args = 1..)]
        sensor: Vec<String>,
    },

    /// Mark a sensor active
    Activate {
        #[arg(required = true, num_args = 1..)]
        sensor: Vec<String>,
    },

    /// Mark a sensor inactive
    Deactivate {
        #[arg(required = true, num_args = 1..)]
        sensor: Vec<String>,
    },

    /// Arm the system
    Arm { mode: ArmMode },

    /// Disarm the system
    Disarm,

    /// Run a camera image through the cat classifier
    Image { path: PathBuf },

    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArmMode {
    Home,
    Away,
}

impl From<ArmMode> for ArmingStatus {
    fn from(mode: ArmMode) -> Self {
        match mode {
            ArmMode::Home => ArmingStatus::ArmedHome,
            ArmMode::Away => ArmingStatus::ArmedAway,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SensorKind {
    Door,
    Window,
    Motion,
}

impl From<SensorKind> for SensorType {
    fn from(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Door => SensorType::Door,
            SensorKind::Window => SensorType::Window,
            SensorKind::Motion => SensorType::Motion,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "catpoint", no_binary_name = true, disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

/// Parses one console line.
///
/// Words split on whitespace; single or double quotes keep a name in one
/// piece (`activate "Front  door"`). `help` and malformed input come back
/// as a clap error whose rendering is the text to show the operator.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, clap::Error> {
    ConsoleLine::try_parse_from(split_words(line)?).map(|l| l.command)
}

/// Shell-style word splitting: quotes group, backslash escapes the next
/// character outside single quotes.
fn split_words(line: &str) -> Result<Vec<String>, clap::Error> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => word.push(c),
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    word.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => word.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(clap::Error::raw(
            clap::error::ErrorKind::InvalidValue,
            "unterminated quote\n",
        ));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("No sensor matches '{0}'")]
    NoSuchSensor(String),

    #[error("'{query}' matches {count} sensors; use the id")]
    AmbiguousSensor { query: String, count: usize },

    #[error("Failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ============================================================================
// Execution
// ============================================================================

/// What the console should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// Finds a sensor by exact name, full id, or unique id prefix.
pub fn resolve_sensor(sensors: &[Sensor], query: &str) -> Result<SensorId, ConsoleError> {
    let named: Vec<&Sensor> = sensors.iter().filter(|s| s.name == query).collect();
    match named.as_slice() {
        [only] => return Ok(only.id),
        [] => {}
        many => {
            return Err(ConsoleError::AmbiguousSensor {
                query: query.to_string(),
                count: many.len(),
            })
        }
    }

    if let Ok(id) = query.parse::<SensorId>() {
        if sensors.iter().any(|s| s.id == id) {
            return Ok(id);
        }
    }

    let prefix = query.to_ascii_lowercase();
    if prefix.is_empty() {
        return Err(ConsoleError::NoSuchSensor(query.to_string()));
    }
    let matches: Vec<&Sensor> = sensors
        .iter()
        .filter(|s| {
            s.id.to_string().starts_with(&prefix)
                || s.id.as_uuid().simple().to_string().starts_with(&prefix)
        })
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.id),
        [] => Err(ConsoleError::NoSuchSensor(query.to_string())),
        many => Err(ConsoleError::AmbiguousSensor {
            query: query.to_string(),
            count: many.len(),
        }),
    }
}

/// Runs one command against the engine.
pub async fn execute(
    handle: &EngineHandle,
    renderer: &Renderer,
    command: ConsoleCommand,
) -> Result<Reply, ConsoleError> {
    debug!(?command, "Executing console command");

    let output = match command {
        ConsoleCommand::Status => renderer.status(&handle.snapshot().await?),
        ConsoleCommand::Sensors => renderer.sensors(&handle.snapshot().await?.sensors),
        ConsoleCommand::AddSensor { kind, name } => {
            let sensor = handle.add_sensor(name.join(" "), kind.into()).await?;
            format!("Added {}", renderer.sensor_line(&sensor))
        }
        ConsoleCommand::RemoveSensor { sensor } => {
            let id = lookup(handle, &sensor.join(" ")).await?;
            let removed = handle.remove_sensor(id).await?;
            format!("Removed {}", removed.name)
        }
        ConsoleCommand::Activate { sensor } => {
            set_active(handle, renderer, &sensor.join(" "), true).await?
        }
        ConsoleCommand::Deactivate { sensor } => {
            set_active(handle, renderer, &sensor.join(" "), false).await?
        }
        ConsoleCommand::Arm { mode } => {
            handle.set_arming_status(mode.into()).await?;
            renderer.status(&handle.snapshot().await?)
        }
        ConsoleCommand::Disarm => {
            handle.set_arming_status(ArmingStatus::Disarmed).await?;
            renderer.status(&handle.snapshot().await?)
        }
        ConsoleCommand::Image { path } => {
            let image = tokio::fs::read(&path)
                .await
                .map_err(|source| ConsoleError::ReadImage {
                    path: path.clone(),
                    source,
                })?;
            let detected = handle.submit_image(image).await?;
            let alarm = handle.snapshot().await?.alarm_status;
            format!(
                "{} (alarm: {})",
                if detected {
                    "DANGER - CAT DETECTED"
                } else {
                    "Cat-free"
                },
                renderer.alarm(alarm)
            )
        }
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    };

    Ok(Reply::Output(output))
}

async fn lookup(handle: &EngineHandle, query: &str) -> Result<SensorId, ConsoleError> {
    let snapshot = handle.snapshot().await?;
    resolve_sensor(&snapshot.sensors, query)
}

async fn set_active(
    handle: &EngineHandle,
    renderer: &Renderer,
    query: &str,
    active: bool,
) -> Result<String, ConsoleError> {
    let id = lookup(handle, query).await?;
    handle.set_sensor_active(id, active).await?;

    let snapshot = handle.snapshot().await?;
    let line = snapshot
        .sensors
        .iter()
        .find(|s| s.id == id)
        .map(|s| renderer.sensor_line(s))
        .unwrap_or_default();
    Ok(format!("{line}\nAlarm: {}", renderer.alarm(snapshot.alarm_status)))
}

/// Parses and runs one line, producing the text to show.
///
/// Blank lines produce empty output.
pub async fn run_line(handle: &EngineHandle, renderer: &Renderer, line: &str) -> Reply {
    if line.trim().is_empty() {
        return Reply::Output(String::new());
    }

    match parse_line(line) {
        Ok(command) => match execute(handle, renderer, command).await {
            Ok(reply) => reply,
            Err(e) => Reply::Output(format!("error: {e}")),
        },
        Err(e) => Reply::Output(e.render().to_string().trim_end().to_string()),
    }
}

// ============================================================================
// Session loop
// ============================================================================

/// Reads commands from `input` until EOF, `quit`, or cancellation, writing
/// replies to `output`.
pub async fn run_session<R, W>(
    handle: &EngineHandle,
    renderer: &Renderer,
    input: R,
    output: &mut W,
    prompt: bool,
    cancel: &CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        if prompt {
            write!(output, "> ")?;
            output.flush()?;
        }

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match run_line(handle, renderer, &line).await {
            Reply::Quit => break,
            Reply::Output(text) if text.is_empty() => {}
            Reply::Output(text) => writeln!(output, "{text}")?,
        }
    }

    Ok(())
}

/// Interactive console on stdin/stdout.
///
/// Engine events are printed as they arrive, interleaved with command
/// output.
pub async fn run_console(
    handle: EngineHandle,
    renderer: Renderer,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let mut events = handle.subscribe();
    let event_cancel = cancel.child_token();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = event_cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => println!("{}", renderer.event(&event)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Console fell behind on events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    let mut stdout = std::io::stdout();
    println!("{}", renderer.status(&snapshot_or_default(&handle).await));
    println!("Type 'help' for commands.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = run_session(&handle, &renderer, stdin, &mut stdout, true, &cancel).await;

    cancel.cancel();
    let _ = printer.await;
    result
}

async fn snapshot_or_default(handle: &EngineHandle) -> catpoint_core::SecuritySnapshot {
    match handle.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Could not load initial status");
            catpoint_core::SecuritySnapshot {
                alarm_status: Default::default(),
                arming_status: Default::default(),
                cat_detected: false,
                sensors: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("status").unwrap(), ConsoleCommand::Status);
        assert_eq!(parse_line("  disarm ").unwrap(), ConsoleCommand::Disarm);
        assert_eq!(parse_line("exit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(
            parse_line("arm away").unwrap(),
            ConsoleCommand::Arm {
                mode: ArmMode::Away
            }
        );
    }

    #[test]
    fn test_parse_multi_word_name() {
        assert_eq!(
            parse_line("add-sensor door Front door").unwrap(),
            ConsoleCommand::AddSensor {
                kind: SensorKind::Door,
                name: vec!["Front".to_string(), "door".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_quoted_name() {
        assert_eq!(
            parse_line(r#"activate "Front  door""#).unwrap(),
            ConsoleCommand::Activate {
                sensor: vec!["Front  door".to_string()],
            }
        );
        assert_eq!(
            parse_line("add-sensor window 'Kid''s room'").unwrap(),
            ConsoleCommand::AddSensor {
                kind: SensorKind::Window,
                name: vec!["Kids room".to_string()],
            }
        );
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("  a  b ").unwrap(), vec!["a", "b"]);
        assert_eq!(split_words(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert_eq!(split_words(r#"say "it's" ok"#).unwrap(), vec!["say", "it's", "ok"]);
        assert_eq!(split_words(r"Back\ door").unwrap(), vec!["Back door"]);
        assert!(split_words(r#"activate "Front door"#).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_line("arm sideways").is_err());
        assert!(parse_line("activate").is_err());
        assert!(parse_line("launch").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let err = parse_line("help").unwrap_err();
        let text = err.render().to_string();
        assert!(text.contains("add-sensor"));
        assert!(text.contains("image"));
    }

    #[test]
    fn test_mode_and_kind_conversions() {
        assert_eq!(ArmingStatus::from(ArmMode::Home), ArmingStatus::ArmedHome);
        assert_eq!(SensorType::from(SensorKind::Motion), SensorType::Motion);
    }

    fn sensors() -> Vec<Sensor> {
        vec![
            Sensor::new("Front door", SensorType::Door),
            Sensor::new("Back door", SensorType::Door),
            Sensor::new("Back door", SensorType::Window),
        ]
    }

    #[test]
    fn test_resolve_by_name() {
        let sensors = sensors();
        assert_eq!(resolve_sensor(&sensors, "Front door").unwrap(), sensors[0].id);
    }

    #[test]
    fn test_resolve_duplicate_name_is_ambiguous() {
        let err = resolve_sensor(&sensors(), "Back door").unwrap_err();
        assert!(matches!(err, ConsoleError::AmbiguousSensor { count: 2, .. }));
    }

    #[test]
    fn test_resolve_by_full_id_and_short_id() {
        let sensors = sensors();
        let target = sensors[1].id;
        assert_eq!(resolve_sensor(&sensors, &target.to_string()).unwrap(), target);
        assert_eq!(resolve_sensor(&sensors, &target.short()).unwrap(), target);
        assert_eq!(
            resolve_sensor(&sensors, &target.short().to_ascii_uppercase()).unwrap(),
            target
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve_sensor(&sensors(), "Garage").unwrap_err();
        assert!(matches!(err, ConsoleError::NoSuchSensor(_)));
    }
}
