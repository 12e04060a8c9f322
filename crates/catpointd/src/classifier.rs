//! Cat classifier adapters.
//!
//! [`CommandClassifier`] hands the image to an external label-detection
//! program and reads back a JSON label list:
//!
//! ```json
//! {"labels": [{"name": "Cat", "confidence": 97.1}, {"name": "Sofa", "confidence": 80.4}]}
//! ```
//!
//! A cat is present when any label whose name contains "cat"
//! (case-insensitive) reaches the confidence threshold.
//!
//! All functions in this module perform blocking I/O and should be
//! called via `spawn_blocking`. Give the classifier the same timeout as
//! the engine so a hung program is killed rather than left running.

use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use catpoint_core::{CatClassifier, ClassifierError};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One label returned by the detection program.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub name: String,
    /// Percent, `0.0..=100.0`.
    pub confidence: f32,
}

/// Full response of the detection program.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl LabelResponse {
    /// Parses the program's stdout.
    pub fn parse(raw: &[u8]) -> Result<Self, ClassifierError> {
        serde_json::from_slice(raw).map_err(|e| ClassifierError::InvalidResponse(e.to_string()))
    }

    /// True if a cat label reaches `confidence_threshold`.
    pub fn contains_cat(&self, confidence_threshold: f32) -> bool {
        self.labels.iter().any(|label| {
            label.confidence >= confidence_threshold && label.name.to_lowercase().contains("cat")
        })
    }

    fn summary(&self) -> String {
        self.labels
            .iter()
            .map(|l| format!("{} ({:.1}%)", l.name, l.confidence))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Classifier backed by an external program.
///
/// The image bytes are written to the program's stdin while its stdout and
/// stderr are drained, so a chatty program cannot stall on a full pipe.
/// The program must print a [`LabelResponse`] on stdout and exit with
/// status 0. With a timeout set, a program still running at the deadline
/// is killed.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandClassifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Kills the program if it has not exited after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn unavailable(&self, what: impl std::fmt::Display) -> ClassifierError {
        ClassifierError::Unavailable(format!("{}: {what}", self.program.display()))
    }

    /// Waits for exit, killing the child once the deadline passes.
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ClassifierError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|e| self.unavailable(e));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.unavailable(e))? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    program = %self.program.display(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Classifier timed out, killing it"
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.unavailable(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                )));
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl CatClassifier for CommandClassifier {
    fn contains_cat(
        &self,
        image: &[u8],
        confidence_threshold: f32,
    ) -> Result<bool, ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::MalformedImage("image is empty".to_string()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let stdin = child.stdin.take();
        let image = image.to_vec();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(&image),
            None => Ok(()),
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // On timeout the pipe threads finish on their own once the pipes close.
        let status = self.wait(&mut child)?;

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        match writer.join() {
            Ok(Ok(())) => {}
            // The program may exit without reading the whole image.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Classifier closed stdin early");
            }
            Ok(Err(e)) => return Err(self.unavailable(format!("writing image: {e}"))),
            Err(_) => return Err(self.unavailable("stdin writer panicked")),
        }

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(self.unavailable(format!(
                "exited with {status}: {}",
                stderr.trim()
            )));
        }

        let response = LabelResponse::parse(&stdout)?;
        info!(labels = %response.summary(), "Detected labels");

        let detected = response.contains_cat(confidence_threshold);
        debug!(detected, confidence_threshold, "Classification finished");
        Ok(detected)
    }
}

/// Stand-in used when no classifier is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

impl CatClassifier for DisabledClassifier {
    fn contains_cat(&self, _image: &[u8], _threshold: f32) -> Result<bool, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "no classifier configured".to_string(),
        ))
    }
}
