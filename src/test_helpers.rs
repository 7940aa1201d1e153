//! Test utilities for creating temporary log files and recording sink calls.

use crate::error::Result;
use crate::reader::Line;
use crate::sink::Sink;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new, empty temporary log file for testing
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file with exact initial content
    pub fn with_content(content: &str) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_raw(content)?;
        Ok(temp_file)
    }

    /// Path inside the temp dir that does not exist yet
    pub fn missing() -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        std::fs::remove_file(&temp_file.path)?;
        Ok(temp_file)
    }

    /// Append bytes verbatim, no terminator added
    pub fn append_raw(&self, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Append content followed by a newline
    pub fn append_line(&self, content: &str) -> std::io::Result<()> {
        self.append_raw(&format!("{}\n", content))
    }

    /// Truncate the file in place (simulate copytruncate rotation)
    pub fn truncate(&self) -> std::io::Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    /// Delete the file and recreate it with `content` (simulate rename rotation)
    pub fn replace_with(&self, content: &str) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)?;
        std::fs::write(&self.path, content)
    }

    pub fn remove(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Line(Line),
    Stopped,
}

/// Sink that records every call; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<Line> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::Line(line) => Some(line),
                RecordedEvent::Stopped => None,
            })
            .collect()
    }

    pub fn line_texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.text).collect()
    }

    pub fn stop_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == RecordedEvent::Stopped)
            .count()
    }
}

impl Sink for RecordingSink {
    fn deliver(&mut self, line: &str, offset: u64) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Line(Line::new(line, offset)));
        Ok(())
    }

    fn on_stop(&mut self) -> Result<()> {
        self.events.lock().unwrap().push(RecordedEvent::Stopped);
        Ok(())
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
    }

    #[tokio::test]
    async fn test_temp_log_file_with_content() {
        let temp_file = TempLogFile::with_content("test line").unwrap();

        let file_content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(file_content, "test line");
    }

    #[tokio::test]
    async fn test_append_line_and_raw() {
        let temp_file = TempLogFile::new().unwrap();
        temp_file.append_line("line 1").unwrap();
        temp_file.append_raw("par").unwrap();
        temp_file.append_raw("tial").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "line 1\npartial");
    }

    #[tokio::test]
    async fn test_truncate() {
        let temp_file = TempLogFile::with_content("initial content\n").unwrap();
        temp_file.truncate().unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_replace_with_and_missing() {
        let temp_file = TempLogFile::with_content("old old old\n").unwrap();
        temp_file.replace_with("new\n").unwrap();
        assert_eq!(std::fs::read_to_string(temp_file.path()).unwrap(), "new\n");

        let missing = TempLogFile::missing().unwrap();
        assert!(!missing.path().exists());
    }

    #[test]
    fn test_recording_sink_shares_log_between_clones() {
        let recorder = RecordingSink::new();
        let mut clone = recorder.clone();

        clone.deliver("a", 2).unwrap();
        clone.on_stop().unwrap();

        assert_eq!(recorder.line_texts(), vec!["a"]);
        assert_eq!(recorder.stop_count(), 1);
    }
}
