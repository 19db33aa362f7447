/*!
 * Common test utilities for the persdeck test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use persdeck::pipeline::{PipelineEngine, SubtitleFile};
use persdeck::service::mock::MockDeckService;

pub const SAMPLE_SRT: &str = r#"1
00:00:01,000 --> 00:00:04,000
Hej, hur mår du?

2
00:00:05,000 --> 00:00:09,000
Det är ett hus.

3
00:00:10,000 --> 00:00:14,000
Vi ses i morgon.
"#;

/// Enable log output for a test run (RUST_LOG controls the level)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// An in-memory subtitle upload
pub fn sample_subtitle() -> SubtitleFile {
    SubtitleFile::new("S01E01.srt", SAMPLE_SRT)
}

/// A shared engine wired to a fresh mock service
pub fn mock_engine() -> (Arc<PipelineEngine>, MockDeckService) {
    init_logging();
    let mock = MockDeckService::new();
    let engine = Arc::new(PipelineEngine::new(Arc::new(mock.clone())));
    (engine, mock)
}
