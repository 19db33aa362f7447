use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::models::{ExportArtifact, SubtitleFile};

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a subtitle file into memory, keeping its file name for the upload
    pub fn read_subtitle_file<P: AsRef<Path>>(path: P) -> Result<SubtitleFile> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }

        let content = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Input path has no file name: {:?}", path))?;

        Ok(SubtitleFile::new(name, content))
    }

    // @generates: Output path for an exported deck
    pub fn artifact_path<P: AsRef<Path>>(output_dir: P, artifact: &ExportArtifact) -> PathBuf {
        output_dir.as_ref().join(&artifact.file_name)
    }

    /// Write an exported deck into `output_dir`
    ///
    /// Refuses to replace an existing file unless `force_overwrite` is set.
    pub fn write_artifact<P: AsRef<Path>>(
        output_dir: P,
        artifact: &ExportArtifact,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        Self::ensure_dir(output_dir)?;

        let path = Self::artifact_path(output_dir, artifact);
        if path.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?}. Use -f to force overwrite.",
                path
            ));
        }

        fs::write(&path, &artifact.content)
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(path)
    }
}
