#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn sheets_dir(&self) -> PathBuf {
        self.temp_dir.path().join("sheets")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.path().join("staging")
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes one exported sheet CSV under `sheets/<spreadsheet>/<sheet>.csv`.
    pub fn write_sheet(&self, spreadsheet: &str, sheet: &str, contents: &str) -> PathBuf {
        self.write(&format!("sheets/{spreadsheet}/{sheet}.csv"), contents)
    }

    /// Writes a config file wired to this workspace's directories, with the
    /// given `sources:` YAML block appended.
    pub fn write_config(&self, sources_block: &str) -> PathBuf {
        let contents = format!(
            "sheets_dir: {}\nstaging_dir: {}\nsources:\n{}",
            self.sheets_dir().display(),
            self.staging_dir().display(),
            sources_block
        );
        self.write("sheetstage.yaml", &contents)
    }
}
