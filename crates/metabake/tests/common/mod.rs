#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use metabake::{EngineConfig, FunctionExecutor, MetaResult, MetadataParser};
use metabake_datasmart::DataSmart;

/// A throwaway layer directory that doubles as `BBPATH`.
pub struct Layer {
    dir: TempDir,
}

impl Layer {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path.canonicalize().unwrap()
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_bbpath(self.path().display().to_string())
            .with_topdir(self.path())
    }

    pub fn parser(&self) -> MetadataParser {
        MetadataParser::new(self.config())
    }
}

/// Records executed function names along with `T` as seen during the call. Fails when asked to.
#[derive(Default)]
pub struct RecordingExecutor {
    pub fail: bool,
    pub calls: RefCell<Vec<(String, String, Option<String>)>>,
}

impl RecordingExecutor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

impl FunctionExecutor for RecordingExecutor {
    fn register_embedded_function(
        &self,
        _root: &str,
        _source: &str,
        _origin: &Path,
    ) -> MetaResult<()> {
        Ok(())
    }

    fn execute_named_function(&self, name: &str, d: &DataSmart) -> MetaResult<()> {
        self.calls.borrow_mut().push((
            name.to_string(),
            d.get_var(name).unwrap_or_default(),
            d.get_var("T"),
        ));
        if self.fail {
            anyhow::bail!("boom");
        }
        Ok(())
    }
}
