use std::env::VarError;
use std::path::PathBuf;

use crate::MetaResult;

/// Process-level settings the orchestrator falls back on when a store does not define them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Search path used when the store has no `BBPATH`.
    pub bbpath: Option<String>,
    /// `TOPDIR` to use instead of the current directory.
    pub topdir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `BBPATH` from the environment.
    pub fn from_env() -> MetaResult<Self> {
        let bbpath = match std::env::var("BBPATH") {
            Ok(val) => Some(val),
            Err(VarError::NotPresent) => None,
            Err(other_err) => return Err(other_err.into()),
        };

        Ok(Self {
            bbpath,
            topdir: None,
        })
    }

    pub fn with_bbpath<S: Into<String>>(mut self, bbpath: S) -> Self {
        self.bbpath = Some(bbpath.into());
        self
    }

    pub fn with_topdir<P: Into<PathBuf>>(mut self, topdir: P) -> Self {
        self.topdir = Some(topdir.into());
        self
    }

    /// `TOPDIR` for a store that lacks one: the configured directory, else the current directory.
    pub fn resolve_topdir(&self) -> MetaResult<PathBuf> {
        match &self.topdir {
            Some(topdir) => Ok(topdir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}
