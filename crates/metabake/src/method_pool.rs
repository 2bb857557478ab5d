use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use metabake_datasmart::DataSmart;

use crate::MetaResult;

/// Runs the function bodies metadata defines.
pub trait FunctionExecutor {
    /// Called once per root for every `def` block of an included or inherited file.
    fn register_embedded_function(&self, root: &str, source: &str, origin: &Path)
        -> MetaResult<()>;

    fn execute_named_function(&self, name: &str, d: &DataSmart) -> MetaResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFunction {
    pub source: String,
    pub origin: PathBuf,
}

/// Records registered `def` blocks and requested executions. No interpreter is embedded, so
/// executing a function only logs and records the call.
#[derive(Debug, Default)]
pub struct MethodPool {
    functions: RefCell<IndexMap<String, Vec<EmbeddedFunction>>>,
    executed: RefCell<Vec<String>>,
}

impl MethodPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self, root: &str) -> Vec<EmbeddedFunction> {
        self.functions
            .borrow()
            .get(root)
            .cloned()
            .unwrap_or_default()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

impl FunctionExecutor for MethodPool {
    fn register_embedded_function(
        &self,
        root: &str,
        source: &str,
        origin: &Path,
    ) -> MetaResult<()> {
        debug!(root, ?origin, "registering embedded function");
        self.functions
            .borrow_mut()
            .entry(root.to_string())
            .or_default()
            .push(EmbeddedFunction {
                source: source.to_string(),
                origin: origin.to_path_buf(),
            });
        Ok(())
    }

    fn execute_named_function(&self, name: &str, d: &DataSmart) -> MetaResult<()> {
        debug!(
            name,
            python = d.is_flag_set(name, "python"),
            "no interpreter available, recording call"
        );
        self.executed.borrow_mut().push(name.to_string());
        Ok(())
    }
}

/// Roots whose embedded functions were already registered. Shared between clones.
#[derive(Debug, Clone, Default)]
pub struct ParsedMethods {
    roots: Rc<RefCell<HashSet<String>>>,
}

impl ParsedMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_parsed(&self, root: &str) -> bool {
        self.roots.borrow().contains(root)
    }

    pub fn mark_parsed(&self, root: &str) {
        self.roots.borrow_mut().insert(root.to_string());
    }
}
