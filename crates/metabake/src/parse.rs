//! The file and class orchestrator.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use tracing::debug;

use metabake_datasmart::DataSmart;
use metabake_syntax::{parse_bitbake_from_str, ParserMode, StatementGroup};
use metabake_util::words::append_unique;

use crate::build::{TaskEngine, TaskList, TaskQueue};
use crate::config::EngineConfig;
use crate::errors::MetadataError;
use crate::evaluate::{AnonymousFunction, EvalContext, Evaluate};
use crate::event::{EventHandlers, EventRegistry};
use crate::finalize::finalize;
use crate::method_pool::{FunctionExecutor, MethodPool, ParsedMethods};
use crate::utils::{BbPathResolver, FileResolver};
use crate::MetaResult;

pub const DEPENDS: &str = "__depends";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// .conf
    Conf,
    /// .bb
    Recipe,
    /// .inc
    Include,
    /// .bbclass
    Class,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str)? {
            "conf" => Some(FileKind::Conf),
            "bb" => Some(FileKind::Recipe),
            "inc" => Some(FileKind::Include),
            "bbclass" => Some(FileKind::Class),
            _ => None,
        }
    }

    pub fn parser_mode(self) -> ParserMode {
        match self {
            FileKind::Conf => ParserMode::Conf,
            _ => ParserMode::Recipe,
        }
    }

    /// Files whose `def` blocks are registered only once per root.
    fn is_shared_fragment(self) -> bool {
        matches!(self, FileKind::Include | FileKind::Class)
    }
}

/// What finalizing a top-level recipe produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeMetadata {
    pub tasks: TaskList,
    /// Handlers handed to the event registry, in registration order.
    pub handlers: Vec<String>,
}

pub fn supports<P: AsRef<Path>>(path: P) -> bool {
    FileKind::from_path(path.as_ref()).is_some()
}

/// Basename without its final extension: `classes/base.bbclass` is `base`.
pub fn file_root(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct MetadataParser {
    config: EngineConfig,
    resolver: Rc<dyn FileResolver>,
    executor: Rc<dyn FunctionExecutor>,
    events: Rc<dyn EventRegistry>,
    task_engine: Rc<dyn TaskEngine>,
    parsed_methods: ParsedMethods,
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MetadataParser {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            resolver: Rc::new(BbPathResolver),
            executor: Rc::new(MethodPool::new()),
            events: Rc::new(EventHandlers::new()),
            task_engine: Rc::new(TaskQueue::new()),
            parsed_methods: ParsedMethods::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Rc<dyn FileResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_executor(mut self, executor: Rc<dyn FunctionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_event_registry(mut self, events: Rc<dyn EventRegistry>) -> Self {
        self.events = events;
        self
    }

    pub fn with_task_engine(mut self, task_engine: Rc<dyn TaskEngine>) -> Self {
        self.task_engine = task_engine;
        self
    }

    pub fn with_parsed_methods(mut self, parsed_methods: ParsedMethods) -> Self {
        self.parsed_methods = parsed_methods;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &Rc<dyn FunctionExecutor> {
        &self.executor
    }

    pub fn events(&self) -> &Rc<dyn EventRegistry> {
        &self.events
    }

    pub fn task_engine(&self) -> &Rc<dyn TaskEngine> {
        &self.task_engine
    }

    pub fn parsed_methods(&self) -> &ParsedMethods {
        &self.parsed_methods
    }

    pub fn init(&self, d: &DataSmart) -> MetaResult<()> {
        if d.get_var("TOPDIR").map_or(true, |topdir| topdir.is_empty()) {
            let topdir = self.config.resolve_topdir()?;
            d.set_var("TOPDIR", topdir.display().to_string());
        }

        if d.get_var("BBPATH").is_none() {
            if let Some(bbpath) = &self.config.bbpath {
                d.set_var("BBPATH", bbpath.as_str());
            }
        }

        Ok(())
    }

    /// Parse and evaluate `file` into `d`. Top-level `.bb` and `.inc` files are finalized and
    /// their summary returned; configuration files and classes return `None`.
    pub fn handle<P: AsRef<Path>>(
        &self,
        file: P,
        d: &DataSmart,
    ) -> MetaResult<Option<RecipeMetadata>> {
        self.handle_with_queue(file, d, &mut Vec::new())
    }

    /// Like [`handle`](Self::handle), but `pending` anonymous functions run ahead of the file's
    /// own at finalization. Whatever is still queued afterwards (a class or configuration file
    /// never finalizes) is left in `pending` for the next file parsed on top of `d`.
    pub fn handle_with_queue<P: AsRef<Path>>(
        &self,
        file: P,
        d: &DataSmart,
        pending: &mut Vec<AnonymousFunction>,
    ) -> MetaResult<Option<RecipeMetadata>> {
        let mut ctx = EvalContext::new(self, d);
        ctx.anon_queue = std::mem::take(pending);
        let result = self.handle_file(file.as_ref(), false, &mut ctx);
        *pending = std::mem::take(&mut ctx.anon_queue);
        result
    }

    pub(crate) fn resolve(&self, file: &Path, ctx: &EvalContext<'_>) -> MetaResult<PathBuf> {
        let including_dir = ctx.file.as_deref().and_then(Path::parent);
        self.resolver.resolve(file, including_dir, ctx.data)
    }

    pub(crate) fn handle_file(
        &self,
        file: &Path,
        include: bool,
        ctx: &mut EvalContext<'_>,
    ) -> MetaResult<Option<RecipeMetadata>> {
        let d = ctx.data;
        self.init(d)?;

        let kind = FileKind::from_path(file)
            .ok_or_else(|| MetadataError::UnsupportedFile(file.to_path_buf()))?;
        let path = self.resolve(file, ctx)?;
        let contents = fs::read_to_string(&path).map_err(|source| MetadataError::Read {
            path: path.clone(),
            source,
        })?;

        if include {
            mark_dependency(d, &path);
        }

        let root = file_root(&path);
        debug!(file = %path.display(), include, ?kind, "handling");

        let statements =
            parse_bitbake_from_str(&contents, kind.parser_mode(), &path.display().to_string())?;

        let old_file = if include { d.get_var("FILE") } else { None };
        if kind != FileKind::Class {
            d.set_var("FILE", path.display().to_string());
        }

        let outer_file = ctx.file.replace(path.clone());
        let outer_root = std::mem::replace(&mut ctx.root, root.clone());
        let result = self.evaluate_file(&statements, kind, ctx);
        ctx.file = outer_file;
        ctx.root = outer_root;
        result.with_context(|| format!("failure to evaluate metadata for {:?}", path))?;

        if let Some(old_file) = old_file {
            d.set_var("FILE", old_file);
        }

        if kind.is_shared_fragment() {
            self.parsed_methods.mark_parsed(&root);
        }

        if include || matches!(kind, FileKind::Conf | FileKind::Class) {
            return Ok(None);
        }

        finalize(ctx, &path)
            .with_context(|| format!("failure to finalize {:?}", path))
            .map(Some)
    }

    fn evaluate_file(
        &self,
        statements: &StatementGroup,
        kind: FileKind,
        ctx: &mut EvalContext<'_>,
    ) -> MetaResult<()> {
        if kind != FileKind::Class {
            return statements.evaluate(ctx);
        }

        ctx.class_stack.push(ctx.root.clone());
        let mut ctx = scopeguard::guard(ctx, |ctx| {
            ctx.class_stack.pop();
        });
        statements.evaluate(&mut **ctx)
    }
}

fn mark_dependency(d: &DataSmart, path: &Path) {
    if let Some(depends) = append_unique(d.get_var(DEPENDS).as_deref(), &path.display().to_string())
    {
        d.set_var(DEPENDS, depends);
    }
}
