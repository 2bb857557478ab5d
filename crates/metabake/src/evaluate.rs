use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, trace};

use metabake_datasmart::DataSmart;
use metabake_syntax::{
    AddHandler, AddTask, Assignment, AssignmentOperator, Export, ExportFunctions, FlagAssignment,
    FunctionDef, Include, Inherit, PythonDef, Statement, StatementGroup,
};

use crate::build;
use crate::errors::MetadataError;
use crate::event;
use crate::export_functions::export_functions;
use crate::parse::MetadataParser;
use crate::MetaResult;

/// An anonymous function body queued for execution at finalization, with the flags it had when it
/// was defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousFunction {
    pub body: String,
    pub flags: BTreeMap<String, String>,
}

/// State that lives for one top-level `handle` call and is shared by every file it pulls in.
pub struct EvalContext<'a> {
    pub(crate) parser: &'a MetadataParser,
    pub(crate) data: &'a DataSmart,
    pub(crate) class_stack: Vec<String>,
    pub(crate) anon_queue: Vec<AnonymousFunction>,
    pub(crate) file: Option<PathBuf>,
    pub(crate) root: String,
}

impl<'a> EvalContext<'a> {
    pub fn new(parser: &'a MetadataParser, data: &'a DataSmart) -> Self {
        Self {
            parser,
            data,
            class_stack: Vec::new(),
            anon_queue: Vec::new(),
            file: None,
            root: String::new(),
        }
    }

    pub fn data(&self) -> &DataSmart {
        self.data
    }

    /// Classes currently being inherited, innermost last.
    pub fn class_stack(&self) -> &[String] {
        &self.class_stack
    }

    pub fn anon_queue(&self) -> &[AnonymousFunction] {
        &self.anon_queue
    }

    /// The file whose statements are being evaluated.
    pub fn current_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Basename of the current file without its extension.
    pub fn root(&self) -> &str {
        &self.root
    }
}

pub trait Evaluate {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()>;
}

impl Evaluate for StatementGroup {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        for located in self {
            located.statement.evaluate(ctx).with_context(|| {
                format!(
                    "failure evaluating statement at {}:{}",
                    self.source_name, located.line
                )
            })?;
        }
        Ok(())
    }
}

impl Evaluate for Statement {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        match self {
            Statement::Assignment(a) => a.evaluate(ctx),
            Statement::FlagAssignment(f) => f.evaluate(ctx),
            Statement::Export(e) => e.evaluate(ctx),
            Statement::FunctionDef(f) => f.evaluate(ctx),
            Statement::PythonDef(p) => p.evaluate(ctx),
            Statement::Include(i) => i.evaluate(ctx),
            Statement::Inherit(i) => i.evaluate(ctx),
            Statement::AddTask(t) => t.evaluate(ctx),
            Statement::ExportFunctions(e) => e.evaluate(ctx),
            Statement::AddHandler(h) => h.evaluate(ctx),
        }
    }
}

impl Evaluate for Assignment {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        let d = ctx.data;
        let key = self.key.as_str();

        if self.exported {
            d.set_var_flag(key, "export", "1");
        }

        let current = || d.get_var(key).unwrap_or_default();
        let new_value = match self.op {
            AssignmentOperator::Equals => self.value.clone(),
            AssignmentOperator::DefaultEquals => match d.get_var(key) {
                Some(_) => return Ok(()),
                None => self.value.clone(),
            },
            AssignmentOperator::ColonEquals => {
                let scratch = d.create_copy();
                scratch.update_data()?;
                scratch
                    .expand(&self.value)
                    .with_context(|| format!("error expanding {} for {}", self.value, key))?
            }
            AssignmentOperator::PlusEquals => format!("{} {}", current(), self.value),
            AssignmentOperator::EqualsPlus => format!("{} {}", self.value, current()),
            AssignmentOperator::DotEquals => format!("{}{}", current(), self.value),
            AssignmentOperator::EqualsDot => format!("{}{}", self.value, current()),
        };

        trace!(key, op = %self.op, "assignment");
        d.set_var(key, new_value);
        Ok(())
    }
}

impl Evaluate for FlagAssignment {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        ctx.data.set_var_flag(&self.key, &self.flag, self.value.as_str());
        Ok(())
    }
}

impl Evaluate for Export {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        ctx.data.set_var_flag(&self.key, "export", "1");
        Ok(())
    }
}

impl Evaluate for FunctionDef {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        let d = ctx.data;
        let name = self.name.as_str();

        for (flag, enabled) in [("python", self.python), ("fakeroot", self.fakeroot)] {
            d.del_var_flag(name, flag);
            if enabled {
                d.set_var_flag(name, flag, "1");
            }
        }

        d.set_var(name, self.body.as_str());
        d.set_var_flag(name, "func", "1");

        if self.is_anonymous() {
            ctx.anon_queue.push(AnonymousFunction {
                body: self.body.clone(),
                flags: d.get_var_flags(name),
            });
            d.del_var(name);
        }

        Ok(())
    }
}

impl Evaluate for PythonDef {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        let parser = ctx.parser;
        if parser.parsed_methods().is_parsed(&ctx.root) {
            trace!(root = ctx.root.as_str(), name = self.name.as_str(), "already registered");
            return Ok(());
        }

        let origin = ctx.file.clone().unwrap_or_default();
        parser
            .executor()
            .register_embedded_function(&ctx.root, &self.source(), &origin)
    }
}

impl Evaluate for Include {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        let parser = ctx.parser;
        let path = ctx.data.expand(&self.path)?;
        let path = path.trim();

        if path.is_empty() {
            if self.kind.is_optional() {
                return Ok(());
            }
            return Err(MetadataError::NotFound {
                file: PathBuf::from(&self.path),
                search_path: String::new(),
            }
            .into());
        }

        let resolved = match parser.resolve(Path::new(path), ctx) {
            Ok(resolved) => resolved,
            Err(err) if self.kind.is_optional() && MetadataError::is_not_found(&err) => {
                debug!("could not include {}, skipping: {:#}", path, err);
                return Ok(());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("could not require {}", path));
            }
        };

        parser
            .handle_file(&resolved, true, ctx)
            .with_context(|| format!("failure including file {:?}", resolved))?;
        Ok(())
    }
}

impl Evaluate for Inherit {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        let parser = ctx.parser;
        for class in &self.classes {
            let expanded = ctx.data.expand(class)?;
            for name in expanded.split_whitespace() {
                let file = PathBuf::from("classes").join(format!("{}.bbclass", name));
                let resolved = parser
                    .resolve(&file, ctx)
                    .with_context(|| format!("could not inherit {}", name))?;
                parser
                    .handle_file(&resolved, true, ctx)
                    .with_context(|| format!("unable to inherit {}", name))?;
            }
        }
        Ok(())
    }
}

impl Evaluate for AddTask {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        build::add_task(&self.task, &self.before, &self.after, ctx.data);
        Ok(())
    }
}

impl Evaluate for ExportFunctions {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        export_functions(&self.functions, ctx)
    }
}

impl Evaluate for AddHandler {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
        for handler in &self.handlers {
            event::add_handler(handler, ctx.data);
        }
        Ok(())
    }
}
