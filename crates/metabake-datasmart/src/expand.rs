//! Shell-like variable expansion.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::rc::Rc;

use fxhash::FxHashMap;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug)]
pub enum ExpansionError {
    #[error("variable {0} is not defined")]
    MissingVariable(String),
    #[error("unterminated variable reference in {0:?}")]
    UnterminatedToken(String),
    #[error("failed to evaluate embedded expression {expr:?}")]
    Expression {
        expr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Where `${NAME}` references are resolved from.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<S: BuildHasher> VariableLookup for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Evaluates the body of a `${@...}` reference.
pub trait ExpressionEvaluator {
    fn evaluate(&self, expr: &str) -> anyhow::Result<String>;
}

/// Used when no interpreter is embedded; any `${@...}` reference is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExpressionEvaluator;

impl ExpressionEvaluator for NoExpressionEvaluator {
    fn evaluate(&self, expr: &str) -> anyhow::Result<String> {
        anyhow::bail!(
            "built without embedded-expression support, but attempted to evaluate: {}",
            expr
        );
    }
}

/// Memo table for inputs that contained no variable references.
///
/// Nothing is global: whoever wants process-wide sharing constructs one instance and hands the
/// same `Rc` to every [`Expander`].
#[derive(Debug, Default)]
pub struct ExpansionCache {
    entries: RefCell<FxHashMap<(String, bool), String>>,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, raw: &str, strip_newlines: bool) -> Option<String> {
        self.entries
            .borrow()
            .get(&(raw.to_string(), strip_newlines))
            .cloned()
    }

    pub fn insert(&self, raw: &str, strip_newlines: bool, expanded: String) {
        self.entries
            .borrow_mut()
            .insert((raw.to_string(), strip_newlines), expanded);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

fn control_char(c: char) -> Option<char> {
    Some(match c {
        'a' => '\x07',
        'b' => '\x08',
        'e' => '\x1b',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        _ => return None,
    })
}

fn is_upper(name: &str) -> bool {
    name.to_uppercase() == name
}

#[derive(Clone)]
pub struct Expander {
    cache: Rc<ExpansionCache>,
    evaluator: Rc<dyn ExpressionEvaluator>,
}

impl fmt::Debug for Expander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expander")
            .field("cache_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(Rc::new(NoExpressionEvaluator))
    }
}

impl Expander {
    pub fn new(evaluator: Rc<dyn ExpressionEvaluator>) -> Self {
        Self::with_cache(evaluator, Rc::new(ExpansionCache::new()))
    }

    pub fn with_cache(evaluator: Rc<dyn ExpressionEvaluator>, cache: Rc<ExpansionCache>) -> Self {
        Self { cache, evaluator }
    }

    pub fn cache(&self) -> &Rc<ExpansionCache> {
        &self.cache
    }

    /// Expand `raw` in a single left-to-right pass.
    ///
    /// Quotes are consumed: `'...'` passes its contents through untouched, `"..."` only groups.
    /// A quote of the other kind inside a quoted run is literal. Outside single quotes a backslash
    /// escapes the next character (`\n`, `\t` and friends become control characters, anything else
    /// is kept without the backslash), and `$` starts a reference:
    ///
    /// - `${NAME}` ends at the next `}`, bare `$NAME` ends at (and swallows) the next whitespace
    /// - `${@expr}` is handed to the [`ExpressionEvaluator`]
    /// - names that are not all upper case are re-emitted as `${name}`
    /// - a missing upper-case name is [`ExpansionError::MissingVariable`]
    ///
    /// An empty or unterminated reference fails the whole expansion with
    /// [`ExpansionError::UnterminatedToken`].
    pub fn expand(
        &self,
        raw: &str,
        vars: &dyn VariableLookup,
        strip_newlines: bool,
    ) -> Result<String, ExpansionError> {
        if let Some(hit) = self.cache.get(raw, strip_newlines) {
            return Ok(hit);
        }

        let chars: Vec<char> = raw.chars().collect();
        let len = chars.len();
        let unterminated = || ExpansionError::UnterminatedToken(raw.to_string());

        let mut out = String::with_capacity(raw.len());
        let mut in_single = false;
        let mut in_double = false;
        let mut references = 0;
        let mut pos = 0;

        while pos < len {
            let c = chars[pos];
            let escaped = pos > 0 && chars[pos - 1] == '\\';

            if c == '\'' && !escaped {
                if in_double {
                    out.push(c);
                } else {
                    in_single = !in_single;
                }
                pos += 1;
                continue;
            }

            if c == '"' && !escaped {
                if in_single {
                    out.push(c);
                } else {
                    in_double = !in_double;
                }
                pos += 1;
                continue;
            }

            if in_single {
                out.push(c);
                pos += 1;
                continue;
            }

            match c {
                '\n' if strip_newlines => {
                    out.push(' ');
                    pos += 1;
                }
                '\\' => {
                    let Some(&next) = chars.get(pos + 1) else {
                        out.push('\\');
                        break;
                    };
                    out.push(control_char(next).unwrap_or(next));
                    pos += 2;
                }
                '$' if !escaped => {
                    let mut p = pos + 1;
                    if p + 1 >= len {
                        return Err(unterminated());
                    }

                    let braced = chars[p] == '{';
                    if braced {
                        p += 1;
                    }
                    let is_terminator = |c: char| {
                        if braced {
                            c == '}'
                        } else {
                            c.is_whitespace()
                        }
                    };

                    let start = p;
                    while !is_terminator(chars[p]) {
                        if p + 1 >= len {
                            return Err(unterminated());
                        }
                        p += 1;
                    }

                    let name: String = chars[start..p].iter().collect();
                    pos = p + 1;
                    if name.is_empty() {
                        return Err(unterminated());
                    }
                    references += 1;

                    if let Some(expr) = name.strip_prefix('@') {
                        let value = self.evaluator.evaluate(expr).map_err(|e| {
                            ExpansionError::Expression {
                                expr: expr.to_string(),
                                source: e.into(),
                            }
                        })?;
                        out.push_str(&value);
                    } else if !is_upper(&name) {
                        out.push_str("${");
                        out.push_str(&name);
                        out.push('}');
                    } else {
                        match vars.lookup(&name) {
                            Some(value) => out.push_str(&value),
                            None => return Err(ExpansionError::MissingVariable(name)),
                        }
                    }
                }
                _ => {
                    out.push(c);
                    pos += 1;
                }
            }
        }

        if references == 0 {
            trace!(raw, "caching literal expansion");
            self.cache.insert(raw, strip_newlines, out.clone());
        }

        Ok(out)
    }
}
