//! Flag-guarded dependency lists such as `pkgA nls? (gettext) !static? (libfoo-shared)`.
//!
//! [`tokenize`] turns the text into a tree of [`DepToken`]s, [`evaluate`] drops whatever the
//! active flags rule out, and [`flatten`] collapses the result to plain atoms.

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependsError {
    #[error("unmatched ')' in {0:?}")]
    UnmatchedClose(String),
    #[error("unterminated '(' in {0:?}")]
    UnclosedOpen(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepToken {
    Atom(String),
    Group(Vec<DepToken>),
}

impl DepToken {
    pub fn atom<S: Into<String>>(s: S) -> Self {
        DepToken::Atom(s.into())
    }

    /// For a guard atom (`flag?` or `!flag?`), the flag name and whether it is negated.
    fn guard(&self) -> Option<(&str, bool)> {
        let DepToken::Atom(text) = self else {
            return None;
        };
        let cond = text.strip_suffix('?')?;
        Some(match cond.strip_prefix('!') {
            Some(flag) => (flag, true),
            None => (cond, false),
        })
    }
}

impl fmt::Display for DepToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepToken::Atom(atom) => f.write_str(atom),
            DepToken::Group(tokens) => write!(f, "({})", tokens.iter().join(" ")),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<DepToken>, DependsError> {
    let mut current: Vec<DepToken> = Vec::new();
    let mut outer: Vec<Vec<DepToken>> = Vec::new();
    let mut accum = String::new();

    fn flush(accum: &mut String, into: &mut Vec<DepToken>) {
        if !accum.is_empty() {
            into.push(DepToken::Atom(std::mem::take(accum)));
        }
    }

    for c in input.chars() {
        match c {
            '(' => {
                flush(&mut accum, &mut current);
                outer.push(std::mem::take(&mut current));
            }
            ')' => {
                flush(&mut accum, &mut current);
                let Some(mut parent) = outer.pop() else {
                    return Err(DependsError::UnmatchedClose(input.to_string()));
                };
                parent.push(DepToken::Group(std::mem::take(&mut current)));
                current = parent;
            }
            c if c.is_whitespace() => flush(&mut accum, &mut current),
            c => accum.push(c),
        }
    }
    flush(&mut accum, &mut current);

    if !outer.is_empty() {
        return Err(DependsError::UnclosedOpen(input.to_string()));
    }

    Ok(current)
}

/// Apply guards against `flags`. With `all_on` every positive guard passes and every negated one
/// fails. Groups are evaluated recursively and disappear when nothing in them survives.
pub fn evaluate(tokens: &[DepToken], flags: &HashSet<String>, all_on: bool) -> Vec<DepToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        if let Some((flag, negated)) = token.guard() {
            let passes = if all_on {
                !negated
            } else {
                flags.contains(flag) != negated
            };

            match iter.next() {
                Some(guarded) if passes => keep(guarded, flags, all_on, &mut out),
                _ => {}
            }
            continue;
        }

        keep(token, flags, all_on, &mut out);
    }

    out
}

fn keep(token: &DepToken, flags: &HashSet<String>, all_on: bool, out: &mut Vec<DepToken>) {
    match token {
        DepToken::Group(tokens) => {
            let tokens = evaluate(tokens, flags, all_on);
            if !tokens.is_empty() {
                out.push(DepToken::Group(tokens));
            }
        }
        atom => out.push(atom.clone()),
    }
}

pub fn flatten(tokens: &[DepToken]) -> Vec<String> {
    let mut out = Vec::new();
    for token in tokens {
        match token {
            DepToken::Atom(atom) => out.push(atom.clone()),
            DepToken::Group(tokens) => out.extend(flatten(tokens)),
        }
    }
    out
}

/// `tokenize`, `evaluate` and `flatten` in one go.
pub fn resolve_dependencies<I, S>(
    expr: &str,
    flags: I,
    all_on: bool,
) -> Result<Vec<String>, DependsError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let flags: HashSet<String> = flags.into_iter().map(Into::into).collect();
    let tokens = tokenize(expr)?;
    Ok(flatten(&evaluate(&tokens, &flags, all_on)))
}
