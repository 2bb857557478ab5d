use metabake_lexer::{is_space_or_tab, tokenize_line, LexedToken, TokenKind};

use crate::ast::{
    AddHandler, AddTask, Assignment, AssignmentOperator, Export, ExportFunctions, FlagAssignment,
    FunctionDef, Include, IncludeKind, Inherit, LocatedStatement, PythonDef, Statement,
    StatementGroup, ANONYMOUS_FUNCTION,
};
use crate::parser::{ParseError, ParseErrorKind, ParserMode, ParserResult};

/// Parse the text of one file into its statements.
///
/// `source_name` only shows up in error messages.
pub fn parse_bitbake_from_str(
    input: &str,
    mode: ParserMode,
    source_name: &str,
) -> ParserResult<StatementGroup> {
    let mut parser = Parser {
        lines: input.lines().collect(),
        pos: 0,
        mode,
        source_name,
    };

    let mut statements = vec![];
    while let Some(statement) = parser.next_statement()? {
        statements.push(statement);
    }

    Ok(StatementGroup {
        source_name: source_name.to_string(),
        statements,
    })
}

fn assignment_operator(kind: TokenKind) -> Option<AssignmentOperator> {
    Some(match kind {
        TokenKind::Equals => AssignmentOperator::Equals,
        TokenKind::DefaultEquals => AssignmentOperator::DefaultEquals,
        TokenKind::ColonEquals => AssignmentOperator::ColonEquals,
        TokenKind::PlusEquals => AssignmentOperator::PlusEquals,
        TokenKind::EqualsPlus => AssignmentOperator::EqualsPlus,
        TokenKind::DotEquals => AssignmentOperator::DotEquals,
        TokenKind::EqualsDot => AssignmentOperator::EqualsDot,
        _ => return None,
    })
}

/// Whitespace separated directive arguments, up to an optional trailing comment.
fn directive_names(args: &str) -> Vec<String> {
    args.replace("\\\n", " ")
        .split_whitespace()
        .take_while(|w| !w.starts_with('#'))
        .map(String::from)
        .collect()
}

fn is_function_end(line: &str) -> bool {
    line.strip_prefix('}')
        .map(|rest| rest.trim().is_empty())
        .unwrap_or(false)
}

#[derive(Clone, Copy)]
enum TaskRelation {
    None,
    Before,
    After,
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    mode: ParserMode,
    source_name: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            source_name: self.source_name.to_string(),
            line,
            text: self
                .lines
                .get(line - 1)
                .map(|l| l.to_string())
                .unwrap_or_default(),
            kind,
        }
    }

    fn unrecognized(&self, line: usize) -> ParseError {
        self.error(line, ParseErrorKind::UnrecognizedStatement)
    }

    fn require_recipe_mode(&self, line: usize, what: &str) -> ParserResult<()> {
        if self.mode.is_conf() {
            return Err(self.error(
                line,
                ParseErrorKind::RecipeOnlyStatement(what.to_string()),
            ));
        }
        Ok(())
    }

    fn next_statement(&mut self) -> ParserResult<Option<LocatedStatement>> {
        while self.pos < self.lines.len() {
            let line = self.pos + 1;
            let head = self.lines[self.pos].trim_start_matches(is_space_or_tab);
            if head.trim_end().is_empty() || head.starts_with('#') {
                self.pos += 1;
                continue;
            }

            let logical = self.logical_line();
            let statement =
                self.parse_statement(line, logical.trim_start_matches(is_space_or_tab))?;
            return Ok(Some(LocatedStatement { line, statement }));
        }

        Ok(None)
    }

    /// Consume the current physical line plus any lines it continues onto with a trailing `\`.
    /// The `\` + newline pairs are kept; callers decide what they mean.
    fn logical_line(&mut self) -> String {
        let mut text = self.lines[self.pos].to_string();
        self.pos += 1;

        while text.ends_with('\\') && self.pos < self.lines.len() {
            text.push('\n');
            text.push_str(self.lines[self.pos]);
            self.pos += 1;
        }

        text
    }

    fn parse_statement(&mut self, line: usize, text: &str) -> ParserResult<Statement> {
        let sig: Vec<LexedToken> = tokenize_line(text)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .collect();

        let Some(first) = sig.first().copied() else {
            return Err(self.unrecognized(line));
        };

        if first.kind.is_name() {
            match sig.get(1) {
                Some(op) if op.kind.is_assignment_operator() => {
                    return self.assignment(line, text, false, first, *op);
                }
                Some(flag) if flag.kind == TokenKind::Varflag => {
                    return self.flag_assignment(line, text, first, &sig[1..]);
                }
                _ => {}
            }
        }

        match first.kind {
            TokenKind::Export => self.export(line, text, &sig),
            TokenKind::Include | TokenKind::Require => {
                let kind = if first.kind == TokenKind::Include {
                    IncludeKind::Include
                } else {
                    IncludeKind::Require
                };
                Ok(Statement::Include(Include {
                    kind,
                    path: text[first.end()..].replace("\\\n", " ").trim().to_string(),
                }))
            }
            TokenKind::Inherit => {
                self.require_recipe_mode(line, first.text)?;
                let classes = self.names_for(line, first, text)?;
                Ok(Statement::Inherit(Inherit { classes }))
            }
            TokenKind::AddTask => {
                self.require_recipe_mode(line, first.text)?;
                self.add_task(line, &text[first.end()..])
            }
            TokenKind::AddHandler => {
                self.require_recipe_mode(line, first.text)?;
                let handlers = self.names_for(line, first, text)?;
                Ok(Statement::AddHandler(AddHandler { handlers }))
            }
            TokenKind::ExportFunctions => {
                self.require_recipe_mode(line, first.text)?;
                let functions = self.names_for(line, first, text)?;
                Ok(Statement::ExportFunctions(ExportFunctions { functions }))
            }
            TokenKind::PythonDefKeyword => self.python_def(line, text, &sig),
            TokenKind::Python
            | TokenKind::Fakeroot
            | TokenKind::Identifier
            | TokenKind::OpenParenthesis => self.function_def(line, &sig),
            _ => Err(self.unrecognized(line)),
        }
    }

    fn names_for(
        &self,
        line: usize,
        keyword: LexedToken,
        text: &str,
    ) -> ParserResult<Vec<String>> {
        let names = directive_names(&text[keyword.end()..]);
        if names.is_empty() {
            return Err(self.error(
                line,
                ParseErrorKind::MissingArguments(keyword.text.to_string()),
            ));
        }
        Ok(names)
    }

    /// Slice out an assignment value. A quoted value that is still open at the end of the logical
    /// line keeps taking physical lines, newlines included, until one closes the quote.
    fn value(&mut self, line: usize, raw: &str) -> ParserResult<String> {
        let mut raw = raw.trim_start_matches(is_space_or_tab).trim_end().to_string();
        let opening = raw.chars().next();

        let inner = match opening {
            Some(quote @ ('"' | '\'')) => {
                loop {
                    let closed = raw.trim_end_matches(is_space_or_tab);
                    if closed.len() >= 2 && closed.ends_with(quote) {
                        let end = closed.len();
                        raw.truncate(end);
                        break;
                    }

                    let Some(next) = self.lines.get(self.pos) else {
                        return Err(self.error(line, ParseErrorKind::UnterminatedQuotedValue));
                    };
                    self.pos += 1;
                    raw.push('\n');
                    raw.push_str(next);
                }
                &raw[1..raw.len() - 1]
            }
            _ => raw.as_str(),
        };

        Ok(inner.replace("\\\n", ""))
    }

    fn assignment(
        &mut self,
        line: usize,
        text: &str,
        exported: bool,
        key: LexedToken,
        op: LexedToken,
    ) -> ParserResult<Statement> {
        let Some(operator) = assignment_operator(op.kind) else {
            return Err(self.unrecognized(line));
        };

        Ok(Statement::Assignment(Assignment {
            exported,
            key: key.text.to_string(),
            op: operator,
            value: self.value(line, &text[op.end()..])?,
        }))
    }

    fn flag_assignment(
        &mut self,
        line: usize,
        text: &str,
        key: LexedToken,
        rest: &[LexedToken],
    ) -> ParserResult<Statement> {
        let flag = rest[0].text;
        let flag = &flag[1..flag.len() - 1];

        match rest.get(1) {
            Some(op) if op.kind == TokenKind::Equals => {
                Ok(Statement::FlagAssignment(FlagAssignment {
                    key: key.text.to_string(),
                    flag: flag.to_string(),
                    value: self.value(line, &text[op.end()..])?,
                }))
            }
            Some(op) if op.kind.is_assignment_operator() => Err(self.error(
                line,
                ParseErrorKind::FlagOperator(op.text.to_string()),
            )),
            _ => Err(self.unrecognized(line)),
        }
    }

    fn export(&mut self, line: usize, text: &str, sig: &[LexedToken]) -> ParserResult<Statement> {
        let Some(key) = sig.get(1).filter(|t| t.kind.is_name()).copied() else {
            return Err(self.unrecognized(line));
        };

        match sig.get(2) {
            None => Ok(Statement::Export(Export {
                key: key.text.to_string(),
            })),
            Some(comment) if comment.kind == TokenKind::Comment => {
                Ok(Statement::Export(Export {
                    key: key.text.to_string(),
                }))
            }
            Some(op) if op.kind.is_assignment_operator() => {
                self.assignment(line, text, true, key, *op)
            }
            Some(_) => Err(self.unrecognized(line)),
        }
    }

    fn add_task(&self, line: usize, args: &str) -> ParserResult<Statement> {
        let mut words = directive_names(args).into_iter();

        let task = match words.next() {
            Some(task) if task != "before" && task != "after" => task,
            _ => {
                return Err(self.error(
                    line,
                    ParseErrorKind::MissingArguments("addtask".to_string()),
                ))
            }
        };

        let mut before = vec![];
        let mut after = vec![];
        let mut relation = TaskRelation::None;
        for word in words {
            match (word.as_str(), relation) {
                ("before", _) => relation = TaskRelation::Before,
                ("after", _) => relation = TaskRelation::After,
                (_, TaskRelation::Before) => before.push(word),
                (_, TaskRelation::After) => after.push(word),
                (_, TaskRelation::None) => return Err(self.unrecognized(line)),
            }
        }

        Ok(Statement::AddTask(AddTask {
            task,
            before,
            after,
        }))
    }

    fn function_def(&mut self, line: usize, sig: &[LexedToken]) -> ParserResult<Statement> {
        let mut idx = 0;
        let mut python = false;
        let mut fakeroot = false;
        while let Some(token) = sig.get(idx) {
            match token.kind {
                TokenKind::Python => python = true,
                TokenKind::Fakeroot => fakeroot = true,
                _ => break,
            }
            idx += 1;
        }

        let name = match sig.get(idx) {
            Some(token) if token.kind.is_name() => {
                idx += 1;
                token.text.to_string()
            }
            _ => ANONYMOUS_FUNCTION.to_string(),
        };

        let shape: Vec<TokenKind> = sig[idx..].iter().map(|t| t.kind).collect();
        if shape
            != [
                TokenKind::OpenParenthesis,
                TokenKind::CloseParenthesis,
                TokenKind::OpenBrace,
            ]
        {
            return Err(self.unrecognized(line));
        }

        self.require_recipe_mode(line, "function definition")?;

        let mut body = String::new();
        loop {
            let Some(text) = self.lines.get(self.pos) else {
                return Err(self.error(line, ParseErrorKind::UnterminatedFunction));
            };
            self.pos += 1;

            if is_function_end(text) {
                break;
            }
            body.push_str(text);
            body.push('\n');
        }

        Ok(Statement::FunctionDef(FunctionDef {
            name,
            python,
            fakeroot,
            body,
        }))
    }

    fn python_def(&mut self, line: usize, text: &str, sig: &[LexedToken]) -> ParserResult<Statement> {
        let Some(name) = sig.get(1).filter(|t| t.kind.is_name()).copied() else {
            return Err(self.unrecognized(line));
        };

        let args = text
            .trim_end()
            .strip_suffix(':')
            .map(str::trim_end)
            .filter(|header| header.len() >= name.end())
            .map(|header| header[name.end()..].trim_start_matches(is_space_or_tab))
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'));
        let Some(args) = args else {
            return Err(self.unrecognized(line));
        };

        self.require_recipe_mode(line, "def")?;

        let mut body = vec![];
        let mut blank_run = vec![];
        while let Some(text) = self.lines.get(self.pos) {
            if text.trim().is_empty() {
                blank_run.push(text.to_string());
            } else if text.starts_with(is_space_or_tab) {
                body.append(&mut blank_run);
                body.push(text.to_string());
            } else if !text.starts_with('#') {
                break;
            }
            self.pos += 1;
        }

        if body.is_empty() {
            return Err(self.error(line, ParseErrorKind::EmptyPythonDef));
        }

        Ok(Statement::PythonDef(PythonDef {
            name: name.text.to_string(),
            args: args.trim().to_string(),
            body,
        }))
    }
}
