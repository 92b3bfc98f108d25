use crate::ast::*;
use crate::context::{split_lines, LoadedObject, ParseContext};
use crate::diagnostics::{DiagnosticEvent, Severity};
use crate::error::{ConError, ParseError, ScriptError};
use crate::lexer::{Token, TokenKind};
use crate::scope::{Attachment, MissingObjectPolicy, Registration};
use crate::utils::{line_span, named_source, normalize_path};
use crate::value::unquote;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};

/// What to do with `include` and `run` directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// Record the statement without loading the target.
    Skip,
    /// Parse the target into the including file's scope.
    #[default]
    ExecuteInScope,
    /// Parse the target into a child scope that asks its parent for
    /// missing objects.
    ExecuteInNewScope(Attachment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub execution: Execution,
    /// Child scopes created for includes register their objects with the
    /// parent too.
    pub propagate_includes: bool,
    /// Policy of the scope created for the file being loaded.
    pub root_policy: MissingObjectPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            execution: Execution::ExecuteInScope,
            propagate_includes: false,
            root_policy: MissingObjectPolicy::ThrowError,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    #[must_use]
    pub fn with_propagation(mut self, propagate: bool) -> Self {
        self.propagate_includes = propagate;
        self
    }

    #[must_use]
    pub fn with_root_policy(mut self, policy: MissingObjectPolicy) -> Self {
        self.root_policy = policy;
        self
    }
}

/// Loads `path` through the context's line source into a new root scope.
///
/// # Errors
/// Returns the first fatal error. It has already been reported to the
/// context's diagnostics sink, and everything parsed before it stays in
/// `ws`.
pub fn parse_file(
    ctx: &ParseContext,
    ws: &mut Workspace,
    path: &Path,
    options: ParseOptions,
) -> Result<FileId, ConError> {
    let path = normalize_path(path);
    let lines = ctx.line_source().read_lines(&path).map_err(|err| {
        let error = ScriptError::SourceUnavailable {
            path: path.display().to_string(),
            reason: err.to_string(),
        };
        let mut event = DiagnosticEvent::new(Severity::Error, error.to_string());
        event.file = Some(path.clone());
        ctx.report(event);
        ConError::Script(error)
    })?;
    parse_lines(ctx, ws, path, lines, options)
}

/// Parses in-memory script text. `name` stands in for the file path, and
/// includes resolve relative to it.
pub fn parse_source(
    ctx: &ParseContext,
    ws: &mut Workspace,
    name: &str,
    source: &str,
    options: ParseOptions,
) -> Result<FileId, ConError> {
    parse_lines(ctx, ws, normalize_path(Path::new(name)), split_lines(source), options)
}

fn parse_lines(
    ctx: &ParseContext,
    ws: &mut Workspace,
    path: PathBuf,
    lines: Vec<String>,
    options: ParseOptions,
) -> Result<FileId, ConError> {
    let first_file = ws.files.len();
    let scope = ws.new_scope(options.root_policy);
    let file = Parser::new(ctx, ws, options).parse_lines(path, lines, scope, None)?;
    record_loaded(ctx, ws, first_file);
    Ok(file)
}

// Files from `first_file` on were added by the load that just succeeded.
fn record_loaded(ctx: &ParseContext, ws: &Workspace, first_file: usize) {
    for source in &ws.files[first_file..] {
        for &id in &source.objects {
            let object = ws.object(id);
            let line = object.origin.map_or(0, |o| o.line);
            let replaced = ctx.loaded_objects().record(LoadedObject {
                reference_type: object.reference_type.clone(),
                name: object.name.clone(),
                schema: object.schema.name.clone(),
                path: source.path.clone(),
                line,
            });
            if let Some(previous) = replaced {
                ctx.report_at(
                    Severity::Warning,
                    format!(
                        "{} '{}' replaces the one loaded from {}:{}",
                        object.reference_type,
                        object.name,
                        previous.path.display(),
                        previous.line
                    ),
                    &source.path,
                    line,
                );
            }
        }
    }
}

impl Workspace {
    /// Runs one command against `file` as if it were appended to it. The
    /// command is tokenized without the catch-all rule, so text no rule
    /// recognizes is a [`crate::error::TokenizeError`].
    pub fn execute(
        &mut self,
        ctx: &ParseContext,
        file: FileId,
        command: &str,
        options: ParseOptions,
    ) -> Result<(), ConError> {
        let classified = ctx.tokenizer().tokenize_line(command)?;
        let source = self.file_mut(file);
        source.lines.push(command.to_string());
        let token = Token::new(classified.kind, Some(file), source.lines.len(), command);
        let path = source.path.clone();

        let mut parser = Parser::new(ctx, self, options);
        parser.include_stack.push(path);
        let tokens = [token];
        let result = parser.process(file, &tokens);
        let [token] = tokens;
        self.file_mut(file).tokens.push(token);
        result
    }
}

/// Two-phase walk over one file's tokens, recursing into included files.
pub(crate) struct Parser<'a> {
    ctx: &'a ParseContext,
    ws: &'a mut Workspace,
    options: ParseOptions,
    include_stack: Vec<PathBuf>,
}

/// Comment lines waiting for the entry they describe.
#[derive(Default)]
struct PendingComment {
    line: usize,
    lines: Vec<String>,
}

impl PendingComment {
    fn push(&mut self, line: usize, text: String) {
        if self.lines.is_empty() {
            self.line = line;
        }
        self.lines.push(text);
    }

    fn take(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.lines).join("\n"))
    }
}

impl<'a> Parser<'a> {
    pub(crate) fn new(ctx: &'a ParseContext, ws: &'a mut Workspace, options: ParseOptions) -> Self {
        Parser {
            ctx,
            ws,
            options,
            include_stack: Vec::new(),
        }
    }

    pub(crate) fn parse_lines(
        &mut self,
        path: PathBuf,
        lines: Vec<String>,
        scope: ScopeId,
        parent: Option<FileId>,
    ) -> Result<FileId, ConError> {
        log::debug!("parsing {}", path.display());
        let file = self.ws.add_file(path.clone(), lines, scope);
        self.ws.file_mut(file).parent = parent;
        let tokens = self.ctx.tokenizer().tokenize(Some(file), &self.ws.file(file).lines);

        self.include_stack.push(path);
        let result = self.process(file, &tokens);
        self.include_stack.pop();
        self.ws.file_mut(file).tokens = tokens;
        result?;

        let source = self.ws.file(file);
        log::debug!(
            "finished {}: {} objects, {} entries",
            source.display_name(),
            source.objects.len(),
            source.entries.len()
        );
        Ok(file)
    }

    fn process(&mut self, file: FileId, tokens: &[Token]) -> Result<(), ConError> {
        self.register_objects(file, tokens)?;
        self.dispatch(file, tokens)
    }

    /// Builds a located error and reports it. Called once, in the file
    /// where the error happened; callers further up pass it through.
    fn fail(&self, file: FileId, line: usize, kind: ScriptError) -> ConError {
        let source = self.ws.file(file);
        let name = source.display_name();
        self.ctx
            .report_at(Severity::Error, kind.to_string(), &source.path, line);
        ConError::Parse(ParseError {
            file: name.clone(),
            line,
            src: named_source(&name, &source.lines),
            span: line_span(&source.lines, line),
            kind,
        })
    }

    fn warn(&self, file: FileId, line: usize, message: String) {
        let path = &self.ws.file(file).path;
        self.ctx.report_at(Severity::Warning, message, path, line);
    }

    // == Phase 1 ==

    /// Creates every object the file declares before any other line runs,
    /// so lines above a `.create` can already refer to its object.
    fn register_objects(&mut self, file: FileId, tokens: &[Token]) -> Result<(), ConError> {
        let ctx = self.ctx;
        let scope = self.ws.file(file).scope;
        let mut index = 0;
        while let Some(token) = tokens.get(index) {
            index += 1;
            if token.kind.closer().is_some() {
                // Block bodies are inert. An unterminated block is reported
                // by phase 2.
                match scan_block(tokens, index - 1) {
                    Ok((_, next)) => index = next,
                    Err(_) => break,
                }
                continue;
            }
            if token.kind != TokenKind::ObjectStart {
                continue;
            }
            let origin = Origin {
                file,
                line: token.line,
            };
            let object = ctx
                .registry()
                .create(token.reference(), token.arguments(), Some(origin))
                .map_err(|e| self.fail(file, token.line, e))?;
            let (name, reference_type) = (object.name.clone(), object.reference_type.clone());
            match self.ws.register_object(scope, object) {
                Registration::Added(id) => {
                    log::trace!("registered {reference_type} '{name}' at line {}", token.line);
                    self.ws.file_mut(file).objects.push(id);
                }
                Registration::Duplicate(_) => self.warn(
                    file,
                    token.line,
                    format!("Duplicate object '{name}' of reference type '{reference_type}', keeping the first instance"),
                ),
            }
        }
        Ok(())
    }

    // == Phase 2 ==

    fn dispatch(&mut self, file: FileId, tokens: &[Token]) -> Result<(), ConError> {
        let mut pending = PendingComment::default();
        let mut index = 0;
        while let Some(token) = tokens.get(index) {
            index += 1;
            let line = token.line;
            match token.kind {
                TokenKind::Comment => pending.push(line, token.comment_text()),
                TokenKind::None if token.is_blank() => self.flush_comment(file, &mut pending),
                TokenKind::None
                | TokenKind::RemBlockEnd
                | TokenKind::EndIf
                | TokenKind::Else
                | TokenKind::ElseIf => {
                    return Err(self.fail(
                        file,
                        line,
                        ScriptError::UnrecognizedLine {
                            text: token.text.trim().to_string(),
                        },
                    ));
                }
                TokenKind::RemBlockStart | TokenKind::IfStart => {
                    let (block, next) = scan_block(tokens, index - 1).map_err(|e| self.fail(file, line, e))?;
                    index = next;
                    self.push_entry(file, EntryKind::Block(block), line, pending.take());
                }
                TokenKind::ObjectStart => {
                    let kind = self.activate_created(file, token).map_err(|e| self.fail(file, line, e))?;
                    self.push_entry(file, kind, line, pending.take());
                }
                TokenKind::ActiveSwitch => {
                    let object = self.switch_active(file, token).map_err(|e| self.fail(file, line, e))?;
                    let kind = EntryKind::ActiveSwitch {
                        object,
                        text: token.text.trim().to_string(),
                    };
                    self.push_entry(file, kind, line, pending.take());
                }
                TokenKind::Property => {
                    let comment = pending.take();
                    let object = self
                        .assign(file, token, comment)
                        .map_err(|e| self.fail(file, line, e))?;
                    if !self.is_anchored(file, object) {
                        let kind = EntryKind::Continuation {
                            object,
                            reference: token.reference().to_string(),
                        };
                        self.push_entry(file, kind, line, None);
                    }
                }
                TokenKind::Variable | TokenKind::Constant => {
                    let expression = self.declare(file, token).map_err(|e| self.fail(file, line, e))?;
                    self.push_entry(file, EntryKind::Expression(expression), line, pending.take());
                }
                TokenKind::Include | TokenKind::Run => {
                    let comment = pending.take();
                    self.statement(file, token, comment)?;
                }
            }
        }
        self.flush_comment(file, &mut pending);
        Ok(())
    }

    fn push_entry(&mut self, file: FileId, kind: EntryKind, line: usize, comment: Option<String>) -> usize {
        let entries = &mut self.ws.file_mut(file).entries;
        entries.push(Entry { kind, line, comment });
        entries.len() - 1
    }

    // Whether an entry of `file` already carries this object's properties.
    fn is_anchored(&self, file: FileId, object: ObjectId) -> bool {
        self.ws.file(file).entries.iter().any(|entry| match &entry.kind {
            EntryKind::Object(id) => *id == object,
            EntryKind::ActiveSwitch { object: id, .. } | EntryKind::Continuation { object: id, .. } => {
                *id == object
            }
            _ => false,
        })
    }

    fn flush_comment(&mut self, file: FileId, pending: &mut PendingComment) {
        let line = pending.line;
        if let Some(text) = pending.take() {
            self.push_entry(file, EntryKind::Comment(text), line, None);
        }
    }

    /// Activates the object phase 1 registered for this `.create` line. A
    /// repeated `.create` re-activates the first instance.
    fn activate_created(&mut self, file: FileId, token: &Token) -> Result<EntryKind, ScriptError> {
        let registry = self.ctx.registry();
        let scope = self.ws.file(file).scope;
        let reference = registry.resolve_reference(token.reference())?;
        let (_, name) = reference.split_create_args(token.arguments())?;
        let name = unquote(name);
        let id = self
            .ws
            .find_object(scope, &name, &reference.name)
            .ok_or_else(|| ScriptError::MissingRequiredObject {
                name: name.clone(),
                reference_type: reference.name.clone(),
            })?;
        self.ws.set_active(scope, &reference.name, id);

        let created_here = self.ws.object(id).origin
            == Some(Origin {
                file,
                line: token.line,
            });
        Ok(if created_here {
            EntryKind::Object(id)
        } else {
            EntryKind::ActiveSwitch {
                object: id,
                text: token.text.trim().to_string(),
            }
        })
    }

    fn switch_active(&mut self, file: FileId, token: &Token) -> Result<ObjectId, ScriptError> {
        let registry = self.ctx.registry();
        let scope = self.ws.file(file).scope;
        let reference = registry.resolve_reference(token.reference())?;
        let name = token
            .arguments()
            .last()
            .map(|n| unquote(n))
            .ok_or_else(|| ScriptError::InvalidArgumentCount {
                property: format!("{}.{}", token.reference(), token.property()),
                expected: "at least 1".to_string(),
                found: 0,
            })?;
        let id = self.ws.get_object(registry, scope, &name, &reference.name)?;
        log::trace!("active {} is now '{name}'", reference.name);
        self.ws.set_active(scope, &reference.name, id);
        Ok(id)
    }

    fn assign(&mut self, file: FileId, token: &Token, comment: Option<String>) -> Result<ObjectId, ScriptError> {
        let registry = self.ctx.registry();
        let scope = self.ws.file(file).scope;
        let reference = registry.resolve_reference(token.reference())?;
        let object = self
            .ws
            .active(scope, &reference.name)
            .ok_or_else(|| ScriptError::MissingActiveObject {
                reference_type: token.reference().to_string(),
            })?;
        let origin = Origin {
            file,
            line: token.line,
        };
        self.ws.assign_property(
            registry,
            scope,
            object,
            token.property(),
            token.arguments(),
            Some(origin),
            comment,
        )?;
        Ok(object)
    }

    fn declare(&mut self, file: FileId, token: &Token) -> Result<ExprId, ScriptError> {
        let kind = match token.kind {
            TokenKind::Constant => ExpressionKind::Constant,
            _ => ExpressionKind::Variable,
        };
        let (name, value) = split_binding(token.statement_body());
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ScriptError::UnrecognizedLine {
                text: token.text.trim().to_string(),
            });
        }
        let origin = Origin {
            file,
            line: token.line,
        };
        let scope = self.ws.file(file).scope;
        let id = self.ws.new_expression(kind, name, value, Some(origin));
        self.ws.bind_expression(scope, id);
        log::trace!("{} {name} bound", kind.keyword());
        Ok(id)
    }

    fn statement(&mut self, file: FileId, token: &Token, comment: Option<String>) -> Result<(), ConError> {
        let kind = match token.kind {
            TokenKind::Run => StatementKind::Run,
            _ => StatementKind::Include,
        };
        let Some((target, arguments)) = token.arguments().split_first() else {
            let text = token.text.trim().to_string();
            return Err(self.fail(file, token.line, ScriptError::UnrecognizedLine { text }));
        };
        let statement = Statement {
            kind,
            path: unquote(target),
            arguments: arguments.to_vec(),
            file: None,
        };
        let at = self.push_entry(file, EntryKind::Statement(statement.clone()), token.line, comment);
        if self.options.execution == Execution::Skip {
            return Ok(());
        }

        let base = self.ws.file(file).path.parent().map(Path::to_path_buf).unwrap_or_default();
        let path = normalize_path(&base.join(&statement.path));
        let loaded = self.include(file, token.line, path, arguments)?;
        if let EntryKind::Statement(recorded) = &mut self.ws.file_mut(file).entries[at].kind {
            recorded.file = Some(loaded);
        }
        Ok(())
    }

    fn include(&mut self, from: FileId, line: usize, path: PathBuf, arguments: &[String]) -> Result<FileId, ConError> {
        if self.include_stack.contains(&path) {
            let chain = self
                .include_stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(self.fail(from, line, ScriptError::IncludeCycle { chain }));
        }

        let lines = self.ctx.line_source().read_lines(&path).map_err(|err| {
            self.fail(
                from,
                line,
                ScriptError::SourceUnavailable {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                },
            )
        })?;

        let current = self.ws.file(from).scope;
        let scope = match self.options.execution {
            Execution::ExecuteInNewScope(attachment) => {
                let child = self
                    .ws
                    .new_child_scope(current, attachment, MissingObjectPolicy::CheckParent);
                self.ws.scope_mut(child).propagate = self.options.propagate_includes;
                child
            }
            _ => current,
        };
        for (position, argument) in arguments.iter().enumerate() {
            let name = format!("v_arg{}", position + 1);
            let id = self
                .ws
                .new_expression(ExpressionKind::Variable, &name, Some(argument.clone()), None);
            self.ws.bind_expression(scope, id);
        }

        self.parse_lines(path, lines, scope, Some(from))
    }
}

/// Collects a `beginRem`/`if` region up to its matching closer. Openers
/// nested inside are matched too. Returns the block and the index of the
/// token after it.
fn scan_block(tokens: &[Token], start: usize) -> Result<(Block, usize), ScriptError> {
    let opener = &tokens[start];
    let kind = match opener.kind {
        TokenKind::IfStart => BlockKind::Conditional,
        _ => BlockKind::Comment,
    };
    let mut closers: Vec<TokenKind> = opener.kind.closer().into_iter().collect();
    let mut lines = vec![opener.text.clone()];
    let mut index = start + 1;
    while let Some(token) = tokens.get(index) {
        index += 1;
        lines.push(token.text.clone());
        if let Some(closer) = token.kind.closer() {
            closers.push(closer);
        } else if closers.last() == Some(&token.kind) {
            closers.pop();
            if closers.is_empty() {
                return Ok((Block { kind, lines }, index));
            }
        }
    }
    Err(ScriptError::UnterminatedBlock {
        opener: opener.text.trim().to_string(),
    })
}

/// `name = value`, `name value` or a bare `name`.
fn split_binding(body: &str) -> (&str, Option<String>) {
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => match body.split_once(char::is_whitespace) {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (body.trim(), None),
        },
    };
    (name, value.filter(|v| !v.is_empty()).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryLineSource;
    use crate::diagnostics::CollectingSink;
    use crate::testing::sample_registry;
    use crate::value::Scalar;
    use std::sync::Arc;

    fn context() -> (ParseContext, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let ctx = ParseContext::new(sample_registry()).with_sink(sink.clone());
        (ctx, sink)
    }

    fn parse(source: &str) -> (Workspace, Result<FileId, ConError>, Arc<CollectingSink>) {
        let (ctx, sink) = context();
        let mut ws = Workspace::new();
        let result = parse_source(&ctx, &mut ws, "test.con", source, ParseOptions::default());
        (ws, result, sink)
    }

    fn mass(ws: &Workspace, file: FileId, name: &str) -> Option<f64> {
        let scope = ws.file(file).scope;
        let id = ws.find_object(scope, name, "ObjectTemplate")?;
        ws.object(id).value("mass").and_then(Scalar::as_float)
    }

    #[test]
    fn test_forward_reference() {
        let source = "\
ObjectTemplate.active crate01
ObjectTemplate.mass 5
ObjectTemplate.create SimpleObject crate01";
        let (ws, result, _) = parse(source);
        let file = result.unwrap();
        assert_eq!(mass(&ws, file, "crate01"), Some(5.0));
    }

    #[test]
    fn test_duplicate_object_warns_once_and_keeps_first() {
        let source = "\
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.mass 1
ObjectTemplate.create SimpleObject crate01
ObjectTemplate.mass 2";
        let (ws, result, sink) = parse(source);
        let file = result.unwrap();
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(ws.file(file).objects.len(), 1);
        assert_eq!(mass(&ws, file, "crate01"), Some(2.0));
        assert!(matches!(ws.file(file).entries[1].kind, EntryKind::ActiveSwitch { .. }));
    }

    #[test]
    fn test_comment_attachment() {
        let source = "\
rem header

rem about the crate
ObjectTemplate.create SimpleObject crate01
rem heavy
ObjectTemplate.mass 1
rem trailing";
        let (ws, result, _) = parse(source);
        let file = ws.file(result.unwrap());
        assert_eq!(file.entries[0].kind, EntryKind::Comment("header".to_string()));
        assert_eq!(file.entries[1].comment.as_deref(), Some("about the crate"));
        assert_eq!(file.entries[2].kind, EntryKind::Comment("trailing".to_string()));
        let object = ws.object(file.objects[0]);
        let entries = object.property("mass").unwrap().entries();
        assert_eq!(entries[0].comment.as_deref(), Some("heavy"));
    }

    #[test]
    fn test_blocks_are_kept_verbatim() {
        let source = "\
beginRem
ObjectTemplate.mass 1
if nested
endIf
endRem
if v_arg1 == 1
  ObjectTemplate.mass 2
else
  ObjectTemplate.mass 3
endIf";
        let (ws, result, _) = parse(source);
        let file = ws.file(result.unwrap());
        assert_eq!(file.entries.len(), 2);
        let EntryKind::Block(comment) = &file.entries[0].kind else {
            panic!("expected a block");
        };
        assert_eq!(comment.kind, BlockKind::Comment);
        assert_eq!(comment.lines.len(), 5);
        let EntryKind::Block(conditional) = &file.entries[1].kind else {
            panic!("expected a block");
        };
        assert_eq!(conditional.kind, BlockKind::Conditional);
        assert_eq!(conditional.lines.last().map(String::as_str), Some("endIf"));
    }

    #[test]
    fn test_unterminated_block() {
        let (_, result, sink) = parse("rem ok\nbeginRem\nstill open");
        let err = result.unwrap_err();
        let ConError::Parse(parse) = &err else {
            panic!("expected a located error, got {err:?}");
        };
        assert_eq!(parse.line, 2);
        assert!(matches!(parse.kind, ScriptError::UnterminatedBlock { .. }));
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[test]
    fn test_stray_closer_is_unrecognized() {
        let (_, result, _) = parse("endIf");
        assert!(matches!(
            result.unwrap_err().script_error(),
            Some(ScriptError::UnrecognizedLine { .. })
        ));
    }

    #[test]
    fn test_partial_state_survives_failure() {
        let (ws, result, _) = parse("ObjectTemplate.create SimpleObject crate01\nObjectTemplate.mass 4\ngibberish here");
        assert!(result.is_err());
        let file = &ws.files()[0];
        assert_eq!(file.objects.len(), 1);
        assert_eq!(ws.object(file.objects[0]).value("mass"), Some(&Scalar::Float(4.0)));
    }

    #[test]
    fn test_missing_active_object() {
        let (_, result, _) = parse("ObjectTemplate.mass 4");
        assert!(matches!(
            result.unwrap_err().script_error(),
            Some(ScriptError::MissingActiveObject { .. })
        ));
    }

    #[test]
    fn test_split_binding() {
        assert_eq!(split_binding("v_x = 5"), ("v_x", Some("5".to_string())));
        assert_eq!(split_binding("v_x=5"), ("v_x", Some("5".to_string())));
        assert_eq!(split_binding("c_y 2"), ("c_y", Some("2".to_string())));
        assert_eq!(split_binding("v_z"), ("v_z", None));
    }

    #[test]
    fn test_include_binds_arguments() {
        let source = MemoryLineSource::new()
            .with_file("mods/main.con", "ObjectTemplate.create SimpleObject crate01\ninclude sub/part.con 42")
            .with_file("mods/sub/part.con", "ObjectTemplate.mass v_arg1");
        let (ctx, _) = context();
        let ctx = ctx.with_line_source(Arc::new(source));
        let mut ws = Workspace::new();
        let file = parse_file(&ctx, &mut ws, Path::new("mods/main.con"), ParseOptions::default()).unwrap();
        assert_eq!(mass(&ws, file, "crate01"), Some(42.0));
        let EntryKind::Statement(statement) = &ws.file(file).entries[1].kind else {
            panic!("expected a statement");
        };
        let included = statement.file.unwrap();
        assert_eq!(ws.file(included).path, PathBuf::from("mods/sub/part.con"));
        assert_eq!(ws.file(included).parent, Some(file));

        // The included file's property line has no activation of its own.
        let crate01 = ws.find_object(ws.file(file).scope, "crate01", "ObjectTemplate").unwrap();
        assert_eq!(
            ws.file(included).entries[0].kind,
            EntryKind::Continuation {
                object: crate01,
                reference: "ObjectTemplate".to_string()
            }
        );
        assert_eq!(ws.file(included).entries.len(), 1);
    }

    #[test]
    fn test_include_cycle() {
        let source = MemoryLineSource::new()
            .with_file("a.con", "include b.con")
            .with_file("b.con", "include a.con");
        let (ctx, sink) = context();
        let ctx = ctx.with_line_source(Arc::new(source));
        let mut ws = Workspace::new();
        let err = parse_file(&ctx, &mut ws, Path::new("a.con"), ParseOptions::default()).unwrap_err();
        assert_eq!(
            err.script_error(),
            Some(&ScriptError::IncludeCycle {
                chain: "a.con -> b.con -> a.con".to_string()
            })
        );
        assert_eq!(sink.count(Severity::Error), 1);
    }

    #[test]
    fn test_execute_single_command() {
        let (ctx, _) = context();
        let mut ws = Workspace::new();
        let file = parse_source(&ctx, &mut ws, "live.con", "", ParseOptions::default()).unwrap();
        ws.execute(&ctx, file, "ObjectTemplate.create SimpleObject crate07", ParseOptions::default())
            .unwrap();
        ws.execute(&ctx, file, "ObjectTemplate.mass 3", ParseOptions::default())
            .unwrap();
        assert_eq!(mass(&ws, file, "crate07"), Some(3.0));
        assert_eq!(ws.file(file).lines.len(), 2);

        let err = ws.execute(&ctx, file, "   ", ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ConError::Tokenize(_)));
    }
}
