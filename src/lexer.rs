use crate::ast::FileId;
use crate::error::TokenizeError;
use regex::Regex;
use std::sync::{LazyLock, OnceLock};

/// Represents the kind of directive a single script line holds.
/// Every line of a file is classified as exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // == Bracketed blocks ==
    /// `beginRem`, opens a multi-line comment.
    RemBlockStart,
    /// `endRem`, closes a multi-line comment.
    RemBlockEnd,
    /// `if <expr>`, opens a conditional that is kept but never evaluated.
    IfStart,
    /// `elseIf <expr>` inside a conditional.
    ElseIf,
    /// `else` inside a conditional.
    Else,
    /// `endIf`, closes a conditional.
    EndIf,

    // == Statements ==
    /// `rem <text>`, a single-line comment.
    Comment,
    /// `include <file> [args...]`
    Include,
    /// `run <file> [args...]`
    Run,
    /// `var <name> [= <value>]`
    Variable,
    /// `const <name> = <value>`
    Constant,

    // == Object directives ==
    /// `<refType>.create <args...>`
    ObjectStart,
    /// `<refType>.active[Suffix] <name>`
    ActiveSwitch,
    /// `<refType>.<property>[.<sub>] <args...>`
    Property,

    /// Anything left over. Only blank lines are legal here.
    None,
}

impl TokenKind {
    /// The kind that closes a block opened by this kind.
    #[must_use]
    pub fn closer(self) -> Option<TokenKind> {
        match self {
            TokenKind::RemBlockStart => Some(TokenKind::RemBlockEnd),
            TokenKind::IfStart => Some(TokenKind::EndIf),
            _ => None,
        }
    }

    fn splits_on_dot(self) -> bool {
        matches!(
            self,
            TokenKind::ObjectStart | TokenKind::ActiveSwitch | TokenKind::Property
        )
    }
}

/// Arguments derived from a token's text on first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenArgs {
    /// Text before the first `.`; empty for statement lines.
    pub reference: String,
    /// Property (or keyword, for statement lines) name.
    pub property: String,
    pub arguments: Vec<String>,
}

/// A single classified script line.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub file: Option<FileId>,
    /// 1-based line number.
    pub line: usize,
    pub text: String,
    args: OnceLock<TokenArgs>,
}

impl Token {
    pub fn new(kind: TokenKind, file: Option<FileId>, line: usize, text: impl Into<String>) -> Token {
        Token {
            kind,
            file,
            line,
            text: text.into(),
            args: OnceLock::new(),
        }
    }

    /// Splits the line into reference, property and arguments. Computed once.
    pub fn args(&self) -> &TokenArgs {
        self.args.get_or_init(|| split_token(self.kind, &self.text))
    }

    pub fn reference(&self) -> &str {
        &self.args().reference
    }

    pub fn property(&self) -> &str {
        &self.args().property
    }

    pub fn arguments(&self) -> &[String] {
        &self.args().arguments
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The text of a `rem` line without the keyword.
    pub fn comment_text(&self) -> String {
        let trimmed = self.text.trim_start();
        let body = trimmed.get(3..).unwrap_or("");
        body.strip_prefix([' ', '\t']).unwrap_or(body).trim_end().to_string()
    }

    /// Everything after the leading keyword of a statement line.
    pub fn statement_body(&self) -> &str {
        let trimmed = self.text.trim();
        match trimmed.find(char::is_whitespace) {
            Some(at) => trimmed[at..].trim(),
            None => "",
        }
    }
}

fn split_token(kind: TokenKind, text: &str) -> TokenArgs {
    let trimmed = text.trim();
    if kind.splits_on_dot() {
        let (reference, rest) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let (property, remaining) = match rest.find(char::is_whitespace) {
            Some(at) => (&rest[..at], &rest[at..]),
            None => (rest, ""),
        };
        TokenArgs {
            reference: reference.to_string(),
            property: property.to_string(),
            arguments: split_arguments(remaining),
        }
    } else {
        let mut parts = split_arguments(trimmed).into_iter();
        let keyword = parts.next().unwrap_or_default();
        TokenArgs {
            reference: String::new(),
            property: keyword,
            arguments: parts.collect(),
        }
    }
}

/// Splits on whitespace, keeping a double-quoted run together as one
/// argument. Quotes stay in the argument; internal whitespace is preserved.
pub fn split_arguments(text: &str) -> Vec<String> {
    if !text.contains('"') {
        return text.split_whitespace().map(str::to_string).collect();
    }

    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    arguments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        arguments.push(current);
    }
    arguments
}

/// One classification rule: lines matching `pattern` become `kind`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: TokenKind,
    pub pattern: Regex,
}

impl Rule {
    pub fn new(kind: TokenKind, pattern: &str) -> Result<Rule, regex::Error> {
        Ok(Rule {
            kind,
            pattern: Regex::new(pattern)?,
        })
    }
}

// Order is precedence. The property rule is permissive and must stay behind
// every dotted directive; the catch-all stays last.
const STANDARD_RULES: &[(TokenKind, &str)] = &[
    (TokenKind::RemBlockStart, r"(?i)^\s*beginrem\b"),
    (TokenKind::RemBlockEnd, r"(?i)^\s*endrem\b"),
    (TokenKind::IfStart, r"(?i)^\s*if\b"),
    (TokenKind::ElseIf, r"(?i)^\s*elseif\b"),
    (TokenKind::Else, r"(?i)^\s*else\b"),
    (TokenKind::EndIf, r"(?i)^\s*endif\b"),
    (TokenKind::Comment, r"(?i)^\s*rem(\s|$)"),
    (TokenKind::Include, r"(?i)^\s*include\s+\S"),
    (TokenKind::Run, r"(?i)^\s*run\s+\S"),
    (TokenKind::Variable, r"(?i)^\s*var\s+\S"),
    (TokenKind::Constant, r"(?i)^\s*const\s+\S"),
    (TokenKind::ObjectStart, r"(?i)^\s*\w+\.create\s+\S"),
    (TokenKind::ActiveSwitch, r"(?i)^\s*\w+\.active\w*\s+\S"),
    (TokenKind::Property, r"^\s*\w+\.\S+"),
    (TokenKind::None, r"^"),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    STANDARD_RULES
        .iter()
        .map(|(kind, pattern)| Rule::new(*kind, pattern).expect("built-in tokenizer rule must compile"))
        .collect()
});

/// Classifies script lines using an ordered rule list.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    rules: Vec<Rule>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer {
            rules: RULES.clone(),
        }
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-supplied rule list. Lines no rule claims become
    /// [`TokenKind::None`].
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Tokenizer { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Produces one token per line. Each rule, in order, claims every line
    /// still unclassified that it matches.
    pub fn tokenize(&self, file: Option<FileId>, lines: &[String]) -> Vec<Token> {
        let mut kinds: Vec<Option<TokenKind>> = vec![None; lines.len()];
        for rule in &self.rules {
            for (kind, line) in kinds.iter_mut().zip(lines) {
                if kind.is_none() && rule.pattern.is_match(line) {
                    *kind = Some(rule.kind);
                }
            }
        }

        kinds
            .into_iter()
            .zip(lines)
            .enumerate()
            .map(|(index, (kind, line))| {
                Token::new(kind.unwrap_or(TokenKind::None), file, index + 1, line.as_str())
            })
            .collect()
    }

    /// Classifies one free-standing command. The catch-all does not apply
    /// here, so a line no specific rule matches is an error.
    pub fn tokenize_line(&self, text: &str) -> Result<Token, TokenizeError> {
        self.rules
            .iter()
            .filter(|rule| rule.kind != TokenKind::None)
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| Token::new(rule.kind, None, 1, text))
            .ok_or_else(|| TokenizeError {
                text: text.to_string(),
            })
    }
}
