use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ConError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error("Load task was interrupted: {reason}")]
    #[diagnostic(code(con::interrupted))]
    Interrupted { reason: String },
}

impl ConError {
    /// The location-free kind behind this error, when there is one.
    #[must_use]
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            ConError::Parse(err) => Some(&err.kind),
            ConError::Script(err) => Some(err),
            _ => None,
        }
    }
}

/// A fatal error raised while walking a script, pinned to the file and line
/// that caused it.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{file}:{line}: {kind}")]
#[diagnostic(code(con::parse))]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("while processing this line")]
    pub span: SourceSpan,
    pub kind: ScriptError,
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("No tokenizer rule matches '{text}'")]
#[diagnostic(
    code(lexer::no_rule),
    help("A single command must be a creation, property, comment, variable or statement line.")
)]
pub struct TokenizeError {
    pub text: String,
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Unrecognized line '{text}'")]
    #[diagnostic(
        code(parser::unrecognized_line),
        help("Every non-blank line must be a directive, a property assignment or a comment.")
    )]
    UnrecognizedLine { text: String },

    #[error("Block opened by '{opener}' is never closed")]
    #[diagnostic(
        code(parser::unterminated_block),
        help("Close 'beginRem' with 'endRem' and 'if' with 'endIf'.")
    )]
    UnterminatedBlock { opener: String },

    #[error("Undefined reference type '{name}'")]
    #[diagnostic(
        code(schema::undefined_reference_type),
        help("Register the reference type with the schema registry before parsing.")
    )]
    UndefinedReferenceType { name: String },

    #[error("Unknown schema '{name}'")]
    #[diagnostic(code(schema::unknown_schema))]
    UnknownSchema { name: String },

    #[error("No active object of reference type '{reference_type}'")]
    #[diagnostic(
        code(parser::missing_active_object),
        help("Create or activate an object of this type before setting its properties.")
    )]
    MissingActiveObject { reference_type: String },

    #[error("Schema '{schema}' has no property named '{property}'")]
    #[diagnostic(code(object::unknown_property))]
    UnknownProperty { schema: String, property: String },

    #[error("Property '{property}' expects {expected} argument(s), found {found}")]
    #[diagnostic(code(object::invalid_argument_count))]
    InvalidArgumentCount {
        property: String,
        expected: String,
        found: usize,
    },

    #[error("Cannot convert '{value}' to {target}")]
    #[diagnostic(code(value::unconvertible))]
    UnconvertibleValue { value: String, target: String },

    #[error("Undefined variable or constant '{name}'")]
    #[diagnostic(
        code(value::undefined_expression),
        help("Declare it with 'var' or 'const' before it is used.")
    )]
    UndefinedExpression { name: String },

    #[error("Required object '{name}' of reference type '{reference_type}' was not found")]
    #[diagnostic(code(scope::missing_required_object))]
    MissingRequiredObject {
        name: String,
        reference_type: String,
    },

    #[error("Object '{name}' of reference type '{reference_type}' is already registered")]
    #[diagnostic(code(scope::duplicate_object))]
    DuplicateObject {
        name: String,
        reference_type: String,
    },

    #[error("Cannot read '{path}': {reason}")]
    #[diagnostic(code(source::unavailable))]
    SourceUnavailable { path: String, reason: String },

    #[error("Include cycle detected: {chain}")]
    #[diagnostic(
        code(parser::include_cycle),
        help("A file may not include itself, directly or through other files.")
    )]
    IncludeCycle { chain: String },
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema '{schema}' declares property '{property}' more than once")]
    #[diagnostic(code(schema::duplicate_property))]
    DuplicatePropertyDeclaration { schema: String, property: String },

    #[error("Schema '{name}' is already registered")]
    #[diagnostic(code(schema::duplicate_schema))]
    DuplicateSchema { name: String },

    #[error("Reference type '{name}' is already registered")]
    #[diagnostic(code(schema::duplicate_reference_type))]
    DuplicateReferenceType { name: String },

    #[error("Reference type '{reference_type}' names unknown default schema '{schema}'")]
    #[diagnostic(
        code(schema::unknown_default_schema),
        help("Register schemas before the reference types that create them.")
    )]
    UnknownDefaultSchema {
        reference_type: String,
        schema: String,
    },
}
