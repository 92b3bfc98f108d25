use crate::ast::FileId;
use crate::context::ParseContext;
use crate::error::{ConError, ScriptError};
use crate::object::ConObject;
use crate::parser::{parse_file, parse_source, ParseOptions};
use crate::serialization::{flatten, serialize_file, FlatProperty, SerializeOptions};
use crate::workspace::Workspace;
use serde::{Serialize, Serializer};
use std::path::Path;
#[cfg(feature = "async")]
use std::path::PathBuf;
#[cfg(feature = "async")]
use std::sync::Arc;

/// A successfully loaded script together with everything it pulled in.
/// Serializes as its flattened property records.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub workspace: Workspace,
    /// The file the load started from.
    pub file: FileId,
}

impl Serialize for LoadResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.flatten().serialize(serializer)
    }
}

impl LoadResult {
    /// The objects the loaded file itself created.
    pub fn objects(&self) -> impl Iterator<Item = &ConObject> + '_ {
        self.workspace
            .file(self.file)
            .objects
            .iter()
            .map(|&id| self.workspace.object(id))
    }

    /// Looks an object up in the loaded file's scope.
    #[must_use]
    pub fn object(&self, reference_type: &str, name: &str) -> Option<&ConObject> {
        let scope = self.workspace.file(self.file).scope;
        self.workspace
            .find_object(scope, name, reference_type)
            .map(|id| self.workspace.object(id))
    }

    /// Script text for the loaded file.
    ///
    /// # Errors
    /// Returns a `ScriptError` if a bound variable no longer converts.
    pub fn to_text(&self) -> Result<String, ScriptError> {
        self.to_text_with(SerializeOptions::default())
    }

    pub fn to_text_with(&self, options: SerializeOptions) -> Result<String, ScriptError> {
        serialize_file(&self.workspace, self.file, options)
    }

    #[must_use]
    pub fn flatten(&self) -> Vec<FlatProperty> {
        flatten(&self.workspace, self.file)
    }

    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Loads a script file and everything it includes into a fresh workspace.
///
/// # Errors
/// Returns the first fatal error, already reported to the context's
/// diagnostics sink. Use [`parse_file`] with a workspace of your own to
/// inspect what was parsed before the failure.
pub fn load(ctx: &ParseContext, path: impl AsRef<Path>, options: ParseOptions) -> Result<LoadResult, ConError> {
    let mut workspace = Workspace::new();
    let file = parse_file(ctx, &mut workspace, path.as_ref(), options)?;
    Ok(LoadResult { workspace, file })
}

/// Parses script text. `name` is used in diagnostics and as the base for
/// relative includes.
pub fn parse_str(
    ctx: &ParseContext,
    name: &str,
    source: &str,
    options: ParseOptions,
) -> Result<LoadResult, ConError> {
    let mut workspace = Workspace::new();
    let file = parse_source(ctx, &mut workspace, name, source, options)?;
    Ok(LoadResult { workspace, file })
}

/// Runs [`load`] on tokio's blocking pool, so independent files can load
/// concurrently. Includes are still processed depth-first within one load.
#[cfg(feature = "async")]
pub async fn load_async(
    ctx: Arc<ParseContext>,
    path: PathBuf,
    options: ParseOptions,
) -> Result<LoadResult, ConError> {
    tokio::task::spawn_blocking(move || load(&ctx, &path, options))
        .await
        .map_err(|err| ConError::Interrupted {
            reason: err.to_string(),
        })?
}
