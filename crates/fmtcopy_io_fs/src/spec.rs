//! Run request models, filter specs and top-level error types.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::util::normalize_extensions;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How the extension set selects files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumFilterMode {
    /// Keep files whose name ends with one of the extensions.
    #[default]
    Include,
    /// Keep files whose name ends with none of the extensions.
    Exclude,
}

/// Interpretation of the filename filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumNamePatternMode {
    /// Case-insensitive substring.
    #[default]
    Literal,
    /// Case-insensitive shell wildcard matched against the whole name.
    Glob,
    /// Case-insensitive regular expression searched anywhere in the name.
    Regex,
}

/// Outcome of one processed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumItemKind {
    /// File written to destination.
    Copied,
    /// Destination already existed and overwrite was disabled.
    Skipped,
    /// Directory creation or copy failed.
    Failed,
}

impl EnumItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copied => "copied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// File selection rules for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecFilter {
    /// Normalized suffixes (leading `.`, lower-case). Empty disables the
    /// extension filter.
    pub extensions: BTreeSet<String>,
    /// Include/exclude interpretation of `extensions`.
    pub rule_filter: EnumFilterMode,
    /// Optional filename filter. Lower-cased in `Literal` mode.
    pub name_contains: Option<String>,
    /// How `name_contains` is interpreted.
    pub rule_name_pattern: EnumNamePatternMode,
}

impl SpecFilter {
    /// Build a filter from raw user input.
    ///
    /// `extensions_raw` is a comma-separated list such as `"txt, .DOCX"`.
    /// `name_contains_raw` is trimmed; an empty value disables the name filter.
    pub fn from_raw(
        extensions_raw: &str,
        rule_filter: EnumFilterMode,
        name_contains_raw: &str,
        rule_name_pattern: EnumNamePatternMode,
    ) -> Self {
        let c_name = name_contains_raw.trim();
        let name_contains = if c_name.is_empty() {
            None
        } else if rule_name_pattern == EnumNamePatternMode::Literal {
            Some(c_name.to_lowercase())
        } else {
            Some(c_name.to_string())
        };

        Self {
            extensions: normalize_extensions(extensions_raw),
            rule_filter,
            name_contains,
            rule_name_pattern,
        }
    }
}

/// Traversal and conflict options for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecCopyOptions {
    /// Walk the whole subtree and mirror its structure at the destination.
    pub if_recursive: bool,
    /// Replace destination files that already exist.
    pub if_overwrite: bool,
}

/// Everything one run needs. Built fresh per run.
#[derive(Debug, Clone)]
pub struct SpecRunRequest {
    pub dir_source: PathBuf,
    pub dir_destination: PathBuf,
    pub spec_filter: SpecFilter,
    pub spec_cp_options: SpecCopyOptions,
}

impl SpecRunRequest {
    /// Build a request from the raw strings a front-end collects.
    ///
    /// Paths are trimmed and must be non-empty; existence is checked later,
    /// when the run is validated.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw(
        dir_source: &str,
        dir_destination: &str,
        extensions_raw: &str,
        rule_filter: EnumFilterMode,
        name_contains_raw: &str,
        rule_name_pattern: EnumNamePatternMode,
        if_recursive: bool,
        if_overwrite: bool,
    ) -> Result<Self, CopyRunError> {
        let c_source = dir_source.trim();
        if c_source.is_empty() {
            return Err(CopyRunError::MissingPath("source"));
        }
        let c_destination = dir_destination.trim();
        if c_destination.is_empty() {
            return Err(CopyRunError::MissingPath("destination"));
        }

        Ok(Self {
            dir_source: PathBuf::from(c_source),
            dir_destination: PathBuf::from(c_destination),
            spec_filter: SpecFilter::from_raw(
                extensions_raw,
                rule_filter,
                name_contains_raw,
                rule_name_pattern,
            ),
            spec_cp_options: SpecCopyOptions {
                if_recursive,
                if_overwrite,
            },
        })
    }
}

/// One matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileEntry {
    /// Absolute source path.
    pub path_file_src: PathBuf,
    /// Containing directory relative to the source root. Empty for files at
    /// the root and for non-recursive runs.
    pub path_dir_rel: PathBuf,
    /// Bare file name.
    pub name_file: String,
}

/// One per-item failure with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Failures that stop a run before any file is touched.
#[derive(Debug)]
pub enum CopyRunError {
    /// A required path input was empty.
    MissingPath(&'static str),
    /// Filename filter could not be compiled.
    InvalidPattern(String),
    /// Source does not resolve to an existing directory.
    SourceNotFound(PathBuf),
    /// Source directory exists but cannot be listed.
    SourceUnreadable {
        /// Source directory.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// Source and destination are the same filesystem entity.
    SameDirectory {
        /// Resolved source directory.
        source: PathBuf,
        /// Resolved destination directory.
        destination: PathBuf,
    },
    /// Destination root could not be created.
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// Background worker could not be spawned or died.
    WorkerFailed(String),
}

impl fmt::Display for CopyRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPath(which) => write!(f, "No {which} directory given"),
            Self::InvalidPattern(msg) => write!(f, "{msg}"),
            Self::SourceNotFound(path) => {
                write!(f, "Source directory does not exist: {}", path.display())
            }
            Self::SourceUnreadable { path, message } => {
                write!(f, "Cannot read source directory {}: {message}", path.display())
            }
            Self::SameDirectory {
                source,
                destination,
            } => write!(
                f,
                "Source and destination are the same directory: {} <-> {}",
                source.display(),
                destination.display()
            ),
            Self::DestinationInitFailed { path, message } => {
                write!(
                    f,
                    "Failed to create destination {}: {message}",
                    path.display()
                )
            }
            Self::WorkerFailed(msg) => write!(f, "Copy worker failed: {msg}"),
        }
    }
}

impl std::error::Error for CopyRunError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
