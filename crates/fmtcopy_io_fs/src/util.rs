use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::conf::C_PARTIAL_SUFFIX;
use crate::spec::{CopyRunError, EnumFilterMode, EnumNamePatternMode, SpecFilter};

////////////////////////////////////////////////////////////////////////////////
// #region ExtensionParsing

/// Normalize a raw comma-separated extension list.
///
/// Tokens are trimmed, empties dropped, lower-cased and given a leading `.`.
pub fn normalize_extensions(extensions_raw: &str) -> BTreeSet<String> {
    extensions_raw
        .split(',')
        .map(str::trim)
        .filter(|c_ext| !c_ext.is_empty())
        .map(|c_ext| {
            let c_lower = c_ext.to_lowercase();
            if c_lower.starts_with('.') {
                c_lower
            } else {
                format!(".{c_lower}")
            }
        })
        .collect()
}

/// Append `ext` to a raw extension list unless an identical token is present.
pub fn merge_extension(extensions_raw: &str, ext: &str) -> String {
    let c_current = extensions_raw.trim();
    let c_ext = ext.trim();
    if c_ext.is_empty() {
        return c_current.to_string();
    }
    if c_current.is_empty() {
        return c_ext.to_string();
    }
    if c_current.split(',').map(str::trim).any(|c| c == c_ext) {
        return c_current.to_string();
    }
    format!("{c_current},{c_ext}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NameMatching

#[derive(Debug, Clone)]
enum TypeNamePattern {
    Literal(String),
    Glob(GlobMatcher),
    Regex(Regex),
}

impl TypeNamePattern {
    fn compile(pattern: &str, rule_name_pattern: EnumNamePatternMode) -> Result<Self, CopyRunError> {
        match rule_name_pattern {
            EnumNamePatternMode::Literal => Ok(Self::Literal(pattern.to_lowercase())),
            EnumNamePatternMode::Glob => {
                let matcher = GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        CopyRunError::InvalidPattern(format!("Invalid filename glob: {e}"))
                    })?
                    .compile_matcher();
                Ok(Self::Glob(matcher))
            }
            EnumNamePatternMode::Regex => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        CopyRunError::InvalidPattern(format!("Invalid filename regex: {e}"))
                    })?;
                Ok(Self::Regex(regex))
            }
        }
    }

    fn is_match(&self, name_file: &str, name_file_lower: &str) -> bool {
        match self {
            Self::Literal(c_sub) => name_file_lower.contains(c_sub.as_str()),
            Self::Glob(matcher) => matcher.is_match(name_file),
            Self::Regex(regex) => regex.is_match(name_file),
        }
    }
}

/// A [`SpecFilter`] with its filename pattern compiled once per run.
#[derive(Debug, Clone)]
pub struct FileFilter {
    spec_filter: SpecFilter,
    name_pattern: Option<TypeNamePattern>,
}

impl FileFilter {
    pub fn compile(spec_filter: &SpecFilter) -> Result<Self, CopyRunError> {
        let name_pattern = spec_filter
            .name_contains
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| TypeNamePattern::compile(c, spec_filter.rule_name_pattern))
            .transpose()?;
        Ok(Self {
            spec_filter: spec_filter.clone(),
            name_pattern,
        })
    }

    /// Decide whether a bare filename qualifies.
    ///
    /// The name filter and the extension rule are ANDed; an empty extension
    /// set accepts every name regardless of mode.
    pub fn filter_file(&self, name_file: &str) -> bool {
        let name_file_lower = name_file.to_lowercase();

        if let Some(name_pattern) = &self.name_pattern
            && !name_pattern.is_match(name_file, &name_file_lower)
        {
            return false;
        }

        if self.spec_filter.extensions.is_empty() {
            return true;
        }

        let b_matches = self
            .spec_filter
            .extensions
            .iter()
            .any(|c_ext| name_file_lower.ends_with(c_ext.as_str()));
        match self.spec_filter.rule_filter {
            EnumFilterMode::Include => b_matches,
            EnumFilterMode::Exclude => !b_matches,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Canonical path when it exists, absolute path otherwise.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| absolutize_path(path))
}

/// Both paths exist and name the same filesystem entity.
pub(crate) fn is_same_entity(path_a: &Path, path_b: &Path) -> bool {
    let (Ok(path_a_real), Ok(path_b_real)) = (fs::canonicalize(path_a), fs::canonicalize(path_b))
    else {
        return false;
    };
    if path_a_real == path_b_real {
        return true;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(stat_a), Ok(stat_b)) = (fs::metadata(&path_a_real), fs::metadata(&path_b_real))
        {
            return stat_a.dev() == stat_b.dev() && stat_a.ino() == stat_b.ino();
        }
    }
    false
}

/// Refuse a destination file that escapes `path_dir_dst_root` or reaches it
/// through a symlink.
pub(crate) fn validate_destination_path_safety(
    path_file_dst: &Path,
    path_dir_dst_root: &Path,
) -> Result<(), String> {
    let path_rel = path_file_dst.strip_prefix(path_dir_dst_root).map_err(|_| {
        format!(
            "Unsafe destination path escapes destination root: {} (root={})",
            path_file_dst.display(),
            path_dir_dst_root.display()
        )
    })?;

    let mut path_cursor = path_dir_dst_root.to_path_buf();
    for part_rel in path_rel.components() {
        if !matches!(part_rel, std::path::Component::Normal(_)) {
            return Err(format!(
                "Unsafe destination path component in {}",
                path_file_dst.display()
            ));
        }
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) if meta_cursor.file_type().is_symlink() => {
                return Err(format!(
                    "Unsafe destination path traverses symlink: {}",
                    path_cursor.display()
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(format!(
                    "Failed to inspect destination path {} ({e})",
                    path_cursor.display()
                ));
            }
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

/// Copy bytes and metadata from `path_file_src` to `path_file_dst`.
///
/// Data is staged in a hidden sibling file with a unique name and renamed
/// into place, so the target is either the old file or the complete new one
/// and no other file in the directory is touched. Metadata is best-effort:
/// losing it never fails the copy.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    let path_dir_parent = path_file_dst.parent().unwrap_or_else(|| Path::new("."));
    let name_file = path_file_dst
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut file_src = fs::File::open(path_file_src)?;
    // Removed on drop unless persisted.
    let mut file_part = tempfile::Builder::new()
        .prefix(&format!(".{name_file}."))
        .suffix(C_PARTIAL_SUFFIX)
        .tempfile_in(path_dir_parent)?;
    io::copy(&mut file_src, file_part.as_file_mut())?;
    apply_metadata(path_file_src, file_part.path());
    file_part.persist(path_file_dst).map_err(|e| e.error)?;
    Ok(())
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) {
    use filetime::{FileTime, set_file_times};

    let stat_src = match fs::metadata(path_file_src) {
        Ok(v) => v,
        Err(e) => {
            debug!("Could not stat {} for metadata ({e})", path_file_src.display());
            return;
        }
    };
    if let Err(e) = fs::set_permissions(path_file_dst, stat_src.permissions()) {
        debug!("Could not preserve permissions for {} ({e})", path_file_dst.display());
    }

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    if let Err(e) = set_file_times(path_file_dst, file_time_access, file_time_modify) {
        debug!("Could not preserve timestamps for {} ({e})", path_file_dst.display());
    }

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            debug!(
                "Could not preserve xattr {:?} for {} ({e})",
                name,
                path_file_dst.display()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
