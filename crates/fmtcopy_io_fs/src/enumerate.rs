//! Source traversal and filename filtering.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::spec::{CopyRunError, SpecFileEntry, SpecFilter};
use crate::util::FileFilter;

/// Result of one enumeration pass.
#[derive(Debug, Clone, Default)]
pub struct SpecEnumeration {
    /// Matched files in copy order.
    pub entries: Vec<SpecFileEntry>,
    /// Regular files inspected, matched or not.
    pub cnt_scanned: u64,
    /// Unreadable directories/entries that were skipped.
    pub warnings: Vec<String>,
}

#[derive(Debug)]
struct SpecEnumContext<'a> {
    path_dir_src: &'a Path,
    file_filter: &'a FileFilter,
    if_recursive: bool,
    spec_enum: SpecEnumeration,
}

impl SpecEnumContext<'_> {
    fn add_warning(&mut self, warning: String) {
        warn!("{warning}");
        self.spec_enum.warnings.push(warning);
    }
}

/// List the files under `dir_source` that pass `spec_filter`.
///
/// Compiles the filename pattern and delegates to [`enumerate_with_filter`].
pub fn enumerate_files<P: AsRef<Path>>(
    dir_source: P,
    spec_filter: &SpecFilter,
    if_recursive: bool,
) -> Result<SpecEnumeration, CopyRunError> {
    let file_filter = FileFilter::compile(spec_filter)?;
    enumerate_with_filter(dir_source.as_ref(), &file_filter, if_recursive)
}

/// List the files under `path_dir_src` accepted by `file_filter`.
///
/// Within each directory files come first, sorted by name, followed by the
/// sorted subdirectories (recursive mode only), so the order is stable for a
/// given snapshot. Symlinks count as files only when they resolve to one;
/// symlinked directories are never descended into. An unreadable root is
/// [`CopyRunError::SourceUnreadable`]; unreadable subdirectories only add a
/// warning.
pub fn enumerate_with_filter(
    path_dir_src: &Path,
    file_filter: &FileFilter,
    if_recursive: bool,
) -> Result<SpecEnumeration, CopyRunError> {
    if !path_dir_src.is_dir() {
        return Err(CopyRunError::SourceNotFound(path_dir_src.to_path_buf()));
    }

    let iter_root = fs::read_dir(path_dir_src).map_err(|e| CopyRunError::SourceUnreadable {
        path: path_dir_src.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut spec_enum_ctx = SpecEnumContext {
        path_dir_src,
        file_filter,
        if_recursive,
        spec_enum: SpecEnumeration::default(),
    };
    walk_entries(path_dir_src, iter_root, &mut spec_enum_ctx);
    Ok(spec_enum_ctx.spec_enum)
}

fn walk_directory(path_root: &Path, spec_enum_ctx: &mut SpecEnumContext<'_>) {
    match fs::read_dir(path_root) {
        Ok(iter_entries) => walk_entries(path_root, iter_entries, spec_enum_ctx),
        Err(e) => spec_enum_ctx.add_warning(format!(
            "Failed to read directory {} ({e})",
            path_root.display()
        )),
    }
}

fn walk_entries(
    path_root: &Path,
    iter_entries: fs::ReadDir,
    spec_enum_ctx: &mut SpecEnumContext<'_>,
) {
    let mut l_dirs: Vec<(String, PathBuf)> = Vec::new();
    let mut l_files: Vec<(String, PathBuf)> = Vec::new();

    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_enum_ctx.add_warning(format!(
                    "Failed to read directory entry under {} ({e})",
                    path_root.display()
                ));
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_enum_ctx
                    .add_warning(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };

        if cfg_file_type.is_dir() {
            l_dirs.push((c_name, path_entry));
        } else if cfg_file_type.is_file() {
            l_files.push((c_name, path_entry));
        } else if cfg_file_type.is_symlink() {
            match fs::metadata(&path_entry) {
                Ok(meta) if meta.is_file() => l_files.push((c_name, path_entry)),
                Ok(_) => debug!("Not following symlink {}", path_entry.display()),
                Err(e) => debug!("Dangling symlink {} ({e})", path_entry.display()),
            }
        } else {
            debug!("Special file skipped: {}", path_entry.display());
        }
    }

    l_files.sort_by(|a, b| a.0.cmp(&b.0));
    for (name_file, path_file_src) in l_files {
        spec_enum_ctx.spec_enum.cnt_scanned += 1;
        if !spec_enum_ctx.file_filter.filter_file(&name_file) {
            continue;
        }
        let path_dir_rel = if spec_enum_ctx.if_recursive {
            path_root
                .strip_prefix(spec_enum_ctx.path_dir_src)
                .map(Path::to_path_buf)
                .unwrap_or_default()
        } else {
            PathBuf::new()
        };
        spec_enum_ctx.spec_enum.entries.push(SpecFileEntry {
            path_file_src,
            path_dir_rel,
            name_file,
        });
    }

    if !spec_enum_ctx.if_recursive {
        return;
    }
    l_dirs.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, path_dir_sub) in l_dirs {
        walk_directory(&path_dir_sub, spec_enum_ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::enumerate_files;
    use crate::spec::{CopyRunError, EnumFilterMode, EnumNamePatternMode, SpecFilter};
    use crate::test_util::{TestDir, write_text};

    fn filter_of(extensions: &str, rule_filter: EnumFilterMode) -> SpecFilter {
        SpecFilter::from_raw(extensions, rule_filter, "", EnumNamePatternMode::Literal)
    }

    fn names(spec_enum: &super::SpecEnumeration) -> Vec<String> {
        spec_enum
            .entries
            .iter()
            .map(|e| e.name_file.clone())
            .collect()
    }

    #[test]
    fn flat_include_is_case_insensitive() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("b.jpg"), "b");
        write_text(&src.join("c.TXT"), "c");
        write_text(&src.join("sub/d.txt"), "d");

        let spec_enum = enumerate_files(&src, &filter_of(".txt", EnumFilterMode::Include), false)
            .expect("enumerate");
        assert_eq!(names(&spec_enum), vec!["a.txt", "c.TXT"]);
        assert_eq!(spec_enum.cnt_scanned, 3);
        assert!(
            spec_enum
                .entries
                .iter()
                .all(|e| e.path_dir_rel.as_os_str().is_empty())
        );
        assert!(
            spec_enum
                .entries
                .iter()
                .all(|e| e.path_file_src.parent() == Some(src.as_path()))
        );
    }

    #[test]
    fn recursive_records_relative_dirs_in_stable_order() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("z.txt"), "z");
        write_text(&src.join("b/sub/x.txt"), "x");
        write_text(&src.join("a/y.txt"), "y");
        write_text(&src.join("a/y.md"), "md");

        let spec_filter = filter_of("txt", EnumFilterMode::Include);
        let spec_enum = enumerate_files(&src, &spec_filter, true).expect("enumerate");
        let l_pairs = spec_enum
            .entries
            .iter()
            .map(|e| (e.path_dir_rel.clone(), e.name_file.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            l_pairs,
            vec![
                (PathBuf::new(), "z.txt".to_string()),
                (PathBuf::from("a"), "y.txt".to_string()),
                (Path::new("b").join("sub"), "x.txt".to_string()),
            ]
        );

        let spec_enum_again = enumerate_files(&src, &spec_filter, true).expect("enumerate");
        assert_eq!(spec_enum.entries, spec_enum_again.entries);
    }

    #[test]
    fn exclude_and_empty_sets() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("b.jpg"), "b");

        let spec_enum = enumerate_files(&src, &filter_of(".txt", EnumFilterMode::Exclude), false)
            .expect("enumerate");
        assert_eq!(names(&spec_enum), vec!["b.jpg"]);

        let spec_enum = enumerate_files(&src, &filter_of("", EnumFilterMode::Exclude), false)
            .expect("enumerate");
        assert_eq!(names(&spec_enum), vec!["a.txt", "b.jpg"]);
    }

    #[test]
    fn zero_matches_is_not_an_error() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("a.jpg"), "a");

        let spec_enum = enumerate_files(&src, &filter_of(".txt", EnumFilterMode::Include), true)
            .expect("enumerate");
        assert!(spec_enum.entries.is_empty());
    }

    #[test]
    fn missing_source_rejected() {
        let tmp = TestDir::new();
        let err = enumerate_files(
            tmp.path().join("missing"),
            &filter_of("", EnumFilterMode::Include),
            false,
        )
        .expect_err("missing source must fail");
        assert!(matches!(err, CopyRunError::SourceNotFound(_)));

        write_text(&tmp.path().join("plain.txt"), "x");
        let err = enumerate_files(
            tmp.path().join("plain.txt"),
            &filter_of("", EnumFilterMode::Include),
            false,
        )
        .expect_err("file source must fail");
        assert!(matches!(err, CopyRunError::SourceNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_follow_files_but_not_dirs() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let outside = tmp.path().join("outside");
        write_text(&src.join("real.txt"), "r");
        write_text(&outside.join("far.txt"), "f");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("file symlink");
        symlink(&outside, src.join("linked_dir")).expect("dir symlink");
        symlink(src.join("gone.txt"), src.join("dangling.txt")).expect("dangling symlink");

        let spec_enum = enumerate_files(&src, &filter_of("", EnumFilterMode::Include), true)
            .expect("enumerate");
        assert_eq!(names(&spec_enum), vec!["link.txt", "real.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_a_warning() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("ok.txt"), "ok");
        write_text(&src.join("locked/hidden.txt"), "h");
        let locked = src.join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
            .expect("lock dir");
        if std::fs::read_dir(&locked).is_ok() {
            // Running with privileges that ignore permission bits.
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
                .expect("unlock dir");
            return;
        }

        let spec_enum = enumerate_files(&src, &filter_of("", EnumFilterMode::Include), true)
            .expect("enumerate");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
            .expect("unlock dir");

        assert_eq!(names(&spec_enum), vec!["ok.txt"]);
        assert_eq!(spec_enum.warnings.len(), 1);
        assert!(spec_enum.warnings[0].contains("Failed to read directory"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_root_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        write_text(&src.join("a.txt"), "a");
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o000))
            .expect("lock dir");
        if std::fs::read_dir(&src).is_ok() {
            // Running with privileges that ignore permission bits.
            std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755))
                .expect("unlock dir");
            return;
        }

        let res_enum = enumerate_files(&src, &filter_of("", EnumFilterMode::Include), false);
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755))
            .expect("unlock dir");

        let err = res_enum.expect_err("unreadable root must fail");
        assert!(matches!(err, CopyRunError::SourceUnreadable { .. }));
        assert!(err.to_string().starts_with("Cannot read source directory"));
    }
}
