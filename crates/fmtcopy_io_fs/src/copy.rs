//! Run validation and the sequential copy loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::enumerate::enumerate_with_filter;
use crate::report::{ReportRun, ReportRunBuilder, SpecRunEvent};
use crate::spec::{CopyRunError, EnumItemKind, SpecFileEntry, SpecRunRequest};
use crate::util::{
    FileFilter, copy_file_with_metadata, is_same_entity, resolve_path,
    validate_destination_path_safety,
};

#[derive(Debug)]
enum EnumEntryOutcome {
    Copied(PathBuf),
    Skipped(PathBuf),
    Failed { path: PathBuf, reason: String },
}

/// Validate `spec_run_request`, enumerate matches and copy them in order.
///
/// This function performs:
/// 1. Filter compilation and source/destination validation (the source
///    must exist and be listable).
/// 2. Destination root creation.
/// 3. Enumeration of all matches (materialized before any copy).
/// 4. The copy loop of [`execute_copy`].
///
/// Returns [`CopyRunError`] only when the run is rejected before any file is
/// touched. Once copying starts every condition lands in the [`ReportRun`].
pub fn run_copy(
    spec_run_request: &SpecRunRequest,
    flag_cancel: &AtomicBool,
    on_event: &mut dyn FnMut(SpecRunEvent),
) -> Result<ReportRun, CopyRunError> {
    let file_filter = FileFilter::compile(&spec_run_request.spec_filter)?;
    let (path_dir_src, path_dir_dst) = prepare_run_paths(
        &spec_run_request.dir_source,
        &spec_run_request.dir_destination,
        spec_run_request.spec_cp_options.if_recursive,
    )?;

    info!(
        "Enumerating {} (recursive={})",
        path_dir_src.display(),
        spec_run_request.spec_cp_options.if_recursive
    );
    let spec_enum = enumerate_with_filter(
        &path_dir_src,
        &file_filter,
        spec_run_request.spec_cp_options.if_recursive,
    )?;
    info!(
        "{} of {} scanned files matched",
        spec_enum.entries.len(),
        spec_enum.cnt_scanned
    );

    let mut report_run = execute_copy(
        &spec_enum.entries,
        &path_dir_dst,
        spec_run_request.spec_cp_options.if_overwrite,
        flag_cancel,
        on_event,
    );
    report_run.warnings = spec_enum.warnings;
    Ok(report_run)
}

/// Check the run's directories and create the destination root.
///
/// Returns resolved absolute `(source, destination)` paths.
pub fn prepare_run_paths(
    dir_source: &Path,
    dir_destination: &Path,
    if_recursive: bool,
) -> Result<(PathBuf, PathBuf), CopyRunError> {
    let path_dir_src = resolve_path(dir_source);
    if !path_dir_src.is_dir() {
        return Err(CopyRunError::SourceNotFound(path_dir_src));
    }
    if let Err(e) = fs::read_dir(&path_dir_src) {
        return Err(CopyRunError::SourceUnreadable {
            path: path_dir_src,
            message: e.to_string(),
        });
    }
    if is_same_entity(&path_dir_src, dir_destination) {
        return Err(CopyRunError::SameDirectory {
            source: path_dir_src,
            destination: resolve_path(dir_destination),
        });
    }

    fs::create_dir_all(dir_destination).map_err(|e| CopyRunError::DestinationInitFailed {
        path: dir_destination.to_path_buf(),
        message: e.to_string(),
    })?;
    let path_dir_dst = resolve_path(dir_destination);
    if !path_dir_dst.is_dir() {
        return Err(CopyRunError::DestinationInitFailed {
            path: path_dir_dst,
            message: "Destination is not a directory".to_string(),
        });
    }

    if if_recursive && path_dir_dst.starts_with(&path_dir_src) {
        warn!(
            "Destination {} is inside source {}; earlier copies will be picked up on later runs",
            path_dir_dst.display(),
            path_dir_src.display()
        );
    }
    Ok((path_dir_src, path_dir_dst))
}

/// Copy `entries` into `path_dir_dst`, one at a time, in order.
///
/// `flag_cancel` is polled before each entry; once set, the remaining entries
/// are neither processed nor counted. A failing entry never aborts the loop.
/// Each processed entry emits one [`SpecRunEvent::Progress`] followed by one
/// [`SpecRunEvent::Item`].
pub fn execute_copy(
    entries: &[SpecFileEntry],
    path_dir_dst: &Path,
    if_overwrite: bool,
    flag_cancel: &AtomicBool,
    on_event: &mut dyn FnMut(SpecRunEvent),
) -> ReportRun {
    let n_total = entries.len();
    let mut builder_run_report = ReportRunBuilder::with_matched(n_total as u64);
    if n_total == 0 {
        info!("No qualifying files found");
        return builder_run_report.build();
    }
    info!(
        "Copying {n_total} files to {} (overwrite={if_overwrite})",
        path_dir_dst.display()
    );

    for (n_idx, spec_entry) in entries.iter().enumerate() {
        if flag_cancel.load(Ordering::SeqCst) {
            warn!("Stop requested after {n_idx} of {n_total} files");
            builder_run_report.mark_stopped();
            break;
        }

        let n_index = n_idx + 1;
        on_event(SpecRunEvent::Progress {
            n_index,
            n_total,
            percent: n_index as f64 / n_total as f64 * 100.0,
            status: format!("Copying {n_index}/{n_total}"),
        });

        let (kind, detail) = match copy_entry(spec_entry, path_dir_dst, if_overwrite) {
            EnumEntryOutcome::Copied(path_file_dst) => {
                debug!("Copied {}", path_file_dst.display());
                builder_run_report.add_copied();
                (EnumItemKind::Copied, path_file_dst.display().to_string())
            }
            EnumEntryOutcome::Skipped(path_file_dst) => {
                debug!("Skipped existing {}", path_file_dst.display());
                builder_run_report.add_skipped();
                (EnumItemKind::Skipped, "already exists".to_string())
            }
            EnumEntryOutcome::Failed { path, reason } => {
                warn!("Failed {}: {reason}", spec_entry.path_file_src.display());
                builder_run_report.add_failed(path, reason.clone());
                (EnumItemKind::Failed, reason)
            }
        };
        on_event(SpecRunEvent::Item {
            kind,
            name_file: spec_entry.name_file.clone(),
            detail,
        });
    }

    let report_run = builder_run_report.build();
    info!("{report_run}");
    report_run
}

fn copy_entry(spec_entry: &SpecFileEntry, path_dir_dst: &Path, if_overwrite: bool) -> EnumEntryOutcome {
    let path_dir_target = path_dir_dst.join(&spec_entry.path_dir_rel);
    if let Err(reason) = validate_destination_path_safety(&path_dir_target, path_dir_dst) {
        return EnumEntryOutcome::Failed {
            path: path_dir_target,
            reason,
        };
    }
    if let Err(e) = fs::create_dir_all(&path_dir_target) {
        return EnumEntryOutcome::Failed {
            reason: format!(
                "Failed to create directory {} ({e})",
                path_dir_target.display()
            ),
            path: path_dir_target,
        };
    }

    let path_file_dst = match spec_entry.path_file_src.file_name() {
        Some(name_os) => path_dir_target.join(name_os),
        None => path_dir_target.join(&spec_entry.name_file),
    };

    if !if_overwrite && fs::symlink_metadata(&path_file_dst).is_ok() {
        return EnumEntryOutcome::Skipped(path_file_dst);
    }
    if path_file_dst.is_dir() {
        return EnumEntryOutcome::Failed {
            reason: format!("Destination is a directory: {}", path_file_dst.display()),
            path: path_file_dst,
        };
    }

    match copy_file_with_metadata(&spec_entry.path_file_src, &path_file_dst) {
        Ok(()) => EnumEntryOutcome::Copied(path_file_dst),
        Err(e) => EnumEntryOutcome::Failed {
            path: spec_entry.path_file_src.clone(),
            reason: e.to_string(),
        },
    }
}
