use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use chrono::Local;
use eyre::{Context, Result};
use fmtcopy_io_fs::{EnumItemKind, ReportRun, SpecRunEvent, SpecRunRequest, start_copy};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use signal_hook::consts::SIGINT;

/// Exit code for a run stopped by Ctrl-C.
pub const N_EXIT_STOPPED: i32 = 130;

/// Run `spec_run_request` on a worker thread and print its events.
///
/// `progress_bar` starts without a length and is sized by the first progress
/// event; pass a hidden bar to disable drawing.
///
/// Returns the process exit code: 0 when every file was copied or skipped,
/// 1 when any file failed, [`N_EXIT_STOPPED`] when the run was stopped.
pub fn run_and_report(spec_run_request: SpecRunRequest, progress_bar: &ProgressBar) -> Result<i32> {
    let mut run_handle = start_copy(spec_run_request).wrap_err("failed to start copy")?;
    register_interrupt(run_handle.cancel_flag())?;

    for spec_event in run_handle.events().iter() {
        match spec_event {
            SpecRunEvent::Progress {
                n_index,
                n_total,
                status,
                ..
            } => {
                if progress_bar.length().is_none() {
                    progress_bar.set_length(n_total as u64);
                    progress_bar.enable_steady_tick(Duration::from_millis(120));
                }
                progress_bar.set_position(n_index as u64);
                progress_bar.set_message(status);
            }
            SpecRunEvent::Item {
                kind,
                name_file,
                detail,
            } => emit_line(progress_bar, &format_item(kind, &name_file, &detail)),
            SpecRunEvent::Finished(_) | SpecRunEvent::Failed(_) => break,
        }
    }
    progress_bar.finish_and_clear();

    let report_run = run_handle.wait()?;
    debug!("{report_run}");
    for c_line in report_run.message.lines() {
        emit_line(progress_bar, c_line);
    }
    Ok(exit_code(&report_run))
}

/// First Ctrl-C requests a stop at the next file; a second one exits.
fn register_interrupt(flag_cancel: Arc<AtomicBool>) -> Result<()> {
    signal_hook::flag::register_conditional_shutdown(
        SIGINT,
        N_EXIT_STOPPED,
        Arc::clone(&flag_cancel),
    )
    .wrap_err("failed to install Ctrl-C handler")?;
    signal_hook::flag::register(SIGINT, flag_cancel)
        .wrap_err("failed to install Ctrl-C handler")?;
    Ok(())
}

/// Bar drawn on stderr, or a hidden one when progress is off.
pub fn new_progress_bar(if_show_progress: bool) -> ProgressBar {
    if !if_show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::no_length();
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {percent}% {msg}") {
        pb.set_style(style);
    }
    pb
}

/// Timestamped line on stdout, printed with the bar cleared.
fn emit_line(progress_bar: &ProgressBar, line: &str) {
    let c_stamped = format!("[{}] {line}", Local::now().format("%H:%M:%S"));
    progress_bar.suspend(|| println!("{c_stamped}"));
}

pub fn format_item(kind: EnumItemKind, name_file: &str, detail: &str) -> String {
    match kind {
        EnumItemKind::Copied => format!("Copied: {name_file}"),
        EnumItemKind::Skipped => format!("Skipped: {name_file} {detail}"),
        EnumItemKind::Failed => format!("Failed: {name_file} - {detail}"),
    }
}

pub fn exit_code(report_run: &ReportRun) -> i32 {
    if report_run.if_stopped {
        N_EXIT_STOPPED
    } else if report_run.cnt_failed > 0 {
        1
    } else {
        0
    }
}
