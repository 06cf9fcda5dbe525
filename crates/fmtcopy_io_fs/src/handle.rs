//! Background run handle: one worker thread per run, events over a channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::info;

use crate::conf::C_WORKER_THREAD_NAME;
use crate::copy::run_copy;
use crate::report::{ReportRun, SpecRunEvent};
use crate::spec::{CopyRunError, SpecRunRequest};

type TypeRunOutcome = Result<ReportRun, CopyRunError>;

/// Clears the active flag when the worker exits, panics included.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a run executing on its own worker thread.
///
/// The worker sends [`SpecRunEvent`]s in order and always ends with either
/// [`SpecRunEvent::Finished`] or [`SpecRunEvent::Failed`]. The presentation
/// side drains them whenever it likes. Dropping the handle without
/// [`RunHandle::wait`] requests cancellation and detaches the worker.
#[derive(Debug)]
pub struct RunHandle {
    flag_cancel: Arc<AtomicBool>,
    flag_active: Arc<AtomicBool>,
    rx_events: Receiver<SpecRunEvent>,
    worker: Option<JoinHandle<TypeRunOutcome>>,
}

/// Start `spec_run_request` on a new worker thread.
pub fn start_copy(spec_run_request: SpecRunRequest) -> Result<RunHandle, CopyRunError> {
    let flag_cancel = Arc::new(AtomicBool::new(false));
    let flag_active = Arc::new(AtomicBool::new(true));
    let (tx_events, rx_events) = unbounded();

    let worker_cancel = Arc::clone(&flag_cancel);
    let worker_active = Arc::clone(&flag_active);
    let worker = thread::Builder::new()
        .name(C_WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            let _guard_active = ActiveGuard(worker_active);
            run_worker(&spec_run_request, &worker_cancel, &tx_events)
        })
        .map_err(|e| {
            flag_active.store(false, Ordering::SeqCst);
            CopyRunError::WorkerFailed(e.to_string())
        })?;

    Ok(RunHandle {
        flag_cancel,
        flag_active,
        rx_events,
        worker: Some(worker),
    })
}

fn run_worker(
    spec_run_request: &SpecRunRequest,
    flag_cancel: &AtomicBool,
    tx_events: &Sender<SpecRunEvent>,
) -> TypeRunOutcome {
    info!(
        "Run started: {} -> {}",
        spec_run_request.dir_source.display(),
        spec_run_request.dir_destination.display()
    );
    // A disconnected receiver only means nobody is listening any more.
    let res_run = run_copy(spec_run_request, flag_cancel, &mut |spec_event| {
        let _ = tx_events.send(spec_event);
    });
    let spec_event_last = match &res_run {
        Ok(report_run) => SpecRunEvent::Finished(report_run.clone()),
        Err(e) => SpecRunEvent::Failed(e.to_string()),
    };
    let _ = tx_events.send(spec_event_last);
    res_run
}

impl RunHandle {
    /// Ask the worker to stop at the next entry boundary.
    pub fn request_cancel(&self) {
        self.flag_cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.flag_cancel.load(Ordering::SeqCst)
    }

    /// Worker thread has not finished yet.
    pub fn is_active(&self) -> bool {
        self.flag_active.load(Ordering::SeqCst)
    }

    /// Shared cancel flag, for wiring to signal handlers.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag_cancel)
    }

    /// Event stream of this run.
    pub fn events(&self) -> &Receiver<SpecRunEvent> {
        &self.rx_events
    }

    /// Take every event queued so far without blocking.
    pub fn drain_events(&self) -> Vec<SpecRunEvent> {
        self.rx_events.try_iter().collect()
    }

    /// Block until the worker exits and return its outcome.
    ///
    /// Events still queued stay readable through [`RunHandle::events`].
    pub fn wait(&mut self) -> TypeRunOutcome {
        let Some(worker) = self.worker.take() else {
            return Err(CopyRunError::WorkerFailed(
                "Run outcome already collected".to_string(),
            ));
        };
        worker
            .join()
            .unwrap_or_else(|_| Err(CopyRunError::WorkerFailed("Worker panicked".to_string())))
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.request_cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::start_copy;
    use crate::report::SpecRunEvent;
    use crate::spec::{
        CopyRunError, EnumFilterMode, EnumItemKind, EnumNamePatternMode, SpecRunRequest,
    };
    use crate::test_util::{TestDir, write_text};

    fn request(src: &std::path::Path, dst: &std::path::Path) -> SpecRunRequest {
        SpecRunRequest::from_raw(
            &src.to_string_lossy(),
            &dst.to_string_lossy(),
            "txt",
            EnumFilterMode::Include,
            "",
            EnumNamePatternMode::Literal,
            true,
            false,
        )
        .expect("request")
    }

    #[test]
    fn background_run_streams_events_and_finishes() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("sub/b.txt"), "b");
        write_text(&src.join("c.md"), "c");

        let mut run_handle = start_copy(request(&src, &dst)).expect("start");
        let report_run = run_handle.wait().expect("run");
        assert!(!run_handle.is_active());
        assert_eq!(report_run.cnt_copied, 2);

        let l_events = run_handle.drain_events();
        let n_items = l_events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SpecRunEvent::Item {
                        kind: EnumItemKind::Copied,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(n_items, 2);
        assert_eq!(l_events.last(), Some(&SpecRunEvent::Finished(report_run)));
        assert!(dst.join("sub/b.txt").exists());
    }

    #[test]
    fn background_run_reports_rejection() {
        let tmp = TestDir::new();
        let mut run_handle =
            start_copy(request(&tmp.path().join("missing"), &tmp.path().join("dst")))
                .expect("start");
        let err = run_handle.wait().expect_err("missing source must fail");
        assert!(matches!(err, CopyRunError::SourceNotFound(_)));

        let l_events = run_handle.drain_events();
        assert_eq!(l_events.len(), 1);
        assert!(matches!(&l_events[0], SpecRunEvent::Failed(msg) if msg.contains("does not exist")));

        let err = run_handle.wait().expect_err("second wait must fail");
        assert!(matches!(err, CopyRunError::WorkerFailed(_)));
    }

    #[test]
    fn cancel_request_keeps_counts_consistent() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        for n in 0..50 {
            write_text(&src.join(format!("f{n:02}.txt")), "x");
        }

        let mut run_handle = start_copy(request(&src, &dst)).expect("start");
        run_handle.request_cancel();
        assert!(run_handle.is_cancel_requested());
        let report_run = run_handle.wait().expect("run");

        let n_items = run_handle
            .drain_events()
            .iter()
            .filter(|e| matches!(e, SpecRunEvent::Item { .. }))
            .count() as u64;
        assert_eq!(n_items, report_run.processed_count());
        if report_run.if_stopped {
            assert!(report_run.processed_count() < report_run.cnt_matched);
        } else {
            assert_eq!(report_run.processed_count(), report_run.cnt_matched);
        }
    }
}
