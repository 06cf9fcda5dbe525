use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use fmtcopy_io_fs::{
    CopyRunError, EnumFilterMode, EnumNamePatternMode, ReportRun, RunHandle, SpecCopyError,
    SpecRunEvent, SpecRunRequest, TUP_COMMON_EXTENSIONS, merge_extension, normalize_extensions,
    run_copy, start_copy,
};
use pyo3::exceptions::{PyFileNotFoundError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "fmtcopy.fs.run_copy.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "SpecCopyError")]
#[derive(Debug, Clone)]
struct PySpecCopyError {
    #[pyo3(get)]
    path: String,
    #[pyo3(get)]
    exception: String,
}

impl From<SpecCopyError> for PySpecCopyError {
    fn from(spec_error: SpecCopyError) -> Self {
        Self {
            path: spec_error.path.to_string_lossy().to_string(),
            exception: spec_error.exception,
        }
    }
}

#[pyclass(name = "ReportRun")]
#[derive(Debug, Clone)]
struct PyReportRun {
    #[pyo3(get)]
    cnt_matched: u64,
    #[pyo3(get)]
    cnt_copied: u64,
    #[pyo3(get)]
    cnt_skipped: u64,
    #[pyo3(get)]
    cnt_failed: u64,
    #[pyo3(get)]
    if_stopped: bool,
    #[pyo3(get)]
    message: String,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecCopyError>,
    report_run: ReportRun,
}

impl From<ReportRun> for PyReportRun {
    fn from(report_run: ReportRun) -> Self {
        Self {
            cnt_matched: report_run.cnt_matched,
            cnt_copied: report_run.cnt_copied,
            cnt_skipped: report_run.cnt_skipped,
            cnt_failed: report_run.cnt_failed,
            if_stopped: report_run.if_stopped,
            message: report_run.message.clone(),
            warnings: report_run.warnings.clone(),
            errors: report_run
                .errors
                .iter()
                .cloned()
                .map(PySpecCopyError::from)
                .collect(),
            report_run,
        }
    }
}

#[pymethods]
impl PyReportRun {
    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.report_run.to_dict()
    }

    #[pyo3(signature = (prefix = "[RUN]"))]
    fn format(&self, prefix: &str) -> String {
        self.report_run.format(prefix)
    }

    fn __str__(&self) -> String {
        self.report_run.to_string()
    }
}

/// Flattened [`SpecRunEvent`]; `kind` is one of `progress`, `copied`,
/// `skipped`, `failed`, `finished`, `rejected`.
#[pyclass(name = "RunEvent")]
#[derive(Debug, Clone)]
struct PyRunEvent {
    #[pyo3(get)]
    kind: String,
    #[pyo3(get)]
    name_file: String,
    #[pyo3(get)]
    detail: String,
    #[pyo3(get)]
    n_index: usize,
    #[pyo3(get)]
    n_total: usize,
    #[pyo3(get)]
    percent: f64,
    #[pyo3(get)]
    report: Option<PyReportRun>,
}

impl PyRunEvent {
    fn with_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name_file: String::new(),
            detail: String::new(),
            n_index: 0,
            n_total: 0,
            percent: 0.0,
            report: None,
        }
    }
}

impl From<SpecRunEvent> for PyRunEvent {
    fn from(spec_event: SpecRunEvent) -> Self {
        match spec_event {
            SpecRunEvent::Progress {
                n_index,
                n_total,
                percent,
                status,
            } => Self {
                detail: status,
                n_index,
                n_total,
                percent,
                ..Self::with_kind("progress")
            },
            SpecRunEvent::Item {
                kind,
                name_file,
                detail,
            } => Self {
                name_file,
                detail,
                ..Self::with_kind(kind.as_str())
            },
            SpecRunEvent::Finished(report_run) => Self {
                detail: report_run.message.clone(),
                percent: 100.0,
                report: Some(PyReportRun::from(report_run)),
                ..Self::with_kind("finished")
            },
            SpecRunEvent::Failed(message) => Self {
                detail: message,
                ..Self::with_kind("rejected")
            },
        }
    }
}

#[pyclass(name = "RunHandle")]
struct PyRunHandle {
    run_handle: RunHandle,
}

#[pymethods]
impl PyRunHandle {
    fn request_cancel(&self) {
        self.run_handle.request_cancel();
    }

    fn is_cancel_requested(&self) -> bool {
        self.run_handle.is_cancel_requested()
    }

    fn is_active(&self) -> bool {
        self.run_handle.is_active()
    }

    /// Events queued since the last call; never blocks.
    fn drain_events(&self) -> Vec<PyRunEvent> {
        self.run_handle
            .drain_events()
            .into_iter()
            .map(PyRunEvent::from)
            .collect()
    }

    /// Block (without holding the GIL) until the run ends.
    fn wait(&mut self, py: Python<'_>) -> PyResult<PyReportRun> {
        let run_handle = &mut self.run_handle;
        let report_run = py.allow_threads(|| run_handle.wait());
        report_run
            .map(PyReportRun::from)
            .map_err(map_copy_run_error)
    }
}

fn parse_rule_filter(value: &str) -> PyResult<EnumFilterMode> {
    match value {
        "include" => Ok(EnumFilterMode::Include),
        "exclude" => Ok(EnumFilterMode::Exclude),
        _ => Err(PyValueError::new_err(format!(
            "Invalid filter mode: `{value}`. Expected one of: ['include', 'exclude']"
        ))),
    }
}

fn parse_rule_name_pattern(value: &str) -> PyResult<EnumNamePatternMode> {
    match value {
        "literal" => Ok(EnumNamePatternMode::Literal),
        "glob" => Ok(EnumNamePatternMode::Glob),
        "regex" => Ok(EnumNamePatternMode::Regex),
        _ => Err(PyValueError::new_err(format!(
            "Invalid name pattern mode: `{value}`. Expected one of: ['literal', 'glob', 'regex']"
        ))),
    }
}

fn map_copy_run_error(exception: CopyRunError) -> PyErr {
    let message = exception.to_string();
    match exception {
        CopyRunError::SourceNotFound(_) => PyFileNotFoundError::new_err(message),
        CopyRunError::SourceUnreadable { .. } | CopyRunError::DestinationInitFailed { .. } => {
            PyOSError::new_err(message)
        }
        CopyRunError::WorkerFailed(_) => PyRuntimeError::new_err(message),
        CopyRunError::MissingPath(_)
        | CopyRunError::InvalidPattern(_)
        | CopyRunError::SameDirectory { .. } => PyValueError::new_err(message),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_request(
    dir_source: &str,
    dir_destination: &str,
    extensions: &str,
    rule_filter: &str,
    name_contains: &str,
    rule_name_pattern: &str,
    if_recursive: bool,
    if_overwrite: bool,
) -> PyResult<SpecRunRequest> {
    SpecRunRequest::from_raw(
        dir_source,
        dir_destination,
        extensions,
        parse_rule_filter(rule_filter)?,
        name_contains,
        parse_rule_name_pattern(rule_name_pattern)?,
        if_recursive,
        if_overwrite,
    )
    .map_err(map_copy_run_error)
}

#[pyfunction(name = "start_copy")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    extensions = "",
    rule_filter = "include",
    name_contains = "",
    rule_name_pattern = "literal",
    if_recursive = false,
    if_overwrite = false
))]
#[allow(clippy::too_many_arguments)]
fn start_copy_py(
    dir_source: &str,
    dir_destination: &str,
    extensions: &str,
    rule_filter: &str,
    name_contains: &str,
    rule_name_pattern: &str,
    if_recursive: bool,
    if_overwrite: bool,
) -> PyResult<PyRunHandle> {
    let spec_run_request = build_request(
        dir_source,
        dir_destination,
        extensions,
        rule_filter,
        name_contains,
        rule_name_pattern,
        if_recursive,
        if_overwrite,
    )?;
    let run_handle = start_copy(spec_run_request).map_err(map_copy_run_error)?;
    Ok(PyRunHandle { run_handle })
}

#[pyfunction(name = "run_copy")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    extensions = "",
    rule_filter = "include",
    name_contains = "",
    rule_name_pattern = "literal",
    if_recursive = false,
    if_overwrite = false
))]
#[allow(clippy::too_many_arguments)]
fn run_copy_py(
    py: Python<'_>,
    dir_source: &str,
    dir_destination: &str,
    extensions: &str,
    rule_filter: &str,
    name_contains: &str,
    rule_name_pattern: &str,
    if_recursive: bool,
    if_overwrite: bool,
) -> PyResult<PyReportRun> {
    let spec_run_request = build_request(
        dir_source,
        dir_destination,
        extensions,
        rule_filter,
        name_contains,
        rule_name_pattern,
        if_recursive,
        if_overwrite,
    )?;
    let flag_cancel = AtomicBool::new(false);
    let report_run = py.allow_threads(|| run_copy(&spec_run_request, &flag_cancel, &mut |_| {}));
    let report_run = report_run.map_err(map_copy_run_error)?;
    Ok(PyReportRun::from(report_run))
}

#[pyfunction(name = "normalize_extensions")]
fn normalize_extensions_py(extensions: &str) -> Vec<String> {
    normalize_extensions(extensions).into_iter().collect()
}

#[pyfunction(name = "merge_extension")]
fn merge_extension_py(extensions: &str, ext: &str) -> String {
    merge_extension(extensions, ext)
}

#[pymodule]
fn _fmtcopy_io_fs_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpecCopyError>()?;
    module.add_class::<PyReportRun>()?;
    module.add_class::<PyRunEvent>()?;
    module.add_class::<PyRunHandle>()?;
    module.add_function(wrap_pyfunction!(start_copy_py, module)?)?;
    module.add_function(wrap_pyfunction!(run_copy_py, module)?)?;
    module.add_function(wrap_pyfunction!(normalize_extensions_py, module)?)?;
    module.add_function(wrap_pyfunction!(merge_extension_py, module)?)?;
    module.add("COMMON_EXTENSIONS", TUP_COMMON_EXTENSIONS.to_vec())?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
