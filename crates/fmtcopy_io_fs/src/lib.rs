//! `fmtcopy_io_fs` v1:
//! Filtered file-enumeration and copy engine.
//!
//! Modules:
//! - `conf`      : shared constants
//! - `spec`      : enums/options/requests/errors
//! - `enumerate` : source traversal and filename filtering
//! - `copy`      : run validation and the sequential copy loop
//! - `handle`    : background worker and run handle
//! - `report`    : run-time report model and events
//! - `util`      : shared helper functions

pub mod conf;
pub mod copy;
pub mod enumerate;
pub mod handle;
pub mod report;
pub mod spec;
mod util;

#[cfg(test)]
mod test_util;

pub use conf::TUP_COMMON_EXTENSIONS;
pub use copy::{execute_copy, prepare_run_paths, run_copy};
pub use enumerate::{SpecEnumeration, enumerate_files, enumerate_with_filter};
pub use handle::{RunHandle, start_copy};
pub use report::{ReportRun, ReportRunBuilder, SpecRunEvent};
pub use spec::{
    CopyRunError, EnumFilterMode, EnumItemKind, EnumNamePatternMode, SpecCopyError,
    SpecCopyOptions, SpecFileEntry, SpecFilter, SpecRunRequest,
};
pub use util::{FileFilter, merge_extension, normalize_extensions};
