//! Constants shared by the engine and its front-ends.

/// Quick-pick extensions offered by front-ends.
pub const TUP_COMMON_EXTENSIONS: [&str; 8] = [
    ".txt", ".docx", ".xlsx", ".pdf", ".jpg", ".png", ".csv", ".zip",
];

/// Suffix of the hidden sibling file a copy is staged in before rename.
pub const C_PARTIAL_SUFFIX: &str = ".fmtcopy-part";

/// Name of the background worker thread.
pub const C_WORKER_THREAD_NAME: &str = "fmtcopy-worker";
