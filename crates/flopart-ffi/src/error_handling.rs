//! Status reporting and panic capture for the C entry points.

use crate::types::{ErrorCode, FlopartStatus};
use flopart_core::FlopartError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Initialize status output to success.
///
/// # Safety
/// The status pointer must be valid if non-null.
#[inline]
pub unsafe fn init_status(out_status: *mut FlopartStatus) {
    if !out_status.is_null() {
        *out_status = FlopartStatus::success();
    }
}

/// Set an error on the output status pointer.
///
/// # Safety
/// The status pointer must be valid if non-null.
#[inline]
pub unsafe fn set_status(out_status: *mut FlopartStatus, code: ErrorCode, message: &str) {
    if !out_status.is_null() {
        (*out_status).set_error(code, message);
    }
}

/// Check if any of the given pointers are null, and set an error if so.
///
/// # Safety
/// The status pointer must be valid if non-null.
#[inline]
pub unsafe fn check_null_pointers(
    out_status: *mut FlopartStatus,
    ptrs: &[(*const core::ffi::c_void, &str)],
) -> bool {
    for (ptr, name) in ptrs {
        if ptr.is_null() {
            set_status(
                out_status,
                ErrorCode::NullPointer,
                &format!("Null pointer argument: {name}"),
            );
            return true;
        }
    }
    false
}

/// Run `f`, reporting errors and panics through `out_status`.
///
/// # Safety
/// The status pointer must be valid if non-null.
///
/// # Returns
/// `Some(value)` on success, `None` on error
pub unsafe fn ffi_try<F, T>(out_status: *mut FlopartStatus, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, FlopartError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            set_status(out_status, ErrorCode::from(&e), &e.to_string());
            None
        }
        Err(_) => {
            set_status(out_status, ErrorCode::PanicCaught, "Panic in Rust code");
            None
        }
    }
}
