//! Memory helpers for arrays crossing the C boundary.

use crate::types::{ErrorCode, FlopartStatus};
use libc::{free, malloc};
use std::ptr;

/// Copy `items` into a caller-allocated array of the same length.
///
/// # Safety
/// `dst` must point to at least `items.len()` writable elements.
#[inline]
pub unsafe fn copy_to_caller<T: Copy>(items: &[T], dst: *mut T) {
    if !items.is_empty() {
        ptr::copy_nonoverlapping(items.as_ptr(), dst, items.len());
    }
}

/// Allocate and copy an array, setting error on failure.
///
/// # Safety
/// out_ptr must be a valid pointer; out_status must be valid if non-null.
/// Returns true on success, false on allocation failure.
pub unsafe fn alloc_and_copy_array<T: Copy>(
    items: &[T],
    out_ptr: *mut *mut T,
    out_status: *mut FlopartStatus,
) -> bool {
    if items.is_empty() {
        *out_ptr = ptr::null_mut();
        return true;
    }

    let ptr = malloc(std::mem::size_of_val(items)) as *mut T;
    if ptr.is_null() {
        if !out_status.is_null() {
            (*out_status).set_error(ErrorCode::AllocationError, "Memory allocation failed");
        }
        return false;
    }

    ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len());
    *out_ptr = ptr;
    true
}

/// Free a pointer obtained from [`alloc_and_copy_array`].
///
/// # Safety
/// ptr must be either null or a valid pointer allocated by malloc.
#[inline]
pub unsafe fn free_ptr(ptr: *mut core::ffi::c_void) {
    if !ptr.is_null() {
        free(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_to_caller() {
        let mut out = [0i32; 3];
        unsafe { copy_to_caller(&[4, -1, 7], out.as_mut_ptr()) };
        assert_eq!(out, [4, -1, 7]);
    }

    #[test]
    fn test_alloc_and_copy_roundtrip() {
        let mut status = FlopartStatus::default();
        let mut raw: *mut f64 = ptr::null_mut();
        let ok = unsafe { alloc_and_copy_array(&[1.5, 2.5], &mut raw, &mut status) };
        assert!(ok);
        assert!(!raw.is_null());
        unsafe {
            assert_eq!(std::slice::from_raw_parts(raw, 2), &[1.5, 2.5]);
            free_ptr(raw as *mut core::ffi::c_void);
        }

        let ok = unsafe { alloc_and_copy_array::<f64>(&[], &mut raw, &mut status) };
        assert!(ok);
        assert!(raw.is_null());
    }
}
