//! C ABI for labeled Poisson segmentation.
//!
//! Every entry point reports failures through a [`FlopartStatus`] and returns
//! `false`; no panic crosses the boundary. Outputs are written only on success.

pub mod allocation;
pub mod conversion;
pub mod error_handling;
pub mod types;

use core::ffi::c_void;
use libc::{c_double, c_int, size_t};

use flopart_core::{flopart, FlopartOptions, FlopartResult, Label, Result};

use crate::allocation::{alloc_and_copy_array, copy_to_caller, free_ptr};
use crate::conversion::{counts_from_c, labels_from_c, raw_slice, weights_from_c};
use crate::error_handling::{check_null_pointers, ffi_try, init_status};

pub use types::*;

// ============================================================================
// Helper Functions
// ============================================================================

/// Read the raw inputs and run the segmentation.
///
/// # Safety
/// Non-null pointers must reference arrays of the stated lengths.
#[allow(clippy::too_many_arguments)]
unsafe fn run_from_raw(
    counts: *const c_int,
    weights: *const c_double,
    data_count: size_t,
    penalty: c_double,
    label_starts: *const c_int,
    label_ends: *const c_int,
    label_types: *const c_int,
    label_count: size_t,
) -> Result<FlopartResult> {
    let counts = counts_from_c(raw_slice(counts, data_count))?;
    let weights = weights_from_c(weights, data_count);
    let labels: Vec<Label> = labels_from_c(
        raw_slice(label_starts, label_count),
        raw_slice(label_ends, label_count),
        raw_slice(label_types, label_count),
    )?;
    flopart(&counts, &weights, &labels, &FlopartOptions::new(penalty))
}

/// Null checks shared by the entry points; label arrays may be null without labels.
unsafe fn inputs_missing(
    out_status: *mut FlopartStatus,
    counts: *const c_int,
    label_starts: *const c_int,
    label_ends: *const c_int,
    label_types: *const c_int,
    label_count: size_t,
) -> bool {
    if check_null_pointers(out_status, &[(counts as *const c_void, "counts")]) {
        return true;
    }
    label_count > 0
        && check_null_pointers(
            out_status,
            &[
                (label_starts as *const c_void, "label_starts"),
                (label_ends as *const c_void, "label_ends"),
                (label_types as *const c_void, "label_types"),
            ],
        )
}

// ============================================================================
// Segmentation
// ============================================================================

/// Labeled segmentation filling caller-allocated arrays.
///
/// `weights` may be null for unit weights. Label type codes are 1 (peakStart),
/// 0 (noPeak) and -1 (peakEnd). `out_cost_mat` and `out_intervals_mat` hold
/// `2 * data_count` values (up column, then down column); `out_end_vec` and
/// `out_mean_vec` hold `data_count` values, padded with -2 and +inf after the
/// decoded segments.
///
/// # Safety
/// All non-null pointers must reference arrays of the stated lengths.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn flopart_segment(
    counts: *const c_int,
    weights: *const c_double,
    data_count: size_t,
    penalty: c_double,
    label_starts: *const c_int,
    label_ends: *const c_int,
    label_types: *const c_int,
    label_count: size_t,
    out_cost_mat: *mut c_double,
    out_end_vec: *mut c_int,
    out_mean_vec: *mut c_double,
    out_intervals_mat: *mut c_int,
    out_status: *mut FlopartStatus,
) -> bool {
    init_status(out_status);

    if inputs_missing(out_status, counts, label_starts, label_ends, label_types, label_count)
        || check_null_pointers(
            out_status,
            &[
                (out_cost_mat as *const c_void, "out_cost_mat"),
                (out_end_vec as *const c_void, "out_end_vec"),
                (out_mean_vec as *const c_void, "out_mean_vec"),
                (out_intervals_mat as *const c_void, "out_intervals_mat"),
            ],
        )
    {
        return false;
    }

    let Some(result) = ffi_try(out_status, || {
        run_from_raw(
            counts,
            weights,
            data_count,
            penalty,
            label_starts,
            label_ends,
            label_types,
            label_count,
        )
    }) else {
        return false;
    };

    copy_to_caller(&result.cost_matrix(), out_cost_mat);
    copy_to_caller(&result.end_vec(), out_end_vec);
    copy_to_caller(&result.mean_vec(), out_mean_vec);
    copy_to_caller(&result.intervals_matrix(), out_intervals_mat);
    true
}

/// Labeled segmentation returning a forward-order segment table.
///
/// Free the table with [`flopart_free_segments_result`].
///
/// # Safety
/// All non-null pointers must reference arrays of the stated lengths.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn flopart_segments_table(
    counts: *const c_int,
    weights: *const c_double,
    data_count: size_t,
    penalty: c_double,
    label_starts: *const c_int,
    label_ends: *const c_int,
    label_types: *const c_int,
    label_count: size_t,
    out_result: *mut SegmentsResult,
    out_status: *mut FlopartStatus,
) -> bool {
    init_status(out_status);

    if inputs_missing(out_status, counts, label_starts, label_ends, label_types, label_count)
        || check_null_pointers(out_status, &[(out_result as *const c_void, "out_result")])
    {
        return false;
    }
    *out_result = SegmentsResult::default();

    let Some(result) = ffi_try(out_status, || {
        run_from_raw(
            counts,
            weights,
            data_count,
            penalty,
            label_starts,
            label_ends,
            label_types,
            label_count,
        )
    }) else {
        return false;
    };

    let rows: Vec<SegmentRow> = result.segments().iter().map(SegmentRow::from).collect();
    let mut table = SegmentsResult {
        segments: std::ptr::null_mut(),
        n_segments: rows.len(),
        n_peaks: rows.iter().filter(|r| r.is_peak).count(),
        total_cost: result.total_cost(),
    };
    if !alloc_and_copy_array(&rows, &mut table.segments, out_status) {
        return false;
    }
    *out_result = table;
    true
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a segment table.
///
/// # Safety
/// The result pointer must be null or point to a table filled by
/// [`flopart_segments_table`].
#[no_mangle]
pub unsafe extern "C" fn flopart_free_segments_result(result: *mut SegmentsResult) {
    if result.is_null() {
        return;
    }
    let r = &mut *result;
    free_ptr(r.segments as *mut c_void);
    r.segments = std::ptr::null_mut();
    r.n_segments = 0;
    r.n_peaks = 0;
}
