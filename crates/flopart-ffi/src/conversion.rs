//! Conversion of raw C inputs into core types.

use core::ffi::{c_double, c_int};

use flopart_core::{FlopartError, Label, LabelKind, Result};

/// View a caller array as a slice; a zero length accepts a null pointer.
///
/// # Safety
/// When `len > 0`, `ptr` must point to `len` readable elements.
#[inline]
pub unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 || ptr.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

/// Convert C integer counts, rejecting negative values.
pub fn counts_from_c(values: &[c_int]) -> Result<Vec<u32>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            u32::try_from(v).map_err(|_| {
                FlopartError::InvalidInput(format!("count at index {i} is negative ({v})"))
            })
        })
        .collect()
}

/// Copy C weights; a null pointer means unit weights.
///
/// # Safety
/// `weights` must be null or point to `data_count` readable doubles.
pub unsafe fn weights_from_c(weights: *const c_double, data_count: usize) -> Vec<f64> {
    if weights.is_null() {
        vec![1.0; data_count]
    } else {
        raw_slice(weights, data_count).to_vec()
    }
}

/// Assemble labels from parallel start/end/type arrays.
///
/// Type codes are 1 (peakStart), 0 (noPeak) and -1 (peakEnd).
pub fn labels_from_c(starts: &[c_int], ends: &[c_int], types: &[c_int]) -> Result<Vec<Label>> {
    starts
        .iter()
        .zip(ends)
        .zip(types)
        .enumerate()
        .map(|(index, ((&start, &end), &code))| {
            let invalid = |reason: String| FlopartError::InvalidLabel { index, reason };
            let start = usize::try_from(start)
                .map_err(|_| invalid(format!("negative start {start}")))?;
            let end = usize::try_from(end).map_err(|_| invalid(format!("negative end {end}")))?;
            let kind = LabelKind::try_from(code).map_err(|e| invalid(e.to_string()))?;
            Ok(Label::new(start, end, kind))
        })
        .collect()
}
