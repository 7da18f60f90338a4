//! C-compatible type definitions for the FFI boundary.

use flopart_core::{FlopartError, Segment, SegmentStatus};
use libc::{c_char, c_double, size_t};

/// Error codes for the FFI boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    InvalidInput = 2,
    /// Every count is identical; no output is written.
    DegenerateInput = 3,
    InfeasibleLabeling = 4,
    InvalidParameter = 5,
    InvalidLabel = 6,
    AllocationError = 7,
    PanicCaught = 8,
}

impl From<&FlopartError> for ErrorCode {
    fn from(err: &FlopartError) -> Self {
        match err {
            FlopartError::DegenerateInput { .. } => ErrorCode::DegenerateInput,
            FlopartError::InfeasibleLabeling { .. } => ErrorCode::InfeasibleLabeling,
            FlopartError::InvalidInput(_) => ErrorCode::InvalidInput,
            FlopartError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            FlopartError::InvalidLabel { .. } => ErrorCode::InvalidLabel,
        }
    }
}

/// Status structure with message buffer for FFI.
#[repr(C)]
pub struct FlopartStatus {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl FlopartStatus {
    /// Create a success status (no error).
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    /// Set an error with code and message.
    pub fn set_error(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(255);
        for (i, &b) in bytes[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0; // Null terminator
    }

    /// Message as a Rust string, up to the first NUL.
    pub fn message_str(&self) -> String {
        let bytes: Vec<u8> = self
            .message
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for FlopartStatus {
    fn default() -> Self {
        Self::success()
    }
}

/// One segment of the forward-order segment table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRow {
    /// First data index (inclusive).
    pub start: size_t,
    /// Last data index (inclusive).
    pub end: size_t,
    pub mean: c_double,
    /// True for segments reached by an upward change.
    pub is_peak: bool,
}

impl From<&Segment> for SegmentRow {
    fn from(segment: &Segment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            mean: segment.mean,
            is_peak: segment.status == SegmentStatus::Peak,
        }
    }
}

/// Segment table allocated by Rust; release with `flopart_free_segments_result`.
#[repr(C)]
pub struct SegmentsResult {
    pub segments: *mut SegmentRow,
    pub n_segments: size_t,
    pub n_peaks: size_t,
    /// Penalized cost on the scale of the weighted data.
    pub total_cost: c_double,
}

impl Default for SegmentsResult {
    fn default() -> Self {
        Self {
            segments: std::ptr::null_mut(),
            n_segments: 0,
            n_peaks: 0,
            total_cost: f64::NAN,
        }
    }
}
