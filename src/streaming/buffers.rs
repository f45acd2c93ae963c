//! Buffer size constants for streaming operations.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.

/// Default chunk size for reading the data section (4 KB).
/// Matches the page size so a seek followed by a read stays cheap.
pub const DEFAULT_READ_BUFFER: usize = 4 * 1024;

/// Large chunk size (256 KB) for whole-file scans such as the CLI `read` command.
pub const LARGE_READ_BUFFER: usize = 256 * 1024;

/// Default chunk size used when searching for a keyword (4 KB).
pub const DEFAULT_KEYWORD_BUFFER: usize = 4 * 1024;

/// Longest single cell token the reader will accumulate (64 bytes).
/// The longest missing symbol is 8 bytes; numbers rarely exceed 24.
pub const MAX_TOKEN_LEN: usize = 64;

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Low-memory output buffer size (256 KB).
pub const LOW_MEMORY_OUTPUT_BUFFER: usize = 256 * 1024;

/// Returns the appropriate input chunk size based on low_memory flag.
#[inline]
pub const fn input_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        DEFAULT_READ_BUFFER
    } else {
        LARGE_READ_BUFFER
    }
}

/// Returns the appropriate output buffer size based on low_memory flag.
#[inline]
pub const fn output_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_OUTPUT_BUFFER
    } else {
        DEFAULT_OUTPUT_BUFFER
    }
}
