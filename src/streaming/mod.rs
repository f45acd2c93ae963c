//! Streaming access to the PX data section.
//!
//! This module provides the I/O path of the crate:
//! - Zero-allocation cell value parsing
//! - Keyword location over chunked streams
//! - Selective, resumable cell decoding
//! - Efficient output formatting
//!
//! Readers hold one chunk buffer and one token buffer regardless of input size.

pub mod buffers;
pub mod locator;
pub mod output;
pub mod parsing;
pub mod reader;

pub use locator::find_keyword_position;
pub use output::ValueWriter;
pub use parsing::{
    parse_decimal_data_value, parse_double_data_value, parse_missing_token, parse_unsafe_double,
    recognize_token, CellDecoder, DecimalDecoder, DoubleDecoder, NumericToken, RecognizedToken,
    UnsafeDoubleDecoder,
};
#[cfg(feature = "async")]
pub use reader::ReadBatch;
pub use reader::{DataReader, ScanState};
