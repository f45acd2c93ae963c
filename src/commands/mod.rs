//! Command implementations for pxstream.

pub mod generate;
pub mod locate;
pub mod read;

pub use generate::{GenerateCommand, GenerateStats};
pub use locate::LocateCommand;
pub use read::{parse_index_list, ReadCommand, ReadStats};
