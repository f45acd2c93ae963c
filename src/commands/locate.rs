//! Locate a keyword entry in a PX file.

use crate::config::SyntaxConfig;
use crate::error::{PxError, Result};
use crate::streaming::buffers::DEFAULT_KEYWORD_BUFFER;
use crate::streaming::find_keyword_position;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Finds the byte offset right after `KEYWORD=`.
#[derive(Debug, Clone)]
pub struct LocateCommand {
    pub keyword: String,
    pub buffer_size: usize,
    syntax: SyntaxConfig,
}

impl Default for LocateCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl LocateCommand {
    pub fn new() -> Self {
        let syntax = SyntaxConfig::default();
        Self {
            keyword: syntax.data_keyword.clone(),
            buffer_size: DEFAULT_KEYWORD_BUFFER,
            syntax,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_syntax(mut self, syntax: SyntaxConfig) -> Self {
        self.syntax = syntax;
        self
    }

    /// Locate the keyword in a file.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let file = File::open(path)?;
        self.locate(file)
    }

    /// Locate the keyword in any byte stream, counting from its current position.
    pub fn locate<R: Read>(&self, mut reader: R) -> Result<u64> {
        find_keyword_position(&mut reader, &self.keyword, &self.syntax, self.buffer_size)?
            .ok_or_else(|| PxError::KeywordNotFound(self.keyword.clone()))
    }
}
