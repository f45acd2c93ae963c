//! Syntax and reader configuration.
//!
//! The PX format fixes most of its punctuation, but the entry separator and
//! the data keyword can differ between producers, so they are carried here
//! instead of being hard-coded in the scanners.

use crate::streaming::buffers::DEFAULT_READ_BUFFER;

/// Punctuation of the PX file format relevant to the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxConfig {
    /// Ends a metadata entry and the data section (default `;`).
    pub entry_separator: u8,
    /// Separates a keyword from its value (default `=`).
    pub keyword_separator: u8,
    /// Delimits quoted strings (default `"`).
    pub quote: u8,
    /// Keyword that introduces the data section (default `DATA`).
    pub data_keyword: String,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxConfig {
    pub fn new() -> Self {
        Self {
            entry_separator: b';',
            keyword_separator: b'=',
            quote: b'"',
            data_keyword: "DATA".to_string(),
        }
    }

    /// Set the entry separator byte.
    pub fn with_entry_separator(mut self, sep: u8) -> Self {
        self.entry_separator = sep;
        self
    }

    /// Set the keyword that marks the data section.
    pub fn with_data_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.data_keyword = keyword.into();
        self
    }
}

/// Configuration for a [`crate::streaming::DataReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub syntax: SyntaxConfig,
    /// Size of the chunks read from the underlying stream.
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self {
            syntax: SyntaxConfig::default(),
            buffer_size: DEFAULT_READ_BUFFER,
        }
    }

    /// Set the chunk size. Values below one byte are clamped to one.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_syntax(mut self, syntax: SyntaxConfig) -> Self {
        self.syntax = syntax;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_syntax() {
        let syntax = SyntaxConfig::default();
        assert_eq!(syntax.entry_separator, b';');
        assert_eq!(syntax.keyword_separator, b'=');
        assert_eq!(syntax.quote, b'"');
        assert_eq!(syntax.data_keyword, "DATA");
    }

    #[test]
    fn test_buffer_size_clamped() {
        let config = ReaderConfig::new().with_buffer_size(0);
        assert_eq!(config.buffer_size, 1);

        let config = ReaderConfig::new().with_buffer_size(16);
        assert_eq!(config.buffer_size, 16);
    }

    #[test]
    fn test_builders() {
        let config = ReaderConfig::new().with_syntax(
            SyntaxConfig::new()
                .with_entry_separator(b'!')
                .with_data_keyword("DATA2"),
        );
        assert_eq!(config.syntax.entry_separator, b'!');
        assert_eq!(config.syntax.data_keyword, "DATA2");
    }
}
