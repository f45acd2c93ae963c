//! Keyword search over a PX byte stream.
//!
//! Finds the position just after `KEYWORD=` without buffering the whole
//! metadata section. The stream is read in fixed-size chunks and scanned
//! with a small state machine:
//!
//! - a keyword can only start an entry (stream start, or after the entry
//!   separator), optionally preceded by whitespace
//! - whitespace between the keyword and `=` is ignored
//! - any mismatch abandons the entry; the scan skips to the next entry
//!   separator, stepping over quoted strings so that a `;` inside quotes
//!   does not end the entry

use crate::config::SyntaxConfig;
use crate::error::{PxError, Result};
use memchr::{memchr, memchr2};
use std::io::{ErrorKind, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    EntryStart,
    Keyword(usize),
    AfterKeyword,
    SkipEntry,
    InQuote,
}

#[inline(always)]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Search `reader` for `keyword` followed by the keyword separator.
///
/// Returns the byte offset, relative to the reader's starting position, of
/// the first byte after the separator, or `None` if the stream ends first.
pub fn find_keyword_position<R: Read>(
    reader: &mut R,
    keyword: &str,
    syntax: &SyntaxConfig,
    buffer_size: usize,
) -> Result<Option<u64>> {
    let keyword = keyword.as_bytes();
    if keyword.is_empty() {
        return Err(PxError::InvalidRequest("empty keyword".to_string()));
    }
    let quote = syntax.quote;
    let entry_sep = syntax.entry_separator;

    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut base: u64 = 0;
    let mut state = State::EntryStart;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let chunk = &buf[..n];
        let mut i = 0;

        while i < n {
            let b = chunk[i];
            match state {
                State::EntryStart => {
                    if is_whitespace(b) || b == entry_sep {
                        i += 1;
                    } else if b == keyword[0] {
                        state = if keyword.len() == 1 {
                            State::AfterKeyword
                        } else {
                            State::Keyword(1)
                        };
                        i += 1;
                    } else {
                        // Re-examine this byte: it may open a quote.
                        state = State::SkipEntry;
                    }
                }
                State::Keyword(matched) => {
                    if b == keyword[matched] {
                        state = if matched + 1 == keyword.len() {
                            State::AfterKeyword
                        } else {
                            State::Keyword(matched + 1)
                        };
                        i += 1;
                    } else {
                        state = State::SkipEntry;
                    }
                }
                State::AfterKeyword => {
                    if b == syntax.keyword_separator {
                        return Ok(Some(base + i as u64 + 1));
                    } else if is_whitespace(b) {
                        i += 1;
                    } else {
                        state = State::SkipEntry;
                    }
                }
                State::SkipEntry => match memchr2(quote, entry_sep, &chunk[i..]) {
                    Some(off) => {
                        i += off + 1;
                        state = if chunk[i - 1] == quote {
                            State::InQuote
                        } else {
                            State::EntryStart
                        };
                    }
                    None => i = n,
                },
                State::InQuote => match memchr(quote, &chunk[i..]) {
                    Some(off) => {
                        i += off + 1;
                        state = State::SkipEntry;
                    }
                    None => i = n,
                },
            }
        }

        base += n as u64;
    }
}
