//! Streaming reader for the PX data section.
//!
//! [`DataReader`] decodes only the requested cells of a data section,
//! scanning the stream forward exactly once across any number of calls.
//!
//! # Grammar
//!
//! - space or tab separates cells (runs collapse)
//! - CR and/or LF ends a row; empty lines are ignored
//! - the entry separator (default `;`) or end of stream ends the section
//!
//! # Cross-call contract
//!
//! Each call names ascending row and column indices. The reader keeps its
//! file-relative row/column cursor, its chunk buffer and any partially
//! scanned token in a [`ScanState`], so a later call resumes where the
//! previous one stopped. A call whose first requested cell lies before the
//! cursor is rejected with [`PxError::InvalidRequest`].
//!
//! A reader that fails while scanning (bad token, short row, section too
//! short, cancellation, I/O) is poisoned and must be discarded.

use crate::cancel::CancellationToken;
use crate::config::ReaderConfig;
use crate::error::{PxError, Result};
use crate::streaming::buffers::MAX_TOKEN_LEN;
use crate::streaming::locator::find_keyword_position;
use crate::streaming::parsing::{CellDecoder, DecimalDecoder, DoubleDecoder, UnsafeDoubleDecoder};
use crate::value::{DecimalDataValue, DoubleDataValue, MissingValueEncodings};
use memchr::memchr3;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Cursor state carried between reads on one [`DataReader`].
#[derive(Debug, Clone)]
pub struct ScanState {
    row: usize,
    col: usize,
    row_has_cells: bool,
    in_token: bool,
    capture: bool,
    skip_row: bool,
    token: [u8; MAX_TOKEN_LEN],
    token_len: usize,
    buf: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
    ended: bool,
    poisoned: bool,
}

/// Progress through the caller's row/column lists within one call.
struct Request<'a> {
    rows: &'a [usize],
    cols: &'a [usize],
    ri: usize,
    ci: usize,
    written: usize,
    total: usize,
}

impl Request<'_> {
    #[inline]
    fn is_done(&self) -> bool {
        self.written == self.total
    }

    #[inline]
    fn wants_row(&self, row: usize) -> bool {
        self.ri < self.rows.len() && self.rows[self.ri] == row
    }
}

impl ScanState {
    fn new(buffer_size: usize) -> Self {
        Self {
            row: 0,
            col: 0,
            row_has_cells: false,
            in_token: false,
            capture: false,
            skip_row: false,
            token: [0; MAX_TOKEN_LEN],
            token_len: 0,
            buf: vec![0; buffer_size.max(1)],
            buf_pos: 0,
            buf_len: 0,
            ended: false,
            poisoned: false,
        }
    }

    /// Data row of the scan head.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Cells already passed in the current row.
    pub fn col(&self) -> usize {
        self.col
    }

    /// True once the section terminator or end of stream has been reached.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn format_error(&self, message: String) -> PxError {
        PxError::Format {
            row: self.row,
            col: self.col,
            message,
        }
    }

    /// Refill the chunk buffer. Returns false at end of stream.
    fn refill<R: Read>(&mut self, stream: &mut R) -> Result<bool> {
        loop {
            match stream.read(&mut self.buf) {
                Ok(n) => {
                    self.buf_pos = 0;
                    self.buf_len = n;
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn end_token<D: CellDecoder>(
        &mut self,
        req: &mut Request<'_>,
        dest: &mut [D::Output],
        offset: usize,
        decoder: &D,
    ) -> Result<()> {
        self.in_token = false;
        if self.capture {
            self.capture = false;
            let value = decoder
                .decode(&self.token[..self.token_len])
                .map_err(|e| self.format_error(e.to_string()))?;
            dest[offset + req.written] = value;
            req.written += 1;
            req.ci += 1;
            if req.ci == req.cols.len() {
                req.ci = 0;
                req.ri += 1;
            }
        }
        self.col += 1;
        Ok(())
    }

    fn end_row(&mut self, req: &Request<'_>) -> Result<()> {
        if !self.row_has_cells {
            return Ok(());
        }
        if !req.is_done() && req.wants_row(self.row) {
            return Err(self.format_error(format!(
                "row has {} cells but column {} was requested",
                self.col, req.cols[req.ci]
            )));
        }
        self.row += 1;
        self.col = 0;
        self.row_has_cells = false;
        Ok(())
    }

    fn end_section(&mut self, req: &Request<'_>) -> Result<()> {
        self.ended = true;
        if req.is_done() {
            Ok(())
        } else {
            Err(PxError::OutOfRange(format!(
                "data section ended at row {} with {} of {} requested cells read",
                self.row, req.written, req.total
            )))
        }
    }

    fn scan<R: Read, D: CellDecoder>(
        &mut self,
        stream: &mut R,
        terminator: u8,
        dest: &mut [D::Output],
        offset: usize,
        req: &mut Request<'_>,
        decoder: &D,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.ended {
            return self.end_section(req);
        }

        loop {
            if self.buf_pos == self.buf_len {
                cancel.check()?;
                if !self.refill(stream)? {
                    // End of stream closes the section like the terminator.
                    if self.in_token {
                        self.end_token(req, dest, offset, decoder)?;
                    }
                    self.end_row(req)?;
                    return self.end_section(req);
                }
            }

            if self.skip_row {
                let rest = &self.buf[self.buf_pos..self.buf_len];
                match memchr3(b'\n', b'\r', terminator, rest) {
                    Some(off) => {
                        self.buf_pos += off;
                        self.skip_row = false;
                        self.in_token = false;
                    }
                    None => self.buf_pos = self.buf_len,
                }
                continue;
            }

            let b = self.buf[self.buf_pos];
            match b {
                b' ' | b'\t' => {
                    self.buf_pos += 1;
                    if self.in_token {
                        self.end_token(req, dest, offset, decoder)?;
                        if req.is_done() {
                            return Ok(());
                        }
                    }
                }
                b'\r' | b'\n' => {
                    self.buf_pos += 1;
                    if self.in_token {
                        self.end_token(req, dest, offset, decoder)?;
                    }
                    self.end_row(req)?;
                    if req.is_done() {
                        return Ok(());
                    }
                }
                _ if b == terminator => {
                    self.buf_pos += 1;
                    if self.in_token {
                        self.end_token(req, dest, offset, decoder)?;
                    }
                    self.end_row(req)?;
                    return self.end_section(req);
                }
                _ => {
                    if !self.in_token {
                        self.in_token = true;
                        self.row_has_cells = true;
                        self.token_len = 0;
                        if !req.wants_row(self.row) {
                            self.skip_row = true;
                            continue;
                        }
                        self.capture = self.col == req.cols[req.ci];
                    }
                    if self.capture {
                        if self.token_len == MAX_TOKEN_LEN {
                            return Err(self.format_error(format!(
                                "cell token longer than {} bytes",
                                MAX_TOKEN_LEN
                            )));
                        }
                        self.token[self.token_len] = b;
                        self.token_len += 1;
                    }
                    self.buf_pos += 1;
                }
            }
        }
    }
}

fn check_ascending(name: &str, list: &[usize]) -> Result<()> {
    if let Some(w) = list.windows(2).find(|w| w[0] >= w[1]) {
        return Err(PxError::InvalidRequest(format!(
            "{} must be strictly ascending ({} followed by {})",
            name, w[0], w[1]
        )));
    }
    Ok(())
}

/// Selective decoder over the data section of a PX stream.
pub struct DataReader<R> {
    stream: R,
    config: ReaderConfig,
    data_start: Option<u64>,
    positioned: bool,
    state: ScanState,
}

impl<R: Read + Seek> DataReader<R> {
    /// Create a reader that locates the data section on first use.
    pub fn new(stream: R) -> Self {
        Self::with_config(stream, ReaderConfig::default())
    }

    /// Create a reader with a known data section start offset.
    pub fn with_data_start(stream: R, data_start: u64) -> Self {
        let mut reader = Self::new(stream);
        reader.data_start = Some(data_start);
        reader
    }

    /// Create a reader with custom syntax or buffer size.
    pub fn with_config(stream: R, config: ReaderConfig) -> Self {
        Self {
            state: ScanState::new(config.buffer_size),
            stream,
            config,
            data_start: None,
            positioned: false,
        }
    }

    /// Set the data section start offset on a reader built with a config.
    pub fn data_start(mut self, offset: u64) -> Self {
        self.data_start = Some(offset);
        self
    }

    /// Byte offset of the data section, if resolved or supplied.
    pub fn data_start_offset(&self) -> Option<u64> {
        self.data_start
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    fn ensure_positioned(&mut self) -> Result<()> {
        if self.positioned {
            return Ok(());
        }
        let start = match self.data_start {
            Some(start) => start,
            None => {
                self.stream.seek(SeekFrom::Start(0))?;
                let syntax = &self.config.syntax;
                let start = find_keyword_position(
                    &mut self.stream,
                    &syntax.data_keyword,
                    syntax,
                    self.config.buffer_size,
                )?
                .ok_or_else(|| PxError::KeywordNotFound(syntax.data_keyword.clone()))?;
                debug!(offset = start, "resolved data section start");
                self.data_start = Some(start);
                start
            }
        };
        self.stream.seek(SeekFrom::Start(start))?;
        self.positioned = true;
        Ok(())
    }

    fn validate_request(
        &self,
        dest_len: usize,
        offset: usize,
        rows: &[usize],
        cols: &[usize],
    ) -> Result<()> {
        check_ascending("rows", rows)?;
        check_ascending("cols", cols)?;
        let needed = rows
            .len()
            .checked_mul(cols.len())
            .and_then(|cells| cells.checked_add(offset))
            .ok_or_else(|| {
                PxError::Shape(format!(
                    "{} rows of {} columns past offset {} overflow usize",
                    rows.len(),
                    cols.len(),
                    offset
                ))
            })?;
        if dest_len < needed {
            return Err(PxError::Shape(format!(
                "destination holds {} values but {} are needed",
                dest_len, needed
            )));
        }
        if let (Some(&r), Some(&c)) = (rows.first(), cols.first()) {
            if (r, c) < (self.state.row, self.state.col) {
                return Err(PxError::InvalidRequest(format!(
                    "cell ({}, {}) lies before the reader position ({}, {})",
                    r, c, self.state.row, self.state.col
                )));
            }
        }
        Ok(())
    }

    /// Decode the cells at `rows` x `cols` into `dest[offset..]`, row-major.
    ///
    /// Returns the number of cells written.
    pub fn read_values<D: CellDecoder>(
        &mut self,
        dest: &mut [D::Output],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
        decoder: &D,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if self.state.poisoned {
            return Err(PxError::ReaderPoisoned);
        }
        if cancel.is_cancelled() {
            self.state.poisoned = true;
            return Err(PxError::Cancelled);
        }
        self.validate_request(dest.len(), offset, rows, cols)?;
        if rows.is_empty() || cols.is_empty() {
            return Ok(0);
        }

        let mut req = Request {
            rows,
            cols,
            ri: 0,
            ci: 0,
            written: 0,
            total: rows.len() * cols.len(),
        };
        let terminator = self.config.syntax.entry_separator;
        let result = self.ensure_positioned().and_then(|_| {
            self.state.scan(
                &mut self.stream,
                terminator,
                dest,
                offset,
                &mut req,
                decoder,
                cancel,
            )
        });

        match result {
            Ok(()) => {
                trace!(
                    cells = req.written,
                    row = self.state.row,
                    col = self.state.col,
                    "read data cells"
                );
                Ok(req.written)
            }
            Err(e) => {
                self.state.poisoned = true;
                Err(e)
            }
        }
    }

    pub fn read_double_values(
        &mut self,
        dest: &mut [DoubleDataValue],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
    ) -> Result<usize> {
        self.read_double_values_cancellable(dest, offset, rows, cols, &CancellationToken::new())
    }

    pub fn read_double_values_cancellable(
        &mut self,
        dest: &mut [DoubleDataValue],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.read_values(dest, offset, rows, cols, &DoubleDecoder, cancel)
    }

    pub fn read_decimal_values(
        &mut self,
        dest: &mut [DecimalDataValue],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
    ) -> Result<usize> {
        self.read_decimal_values_cancellable(dest, offset, rows, cols, &CancellationToken::new())
    }

    pub fn read_decimal_values_cancellable(
        &mut self,
        dest: &mut [DecimalDataValue],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.read_values(dest, offset, rows, cols, &DecimalDecoder, cancel)
    }

    /// Decode into raw doubles, writing `missing`'s sentinels for missing cells.
    pub fn read_unsafe_doubles(
        &mut self,
        dest: &mut [f64],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
        missing: &MissingValueEncodings,
    ) -> Result<usize> {
        self.read_unsafe_doubles_cancellable(
            dest,
            offset,
            rows,
            cols,
            missing,
            &CancellationToken::new(),
        )
    }

    pub fn read_unsafe_doubles_cancellable(
        &mut self,
        dest: &mut [f64],
        offset: usize,
        rows: &[usize],
        cols: &[usize],
        missing: &MissingValueEncodings,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.read_values(
            dest,
            offset,
            rows,
            cols,
            &UnsafeDoubleDecoder::new(*missing),
            cancel,
        )
    }
}

/// Reader and buffer handed back by the async read methods.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct ReadBatch<R, T> {
    pub reader: DataReader<R>,
    pub values: Vec<T>,
    pub cells: usize,
}

#[cfg(feature = "async")]
impl<R: Read + Seek + Send + 'static> DataReader<R> {
    /// Run [`DataReader::read_values`] on the blocking thread pool.
    ///
    /// The reader and the destination move into the worker and come back in
    /// the returned [`ReadBatch`]. On error both are dropped.
    pub async fn read_values_async<D>(
        mut self,
        mut dest: Vec<D::Output>,
        offset: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        decoder: D,
        cancel: CancellationToken,
    ) -> Result<ReadBatch<R, D::Output>>
    where
        D: CellDecoder + Send + 'static,
        D::Output: Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let cells = self.read_values(&mut dest, offset, &rows, &cols, &decoder, &cancel)?;
            Ok(ReadBatch {
                reader: self,
                values: dest,
                cells,
            })
        })
        .await
        .map_err(|e| PxError::Join(e.to_string()))?
    }

    pub async fn read_double_values_async(
        self,
        dest: Vec<DoubleDataValue>,
        offset: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        cancel: CancellationToken,
    ) -> Result<ReadBatch<R, DoubleDataValue>> {
        self.read_values_async(dest, offset, rows, cols, DoubleDecoder, cancel)
            .await
    }

    pub async fn read_decimal_values_async(
        self,
        dest: Vec<DecimalDataValue>,
        offset: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        cancel: CancellationToken,
    ) -> Result<ReadBatch<R, DecimalDataValue>> {
        self.read_values_async(dest, offset, rows, cols, DecimalDecoder, cancel)
            .await
    }

    pub async fn read_unsafe_doubles_async(
        self,
        dest: Vec<f64>,
        offset: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        missing: MissingValueEncodings,
        cancel: CancellationToken,
    ) -> Result<ReadBatch<R, f64>> {
        self.read_values_async(
            dest,
            offset,
            rows,
            cols,
            UnsafeDoubleDecoder::new(missing),
            cancel,
        )
        .await
    }
}

impl<R> std::fmt::Debug for DataReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("data_start", &self.data_start)
            .field("row", &self.state.row)
            .field("col", &self.state.col)
            .field("ended", &self.state.ended)
            .field("poisoned", &self.state.poisoned)
            .finish()
    }
}
