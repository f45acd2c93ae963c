//! Print selected cells of a PX data section.
//!
//! Cells are decoded one requested row at a time through a single resumable
//! [`DataReader`], so memory use is bounded by the column selection, not by
//! the file.

use crate::config::ReaderConfig;
use crate::error::{PxError, Result};
use crate::streaming::buffers::{input_buffer_size, output_buffer_size};
use crate::streaming::{DataReader, ValueWriter};
use crate::value::{DecimalDataValue, DoubleDataValue};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::time::Instant;

/// Statistics from a read operation.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    pub rows: usize,
    pub cells: usize,
    pub missing: usize,
    pub used_mmap: bool,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for ReadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rows: {}, Cells: {}, Missing: {}, Mmap: {}, Time: {:.3}s",
            self.rows,
            self.cells,
            self.missing,
            if self.used_mmap { "yes" } else { "no" },
            self.elapsed_secs
        )
    }
}

/// Parse a list of indices such as `0,2,5-9` (ranges are inclusive).
pub fn parse_index_list(s: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(PxError::InvalidRequest(format!("empty entry in '{}'", s)));
        }
        let parse = |t: &str| {
            t.trim()
                .parse::<usize>()
                .map_err(|_| PxError::InvalidRequest(format!("invalid index '{}'", t)))
        };
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (parse(lo)?, parse(hi)?);
                if lo > hi {
                    return Err(PxError::InvalidRequest(format!(
                        "range '{}' is descending",
                        part
                    )));
                }
                out.extend(lo..=hi);
            }
            None => out.push(parse(part)?),
        }
    }
    Ok(out)
}

/// Reads a row/column selection and writes it as delimited text.
#[derive(Debug, Clone)]
pub struct ReadCommand {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    /// Decode into exact decimals instead of doubles.
    pub decimal: bool,
    /// Memory-map the input file.
    pub use_mmap: bool,
    pub low_memory: bool,
    pub separator: u8,
    config: Option<ReaderConfig>,
    data_start: Option<u64>,
}

impl ReadCommand {
    pub fn new(rows: Vec<usize>, cols: Vec<usize>) -> Self {
        Self {
            rows,
            cols,
            decimal: false,
            use_mmap: false,
            low_memory: false,
            separator: b'\t',
            config: None,
            data_start: None,
        }
    }

    pub fn with_decimal(mut self, decimal: bool) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Override the reader configuration (otherwise sized by `low_memory`).
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Skip the keyword search and start decoding at this byte offset.
    pub fn with_data_start(mut self, offset: u64) -> Self {
        self.data_start = Some(offset);
        self
    }

    /// Read from a file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, path: P, output: &mut W) -> Result<ReadStats> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        if self.use_mmap && size > 0 {
            let mmap = unsafe { Mmap::map(&file)? };
            let mut stats = self.read(Cursor::new(&mmap[..]), output)?;
            stats.used_mmap = true;
            Ok(stats)
        } else {
            self.read(file, output)
        }
    }

    /// Read from any seekable stream.
    pub fn read<R: Read + Seek, W: Write>(&self, stream: R, output: &mut W) -> Result<ReadStats> {
        let start = Instant::now();
        let config = self.config.clone().unwrap_or_else(|| {
            ReaderConfig::new().with_buffer_size(input_buffer_size(self.low_memory))
        });
        let mut reader = DataReader::with_config(stream, config);
        if let Some(offset) = self.data_start {
            reader = reader.data_start(offset);
        }
        let mut writer = ValueWriter::with_capacity(output_buffer_size(self.low_memory), output);

        let mut stats = if self.decimal {
            self.copy_decimal_rows(&mut reader, &mut writer)?
        } else {
            self.copy_double_rows(&mut reader, &mut writer)?
        };
        writer.flush()?;

        stats.elapsed_secs = start.elapsed().as_secs_f64();
        Ok(stats)
    }

    fn copy_double_rows<R: Read + Seek, W: Write>(
        &self,
        reader: &mut DataReader<R>,
        writer: &mut ValueWriter<W>,
    ) -> Result<ReadStats> {
        let mut stats = ReadStats::default();
        let mut row_buf = vec![DoubleDataValue::default(); self.cols.len()];
        for &row in &self.rows {
            stats.cells += reader.read_double_values(&mut row_buf, 0, &[row], &self.cols)?;
            stats.missing += row_buf.iter().filter(|v| !v.is_present()).count();
            writer.write_double_row(&row_buf, self.separator)?;
            stats.rows += 1;
        }
        Ok(stats)
    }

    fn copy_decimal_rows<R: Read + Seek, W: Write>(
        &self,
        reader: &mut DataReader<R>,
        writer: &mut ValueWriter<W>,
    ) -> Result<ReadStats> {
        let mut stats = ReadStats::default();
        let mut row_buf = vec![DecimalDataValue::default(); self.cols.len()];
        for &row in &self.rows {
            stats.cells += reader.read_decimal_values(&mut row_buf, 0, &[row], &self.cols)?;
            stats.missing += row_buf.iter().filter(|v| !v.is_present()).count();
            writer.write_decimal_row(&row_buf, self.separator)?;
            stats.rows += 1;
        }
        Ok(stats)
    }
}
