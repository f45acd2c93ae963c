//! Efficient output formatting for decoded cells.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::error::Result;
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use crate::value::{DecimalDataValue, DoubleDataValue};
use std::io::{BufWriter, Write};

/// Buffered writer for cell values and data sections.
pub struct ValueWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> ValueWriter<W> {
    /// Create a new ValueWriter with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write an integer using itoa.
    #[inline]
    pub fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    /// Write a float. Integral values print without a fraction (`3`, not `3.0`),
    /// matching how PX producers write whole numbers.
    #[inline]
    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
            self.write_int(v as i64)
        } else {
            self.writer.write_all(self.ryu_buf.format(v).as_bytes())?;
            Ok(())
        }
    }

    /// Write a tagged double, using the quoted symbol for missing values.
    #[inline]
    pub fn write_double_value(&mut self, v: &DoubleDataValue) -> Result<()> {
        if v.is_present() {
            self.write_f64(v.value)
        } else {
            self.write_bytes(v.kind.symbol().as_bytes())
        }
    }

    pub fn write_decimal_value(&mut self, v: &DecimalDataValue) -> Result<()> {
        if v.is_present() {
            write!(self.writer, "{}", v.value)?;
            Ok(())
        } else {
            self.write_bytes(v.kind.symbol().as_bytes())
        }
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    #[inline]
    pub fn write_separator(&mut self, sep: u8) -> Result<()> {
        self.writer.write_all(&[sep])?;
        Ok(())
    }

    #[inline]
    pub fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write one row of tagged doubles separated by `sep`, then a newline.
    pub fn write_double_row(&mut self, row: &[DoubleDataValue], sep: u8) -> Result<()> {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                self.write_separator(sep)?;
            }
            self.write_double_value(v)?;
        }
        self.write_newline()
    }

    pub fn write_decimal_row(&mut self, row: &[DecimalDataValue], sep: u8) -> Result<()> {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                self.write_separator(sep)?;
            }
            self.write_decimal_value(v)?;
        }
        self.write_newline()
    }

    /// Flush the internal buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for ValueWriter<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
