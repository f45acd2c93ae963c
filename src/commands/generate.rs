//! Generate synthetic PX data sections for benchmarking.
//!
//! Output is a minimal PX stream: one metadata entry followed by a `DATA=`
//! section of `rows` lines with `cols` space separated cells each. A
//! configurable share of cells is replaced by missing-value tokens drawn
//! uniformly from the seven kinds. The same seed always produces the same
//! bytes.

use crate::error::{PxError, Result};
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use crate::streaming::ValueWriter;
use crate::value::MISSING_KINDS;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::time::Instant;

/// Statistics from generate operation.
#[derive(Debug, Default, Clone)]
pub struct GenerateStats {
    pub cells: u64,
    pub missing: u64,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for GenerateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} cells ({} missing) in {:.1}s",
            self.cells, self.missing, self.elapsed_secs
        )
    }
}

/// Generate command.
#[derive(Debug, Clone)]
pub struct GenerateCommand {
    pub rows: usize,
    pub cols: usize,
    /// Probability that a cell is written as a missing token.
    pub missing_rate: f64,
    pub seed: u64,
}

impl GenerateCommand {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            missing_rate: 0.0,
            seed: 42,
        }
    }

    pub fn with_missing_rate(mut self, rate: f64) -> Self {
        self.missing_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Write the synthetic stream to `output`.
    pub fn run<W: Write>(&self, output: &mut W) -> Result<GenerateStats> {
        if !(0.0..=1.0).contains(&self.missing_rate) {
            return Err(PxError::InvalidRequest(format!(
                "missing rate {} is outside [0, 1]",
                self.missing_rate
            )));
        }
        let start = Instant::now();
        let mut stats = GenerateStats::default();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut writer = ValueWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, output);

        writer.write_bytes(b"MATRIX=\"SYNTH\";\nDATA=\n")?;
        for _ in 0..self.rows {
            for col in 0..self.cols {
                if col > 0 {
                    writer.write_separator(b' ')?;
                }
                if rng.gen_bool(self.missing_rate) {
                    let kind = MISSING_KINDS[rng.gen_range(0..MISSING_KINDS.len())];
                    writer.write_bytes(kind.symbol().as_bytes())?;
                    stats.missing += 1;
                } else {
                    let cents: i64 = rng.gen_range(-100_000..1_000_000);
                    writer.write_f64(cents as f64 / 100.0)?;
                }
                stats.cells += 1;
            }
            writer.write_newline()?;
        }
        writer.write_bytes(b";\n")?;
        writer.flush()?;

        stats.elapsed_secs = start.elapsed().as_secs_f64();
        Ok(stats)
    }
}
