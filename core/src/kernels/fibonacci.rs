//! Fibonacci output workload: print the first `terms` numbers, `repeats` times over.

use std::io::Write;

use tracing::debug;

pub const REFERENCE_TERMS: u32 = 40;
pub const REFERENCE_REPEATS: u32 = 1_000;

/// Number of terms representable in `u64` (F(0) through F(93)).
pub const MAX_TERMS: u32 = 94;

/// Fibonacci numbers starting at 0. Stops instead of overflowing.
#[derive(Debug, Clone)]
pub struct FibonacciTerms {
    current: Option<u64>,
    next: Option<u64>,
}

impl FibonacciTerms {
    pub fn new() -> Self {
        Self {
            current: Some(0),
            next: Some(1),
        }
    }
}

impl Default for FibonacciTerms {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FibonacciTerms {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let value = self.current?;
        self.current = self.next;
        self.next = match self.next {
            Some(next) => value.checked_add(next),
            None => None,
        };
        Some(value)
    }
}

/// Writes the first `terms` Fibonacci numbers, one per line.
pub fn write_sequence<W: Write + ?Sized>(out: &mut W, terms: u32) -> std::io::Result<usize> {
    let mut buf = itoa::Buffer::new();
    let mut written = 0;
    for value in FibonacciTerms::new().take(terms as usize) {
        out.write_all(buf.format(value).as_bytes())?;
        out.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}

/// Writes the sequence `repeats` times back to back; returns the number of lines written.
pub fn run_repeated<W: Write + ?Sized>(out: &mut W, terms: u32, repeats: u32) -> std::io::Result<usize> {
    let mut lines = 0;
    for _ in 0..repeats {
        lines += write_sequence(out, terms)?;
    }
    debug!(terms, repeats, lines, "fibonacci sequence emitted");
    Ok(lines)
}
