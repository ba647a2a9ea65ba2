//! Leibniz series approximation of π.
//!
//! `4 * sum_{i=0}^{n-1} (-1)^i / (2i + 1)`, accumulated in `f64` in index order so the
//! result matches a naive loop bit for bit.

use std::io::Write;

use tracing::debug;

/// Term count used by the reference benchmark invocation.
pub const REFERENCE_TERMS: u64 = 50_000_000;

/// Unscaled partial sum of the first `n` terms.
pub fn partial_sum(n: u64) -> f64 {
    let mut sum = 0.0f64;
    for i in 0..n {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        sum += sign / (2 * i + 1) as f64;
    }
    sum
}

/// Approximation of π from the first `n` terms. `approximate(0)` is `0.0`.
pub fn approximate(n: u64) -> f64 {
    let value = partial_sum(n) * 4.0;
    debug!(terms = n, value, "leibniz series complete");
    value
}

/// Upper bound on `|approximate(n) - π|` for `n > 0`.
#[inline]
pub fn error_bound(n: u64) -> f64 {
    4.0 / (2 * n + 1) as f64
}

/// Runs the kernel and writes its single output line.
pub fn write_approximation<W: Write + ?Sized>(out: &mut W, n: u64) -> std::io::Result<f64> {
    let value = approximate(n);
    writeln!(out, "{}", value)?;
    Ok(value)
}
