//! Series workload: e = sum(1 / i!) truncated to a fixed number of terms.

use std::hint::black_box;

/// Inner summation length per iteration.
pub const EULER_TERMS: u64 = 65;

/// Iterative factorial, recomputed per term on purpose.
/// Wraps on overflow past 20!.
pub fn factorial(n: u64) -> u64 {
    let mut fact: u64 = 1;
    for i in 2..=n {
        fact = fact.wrapping_mul(i);
    }
    fact
}

/// One pass of the truncated series.
pub fn euler_once() -> f64 {
    let mut e = 0.0_f64;
    for n in 0..EULER_TERMS {
        e += 1.0 / factorial(black_box(n)) as f64;
    }
    e
}

/// Burn CPU for `iterations` passes of the series. The result is discarded.
pub fn euler(iterations: u64) {
    for _ in 0..iterations {
        black_box(euler_once());
    }
}
