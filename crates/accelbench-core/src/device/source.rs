//! Bounded variation sources
//!
//! Synthesized metrics carry a bounded random-looking spread. The spread is
//! drawn from an injected [`SampleSource`] so the same seed always yields the
//! same sample sequence.

/// Source of unit values in `[0, 1)`
pub trait SampleSource: Send {
    /// Next value in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Next value in `[low, high)`
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }
}

/// Seeded linear congruential generator
///
/// Deterministic per seed; good enough spread for metric jitter, not for
/// anything statistical about the generator itself.
#[derive(Debug, Clone)]
pub struct LcgSource {
    seed: u32,
    state: u32,
}

impl LcgSource {
    /// Default seed used when none is configured
    pub const DEFAULT_SEED: u32 = 0xDEAD_BEEF;

    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// Restart the sequence from the original seed
    pub fn reset(&mut self) {
        self.state = self.seed;
    }
}

impl Default for LcgSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl SampleSource for LcgSource {
    fn next_unit(&mut self) -> f64 {
        // LCG parameters (same as glibc)
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let bits = (self.state >> 16) & 0x7FFF;
        bits as f64 / 32768.0
    }
}

/// Source that always yields the same unit value
///
/// With a constant source every synthesized sample for a given configuration
/// is identical, which makes jitter exactly zero.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    /// `value` is clamped into `[0, 1)`
    pub fn new(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 1.0 - f64::EPSILON),
        }
    }
}

impl Default for ConstantSource {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl SampleSource for ConstantSource {
    fn next_unit(&mut self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_is_deterministic() {
        let mut a = LcgSource::new(42);
        let mut b = LcgSource::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_lcg_range() {
        let mut source = LcgSource::default();
        for _ in 0..10_000 {
            let v = source.next_unit();
            assert!((0.0..1.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_lcg_reset() {
        let mut source = LcgSource::new(7);
        let first = source.next_unit();
        source.next_unit();
        source.reset();
        assert_eq!(source.next_unit(), first);
    }

    #[test]
    fn test_uniform_bounds() {
        let mut source = LcgSource::new(1);
        for _ in 0..1000 {
            let v = source.uniform(-5.0, 15.0);
            assert!((-5.0..15.0).contains(&v));
        }
    }

    #[test]
    fn test_constant_source() {
        let mut source = ConstantSource::new(0.25);
        assert_eq!(source.next_unit(), 0.25);
        assert_eq!(source.uniform(0.0, 4.0), 1.0);

        let mut clamped = ConstantSource::new(3.0);
        assert!(clamped.next_unit() < 1.0);
    }
}
