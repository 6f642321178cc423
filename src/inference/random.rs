//! Seedable pseudo-random source for randomised successor enumeration.

/// 64-bit linear congruential generator (Knuth's MMIX constants).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

impl Lcg {
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.state = seed;
    }

    /// Next value; the low bits of an LCG are weak, so only the upper half
    /// of the state is returned.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        (self.state >> 32) as u32
    }

    pub fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    /// Uniform index in `0..bound`.
    pub fn below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "cannot draw from an empty range");
        (self.next_u64() % bound as u64) as usize
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Fisher-Yates shuffle driven by `next(bound)`, which must return a value
/// in `0..bound`.
pub fn shuffle<T>(items: &mut [T], mut next: impl FnMut(usize) -> usize) {
    for i in (1..items.len()).rev() {
        let j = next(i + 1);
        items.swap(i, j);
    }
}
