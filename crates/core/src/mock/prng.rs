/// Mulberry32: a 32-bit counter-based generator. Same seed, same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Seeds wrap modulo 2^32, so negative seeds are accepted.
    pub fn new(seed: i64) -> Self {
        Self {
            state: seed as u32,
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(1 | a);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    /// Uniform draw on [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Approximately normal draw: sum of six uniforms, recentered to mean 0.
    pub fn normal_approx(&mut self) -> f64 {
        (0..6).map(|_| self.next_f64()).sum::<f64>() - 3.0
    }

    /// `mean + z * std`, clamped to `[lo, hi]`.
    pub fn bounded(&mut self, mean: f64, std: f64, lo: f64, hi: f64) -> f64 {
        (mean + self.normal_approx() * std).clamp(lo, hi)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = (self.next_f64() * items.len() as f64) as usize;
        &items[idx.min(items.len() - 1)]
    }
}
