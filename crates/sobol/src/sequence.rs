//! Sobol low-discrepancy sequence generators.
//!
//! [`SobolSequence`] is the plain Gray-code construction over 32-bit
//! direction numbers. The first dimension is the van der Corput sequence in
//! base 2; the remaining dimensions use the Joe-Kuo primitive polynomials
//! and initial direction numbers. Wider designs use the Owen-scrambled
//! sequence of `sobol_burley` through [`scrambled_points`].

const BITS: usize = 32;
const NORM: f64 = 1.0 / 4_294_967_296.0; // 2^-32

/// Primitive polynomial degree `s`, coefficient bits `a` and initial `m_i`
struct Direction {
    s: usize,
    a: u32,
    m: &'static [u32],
}

const DIRECTIONS: [Direction; 20] = [
    Direction { s: 1, a: 0, m: &[1] },
    Direction { s: 2, a: 1, m: &[1, 3] },
    Direction { s: 3, a: 1, m: &[1, 3, 1] },
    Direction { s: 3, a: 2, m: &[1, 1, 1] },
    Direction { s: 4, a: 1, m: &[1, 1, 3, 3] },
    Direction { s: 4, a: 4, m: &[1, 3, 5, 13] },
    Direction { s: 5, a: 2, m: &[1, 1, 5, 5, 17] },
    Direction { s: 5, a: 4, m: &[1, 1, 5, 5, 5] },
    Direction { s: 5, a: 7, m: &[1, 1, 7, 11, 19] },
    Direction { s: 5, a: 11, m: &[1, 1, 5, 1, 1] },
    Direction { s: 5, a: 13, m: &[1, 1, 1, 3, 11] },
    Direction { s: 5, a: 14, m: &[1, 3, 5, 5, 31] },
    Direction { s: 6, a: 1, m: &[1, 3, 3, 9, 7, 49] },
    Direction { s: 6, a: 13, m: &[1, 1, 1, 15, 21, 21] },
    Direction { s: 6, a: 16, m: &[1, 3, 1, 13, 27, 49] },
    Direction { s: 6, a: 19, m: &[1, 1, 1, 15, 7, 5] },
    Direction { s: 6, a: 22, m: &[1, 3, 1, 15, 13, 25] },
    Direction { s: 6, a: 25, m: &[1, 1, 5, 5, 19, 61] },
    Direction { s: 7, a: 1, m: &[1, 3, 7, 11, 23, 15, 103] },
    Direction { s: 7, a: 4, m: &[1, 3, 7, 13, 13, 15, 69] },
];

/// Highest dimension the built-in direction table supports
pub const MAX_DIMENSIONS: usize = DIRECTIONS.len() + 1;

/// Highest dimension [`scrambled_points`] supports
pub const MAX_SCRAMBLED_DIMENSIONS: usize = sobol_burley::NUM_DIMENSIONS as usize;

/// Points `skip..skip + n` of the Owen-scrambled Sobol sequence.
///
/// Every `seed` gives a different randomization with the same
/// stratification as the plain sequence. Returns `None` when `dims` is zero,
/// exceeds [`MAX_SCRAMBLED_DIMENSIONS`] or the indices overflow `u32`.
pub fn scrambled_points(dims: usize, n: usize, skip: usize, seed: u32) -> Option<Vec<Vec<f64>>> {
    if dims == 0 || dims > MAX_SCRAMBLED_DIMENSIONS {
        return None;
    }
    let end = skip.checked_add(n)?;
    if u32::try_from(end).is_err() {
        return None;
    }
    Some(
        (skip..end)
            .map(|index| {
                (0..dims)
                    .map(|d| f64::from(sobol_burley::sample(index as u32, d as u32, seed)))
                    .collect()
            })
            .collect(),
    )
}

/// Stateful Sobol point generator
#[derive(Debug, Clone)]
pub struct SobolSequence {
    directions: Vec<[u32; BITS]>,
    state: Vec<u32>,
    index: u64,
}

impl SobolSequence {
    /// Create a generator for `dims` dimensions.
    ///
    /// Returns `None` when `dims` is zero or exceeds [`MAX_DIMENSIONS`].
    pub fn new(dims: usize) -> Option<Self> {
        if dims == 0 || dims > MAX_DIMENSIONS {
            return None;
        }

        let mut directions = Vec::with_capacity(dims);
        directions.push(first_dimension());
        for entry in DIRECTIONS.iter().take(dims - 1) {
            directions.push(direction_numbers(entry));
        }

        Some(Self {
            directions,
            state: vec![0; dims],
            index: 0,
        })
    }

    /// Number of dimensions per point
    pub fn dims(&self) -> usize {
        self.directions.len()
    }

    /// Index of the next point to be produced
    pub fn position(&self) -> u64 {
        self.index
    }

    /// Produce the next point, every coordinate in `[0, 1)`
    pub fn next_point(&mut self) -> Vec<f64> {
        self.advance();
        self.state.iter().map(|&x| x as f64 * NORM).collect()
    }

    /// Discard `n` points
    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Generate `n` points after skipping the first `skip`
    pub fn generate(dims: usize, n: usize, skip: usize) -> Option<Vec<Vec<f64>>> {
        let mut sequence = Self::new(dims)?;
        sequence.skip(skip);
        Some((0..n).map(|_| sequence.next_point()).collect())
    }

    fn advance(&mut self) {
        // Point 0 is the origin; point i flips the bit at the lowest zero of i - 1.
        if self.index > 0 {
            let bit = (self.index - 1).trailing_ones() as usize;
            if bit < BITS {
                for (x, v) in self.state.iter_mut().zip(&self.directions) {
                    *x ^= v[bit];
                }
            }
        }
        self.index += 1;
    }
}

fn first_dimension() -> [u32; BITS] {
    let mut v = [0u32; BITS];
    for (i, slot) in v.iter_mut().enumerate() {
        *slot = 1u32 << (BITS - 1 - i);
    }
    v
}

fn direction_numbers(entry: &Direction) -> [u32; BITS] {
    let s = entry.s;
    let mut v = [0u32; BITS];
    for i in 0..s {
        v[i] = entry.m[i] << (BITS - 1 - i);
    }
    for i in s..BITS {
        v[i] = v[i - s] ^ (v[i - s] >> s);
        for k in 1..s {
            if (entry.a >> (s - 1 - k)) & 1 == 1 {
                v[i] ^= v[i - k];
            }
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_points_match_reference() {
        let points = SobolSequence::generate(2, 6, 0).unwrap();
        let dim0: Vec<f64> = points.iter().map(|p| p[0]).collect();
        let dim1: Vec<f64> = points.iter().map(|p| p[1]).collect();
        assert_eq!(dim0, vec![0.0, 0.5, 0.75, 0.25, 0.375, 0.875]);
        assert_eq!(dim1, vec![0.0, 0.5, 0.25, 0.75, 0.375, 0.875]);
    }

    #[test]
    fn test_rejects_unsupported_dimensions() {
        assert!(SobolSequence::new(0).is_none());
        assert!(SobolSequence::new(MAX_DIMENSIONS + 1).is_none());
        assert!(SobolSequence::new(MAX_DIMENSIONS).is_some());
    }

    #[test]
    fn test_each_dimension_is_stratified() {
        // The first 2^m points of every one-dimensional projection hit each
        // of the 2^m equal-width cells exactly once.
        let m = 6;
        let n = 1usize << m;
        let points = SobolSequence::generate(MAX_DIMENSIONS, n, 0).unwrap();
        for d in 0..MAX_DIMENSIONS {
            let mut hits = vec![0usize; n];
            for p in &points {
                hits[(p[d] * n as f64) as usize] += 1;
            }
            assert!(hits.iter().all(|&h| h == 1), "dimension {d} not stratified");
        }
    }

    #[test]
    fn test_scrambled_dimensions_are_stratified() {
        let m = 6;
        let n = 1usize << m;
        for seed in [0, 17] {
            // an aligned block of 2^m points stratifies like the first one
            let points = scrambled_points(MAX_SCRAMBLED_DIMENSIONS, n, n, seed).unwrap();
            for d in 0..MAX_SCRAMBLED_DIMENSIONS {
                let mut hits = vec![0usize; n];
                for p in &points {
                    assert!((0.0..1.0).contains(&p[d]));
                    hits[(p[d] * n as f64) as usize] += 1;
                }
                assert!(hits.iter().all(|&h| h == 1), "dimension {d} not stratified (seed {seed})");
            }
        }
    }

    #[test]
    fn test_scrambled_points_depend_on_seed_only() {
        assert_eq!(scrambled_points(40, 8, 8, 3), scrambled_points(40, 8, 8, 3));
        assert_ne!(scrambled_points(40, 8, 8, 3), scrambled_points(40, 8, 8, 4));
        assert!(scrambled_points(0, 8, 0, 1).is_none());
        assert!(scrambled_points(MAX_SCRAMBLED_DIMENSIONS + 1, 8, 0, 1).is_none());
        assert!(scrambled_points(2, 8, u32::MAX as usize, 1).is_none());
    }

    #[test]
    fn test_skip_matches_generate_offset() {
        let mut sequence = SobolSequence::new(3).unwrap();
        sequence.skip(16);
        assert_eq!(sequence.position(), 16);
        let tail = SobolSequence::generate(3, 4, 16).unwrap();
        for expected in tail {
            assert_eq!(sequence.next_point(), expected);
        }
    }
}
