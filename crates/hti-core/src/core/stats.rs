use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Block size must be positive")]
    BlockSizeZero,
    #[error(
        "Only {full_blocks} full block(s) of size {block_size} remain after skipping {skip} samples; at least 2 are required"
    )]
    InsufficientBlocks {
        skip: usize,
        block_size: usize,
        full_blocks: usize,
    },
}

/// A `(mean, standard_error)` pair reduced from one observable time series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReducedObservable {
    pub mean: f64,
    pub std_err: f64,
}

impl ReducedObservable {
    pub fn new(mean: f64, std_err: f64) -> Self {
        Self { mean, std_err }
    }

    /// Normalizes an extensive observable by atom count: the mean scales as 1/n,
    /// the sampling error as 1/sqrt(n).
    pub fn per_atom(&self, natoms: usize) -> Self {
        let n = natoms as f64;
        Self {
            mean: self.mean / n,
            std_err: self.std_err / n.sqrt(),
        }
    }
}

/// Block-averages a serially correlated time series.
///
/// Drops the first `skip` samples, partitions the remainder into contiguous
/// non-overlapping blocks of `block_size` (a trailing partial block is dropped),
/// and returns the mean of block means together with the standard error of the
/// block means (std of block means divided by sqrt of the block count).
///
/// The block size must be chosen by the caller from the observable's correlation
/// time; no autocorrelation analysis is performed here.
pub fn block_average(
    series: &[f64],
    skip: usize,
    block_size: usize,
) -> Result<ReducedObservable, StatsError> {
    if block_size == 0 {
        return Err(StatsError::BlockSizeZero);
    }
    let retained = series.get(skip..).unwrap_or(&[]);
    let full_blocks = retained.len() / block_size;
    if full_blocks < 2 {
        return Err(StatsError::InsufficientBlocks {
            skip,
            block_size,
            full_blocks,
        });
    }

    let mut block_means = Vec::with_capacity(full_blocks);
    for chunk in retained.chunks_exact(block_size) {
        block_means.push(chunk.iter().sum::<f64>() / block_size as f64);
    }

    let n = full_blocks as f64;
    let mean = block_means.iter().sum::<f64>() / n;
    let variance = block_means
        .iter()
        .map(|b| (b - mean) * (b - mean))
        .sum::<f64>()
        / n;

    Ok(ReducedObservable {
        mean,
        std_err: (variance / n).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn constant_series_reduces_to_constant_with_zero_error() {
        let series = vec![3.5; 40];
        let reduced = block_average(&series, 0, 10).unwrap();
        assert!(f64_approx_equal(reduced.mean, 3.5));
        assert!(f64_approx_equal(reduced.std_err, 0.0));
    }

    #[test]
    fn constant_series_is_insensitive_to_block_size() {
        let series = vec![-1.25; 60];
        for block_size in [1, 2, 5, 30] {
            let reduced = block_average(&series, 0, block_size).unwrap();
            assert!(f64_approx_equal(reduced.mean, -1.25));
            assert!(f64_approx_equal(reduced.std_err, 0.0));
        }
    }

    #[test]
    fn block_means_and_error_match_hand_computation() {
        // Blocks of 2: means 1.0, 3.0 -> mean 2.0, std 1.0, err 1/sqrt(2).
        let series = vec![0.5, 1.5, 2.5, 3.5];
        let reduced = block_average(&series, 0, 2).unwrap();
        assert!(f64_approx_equal(reduced.mean, 2.0));
        assert!(f64_approx_equal(reduced.std_err, 1.0 / 2.0_f64.sqrt()));
    }

    #[test]
    fn skip_discards_equilibration_prefix() {
        let mut series = vec![1000.0; 8];
        series.extend_from_slice(&[2.0; 16]);
        let reduced = block_average(&series, 8, 4).unwrap();
        assert!(f64_approx_equal(reduced.mean, 2.0));
    }

    #[test]
    fn trailing_partial_block_is_dropped() {
        // Third block [9.0] is partial and must not contribute.
        let series = vec![1.0, 1.0, 3.0, 3.0, 9.0];
        let reduced = block_average(&series, 0, 2).unwrap();
        assert!(f64_approx_equal(reduced.mean, 2.0));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let result = block_average(&[1.0, 2.0, 3.0], 0, 0);
        assert_eq!(result, Err(StatsError::BlockSizeZero));
    }

    #[test]
    fn fewer_than_two_full_blocks_is_rejected() {
        let result = block_average(&[1.0, 2.0, 3.0], 0, 2);
        assert_eq!(
            result,
            Err(StatsError::InsufficientBlocks {
                skip: 0,
                block_size: 2,
                full_blocks: 1
            })
        );
    }

    #[test]
    fn skip_beyond_series_length_is_rejected() {
        let result = block_average(&[1.0, 2.0], 10, 1);
        assert_eq!(
            result,
            Err(StatsError::InsufficientBlocks {
                skip: 10,
                block_size: 1,
                full_blocks: 0
            })
        );
    }

    #[test]
    fn per_atom_scales_mean_linearly_and_error_by_sqrt() {
        let reduced = ReducedObservable::new(8.0, 4.0).per_atom(4);
        assert!(f64_approx_equal(reduced.mean, 2.0));
        assert!(f64_approx_equal(reduced.std_err, 2.0));
    }
}
