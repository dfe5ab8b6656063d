/*!
Summary statistics over series of samples.

The median here is not the textbook one. It is `sorted[n / 2]` on even-length
series and undefined for odd-length series, which matches the numbers in
tables produced by older tooling.
*/

use crate::error::Error;

/// Return the median of the given samples.
///
/// The samples are sorted in ascending order and the element at index
/// `len / 2` is returned. For an even-length series, that is the upper of the
/// two central elements. It is not interpolated.
///
/// An odd-length (or empty) series returns an `Unsupported` error.
pub fn median(xs: &[f64]) -> Result<f64, Error> {
    if xs.is_empty() || xs.len() % 2 == 1 {
        return Err(Error::Unsupported { len: xs.len() });
    }
    let mut sorted = xs.to_vec();
    sorted.sort_unstable_by(|x, y| x.total_cmp(y));
    Ok(sorted[sorted.len() / 2])
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        let sum: f64 = xs.iter().sum();
        Some(sum / (xs.len() as f64))
    }
}

/// The population standard deviation.
pub fn stddev(xs: &[f64]) -> Option<f64> {
    let len = xs.len() as f64;
    let mean = mean(xs)?;
    let mut deviation_sum_squared = 0.0;
    for &x in xs.iter() {
        deviation_sum_squared += (x - mean).powi(2);
    }
    Some((deviation_sum_squared / len).sqrt())
}

pub fn min(xs: &[f64]) -> Option<f64> {
    let mut it = xs.iter().copied();
    let mut min = it.next()?;
    for x in it {
        if x < min {
            min = x;
        }
    }
    Some(min)
}

pub fn max(xs: &[f64]) -> Option<f64> {
    let mut it = xs.iter().copied();
    let mut max = it.next()?;
    for x in it {
        if x > max {
            max = x;
        }
    }
    Some(max)
}
