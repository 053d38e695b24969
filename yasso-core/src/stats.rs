//! Sample moments.
//!
//! Variance is the unbiased estimate. Skewness and kurtosis are the biased
//! (population) estimates; kurtosis is the excess (Fisher) kurtosis.
//! All functions expect a non-empty slice and return NaN otherwise.

use crate::FloatValue;
use std::cmp::Ordering;

pub fn mean(values: &[FloatValue]) -> FloatValue {
    values.iter().sum::<FloatValue>() / values.len() as FloatValue
}

/// Unbiased variance, 0 for a single value
pub fn variance(values: &[FloatValue]) -> FloatValue {
    match values.len() {
        0 => FloatValue::NAN,
        1 => 0.0,
        n => {
            let mean = mean(values);
            values.iter().map(|v| (v - mean).powi(2)).sum::<FloatValue>() / (n - 1) as FloatValue
        }
    }
}

/// Central moment of order `order`
fn central_moment(values: &[FloatValue], order: i32) -> FloatValue {
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(order)).sum::<FloatValue>() / values.len() as FloatValue
}

/// `m3 / m2^1.5`, 0 when all values are equal
pub fn skewness(values: &[FloatValue]) -> FloatValue {
    if values.is_empty() {
        return FloatValue::NAN;
    }
    let m2 = central_moment(values, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// `m4 / m2² - 3`, -3 when all values are equal
pub fn kurtosis(values: &[FloatValue]) -> FloatValue {
    if values.is_empty() {
        return FloatValue::NAN;
    }
    let m2 = central_moment(values, 2);
    if m2 == 0.0 {
        return -3.0;
    }
    central_moment(values, 4) / m2.powi(2) - 3.0
}

/// Most frequent value; the smallest one when several are equally frequent
pub fn mode(values: &[FloatValue]) -> FloatValue {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best = FloatValue::NAN;
    let mut best_count = 0;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].total_cmp(&sorted[start]) == Ordering::Equal {
            end += 1;
        }
        if end - start > best_count {
            best = sorted[start];
            best_count = end - start;
        }
        start = end;
    }
    best
}
