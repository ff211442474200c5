//! Utility functions and types used throughout rhsim.
//!
//! This module provides:
//! - Constants for page arithmetic ([`PAGE_SIZE`], [`PAGE_SHIFT`], etc.)
//! - [`GroupBy`] trait for collection grouping operations
//! - Time and number formatting helpers used by the human-readable reports

mod constants;

pub use self::constants::*;

use chrono::NaiveTime;
use std::collections::HashMap;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Trait for grouping collection elements by a key function.
///
/// This trait extends collections with the ability to group elements based on
/// a key extraction function, similar to SQL's GROUP BY operation.
pub trait GroupBy<V> {
    /// Groups elements by the result of applying a function to each element.
    ///
    /// Returns a `HashMap` where keys are the grouping keys and values are
    /// vectors of elements that share that key, in input order.
    fn group_by<K: std::hash::Hash + std::cmp::Eq, F: Fn(&V) -> K>(
        self,
        f: F,
    ) -> HashMap<K, Vec<V>>;
}

impl<T> GroupBy<T> for Vec<T> {
    fn group_by<K: std::hash::Hash + std::cmp::Eq, F: Fn(&T) -> K>(
        self,
        f: F,
    ) -> HashMap<K, Vec<T>> {
        let mut out = HashMap::new();
        for elem in self {
            let k = f(&elem);
            out.entry(k).or_insert(vec![]).push(elem);
        }
        out
    }
}

/// Formats a number of seconds as `HH:MM:SS` time of day.
///
/// Fractional seconds are truncated and the value wraps at 24 hours, negative
/// values wrap backwards from midnight.
///
/// # Examples
///
/// ```
/// use rhsim_core::util::format_hms;
///
/// assert_eq!(format_hms(3725.9), "01:02:05");
/// assert_eq!(format_hms(-5.0), "23:59:55");
/// ```
pub fn format_hms(secs: f64) -> String {
    let secs = (secs.floor() as i64).rem_euclid(SECS_PER_DAY) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .unwrap_or_default()
        .format("%H:%M:%S")
        .to_string()
}

/// Formats an integer with `,` as thousands separator.
///
/// # Examples
///
/// ```
/// use rhsim_core::util::group_thousands;
///
/// assert_eq!(group_thousands(1234567), "1,234,567");
/// assert_eq!(group_thousands(-1000), "-1,000");
/// assert_eq!(group_thousands(999), "999");
/// ```
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
