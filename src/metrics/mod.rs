//! Metric accumulators: independent, order-insensitive reducers.
//!
//! Each accumulator owns disjoint state and folds one normalized message
//! at a time. Folding is commutative and associative for every family
//! here, so the pipeline may evaluate them in any order. Thread
//! reconstruction (order-dependent) lives in [`crate::threads`].

pub mod attachment;
pub mod domain;
pub mod keyword;
pub mod sender;
pub mod size;
pub mod time;

use crate::model::message::NormalizedMessage;

/// The fold contract shared by all metric families:
/// `fold(accumulator, message) -> accumulator'`.
pub trait Accumulator {
    fn fold(&mut self, msg: &NormalizedMessage);
}

/// Percentage of `part` in `total`, 0 when the total is empty.
pub(crate) fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Sort `(key, count, first_seen)` style entries for a top-N list:
/// descending count, earliest-first-seen breaking ties.
pub(crate) fn rank_top<T>(entries: &mut Vec<T>, count: impl Fn(&T) -> u64, seen: impl Fn(&T) -> u64) {
    entries.sort_by(|a, b| count(b).cmp(&count(a)).then(seen(a).cmp(&seen(b))));
}
