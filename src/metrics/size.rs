//! Message size distribution over fixed thresholds.

use crate::model::message::NormalizedMessage;
use crate::model::report::SizeDistribution;

use super::Accumulator;

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Buckets: small < 1 KB, medium 1 KB–100 KB, large 100 KB–1 MB,
/// very large > 1 MB. Keeps every observed size for the median; one u64
/// per message is cheap at the mailbox sizes we fetch.
#[derive(Debug, Default)]
pub struct SizeAccumulator {
    small: u64,
    medium: u64,
    large: u64,
    very_large: u64,
    sum: u64,
    sizes: Vec<u64>,
}

impl Accumulator for SizeAccumulator {
    fn fold(&mut self, msg: &NormalizedMessage) {
        let size = msg.size;
        match size {
            s if s < KB => self.small += 1,
            s if s < 100 * KB => self.medium += 1,
            s if s < MB => self.large += 1,
            _ => self.very_large += 1,
        }
        self.sum += size;
        self.sizes.push(size);
    }
}

impl SizeAccumulator {
    /// Total bytes observed.
    pub fn total_bytes(&self) -> u64 {
        self.sum
    }

    pub fn finish(mut self) -> SizeDistribution {
        let count = self.sizes.len() as u64;
        let average = if count == 0 {
            0.0
        } else {
            self.sum as f64 / count as f64
        };

        self.sizes.sort_unstable();
        let median = match self.sizes.len() {
            0 => 0.0,
            n if n % 2 == 1 => self.sizes[n / 2] as f64,
            n => (self.sizes[n / 2 - 1] + self.sizes[n / 2]) as f64 / 2.0,
        };

        SizeDistribution {
            small: self.small,
            medium: self.medium,
            large: self.large,
            very_large: self.very_large,
            average_bytes: average,
            median_bytes: median,
        }
    }
}
