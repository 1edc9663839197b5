// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry-count histogram.
//!
//! Only records that needed at least one retry are counted: `Failed` rows
//! with a non-zero retry count and `Sent` rows delivered after a retry.

use serde::Serialize;
use tripcast_core::{DeliveryStatus, TravelerMessage};

/// Records per retry-count bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryHistogram {
    #[serde(rename = "1")]
    pub one: u64,
    #[serde(rename = "2")]
    pub two: u64,
    #[serde(rename = "3")]
    pub three: u64,
    #[serde(rename = "4+")]
    pub four_plus: u64,
    /// Of the counted records, how many ended up `Sent`.
    pub recovered: u64,
    /// Of the counted records, how many are still `Failed`.
    pub still_failed: u64,
}

impl RetryHistogram {
    pub fn total(&self) -> u64 {
        self.one + self.two + self.three + self.four_plus
    }
}

pub fn retry_histogram(records: &[TravelerMessage]) -> RetryHistogram {
    let mut histogram = RetryHistogram::default();
    for record in records {
        if record.retry_count == 0 {
            continue;
        }
        match record.delivery_status {
            DeliveryStatus::Sent => histogram.recovered += 1,
            DeliveryStatus::Failed => histogram.still_failed += 1,
            DeliveryStatus::Pending | DeliveryStatus::TemplateRequired => continue,
        }
        match record.retry_count {
            1 => histogram.one += 1,
            2 => histogram.two += 1,
            3 => histogram.three += 1,
            _ => histogram.four_plus += 1,
        }
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::record;

    #[test]
    fn buckets_by_retry_count() {
        let records = vec![
            record("u1", DeliveryStatus::Sent, 0),
            record("u1", DeliveryStatus::Sent, 1),
            record("u1", DeliveryStatus::Failed, 1),
            record("u1", DeliveryStatus::Failed, 2),
            record("u1", DeliveryStatus::Failed, 3),
            record("u1", DeliveryStatus::Failed, 7),
        ];
        let histogram = retry_histogram(&records);
        assert_eq!(histogram.one, 2);
        assert_eq!(histogram.two, 1);
        assert_eq!(histogram.three, 1);
        assert_eq!(histogram.four_plus, 1);
        assert_eq!(histogram.recovered, 1);
        assert_eq!(histogram.still_failed, 4);
        assert_eq!(histogram.total(), 5);
    }

    #[test]
    fn pending_and_template_rows_are_ignored() {
        let records = vec![
            record("u1", DeliveryStatus::Pending, 2),
            record("u1", DeliveryStatus::TemplateRequired, 1),
            record("u1", DeliveryStatus::Failed, 0),
        ];
        assert_eq!(retry_histogram(&records), RetryHistogram::default());
    }

    #[test]
    fn serializes_with_bucket_labels() {
        let json = serde_json::to_value(RetryHistogram {
            four_plus: 2,
            ..RetryHistogram::default()
        })
        .unwrap();
        assert_eq!(json["4+"], 2);
        assert_eq!(json["1"], 0);
    }
}
