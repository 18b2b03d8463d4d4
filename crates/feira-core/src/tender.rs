//! # Multi-Tender Aggregator
//!
//! Pure partition of a batch's line items by payment bucket.
//!
//! ## How Aggregation Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Tender Aggregation                                  │
//! │                                                                         │
//! │  Lines: [Pastel/cash 16,00] [Coxinha/pix 9,00] [Bolo/credit_2x 30,00]  │
//! │         [Refri/points 5,00]                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌────────┬────────┬────────┬────────┬────────┐                        │
//! │  │  Cash  │  Pix   │ Debit  │ Credit │ Points │                        │
//! │  │ 16,00  │  9,00  │  0,00  │ 30,00  │  5,00  │                        │
//! │  └────────┴────────┴────────┴────────┴────────┘                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Grand total: 55,00  ← Points EXCLUDED (redemption, not revenue)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Idempotent and side-effect free. Invoked to freeze batch subtotals at
//! validation time and, transiently, for live display of an in-progress
//! draft before submission.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{BatchLine, TenderBucket, TenderMethod};

// =============================================================================
// Tender Totals
// =============================================================================

/// Per-bucket subtotals plus the grand financial total, in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderTotals {
    pub cash_cents: i64,
    pub pix_cents: i64,
    pub debit_cents: i64,
    pub credit_cents: i64,

    /// Monetary value redeemed via points. Display only.
    pub points_cents: i64,

    /// cash + pix + debit + credit. Points excluded.
    pub total_cents: i64,
}

impl TenderTotals {
    /// Adds one line's total into the matching bucket.
    pub fn accumulate(&mut self, tender: TenderMethod, line_total_cents: i64) {
        match tender.bucket() {
            TenderBucket::Cash => self.cash_cents += line_total_cents,
            TenderBucket::Pix => self.pix_cents += line_total_cents,
            TenderBucket::Debit => self.debit_cents += line_total_cents,
            TenderBucket::Credit => self.credit_cents += line_total_cents,
            TenderBucket::Points => self.points_cents += line_total_cents,
        }
        if tender.is_monetary() {
            self.total_cents += line_total_cents;
        }
    }

    /// Grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Aggregation Functions
// =============================================================================

/// Partitions `(tender, line_total_cents)` pairs into per-bucket subtotals.
///
/// ## Example
/// ```rust
/// use feira_core::tender::tender_totals;
/// use feira_core::types::TenderMethod;
///
/// let totals = tender_totals([
///     (TenderMethod::Cash, 1600),
///     (TenderMethod::Credit2x, 3000),
///     (TenderMethod::Points, 500),
/// ]);
///
/// assert_eq!(totals.cash_cents, 1600);
/// assert_eq!(totals.credit_cents, 3000);
/// assert_eq!(totals.points_cents, 500);
/// assert_eq!(totals.total_cents, 4600); // points excluded
/// ```
pub fn tender_totals<I>(lines: I) -> TenderTotals
where
    I: IntoIterator<Item = (TenderMethod, i64)>,
{
    let mut totals = TenderTotals::default();
    for (tender, cents) in lines {
        totals.accumulate(tender, cents);
    }
    totals
}

/// Aggregates over captured batch lines.
pub fn batch_totals(items: &[BatchLine]) -> TenderTotals {
    tender_totals(items.iter().map(|i| (i.tender, i.line_total_cents)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lines() {
        let lines: [(TenderMethod, i64); 0] = [];
        let totals = tender_totals(lines);
        assert_eq!(totals, TenderTotals::default());
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_partition_by_bucket() {
        let totals = tender_totals([
            (TenderMethod::Cash, 1600),
            (TenderMethod::Cash, 400),
            (TenderMethod::Pix, 900),
            (TenderMethod::Debit, 1200),
            (TenderMethod::Credit1x, 1000),
            (TenderMethod::Credit3x, 2000),
        ]);

        assert_eq!(totals.cash_cents, 2000);
        assert_eq!(totals.pix_cents, 900);
        assert_eq!(totals.debit_cents, 1200);
        assert_eq!(totals.credit_cents, 3000);
        assert_eq!(totals.points_cents, 0);
        assert_eq!(totals.total_cents, 7100);
    }

    #[test]
    fn test_points_excluded_from_grand_total() {
        let totals = tender_totals([
            (TenderMethod::Cash, 1600),
            (TenderMethod::Points, 1500),
        ]);

        assert_eq!(totals.points_cents, 1500);
        assert_eq!(totals.total_cents, 1600);
    }

    #[test]
    fn test_grand_total_is_sum_of_monetary_buckets() {
        let totals = tender_totals([
            (TenderMethod::Cash, 100),
            (TenderMethod::Pix, 200),
            (TenderMethod::Debit, 300),
            (TenderMethod::Credit2x, 400),
            (TenderMethod::Points, 999),
        ]);

        assert_eq!(
            totals.total_cents,
            totals.cash_cents + totals.pix_cents + totals.debit_cents + totals.credit_cents
        );
    }

    #[test]
    fn test_idempotent() {
        let lines = [(TenderMethod::Cash, 1600), (TenderMethod::Pix, 900)];
        assert_eq!(tender_totals(lines), tender_totals(lines));
    }
}
