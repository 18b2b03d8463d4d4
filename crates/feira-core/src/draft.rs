//! # Batch Draft
//!
//! Capture-time batch building, before submission freezes the line list.
//!
//! ## Capture Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Batch Capture Operations                             │
//! │                                                                         │
//! │  Volunteer Action         Draft Call              Draft Change          │
//! │  ────────────────         ──────────              ────────────          │
//! │                                                                         │
//! │  Ring up product ────────► add_line() ──────────► lines.push(snapshot) │
//! │                               │                                         │
//! │                               ├── Points tender? check affordability,  │
//! │                               │   fix point_cost NOW (stored forever)  │
//! │                               │                                         │
//! │                               └── reject ⇒ draft UNMODIFIED            │
//! │                                                                         │
//! │  Undo a mistake ─────────► remove_line(i) ──────► lines.remove(i)      │
//! │                                                                         │
//! │  Live display ───────────► totals() ────────────► (read only)          │
//! │                                                                         │
//! │  Finalize ───────────────► SubmitBatch (engine) — list becomes         │
//! │                            append/remove-free                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `InsufficientPoints` gate lives HERE, at the capture boundary.
//! Validation later debits the stored point cost without re-checking
//! affordability.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::loyalty;
use crate::money::Money;
use crate::tender::{tender_totals, TenderTotals};
use crate::types::{BatchKind, Category, Customer, OrderContact, PointsConfig, TenderMethod};
use crate::validation::{
    normalize_phone, validate_price_cents, validate_product_name, validate_quantity,
};
use crate::MAX_BATCH_LINES;

// =============================================================================
// Line Draft (input)
// =============================================================================

/// What the capture surface hands over when a volunteer rings up one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDraft {
    /// Product name as shown at the till — becomes the frozen snapshot.
    pub product_name: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub tender: TenderMethod,

    /// Customer phone, any formatting. Normalized to canonical digits here.
    pub customer_phone: Option<String>,

    /// Order sheets carry the recipient's contact on every line.
    pub contact: Option<OrderContact>,
}

// =============================================================================
// Draft Line (captured)
// =============================================================================

/// A captured line: snapshot frozen, totals computed, point cost fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    pub product_name: String,
    pub category: Category,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub tender: TenderMethod,

    /// Canonical phone digits of the linked customer.
    pub customer_id: Option<String>,

    /// Fixed at capture for Points-tendered lines; `None` otherwise.
    pub point_cost: Option<i64>,

    pub contact: Option<OrderContact>,
}

impl DraftLine {
    /// Line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Batch Draft
// =============================================================================

/// An in-progress batch being captured by a volunteer.
///
/// ## Invariants
/// - Every line holds a capture-time snapshot (name, category, price)
/// - Points-tendered lines always carry a stored `point_cost` and a customer
/// - A rejected `add_line` leaves the draft exactly as it was
/// - Maximum lines: 200
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDraft {
    pub kind: BatchKind,
    pub volunteer: String,
    pub service_label: String,

    /// Free-text notes; sales reports only.
    pub notes: Option<String>,

    lines: Vec<DraftLine>,
}

impl BatchDraft {
    /// Starts a sales-report draft.
    pub fn sales(volunteer: impl Into<String>, service_label: impl Into<String>) -> Self {
        BatchDraft {
            kind: BatchKind::Sales,
            volunteer: volunteer.into(),
            service_label: service_label.into(),
            notes: None,
            lines: Vec::new(),
        }
    }

    /// Starts an order-sheet draft.
    pub fn order(volunteer: impl Into<String>, service_label: impl Into<String>) -> Self {
        BatchDraft {
            kind: BatchKind::Order,
            volunteer: volunteer.into(),
            service_label: service_label.into(),
            notes: None,
            lines: Vec::new(),
        }
    }

    /// Attaches free-text notes (builder style).
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Appends a line to the draft.
    ///
    /// ## The Capture Gate
    /// For a Points-tendered line the linked customer's current state and a
    /// points-config snapshot are required: affordability is checked HERE
    /// (`balance × point_value ≥ line_total`) and the point cost is fixed
    /// HERE. On any rejection the draft is unmodified.
    ///
    /// ## Arguments
    /// * `draft` - the raw line from the capture surface
    /// * `customer` - current state of the linked customer, if any
    /// * `config` - points configuration snapshot
    pub fn add_line(
        &mut self,
        draft: LineDraft,
        customer: Option<&Customer>,
        config: &PointsConfig,
    ) -> CoreResult<()> {
        validate_product_name(&draft.product_name)?;
        validate_quantity(draft.quantity)?;
        validate_price_cents(draft.unit_price_cents)?;

        if self.lines.len() >= MAX_BATCH_LINES {
            return Err(CoreError::BatchTooLarge {
                max: MAX_BATCH_LINES,
            });
        }

        let customer_id = match draft.customer_phone.as_deref() {
            Some(phone) => Some(normalize_phone(phone)?),
            None => None,
        };

        let line_total = Money::from_cents(draft.unit_price_cents).multiply_quantity(draft.quantity);

        let point_cost = if draft.tender.is_points() {
            let customer = match (&customer_id, customer) {
                (Some(_), Some(c)) => c,
                _ => {
                    return Err(ValidationError::Required {
                        field: "customer".to_string(),
                    }
                    .into())
                }
            };

            let cost = loyalty::point_cost(line_total, config)?;
            if !loyalty::can_afford(customer.points, line_total, config) {
                return Err(CoreError::InsufficientPoints {
                    customer_id: customer.id.clone(),
                    required_points: cost,
                    balance: customer.points,
                });
            }
            Some(cost)
        } else {
            None
        };

        self.lines.push(DraftLine {
            product_name: draft.product_name.trim().to_string(),
            category: draft.category,
            quantity: draft.quantity,
            unit_price_cents: draft.unit_price_cents,
            line_total_cents: line_total.cents(),
            tender: draft.tender,
            customer_id,
            point_cost,
            contact: draft.contact,
        });

        Ok(())
    }

    /// Removes a line by index. Returns the removed line, or `None` when the
    /// index is out of bounds.
    pub fn remove_line(&mut self, index: usize) -> Option<DraftLine> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    /// The captured lines, in ring-up order.
    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    /// Live tender totals for display before submission.
    pub fn totals(&self) -> TenderTotals {
        tender_totals(self.lines.iter().map(|l| (l.tender, l.line_total_cents)))
    }

    /// Number of captured lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Checks if the draft has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config() -> PointsConfig {
        PointsConfig::new(10).with_rate(Category::Food, 5)
    }

    fn customer(points: i64) -> Customer {
        Customer {
            id: "11987654321".to_string(),
            name: "Maria".to_string(),
            points,
            total_spent_cents: 0,
            last_purchase_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cash_line(qty: i64, unit_price_cents: i64) -> LineDraft {
        LineDraft {
            product_name: "Pastel".to_string(),
            category: Category::Food,
            quantity: qty,
            unit_price_cents,
            tender: TenderMethod::Cash,
            customer_phone: None,
            contact: None,
        }
    }

    #[test]
    fn test_add_line_freezes_snapshot() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft.add_line(cash_line(2, 800), None, &config()).unwrap();

        let line = &draft.lines()[0];
        assert_eq!(line.line_total_cents, 1600);
        assert_eq!(line.point_cost, None);
        assert_eq!(draft.totals().cash_cents, 1600);
        assert_eq!(draft.totals().total_cents, 1600);
    }

    #[test]
    fn test_customer_phone_is_normalized() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        let mut line = cash_line(1, 800);
        line.customer_phone = Some("(11) 98765-4321".to_string());
        draft.add_line(line, None, &config()).unwrap();

        assert_eq!(
            draft.lines()[0].customer_id.as_deref(),
            Some("11987654321")
        );
    }

    #[test]
    fn test_points_line_fixes_cost_at_capture() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        let c = customer(200); // worth R$20,00

        let mut line = cash_line(1, 1500); // R$15,00
        line.tender = TenderMethod::Points;
        line.customer_phone = Some(c.id.clone());
        draft.add_line(line, Some(&c), &config()).unwrap();

        assert_eq!(draft.lines()[0].point_cost, Some(150));
        // Redemption value shows in the points bucket, not the grand total
        assert_eq!(draft.totals().points_cents, 1500);
        assert_eq!(draft.totals().total_cents, 0);
    }

    #[test]
    fn test_points_line_rejected_when_unaffordable() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        let c = customer(40); // worth R$4,00

        let mut line = cash_line(1, 1500);
        line.tender = TenderMethod::Points;
        line.customer_phone = Some(c.id.clone());

        let err = draft.add_line(line, Some(&c), &config()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPoints { .. }));
        // The draft is unmodified
        assert!(draft.is_empty());
    }

    #[test]
    fn test_points_line_requires_customer() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");

        let mut line = cash_line(1, 500);
        line.tender = TenderMethod::Points;

        let err = draft.add_line(line, None, &config()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(draft.is_empty());
    }

    #[test]
    fn test_remove_line() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft.add_line(cash_line(1, 800), None, &config()).unwrap();

        assert!(draft.remove_line(5).is_none());
        let removed = draft.remove_line(0).unwrap();
        assert_eq!(removed.product_name, "Pastel");
        assert!(draft.is_empty());
    }

    #[test]
    fn test_rejects_bad_quantity() {
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        assert!(draft.add_line(cash_line(0, 800), None, &config()).is_err());
        assert!(draft.is_empty());
    }
}
