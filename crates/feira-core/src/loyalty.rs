//! # Loyalty Ledger Math
//!
//! Pure computations behind the points economy: accrual, redemption cost,
//! affordability.
//!
//! ## Accrual & Redemption at a Glance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Loyalty Postings                                   │
//! │                                                                         │
//! │  EARN (validation of a customer-linked, non-Points line)               │
//! │    points += rates[line.category]      ← flat, per LINE                │
//! │                                                                         │
//! │  REDEEM (validation of a Points-tendered line)                         │
//! │    points -= line.point_cost           ← fixed at CAPTURE time         │
//! │                                                                         │
//! │  REVERSAL (unvalidate)                                                 │
//! │    exact inverse of the stored deltas — never recomputed               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The accrual is per line, NOT scaled by quantity or price. That mirrors
//! the production behavior this engine replaces; switching to a
//! proportional formula is a product decision, not a bug fix.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Category, PointsConfig, TenderMethod};

// =============================================================================
// Accrual
// =============================================================================

/// Points earned by validating one line.
///
/// Returns 0 for Points-tendered lines (no stock-independent earn on a
/// redemption) and for unlinked lines. Otherwise the flat per-category rate,
/// applied once per line regardless of quantity.
///
/// ## Example
/// ```rust
/// use feira_core::loyalty::earned_points;
/// use feira_core::types::{Category, PointsConfig, TenderMethod};
///
/// let config = PointsConfig::new(10).with_rate(Category::Food, 5);
///
/// // qty 2 × R$8,00 Food line paid in cash: still 5 points — per line
/// assert_eq!(earned_points(&config, TenderMethod::Cash, Category::Food, true), 5);
/// assert_eq!(earned_points(&config, TenderMethod::Points, Category::Food, true), 0);
/// assert_eq!(earned_points(&config, TenderMethod::Cash, Category::Food, false), 0);
/// ```
pub fn earned_points(
    config: &PointsConfig,
    tender: TenderMethod,
    category: Category,
    customer_linked: bool,
) -> i64 {
    if !customer_linked || tender.is_points() {
        return 0;
    }
    config.rate(category)
}

// =============================================================================
// Redemption
// =============================================================================

/// Point cost of paying a line with points, fixed at capture time.
///
/// Ceiling division: a redemption must be fully funded, so fractional
/// remainders round against the customer, never against the till.
/// The result is stored on the line and treated as an immutable historical
/// fact — validation and reversal use the stored figure even if
/// `point_value` changes later.
///
/// ## Example
/// ```rust
/// use feira_core::loyalty::point_cost;
/// use feira_core::money::Money;
/// use feira_core::types::PointsConfig;
///
/// let config = PointsConfig::new(10); // one point worth R$0,10
///
/// // R$15,00 at R$0,10/point = 150 points
/// assert_eq!(point_cost(Money::from_cents(1500), &config).unwrap(), 150);
///
/// // R$15,05 rounds up to 151 points
/// assert_eq!(point_cost(Money::from_cents(1505), &config).unwrap(), 151);
/// ```
pub fn point_cost(line_total: Money, config: &PointsConfig) -> CoreResult<i64> {
    let pv = config.point_value_cents;
    if pv <= 0 {
        return Err(CoreError::invariant("point value must be positive"));
    }
    if line_total.is_negative() {
        return Err(CoreError::invariant("line total must not be negative"));
    }
    // Ceiling division in integer math; i128 to keep the sum safe from
    // overflow on pathological inputs.
    let cost = (line_total.cents() as i128 + pv as i128 - 1) / pv as i128;
    Ok(cost as i64)
}

/// Whether a balance covers a line total at the configured point value.
///
/// `balance × point_value ≥ line_total`, evaluated in i128 so large
/// balances cannot overflow.
pub fn can_afford(balance: i64, line_total: Money, config: &PointsConfig) -> bool {
    if config.point_value_cents <= 0 {
        return false;
    }
    (balance as i128) * (config.point_value_cents as i128) >= line_total.cents() as i128
}

/// Monetary worth of a point balance.
pub fn points_value(points: i64, config: &PointsConfig) -> Money {
    Money::from_cents(points.saturating_mul(config.point_value_cents))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PointsConfig {
        // R$0,10 per point, Food earns 5 points per line
        PointsConfig::new(10).with_rate(Category::Food, 5)
    }

    #[test]
    fn test_earn_is_flat_per_line() {
        let config = config();
        // Same rate whatever the quantity or price would have been
        assert_eq!(
            earned_points(&config, TenderMethod::Cash, Category::Food, true),
            5
        );
        assert_eq!(
            earned_points(&config, TenderMethod::Credit3x, Category::Food, true),
            5
        );
    }

    #[test]
    fn test_no_earn_without_customer() {
        assert_eq!(
            earned_points(&config(), TenderMethod::Cash, Category::Food, false),
            0
        );
    }

    #[test]
    fn test_no_earn_on_points_tender() {
        assert_eq!(
            earned_points(&config(), TenderMethod::Points, Category::Food, true),
            0
        );
    }

    #[test]
    fn test_unconfigured_category_earns_zero() {
        assert_eq!(
            earned_points(&config(), TenderMethod::Cash, Category::Bazaar, true),
            0
        );
    }

    #[test]
    fn test_point_cost_exact_multiple() {
        // R$15,00 / R$0,10 = 150 points
        let cost = point_cost(Money::from_cents(1500), &config()).unwrap();
        assert_eq!(cost, 150);
    }

    #[test]
    fn test_point_cost_rounds_up() {
        let cost = point_cost(Money::from_cents(1505), &config()).unwrap();
        assert_eq!(cost, 151);

        let cost = point_cost(Money::from_cents(1), &config()).unwrap();
        assert_eq!(cost, 1);
    }

    #[test]
    fn test_point_cost_zero_line() {
        assert_eq!(point_cost(Money::zero(), &config()).unwrap(), 0);
    }

    #[test]
    fn test_point_cost_rejects_bad_point_value() {
        let broken = PointsConfig::new(0);
        assert!(point_cost(Money::from_cents(100), &broken).is_err());
    }

    #[test]
    fn test_affordability() {
        let config = config();
        // 200 points at R$0,10 are worth R$20,00
        assert!(can_afford(200, Money::from_cents(1500), &config));
        assert!(can_afford(200, Money::from_cents(2000), &config));
        assert!(!can_afford(200, Money::from_cents(2001), &config));
        assert!(!can_afford(0, Money::from_cents(1), &config));
    }

    #[test]
    fn test_points_value() {
        assert_eq!(points_value(200, &config()).cents(), 2000);
    }
}
