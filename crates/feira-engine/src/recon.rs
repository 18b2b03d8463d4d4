//! # Reconciliation State Machine
//!
//! The authorized, atomic Validate / Unvalidate operations.
//!
//! ## One Transaction, All or Nothing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Validate(batch_id, credential)                        │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │    1. resolve credential against active admins  → Unauthorized?        │
//! │    2. batch exists?                             → NotFound?            │
//! │    3. CAS: status PENDING → VALIDATED           → InvalidState?        │
//! │    4. read points-config snapshot (one read, used throughout)          │
//! │    5. per line:                                                        │
//! │         stock = stock - qty WHERE stock >= qty  → InvariantViolation?  │
//! │         Points line:  points -= stored point_cost,  ledger 'redeem'    │
//! │         other + customer: points += rate[category], ledger 'earn',     │
//! │                           store points_earned, accumulate spend        │
//! │    6. recompute subtotals from the lines, freeze onto the batch        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction — SQLite rolls every    │
//! │  step back and the batch is left exactly PENDING with zero effects.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization Guarantees
//! - Per batch: the CAS status flip means two concurrent Validate calls on
//!   the same batch cannot both proceed — the loser sees zero rows affected
//!   and maps it to `InvalidState`.
//! - Per product/customer: every mutation is a relative delta
//!   (`stock = stock - ?`, `points = points + ?`), so validations of
//!   different batches touching the same entity never lose updates.
//! - Credential vs. mutation: the actor is resolved inside the same
//!   transaction that mutates, so no validation starts with a credential
//!   that was already revoked when the transaction began.
//!
//! ## Exact Reversal
//! Unvalidate restores the STORED deltas — the per-line `point_cost` fixed
//! at capture and `points_earned` fixed at validation — never a recompute
//! from current catalog prices or points configuration. Catalog and config
//! edits between Validate and Unvalidate therefore cannot skew the inverse.

use tracing::info;

use crate::auth;
use crate::engine::ReconciliationEngine;
use crate::error::{EngineError, EngineResult};
use feira_core::{batch_totals, loyalty, Batch, BatchStatus, LedgerKind};
use feira_db::repository::admin::AdminRepository;
use feira_db::repository::batch::BatchRepository;
use feira_db::repository::config::PointsConfigRepository;
use feira_db::repository::customer::CustomerRepository;
use feira_db::repository::ledger::PointLedgerRepository;
use feira_db::repository::product::ProductRepository;

impl ReconciliationEngine {
    /// Validates a PENDING batch: the authorized act of recognizing its
    /// revenue, stock and loyalty effects.
    ///
    /// ## Failure Conditions (all leave zero side effects)
    /// * `Unauthorized` - credential doesn't resolve to an active admin
    /// * `NotFound` - unknown batch, or a line names a vanished product
    /// * `InvalidState` - batch is not PENDING
    /// * `InvariantViolation` - a line would drive stock negative, or a
    ///   Points line lost its stored cost
    ///
    /// Point affordability is NOT re-checked here — that gate ran at
    /// capture time, when the line was appended to the draft.
    pub async fn validate_batch(&self, batch_id: &str, credential: &str) -> EngineResult<Batch> {
        let mut tx = self.database().begin().await?;

        // The authorization gate, before any mutation. Resolved inside the
        // transaction to close the check/use gap.
        let admins = AdminRepository::list_active_tx(&mut tx).await?;
        let actor = auth::resolve_actor(&admins, credential).ok_or(EngineError::Unauthorized)?;
        let actor_name = actor.name.clone();

        let batch = BatchRepository::get_tx(&mut tx, batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))?;
        if batch.status != BatchStatus::Pending {
            return Err(EngineError::invalid_state(batch_id, batch.status, "validate"));
        }

        // CAS flip: the per-batch single-writer gate. Zero rows means a
        // concurrent call won the race after our read above.
        let flipped = BatchRepository::cas_status_tx(
            &mut tx,
            batch_id,
            BatchStatus::Pending,
            BatchStatus::Validated,
            Some(&actor_name),
        )
        .await?;
        if flipped == 0 {
            return Err(EngineError::invalid_state(
                batch_id,
                BatchStatus::Validated,
                "validate",
            ));
        }

        // One consistent configuration snapshot for the whole operation.
        let config = PointsConfigRepository::get_tx(&mut tx).await?;
        let items = BatchRepository::items_tx(&mut tx, batch_id).await?;
        let now = chrono::Utc::now();

        for item in &items {
            // Stock decrement, matched by the denormalized name snapshot.
            let affected =
                ProductRepository::decrement_stock_tx(&mut tx, &item.product_name, item.quantity)
                    .await?;
            if affected == 0 {
                // The guard refused: find out which way.
                return Err(
                    match ProductRepository::stock_of_tx(&mut tx, &item.product_name).await? {
                        None => EngineError::not_found("Product", &item.product_name),
                        Some(available) => EngineError::invariant(format!(
                            "stock for '{}' would go negative: available {}, requested {}",
                            item.product_name, available, item.quantity
                        )),
                    },
                );
            }

            let Some(customer_id) = &item.customer_id else {
                continue;
            };

            // Customers are created implicitly on first identified purchase.
            let fallback_name = item.contact.as_ref().map(|c| c.name.as_str()).unwrap_or("");
            CustomerRepository::get_or_create_tx(&mut tx, customer_id, fallback_name).await?;

            if item.tender.is_points() {
                // Redeem: debit the cost fixed at capture time.
                let cost = item.point_cost.ok_or_else(|| {
                    EngineError::invariant(format!(
                        "points line {} has no stored point cost",
                        item.id
                    ))
                })?;
                CustomerRepository::adjust_points_tx(&mut tx, customer_id, -cost).await?;
                PointLedgerRepository::append_tx(
                    &mut tx,
                    customer_id,
                    Some(batch_id),
                    LedgerKind::Redeem,
                    -cost,
                    Some(&item.product_name),
                )
                .await?;
            } else {
                // Earn: flat per-category rate, once per line. Stored on the
                // line so reversal never has to consult the config again.
                let earned = loyalty::earned_points(&config, item.tender, item.category, true);
                if earned != 0 {
                    CustomerRepository::adjust_points_tx(&mut tx, customer_id, earned).await?;
                    PointLedgerRepository::append_tx(
                        &mut tx,
                        customer_id,
                        Some(batch_id),
                        LedgerKind::Earn,
                        earned,
                        Some(&item.product_name),
                    )
                    .await?;
                }
                BatchRepository::set_points_earned_tx(&mut tx, &item.id, Some(earned)).await?;

                // Monetary lines accumulate lifetime spend.
                CustomerRepository::record_purchase_tx(
                    &mut tx,
                    customer_id,
                    item.line_total_cents,
                    now,
                )
                .await?;
            }
        }

        // Recompute the four-way subtotals + grand total from the stored
        // lines and freeze them onto the batch.
        let totals = batch_totals(&items);
        BatchRepository::freeze_totals_tx(&mut tx, batch_id, &totals).await?;

        tx.commit().await?;

        info!(
            batch = %batch_id,
            actor = %actor_name,
            total_cents = totals.total_cents,
            lines = items.len(),
            "Batch validated"
        );

        self.database()
            .batches()
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))
    }

    /// Reverses a VALIDATED batch: the exact inverse of `validate_batch`.
    ///
    /// Destructive from a business standpoint (it removes recognized
    /// revenue) — the confirmation gate belongs to the calling surface. Once
    /// called, the engine performs it unconditionally and atomically:
    /// restore stock, post the inverse of every stored loyalty delta, roll
    /// back spend accumulation, clear the validating actor, return to
    /// PENDING.
    ///
    /// ## Failure Conditions (all leave zero side effects)
    /// * `NotFound` - unknown batch, or a product row deleted since
    ///   validation (partial restoration is never acceptable)
    /// * `InvalidState` - batch is not VALIDATED
    pub async fn unvalidate_batch(&self, batch_id: &str) -> EngineResult<Batch> {
        let mut tx = self.database().begin().await?;

        let batch = BatchRepository::get_tx(&mut tx, batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))?;
        if batch.status != BatchStatus::Validated {
            return Err(EngineError::invalid_state(
                batch_id,
                batch.status,
                "unvalidate",
            ));
        }

        // CAS flip back to PENDING; clears the validating actor.
        let flipped = BatchRepository::cas_status_tx(
            &mut tx,
            batch_id,
            BatchStatus::Validated,
            BatchStatus::Pending,
            None,
        )
        .await?;
        if flipped == 0 {
            return Err(EngineError::invalid_state(
                batch_id,
                BatchStatus::Pending,
                "unvalidate",
            ));
        }

        let items = BatchRepository::items_tx(&mut tx, batch_id).await?;

        for item in &items {
            ProductRepository::restore_stock_tx(&mut tx, &item.product_name, item.quantity)
                .await?;

            let Some(customer_id) = &item.customer_id else {
                continue;
            };

            if item.tender.is_points() {
                // Credit back the cost fixed at capture time.
                let cost = item.point_cost.ok_or_else(|| {
                    EngineError::invariant(format!(
                        "points line {} has no stored point cost",
                        item.id
                    ))
                })?;
                CustomerRepository::adjust_points_tx(&mut tx, customer_id, cost).await?;
                PointLedgerRepository::append_tx(
                    &mut tx,
                    customer_id,
                    Some(batch_id),
                    LedgerKind::Reversal,
                    cost,
                    Some(&item.product_name),
                )
                .await?;
            } else {
                // Subtract back exactly what validation credited.
                if let Some(earned) = item.points_earned {
                    if earned != 0 {
                        CustomerRepository::adjust_points_tx(&mut tx, customer_id, -earned)
                            .await?;
                        PointLedgerRepository::append_tx(
                            &mut tx,
                            customer_id,
                            Some(batch_id),
                            LedgerKind::Reversal,
                            -earned,
                            Some(&item.product_name),
                        )
                        .await?;
                    }
                    BatchRepository::set_points_earned_tx(&mut tx, &item.id, None).await?;
                }

                CustomerRepository::rollback_purchase_tx(&mut tx, customer_id, item.line_total_cents)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(batch = %batch_id, lines = items.len(), "Batch validation reversed");

        self.database()
            .batches()
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feira_core::{
        BatchDraft, Category, Customer, LineDraft, OrderContact, PointsConfig, Product,
        TenderMethod,
    };
    use feira_db::repository::product::generate_product_id;
    use feira_db::{BatchFilter, Database, DbConfig};

    const ADMIN_CREDENTIAL: &str = "1234";

    /// Engine over an in-memory database with one admin, a seeded catalog
    /// and the scenario config: one point worth R$0,10, Food earns 5/line.
    async fn engine() -> ReconciliationEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = ReconciliationEngine::new(db);

        engine
            .register_admin("Padre João", ADMIN_CREDENTIAL)
            .await
            .unwrap();
        engine
            .update_points_config(PointsConfig::new(10).with_rate(Category::Food, 5))
            .await
            .unwrap();

        seed_product(&engine, "Pastel", Category::Food, 800, 10).await;
        seed_product(&engine, "Refrigerante", Category::Drink, 500, 20).await;

        engine
    }

    async fn seed_product(
        engine: &ReconciliationEngine,
        name: &str,
        category: Category,
        price: i64,
        stock: i64,
    ) {
        let now = Utc::now();
        engine
            .database()
            .products()
            .insert(&Product {
                id: generate_product_id(),
                name: name.to_string(),
                category,
                price_cents: price,
                cost_cents: 0,
                stock,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    async fn stock_of(engine: &ReconciliationEngine, name: &str) -> i64 {
        engine
            .database()
            .products()
            .get_by_name(name)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn customer(engine: &ReconciliationEngine, id: &str) -> Customer {
        engine
            .database()
            .customers()
            .get(id)
            .await
            .unwrap()
            .unwrap()
    }

    fn line(
        product: &str,
        category: Category,
        qty: i64,
        unit_price: i64,
        tender: TenderMethod,
        phone: Option<&str>,
    ) -> LineDraft {
        LineDraft {
            product_name: product.to_string(),
            category,
            quantity: qty,
            unit_price_cents: unit_price,
            tender,
            customer_phone: phone.map(str::to_string),
            contact: None,
        }
    }

    /// The reference earn scenario: one Food line, qty 2 × R$8,00, cash,
    /// linked customer starting at 0 points.
    async fn submit_earn_batch(engine: &ReconciliationEngine) -> String {
        let config = engine.points_config().await.unwrap();
        let maria = engine
            .get_or_create_customer("11987654321", "Maria")
            .await
            .unwrap();

        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(
                line(
                    "Pastel",
                    Category::Food,
                    2,
                    800,
                    TenderMethod::Cash,
                    Some(&maria.id),
                ),
                Some(&maria),
                &config,
            )
            .unwrap();

        engine.submit_batch(draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_validate_earn_scenario() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        let batch = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();

        // Stock dropped by the line quantity
        assert_eq!(stock_of(&engine, "Pastel").await, 8);

        // Flat per-line accrual: 5 points, not scaled by qty or price
        let maria = customer(&engine, "11987654321").await;
        assert_eq!(maria.points, 5);
        assert_eq!(maria.total_spent_cents, 1600);
        assert!(maria.last_purchase_at.is_some());

        // Frozen subtotals
        assert_eq!(batch.status, BatchStatus::Validated);
        assert_eq!(batch.validated_by.as_deref(), Some("Padre João"));
        assert_eq!(batch.total_cash_cents, 1600);
        assert_eq!(batch.total_cents, 1600);

        // Audit trail
        let ledger = engine
            .database()
            .point_ledger()
            .list_for_batch(&batch_id)
            .await
            .unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, LedgerKind::Earn);
        assert_eq!(ledger[0].points_delta, 5);
    }

    #[tokio::test]
    async fn test_unvalidate_restores_everything() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        let batch = engine.unvalidate_batch(&batch_id).await.unwrap();

        assert_eq!(batch.status, BatchStatus::Pending);
        assert_eq!(batch.validated_by, None);
        assert_eq!(stock_of(&engine, "Pastel").await, 10);

        let maria = customer(&engine, "11987654321").await;
        assert_eq!(maria.points, 0);
        assert_eq!(maria.total_spent_cents, 0);

        // A reversal appends the inverse, it never deletes history
        let ledger = engine
            .database()
            .point_ledger()
            .list_for_batch(&batch_id)
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.iter().map(|e| e.points_delta).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn test_redemption_scenario() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        // C has 200 points, worth R$20,00 at R$0,10/point
        let maria = engine
            .get_or_create_customer("11987654321", "Maria")
            .await
            .unwrap();
        engine
            .adjust_points(&maria.id, 200, "starting balance")
            .await
            .unwrap();
        let maria = customer(&engine, &maria.id).await;

        // R$15,00 line tendered as Points: allowed, stored cost = 150
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(
                line(
                    "Pastel",
                    Category::Food,
                    1,
                    1500,
                    TenderMethod::Points,
                    Some(&maria.id),
                ),
                Some(&maria),
                &config,
            )
            .unwrap();
        assert_eq!(draft.lines()[0].point_cost, Some(150));

        let batch_id = engine.submit_batch(draft).await.unwrap();
        let batch = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();

        // Balance debited by the stored cost; no earn on a redemption
        assert_eq!(customer(&engine, "11987654321").await.points, 50);
        // Redemption is not revenue
        assert_eq!(batch.total_points_cents, 1500);
        assert_eq!(batch.total_cents, 0);
        // Redemptions do not accumulate spend
        assert_eq!(customer(&engine, "11987654321").await.total_spent_cents, 0);

        engine.unvalidate_batch(&batch_id).await.unwrap();
        assert_eq!(customer(&engine, "11987654321").await.points, 200);
        assert_eq!(stock_of(&engine, "Pastel").await, 10);
    }

    #[tokio::test]
    async fn test_redemption_uses_stored_cost_after_config_change() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let maria = engine
            .get_or_create_customer("11987654321", "Maria")
            .await
            .unwrap();
        engine.adjust_points(&maria.id, 200, "start").await.unwrap();
        let maria = customer(&engine, &maria.id).await;

        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(
                line(
                    "Pastel",
                    Category::Food,
                    1,
                    1500,
                    TenderMethod::Points,
                    Some(&maria.id),
                ),
                Some(&maria),
                &config,
            )
            .unwrap();
        let batch_id = engine.submit_batch(draft).await.unwrap();

        // Point value changes between capture and validation: the stored
        // cost of 150 is an immutable historical fact.
        engine
            .update_points_config(PointsConfig::new(50).with_rate(Category::Food, 5))
            .await
            .unwrap();

        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        assert_eq!(customer(&engine, "11987654321").await.points, 50);
    }

    #[tokio::test]
    async fn test_reversal_uses_stored_earn_after_rate_change() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        assert_eq!(customer(&engine, "11987654321").await.points, 5);

        // Rate jumps from 5 to 50 before the reversal: the stored earn of 5
        // is what gets subtracted back.
        engine
            .update_points_config(PointsConfig::new(10).with_rate(Category::Food, 50))
            .await
            .unwrap();

        engine.unvalidate_batch(&batch_id).await.unwrap();
        assert_eq!(customer(&engine, "11987654321").await.points, 0);
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_credential() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        let err = engine.validate_batch(&batch_id, "wrong").await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));

        // Zero side effects
        assert_eq!(stock_of(&engine, "Pastel").await, 10);
        assert_eq!(customer(&engine, "11987654321").await.points, 0);
        let detail = engine.get_batch(&batch_id).await.unwrap();
        assert_eq!(detail.batch.status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_validate_twice_is_invalid_state() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        let err = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));

        // No double stock decrement, no double earn
        assert_eq!(stock_of(&engine, "Pastel").await, 8);
        assert_eq!(customer(&engine, "11987654321").await.points, 5);
    }

    #[tokio::test]
    async fn test_unvalidate_pending_is_invalid_state() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        let err = engine.unvalidate_batch(&batch_id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_validate_unknown_batch() {
        let engine = engine().await;
        let err = engine
            .validate_batch("no-such-batch", ADMIN_CREDENTIAL)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_atomically() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();
        let maria = engine
            .get_or_create_customer("11987654321", "Maria")
            .await
            .unwrap();

        // First line is fine; second asks for more Refrigerante than exists.
        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(
                line(
                    "Pastel",
                    Category::Food,
                    2,
                    800,
                    TenderMethod::Cash,
                    Some(&maria.id),
                ),
                Some(&maria),
                &config,
            )
            .unwrap();
        draft
            .add_line(
                line("Refrigerante", Category::Drink, 999, 500, TenderMethod::Pix, None),
                None,
                &config,
            )
            .unwrap();
        let batch_id = engine.submit_batch(draft).await.unwrap();

        let err = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));

        // Nothing partially applied: first line's effects rolled back too
        assert_eq!(stock_of(&engine, "Pastel").await, 10);
        assert_eq!(stock_of(&engine, "Refrigerante").await, 20);
        assert_eq!(customer(&engine, "11987654321").await.points, 0);
        let detail = engine.get_batch(&batch_id).await.unwrap();
        assert_eq!(detail.batch.status, BatchStatus::Pending);
        assert!(detail.items.iter().all(|i| i.points_earned.is_none()));
    }

    #[tokio::test]
    async fn test_validate_unknown_product_is_not_found() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(
                line("Produto Fantasma", Category::Other, 1, 100, TenderMethod::Cash, None),
                None,
                &config,
            )
            .unwrap();
        let batch_id = engine.submit_batch(draft).await.unwrap();

        let err = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let detail = engine.get_batch(&batch_id).await.unwrap();
        assert_eq!(detail.batch.status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_subtotal_partition_identity() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut draft = BatchDraft::sales("Ana", "Festa Junina");
        draft
            .add_line(line("Pastel", Category::Food, 1, 800, TenderMethod::Cash, None), None, &config)
            .unwrap();
        draft
            .add_line(
                line("Refrigerante", Category::Drink, 2, 500, TenderMethod::Pix, None),
                None,
                &config,
            )
            .unwrap();
        draft
            .add_line(
                line("Pastel", Category::Food, 1, 800, TenderMethod::Credit2x, None),
                None,
                &config,
            )
            .unwrap();
        draft
            .add_line(
                line("Refrigerante", Category::Drink, 1, 500, TenderMethod::Debit, None),
                None,
                &config,
            )
            .unwrap();
        let batch_id = engine.submit_batch(draft).await.unwrap();

        let batch = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();

        assert_eq!(batch.total_cash_cents, 800);
        assert_eq!(batch.total_pix_cents, 1000);
        assert_eq!(batch.total_credit_cents, 800);
        assert_eq!(batch.total_debit_cents, 500);
        assert_eq!(
            batch.total_cents,
            batch.total_cash_cents
                + batch.total_pix_cents
                + batch.total_debit_cents
                + batch.total_credit_cents
        );
    }

    #[tokio::test]
    async fn test_delivery_tracking_after_validation() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let contact = OrderContact {
            name: "Maria".to_string(),
            team: Some("Equipe Azul".to_string()),
            phone: Some("11987654321".to_string()),
        };
        let mut draft = BatchDraft::order("Bia", "Festa Junina");
        let mut l = line("Pastel", Category::Food, 1, 800, TenderMethod::Pix, None);
        l.contact = Some(contact.clone());
        draft.add_line(l, None, &config).unwrap();
        let mut l = line("Refrigerante", Category::Drink, 2, 500, TenderMethod::Cash, None);
        l.contact = Some(contact);
        draft.add_line(l, None, &config).unwrap();

        let batch_id = engine.submit_batch(draft).await.unwrap();
        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();

        let feed = engine.pending_deliveries().await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].volunteer, "Bia");
        assert!(feed[0].contact.is_some());

        // Idempotent hand-off; no effect on stock, points or status
        engine.mark_delivered(&batch_id, 0).await.unwrap();
        engine.mark_delivered(&batch_id, 0).await.unwrap();

        let feed = engine.pending_deliveries().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].position, 1);

        let detail = engine.get_batch(&batch_id).await.unwrap();
        assert_eq!(detail.batch.status, BatchStatus::Validated);
        assert_eq!(stock_of(&engine, "Pastel").await, 9);

        // Delivery state survives listing round trips
        let validated = engine
            .list_validated(&BatchFilter::default().volunteer("Bia"))
            .await
            .unwrap();
        assert_eq!(validated.len(), 1);
    }

    #[tokio::test]
    async fn test_revalidation_after_reversal() {
        let engine = engine().await;
        let batch_id = submit_earn_batch(&engine).await;

        engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        engine.unvalidate_batch(&batch_id).await.unwrap();

        // The cycle is repeatable: PENDING batches validate again cleanly.
        let batch = engine
            .validate_batch(&batch_id, ADMIN_CREDENTIAL)
            .await
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Validated);
        assert_eq!(stock_of(&engine, "Pastel").await, 8);
        assert_eq!(customer(&engine, "11987654321").await.points, 5);
    }
}
