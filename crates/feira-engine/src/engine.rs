//! # Engine Surface
//!
//! The operations exposed to calling surfaces (UI, CLI or API layer):
//! batch submission, listings, the review check-mark, the delivery tracker,
//! loyalty configuration and manual adjustments.
//!
//! The two heavyweight operations — `validate_batch` and
//! `unvalidate_batch` — live in [`crate::recon`].

use chrono::Utc;
use tracing::{debug, info};

use crate::auth;
use crate::error::{EngineError, EngineResult};
use feira_core::validation::{
    normalize_phone, validate_accrual_rate, validate_person_name, validate_point_value,
};
use feira_core::{
    Admin, Batch, BatchDetail, BatchDraft, BatchKind, BatchLine, BatchStatus, Customer,
    LedgerKind, PendingDelivery, PointLedgerEntry, PointsConfig,
};
use feira_db::repository::batch::{generate_batch_id, generate_item_id};
use feira_db::repository::customer::CustomerRepository;
use feira_db::repository::ledger::PointLedgerRepository;
use feira_db::{BatchFilter, Database};

// =============================================================================
// Engine
// =============================================================================

/// The Reconciliation & Loyalty Ledger Engine.
///
/// ## Responsibilities
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    ReconciliationEngine                                 │
/// │                                                                         │
/// │  SubmitBatch ──► batch + ordered lines persisted, status PENDING       │
/// │  Validate ─────► authorized, atomic: stock / points / frozen totals    │
/// │  Unvalidate ───► exact inverse of Validate, from stored deltas         │
/// │  MarkDelivered ► order-line hand-off flag, idempotent                  │
/// │  ListPending / ListValidated ──► filterable by volunteer & service     │
/// │  UpdatePointsConfig ──► explicit admin update, never retroactive       │
/// │  AdjustPoints ──► manual correction, logged as a ledger entry          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Cloning is cheap: the engine only holds the database handle.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    db: Database,
}

impl ReconciliationEngine {
    /// Creates an engine over an opened database.
    pub fn new(db: Database) -> Self {
        ReconciliationEngine { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Registers an administrative actor.
    ///
    /// The credential is hashed immediately; only the hash is stored.
    pub async fn register_admin(&self, name: &str, credential: &str) -> EngineResult<Admin> {
        validate_person_name(name).map_err(|e| EngineError::Validation(e.to_string()))?;
        if credential.is_empty() {
            return Err(EngineError::Validation("credential is required".to_string()));
        }

        let hash = auth::hash_credential(credential)?;
        let admin = self.db.admins().insert(name, &hash).await?;

        info!(name = %name, "Admin registered");
        Ok(admin)
    }

    /// Replaces the points configuration.
    ///
    /// Takes effect on subsequent validations only — already-validated
    /// batches keep their stored per-line deltas.
    pub async fn update_points_config(&self, config: PointsConfig) -> EngineResult<()> {
        validate_point_value(config.point_value_cents)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        for &rate in config.rates.values() {
            validate_accrual_rate(rate).map_err(|e| EngineError::Validation(e.to_string()))?;
        }

        self.db.points_config().update(&config).await?;
        Ok(())
    }

    /// Reads the current points configuration.
    pub async fn points_config(&self) -> EngineResult<PointsConfig> {
        Ok(self.db.points_config().get().await?)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Looks up a customer by phone, creating the record on first reference.
    ///
    /// This is the capture surface's entry point: the returned balance feeds
    /// the `BatchDraft` affordability gate for Points-tendered lines.
    pub async fn get_or_create_customer(&self, phone: &str, name: &str) -> EngineResult<Customer> {
        let id = normalize_phone(phone).map_err(|e| EngineError::Validation(e.to_string()))?;
        Ok(self.db.customers().get_or_create(&id, name).await?)
    }

    /// Gets a customer by phone, without creating one.
    pub async fn get_customer(&self, phone: &str) -> EngineResult<Option<Customer>> {
        let id = normalize_phone(phone).map_err(|e| EngineError::Validation(e.to_string()))?;
        Ok(self.db.customers().get(&id).await?)
    }

    /// Manually adjusts a customer's point balance, outside any batch.
    ///
    /// Used for corrections — including zeroing an erroneous negative
    /// balance. Logged as a standalone ledger entry. Returns the new
    /// balance.
    pub async fn adjust_points(
        &self,
        customer_id: &str,
        delta: i64,
        reason: &str,
    ) -> EngineResult<i64> {
        let mut tx = self.db.begin().await?;

        let balance = CustomerRepository::adjust_points_tx(&mut tx, customer_id, delta).await?;
        PointLedgerRepository::append_tx(
            &mut tx,
            customer_id,
            None,
            LedgerKind::Adjustment,
            delta,
            Some(reason),
        )
        .await?;

        tx.commit().await?;

        info!(customer = %customer_id, delta = delta, balance = balance, "Manual point adjustment");
        Ok(balance)
    }

    /// A customer's point ledger, newest first.
    pub async fn customer_ledger(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> EngineResult<Vec<PointLedgerEntry>> {
        Ok(self
            .db
            .point_ledger()
            .list_for_customer(customer_id, limit)
            .await?)
    }

    // =========================================================================
    // Submission & Listing
    // =========================================================================

    /// Persists a finished draft as a PENDING batch.
    ///
    /// From here on the line list is append/remove-free; the only way its
    /// effects change is through Validate/Unvalidate. Customers referenced
    /// by lines are created implicitly (upsert-on-lookup).
    ///
    /// ## Returns
    /// The new batch id.
    pub async fn submit_batch(&self, draft: BatchDraft) -> EngineResult<String> {
        if draft.is_empty() {
            return Err(EngineError::Validation(
                "batch draft has no lines".to_string(),
            ));
        }
        validate_person_name(&draft.volunteer)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        if draft.service_label.trim().is_empty() {
            return Err(EngineError::Validation(
                "service label is required".to_string(),
            ));
        }

        // Ensure every referenced customer exists before the batch lands.
        for line in draft.lines() {
            if let Some(customer_id) = &line.customer_id {
                let fallback_name = line
                    .contact
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("");
                self.db
                    .customers()
                    .get_or_create(customer_id, fallback_name)
                    .await?;
            }
        }

        let now = Utc::now();
        let batch_id = generate_batch_id();
        let totals = draft.totals();

        let batch = Batch {
            id: batch_id.clone(),
            kind: draft.kind,
            volunteer: draft.volunteer.clone(),
            service_label: draft.service_label.clone(),
            submitted_at: now,
            status: BatchStatus::Pending,
            validated_by: None,
            // Notes are a sales-report concept
            notes: match draft.kind {
                BatchKind::Sales => draft.notes.clone(),
                BatchKind::Order => None,
            },
            total_cash_cents: totals.cash_cents,
            total_pix_cents: totals.pix_cents,
            total_debit_cents: totals.debit_cents,
            total_credit_cents: totals.credit_cents,
            total_points_cents: totals.points_cents,
            total_cents: totals.total_cents,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<BatchLine> = draft
            .lines()
            .iter()
            .enumerate()
            .map(|(position, line)| BatchLine {
                id: generate_item_id(),
                batch_id: batch_id.clone(),
                position: position as i64,
                product_name: line.product_name.clone(),
                category: line.category,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total_cents,
                tender: line.tender,
                customer_id: line.customer_id.clone(),
                checked: false,
                point_cost: line.point_cost,
                points_earned: None,
                delivered: false,
                contact: line.contact.clone(),
                created_at: now,
            })
            .collect();

        self.db.batches().insert(&batch, &items).await?;

        info!(
            batch = %batch_id,
            kind = ?batch.kind,
            volunteer = %batch.volunteer,
            lines = items.len(),
            "Batch submitted"
        );
        Ok(batch_id)
    }

    /// Gets a batch with its items.
    pub async fn get_batch(&self, batch_id: &str) -> EngineResult<BatchDetail> {
        self.db
            .batches()
            .get_detail(batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))
    }

    /// Lists PENDING batches, optionally filtered by volunteer, service
    /// context and kind.
    pub async fn list_pending(&self, filter: &BatchFilter) -> EngineResult<Vec<Batch>> {
        Ok(self.db.batches().list(BatchStatus::Pending, filter).await?)
    }

    /// Lists VALIDATED batches, optionally filtered.
    pub async fn list_validated(&self, filter: &BatchFilter) -> EngineResult<Vec<Batch>> {
        Ok(self
            .db
            .batches()
            .list(BatchStatus::Validated, filter)
            .await?)
    }

    // =========================================================================
    // Review & Delivery Tracker
    // =========================================================================

    /// Toggles an item's review check-mark. Returns the new state.
    pub async fn toggle_item_checked(
        &self,
        batch_id: &str,
        item_index: i64,
    ) -> EngineResult<bool> {
        // Distinguish "no such batch" from "no such item"
        if self.db.batches().get_by_id(batch_id).await?.is_none() {
            return Err(EngineError::not_found("Batch", batch_id));
        }

        debug!(batch = %batch_id, item = item_index, "Toggling review check-mark");
        Ok(self.db.batches().toggle_checked(batch_id, item_index).await?)
    }

    /// Marks an order line as physically handed over.
    ///
    /// ## Rules
    /// - Order batches only
    /// - Only meaningful once the batch is VALIDATED
    /// - Idempotent: re-marking a delivered item is a no-op, not an error
    /// - Never touches stock, points or the parent batch's status
    pub async fn mark_delivered(&self, batch_id: &str, item_index: i64) -> EngineResult<()> {
        let batch = self
            .db
            .batches()
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))?;

        if batch.kind != BatchKind::Order {
            return Err(EngineError::Validation(
                "sales report lines have no delivery tracking".to_string(),
            ));
        }
        if batch.status != BatchStatus::Validated {
            return Err(EngineError::invalid_state(
                batch_id,
                batch.status,
                "mark delivered",
            ));
        }

        self.db.batches().set_delivered(batch_id, item_index).await?;

        info!(batch = %batch_id, item = item_index, "Order item delivered");
        Ok(())
    }

    /// The pending-deliveries feed: every undelivered line across all
    /// VALIDATED order batches, annotated with batch id, submission date and
    /// responsible volunteer. Consumed by an external notification
    /// collaborator.
    pub async fn pending_deliveries(&self) -> EngineResult<Vec<PendingDelivery>> {
        Ok(self.db.batches().pending_deliveries().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use feira_core::{Category, LineDraft, Product, TenderMethod};
    use feira_db::DbConfig;

    async fn engine() -> ReconciliationEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        ReconciliationEngine::new(db)
    }

    async fn seed_product(engine: &ReconciliationEngine, name: &str, price: i64, stock: i64) {
        let now = Utc::now();
        engine
            .database()
            .products()
            .insert(&Product {
                id: feira_db::repository::product::generate_product_id(),
                name: name.to_string(),
                category: Category::Food,
                price_cents: price,
                cost_cents: 0,
                stock,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    fn cash_line(product: &str, qty: i64, unit_price: i64) -> LineDraft {
        LineDraft {
            product_name: product.to_string(),
            category: Category::Food,
            quantity: qty,
            unit_price_cents: unit_price,
            tender: TenderMethod::Cash,
            customer_phone: None,
            contact: None,
        }
    }

    #[tokio::test]
    async fn test_submit_and_get_batch() {
        let engine = engine().await;
        seed_product(&engine, "Pastel", 800, 50).await;

        let config = engine.points_config().await.unwrap();
        let mut draft = BatchDraft::sales("Ana", "Sábado").with_notes("caixa 2");
        draft.add_line(cash_line("Pastel", 2, 800), None, &config).unwrap();

        let id = engine.submit_batch(draft).await.unwrap();
        let detail = engine.get_batch(&id).await.unwrap();

        assert_eq!(detail.batch.status, BatchStatus::Pending);
        assert_eq!(detail.batch.notes.as_deref(), Some("caixa 2"));
        assert_eq!(detail.batch.total_cash_cents, 1600);
        assert_eq!(detail.items.len(), 1);
        assert!(!detail.items[0].checked);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_draft() {
        let engine = engine().await;
        let draft = BatchDraft::sales("Ana", "Sábado");

        let err = engine.submit_batch(draft).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_order_batch_drops_notes() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut draft = BatchDraft::order("Ana", "Sábado").with_notes("should vanish");
        draft.add_line(cash_line("Bolo", 1, 600), None, &config).unwrap();

        let id = engine.submit_batch(draft).await.unwrap();
        let detail = engine.get_batch(&id).await.unwrap();
        assert_eq!(detail.batch.notes, None);
    }

    #[tokio::test]
    async fn test_submit_creates_referenced_customers() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut line = cash_line("Pastel", 1, 800);
        line.customer_phone = Some("(11) 98765-4321".to_string());

        let mut draft = BatchDraft::sales("Ana", "Sábado");
        draft.add_line(line, None, &config).unwrap();
        engine.submit_batch(draft).await.unwrap();

        let customer = engine.get_customer("11987654321").await.unwrap();
        assert!(customer.is_some());
    }

    #[tokio::test]
    async fn test_toggle_item_checked() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut draft = BatchDraft::sales("Ana", "Sábado");
        draft.add_line(cash_line("Pastel", 1, 800), None, &config).unwrap();
        let id = engine.submit_batch(draft).await.unwrap();

        assert!(engine.toggle_item_checked(&id, 0).await.unwrap());
        assert!(!engine.toggle_item_checked(&id, 0).await.unwrap());

        let err = engine.toggle_item_checked("missing", 0).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mark_delivered_requires_validated_order() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        // Pending order: delivery tracking not meaningful yet
        let mut draft = BatchDraft::order("Ana", "Sábado");
        draft.add_line(cash_line("Bolo", 1, 600), None, &config).unwrap();
        let order_id = engine.submit_batch(draft).await.unwrap();

        let err = engine.mark_delivered(&order_id, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));

        // Sales batches have no delivery tracking at all
        let mut draft = BatchDraft::sales("Ana", "Sábado");
        draft.add_line(cash_line("Pastel", 1, 800), None, &config).unwrap();
        let sales_id = engine.submit_batch(draft).await.unwrap();

        let err = engine.mark_delivered(&sales_id, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_manual_adjustment_writes_ledger() {
        let engine = engine().await;
        let customer = engine
            .get_or_create_customer("11987654321", "Maria")
            .await
            .unwrap();

        let balance = engine
            .adjust_points(&customer.id, -7, "zeroing capture mistake")
            .await
            .unwrap();
        assert_eq!(balance, -7);

        let entries = engine.customer_ledger(&customer.id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LedgerKind::Adjustment);
        assert_eq!(entries[0].points_delta, -7);
        assert_eq!(entries[0].batch_id, None);
    }

    #[tokio::test]
    async fn test_adjust_points_unknown_customer() {
        let engine = engine().await;
        let err = engine.adjust_points("00000000", 5, "x").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_points_config_rejects_bad_point_value() {
        let engine = engine().await;
        let err = engine
            .update_points_config(PointsConfig::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let engine = engine().await;
        let config = engine.points_config().await.unwrap();

        let mut draft = BatchDraft::sales("Ana", "Sábado");
        draft.add_line(cash_line("Pastel", 1, 800), None, &config).unwrap();
        engine.submit_batch(draft).await.unwrap();

        let mut draft = BatchDraft::order("Bia", "Domingo");
        draft.add_line(cash_line("Bolo", 1, 600), None, &config).unwrap();
        engine.submit_batch(draft).await.unwrap();

        let all = engine.list_pending(&BatchFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let anas = engine
            .list_pending(&BatchFilter::default().volunteer("Ana"))
            .await
            .unwrap();
        assert_eq!(anas.len(), 1);
        assert_eq!(anas[0].volunteer, "Ana");

        let validated = engine.list_validated(&BatchFilter::default()).await.unwrap();
        assert!(validated.is_empty());
    }
}
