//! # Payment Ledger
//!
//! The installment list of one order and the derived paid/balance/status.
//!
//! ## Recompute
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add / update / remove installment                                      │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  recompute() ← one explicit pass, no hidden hooks                       │
//! │    1. total_paid = Σ installment.amount                                 │
//! │    2. balance    = order_total − total_paid                             │
//! │    3. status     = balance ≤ 0 → FullyPaid                              │
//! │                    paid > 0    → PartiallyPaid                          │
//! │                    otherwise   → Unpaid                                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  LedgerTotals (written in one statement by bahi-db)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The derived fields have no setters. The only way to change them is to
//! change the installment list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LedgerStatus, OrderStatus, PaymentMethod};
use crate::validation::{validate_note, validate_payment_amount};

// =============================================================================
// Installments
// =============================================================================

/// One recorded payment towards an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentInstallment {
    pub id: String,
    pub order_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

impl PaymentInstallment {
    /// Creates a new installment with a fresh id.
    pub fn new(order_id: impl Into<String>, input: &InstallmentInput, paid_at: DateTime<Utc>) -> Self {
        PaymentInstallment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            amount: input.amount,
            method: input.method,
            note: input.note.clone(),
            paid_at,
        }
    }
}

/// Caller-supplied installment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstallmentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

impl InstallmentInput {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        InstallmentInput {
            amount,
            method,
            note: None,
        }
    }

    /// Amount must be positive; note is length-bounded.
    pub fn validate(&self) -> CoreResult<()> {
        validate_payment_amount(self.amount)?;
        validate_note("note", self.note.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Ledger Totals
// =============================================================================

/// The derived half of a payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerTotals {
    pub order_total: Money,
    pub total_paid: Money,
    /// May go negative on overpayment.
    pub balance: Money,
    pub status: LedgerStatus,
}

impl LedgerTotals {
    /// Runs the recompute rule over an installment list.
    ///
    /// Fails with [`ValidationError::Overflow`] if the paid total or the
    /// balance leaves the i64 range.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    /// use bahi_core::payment::LedgerTotals;
    /// use bahi_core::types::LedgerStatus;
    ///
    /// let totals = LedgerTotals::compute(Money::from_minor(1000), [Money::from_minor(400)]).unwrap();
    /// assert_eq!(totals.balance.minor(), 600);
    /// assert_eq!(totals.status, LedgerStatus::PartiallyPaid);
    /// ```
    pub fn compute(
        order_total: Money,
        amounts: impl IntoIterator<Item = Money>,
    ) -> Result<Self, ValidationError> {
        let total_paid =
            Money::checked_sum(amounts).ok_or_else(|| ValidationError::overflow("total_paid"))?;
        let balance = order_total
            .checked_sub(total_paid)
            .ok_or_else(|| ValidationError::overflow("balance"))?;

        Ok(LedgerTotals::settle(order_total, total_paid, balance))
    }

    /// Totals of a ledger with nothing paid yet.
    pub fn unpaid(order_total: Money) -> Self {
        LedgerTotals::settle(order_total, Money::zero(), order_total)
    }

    fn settle(order_total: Money, total_paid: Money, balance: Money) -> Self {
        let status = if !balance.is_positive() {
            LedgerStatus::FullyPaid
        } else if total_paid.is_positive() {
            LedgerStatus::PartiallyPaid
        } else {
            LedgerStatus::Unpaid
        };

        LedgerTotals {
            order_total,
            total_paid,
            balance,
            status,
        }
    }
}

// =============================================================================
// Payment Ledger
// =============================================================================

/// Installments of one order plus their derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PaymentLedger {
    order_id: String,
    installments: Vec<PaymentInstallment>,
    totals: LedgerTotals,
}

impl PaymentLedger {
    /// An empty ledger for a new order.
    pub fn open(order_id: impl Into<String>, order_total: Money) -> Self {
        PaymentLedger {
            order_id: order_id.into(),
            installments: Vec::new(),
            totals: LedgerTotals::unpaid(order_total),
        }
    }

    /// Rebuilds a ledger from stored installments, recomputing its totals.
    ///
    /// Stored derived columns are never trusted on load.
    pub fn restore(
        order_id: impl Into<String>,
        order_total: Money,
        installments: Vec<PaymentInstallment>,
    ) -> CoreResult<Self> {
        let totals = LedgerTotals::compute(order_total, installments.iter().map(|i| i.amount))?;
        Ok(PaymentLedger {
            order_id: order_id.into(),
            installments,
            totals,
        })
    }

    /// Recomputes paid, balance and status from the installment list.
    pub fn recompute(&mut self) -> CoreResult<LedgerTotals> {
        self.totals = LedgerTotals::compute(
            self.totals.order_total,
            self.installments.iter().map(|i| i.amount),
        )?;
        Ok(self.totals)
    }

    /// Appends an installment and recomputes.
    pub fn add(&mut self, installment: PaymentInstallment) -> CoreResult<LedgerTotals> {
        validate_payment_amount(installment.amount)?;
        let mut next = self.installments.clone();
        next.push(installment);
        self.replace_installments(next)
    }

    /// Replaces an installment's amount, method and note, then recomputes.
    pub fn update(&mut self, installment_id: &str, input: &InstallmentInput) -> CoreResult<LedgerTotals> {
        input.validate()?;
        let mut next = self.installments.clone();
        let installment = next
            .iter_mut()
            .find(|i| i.id == installment_id)
            .ok_or_else(|| installment_not_found(&self.order_id, installment_id))?;

        installment.amount = input.amount;
        installment.method = input.method;
        installment.note = input.note.clone();

        self.replace_installments(next)
    }

    /// Removes an installment and recomputes. Returns the removed one.
    pub fn remove(&mut self, installment_id: &str) -> CoreResult<PaymentInstallment> {
        let index = self
            .installments
            .iter()
            .position(|i| i.id == installment_id)
            .ok_or_else(|| installment_not_found(&self.order_id, installment_id))?;

        let mut next = self.installments.clone();
        let removed = next.remove(index);
        self.replace_installments(next)?;
        Ok(removed)
    }

    /// Swaps in a new installment list only if its totals are representable.
    fn replace_installments(&mut self, next: Vec<PaymentInstallment>) -> CoreResult<LedgerTotals> {
        let totals = LedgerTotals::compute(self.totals.order_total, next.iter().map(|i| i.amount))?;
        self.installments = next;
        self.totals = totals;
        Ok(totals)
    }

    /// Order status after this ledger's current totals are applied.
    pub fn settled_order_status(&self, current: OrderStatus) -> OrderStatus {
        OrderStatus::from_ledger(current, self.totals.status)
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn installments(&self) -> &[PaymentInstallment] {
        &self.installments
    }

    pub fn installment(&self, installment_id: &str) -> Option<&PaymentInstallment> {
        self.installments.iter().find(|i| i.id == installment_id)
    }

    pub fn totals(&self) -> LedgerTotals {
        self.totals
    }

    pub fn order_total(&self) -> Money {
        self.totals.order_total
    }

    pub fn total_paid(&self) -> Money {
        self.totals.total_paid
    }

    pub fn balance(&self) -> Money {
        self.totals.balance
    }

    pub fn status(&self) -> LedgerStatus {
        self.totals.status
    }
}

fn installment_not_found(order_id: &str, installment_id: &str) -> CoreError {
    CoreError::InstallmentNotFound {
        order_id: order_id.to_string(),
        installment_id: installment_id.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
