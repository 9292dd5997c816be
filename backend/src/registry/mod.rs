//! In-process registry of users, properties, offers, escrows and the audit
//! trail derived from them.
//!
//! Every mutation validates first and writes second under one acquisition of
//! the write lock, so a failed rule check never leaves a half-applied record.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RegistryError;
use crate::models::{
    RegistryData, RegistryStats, SyncPayload, Transaction, TransactionStatus, TransactionType,
    User,
};

mod escrows;
mod offers;
mod properties;
mod transactions;
mod users;

pub use escrows::new_escrow_record;
pub use offers::{new_offer_record, OfferFilter};
pub use properties::{new_property_record, PropertyFilter};
pub use transactions::TransactionFilter;
pub use users::{new_user_record, DEMO_ADMIN_ID};

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Default)]
pub struct Registry {
    data: RwLock<RegistryData>,
    dirty: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: RegistryData) -> Self {
        Self {
            data: RwLock::new(data),
            dirty: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> RegistryData {
        self.data.read().await.clone()
    }

    /// Overwrites the collections present in `payload`. The audit log is
    /// append-only and never taken from a sync.
    pub async fn replace(&self, payload: SyncPayload) -> RegistryStats {
        let mut data = self.data.write().await;
        if let Some(users) = payload.users {
            data.users = users;
        }
        if let Some(properties) = payload.properties {
            data.properties = properties;
        }
        if let Some(offers) = payload.offers {
            data.offers = offers;
        }
        if let Some(transactions) = payload.transactions {
            log::warn!(
                "Ignoring {} synced transactions; the audit log is append-only",
                transactions.len()
            );
        }
        if let Some(escrows) = payload.escrows {
            data.escrows = escrows;
        }
        self.mark_dirty();
        stats_of(&data)
    }

    pub async fn stats(&self) -> RegistryStats {
        stats_of(&*self.data.read().await)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clears the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    async fn read<T>(&self, f: impl FnOnce(&RegistryData) -> T) -> T {
        let data = self.data.read().await;
        f(&data)
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RegistryData) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut data = self.data.write().await;
        let out = f(&mut data)?;
        self.mark_dirty();
        Ok(out)
    }
}

fn stats_of(data: &RegistryData) -> RegistryStats {
    RegistryStats {
        users: data.users.len(),
        properties: data.properties.len(),
        offers: data.offers.len(),
        transactions: data.transactions.len(),
        escrows: data.escrows.len(),
    }
}

/// `PREFIX_` followed by twelve upper-case hex digits.
pub fn generate_id(prefix: &str) -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}_{}", prefix, &raw[..12])
}

/// `TXN_<unix millis>_<9 chars>`, the shape the browser store used.
pub fn generate_transaction_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TXN_{}_{}", Utc::now().timestamp_millis(), &raw[..9])
}

struct Audit<'a> {
    kind: TransactionType,
    status: TransactionStatus,
    property_id: &'a str,
    from_owner: &'a str,
    to_owner: &'a str,
    amount: f64,
    offer_id: &'a str,
    transaction_id: Option<String>,
}

fn append_audit(data: &mut RegistryData, audit: Audit<'_>) -> Transaction {
    let transaction = Transaction {
        transaction_id: audit.transaction_id.unwrap_or_else(generate_transaction_id),
        property_id: audit.property_id.to_string(),
        from_owner: audit.from_owner.to_string(),
        to_owner: audit.to_owner.to_string(),
        amount: audit.amount,
        status: audit.status,
        offer_id: audit.offer_id.to_string(),
        timestamp: Utc::now(),
        kind: audit.kind,
    };
    log::info!(
        "Transaction recorded: {} {}",
        transaction.kind,
        transaction.transaction_id
    );
    data.transactions.push(transaction.clone());
    transaction
}

fn require_admin<'a>(data: &'a RegistryData, admin_id: &str) -> RegistryResult<&'a User> {
    let admin = data
        .users
        .iter()
        .find(|u| u.user_id == admin_id)
        .ok_or_else(|| RegistryError::not_found("user", admin_id))?;
    if !admin.role.is_admin() {
        return Err(RegistryError::Validation(format!(
            "user {} is not an administrator",
            admin_id
        )));
    }
    Ok(admin)
}

pub fn require_text(field: &str, value: &str) -> RegistryResult<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> RegistryResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RegistryError::Validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(())
}
