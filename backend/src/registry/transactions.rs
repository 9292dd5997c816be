use serde::Deserialize;

use super::{Registry, RegistryResult};
use crate::error::RegistryError;
use crate::models::Transaction;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    /// Matches either side of the transfer.
    pub user_id: Option<String>,
    pub property_id: Option<String>,
}

impl TransactionFilter {
    fn matches(&self, txn: &Transaction) -> bool {
        self.user_id
            .as_ref()
            .map_or(true, |u| &txn.from_owner == u || &txn.to_owner == u)
            && self.property_id.as_ref().map_or(true, |p| &txn.property_id == p)
    }
}

impl Registry {
    pub async fn get_transaction(&self, transaction_id: &str) -> RegistryResult<Transaction> {
        self.read(|data| {
            data.transactions
                .iter()
                .find(|t| t.transaction_id == transaction_id)
                .cloned()
                .ok_or_else(|| RegistryError::not_found("transaction", transaction_id))
        })
        .await
    }

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.read(|data| {
            data.transactions
                .iter()
                .filter(|t| filter.matches(t))
                .cloned()
                .collect()
        })
        .await
    }
}
