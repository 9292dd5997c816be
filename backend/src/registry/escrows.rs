use chrono::Utc;

use super::{generate_id, require_positive, require_text, Registry, RegistryResult};
use crate::error::RegistryError;
use crate::models::{Escrow, EscrowAction, EscrowStatus, NewEscrow, RegistryData};

pub fn new_escrow_record(new: NewEscrow) -> RegistryResult<Escrow> {
    require_text("propertyId", &new.property_id)?;
    require_text("buyer", &new.buyer)?;
    require_text("seller", &new.seller)?;
    require_positive("amount", new.amount)?;

    let now = Utc::now();
    Ok(Escrow {
        escrow_id: new
            .escrow_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_id("ESCROW")),
        property_id: new.property_id,
        buyer: new.buyer,
        seller: new.seller,
        amount: new.amount,
        status: EscrowStatus::Created,
        transaction_hash: String::new(),
        created_at: now,
        updated_at: now,
    })
}

fn check_action(data: &RegistryData, escrow_id: &str, action: EscrowAction) -> RegistryResult<()> {
    let escrow = data
        .escrows
        .iter()
        .find(|e| e.escrow_id == escrow_id)
        .ok_or_else(|| RegistryError::not_found("escrow", escrow_id))?;
    if !action.allowed_from(escrow.status) {
        return Err(RegistryError::InvalidTransition {
            kind: "escrow",
            id: escrow_id.to_string(),
            current: escrow.status.to_string(),
            action: action.verb(),
        });
    }
    Ok(())
}

impl Registry {
    pub async fn ensure_escrow_absent(&self, escrow_id: &str) -> RegistryResult<()> {
        self.read(|data| {
            if data.escrows.iter().any(|e| e.escrow_id == escrow_id) {
                return Err(RegistryError::already_exists("escrow", escrow_id));
            }
            Ok(())
        })
        .await
    }

    pub async fn create_escrow(&self, escrow: Escrow) -> RegistryResult<Escrow> {
        self.mutate(|data| {
            if data.escrows.iter().any(|e| e.escrow_id == escrow.escrow_id) {
                return Err(RegistryError::already_exists("escrow", &escrow.escrow_id));
            }
            log::info!("Escrow {} opened for {}", escrow.escrow_id, escrow.property_id);
            data.escrows.push(escrow.clone());
            Ok(escrow)
        })
        .await
    }

    pub async fn check_escrow(&self, escrow_id: &str, action: EscrowAction) -> RegistryResult<()> {
        self.read(|data| check_action(data, escrow_id, action)).await
    }

    /// Applies `action`, recording the on-chain hash that backs it.
    pub async fn transition_escrow(
        &self,
        escrow_id: &str,
        action: EscrowAction,
        transaction_hash: &str,
    ) -> RegistryResult<Escrow> {
        require_text("transactionHash", transaction_hash)?;
        self.mutate(|data| {
            check_action(data, escrow_id, action)?;
            let escrow = data
                .escrows
                .iter_mut()
                .find(|e| e.escrow_id == escrow_id)
                .ok_or_else(|| RegistryError::not_found("escrow", escrow_id))?;
            escrow.status = action.target();
            escrow.transaction_hash = transaction_hash.to_string();
            escrow.updated_at = Utc::now();
            log::info!("Escrow {} is now {}", escrow_id, escrow.status);
            Ok(escrow.clone())
        })
        .await
    }

    pub async fn get_escrow(&self, escrow_id: &str) -> RegistryResult<Escrow> {
        self.read(|data| {
            data.escrows
                .iter()
                .find(|e| e.escrow_id == escrow_id)
                .cloned()
                .ok_or_else(|| RegistryError::not_found("escrow", escrow_id))
        })
        .await
    }

    pub async fn list_escrows(&self) -> Vec<Escrow> {
        self.read(|data| data.escrows.clone()).await
    }
}
