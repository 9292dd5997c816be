use chrono::Utc;
use serde::Deserialize;

use super::properties::transfer;
use super::{
    append_audit, generate_id, require_admin, require_positive, require_text, Audit, Registry,
    RegistryResult,
};
use crate::error::RegistryError;
use crate::models::{
    NewOffer, Offer, OfferAction, OfferStatus, Property, PropertyStatus, RegistryData,
    Transaction, TransactionStatus, TransactionType,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferFilter {
    pub property_id: Option<String>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub status: Option<OfferStatus>,
}

impl OfferFilter {
    fn matches(&self, offer: &Offer) -> bool {
        self.property_id.as_ref().map_or(true, |p| &offer.property_id == p)
            && self.buyer_id.as_ref().map_or(true, |b| &offer.buyer_id == b)
            && self.seller_id.as_ref().map_or(true, |s| &offer.seller_id == s)
            && self.status.map_or(true, |s| offer.status == s)
    }
}

pub fn new_offer_record(new: NewOffer) -> RegistryResult<Offer> {
    require_text("propertyId", &new.property_id)?;
    require_text("buyerId", &new.buyer_id)?;
    require_text("sellerId", &new.seller_id)?;
    require_positive("offerAmount", new.offer_amount)?;
    if new.buyer_id == new.seller_id {
        return Err(RegistryError::Validation(
            "buyer and seller must differ".to_string(),
        ));
    }

    let now = Utc::now();
    Ok(Offer {
        offer_id: new
            .offer_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_id("OFFER")),
        property_id: new.property_id,
        buyer_id: new.buyer_id,
        buyer_name: new.buyer_name,
        seller_id: new.seller_id,
        seller_name: new.seller_name,
        offer_amount: new.offer_amount,
        message: new.message,
        status: OfferStatus::Pending,
        admin_verified: false,
        admin_id: String::new(),
        verified_at: None,
        sepolia_tx_hash: String::new(),
        created_at: now,
        updated_at: now,
    })
}

fn find_offer<'a>(offers: &'a [Offer], offer_id: &str) -> RegistryResult<&'a Offer> {
    offers
        .iter()
        .find(|o| o.offer_id == offer_id)
        .ok_or_else(|| RegistryError::not_found("offer", offer_id))
}

fn check_new_offer(data: &RegistryData, offer: &Offer) -> RegistryResult<()> {
    if data.offers.iter().any(|o| o.offer_id == offer.offer_id) {
        return Err(RegistryError::already_exists("offer", &offer.offer_id));
    }
    let property = data
        .properties
        .iter()
        .find(|p| p.property_id == offer.property_id)
        .ok_or_else(|| RegistryError::not_found("property", &offer.property_id))?;
    if property.status == PropertyStatus::Transferred {
        return Err(RegistryError::InvalidTransition {
            kind: "property",
            id: property.property_id.clone(),
            current: property.status.to_string(),
            action: "make an offer on",
        });
    }
    if property.owner != offer.seller_id {
        return Err(RegistryError::Validation(format!(
            "{} does not own property {}",
            offer.seller_id, property.property_id
        )));
    }
    Ok(())
}

fn check_action(data: &RegistryData, offer_id: &str, action: OfferAction) -> RegistryResult<Offer> {
    let offer = find_offer(&data.offers, offer_id)?;
    if !action.allowed_from(offer.status) {
        return Err(RegistryError::InvalidTransition {
            kind: "offer",
            id: offer_id.to_string(),
            current: offer.status.to_string(),
            action: action.verb(),
        });
    }
    if action == OfferAction::Complete {
        let property = data
            .properties
            .iter()
            .find(|p| p.property_id == offer.property_id)
            .ok_or_else(|| RegistryError::not_found("property", &offer.property_id))?;
        if property.status == PropertyStatus::Transferred || property.owner != offer.seller_id {
            return Err(RegistryError::InvalidTransition {
                kind: "property",
                id: property.property_id.clone(),
                current: property.status.to_string(),
                action: "complete",
            });
        }
    }
    Ok(offer.clone())
}

/// Moves the offer to the action's target status and records the audit row,
/// seller to buyer. `update` fills in action-specific fields.
fn apply(
    data: &mut RegistryData,
    offer_id: &str,
    action: OfferAction,
    transaction_id: Option<String>,
    update: impl FnOnce(&mut Offer),
) -> RegistryResult<(Offer, Transaction)> {
    check_action(data, offer_id, action)?;
    let offer = data
        .offers
        .iter_mut()
        .find(|o| o.offer_id == offer_id)
        .ok_or_else(|| RegistryError::not_found("offer", offer_id))?;
    offer.status = action.target();
    offer.updated_at = Utc::now();
    update(&mut *offer);
    let offer = offer.clone();

    let (kind, status) = action.audit();
    let transaction = append_audit(
        data,
        Audit {
            kind,
            status,
            property_id: &offer.property_id,
            from_owner: &offer.seller_id,
            to_owner: &offer.buyer_id,
            amount: offer.offer_amount,
            offer_id: &offer.offer_id,
            transaction_id,
        },
    );
    log::info!("Offer {} is now {}", offer.offer_id, offer.status);
    Ok((offer, transaction))
}

/// Cancels every other open offer on the property once it has changed hands.
fn close_competing_offers(data: &mut RegistryData, completed: &Offer) {
    let open: Vec<String> = data
        .offers
        .iter()
        .filter(|o| {
            o.property_id == completed.property_id
                && o.offer_id != completed.offer_id
                && OfferAction::Cancel.allowed_from(o.status)
                && o.status != OfferStatus::Rejected
        })
        .map(|o| o.offer_id.clone())
        .collect();
    for offer_id in open {
        // The sale already went through, so a refused cancel is only logged.
        if let Err(err) = apply(data, &offer_id, OfferAction::Cancel, None, |_| {}) {
            log::warn!("Could not close competing offer {}: {}", offer_id, err);
        }
    }
}

impl Registry {
    pub async fn check_new_offer(&self, offer: &Offer) -> RegistryResult<()> {
        self.read(|data| check_new_offer(data, offer)).await
    }

    pub async fn create_offer(&self, offer: Offer) -> RegistryResult<Offer> {
        self.mutate(|data| {
            check_new_offer(data, &offer)?;
            data.offers.push(offer.clone());
            append_audit(
                data,
                Audit {
                    kind: TransactionType::OfferCreated,
                    status: TransactionStatus::Pending,
                    property_id: &offer.property_id,
                    from_owner: &offer.buyer_id,
                    to_owner: &offer.seller_id,
                    amount: offer.offer_amount,
                    offer_id: &offer.offer_id,
                    transaction_id: None,
                },
            );
            log::info!(
                "Offer {} created on {} for {}",
                offer.offer_id,
                offer.property_id,
                offer.offer_amount
            );
            Ok(offer)
        })
        .await
    }

    /// Rule check ahead of a ledger submission; nothing changes.
    pub async fn check_offer(&self, offer_id: &str, action: OfferAction) -> RegistryResult<Offer> {
        self.read(|data| check_action(data, offer_id, action)).await
    }

    pub async fn check_admin_verification(
        &self,
        offer_id: &str,
        admin_id: &str,
    ) -> RegistryResult<Offer> {
        self.read(|data| {
            require_admin(data, admin_id)?;
            check_action(data, offer_id, OfferAction::AdminVerify)
        })
        .await
    }

    pub async fn accept_offer(&self, offer_id: &str) -> RegistryResult<Offer> {
        self.simple_transition(offer_id, OfferAction::Accept).await
    }

    pub async fn reject_offer(&self, offer_id: &str) -> RegistryResult<Offer> {
        self.simple_transition(offer_id, OfferAction::Reject).await
    }

    pub async fn cancel_offer(&self, offer_id: &str) -> RegistryResult<Offer> {
        self.simple_transition(offer_id, OfferAction::Cancel).await
    }

    async fn simple_transition(&self, offer_id: &str, action: OfferAction) -> RegistryResult<Offer> {
        self.mutate(|data| apply(data, offer_id, action, None, |_| {}).map(|(offer, _)| offer))
            .await
    }

    /// Records the admin's sign-off together with the Sepolia transaction
    /// hash their wallet produced.
    pub async fn admin_verify_offer(
        &self,
        offer_id: &str,
        admin_id: &str,
        sepolia_tx_hash: &str,
    ) -> RegistryResult<Offer> {
        require_text("sepoliaTxHash", sepolia_tx_hash)?;
        self.mutate(|data| {
            require_admin(data, admin_id)?;
            let (offer, _) = apply(data, offer_id, OfferAction::AdminVerify, None, |offer| {
                offer.admin_verified = true;
                offer.admin_id = admin_id.to_string();
                offer.verified_at = Some(offer.updated_at);
                offer.sepolia_tx_hash = sepolia_tx_hash.to_string();
            })?;
            Ok(offer)
        })
        .await
    }

    /// Closes the deal: the offer completes and the property passes to the
    /// buyer, recorded as one `PROPERTY_TRANSFERRED` row.
    pub async fn complete_offer(
        &self,
        offer_id: &str,
        transaction_id: String,
    ) -> RegistryResult<(Offer, Property, Transaction)> {
        self.mutate(|data| {
            let offer = check_action(data, offer_id, OfferAction::Complete)?;
            let (property, transaction) = transfer(
                data,
                &offer.property_id,
                &offer.buyer_id,
                &offer.buyer_name,
                Some(offer.offer_amount),
                &offer.offer_id,
                Some(transaction_id),
            )?;
            let offer = data
                .offers
                .iter_mut()
                .find(|o| o.offer_id == offer_id)
                .ok_or_else(|| RegistryError::not_found("offer", offer_id))?;
            offer.status = OfferStatus::Completed;
            offer.updated_at = Utc::now();
            let offer = offer.clone();
            log::info!("Offer {} completed", offer_id);
            close_competing_offers(data, &offer);
            Ok((offer, property, transaction))
        })
        .await
    }

    pub async fn get_offer(&self, offer_id: &str) -> RegistryResult<Offer> {
        self.read(|data| find_offer(&data.offers, offer_id).cloned())
            .await
    }

    pub async fn list_offers(&self, filter: &OfferFilter) -> Vec<Offer> {
        self.read(|data| {
            data.offers
                .iter()
                .filter(|o| filter.matches(o))
                .cloned()
                .collect()
        })
        .await
    }

    /// Offers the seller accepted that still wait on an admin.
    pub async fn pending_admin_verifications(&self) -> Vec<Offer> {
        self.list_offers(&OfferFilter {
            status: Some(OfferStatus::Accepted),
            ..Default::default()
        })
        .await
    }

    pub async fn offer_history(&self, offer_id: &str) -> RegistryResult<Vec<Transaction>> {
        self.read(|data| {
            find_offer(&data.offers, offer_id)?;
            Ok(data
                .transactions
                .iter()
                .filter(|t| t.offer_id == offer_id)
                .cloned()
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewOffer;
    use crate::registry::fixtures::with_verified_plot;
    use crate::registry::DEMO_ADMIN_ID;

    fn bid(id: &str) -> Offer {
        new_offer_record(NewOffer {
            offer_id: Some(id.to_string()),
            property_id: "PROP_1".to_string(),
            buyer_id: "BUYER_001".to_string(),
            buyer_name: "Priya Sharma".to_string(),
            seller_id: "SELLER_001".to_string(),
            seller_name: "Ramesh Kumar".to_string(),
            offer_amount: 2_300_000.0,
            message: "Ready to close this month".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn full_lifecycle_transfers_the_property() {
        let registry = with_verified_plot().await;
        registry.set_listing("PROP_1", true).await.unwrap();
        registry.create_offer(bid("OFFER_1")).await.unwrap();

        let accepted = registry.accept_offer("OFFER_1").await.unwrap();
        assert_eq!(accepted.status, OfferStatus::Accepted);
        assert_eq!(registry.pending_admin_verifications().await.len(), 1);

        let verified = registry
            .admin_verify_offer("OFFER_1", DEMO_ADMIN_ID, "0xfeed")
            .await
            .unwrap();
        assert_eq!(verified.status, OfferStatus::AdminVerified);
        assert!(verified.admin_verified);
        assert_eq!(verified.sepolia_tx_hash, "0xfeed");
        assert!(verified.verified_at.is_some());
        assert!(registry.pending_admin_verifications().await.is_empty());

        let (offer, property, txn) = registry
            .complete_offer("OFFER_1", "TXN_DONE".to_string())
            .await
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Completed);
        assert_eq!(property.owner, "BUYER_001");
        assert_eq!(property.owner_name, "Priya Sharma");
        assert_eq!(property.status, PropertyStatus::Transferred);
        assert!(!property.listed_for_sale);
        assert_eq!(txn.amount, 2_300_000.0);

        let kinds: Vec<TransactionType> = registry
            .offer_history("OFFER_1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionType::OfferCreated,
                TransactionType::OfferAccepted,
                TransactionType::OfferVerified,
                TransactionType::PropertyTransferred,
            ]
        );
        assert!(registry.marketplace().await.is_empty());
    }

    #[tokio::test]
    async fn audit_rows_run_buyer_to_seller_then_back() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        registry.reject_offer("OFFER_1").await.unwrap();

        let history = registry.offer_history("OFFER_1").await.unwrap();
        assert_eq!(history[0].from_owner, "BUYER_001");
        assert_eq!(history[0].status, TransactionStatus::Pending);
        assert_eq!(history[1].kind, TransactionType::OfferRejected);
        assert_eq!(history[1].from_owner, "SELLER_001");
        assert_eq!(history[1].status, TransactionStatus::Cancelled);
    }

    #[tokio::test]
    async fn out_of_order_moves_change_nothing() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        let before = registry.stats().await.transactions;

        let err = registry
            .admin_verify_offer("OFFER_1", DEMO_ADMIN_ID, "0xfeed")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { action: "verify", .. }));
        let err = registry
            .complete_offer("OFFER_1", "TXN_X".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { action: "complete", .. }));

        registry.accept_offer("OFFER_1").await.unwrap();
        assert!(registry.accept_offer("OFFER_1").await.is_err());
        assert!(registry.reject_offer("OFFER_1").await.is_err());

        assert_eq!(registry.stats().await.transactions, before + 1);
        assert_eq!(registry.get_offer("OFFER_1").await.unwrap().status, OfferStatus::Accepted);
        assert_eq!(registry.get_property("PROP_1").await.unwrap().owner, "SELLER_001");
    }

    #[tokio::test]
    async fn cancel_is_refused_once_completed() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        registry.accept_offer("OFFER_1").await.unwrap();
        registry
            .admin_verify_offer("OFFER_1", DEMO_ADMIN_ID, "0xfeed")
            .await
            .unwrap();
        registry.complete_offer("OFFER_1", "TXN_1".to_string()).await.unwrap();
        let err = registry.cancel_offer("OFFER_1").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { action: "cancel", .. }));
    }

    #[tokio::test]
    async fn offers_need_a_live_property_owned_by_the_seller() {
        let registry = with_verified_plot().await;

        let mut stray = bid("OFFER_1");
        stray.property_id = "PROP_404".to_string();
        assert!(matches!(
            registry.create_offer(stray).await,
            Err(RegistryError::NotFound { kind: "property", .. })
        ));

        let mut wrong_seller = bid("OFFER_2");
        wrong_seller.seller_id = "SELLER_999".to_string();
        assert!(matches!(
            registry.create_offer(wrong_seller).await,
            Err(RegistryError::Validation(_))
        ));

        registry.create_offer(bid("OFFER_3")).await.unwrap();
        assert!(matches!(
            registry.create_offer(bid("OFFER_3")).await,
            Err(RegistryError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn competing_offer_cannot_complete_after_a_sale() {
        let registry = with_verified_plot().await;
        for id in ["OFFER_1", "OFFER_2"] {
            registry.create_offer(bid(id)).await.unwrap();
            registry.accept_offer(id).await.unwrap();
            registry
                .admin_verify_offer(id, DEMO_ADMIN_ID, "0xfeed")
                .await
                .unwrap();
        }
        registry.create_offer(bid("OFFER_3")).await.unwrap();

        registry.complete_offer("OFFER_1", "TXN_1".to_string()).await.unwrap();

        let loser = registry.get_offer("OFFER_2").await.unwrap();
        assert_eq!(loser.status, OfferStatus::Cancelled);
        assert_eq!(
            registry.get_offer("OFFER_3").await.unwrap().status,
            OfferStatus::Cancelled
        );
        let history = registry.offer_history("OFFER_2").await.unwrap();
        assert_eq!(history.last().unwrap().kind, TransactionType::OfferCancelled);

        let err = registry
            .complete_offer("OFFER_2", "TXN_2".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
        assert_eq!(registry.get_property("PROP_1").await.unwrap().owner, "BUYER_001");
    }

    #[tokio::test]
    async fn completion_needs_the_seller_to_still_own_the_property() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        registry.accept_offer("OFFER_1").await.unwrap();
        registry
            .admin_verify_offer("OFFER_1", DEMO_ADMIN_ID, "0xfeed")
            .await
            .unwrap();
        registry
            .mutate(|data| {
                data.properties[0].owner = "SELLER_002".to_string();
                Ok(())
            })
            .await
            .unwrap();

        let err = registry
            .complete_offer("OFFER_1", "TXN_1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidTransition { kind: "property", action: "complete", .. }
        ));
        assert_eq!(
            registry.get_offer("OFFER_1").await.unwrap().status,
            OfferStatus::AdminVerified
        );
    }

    #[tokio::test]
    async fn non_admins_cannot_verify() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        registry.accept_offer("OFFER_1").await.unwrap();
        let err = registry
            .check_admin_verification("OFFER_1", "BUYER_001")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn filter_by_buyer_and_status() {
        let registry = with_verified_plot().await;
        registry.create_offer(bid("OFFER_1")).await.unwrap();
        registry.create_offer(bid("OFFER_2")).await.unwrap();
        registry.accept_offer("OFFER_2").await.unwrap();

        let filter = OfferFilter {
            buyer_id: Some("BUYER_001".to_string()),
            status: Some(OfferStatus::Pending),
            ..Default::default()
        };
        let found = registry.list_offers(&filter).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offer_id, "OFFER_1");
    }
}
