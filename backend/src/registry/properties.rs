use chrono::Utc;
use serde::Deserialize;

use super::{
    append_audit, generate_id, require_admin, require_positive, require_text, Audit, Registry,
    RegistryResult,
};
use crate::error::RegistryError;
use crate::models::{
    NewProperty, Property, PropertyStatus, RegistryData, Transaction, TransactionStatus,
    TransactionType,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    pub owner: Option<String>,
    pub status: Option<PropertyStatus>,
    pub property_type: Option<String>,
}

impl PropertyFilter {
    fn matches(&self, property: &Property) -> bool {
        self.owner.as_ref().map_or(true, |o| &property.owner == o)
            && self.status.map_or(true, |s| property.status == s)
            && self
                .property_type
                .as_ref()
                .map_or(true, |t| property.property_type.eq_ignore_ascii_case(t))
    }
}

pub fn new_property_record(new: NewProperty) -> RegistryResult<Property> {
    require_text("owner", &new.owner)?;
    require_text("location", &new.location)?;
    require_positive("area", new.area)?;
    require_positive("price", new.price)?;

    let now = Utc::now();
    Ok(Property {
        property_id: new
            .property_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_id("PROP")),
        owner: new.owner,
        owner_name: new.owner_name,
        location: new.location,
        area: new.area,
        price: new.price,
        property_type: new.property_type.to_uppercase(),
        description: new.description,
        latitude: new.latitude,
        longitude: new.longitude,
        status: PropertyStatus::Pending,
        listed_for_sale: false,
        documents: Vec::new(),
        verified_by: String::new(),
        verified_at: None,
        registered_at: now,
        last_updated: now,
        views: 0,
    })
}

fn find_property<'a>(
    properties: &'a [Property],
    property_id: &str,
) -> RegistryResult<&'a Property> {
    properties
        .iter()
        .find(|p| p.property_id == property_id)
        .ok_or_else(|| RegistryError::not_found("property", property_id))
}

pub(super) fn find_property_mut<'a>(
    properties: &'a mut [Property],
    property_id: &str,
) -> RegistryResult<&'a mut Property> {
    properties
        .iter_mut()
        .find(|p| p.property_id == property_id)
        .ok_or_else(|| RegistryError::not_found("property", property_id))
}

fn check_verifiable(data: &RegistryData, property_id: &str, verifier_id: &str) -> RegistryResult<()> {
    require_admin(data, verifier_id)?;
    let property = find_property(&data.properties, property_id)?;
    if property.status != PropertyStatus::Pending {
        return Err(RegistryError::InvalidTransition {
            kind: "property",
            id: property_id.to_string(),
            current: property.status.to_string(),
            action: "verify",
        });
    }
    Ok(())
}

fn check_listable(data: &RegistryData, property_id: &str, listed: bool) -> RegistryResult<()> {
    let property = find_property(&data.properties, property_id)?;
    if listed && property.status != PropertyStatus::Verified {
        return Err(RegistryError::InvalidTransition {
            kind: "property",
            id: property_id.to_string(),
            current: property.status.to_string(),
            action: "list",
        });
    }
    Ok(())
}

fn check_transferable(data: &RegistryData, property_id: &str, new_owner: &str) -> RegistryResult<()> {
    require_text("newOwner", new_owner)?;
    let property = find_property(&data.properties, property_id)?;
    if property.owner == new_owner {
        return Err(RegistryError::Validation(format!(
            "property {} already belongs to {}",
            property_id, new_owner
        )));
    }
    Ok(())
}

/// Hands the property to its new owner and records the transfer.
pub(super) fn transfer(
    data: &mut RegistryData,
    property_id: &str,
    new_owner: &str,
    new_owner_name: &str,
    amount: Option<f64>,
    offer_id: &str,
    transaction_id: Option<String>,
) -> RegistryResult<(Property, Transaction)> {
    let property = find_property_mut(&mut data.properties, property_id)?;
    let previous_owner = std::mem::replace(&mut property.owner, new_owner.to_string());
    property.owner_name = new_owner_name.to_string();
    property.status = PropertyStatus::Transferred;
    property.listed_for_sale = false;
    property.last_updated = Utc::now();
    let property = property.clone();

    let transaction = append_audit(
        data,
        Audit {
            kind: TransactionType::PropertyTransferred,
            status: TransactionStatus::Completed,
            property_id,
            from_owner: &previous_owner,
            to_owner: new_owner,
            amount: amount.unwrap_or(property.price),
            offer_id,
            transaction_id,
        },
    );
    log::info!(
        "Property {} transferred from {} to {}",
        property_id,
        previous_owner,
        new_owner
    );
    Ok((property, transaction))
}

impl Registry {
    pub async fn ensure_property_absent(&self, property_id: &str) -> RegistryResult<()> {
        self.read(|data| {
            if data.properties.iter().any(|p| p.property_id == property_id) {
                return Err(RegistryError::already_exists("property", property_id));
            }
            Ok(())
        })
        .await
    }

    pub async fn register_property(&self, property: Property) -> RegistryResult<Property> {
        self.mutate(|data| {
            if data.properties.iter().any(|p| p.property_id == property.property_id) {
                return Err(RegistryError::already_exists("property", &property.property_id));
            }
            data.properties.push(property.clone());
            append_audit(
                data,
                Audit {
                    kind: TransactionType::PropertyRegistered,
                    status: TransactionStatus::Completed,
                    property_id: &property.property_id,
                    from_owner: "",
                    to_owner: &property.owner,
                    amount: property.price,
                    offer_id: "",
                    transaction_id: None,
                },
            );
            log::info!("Registered property {} at {}", property.property_id, property.location);
            Ok(property)
        })
        .await
    }

    pub async fn get_property(&self, property_id: &str) -> RegistryResult<Property> {
        self.read(|data| find_property(&data.properties, property_id).cloned())
            .await
    }

    pub async fn list_properties(&self, filter: &PropertyFilter) -> Vec<Property> {
        self.read(|data| {
            data.properties
                .iter()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect()
        })
        .await
    }

    /// Verified properties the owner has put up for sale.
    pub async fn marketplace(&self) -> Vec<Property> {
        self.read(|data| {
            data.properties
                .iter()
                .filter(|p| p.status == PropertyStatus::Verified && p.listed_for_sale)
                .cloned()
                .collect()
        })
        .await
    }

    pub async fn record_view(&self, property_id: &str) -> RegistryResult<Property> {
        self.mutate(|data| {
            let property = find_property_mut(&mut data.properties, property_id)?;
            property.views += 1;
            Ok(property.clone())
        })
        .await
    }

    pub async fn check_property_verification(
        &self,
        property_id: &str,
        verifier_id: &str,
    ) -> RegistryResult<()> {
        self.read(|data| check_verifiable(data, property_id, verifier_id))
            .await
    }

    pub async fn verify_property(
        &self,
        property_id: &str,
        verifier_id: &str,
    ) -> RegistryResult<Property> {
        self.mutate(|data| {
            check_verifiable(data, property_id, verifier_id)?;
            let now = Utc::now();
            let property = find_property_mut(&mut data.properties, property_id)?;
            property.status = PropertyStatus::Verified;
            property.verified_by = verifier_id.to_string();
            property.verified_at = Some(now);
            property.last_updated = now;
            log::info!("Property {} verified by {}", property_id, verifier_id);
            Ok(property.clone())
        })
        .await
    }

    pub async fn update_price(&self, property_id: &str, price: f64) -> RegistryResult<Property> {
        require_positive("price", price)?;
        self.mutate(|data| {
            let property = find_property_mut(&mut data.properties, property_id)?;
            property.price = price;
            property.last_updated = Utc::now();
            Ok(property.clone())
        })
        .await
    }

    /// Administrative override; no lifecycle rule applies.
    pub async fn update_property_status(
        &self,
        property_id: &str,
        status: PropertyStatus,
    ) -> RegistryResult<Property> {
        self.mutate(|data| {
            let property = find_property_mut(&mut data.properties, property_id)?;
            property.status = status;
            if status != PropertyStatus::Verified {
                property.listed_for_sale = false;
            }
            property.last_updated = Utc::now();
            Ok(property.clone())
        })
        .await
    }

    pub async fn check_listing(&self, property_id: &str, listed: bool) -> RegistryResult<()> {
        self.read(|data| check_listable(data, property_id, listed))
            .await
    }

    pub async fn set_listing(&self, property_id: &str, listed: bool) -> RegistryResult<Property> {
        self.mutate(|data| {
            check_listable(data, property_id, listed)?;
            let property = find_property_mut(&mut data.properties, property_id)?;
            property.listed_for_sale = listed;
            property.last_updated = Utc::now();
            Ok(property.clone())
        })
        .await
    }

    pub async fn check_transfer(&self, property_id: &str, new_owner: &str) -> RegistryResult<()> {
        self.read(|data| check_transferable(data, property_id, new_owner))
            .await
    }

    pub async fn transfer_property(
        &self,
        property_id: &str,
        new_owner: &str,
        new_owner_name: &str,
        transaction_id: String,
    ) -> RegistryResult<(Property, Transaction)> {
        self.mutate(|data| {
            check_transferable(data, property_id, new_owner)?;
            transfer(
                data,
                property_id,
                new_owner,
                new_owner_name,
                None,
                "",
                Some(transaction_id),
            )
        })
        .await
    }

    pub async fn property_history(&self, property_id: &str) -> RegistryResult<Vec<Transaction>> {
        self.read(|data| {
            find_property(&data.properties, property_id)?;
            Ok(data
                .transactions
                .iter()
                .filter(|t| t.property_id == property_id)
                .cloned()
                .collect())
        })
        .await
    }
}
