//! PostgreSQL snapshot store. The registry is small and read from memory, so
//! the database holds a copy: `load` reads every table, `save` rewrites every
//! table inside one transaction.

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use super::schema::{escrows, offers, properties, transactions, users};
use super::StorageError;
use crate::models::{Escrow, Offer, Property, RegistryData, Transaction, User};

/// Rows per INSERT; keeps every statement well under the bind-parameter cap.
const CHUNK: usize = 1000;

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct UserRow {
    position: i64,
    user_id: String,
    name: String,
    email: String,
    phone: String,
    aadhar: String,
    pan: String,
    address: String,
    role: String,
    wallet_address: String,
    password_hash: String,
    is_verified: bool,
    documents: String,
    registered_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    fn from_record(position: usize, user: &User) -> Result<Self, StorageError> {
        Ok(Self {
            position: position as i64,
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            aadhar: user.aadhar.clone(),
            pan: user.pan.clone(),
            address: user.address.clone(),
            role: user.role.to_string(),
            wallet_address: user.wallet_address.clone(),
            password_hash: user.password_hash.clone(),
            is_verified: user.is_verified,
            documents: serde_json::to_string(&user.documents)?,
            registered_at: user.registered_at,
            last_login: user.last_login,
        })
    }

    fn into_record(self) -> Result<User, StorageError> {
        Ok(User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            aadhar: self.aadhar,
            pan: self.pan,
            address: self.address,
            role: self.role.parse()?,
            wallet_address: self.wallet_address,
            password_hash: self.password_hash,
            is_verified: self.is_verified,
            documents: serde_json::from_str(&self.documents)?,
            registered_at: self.registered_at,
            last_login: self.last_login,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = properties)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct PropertyRow {
    position: i64,
    property_id: String,
    owner: String,
    owner_name: String,
    location: String,
    area: f64,
    price: f64,
    property_type: String,
    description: String,
    latitude: f64,
    longitude: f64,
    status: String,
    listed_for_sale: bool,
    documents: String,
    verified_by: String,
    verified_at: Option<DateTime<Utc>>,
    registered_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    views: i64,
}

impl PropertyRow {
    fn from_record(position: usize, property: &Property) -> Result<Self, StorageError> {
        Ok(Self {
            position: position as i64,
            property_id: property.property_id.clone(),
            owner: property.owner.clone(),
            owner_name: property.owner_name.clone(),
            location: property.location.clone(),
            area: property.area,
            price: property.price,
            property_type: property.property_type.clone(),
            description: property.description.clone(),
            latitude: property.latitude,
            longitude: property.longitude,
            status: property.status.to_string(),
            listed_for_sale: property.listed_for_sale,
            documents: serde_json::to_string(&property.documents)?,
            verified_by: property.verified_by.clone(),
            verified_at: property.verified_at,
            registered_at: property.registered_at,
            last_updated: property.last_updated,
            views: i64::try_from(property.views).unwrap_or(i64::MAX),
        })
    }

    fn into_record(self) -> Result<Property, StorageError> {
        Ok(Property {
            property_id: self.property_id,
            owner: self.owner,
            owner_name: self.owner_name,
            location: self.location,
            area: self.area,
            price: self.price,
            property_type: self.property_type,
            description: self.description,
            latitude: self.latitude,
            longitude: self.longitude,
            status: self.status.parse()?,
            listed_for_sale: self.listed_for_sale,
            documents: serde_json::from_str(&self.documents)?,
            verified_by: self.verified_by,
            verified_at: self.verified_at,
            registered_at: self.registered_at,
            last_updated: self.last_updated,
            views: u64::try_from(self.views).unwrap_or(0),
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = offers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct OfferRow {
    position: i64,
    offer_id: String,
    property_id: String,
    buyer_id: String,
    buyer_name: String,
    seller_id: String,
    seller_name: String,
    offer_amount: f64,
    message: String,
    status: String,
    admin_verified: bool,
    admin_id: String,
    verified_at: Option<DateTime<Utc>>,
    sepolia_tx_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferRow {
    fn from_record(position: usize, offer: &Offer) -> Self {
        Self {
            position: position as i64,
            offer_id: offer.offer_id.clone(),
            property_id: offer.property_id.clone(),
            buyer_id: offer.buyer_id.clone(),
            buyer_name: offer.buyer_name.clone(),
            seller_id: offer.seller_id.clone(),
            seller_name: offer.seller_name.clone(),
            offer_amount: offer.offer_amount,
            message: offer.message.clone(),
            status: offer.status.to_string(),
            admin_verified: offer.admin_verified,
            admin_id: offer.admin_id.clone(),
            verified_at: offer.verified_at,
            sepolia_tx_hash: offer.sepolia_tx_hash.clone(),
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }

    fn into_record(self) -> Result<Offer, StorageError> {
        Ok(Offer {
            offer_id: self.offer_id,
            property_id: self.property_id,
            buyer_id: self.buyer_id,
            buyer_name: self.buyer_name,
            seller_id: self.seller_id,
            seller_name: self.seller_name,
            offer_amount: self.offer_amount,
            message: self.message,
            status: self.status.parse()?,
            admin_verified: self.admin_verified,
            admin_id: self.admin_id,
            verified_at: self.verified_at,
            sepolia_tx_hash: self.sepolia_tx_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TransactionRow {
    position: i64,
    transaction_id: String,
    property_id: String,
    from_owner: String,
    to_owner: String,
    amount: f64,
    status: String,
    offer_id: String,
    timestamp: DateTime<Utc>,
    kind: String,
}

impl TransactionRow {
    fn from_record(position: usize, transaction: &Transaction) -> Self {
        Self {
            position: position as i64,
            transaction_id: transaction.transaction_id.clone(),
            property_id: transaction.property_id.clone(),
            from_owner: transaction.from_owner.clone(),
            to_owner: transaction.to_owner.clone(),
            amount: transaction.amount,
            status: transaction.status.to_string(),
            offer_id: transaction.offer_id.clone(),
            timestamp: transaction.timestamp,
            kind: transaction.kind.to_string(),
        }
    }

    fn into_record(self) -> Result<Transaction, StorageError> {
        Ok(Transaction {
            transaction_id: self.transaction_id,
            property_id: self.property_id,
            from_owner: self.from_owner,
            to_owner: self.to_owner,
            amount: self.amount,
            status: self.status.parse()?,
            offer_id: self.offer_id,
            timestamp: self.timestamp,
            kind: self.kind.parse()?,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = escrows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct EscrowRow {
    position: i64,
    escrow_id: String,
    property_id: String,
    buyer: String,
    seller: String,
    amount: f64,
    status: String,
    transaction_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EscrowRow {
    fn from_record(position: usize, escrow: &Escrow) -> Self {
        Self {
            position: position as i64,
            escrow_id: escrow.escrow_id.clone(),
            property_id: escrow.property_id.clone(),
            buyer: escrow.buyer.clone(),
            seller: escrow.seller.clone(),
            amount: escrow.amount,
            status: escrow.status.to_string(),
            transaction_hash: escrow.transaction_hash.clone(),
            created_at: escrow.created_at,
            updated_at: escrow.updated_at,
        }
    }

    fn into_record(self) -> Result<Escrow, StorageError> {
        Ok(Escrow {
            escrow_id: self.escrow_id,
            property_id: self.property_id,
            buyer: self.buyer,
            seller: self.seller,
            amount: self.amount,
            status: self.status.parse()?,
            transaction_hash: self.transaction_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgSnapshot {
    database_url: String,
}

impl PgSnapshot {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    fn connect(&self) -> Result<PgConnection, StorageError> {
        PgConnection::establish(&self.database_url).map_err(|e| {
            log::error!("Failed to establish database connection: {}", e);
            StorageError::Connection(e)
        })
    }

    pub fn load(&self) -> Result<RegistryData, StorageError> {
        let mut conn = self.connect()?;

        let users = users::table
            .order(users::position.asc())
            .select(UserRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(UserRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let properties = properties::table
            .order(properties::position.asc())
            .select(PropertyRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(PropertyRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let offers = offers::table
            .order(offers::position.asc())
            .select(OfferRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(OfferRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let transactions = transactions::table
            .order(transactions::position.asc())
            .select(TransactionRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(TransactionRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let escrows = escrows::table
            .order(escrows::position.asc())
            .select(EscrowRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(EscrowRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RegistryData {
            users,
            properties,
            offers,
            transactions,
            escrows,
        })
    }

    pub fn save(&self, data: &RegistryData) -> Result<(), StorageError> {
        let user_rows = data
            .users
            .iter()
            .enumerate()
            .map(|(i, user)| UserRow::from_record(i, user))
            .collect::<Result<Vec<_>, _>>()?;
        let property_rows = data
            .properties
            .iter()
            .enumerate()
            .map(|(i, property)| PropertyRow::from_record(i, property))
            .collect::<Result<Vec<_>, _>>()?;
        let offer_rows: Vec<OfferRow> = data
            .offers
            .iter()
            .enumerate()
            .map(|(i, offer)| OfferRow::from_record(i, offer))
            .collect();
        let transaction_rows: Vec<TransactionRow> = data
            .transactions
            .iter()
            .enumerate()
            .map(|(i, transaction)| TransactionRow::from_record(i, transaction))
            .collect();
        let escrow_rows: Vec<EscrowRow> = data
            .escrows
            .iter()
            .enumerate()
            .map(|(i, escrow)| EscrowRow::from_record(i, escrow))
            .collect();

        let mut conn = self.connect()?;
        conn.transaction::<_, StorageError, _>(|conn| {
            diesel::delete(users::table).execute(conn)?;
            diesel::delete(properties::table).execute(conn)?;
            diesel::delete(offers::table).execute(conn)?;
            diesel::delete(transactions::table).execute(conn)?;
            diesel::delete(escrows::table).execute(conn)?;

            for chunk in user_rows.chunks(CHUNK) {
                diesel::insert_into(users::table).values(chunk).execute(conn)?;
            }
            for chunk in property_rows.chunks(CHUNK) {
                diesel::insert_into(properties::table).values(chunk).execute(conn)?;
            }
            for chunk in offer_rows.chunks(CHUNK) {
                diesel::insert_into(offers::table).values(chunk).execute(conn)?;
            }
            for chunk in transaction_rows.chunks(CHUNK) {
                diesel::insert_into(transactions::table).values(chunk).execute(conn)?;
            }
            for chunk in escrow_rows.chunks(CHUNK) {
                diesel::insert_into(escrows::table).values(chunk).execute(conn)?;
            }
            Ok(())
        })?;

        log::debug!(
            "Saved snapshot to postgres: {} users, {} properties, {} offers, {} transactions, {} escrows",
            data.users.len(),
            data.properties.len(),
            data.offers.len(),
            data.transactions.len(),
            data.escrows.len()
        );
        Ok(())
    }
}
