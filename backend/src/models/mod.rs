use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod status;
mod timestamp;

pub use status::{
    EscrowAction, EscrowStatus, OfferAction, OfferStatus, PropertyStatus, Role,
    TransactionStatus, TransactionType, UnknownVariant,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub aadhar: String,
    #[serde(default)]
    pub pan: String,
    #[serde(default)]
    pub address: String,
    pub role: Role,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub registered_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::optional")]
    pub last_login: Option<DateTime<Utc>>,
}

/// What the API hands back for a user: everything except the credential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub aadhar: String,
    pub pan: String,
    pub address: String,
    pub role: Role,
    pub wallet_address: String,
    pub is_verified: bool,
    pub documents: Vec<Document>,
    pub registered_at: DateTime<Utc>,
    #[serde(with = "timestamp::optional")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            aadhar: user.aadhar.clone(),
            pan: user.pan.clone(),
            address: user.address.clone(),
            role: user.role,
            wallet_address: user.wallet_address.clone(),
            is_verified: user.is_verified,
            documents: user.documents.clone(),
            registered_at: user.registered_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    pub document_type: String,
    pub document_hash: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_by: String,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_id: String,
    pub owner: String,
    #[serde(default)]
    pub owner_name: String,
    pub location: String,
    pub area: f64,
    pub price: f64,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    pub status: PropertyStatus,
    #[serde(default)]
    pub listed_for_sale: bool,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub verified_by: String,
    #[serde(default, with = "timestamp::optional")]
    pub verified_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub offer_id: String,
    pub property_id: String,
    pub buyer_id: String,
    #[serde(default)]
    pub buyer_name: String,
    pub seller_id: String,
    #[serde(default)]
    pub seller_name: String,
    pub offer_amount: f64,
    #[serde(default)]
    pub message: String,
    pub status: OfferStatus,
    #[serde(default)]
    pub admin_verified: bool,
    #[serde(default)]
    pub admin_id: String,
    #[serde(default, with = "timestamp::optional")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sepolia_tx_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    #[serde(default)]
    pub property_id: String,
    #[serde(default)]
    pub from_owner: String,
    #[serde(default)]
    pub to_owner: String,
    #[serde(default)]
    pub amount: f64,
    pub status: TransactionStatus,
    #[serde(default)]
    pub offer_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    pub escrow_id: String,
    pub property_id: String,
    pub buyer: String,
    pub seller: String,
    pub amount: f64,
    pub status: EscrowStatus,
    #[serde(default)]
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the registry holds, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryData {
    pub users: Vec<User>,
    pub properties: Vec<Property>,
    pub offers: Vec<Offer>,
    pub transactions: Vec<Transaction>,
    pub escrows: Vec<Escrow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub users: usize,
    pub properties: usize,
    pub offers: usize,
    pub transactions: usize,
    pub escrows: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub aadhar: String,
    #[serde(default)]
    pub pan: String,
    #[serde(default)]
    pub address: String,
    pub role: Role,
    #[serde(default)]
    pub wallet_address: String,
    /// Plain password; encoded server-side.
    pub password: Option<String>,
    /// Already-encoded credential, as the KYC form sends it.
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub property_id: Option<String>,
    pub owner: String,
    #[serde(default)]
    pub owner_name: String,
    pub location: String,
    pub area: f64,
    pub price: f64,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub offer_id: Option<String>,
    pub property_id: String,
    pub buyer_id: String,
    #[serde(default)]
    pub buyer_name: String,
    pub seller_id: String,
    #[serde(default)]
    pub seller_name: String,
    pub offer_amount: f64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEscrow {
    pub escrow_id: Option<String>,
    pub property_id: String,
    pub buyer: String,
    pub seller: String,
    pub amount: f64,
}

/// Partial overwrite accepted by `/api/sync`; absent collections are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncPayload {
    pub users: Option<Vec<User>>,
    pub properties: Option<Vec<Property>>,
    pub offers: Option<Vec<Offer>>,
    pub transactions: Option<Vec<Transaction>>,
    pub escrows: Option<Vec<Escrow>>,
}
