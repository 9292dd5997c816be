use chrono::Utc;

use super::{generate_id, require_admin, require_text, Registry, RegistryResult};
use crate::auth;
use crate::error::RegistryError;
use crate::models::{Document, NewUser, Role, User};

pub const DEMO_ADMIN_ID: &str = "ADMIN_001";

// (user id, name, email, password, role)
const DEMO_USERS: [(&str, &str, &str, &str, Role); 3] = [
    (DEMO_ADMIN_ID, "Registry Admin", "admin@landregistry.gov", "admin123", Role::Admin),
    ("SELLER_001", "Ramesh Kumar", "ramesh@example.com", "seller123", Role::Seller),
    ("BUYER_001", "Priya Sharma", "priya@example.com", "buyer123", Role::Buyer),
];

/// Validates a KYC submission and turns it into a fresh, unverified user.
pub fn new_user_record(new: NewUser) -> RegistryResult<User> {
    require_text("name", &new.name)?;
    require_text("email", &new.email)?;
    if !new.email.contains('@') {
        return Err(RegistryError::Validation(format!(
            "'{}' is not an email address",
            new.email
        )));
    }
    let password_hash = match (new.password, new.password_hash) {
        (Some(password), _) if !password.is_empty() => auth::encode_password(&password),
        (_, Some(hash)) if !hash.is_empty() => hash,
        _ => {
            return Err(RegistryError::Validation(
                "password or passwordHash is required".to_string(),
            ))
        }
    };

    Ok(User {
        user_id: new
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_id("USER")),
        name: new.name,
        email: new.email.trim().to_lowercase(),
        phone: new.phone,
        aadhar: new.aadhar,
        pan: new.pan,
        address: new.address,
        role: new.role,
        wallet_address: new.wallet_address,
        password_hash,
        is_verified: false,
        documents: Vec::new(),
        registered_at: Utc::now(),
        last_login: None,
    })
}

fn find_user<'a>(users: &'a mut [User], user_id: &str) -> RegistryResult<&'a mut User> {
    users
        .iter_mut()
        .find(|u| u.user_id == user_id)
        .ok_or_else(|| RegistryError::not_found("user", user_id))
}

fn check_unique(users: &[User], user: &User) -> RegistryResult<()> {
    if users.iter().any(|u| u.user_id == user.user_id) {
        return Err(RegistryError::already_exists("user", &user.user_id));
    }
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
        return Err(RegistryError::already_exists("email", &user.email));
    }
    Ok(())
}

impl Registry {
    pub async fn ensure_user_absent(&self, user: &User) -> RegistryResult<()> {
        self.read(|data| check_unique(&data.users, user)).await
    }

    pub async fn register_user(&self, user: User) -> RegistryResult<User> {
        self.mutate(|data| {
            check_unique(&data.users, &user)?;
            log::info!("Registered user {} ({})", user.user_id, user.role);
            data.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    /// Checks credentials and stamps `lastLogin`.
    pub async fn authenticate(&self, email: &str, password: &str) -> RegistryResult<User> {
        let email = email.trim().to_lowercase();
        self.mutate(|data| {
            let user = data
                .users
                .iter_mut()
                .find(|u| u.email.eq_ignore_ascii_case(&email))
                .ok_or(RegistryError::InvalidCredentials)?;
            if !auth::verify_password(password, &user.password_hash) {
                return Err(RegistryError::InvalidCredentials);
            }
            user.last_login = Some(Utc::now());
            Ok(user.clone())
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> RegistryResult<User> {
        self.read(|data| {
            data.users
                .iter()
                .find(|u| u.user_id == user_id)
                .cloned()
                .ok_or_else(|| RegistryError::not_found("user", user_id))
        })
        .await
    }

    pub async fn list_users(&self, role: Option<Role>) -> Vec<User> {
        self.read(|data| {
            data.users
                .iter()
                .filter(|u| role.map_or(true, |r| u.role == r))
                .cloned()
                .collect()
        })
        .await
    }

    pub async fn set_user_verification(
        &self,
        user_id: &str,
        is_verified: bool,
    ) -> RegistryResult<User> {
        self.mutate(|data| {
            let user = find_user(&mut data.users, user_id)?;
            user.is_verified = is_verified;
            Ok(user.clone())
        })
        .await
    }

    pub async fn add_document(
        &self,
        user_id: &str,
        document_id: &str,
        document_type: &str,
        document_hash: &str,
    ) -> RegistryResult<User> {
        require_text("documentId", document_id)?;
        require_text("documentType", document_type)?;
        require_text("documentHash", document_hash)?;
        self.mutate(|data| {
            let user = find_user(&mut data.users, user_id)?;
            if user.documents.iter().any(|d| d.document_id == document_id) {
                return Err(RegistryError::already_exists("document", document_id));
            }
            user.documents.push(Document {
                document_id: document_id.to_string(),
                document_type: document_type.to_uppercase(),
                document_hash: document_hash.to_string(),
                uploaded_at: Utc::now(),
                verified_by: String::new(),
                is_verified: false,
            });
            Ok(user.clone())
        })
        .await
    }

    pub async fn check_document_verification(
        &self,
        user_id: &str,
        document_id: &str,
        admin_id: &str,
    ) -> RegistryResult<()> {
        self.read(|data| {
            require_admin(data, admin_id)?;
            let user = data
                .users
                .iter()
                .find(|u| u.user_id == user_id)
                .ok_or_else(|| RegistryError::not_found("user", user_id))?;
            if !user.documents.iter().any(|d| d.document_id == document_id) {
                return Err(RegistryError::not_found("document", document_id));
            }
            Ok(())
        })
        .await
    }

    /// Marks one document verified; the user becomes verified once every
    /// document on file is.
    pub async fn verify_document(
        &self,
        user_id: &str,
        document_id: &str,
        admin_id: &str,
    ) -> RegistryResult<User> {
        self.mutate(|data| {
            require_admin(data, admin_id)?;
            let user = find_user(&mut data.users, user_id)?;
            let document = user
                .documents
                .iter_mut()
                .find(|d| d.document_id == document_id)
                .ok_or_else(|| RegistryError::not_found("document", document_id))?;
            document.is_verified = true;
            document.verified_by = admin_id.to_string();
            if user.documents.iter().all(|d| d.is_verified) {
                user.is_verified = true;
            }
            Ok(user.clone())
        })
        .await
    }

    /// Registers the demo admin, seller and buyer when nobody exists yet.
    pub async fn seed_demo_users(&self) -> usize {
        let result = self
            .mutate(|data| {
                if !data.users.is_empty() {
                    return Ok(0);
                }
                let now = Utc::now();
                for (user_id, name, email, password, role) in DEMO_USERS {
                    data.users.push(User {
                        user_id: user_id.to_string(),
                        name: name.to_string(),
                        email: email.to_string(),
                        phone: String::new(),
                        aadhar: String::new(),
                        pan: String::new(),
                        address: String::new(),
                        role,
                        wallet_address: String::new(),
                        password_hash: auth::encode_password(password),
                        is_verified: true,
                        documents: Vec::new(),
                        registered_at: now,
                        last_login: None,
                    });
                }
                Ok(DEMO_USERS.len())
            })
            .await;
        result.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kyc(email: &str) -> NewUser {
        NewUser {
            user_id: None,
            name: "Anita Rao".to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
            aadhar: "123456789012".to_string(),
            pan: "ABCDE1234F".to_string(),
            address: "Tirupati".to_string(),
            role: Role::Buyer,
            wallet_address: "0xabc".to_string(),
            password: Some("secret".to_string()),
            password_hash: None,
        }
    }

    #[tokio::test]
    async fn registration_then_login() {
        let registry = Registry::new();
        let user = new_user_record(kyc("Anita@Example.com")).unwrap();
        assert!(user.user_id.starts_with("USER_"));
        assert_eq!(user.email, "anita@example.com");
        registry.register_user(user.clone()).await.unwrap();

        let logged_in = registry.authenticate("anita@example.com", "secret").await.unwrap();
        assert_eq!(logged_in.user_id, user.user_id);
        assert!(logged_in.last_login.is_some());

        let err = registry.authenticate("anita@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let registry = Registry::new();
        registry
            .register_user(new_user_record(kyc("a@example.com")).unwrap())
            .await
            .unwrap();
        let err = registry
            .register_user(new_user_record(kyc("A@example.com")).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { kind: "email", .. }));
        assert_eq!(registry.list_users(None).await.len(), 1);
    }

    #[test]
    fn registration_requires_a_credential() {
        let mut new = kyc("a@example.com");
        new.password = None;
        assert!(matches!(
            new_user_record(new),
            Err(RegistryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn verifying_every_document_verifies_the_user() {
        let registry = Registry::new();
        registry.seed_demo_users().await;
        let user = registry
            .register_user(new_user_record(kyc("b@example.com")).unwrap())
            .await
            .unwrap();
        let id = user.user_id.as_str();

        registry.add_document(id, "DOC_1", "aadhar", "QmHash1").await.unwrap();
        registry.add_document(id, "DOC_2", "PAN", "QmHash2").await.unwrap();

        let after_one = registry.verify_document(id, "DOC_1", DEMO_ADMIN_ID).await.unwrap();
        assert_eq!(after_one.documents[0].document_type, "AADHAR");
        assert!(!after_one.is_verified);

        let after_two = registry.verify_document(id, "DOC_2", DEMO_ADMIN_ID).await.unwrap();
        assert!(after_two.is_verified);
        assert_eq!(after_two.documents[1].verified_by, DEMO_ADMIN_ID);
    }

    #[tokio::test]
    async fn only_admins_verify_documents() {
        let registry = Registry::new();
        registry.seed_demo_users().await;
        registry.add_document("BUYER_001", "DOC_1", "PAN", "h").await.unwrap();
        let err = registry
            .verify_document("BUYER_001", "DOC_1", "SELLER_001")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn demo_users_are_seeded_once() {
        let registry = Registry::new();
        assert_eq!(registry.seed_demo_users().await, 3);
        assert_eq!(registry.seed_demo_users().await, 0);
        let admins = registry.list_users(Some(Role::Admin)).await;
        assert_eq!(admins.len(), 1);
        assert!(registry.authenticate("priya@example.com", "buyer123").await.is_ok());
    }
}
