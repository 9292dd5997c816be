use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Wire names are the SCREAMING_SNAKE_CASE strings the chaincode and the
// frontend already use; the same strings go into Postgres text columns.
macro_rules! wire_enum {
    ($name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

wire_enum!(Role, "role" {
    Buyer => "BUYER",
    Seller => "SELLER",
    Admin => "ADMIN",
    Verifier => "VERIFIER",
});

wire_enum!(PropertyStatus, "property status" {
    Pending => "PENDING",
    Verified => "VERIFIED",
    Transferred => "TRANSFERRED",
});

wire_enum!(OfferStatus, "offer status" {
    Pending => "PENDING",
    Accepted => "ACCEPTED",
    Rejected => "REJECTED",
    AdminVerified => "ADMIN_VERIFIED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

wire_enum!(TransactionStatus, "transaction status" {
    Pending => "PENDING",
    Verified => "VERIFIED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

wire_enum!(TransactionType, "transaction type" {
    PropertyRegistered => "PROPERTY_REGISTERED",
    PropertyTransferred => "PROPERTY_TRANSFERRED",
    OfferCreated => "OFFER_CREATED",
    OfferAccepted => "OFFER_ACCEPTED",
    OfferRejected => "OFFER_REJECTED",
    OfferVerified => "OFFER_VERIFIED",
    OfferCancelled => "OFFER_CANCELLED",
});

wire_enum!(EscrowStatus, "escrow status" {
    Created => "CREATED",
    Funded => "FUNDED",
    Released => "RELEASED",
    Cancelled => "CANCELLED",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Verifier)
    }
}

/// Seller- and admin-driven moves of an offer through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    Accept,
    Reject,
    AdminVerify,
    Complete,
    Cancel,
}

impl OfferAction {
    pub fn verb(&self) -> &'static str {
        match self {
            OfferAction::Accept => "accept",
            OfferAction::Reject => "reject",
            OfferAction::AdminVerify => "verify",
            OfferAction::Complete => "complete",
            OfferAction::Cancel => "cancel",
        }
    }

    pub fn allowed_from(&self, status: OfferStatus) -> bool {
        match self {
            OfferAction::Accept | OfferAction::Reject => status == OfferStatus::Pending,
            OfferAction::AdminVerify => status == OfferStatus::Accepted,
            OfferAction::Complete => status == OfferStatus::AdminVerified,
            OfferAction::Cancel => {
                !matches!(status, OfferStatus::Completed | OfferStatus::Cancelled)
            }
        }
    }

    pub fn target(&self) -> OfferStatus {
        match self {
            OfferAction::Accept => OfferStatus::Accepted,
            OfferAction::Reject => OfferStatus::Rejected,
            OfferAction::AdminVerify => OfferStatus::AdminVerified,
            OfferAction::Complete => OfferStatus::Completed,
            OfferAction::Cancel => OfferStatus::Cancelled,
        }
    }

    /// Audit row recorded for the move.
    pub fn audit(&self) -> (TransactionType, TransactionStatus) {
        match self {
            OfferAction::Accept => (TransactionType::OfferAccepted, TransactionStatus::Pending),
            OfferAction::Reject => (TransactionType::OfferRejected, TransactionStatus::Cancelled),
            OfferAction::AdminVerify => {
                (TransactionType::OfferVerified, TransactionStatus::Verified)
            }
            OfferAction::Complete => {
                (TransactionType::PropertyTransferred, TransactionStatus::Completed)
            }
            OfferAction::Cancel => (TransactionType::OfferCancelled, TransactionStatus::Cancelled),
        }
    }

    /// Chaincode function on `offer-contract`.
    pub fn chaincode_function(&self) -> &'static str {
        match self {
            OfferAction::Accept => "AcceptOffer",
            OfferAction::Reject => "RejectOffer",
            OfferAction::AdminVerify => "AdminVerifyOffer",
            OfferAction::Complete => "CompleteOffer",
            OfferAction::Cancel => "CancelOffer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowAction {
    Fund,
    Release,
    Cancel,
}

impl EscrowAction {
    pub fn verb(&self) -> &'static str {
        match self {
            EscrowAction::Fund => "fund",
            EscrowAction::Release => "release",
            EscrowAction::Cancel => "cancel",
        }
    }

    pub fn allowed_from(&self, status: EscrowStatus) -> bool {
        match self {
            EscrowAction::Fund => status == EscrowStatus::Created,
            EscrowAction::Release => status == EscrowStatus::Funded,
            EscrowAction::Cancel => {
                !matches!(status, EscrowStatus::Released | EscrowStatus::Cancelled)
            }
        }
    }

    pub fn target(&self) -> EscrowStatus {
        match self {
            EscrowAction::Fund => EscrowStatus::Funded,
            EscrowAction::Release => EscrowStatus::Released,
            EscrowAction::Cancel => EscrowStatus::Cancelled,
        }
    }

    pub fn chaincode_function(&self) -> &'static str {
        match self {
            EscrowAction::Fund => "FundEscrow",
            EscrowAction::Release => "ReleaseEscrow",
            EscrowAction::Cancel => "CancelEscrow",
        }
    }
}
