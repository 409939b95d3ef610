//! services/app/src/app/payment.rs
//!
//! The on-device payment profile used to gate booking. One profile per
//! device, overwritten on each save, cleared only on request. Nothing here
//! ever talks to a payment network.

use chrono::{DateTime, Utc};
use scholarlink_core::domain::PaymentDetails;
use scholarlink_core::ports::{PaymentVault, PortError, PortResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("cardholder name is required")]
    MissingCardholder,
    #[error("card number must be 13 to 19 digits")]
    InvalidCardNumber,
    #[error("expiration is required")]
    MissingExpiry,
    #[error("security code must be 3 or 4 digits")]
    InvalidCvv,
    #[error("billing address is incomplete")]
    IncompleteBillingAddress,
    #[error(transparent)]
    Port(#[from] PortError),
}

pub struct PaymentStore {
    vault: Arc<dyn PaymentVault>,
    state: RwLock<Option<(PaymentDetails, DateTime<Utc>)>>,
}

impl PaymentStore {
    pub fn new(vault: Arc<dyn PaymentVault>) -> Self {
        Self {
            vault,
            state: RwLock::new(None),
        }
    }

    /// Loads whatever the vault has; called once at startup.
    pub async fn load(&self) -> PortResult<()> {
        *self.state.write().await = self.vault.load().await?;
        Ok(())
    }

    pub async fn details(&self) -> Option<PaymentDetails> {
        self.state.read().await.as_ref().map(|(d, _)| d.clone())
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.as_ref().map(|(_, at)| *at)
    }

    pub async fn has_details(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn save(&self, details: PaymentDetails) -> Result<(), PaymentError> {
        validate(&details)?;
        let saved_at = self.vault.save(&details).await?;
        info!("Saved payment profile ending in {}", last_four(&details));
        *self.state.write().await = Some((details, saved_at));
        Ok(())
    }

    pub async fn clear(&self) -> PortResult<()> {
        self.vault.clear().await?;
        *self.state.write().await = None;
        info!("Cleared payment profile");
        Ok(())
    }
}

fn validate(details: &PaymentDetails) -> Result<(), PaymentError> {
    if details.cardholder_name.trim().is_empty() {
        return Err(PaymentError::MissingCardholder);
    }
    let digits = details
        .card_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .count();
    if !(13..=19).contains(&digits) {
        return Err(PaymentError::InvalidCardNumber);
    }
    if details.expiry_month.is_empty() || details.expiry_year.is_empty() {
        return Err(PaymentError::MissingExpiry);
    }
    let cvv_digits = details.cvv.chars().filter(|c| c.is_ascii_digit()).count();
    if !(3..=4).contains(&cvv_digits) || details.cvv.len() != cvv_digits {
        return Err(PaymentError::InvalidCvv);
    }
    if !details.billing_address.is_complete() {
        return Err(PaymentError::IncompleteBillingAddress);
    }
    Ok(())
}

fn last_four(details: &PaymentDetails) -> String {
    let digits: String = details
        .card_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits[digits.len().saturating_sub(4)..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarlink_core::domain::BillingAddress;

    use crate::adapters::vault::FilePaymentVault;

    fn complete_details() -> PaymentDetails {
        PaymentDetails {
            cardholder_name: "Ana Cruz".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            expiry_month: "07".to_string(),
            expiry_year: "2027".to_string(),
            cvv: "123".to_string(),
            phone_number: "+63 900 000 0000".to_string(),
            email: "ana@example.com".to_string(),
            billing_address: BillingAddress {
                street: "1 Mango St".to_string(),
                city: "Cebu".to_string(),
                province: "Cebu".to_string(),
                postal_code: "6000".to_string(),
                country: "Philippines".to_string(),
            },
            save_for_future_sessions: true,
            enable_auto_approval: false,
        }
    }

    #[tokio::test]
    async fn save_load_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FilePaymentVault::new(dir.path().join("payment.json")));
        let store = PaymentStore::new(vault.clone());

        store.load().await.unwrap();
        assert!(!store.has_details().await);

        store.save(complete_details()).await.unwrap();
        assert!(store.has_details().await);
        assert!(store.last_updated().await.is_some());

        // A fresh store over the same vault sees the persisted profile.
        let reopened = PaymentStore::new(vault);
        reopened.load().await.unwrap();
        let details = reopened.details().await.unwrap();
        assert_eq!(details.cardholder_name, "Ana Cruz");
        assert_eq!(details.masked_card_number(), "•••• •••• •••• 1111");

        reopened.clear().await.unwrap();
        assert!(!reopened.has_details().await);
        let reloaded = PaymentStore::new(Arc::new(FilePaymentVault::new(
            dir.path().join("payment.json"),
        )));
        reloaded.load().await.unwrap();
        assert!(!reloaded.has_details().await);
    }

    #[tokio::test]
    async fn save_overwrites_the_previous_profile() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FilePaymentVault::new(dir.path().join("payment.json")));
        let store = PaymentStore::new(vault);

        store.save(complete_details()).await.unwrap();
        let mut updated = complete_details();
        updated.card_number = "5500 0000 0000 0004".to_string();
        store.save(updated).await.unwrap();

        let details = store.details().await.unwrap();
        assert_eq!(details.masked_card_number(), "•••• •••• •••• 0004");
    }

    #[tokio::test]
    async fn validation_rejects_incomplete_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FilePaymentVault::new(dir.path().join("payment.json")));
        let store = PaymentStore::new(vault);

        let mut missing_name = complete_details();
        missing_name.cardholder_name = "  ".to_string();
        assert!(matches!(
            store.save(missing_name).await,
            Err(PaymentError::MissingCardholder)
        ));

        let mut short_card = complete_details();
        short_card.card_number = "4111".to_string();
        assert!(matches!(
            store.save(short_card).await,
            Err(PaymentError::InvalidCardNumber)
        ));

        let mut bad_cvv = complete_details();
        bad_cvv.cvv = "12".to_string();
        assert!(matches!(
            store.save(bad_cvv).await,
            Err(PaymentError::InvalidCvv)
        ));

        let mut bad_address = complete_details();
        bad_address.billing_address.postal_code = String::new();
        assert!(matches!(
            store.save(bad_address).await,
            Err(PaymentError::IncompleteBillingAddress)
        ));

        // Nothing was persisted by the failed attempts.
        assert!(!store.has_details().await);
    }
}
