//! services/app/src/adapters/vault.rs
//!
//! File-backed payment vault: one JSON document holding the device's single
//! payment profile and its save timestamp.
//!
//! The profile is stored as written. A production deployment must encrypt
//! this file at rest or stop persisting card numbers entirely; the port
//! boundary is where such an implementation would slot in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholarlink_core::domain::{BillingAddress, PaymentDetails};
use scholarlink_core::ports::{PaymentVault, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub struct FilePaymentVault {
    path: PathBuf,
}

//=========================================================================================
// On-disk record structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct StoredVault {
    saved_at: DateTime<Utc>,
    details: PaymentRecord,
}

#[derive(Serialize, Deserialize)]
struct PaymentRecord {
    cardholder_name: String,
    card_number: String,
    expiry_month: String,
    expiry_year: String,
    cvv: String,
    phone_number: String,
    email: String,
    street: String,
    city: String,
    province: String,
    postal_code: String,
    country: String,
    save_for_future_sessions: bool,
    enable_auto_approval: bool,
}

impl PaymentRecord {
    fn from_domain(details: &PaymentDetails) -> Self {
        Self {
            cardholder_name: details.cardholder_name.clone(),
            card_number: details.card_number.clone(),
            expiry_month: details.expiry_month.clone(),
            expiry_year: details.expiry_year.clone(),
            cvv: details.cvv.clone(),
            phone_number: details.phone_number.clone(),
            email: details.email.clone(),
            street: details.billing_address.street.clone(),
            city: details.billing_address.city.clone(),
            province: details.billing_address.province.clone(),
            postal_code: details.billing_address.postal_code.clone(),
            country: details.billing_address.country.clone(),
            save_for_future_sessions: details.save_for_future_sessions,
            enable_auto_approval: details.enable_auto_approval,
        }
    }

    fn to_domain(self) -> PaymentDetails {
        PaymentDetails {
            cardholder_name: self.cardholder_name,
            card_number: self.card_number,
            expiry_month: self.expiry_month,
            expiry_year: self.expiry_year,
            cvv: self.cvv,
            phone_number: self.phone_number,
            email: self.email,
            billing_address: BillingAddress {
                street: self.street,
                city: self.city,
                province: self.province,
                postal_code: self.postal_code,
                country: self.country,
            },
            save_for_future_sessions: self.save_for_future_sessions,
            enable_auto_approval: self.enable_auto_approval,
        }
    }
}

impl FilePaymentVault {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PaymentVault for FilePaymentVault {
    async fn load(&self) -> PortResult<Option<(PaymentDetails, DateTime<Utc>)>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        let stored: StoredVault =
            serde_json::from_str(&raw).map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Some((stored.details.to_domain(), stored.saved_at)))
    }

    async fn save(&self, details: &PaymentDetails) -> PortResult<DateTime<Utc>> {
        let saved_at = Utc::now();
        let stored = StoredVault {
            saved_at,
            details: PaymentRecord::from_domain(details),
        };
        let raw = serde_json::to_string_pretty(&stored)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(saved_at)
    }

    async fn clear(&self) -> PortResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}
