//! services/app/src/app/account.rs
//!
//! Tracks the signed-in identity and role, and carries the profile flows
//! that hang off it: profile edits, tutor credential submission, and the
//! admin review action.

use chrono::Utc;
use scholarlink_core::domain::{UserProfile, UserRole, VerificationStatus};
use scholarlink_core::ports::{AuthGateway, PortError, PortResult, ProfileStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub struct Account {
    auth: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfileStore>,
    current: RwLock<Option<UserProfile>>,
}

impl Account {
    pub fn new(auth: Arc<dyn AuthGateway>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            auth,
            profiles,
            current: RwLock::new(None),
        }
    }

    /// Registers with the auth service, then creates the matching profile
    /// row and signs the new user in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        role: UserRole,
    ) -> PortResult<UserProfile> {
        let user_id = self.auth.sign_up(email, password).await?;
        let now = Utc::now();
        let profile = UserProfile {
            id: user_id,
            email: email.to_string(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            subjects: Vec::new(),
            hourly_rate: None,
            years_experience: None,
            is_profile_complete: false,
            verification_status: VerificationStatus::NotSubmitted,
            verification_id_type: None,
            verification_id_number: None,
            verification_document_url: None,
            verification_reference_contact: None,
            created_at: now,
            updated_at: now,
        };
        self.profiles.insert(&profile).await?;
        info!("Registered {} as {}", email, role.as_str());

        *self.current.write().await = Some(profile.clone());
        Ok(profile)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> PortResult<UserProfile> {
        let user_id = self.auth.sign_in(email, password).await?;
        let profile = self.profiles.fetch(user_id).await?;
        info!("Signed in as {} ({})", profile.email, profile.role.as_str());
        *self.current.write().await = Some(profile.clone());
        Ok(profile)
    }

    pub async fn sign_out(&self) -> PortResult<()> {
        if let Err(err) = self.auth.sign_out().await {
            // The local session ends either way.
            warn!("Remote sign-out failed: {}", err);
        }
        *self.current.write().await = None;
        Ok(())
    }

    pub async fn current(&self) -> Option<UserProfile> {
        self.current.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn is_tutor(&self) -> bool {
        self.role().await == Some(UserRole::Tutor)
    }

    pub async fn is_learner(&self) -> bool {
        self.role().await == Some(UserRole::Learner)
    }

    pub async fn is_admin(&self) -> bool {
        self.role().await == Some(UserRole::Admin)
    }

    async fn role(&self) -> Option<UserRole> {
        self.current.read().await.as_ref().map(|p| p.role)
    }

    pub async fn list_tutors(&self) -> PortResult<Vec<UserProfile>> {
        self.profiles.list_tutors().await
    }

    /// Writes the edited profile remotely and, when it is the signed-in
    /// user's own, refreshes the local copy.
    pub async fn update_profile(&self, mut profile: UserProfile) -> PortResult<UserProfile> {
        profile.updated_at = Utc::now();
        self.profiles.update_profile(&profile).await?;
        let mut current = self.current.write().await;
        if current.as_ref().map(|p| p.id) == Some(profile.id) {
            *current = Some(profile.clone());
        }
        Ok(profile)
    }

    /// A tutor submits credentials for review.
    pub async fn submit_verification(
        &self,
        id_type: &str,
        id_number: &str,
        document_url: Option<String>,
        reference_contact: Option<String>,
    ) -> PortResult<UserProfile> {
        let mut profile = self
            .current()
            .await
            .ok_or(PortError::Unauthorized)?;
        if profile.role != UserRole::Tutor {
            return Err(PortError::Unauthorized);
        }

        profile.verification_status = VerificationStatus::PendingReview;
        profile.verification_id_type = Some(id_type.to_string());
        profile.verification_id_number = Some(id_number.to_string());
        profile.verification_document_url = document_url;
        profile.verification_reference_contact = reference_contact;
        info!("Submitted verification documents for {}", profile.email);

        self.update_profile(profile).await
    }

    /// Admin approves a pending submission or sends it back.
    pub async fn review_verification(&self, tutor_id: Uuid, approve: bool) -> PortResult<()> {
        if !self.is_admin().await {
            return Err(PortError::Unauthorized);
        }
        let status = if approve {
            VerificationStatus::Verified
        } else {
            VerificationStatus::NotSubmitted
        };
        self.profiles
            .set_verification_status(tutor_id, status)
            .await?;
        info!(
            "Reviewed verification for {}: {}",
            tutor_id,
            status.as_str()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::notifications::test_support::FakeBackend;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Auth accounts keyed by email. Passwords are compared in the clear;
    /// the real gateway is responsible for hashing.
    #[derive(Default)]
    struct FakeAuth {
        accounts: Mutex<Vec<(String, String, Uuid)>>,
    }

    #[async_trait]
    impl AuthGateway for FakeAuth {
        async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|(e, _, _)| e == email) {
                return Err(PortError::Unexpected("email taken".to_string()));
            }
            let id = Uuid::new_v4();
            accounts.push((email.to_string(), password.to_string(), id));
            Ok(id)
        }

        async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid> {
            self.accounts
                .lock()
                .unwrap()
                .iter()
                .find(|(e, p, _)| e == email && p == password)
                .map(|(_, _, id)| *id)
                .ok_or(PortError::Unauthorized)
        }

        async fn sign_out(&self) -> PortResult<()> {
            Ok(())
        }
    }

    fn account_with_backend() -> (Arc<FakeBackend>, Account) {
        let backend = Arc::new(FakeBackend::default());
        let account = Account::new(Arc::new(FakeAuth::default()), backend.clone());
        (backend, account)
    }

    #[tokio::test]
    async fn register_then_sign_in_round_trip() {
        let (_, account) = account_with_backend();

        account
            .register("ana@example.com", "hunter2", "ana", UserRole::Learner)
            .await
            .unwrap();
        assert!(account.is_signed_in().await);
        assert!(account.is_learner().await);

        account.sign_out().await.unwrap();
        assert!(!account.is_signed_in().await);

        let profile = account.sign_in("ana@example.com", "hunter2").await.unwrap();
        assert_eq!(profile.email, "ana@example.com");
        assert!(!account.is_tutor().await);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (_, account) = account_with_backend();
        account
            .register("ana@example.com", "hunter2", "ana", UserRole::Learner)
            .await
            .unwrap();
        account.sign_out().await.unwrap();

        let err = account
            .sign_in("ana@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));
        assert!(!account.is_signed_in().await);
    }

    #[tokio::test]
    async fn verification_submission_moves_to_pending_review() {
        let (backend, account) = account_with_backend();
        account
            .register("ben@example.com", "pw", "ben", UserRole::Tutor)
            .await
            .unwrap();

        let updated = account
            .submit_verification("passport", "P123456", None, Some("ref@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(
            updated.verification_status,
            VerificationStatus::PendingReview
        );

        let stored = backend.find_by_email("ben@example.com").await.unwrap();
        assert_eq!(
            stored.verification_status,
            VerificationStatus::PendingReview
        );
        assert_eq!(stored.verification_id_type.as_deref(), Some("passport"));
    }

    #[tokio::test]
    async fn only_admins_can_review() {
        let (backend, account) = account_with_backend();
        let tutor = account
            .register("ben@example.com", "pw", "ben", UserRole::Tutor)
            .await
            .unwrap();
        account
            .submit_verification("passport", "P123456", None, None)
            .await
            .unwrap();

        // A tutor reviewing themselves is refused.
        let err = account
            .review_verification(tutor.id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));

        let admin = Account::new(Arc::new(FakeAuth::default()), backend.clone());
        *admin.current.write().await = Some({
            let mut p = tutor.clone();
            p.id = Uuid::new_v4();
            p.role = UserRole::Admin;
            p
        });
        admin.review_verification(tutor.id, true).await.unwrap();

        let stored = backend.find_by_email("ben@example.com").await.unwrap();
        assert_eq!(stored.verification_status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn learners_cannot_submit_verification() {
        let (_, account) = account_with_backend();
        account
            .register("ana@example.com", "pw", "ana", UserRole::Learner)
            .await
            .unwrap();
        let err = account
            .submit_verification("passport", "P1", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));
    }
}
