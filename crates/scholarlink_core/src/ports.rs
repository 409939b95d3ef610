//! crates/scholarlink_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the hosted backend,
//! the OS notification scheduler, or the on-device key-value store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::{
    ChatMessage, Conversation, Notification, NotificationKind, PaymentDetails, Session,
    SessionStatus, UserProfile, VerificationStatus,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Write-side records
//=========================================================================================

/// Fields the client supplies when inserting a session; the store assigns
/// the id, timestamps, and the initial pending state.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub student_id: Uuid,
    pub tutor_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub tutor_name: String,
    pub tutor_email: String,
    pub subject: String,
    pub session_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub message: String,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone)]
pub struct NewConversationRecord {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_name: String,
    pub user2_name: String,
}

#[derive(Debug, Clone)]
pub struct NewMessageRecord {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
}

//=========================================================================================
// Remote store ports
//=========================================================================================

/// The remote `sessions` table, scoped to rows visible to one user
/// (`student_id = me OR tutor_id = me`), newest first.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Session>>;

    async fn insert(&self, record: NewSessionRecord) -> PortResult<Session>;

    async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> PortResult<()>;

    async fn set_completed(&self, session_id: Uuid) -> PortResult<()>;

    /// Stores rating and review, and marks the session completed in the same
    /// write.
    async fn set_rating(&self, session_id: Uuid, rating: u8, review: &str) -> PortResult<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Notification>>;

    /// Creates a notification for another user. Backed by a privileged
    /// server-side call, since ordinary clients cannot write to other users'
    /// notification rows.
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_id: Option<Uuid>,
    ) -> PortResult<()>;

    async fn mark_read(&self, notification_id: Uuid) -> PortResult<()>;

    async fn mark_all_read(&self, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Conversations the user participates in, most recently active first.
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Conversation>>;

    async fn create(&self, record: NewConversationRecord) -> PortResult<Conversation>;

    /// Messages of one conversation in chronological order.
    async fn list_messages(&self, conversation_id: Uuid) -> PortResult<Vec<ChatMessage>>;

    /// Appends a message and refreshes the conversation's last-message cache.
    async fn insert_message(&self, record: NewMessageRecord) -> PortResult<ChatMessage>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, user_id: Uuid) -> PortResult<UserProfile>;

    async fn find_by_email(&self, email: &str) -> PortResult<UserProfile>;

    async fn list_tutors(&self) -> PortResult<Vec<UserProfile>>;

    /// Creates the profile row right after sign-up.
    async fn insert(&self, profile: &UserProfile) -> PortResult<()>;

    async fn update_profile(&self, profile: &UserProfile) -> PortResult<()>;

    /// Admin review action.
    async fn set_verification_status(
        &self,
        user_id: Uuid,
        status: VerificationStatus,
    ) -> PortResult<()>;
}

/// The hosted auth service. Credential storage and verification live behind
/// this boundary; the client only ever sees the resulting user id.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid>;

    async fn sign_out(&self) -> PortResult<()>;
}

//=========================================================================================
// Local device ports
//=========================================================================================

/// The OS-local notification scheduler. Scheduling is per-item; a denied or
/// failed `schedule` call affects only that reminder.
#[async_trait]
pub trait ReminderGateway: Send + Sync {
    /// Asks the platform for permission to post local notifications. Must be
    /// a no-op when permission was already granted or denied.
    async fn request_authorization(&self) -> PortResult<()>;

    async fn schedule(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        title: &str,
        body: &str,
    ) -> PortResult<()>;

    async fn cancel(&self, ids: &HashSet<String>) -> PortResult<()>;

    /// Identifiers of everything currently scheduled on this device.
    async fn pending_ids(&self) -> PortResult<HashSet<String>>;
}

/// The on-device key-value store holding the single payment profile.
#[async_trait]
pub trait PaymentVault: Send + Sync {
    async fn load(&self) -> PortResult<Option<(PaymentDetails, DateTime<Utc>)>>;

    /// Overwrites the stored profile and returns the save timestamp.
    async fn save(&self, details: &PaymentDetails) -> PortResult<DateTime<Utc>>;

    async fn clear(&self) -> PortResult<()>;
}
