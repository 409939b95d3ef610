//! services/app/src/adapters/db.rs
//!
//! This module contains the database adapter: the concrete implementation of
//! the remote-store ports against the hosted backend's PostgreSQL endpoint,
//! using `sqlx`. Queries are built at runtime because the schema lives with
//! the hosted service, not in this repository.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholarlink_core::domain::{
    ChatMessage, Conversation, Notification, NotificationKind, Session, SessionStatus,
    UserProfile, UserRole, VerificationStatus,
};
use scholarlink_core::ports::{
    AuthGateway, ConversationStore, NewConversationRecord, NewMessageRecord, NewSessionRecord,
    NotificationStore, PortError, PortResult, ProfileStore, SessionStore,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the remote-store ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or(e: sqlx::Error, what: impl std::fmt::Display) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    student_id: Uuid,
    tutor_id: Uuid,
    student_name: String,
    student_email: String,
    tutor_name: String,
    tutor_email: String,
    subject: String,
    session_date: DateTime<Utc>,
    duration: i32,
    message: String,
    hourly_rate: f64,
    status: String,
    is_completed: bool,
    rating: Option<i16>,
    review: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let status = SessionStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown session status '{}'", self.status))
        })?;
        Ok(Session {
            id: self.id,
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            student_name: self.student_name,
            student_email: self.student_email,
            tutor_name: self.tutor_name,
            tutor_email: self.tutor_email,
            subject: self.subject,
            session_date: self.session_date,
            duration_minutes: self.duration as u32,
            message: self.message,
            hourly_rate: self.hourly_rate,
            status,
            is_completed: self.is_completed,
            rating: self.rating.map(|r| r as u8),
            review: self.review,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SESSION_COLUMNS: &str = "id, student_id, tutor_id, student_name, student_email, \
     tutor_name, tutor_email, subject, session_date, duration, message, hourly_rate, \
     status, is_completed, rating, review, created_at, updated_at";

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    #[sqlx(rename = "type")]
    kind: String,
    related_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        let kind = NotificationKind::parse(&self.kind).ok_or_else(|| {
            PortError::Unexpected(format!("unknown notification type '{}'", self.kind))
        })?;
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind,
            related_id: self.related_id,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ConversationRecord {
    id: Uuid,
    user1_id: Uuid,
    user2_id: Uuid,
    user1_name: String,
    user2_name: String,
    last_message: Option<String>,
    last_message_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            user1_id: self.user1_id,
            user2_id: self.user2_id,
            user1_name: self.user1_name,
            user2_name: self.user2_name,
            last_message: self.last_message,
            last_message_time: self.last_message_time,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    sender_name: String,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            content: self.content,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    email: String,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    user_role: String,
    selected_subjects: Option<Vec<String>>,
    hourly_rate: Option<f64>,
    years_experience: Option<i32>,
    is_profile_complete: Option<bool>,
    verification_status: Option<String>,
    verification_id_type: Option<String>,
    verification_id_number: Option<String>,
    verification_document_url: Option<String>,
    verification_reference_contact: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Older rows predate several columns, so the optional ones fall back to
    /// their defaults instead of failing the whole fetch.
    fn to_domain(self) -> PortResult<UserProfile> {
        let role = UserRole::parse(&self.user_role).ok_or_else(|| {
            PortError::Unexpected(format!("unknown user role '{}'", self.user_role))
        })?;
        let verification_status = match self.verification_status {
            Some(raw) => VerificationStatus::parse(&raw).ok_or_else(|| {
                PortError::Unexpected(format!("unknown verification status '{raw}'"))
            })?,
            None => VerificationStatus::NotSubmitted,
        };
        Ok(UserProfile {
            id: self.id,
            email: self.email,
            username: self.username,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            role,
            subjects: self.selected_subjects.unwrap_or_default(),
            hourly_rate: self.hourly_rate,
            years_experience: self.years_experience.map(|y| y as u32),
            is_profile_complete: self.is_profile_complete.unwrap_or(false),
            verification_status,
            verification_id_type: self.verification_id_type,
            verification_id_number: self.verification_id_number,
            verification_document_url: self.verification_document_url,
            verification_reference_contact: self.verification_reference_contact,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PROFILE_COLUMNS: &str = "id, email, username, first_name, last_name, bio, user_role, \
     selected_subjects, hourly_rate, years_experience, is_profile_complete, \
     verification_status, verification_id_type, verification_id_number, \
     verification_document_url, verification_reference_contact, created_at, updated_at";

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE student_id = $1 OR tutor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert(&self, record: NewSessionRecord) -> PortResult<Session> {
        let created = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions (id, student_id, tutor_id, student_name, student_email, \
             tutor_name, tutor_email, subject, session_date, duration, message, hourly_rate, \
             status, is_completed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', FALSE) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(record.student_id)
        .bind(record.tutor_id)
        .bind(&record.student_name)
        .bind(&record.student_email)
        .bind(&record.tutor_name)
        .bind(&record.tutor_email)
        .bind(&record.subject)
        .bind(record.session_date)
        .bind(record.duration_minutes as i32)
        .bind(&record.message)
        .bind(record.hourly_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        created.to_domain()
    }

    async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> PortResult<()> {
        sqlx::query("UPDATE sessions SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn set_completed(&self, session_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE sessions SET is_completed = TRUE, updated_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn set_rating(&self, session_id: Uuid, rating: u8, review: &str) -> PortResult<()> {
        sqlx::query(
            "UPDATE sessions SET rating = $1, review = $2, is_completed = TRUE, \
             updated_at = now() WHERE id = $3",
        )
        .bind(rating as i16)
        .bind(review)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `NotificationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationStore for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT id, user_id, title, message, type, related_id, is_read, created_at \
             FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_id: Option<Uuid>,
    ) -> PortResult<()> {
        // Row-level security blocks direct inserts into other users'
        // notifications; create_notification runs with the definer's rights.
        sqlx::query("SELECT create_notification($1, $2, $3, $4, $5)")
            .bind(user_id)
            .bind(title)
            .bind(message)
            .bind(kind.as_str())
            .bind(related_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_read(&self, notification_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `ConversationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConversationStore for PgStore {
    async fn list_for_user(&self, user_id: Uuid) -> PortResult<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, user1_id, user2_id, user1_name, user2_name, last_message, \
             last_message_time, created_at FROM conversations \
             WHERE user1_id = $1 OR user2_id = $1 \
             ORDER BY last_message_time DESC NULLS LAST",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create(&self, record: NewConversationRecord) -> PortResult<Conversation> {
        let created = sqlx::query_as::<_, ConversationRecord>(
            "INSERT INTO conversations (id, user1_id, user2_id, user1_name, user2_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user1_id, user2_id, user1_name, user2_name, last_message, \
             last_message_time, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(record.user1_id)
        .bind(record.user2_id)
        .bind(&record.user1_name)
        .bind(&record.user2_name)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(created.to_domain())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, conversation_id, sender_id, sender_name, content, is_read, created_at \
             FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_message(&self, record: NewMessageRecord) -> PortResult<ChatMessage> {
        let created = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (id, conversation_id, sender_id, sender_name, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, conversation_id, sender_id, sender_name, content, is_read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(record.conversation_id)
        .bind(record.sender_id)
        .bind(&record.sender_name)
        .bind(&record.content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "UPDATE conversations SET last_message = $1, last_message_time = $2 WHERE id = $3",
        )
        .bind(&created.content)
        .bind(created.created_at)
        .bind(created.conversation_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(created.to_domain())
    }
}

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileStore for PgStore {
    async fn fetch(&self, user_id: Uuid) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Profile {user_id} not found")))?;

        record.to_domain()
    }

    async fn find_by_email(&self, email: &str) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Profile for {email} not found")))?;

        record.to_domain()
    }

    async fn list_tutors(&self) -> PortResult<Vec<UserProfile>> {
        let records = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_role = 'tutor' \
             ORDER BY username ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert(&self, profile: &UserProfile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO profiles (id, email, username, first_name, last_name, bio, user_role, \
             selected_subjects, hourly_rate, years_experience, is_profile_complete, \
             verification_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.bio)
        .bind(profile.role.as_str())
        .bind(&profile.subjects)
        .bind(profile.hourly_rate)
        .bind(profile.years_experience.map(|y| y as i32))
        .bind(profile.is_profile_complete)
        .bind(profile.verification_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn update_profile(&self, profile: &UserProfile) -> PortResult<()> {
        sqlx::query(
            "UPDATE profiles SET email = $1, username = $2, first_name = $3, last_name = $4, \
             bio = $5, user_role = $6, selected_subjects = $7, hourly_rate = $8, \
             years_experience = $9, is_profile_complete = $10, verification_status = $11, \
             verification_id_type = $12, verification_id_number = $13, \
             verification_document_url = $14, verification_reference_contact = $15, \
             updated_at = now() \
             WHERE id = $16",
        )
        .bind(&profile.email)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.bio)
        .bind(profile.role.as_str())
        .bind(&profile.subjects)
        .bind(profile.hourly_rate)
        .bind(profile.years_experience.map(|y| y as i32))
        .bind(profile.is_profile_complete)
        .bind(profile.verification_status.as_str())
        .bind(&profile.verification_id_type)
        .bind(&profile.verification_id_number)
        .bind(&profile.verification_document_url)
        .bind(&profile.verification_reference_contact)
        .bind(profile.id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn set_verification_status(
        &self,
        user_id: Uuid,
        status: VerificationStatus,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE profiles SET verification_status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `AuthGateway` Trait Implementation
//=========================================================================================

#[derive(FromRow)]
struct AuthRecord {
    user_id: Uuid,
    password_hash: String,
}

#[async_trait]
impl AuthGateway for PgStore {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {e}")))?
            .to_string();

        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO auth_accounts (user_id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthRecord>(
            "SELECT user_id, password_hash FROM auth_accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        // An unknown email reads the same as a bad password.
        .ok_or(PortError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&record.password_hash)
            .map_err(|e| PortError::Unexpected(format!("Failed to parse password hash: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::Unauthorized)?;

        Ok(record.user_id)
    }

    async fn sign_out(&self) -> PortResult<()> {
        // Token lifetimes belong to the hosted auth service; the client just
        // forgets its local session.
        Ok(())
    }
}
