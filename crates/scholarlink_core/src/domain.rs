//! crates/scholarlink_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Durations offered by the booking form, in minutes.
pub const PRESET_DURATIONS: [u32; 4] = [30, 60, 90, 120];

/// Smallest duration accepted when the student types a custom value.
pub const MIN_DURATION_MINUTES: u32 = 30;

//=========================================================================================
// Sessions
//=========================================================================================

/// The review state of a booking request. Set to `Pending` at creation and
/// moved exactly once by the tutor to `Accepted` or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Accepted => "accepted",
            SessionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(SessionStatus::Pending),
            "accepted" => Some(SessionStatus::Accepted),
            "rejected" => Some(SessionStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An illegal session state transition. The session is left untouched
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("session is {0}, only pending sessions can be reviewed")]
    NotPending(SessionStatus),
    #[error("session is {0}, only accepted sessions can be completed or rated")]
    NotAccepted(SessionStatus),
    #[error("session is already completed")]
    AlreadyCompleted,
    #[error("session has already been rated")]
    AlreadyRated,
    #[error("rating {0} is out of range, expected 1 to 5")]
    RatingOutOfRange(u8),
}

/// A booking engagement between one student and one tutor.
///
/// Names, emails and the hourly rate are snapshots taken when the booking is
/// created; they intentionally do not follow later profile edits, so a
/// booking always shows what both sides agreed to at the time.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
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
    pub status: SessionStatus,
    pub is_completed: bool,
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    pub fn is_accepted(&self) -> bool {
        self.status == SessionStatus::Accepted
    }

    pub fn is_rejected(&self) -> bool {
        self.status == SessionStatus::Rejected
    }

    /// Total price of the engagement: the hourly rate applied to the booked
    /// duration.
    pub fn total_cost(&self) -> f64 {
        self.hourly_rate * (f64::from(self.duration_minutes) / 60.0)
    }

    /// Tutor approves the request. Legal only while the request is pending.
    pub fn accept(&mut self) -> Result<(), TransitionError> {
        if !self.is_pending() {
            return Err(TransitionError::NotPending(self.status));
        }
        self.status = SessionStatus::Accepted;
        Ok(())
    }

    /// Tutor declines the request. Legal only while the request is pending.
    pub fn reject(&mut self) -> Result<(), TransitionError> {
        if !self.is_pending() {
            return Err(TransitionError::NotPending(self.status));
        }
        self.status = SessionStatus::Rejected;
        Ok(())
    }

    /// Tutor marks an accepted session as held. A rejected or still-pending
    /// booking can never become completed, and completion is terminal.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        if !self.is_accepted() {
            return Err(TransitionError::NotAccepted(self.status));
        }
        if self.is_completed {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.is_completed = true;
        Ok(())
    }

    /// Student rates the session, 1 to 5, with an optional free-text review.
    ///
    /// Rating implies completion: `is_completed` is set together with the
    /// rating, so a student may rate an accepted session the tutor never
    /// explicitly closed. A session can be rated at most once.
    pub fn rate(&mut self, rating: u8, review: &str) -> Result<(), TransitionError> {
        if !(1..=5).contains(&rating) {
            return Err(TransitionError::RatingOutOfRange(rating));
        }
        if !self.is_accepted() {
            return Err(TransitionError::NotAccepted(self.status));
        }
        if self.rating.is_some() {
            return Err(TransitionError::AlreadyRated);
        }
        self.rating = Some(rating);
        self.review = Some(review.to_string());
        self.is_completed = true;
        Ok(())
    }
}

//=========================================================================================
// Booking validation
//=========================================================================================

/// What a student fills in when requesting a session with a tutor.
#[derive(Debug, Clone)]
pub struct BookingForm {
    pub subject: String,
    pub session_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("please select a subject")]
    EmptySubject,
    #[error("{0} is not one of the tutor's subjects")]
    SubjectNotOffered(String),
    #[error("session date must be in the future")]
    DateNotInFuture,
    #[error("duration of {0} minutes is below the {MIN_DURATION_MINUTES} minute minimum")]
    DurationTooShort(u32),
    #[error("tutor has not published an hourly rate")]
    NoHourlyRate,
}

impl BookingForm {
    /// Validates the form against the tutor it targets. Nothing is mutated
    /// on failure; the caller surfaces the message and keeps the form open.
    pub fn validate(&self, tutor: &UserProfile, now: DateTime<Utc>) -> Result<(), BookingError> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(BookingError::EmptySubject);
        }
        if !tutor.subjects.iter().any(|s| s == subject) {
            return Err(BookingError::SubjectNotOffered(subject.to_string()));
        }
        if self.session_date <= now {
            return Err(BookingError::DateNotInFuture);
        }
        if self.duration_minutes < MIN_DURATION_MINUTES {
            return Err(BookingError::DurationTooShort(self.duration_minutes));
        }
        if tutor.hourly_rate.is_none() {
            return Err(BookingError::NoHourlyRate);
        }
        Ok(())
    }
}

//=========================================================================================
// Reminders
//=========================================================================================

/// How far ahead of the session start a local reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadTime {
    OneDay,
    OneHour,
}

impl LeadTime {
    pub const ALL: [LeadTime; 2] = [LeadTime::OneDay, LeadTime::OneHour];

    pub fn seconds(&self) -> i64 {
        match self {
            LeadTime::OneDay => 86_400,
            LeadTime::OneHour => 3_600,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds())
    }

    pub fn description(&self) -> &'static str {
        match self {
            LeadTime::OneDay => "24 hours",
            LeadTime::OneHour => "1 hour",
        }
    }
}

/// A locally scheduled reminder derived from an upcoming accepted session.
///
/// Reminders are never persisted remotely; the identifier is deterministic
/// over (session, lead time) so the desired set can be rebuilt from the
/// session list alone and diffed against whatever was scheduled before.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReminder {
    pub id: String,
    pub session_id: Uuid,
    pub subject: String,
    pub tutor_name: String,
    pub fire_date: DateTime<Utc>,
    pub lead: LeadTime,
}

impl SessionReminder {
    pub fn identifier(session_id: Uuid, lead: LeadTime) -> String {
        format!("{}-{}", session_id, lead.seconds())
    }

    /// Projects a session onto one lead time. Returns `None` when the fire
    /// date has already passed and scheduling it would be pointless.
    pub fn project(session: &Session, lead: LeadTime, now: DateTime<Utc>) -> Option<Self> {
        let fire_date = session.session_date - lead.duration();
        if fire_date <= now {
            return None;
        }
        Some(Self {
            id: Self::identifier(session.id, lead),
            session_id: session.id,
            subject: session.subject.clone(),
            tutor_name: session.tutor_name.clone(),
            fire_date,
            lead,
        })
    }

    pub fn title(&self) -> String {
        format!("Upcoming {} session", self.subject)
    }

    pub fn body(&self) -> String {
        format!("{} meets you in {}.", self.tutor_name, self.lead.description())
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    SessionRequest,
    SessionAccepted,
    SessionRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::SessionRequest => "session_request",
            NotificationKind::SessionAccepted => "session_accepted",
            NotificationKind::SessionRejected => "session_rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "session_request" => Some(NotificationKind::SessionRequest),
            "session_accepted" => Some(NotificationKind::SessionAccepted),
            "session_rejected" => Some(NotificationKind::SessionRejected),
            _ => None,
        }
    }
}

/// An in-app notification delivered to one user, created by the backend in
/// response to a session transition.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Messaging
//=========================================================================================

/// A chat between exactly two users. Participant names are denormalized for
/// list rendering; `last_message`/`last_message_time` cache the newest entry.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_name: String,
    pub user2_name: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn other_user_name(&self, current_user_id: Uuid) -> &str {
        if current_user_id == self.user1_id {
            &self.user2_name
        } else {
            &self.user1_name
        }
    }

    pub fn other_user_id(&self, current_user_id: Uuid) -> Uuid {
        if current_user_id == self.user1_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }

    /// True when this conversation is between the given pair, in either order.
    pub fn involves(&self, a: Uuid, b: Uuid) -> bool {
        (self.user1_id == a && self.user2_id == b) || (self.user1_id == b && self.user2_id == a)
    }
}

/// One entry in a conversation's append-only log.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Payment details
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BillingAddress {
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

impl BillingAddress {
    pub fn is_complete(&self) -> bool {
        !self.street.is_empty()
            && !self.city.is_empty()
            && !self.province.is_empty()
            && !self.postal_code.is_empty()
    }
}

/// The single on-device payment profile. Persisted locally only; this
/// codebase never transmits it anywhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentDetails {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub phone_number: String,
    pub email: String,
    pub billing_address: BillingAddress,
    pub save_for_future_sessions: bool,
    pub enable_auto_approval: bool,
}

impl PaymentDetails {
    pub fn masked_card_number(&self) -> String {
        let digits: String = self
            .card_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let tail = &digits[digits.len().saturating_sub(4)..];
        format!("•••• •••• •••• {tail}")
    }

    /// "MM/YY" display form, empty until both fields are filled in.
    pub fn expiration_display(&self) -> String {
        if self.expiry_month.is_empty() || self.expiry_year.is_empty() {
            return String::new();
        }
        let year = &self.expiry_year[self.expiry_year.len().saturating_sub(2)..];
        format!("{}/{}", self.expiry_month, year)
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Learner,
    Tutor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Learner => "learner",
            UserRole::Tutor => "tutor",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "learner" => Some(UserRole::Learner),
            "tutor" => Some(UserRole::Tutor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Where a tutor stands in the credential review flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    NotSubmitted,
    PendingReview,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::NotSubmitted => "not_submitted",
            VerificationStatus::PendingReview => "pending_review",
            VerificationStatus::Verified => "verified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "not_submitted" => Some(VerificationStatus::NotSubmitted),
            "pending_review" => Some(VerificationStatus::PendingReview),
            "verified" => Some(VerificationStatus::Verified),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::NotSubmitted => "Verification Not Submitted",
            VerificationStatus::PendingReview => "Verification Pending",
            VerificationStatus::Verified => "Verified Tutor",
        }
    }

    pub fn helper_text(&self) -> &'static str {
        match self {
            VerificationStatus::NotSubmitted => {
                "Submit your credentials to earn a verification badge."
            }
            VerificationStatus::PendingReview => "We are reviewing the documents you submitted.",
            VerificationStatus::Verified => "Credentials reviewed and approved.",
        }
    }
}

/// A user profile as mirrored from the remote `profiles` table.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
    pub subjects: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub years_experience: Option<u32>,
    pub is_profile_complete: bool,
    pub verification_status: VerificationStatus,
    pub verification_id_type: Option<String>,
    pub verification_id_number: Option<String>,
    pub verification_document_url: Option<String>,
    pub verification_reference_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_verified_tutor(&self) -> bool {
        self.role == UserRole::Tutor && self.verification_status == VerificationStatus::Verified
    }
}

//=========================================================================================
// Domain events
//=========================================================================================

/// Emitted by the session lifecycle manager after a transition has been
/// written remotely. Subscribers (notification fan-out) act on these without
/// being able to affect the transition itself.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Requested(Session),
    Accepted(Session),
    Rejected(Session),
    Completed(Session),
    Rated(Session),
}

impl SessionEvent {
    pub fn session(&self) -> &Session {
        match self {
            SessionEvent::Requested(s)
            | SessionEvent::Accepted(s)
            | SessionEvent::Rejected(s)
            | SessionEvent::Completed(s)
            | SessionEvent::Rated(s) => s,
        }
    }
}
