//! services/app/src/app/sessions.rs
//!
//! The session lifecycle manager. Owns the device's mirror of the remote
//! `sessions` table for the signed-in user and is the only place booking
//! state transitions happen.
//!
//! Mutations are read-after-write: the local cache changes only after the
//! remote write has succeeded. If two devices race on the same session the
//! store is last-write-wins and the losing cache stays stale until its next
//! refresh; there is no conflict detection here.

use chrono::Utc;
use scholarlink_core::domain::{
    BookingError, BookingForm, Session, SessionEvent, SessionStatus, TransitionError, UserProfile,
};
use scholarlink_core::ports::{NewSessionRecord, PortError, SessionStore};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything that can go wrong inside the lifecycle manager, split by the
/// three failure classes: form validation, illegal transitions, and remote
/// operation failures.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("session {0} is not in the local cache")]
    UnknownSession(Uuid),
    #[error(transparent)]
    Port(#[from] PortError),
}

pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    sessions: RwLock<Vec<Session>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn SessionStore>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            store,
            sessions: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Replaces the cache with the sessions visible to `user_id`, newest
    /// first as returned by the store.
    pub async fn refresh(&self, user_id: Uuid) -> Result<(), LifecycleError> {
        let fetched = self.store.list_for_user(user_id).await?;
        info!("Loaded {} sessions", fetched.len());
        *self.sessions.write().await = fetched;
        Ok(())
    }

    /// A snapshot of the cached session list.
    pub async fn snapshot(&self) -> Vec<Session> {
        self.sessions.read().await.clone()
    }

    /// Creates a new booking request from `student` to `tutor`.
    ///
    /// Validation failures leave both the cache and the store untouched. On
    /// success the created session lands at the front of the cache (it is
    /// the newest) and a `Requested` event is emitted for the notifier.
    pub async fn book(
        &self,
        student: &UserProfile,
        tutor: &UserProfile,
        form: BookingForm,
    ) -> Result<Session, LifecycleError> {
        form.validate(tutor, Utc::now())?;

        // validate() guarantees the rate is present.
        let hourly_rate = form_rate(tutor)?;
        let record = NewSessionRecord {
            student_id: student.id,
            tutor_id: tutor.id,
            student_name: student.display_name(),
            student_email: student.email.clone(),
            tutor_name: tutor.display_name(),
            tutor_email: tutor.email.clone(),
            subject: form.subject.trim().to_string(),
            session_date: form.session_date,
            duration_minutes: form.duration_minutes,
            message: form.message,
            hourly_rate,
        };

        let created = self.store.insert(record).await?;
        info!(
            "Booked {} session {} with {}",
            created.subject, created.id, created.tutor_name
        );

        self.sessions.write().await.insert(0, created.clone());
        self.emit(SessionEvent::Requested(created.clone()));
        Ok(created)
    }

    /// Tutor accepts a pending request.
    pub async fn accept(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        let mut updated = self.cached(session_id).await?;
        updated.accept()?;

        self.store
            .set_status(session_id, SessionStatus::Accepted)
            .await?;
        self.replace(updated.clone()).await;
        info!("Accepted session {}", session_id);

        self.emit(SessionEvent::Accepted(updated.clone()));
        Ok(updated)
    }

    /// Tutor declines a pending request.
    pub async fn reject(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        let mut updated = self.cached(session_id).await?;
        updated.reject()?;

        self.store
            .set_status(session_id, SessionStatus::Rejected)
            .await?;
        self.replace(updated.clone()).await;
        info!("Rejected session {}", session_id);

        self.emit(SessionEvent::Rejected(updated.clone()));
        Ok(updated)
    }

    /// Tutor marks an accepted session as held.
    pub async fn mark_complete(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        let mut updated = self.cached(session_id).await?;
        updated.complete()?;

        self.store.set_completed(session_id).await?;
        self.replace(updated.clone()).await;
        info!("Marked session {} as complete", session_id);

        self.emit(SessionEvent::Completed(updated.clone()));
        Ok(updated)
    }

    /// Student rates a session; completion is set together with the rating.
    pub async fn rate(
        &self,
        session_id: Uuid,
        rating: u8,
        review: &str,
    ) -> Result<Session, LifecycleError> {
        let mut updated = self.cached(session_id).await?;
        updated.rate(rating, review)?;

        self.store.set_rating(session_id, rating, review).await?;
        self.replace(updated.clone()).await;
        info!("Rated session {} with {} stars", session_id, rating);

        self.emit(SessionEvent::Rated(updated.clone()));
        Ok(updated)
    }

    pub async fn for_student(&self, email: &str) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.student_email == email)
            .cloned()
            .collect()
    }

    pub async fn for_tutor(&self, email: &str) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.tutor_email == email)
            .cloned()
            .collect()
    }

    pub async fn pending_for_tutor(&self, email: &str) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.tutor_email == email && s.is_pending())
            .cloned()
            .collect()
    }

    pub async fn accepted_for_student(&self, email: &str) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.student_email == email && s.is_accepted())
            .cloned()
            .collect()
    }

    async fn cached(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or(LifecycleError::UnknownSession(session_id))
    }

    async fn replace(&self, updated: Session) {
        let mut sessions = self.sessions.write().await;
        if let Some(slot) = sessions.iter_mut().find(|s| s.id == updated.id) {
            *slot = updated;
        }
    }

    /// Events are fire-and-forget: a missing subscriber never affects the
    /// transition that already happened.
    fn emit(&self, event: SessionEvent) {
        debug!("Emitting session event: {:?}", event.session().id);
        if self.events.send(event).is_err() {
            warn!("No session event subscriber; notification fan-out skipped");
        }
    }
}

fn form_rate(tutor: &UserProfile) -> Result<f64, LifecycleError> {
    tutor
        .hourly_rate
        .ok_or(LifecycleError::Booking(BookingError::NoHourlyRate))
}
