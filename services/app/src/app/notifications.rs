//! services/app/src/app/notifications.rs
//!
//! In-app notifications: a cached mirror of the user's notification rows,
//! read/unread bookkeeping, and the convenience senders invoked by the
//! session event subscriber.
//!
//! Sending is two remote round-trips: resolve the recipient by email, then
//! the privileged create call. Both are best-effort from the caller's point
//! of view.

use scholarlink_core::domain::{Notification, NotificationKind, Session};
use scholarlink_core::ports::{NotificationStore, PortResult, ProfileStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

pub struct NotificationCenter {
    store: Arc<dyn NotificationStore>,
    profiles: Arc<dyn ProfileStore>,
    notifications: RwLock<Vec<Notification>>,
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn NotificationStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            profiles,
            notifications: RwLock::new(Vec::new()),
        }
    }

    pub async fn refresh(&self, user_id: Uuid) -> PortResult<()> {
        let fetched = self.store.list_for_user(user_id).await?;
        info!("Loaded {} notifications", fetched.len());
        *self.notifications.write().await = fetched;
        Ok(())
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn unread(&self, user_id: Uuid) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned()
            .collect()
    }

    pub async fn unread_count(&self, user_id: Uuid) -> usize {
        self.unread(user_id).await.len()
    }

    /// Remote update first; the cache flips only after it succeeds.
    pub async fn mark_read(&self, notification_id: Uuid) -> PortResult<()> {
        self.store.mark_read(notification_id).await?;
        let mut notifications = self.notifications.write().await;
        if let Some(n) = notifications.iter_mut().find(|n| n.id == notification_id) {
            n.is_read = true;
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> PortResult<()> {
        self.store.mark_all_read(user_id).await?;
        let mut notifications = self.notifications.write().await;
        for n in notifications.iter_mut().filter(|n| n.user_id == user_id) {
            n.is_read = true;
        }
        Ok(())
    }

    pub async fn notify_tutor_of_request(&self, session: &Session) -> PortResult<()> {
        let tutor = self.profiles.find_by_email(&session.tutor_email).await?;
        self.store
            .create(
                tutor.id,
                "New Session Request",
                &format!(
                    "{} wants to book a {} session with you",
                    session.student_name, session.subject
                ),
                NotificationKind::SessionRequest,
                Some(session.id),
            )
            .await
    }

    pub async fn notify_student_of_acceptance(&self, session: &Session) -> PortResult<()> {
        let student = self.profiles.find_by_email(&session.student_email).await?;
        self.store
            .create(
                student.id,
                "Session Accepted! 🎉",
                &format!(
                    "{} accepted your {} session request",
                    session.tutor_name, session.subject
                ),
                NotificationKind::SessionAccepted,
                Some(session.id),
            )
            .await
    }

    pub async fn notify_student_of_rejection(&self, session: &Session) -> PortResult<()> {
        let student = self.profiles.find_by_email(&session.student_email).await?;
        self.store
            .create(
                student.id,
                "Session Request Declined",
                &format!(
                    "{} declined your {} session request",
                    session.tutor_name, session.subject
                ),
                NotificationKind::SessionRejected,
                Some(session.id),
            )
            .await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeBackend;
    use super::*;
    use chrono::{Duration, Utc};
    use scholarlink_core::domain::{SessionStatus, UserRole};

    fn sample_session(student_email: &str, tutor_email: &str) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            tutor_id: Uuid::new_v4(),
            student_name: "Ana Cruz".to_string(),
            student_email: student_email.to_string(),
            tutor_name: "Ben Reyes".to_string(),
            tutor_email: tutor_email.to_string(),
            subject: "Physics".to_string(),
            session_date: now + Duration::days(1),
            duration_minutes: 60,
            message: String::new(),
            hourly_rate: 500.0,
            status: SessionStatus::Pending,
            is_completed: false,
            rating: None,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn center() -> (Arc<FakeBackend>, NotificationCenter) {
        let backend = Arc::new(
            FakeBackend::default()
                .with_user("ana@example.com", UserRole::Learner)
                .with_user("ben@example.com", UserRole::Tutor),
        );
        let center = NotificationCenter::new(backend.clone(), backend.clone());
        (backend, center)
    }

    #[tokio::test]
    async fn request_notification_targets_the_tutor() {
        let (backend, center) = center();
        let session = sample_session("ana@example.com", "ben@example.com");

        center.notify_tutor_of_request(&session).await.unwrap();

        let rows = backend.notifications.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, backend.user_id("ben@example.com"));
        assert_eq!(rows[0].kind, NotificationKind::SessionRequest);
        assert_eq!(rows[0].related_id, Some(session.id));
        assert!(rows[0].message.contains("Ana Cruz"));
    }

    #[tokio::test]
    async fn unread_bookkeeping_follows_remote_updates() {
        let (backend, center) = center();
        let session = sample_session("ana@example.com", "ben@example.com");
        let ana = backend.user_id("ana@example.com");

        center.notify_student_of_acceptance(&session).await.unwrap();
        center.notify_student_of_rejection(&session).await.unwrap();
        center.refresh(ana).await.unwrap();
        assert_eq!(center.unread_count(ana).await, 2);

        let first = center.all().await[0].id;
        center.mark_read(first).await.unwrap();
        assert_eq!(center.unread_count(ana).await, 1);

        center.mark_all_read(ana).await.unwrap();
        assert_eq!(center.unread_count(ana).await, 0);
        assert!(backend
            .notifications
            .lock()
            .unwrap()
            .iter()
            .all(|n| n.is_read));
    }

    #[tokio::test]
    async fn unknown_recipient_surfaces_not_found() {
        let (_, center) = center();
        let session = sample_session("ana@example.com", "ghost@example.com");
        let err = center.notify_tutor_of_request(&session).await.unwrap_err();
        assert!(matches!(err, scholarlink_core::ports::PortError::NotFound(_)));
    }
}
