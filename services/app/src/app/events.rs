//! services/app/src/app/events.rs
//!
//! The subscriber side of the session event channel. The lifecycle manager
//! finishes its transition and moves on; this task picks the event up and
//! performs the notification fan-out, so a failed or slow notification can
//! never roll a transition back.

use crate::app::notifications::NotificationCenter;
use scholarlink_core::domain::SessionEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub fn channel() -> (
    mpsc::UnboundedSender<SessionEvent>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    mpsc::unbounded_channel()
}

/// Drains session events until every sender is gone. One notification per
/// accept/reject/request; completion and rating stay silent.
pub fn spawn_notifier(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    center: Arc<NotificationCenter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            dispatch(&center, &event).await;
        }
        debug!("Session event channel closed; notifier stopping");
    })
}

async fn dispatch(center: &NotificationCenter, event: &SessionEvent) {
    let result = match event {
        SessionEvent::Requested(session) => center.notify_tutor_of_request(session).await,
        SessionEvent::Accepted(session) => center.notify_student_of_acceptance(session).await,
        SessionEvent::Rejected(session) => center.notify_student_of_rejection(session).await,
        // No fan-out for these; the student sees the result in their own list.
        SessionEvent::Completed(_) | SessionEvent::Rated(_) => return,
    };

    if let Err(err) = result {
        warn!(
            "Failed to send notification for session {}: {}",
            event.session().id,
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::notifications::test_support::FakeBackend;
    use chrono::{Duration, Utc};
    use scholarlink_core::domain::{Session, SessionStatus, UserRole};
    use uuid::Uuid;

    fn sample_session() -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            tutor_id: Uuid::new_v4(),
            student_name: "Ana Cruz".to_string(),
            student_email: "ana@example.com".to_string(),
            tutor_name: "Ben Reyes".to_string(),
            tutor_email: "ben@example.com".to_string(),
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

    #[tokio::test]
    async fn notifier_fans_out_exactly_one_notification_per_review_event() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_user("ana@example.com", UserRole::Learner)
                .with_user("ben@example.com", UserRole::Tutor),
        );
        let center = Arc::new(NotificationCenter::new(backend.clone(), backend.clone()));

        let (tx, rx) = channel();
        let handle = spawn_notifier(rx, center);

        let session = sample_session();
        tx.send(SessionEvent::Requested(session.clone())).unwrap();
        tx.send(SessionEvent::Accepted(session.clone())).unwrap();
        tx.send(SessionEvent::Completed(session.clone())).unwrap();
        tx.send(SessionEvent::Rated(session)).unwrap();
        drop(tx);

        // The task drains everything before exiting, so joining it is enough.
        handle.await.unwrap();

        let rows = backend.notifications.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, backend.user_id("ben@example.com"));
        assert_eq!(rows[1].user_id, backend.user_id("ana@example.com"));
    }

    #[tokio::test]
    async fn notification_failure_does_not_stop_the_notifier() {
        // Backend knows the tutor but not the student, so the acceptance
        // notification fails to resolve its recipient.
        let backend = Arc::new(FakeBackend::default().with_user("ben@example.com", UserRole::Tutor));
        let center = Arc::new(NotificationCenter::new(backend.clone(), backend.clone()));

        let (tx, rx) = channel();
        let handle = spawn_notifier(rx, center);

        let session = sample_session();
        tx.send(SessionEvent::Accepted(session.clone())).unwrap();
        tx.send(SessionEvent::Requested(session)).unwrap();
        drop(tx);
        handle.await.unwrap();

        let rows = backend.notifications.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, backend.user_id("ben@example.com"));
    }
}
