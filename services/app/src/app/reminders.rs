//! services/app/src/app/reminders.rs
//!
//! Keeps the device's locally scheduled notifications in step with the
//! current set of upcoming accepted sessions.
//!
//! The whole desired set is recomputed from the session list on every sync
//! and diffed against what the gateway says is already scheduled. That makes
//! the sync idempotent (nothing to do when nothing changed) and guarantees
//! stale reminders disappear when a session is rejected, completed, or
//! rescheduled.

use chrono::{DateTime, Utc};
use scholarlink_core::domain::{LeadTime, Session, SessionReminder};
use scholarlink_core::ports::{PortResult, ReminderGateway};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct ReminderScheduler {
    gateway: Arc<dyn ReminderGateway>,
    upcoming: RwLock<Vec<SessionReminder>>,
}

impl ReminderScheduler {
    pub fn new(gateway: Arc<dyn ReminderGateway>) -> Self {
        Self {
            gateway,
            upcoming: RwLock::new(Vec::new()),
        }
    }

    /// One-time permission prompt, forwarded to the platform gateway.
    pub async fn request_authorization(&self) -> PortResult<()> {
        self.gateway.request_authorization().await
    }

    /// Reconciles scheduled reminders against `sessions`.
    ///
    /// Each reminder is scheduled independently; a gateway refusal for one
    /// item is logged and the rest proceed. The failed identifier is absent
    /// from the gateway registry afterwards, so the next sync retries it.
    pub async fn sync(&self, sessions: &[Session], now: DateTime<Utc>) -> PortResult<()> {
        let mut desired: Vec<SessionReminder> = Vec::new();
        for session in sessions
            .iter()
            .filter(|s| s.is_accepted() && !s.is_completed && s.session_date > now)
        {
            for lead in LeadTime::ALL {
                if let Some(reminder) = SessionReminder::project(session, lead, now) {
                    desired.push(reminder);
                }
            }
        }

        let desired_ids: HashSet<String> = desired.iter().map(|r| r.id.clone()).collect();
        let scheduled = self.gateway.pending_ids().await?;

        for reminder in desired.iter().filter(|r| !scheduled.contains(&r.id)) {
            if let Err(err) = self
                .gateway
                .schedule(
                    &reminder.id,
                    reminder.fire_date,
                    &reminder.title(),
                    &reminder.body(),
                )
                .await
            {
                warn!("Failed to schedule reminder {}: {}", reminder.id, err);
            }
        }

        let stale: HashSet<String> = scheduled.difference(&desired_ids).cloned().collect();
        if !stale.is_empty() {
            debug!("Cancelling {} stale reminders", stale.len());
            self.gateway.cancel(&stale).await?;
        }

        desired.sort_by_key(|r| r.fire_date);
        *self.upcoming.write().await = desired;
        Ok(())
    }

    /// The desired reminder set from the last sync, soonest first. This is
    /// the read model the reminders screen renders.
    pub async fn upcoming(&self) -> Vec<SessionReminder> {
        self.upcoming.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use scholarlink_core::domain::SessionStatus;
    use scholarlink_core::ports::PortError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeGateway {
        registry: Mutex<HashSet<String>>,
        schedule_calls: AtomicUsize,
        cancel_calls: AtomicUsize,
        refuse_ids: Mutex<HashSet<String>>,
        fired: Mutex<Vec<(String, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl ReminderGateway for FakeGateway {
        async fn request_authorization(&self) -> PortResult<()> {
            Ok(())
        }

        async fn schedule(
            &self,
            id: &str,
            fire_at: DateTime<Utc>,
            _title: &str,
            _body: &str,
        ) -> PortResult<()> {
            self.schedule_calls.fetch_add(1, Ordering::SeqCst);
            if self.refuse_ids.lock().unwrap().contains(id) {
                return Err(PortError::Unexpected("authorization denied".to_string()));
            }
            self.registry.lock().unwrap().insert(id.to_string());
            self.fired.lock().unwrap().push((id.to_string(), fire_at));
            Ok(())
        }

        async fn cancel(&self, ids: &HashSet<String>) -> PortResult<()> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            let mut registry = self.registry.lock().unwrap();
            registry.retain(|id| !ids.contains(id));
            Ok(())
        }

        async fn pending_ids(&self) -> PortResult<HashSet<String>> {
            Ok(self.registry.lock().unwrap().clone())
        }
    }

    fn session(status: SessionStatus, completed: bool, starts_in: Duration) -> Session {
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
            session_date: now + starts_in,
            duration_minutes: 60,
            message: String::new(),
            hourly_rate: 500.0,
            status,
            is_completed: completed,
            rating: None,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn schedules_both_leads_for_far_out_sessions() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        let s = session(SessionStatus::Accepted, false, Duration::days(3));
        scheduler.sync(&[s.clone()], now).await.unwrap();

        let registry = gateway.registry.lock().unwrap().clone();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&format!("{}-86400", s.id)));
        assert!(registry.contains(&format!("{}-3600", s.id)));

        let upcoming = scheduler.upcoming().await;
        assert_eq!(upcoming.len(), 2);
        // Soonest first: the 24h lead fires before the 1h lead.
        assert!(upcoming[0].fire_date < upcoming[1].fire_date);
        assert_eq!(upcoming[0].lead, LeadTime::OneDay);
    }

    #[tokio::test]
    async fn sync_is_idempotent() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        let sessions = vec![
            session(SessionStatus::Accepted, false, Duration::days(2)),
            session(SessionStatus::Accepted, false, Duration::hours(30)),
        ];
        scheduler.sync(&sessions, now).await.unwrap();
        let schedules_after_first = gateway.schedule_calls.load(Ordering::SeqCst);
        let cancels_after_first = gateway.cancel_calls.load(Ordering::SeqCst);

        scheduler.sync(&sessions, now).await.unwrap();
        assert_eq!(
            gateway.schedule_calls.load(Ordering::SeqCst),
            schedules_after_first
        );
        assert_eq!(
            gateway.cancel_calls.load(Ordering::SeqCst),
            cancels_after_first
        );
    }

    #[tokio::test]
    async fn never_schedules_past_fire_dates() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        // Starts in 30 minutes: both the 24h and 1h leads are already past.
        let soon = session(SessionStatus::Accepted, false, Duration::minutes(30));
        // Starts in 12 hours: only the 1h lead is schedulable.
        let today = session(SessionStatus::Accepted, false, Duration::hours(12));

        scheduler.sync(&[soon, today.clone()], now).await.unwrap();

        let fired = gateway.fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, format!("{}-3600", today.id));
        assert!(fired.iter().all(|(_, fire_at)| *fire_at > now));
    }

    #[tokio::test]
    async fn cancels_reminders_for_sessions_no_longer_eligible() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        let mut s = session(SessionStatus::Accepted, false, Duration::days(2));
        scheduler.sync(&[s.clone()], now).await.unwrap();
        assert_eq!(gateway.registry.lock().unwrap().len(), 2);

        // The tutor later marks the session completed.
        s.is_completed = true;
        scheduler.sync(&[s.clone()], now).await.unwrap();
        assert!(gateway.registry.lock().unwrap().is_empty());
        assert!(scheduler.upcoming().await.is_empty());

        // A session dropped from the list entirely is cancelled the same way.
        let other = session(SessionStatus::Accepted, false, Duration::days(1));
        scheduler.sync(&[other], now).await.unwrap();
        scheduler.sync(&[], now).await.unwrap();
        assert!(gateway.registry.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_and_rejected_sessions_get_no_reminders() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        let sessions = vec![
            session(SessionStatus::Pending, false, Duration::days(2)),
            session(SessionStatus::Rejected, false, Duration::days(2)),
        ];
        scheduler.sync(&sessions, now).await.unwrap();
        assert_eq!(gateway.schedule_calls.load(Ordering::SeqCst), 0);
        assert!(scheduler.upcoming().await.is_empty());
    }

    #[tokio::test]
    async fn one_refused_reminder_does_not_block_the_rest() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = ReminderScheduler::new(gateway.clone());
        let now = Utc::now();

        let s = session(SessionStatus::Accepted, false, Duration::days(2));
        gateway
            .refuse_ids
            .lock()
            .unwrap()
            .insert(format!("{}-86400", s.id));

        scheduler.sync(&[s.clone()], now).await.unwrap();

        let registry = gateway.registry.lock().unwrap().clone();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&format!("{}-3600", s.id)));

        // Once the refusal clears, the next sync picks the missing one up.
        gateway.refuse_ids.lock().unwrap().clear();
        scheduler.sync(&[s.clone()], now).await.unwrap();
        assert_eq!(gateway.registry.lock().unwrap().len(), 2);
    }
}
