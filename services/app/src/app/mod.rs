//! services/app/src/app/mod.rs
//!
//! The application layer: one explicitly constructed manager per concern,
//! wired together by `App`. Nothing in here is a process-wide singleton;
//! construct as many `App`s as you like (tests do).

pub mod account;
pub mod events;
pub mod messaging;
pub mod notifications;
pub mod payment;
pub mod reminders;
pub mod sessions;

pub use account::Account;
pub use messaging::MessagingHub;
pub use notifications::NotificationCenter;
pub use payment::{PaymentError, PaymentStore};
pub use reminders::ReminderScheduler;
pub use sessions::{LifecycleError, SessionLifecycle};

use chrono::Utc;
use scholarlink_core::domain::SessionEvent;
use scholarlink_core::ports::{
    AuthGateway, ConversationStore, NotificationStore, PaymentVault, PortResult, ProfileStore,
    ReminderGateway, SessionStore,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Every collaborator handle the application needs, gathered so `App::new`
/// stays readable.
pub struct Collaborators {
    pub sessions: Arc<dyn SessionStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub auth: Arc<dyn AuthGateway>,
    pub reminders: Arc<dyn ReminderGateway>,
    pub vault: Arc<dyn PaymentVault>,
}

pub struct App {
    pub account: Arc<Account>,
    pub sessions: Arc<SessionLifecycle>,
    pub notifications: Arc<NotificationCenter>,
    pub messaging: Arc<MessagingHub>,
    pub reminders: Arc<ReminderScheduler>,
    pub payment: Arc<PaymentStore>,
}

impl App {
    /// Builds the managers and hands back the event receiver for
    /// `events::spawn_notifier`. Keeping the spawn outside the constructor
    /// lets tests drain the channel themselves.
    pub fn new(c: Collaborators) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = events::channel();
        let app = Self {
            account: Arc::new(Account::new(c.auth, c.profiles.clone())),
            sessions: Arc::new(SessionLifecycle::new(c.sessions, tx)),
            notifications: Arc::new(NotificationCenter::new(c.notifications, c.profiles)),
            messaging: Arc::new(MessagingHub::new(c.conversations)),
            reminders: Arc::new(ReminderScheduler::new(c.reminders)),
            payment: Arc::new(PaymentStore::new(c.vault)),
        };
        (app, rx)
    }

    /// Reloads everything visible to `user_id`. The three remote fetches are
    /// independent resources and run concurrently; the reminder sync runs
    /// after, because it derives from the fresh session list.
    pub async fn refresh(&self, user_id: Uuid) -> PortResult<()> {
        let (sessions, notifications, conversations) = tokio::join!(
            self.sessions.refresh(user_id),
            self.notifications.refresh(user_id),
            self.messaging.refresh(user_id),
        );
        sessions.map_err(lifecycle_to_port)?;
        notifications?;
        conversations?;

        let snapshot = self.sessions.snapshot().await;
        self.reminders.sync(&snapshot, Utc::now()).await
    }
}

fn lifecycle_to_port(err: LifecycleError) -> scholarlink_core::ports::PortError {
    match err {
        LifecycleError::Port(port) => port,
        other => scholarlink_core::ports::PortError::Unexpected(other.to_string()),
    }
}
