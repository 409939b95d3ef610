//! services/app/src/bin/scholarlink.rs
//!
//! Headless entry point: wires the adapters to the managers, signs in with
//! the configured account, runs one full sync, and reports what it found.

use app_lib::{
    adapters::{FilePaymentVault, FileReminderGateway, PgStore},
    app::events,
    App, AppError, Collaborators, Config,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting ScholarLink client...");

    // --- 2. Connect to the Hosted Backend ---
    info!("Connecting to backend...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));

    // --- 3. Build the Managers Over Their Collaborators ---
    let (app, event_rx) = App::new(Collaborators {
        sessions: store.clone(),
        notifications: store.clone(),
        conversations: store.clone(),
        profiles: store.clone(),
        auth: store.clone(),
        reminders: Arc::new(FileReminderGateway::new(config.reminder_registry_path())),
        vault: Arc::new(FilePaymentVault::new(config.payment_vault_path())),
    });
    let notifier = events::spawn_notifier(event_rx, app.notifications.clone());

    if let Err(err) = app.reminders.request_authorization().await {
        warn!("Reminder authorization unavailable: {}", err);
    }
    app.payment.load().await?;
    if app.payment.has_details().await {
        info!("Payment profile on file; booking is unlocked");
    }

    // --- 4. Sign In and Sync ---
    let (email, password) = match (&config.sign_in_email, &config.sign_in_password) {
        (Some(email), Some(password)) => (email.clone(), password.clone()),
        _ => {
            warn!("SCHOLARLINK_EMAIL / SCHOLARLINK_PASSWORD not set; nothing to sync");
            return Ok(());
        }
    };
    let profile = app.account.sign_in(&email, &password).await?;
    app.refresh(profile.id).await?;

    // --- 5. Report ---
    if app.account.is_tutor().await {
        let pending = app.sessions.pending_for_tutor(&profile.email).await;
        info!("{} booking requests waiting for review", pending.len());
    } else {
        let accepted = app.sessions.accepted_for_student(&profile.email).await;
        info!("{} upcoming accepted sessions", accepted.len());
    }
    info!(
        "{} unread notifications",
        app.notifications.unread_count(profile.id).await
    );
    for reminder in app.reminders.upcoming().await {
        info!(
            "Reminder at {}: {} ({} ahead)",
            reminder.fire_date,
            reminder.title(),
            reminder.lead.description()
        );
    }

    app.account.sign_out().await?;
    drop(app);
    // The lifecycle manager is gone, so the channel closes and the notifier
    // drains whatever is left before exiting.
    notifier
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(())
}
