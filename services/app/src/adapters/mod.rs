pub mod db;
pub mod reminders;
pub mod vault;

pub use db::PgStore;
pub use reminders::FileReminderGateway;
pub use vault::FilePaymentVault;
