pub mod adapters;
pub mod app;
pub mod config;
pub mod error;

pub use app::{App, Collaborators};
pub use config::Config;
pub use error::AppError;
