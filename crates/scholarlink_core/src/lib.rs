pub mod domain;
pub mod ports;

pub use domain::{
    BookingError, BookingForm, ChatMessage, Conversation, LeadTime, Notification,
    NotificationKind, PaymentDetails, Session, SessionEvent, SessionReminder, SessionStatus,
    TransitionError, UserProfile, UserRole, VerificationStatus,
};
pub use ports::{
    AuthGateway, ConversationStore, NotificationStore, PaymentVault, PortError, PortResult,
    ProfileStore, ReminderGateway, SessionStore,
};
