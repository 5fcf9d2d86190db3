pub mod notifications;
pub mod paygate;
