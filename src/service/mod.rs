pub mod auth;
pub mod crypto;
pub mod event;
pub mod log;
pub mod media;
pub mod populate;
pub mod rsvp;
pub mod session;
pub mod user;
pub mod validate;
