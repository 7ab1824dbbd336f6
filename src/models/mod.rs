//! Data models shared by the session and supervisor layers

pub mod session_record;

pub use session_record::{SessionRecord, SessionState};
