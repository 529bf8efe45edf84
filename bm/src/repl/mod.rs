//! Interactive REPL for BiteMatch
//!
//! The conversational surface: stage food items, a vibe, and a photo,
//! ask a question, and watch the recommendation stream in.

mod session;

pub use session::ReplSession;
