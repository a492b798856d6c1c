//! Human review of judged answers: persistent store plus web UI.

pub mod server;
pub mod store;

pub use server::serve;
pub use store::{ReviewStats, ReviewStore};
