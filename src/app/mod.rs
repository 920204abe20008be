//! Long-lived plugin session

pub mod state;

pub use state::KnifeSession;
