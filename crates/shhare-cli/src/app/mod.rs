//! Application context shared by command handlers.

mod context;

pub use context::AppContext;
