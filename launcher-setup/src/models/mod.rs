pub mod session;
pub mod snapshot;
pub mod state;
