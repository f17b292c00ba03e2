pub mod config;
pub mod error;
pub mod event;
pub mod io;
pub mod migration;

pub use error::{CoreError, Result};
