pub mod app_state;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;
pub mod snapshotter;
pub mod storage;

pub mod prelude {
    pub use crate::error::{Error, Result};
}
