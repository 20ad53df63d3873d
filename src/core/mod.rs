//! Core types - process-wide state shared across the codebase.

mod mode;
mod state;

pub use mode::{Mode, mode};
pub use state::{
    is_shutdown, register_shutdown_channel, request_shutdown, setup_shutdown_handler,
};
