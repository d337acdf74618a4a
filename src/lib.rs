pub mod config;
pub mod error;
pub mod fs;
pub mod restore;
pub mod state;
