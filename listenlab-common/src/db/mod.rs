//! Database access shared across ListenLab crates

pub mod init;

pub use init::*;
