//! Common types and utilities shared across ListenLab crates

pub mod config;
pub mod db;
pub mod error;
pub mod records;

pub use error::{Error, Result};
