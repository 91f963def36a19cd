//! Command handlers

pub mod clean;
pub mod config;
pub mod image;
pub mod inspect;
