//! VR core tests.

pub mod branch;
pub mod exception;
pub mod loadstore;
