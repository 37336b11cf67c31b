//! RSP tests.

pub mod clip;
pub mod scalar;
pub mod vector_alu;
