//! Population Setup
//!
//! Seeded generation of agent profiles and the conversations between them.

pub mod conversations;
pub mod profiles;

pub use conversations::*;
pub use profiles::*;
