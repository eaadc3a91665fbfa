//! Pure utility functions.
//!
//! Process bootstrap and retry policy helpers shared by the library and
//! the dispatcher binary.

pub mod bootstrap;
pub mod retry;
