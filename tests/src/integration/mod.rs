//! Cross-crate integration flows.

pub mod end_to_end;
pub mod lifecycle;
