//! Reusable TUI widget components.

pub(crate) mod card;
pub(crate) mod footer;
pub(crate) mod gauge;
pub(crate) mod header;
pub(crate) mod tabs;
