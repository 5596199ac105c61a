//! Report rendering for the two sinks.
//!
//! - document: ordered `DocOp`s that rebuild the target document
//! - email: one HTML body for the notification copy

pub mod document;
pub mod email;

/// Background of the row for today's weekday, in both sinks.
pub const HIGHLIGHT_COLOR: &str = "#FFF2CC";

/// Heading above the menu image.
pub const MENU_HEADING: &str = "Today's Menu";
