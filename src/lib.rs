//! Pixwall - A virtualized masonry image browser for the terminal.
//!
//! Images come from a paginated feed (Pixabay search or a local directory),
//! are measured asynchronously, and are laid out in shortest-column masonry
//! order. Only the cards near the viewport are positioned and drawn; more
//! rows are requested as the user scrolls toward the end.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing feed pagination.
pub mod application;
/// Domain layer containing entities, errors, layout and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing UI components and event handling.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "pixwall";
