//! Destination implementations

#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod memory;

#[cfg(feature = "console")]
pub use console::ConsoleDestination;
#[cfg(feature = "file")]
pub use file::{FileDestination, LineFormat};
pub use memory::MemoryDestination;

pub use crate::core::Destination;
