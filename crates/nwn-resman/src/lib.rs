//! Resource containers, the `ResMan` composition layer, and the
//! environment/alias resolution that locates an NWN:EE installation and
//! composes its default resource search stack.

pub mod container;
pub mod create;
pub mod directory;
pub mod environ;
pub mod error;
pub mod keybif_container;
pub mod memory;
pub mod resman;

pub use container::Container;
pub use create::create;
pub use directory::LocalDirectory;
pub use error::{ResManError, Result};
pub use keybif_container::KeyBifContainer;
pub use memory::InMemoryDict;
pub use resman::ResMan;
