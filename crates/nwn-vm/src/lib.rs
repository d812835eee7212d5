//! NCS bytecode decoding, NDB debug-info parsing, the nwscript language
//! spec reader, and the script VM that ties them together.

pub mod command;
pub mod error;
pub mod langspec;
pub mod ncs;
pub mod ndb;
pub mod object;
pub mod script;
pub mod stack;
pub mod value;
pub mod vm;

pub use command::CommandTable;
pub use error::{Result, VmError};
pub use langspec::LangSpec;
pub use ncs::Ncs;
pub use ndb::Ndb;
pub use object::Object;
pub use script::Script;
pub use stack::{Slot, Stack};
pub use value::{Effect, Value, Vector};
pub use vm::VM;
