//! The host-side dispatch seam: `EXECUTE_COMMAND` resolves a function by
//! id in the [`crate::langspec::LangSpec`] table, marshals its declared
//! arguments off the stack, and hands them to whatever implements this
//! trait. Implementing actual nwscript command bodies (`Random`,
//! `PrintString`, and the ~1100 others) is the embedder's job, not this
//! crate's.

use crate::error::Result;
use crate::value::Value;

/// A host implementation of the engine's command functions.
pub trait CommandTable {
    /// Invoke `function` with its arguments already resolved in
    /// declaration order (defaults substituted for omitted trailing
    /// args). Returns `Ok(None)` for a `void` function. An
    /// unimplemented function should return
    /// `Err(VmError::NotImplemented(function.to_string()))`.
    fn invoke(&mut self, function: &str, args: Vec<Value>) -> Result<Option<Value>>;
}
