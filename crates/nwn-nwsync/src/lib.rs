//! Codec for NWSYNC manifests: flat, content-addressed listings of
//! `(sha1, size, resref)` triples used to sync module/hak content between
//! an NWN:EE server and its clients.

pub mod entry;
pub mod error;
pub mod reader;
pub mod writer;

pub use entry::ManifestEntry;
pub use error::{NwSyncError, Result};
pub use reader::{read, read_from_slice};
pub use writer::{write, write_to_vec};

/// The only manifest wire version this codec understands.
pub const MANIFEST_VERSION: u32 = 3;
