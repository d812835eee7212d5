//! Error type for resource containers, ResMan, and environment resolution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResManError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("container is read-only")]
    ReadOnly,

    #[error("invalid resref: {0}")]
    InvalidResref(String),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    KeyBif(#[from] nwn_keybif::KeyBifError),
}

pub type Result<T> = std::result::Result<T, ResManError>;
