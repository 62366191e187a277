//! irminsul-common — Shared types, errors, and the network primitive used across all Irminsul crates.

pub mod entities;
pub mod error;
pub mod http;

// Re-export commonly used types
pub use entities::{
    ArtifactSlot, Element, EntityKind, MonsterCategory, Region, StatKind, Vocab, VocabTerm,
    WeaponType,
};
pub use error::{IrminsulError, Result};
pub use http::{GuardedClient, HttpResponse, HttpTransport, TransportError};
