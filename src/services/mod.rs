//! Collaborators at the edge of the core: mail transport, file storage and
//! PDF rendering. Each is a small trait or function with in-process
//! implementations so the core can run and be tested without external services.

/// Outgoing mail transport
pub mod mail;
/// Minimal text-to-PDF writer for offer letters
pub mod pdf;
/// Blob storage for uploads and generated letters
pub mod storage;

pub use mail::{Attachment, DisabledMailer, Mailer, MemoryMailer, OutgoingMail, SesMailer};
pub use storage::{FileStore, LocalFileStore, MemoryFileStore};
