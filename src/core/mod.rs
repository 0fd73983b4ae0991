//! Core business logic - framework-agnostic recruitment and HR operations.
//! Every operation takes a database connection (or transaction) plus explicit
//! context; nothing here knows about HTTP.

/// Candidate store and status machine
pub mod candidate;
/// Request-scoped principal, permissions, branding and clock
pub mod context;
/// Hired candidate to employee conversion
pub mod conversion;
/// Employee document vault
pub mod document;
/// Employee records
pub mod employee;
/// Identity and status gate (exit-date revocation)
pub mod gate;
/// Offer letters: render, store, mail
pub mod offer;
/// Page requests and paginated results
pub mod pagination;
/// Form pick lists and reference data seeding
pub mod reference;
/// Lenient salary parsing for human-typed amounts
pub mod salary;
/// Employee id allocation
pub mod sequence;
/// Session tokens
pub mod session;
/// Employee lifecycle timeline
pub mod timeline;
/// User administration, passwords and sign-in
pub mod user;
