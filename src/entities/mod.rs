//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance_policy;
pub mod branch;
pub mod candidate;
pub mod counter;
pub mod department;
pub mod designation;
pub mod document_type;
pub mod employee;
pub mod employee_document;
pub mod job_posting;
pub mod lifecycle;
pub mod offer;
pub mod offer_template;
pub mod principal;
pub mod role;
pub mod session;
pub mod shift;
pub mod source;

// Re-export specific types to avoid conflicts
pub use attendance_policy::Entity as AttendancePolicy;
pub use branch::Entity as Branch;
pub use candidate::{CandidateStatus, Entity as Candidate, Model as CandidateModel};
pub use counter::Entity as Counter;
pub use department::Entity as Department;
pub use designation::Entity as Designation;
pub use document_type::Entity as DocumentType;
pub use employee::{EmploymentStatus, Entity as Employee, Model as EmployeeModel};
pub use employee_document::{
    Entity as EmployeeDocument, Model as EmployeeDocumentModel, VerificationStatus,
};
pub use job_posting::Entity as JobPosting;
pub use offer::{Entity as Offer, Model as OfferModel, OfferStatus};
pub use offer_template::Entity as OfferTemplate;
pub use principal::{Entity as Principal, Model as PrincipalModel, PrincipalKind, PrincipalStatus};
pub use role::Entity as Role;
pub use session::Entity as Session;
pub use shift::Entity as Shift;
pub use source::Entity as Source;
