//! Per-employee lifecycle records.
//!
//! These tables are written by the HR modules that own them; this crate reads
//! them to assemble the employee timeline and deletes them with the employee.

pub mod asset;
pub mod asset_assignment;
pub mod award;
pub mod complaint;
pub mod promotion;
pub mod resignation;
pub mod termination;
pub mod training;
pub mod training_program;
pub mod transfer;
pub mod warning;
