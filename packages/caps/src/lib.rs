// ABOUTME: Critical Action Point records with approval workflow
// ABOUTME: Provides types, transitions, capId allocation, and owner-scoped storage

pub mod error;
pub mod input;
pub mod sequence;
pub mod storage;
pub mod transition;
pub mod types;

pub use error::{CapError, CapResult};
pub use storage::CapStorage;
pub use transition::{CapTransition, TransitionEffect, WorkflowStatus};
pub use types::*;
