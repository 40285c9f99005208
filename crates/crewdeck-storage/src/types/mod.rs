//! Type definitions for crewdeck storage.

mod batch;
mod ids;
mod invitations;
mod members;
mod partners;
mod roles;
mod tasks;

// Re-export all types from submodules
pub use batch::*;
pub use ids::*;
pub use invitations::*;
pub use members::*;
pub use partners::*;
pub use roles::*;
pub use tasks::*;
