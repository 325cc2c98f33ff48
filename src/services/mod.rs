//! Service layer
//!
//! Orchestrators over the storage layer: inquiry (find/get), publishing
//! (save/delete under ownership and unit-of-work discipline), the
//! publisher-assertion protocol, and the ownership checks the others lean on.

pub mod assertions;
pub mod inquiry;
pub mod ownership;
pub mod publish;

pub use assertions::AssertionService;
pub use inquiry::{InquiryService, KeyList};
pub use ownership::OwnershipService;
pub use publish::PublishService;
