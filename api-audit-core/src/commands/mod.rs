//! Service layer for api-audit operations.

mod description;
mod identity;
mod macie;
pub(crate) mod service;
mod stage_logging;

pub use service::ApiAuditService;
