//! Data Transfer Objects for REST request/response serialization.
//!
//! Responses wrap records under a named key (`{"services": [...]}`,
//! `{"incident": {...}}`) so clients can tell payloads apart.

pub mod common_dto;
pub mod incident_dto;
pub mod organization_dto;
pub mod service_dto;

pub use common_dto::*;
pub use incident_dto::*;
pub use organization_dto::*;
pub use service_dto::*;
