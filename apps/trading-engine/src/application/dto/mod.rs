//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod control_dto;

pub use control_dto::{StatusDto, TickResultDto};
