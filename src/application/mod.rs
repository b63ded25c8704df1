//! Application layer wiring DTOs and services for the Mars imagery pipeline.

pub mod dtos;
pub mod services;

pub use dtos::{AnalysisResult, AskRequest, AskResponse, HealthStatusResponse, IngestResponse};
pub use services::{MarsService, ServiceComponents};
