//! Error types for EchoBake

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EchoBakeError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Geometry query error: {0}")]
    GeometryQuery(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Analysis error: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, EchoBakeError>;
