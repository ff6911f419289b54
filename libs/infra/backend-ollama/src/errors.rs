// [libs/infra/backend-ollama/src/errors.rs]
//! =================================================================
//! APARATO: OLLAMA ADAPTER ERRORS (V3.0)
//! RESPONSABILIDAD: CATALOGACIÓN DE FALLOS DE CONSTRUCCIÓN DEL UPLINK
//! =================================================================

use thiserror::Error;

/// Fallos de construcción del adaptador. Los fallos de despacho en
/// runtime viajan por el contrato del dominio (`BackendFault`).
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("PATTERN_COMPILATION_FAULT: Invalid model glob pattern: {0}")]
    PatternCompilation(#[from] globset::Error),

    #[error("CLIENT_CONSTRUCTION_FAULT: HTTP client ignition failed: {0}")]
    ClientConstruction(#[from] reqwest::Error),
}
