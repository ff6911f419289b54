// [apps/gateway/src/handlers/mod.rs]
//! =================================================================
//! APARATO: HANDLERS MANIFEST (V5.0)
//! RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LA SUPERFICIE RPC
//! =================================================================

pub mod admin;
pub mod inference;
pub mod wire_errors;
