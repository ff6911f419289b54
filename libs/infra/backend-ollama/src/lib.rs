// [libs/infra/backend-ollama/src/lib.rs]
/*!
 * =================================================================
 * APARATO: OLLAMA ADAPTER MANIFEST (V8.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL UPLINK DE BACKEND
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod wire;

pub use client::{OllamaBackend, OllamaBackendConfig};
pub use errors::AdapterError;
