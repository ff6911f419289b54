// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS MANIFEST (V9.0 - SILICON CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE CONTRATOS DE ENRUTAMIENTO
 * =================================================================
 */

pub mod annotations;
pub mod confidence;
pub mod decision;
pub mod media;
pub mod thermal;

pub use annotations::{RequestAnnotations, RequestPriority};
pub use confidence::ConfidenceScore;
pub use decision::{AttemptSummary, BackendDescriptor, CapabilityMatrix, RoutingDecision};
pub use media::{MediaType, RoutingHints};
pub use thermal::{HardwareClass, ThermalConfig, ThermalState};
