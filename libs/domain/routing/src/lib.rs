// [libs/domain/routing/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ROUTING CORE MANIFEST (V22.0 - CASCADE SEALED)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DEL NÚCLEO DE ENRUTAMIENTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * Topología interna del núcleo (hojas primero):
 * 1. contract  — Contrato de capacidad de backends y objeto de stream.
 * 2. token     — Señal de cancelación con deadline soberano.
 * 3. registry  — Registro propietario de unidades de silicio.
 * 4. queue     — Contadores en vuelo por (backend, prioridad) + wrapper.
 * 5. thermal   — Monitor biométrico, gating y penalización.
 * 6. workload  — Detector puro de modalidad y pistas de ruta.
 * 7. router    — Filtrado por restricciones y scoring ponderado.
 * 8. confidence— Estimador determinista de confianza.
 * 9. forwarding— Cascada de escalado entre backends.
 * =================================================================
 */

pub mod confidence;
pub mod contract;
pub mod errors;
pub mod forwarding;
pub mod queue_tracker;
pub mod registry;
pub mod router;
pub mod thermal_monitor;
pub mod token;
pub mod workload;

pub use confidence::{ConfidenceEstimator, HeuristicConfidenceEstimator};
pub use contract::{
    BackendFault, ComputeBackend, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse,
    GenerationStats, StreamChunk, TokenStream,
};
pub use errors::RoutingError;
pub use forwarding::{ForwardingAttempt, ForwardingConfig, ForwardingEngine, ForwardingResult};
pub use queue_tracker::{QueueSlotGuard, QueueTracker, TrackedBackend};
pub use registry::BackendRegistry;
pub use router::{InferenceRouter, RankedSelection, RouterConfig};
pub use thermal_monitor::{ThermalMonitor, ThermalProbe};
pub use token::DispatchToken;
pub use workload::WorkloadDetector;
