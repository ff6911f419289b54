// [apps/gateway/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY STATE HUB (V10.0 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: SINAPSIS COMPARTIDA ENTRE HANDLERS Y NÚCLEO
 *
 * # Logic:
 * Placa base donde se conectan el registro de silicio, la contabilidad
 * de colas, la biometría térmica, el scorer y el motor de reenvío. Los
 * singletons globales del diseño clásico se materializan aquí como
 * colaboradores explícitos inyectados en la construcción.
 * =================================================================
 */

use std::sync::Arc;
use synapse_domain_routing::{
    BackendRegistry, ForwardingEngine, InferenceRouter, QueueTracker, ThermalMonitor,
};

/// Contenedor de estado compartido (Thread-Safe) del Gateway.
#[derive(Clone)]
pub struct AppState {
    /// Registro propietario de unidades de silicio.
    pub registry: Arc<BackendRegistry>,
    /// Contabilidad de despachos en vuelo por (backend, prioridad).
    pub queue_tracker: Arc<QueueTracker>,
    /// Biometría térmica del pool de silicio.
    pub thermal_monitor: Arc<ThermalMonitor>,
    /// Scorer de selección directa.
    pub inference_router: Arc<InferenceRouter>,
    /// Motor de cascada de reenvío por confianza.
    pub forwarding_engine: Arc<ForwardingEngine>,
    /// El camino de generación usa la cascada por defecto.
    pub forwarding_enabled: bool,
}
