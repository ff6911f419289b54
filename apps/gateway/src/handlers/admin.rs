// [apps/gateway/src/handlers/admin.rs]
/*!
 * =================================================================
 * APARATO: SILICON CENSUS HANDLER (V9.0 - COMMAND CENTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CENSO DE UNIDADES, SALUD Y BIOMETRÍA TÉRMICA
 * =================================================================
 */

use crate::state::AppState;
use axum::extract::{Json, State};
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use synapse_domain_models::{BackendDescriptor, ThermalState};
use synapse_domain_routing::ComputeBackend;
use tracing::instrument;

/// Censo completo de la superficie ListBackends.
#[derive(Debug, Serialize)]
pub struct SiliconCensusEnvelope {
    pub total_units: usize,
    pub backends: Vec<BackendDescriptor>,
}

pub struct SiliconCensusHandler;

impl SiliconCensusHandler {
    /**
     * Endpoint: GET /api/v1/backends
     * Descriptores de todas las unidades con su profundidad de cola.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_list_backends(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let silicon_units = application_state.registry.list();
        let backend_descriptors: Vec<BackendDescriptor> = silicon_units
            .iter()
            .map(|silicon_unit| {
                let pending_queue_depth = application_state
                    .queue_tracker
                    .raw_depth(silicon_unit.identifier());
                silicon_unit.describe(pending_queue_depth)
            })
            .collect();

        Json(SiliconCensusEnvelope {
            total_units: backend_descriptors.len(),
            backends: backend_descriptors,
        })
    }

    /**
     * Endpoint: GET /api/v1/backends/health
     * Sondeo de salud del pool completo: id -> bit de salud.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_health_check(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let health_census = application_state.registry.health_check_all();
        let healthy_count = health_census.values().filter(|is_healthy| **is_healthy).count();

        Json(json!({
            "total_units": health_census.len(),
            "healthy_units": healthy_count,
            "units": health_census,
        }))
    }

    /**
     * Endpoint: GET /api/v1/backends/thermal
     * Instantánea biométrica por etiqueta de clase de hardware.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_thermal_snapshot(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let thermal_census: HashMap<String, ThermalState> = application_state
            .thermal_monitor
            .snapshot_all()
            .into_iter()
            .map(|(hardware_class, thermal_state)| {
                (hardware_class.as_tag().to_string(), thermal_state)
            })
            .collect();

        Json(json!({
            "quiet_mode_active": application_state.thermal_monitor.should_prefer_quiet(),
            "states": thermal_census,
        }))
    }
}
