// [apps/gateway/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V14.0 - INFERENCE SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA HTTP DE LA SUPERFICIE RPC
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología expone:
 * 1. Inferencia (High Frequency): generate, generate/stream, embed.
 * 2. Censo de silicio: listado de unidades y sondeo de salud.
 * 3. Biometría: instantánea térmica para el operador.
 * =================================================================
 */

use crate::handlers::{admin, inference};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_sovereign_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el Dashboard de operaciones local
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO TÁCTICO: Operaciones de inferencia
    let inference_stratum = Router::new()
        .route("/generate", post(inference::InferenceHandler::handle_generate))
        .route("/generate/stream", post(inference::InferenceHandler::handle_generate_stream))
        .route("/embed", post(inference::InferenceHandler::handle_embed));

    // ESTRATO DE CENSO Y BIOMETRÍA (Command Center)
    let silicon_census_stratum = Router::new()
        .route("/", get(admin::SiliconCensusHandler::handle_list_backends))
        .route("/health", get(admin::SiliconCensusHandler::handle_health_check))
        .route("/thermal", get(admin::SiliconCensusHandler::handle_thermal_snapshot));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest("/api/v1", Router::new()
            .nest("/inference", inference_stratum)
            .nest("/backends", silicon_census_stratum)
        )
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
