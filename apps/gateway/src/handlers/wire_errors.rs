// [apps/gateway/src/handlers/wire_errors.rs]
/*!
 * =================================================================
 * APARATO: RPC ERROR MAPPER (V7.0 - SEMANTIC CODES)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TRADUCCIÓN DE LA TAXONOMÍA DE DOMINIO A HTTP
 *
 * # Logic:
 * Cada variante del dominio colapsa a un código estable de cable:
 * restricciones insatisfechas → 412 (con la lista de restricciones
 * remanentes), unidad ausente → 404, transporte → 500, cascada
 * agotada → 503 (con los resúmenes de intentos), cancelación → 499,
 * deadline → 504. El payload JSON transporta el detalle forense.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use synapse_domain_routing::RoutingError;

/// Código no estándar de "cliente cerró la petición" (estilo nginx).
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Traduce un fallo del dominio a su respuesta RPC estructurada.
#[must_use]
pub fn routing_error_response(routing_error: &RoutingError) -> (StatusCode, Json<serde_json::Value>) {
    match routing_error {
        RoutingError::NoBackendsMatch {
            total_registered,
            healthy_count,
            remaining_constraints,
        } => (
            StatusCode::PRECONDITION_FAILED,
            Json(json!({
                "error": "NO_BACKENDS_MATCH",
                "detail": routing_error.to_string(),
                "total_registered": total_registered,
                "healthy_count": healthy_count,
                "remaining_constraints": remaining_constraints,
            })),
        ),

        RoutingError::ModelUnsupported {
            model_name,
            attempted_substitution,
        } => (
            StatusCode::PRECONDITION_FAILED,
            Json(json!({
                "error": "MODEL_UNSUPPORTED",
                "detail": routing_error.to_string(),
                "model": model_name,
                "attempted_substitution": attempted_substitution,
            })),
        ),

        RoutingError::BackendNotFound { backend_identifier } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "BACKEND_NOT_FOUND",
                "detail": routing_error.to_string(),
                "backend_identifier": backend_identifier,
            })),
        ),

        RoutingError::BackendTransport { backend_identifier, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "BACKEND_TRANSPORT",
                "detail": routing_error.to_string(),
                "backend_identifier": backend_identifier,
            })),
        ),

        RoutingError::AllBackendsFailed { partial_result } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "ALL_BACKENDS_FAILED",
                "detail": routing_error.to_string(),
                "total_attempts": partial_result.total_attempts,
                "attempts": partial_result.attempt_summaries(),
                "reasoning_chain": partial_result.reasoning_chain,
            })),
        ),

        RoutingError::Cancelled => (
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST),
            Json(json!({
                "error": "DISPATCH_CANCELLED",
                "detail": routing_error.to_string(),
            })),
        ),

        RoutingError::DeadlineExceeded => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "error": "DEADLINE_EXCEEDED",
                "detail": routing_error.to_string(),
            })),
        ),

        RoutingError::RegisterConflict { backend_identifier } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "REGISTER_CONFLICT",
                "detail": routing_error.to_string(),
                "backend_identifier": backend_identifier,
            })),
        ),
    }
}
