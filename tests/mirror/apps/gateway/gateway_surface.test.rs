// [tests/mirror/apps/gateway/gateway_surface.test.rs]
/**
 * =================================================================
 * APARATO: GATEWAY SURFACE CERTIFIER (V8.0 - RPC EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-APP
 * RESPONSABILIDAD: MAPEO DE CÓDIGOS RPC Y TOPOLOGÍA HTTP
 * =================================================================
 */

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use synapse_domain_models::ThermalConfig;
use synapse_domain_routing::{
    BackendRegistry, ForwardingConfig, ForwardingEngine, ForwardingResult,
    HeuristicConfidenceEstimator, InferenceRouter, QueueTracker, RouterConfig, RoutingError,
    ThermalMonitor,
};
use synapse_gateway::handlers::wire_errors::routing_error_response;
use synapse_gateway::routes::create_sovereign_router;
use synapse_gateway::state::AppState;
use tower::util::ServiceExt;

/// Estado de aplicación mínimo con registro vacío.
fn void_application_state() -> AppState {
    let registry = Arc::new(BackendRegistry::new());
    let thermal_monitor = Arc::new(ThermalMonitor::with_config(ThermalConfig::default()));
    let queue_tracker = Arc::new(QueueTracker::new());

    let inference_router = Arc::new(InferenceRouter::new(
        Arc::clone(&registry),
        Arc::clone(&thermal_monitor),
        Arc::clone(&queue_tracker),
        RouterConfig::default(),
    ));
    let forwarding_engine = Arc::new(ForwardingEngine::new(
        Arc::clone(&registry),
        Arc::clone(&thermal_monitor),
        Arc::clone(&queue_tracker),
        Arc::new(HeuristicConfidenceEstimator),
        ForwardingConfig::default(),
    ));

    AppState {
        registry,
        queue_tracker,
        thermal_monitor,
        inference_router,
        forwarding_engine,
        forwarding_enabled: true,
    }
}

/**
 * CERTIFICACIÓN: Mapeo bit-perfecto de la taxonomía a códigos RPC.
 */
#[test]
fn certify_error_code_mapping() {
    let precondition_fault = RoutingError::NoBackendsMatch {
        total_registered: 4,
        healthy_count: 2,
        remaining_constraints: vec!["max_power_watts <= 30".to_string()],
    };
    let (status, _) = routing_error_response(&precondition_fault);
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let model_fault = RoutingError::ModelUnsupported {
        model_name: "gpt-4".to_string(),
        attempted_substitution: Some("llama3:7b".to_string()),
    };
    let (status, _) = routing_error_response(&model_fault);
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let missing_fault = RoutingError::BackendNotFound {
        backend_identifier: "ghost".to_string(),
    };
    let (status, _) = routing_error_response(&missing_fault);
    assert_eq!(status, StatusCode::NOT_FOUND);

    let transport_fault = RoutingError::BackendTransport {
        backend_identifier: "igpu".to_string(),
        cause: "connection refused".to_string(),
    };
    let (status, _) = routing_error_response(&transport_fault);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let exhaustion_fault = RoutingError::AllBackendsFailed {
        partial_result: Box::new(ForwardingResult::default()),
    };
    let (status, payload) = routing_error_response(&exhaustion_fault);
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(payload.0.get("attempts").is_some(), "Exhaustion payload carries attempt summaries.");

    let (status, _) = routing_error_response(&RoutingError::Cancelled);
    assert_eq!(status.as_u16(), 499, "Cancellation maps to client-closed-request.");

    let (status, _) = routing_error_response(&RoutingError::DeadlineExceeded);
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

    let conflict_fault = RoutingError::RegisterConflict {
        backend_identifier: "npu".to_string(),
    };
    let (status, _) = routing_error_response(&conflict_fault);
    assert_eq!(status, StatusCode::CONFLICT);
}

/**
 * CERTIFICACIÓN: La topología HTTP responde en sus rutas nominales.
 */
#[tokio::test]
async fn certify_http_topology_surface() {
    let sovereign_router = create_sovereign_router(void_application_state());

    // Latido raíz.
    let health_response = sovereign_router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("CRITICAL_FAULT: health route collapsed.");
    assert_eq!(health_response.status(), StatusCode::OK);

    // Censo de silicio sobre registro vacío.
    let census_response = sovereign_router
        .clone()
        .oneshot(Request::builder().uri("/api/v1/backends").body(Body::empty()).expect("request"))
        .await
        .expect("CRITICAL_FAULT: census route collapsed.");
    assert_eq!(census_response.status(), StatusCode::OK);

    let census_bytes = axum::body::to_bytes(census_response.into_body(), 1_048_576)
        .await
        .expect("CRITICAL_FAULT: census body collapsed.");
    let census_json: serde_json::Value =
        serde_json::from_slice(&census_bytes).expect("CRITICAL_FAULT: census JSON drift.");
    assert_eq!(census_json["total_units"], 0);

    // Sondeo de salud del pool.
    let pool_health_response = sovereign_router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/backends/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("CRITICAL_FAULT: pool health route collapsed.");
    assert_eq!(pool_health_response.status(), StatusCode::OK);

    // Generación contra un pool vacío: agotamiento 503 con payload.
    let generate_request = Request::builder()
        .method("POST")
        .uri("/api/v1/inference/generate")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"prompt": "hola", "model": "llama3:8b"}"#,
        ))
        .expect("request");
    let generate_response = sovereign_router
        .clone()
        .oneshot(generate_request)
        .await
        .expect("CRITICAL_FAULT: generate route collapsed.");
    assert_eq!(generate_response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
