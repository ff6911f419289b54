// [tests/mirror/libs/domain/routing/router_selection.test.rs]
/**
 * =================================================================
 * APARATO: ROUTER SELECTION CERTIFIER (V9.0 - PIPELINE EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-ROUTING
 * RESPONSABILIDAD: VALIDACIÓN DEL PIPELINE DE FILTRADO Y SCORING
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT HONOUR: El objetivo explícito sano salta el scoring.
 * 2. SUBSTITUTION SEAL: El modelo preferido del detector rescata a un
 *    modelo huérfano y el veredicto registra la sustitución.
 * 3. DOMINANCE AXIOMS: Menor potencia gana bajo preferencia de
 *    potencia; menor latencia gana bajo criticidad de latencia.
 * 4. GATE EXCLUSION: Silicio vetado térmicamente jamás aparece en un
 *    veredicto.
 * =================================================================
 */

use chrono::Utc;
use std::sync::Arc;
use synapse_domain_models::{
    CapabilityMatrix, HardwareClass, RequestAnnotations, RoutingHints, ThermalConfig, ThermalState,
};
use synapse_domain_routing::{
    BackendFault, BackendRegistry, ComputeBackend, DispatchToken, EmbedRequest, EmbedResponse,
    GenerateRequest, GenerateResponse, InferenceRouter, QueueTracker, RouterConfig, RoutingError,
    ThermalMonitor, TokenStream,
};

/// Unidad de silicio configurable para el Proving Grounds.
struct ConfigurableUnit {
    unit_identifier: String,
    hardware: HardwareClass,
    healthy: bool,
    power_watts: f32,
    latency_milliseconds: u64,
    rank: i32,
    supported_models: Vec<String>,
}

impl ConfigurableUnit {
    #[allow(clippy::too_many_arguments)]
    fn seeded(
        unit_identifier: &str,
        hardware: HardwareClass,
        healthy: bool,
        power_watts: f32,
        latency_milliseconds: u64,
        rank: i32,
        supported_models: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            unit_identifier: unit_identifier.to_string(),
            hardware,
            healthy,
            power_watts,
            latency_milliseconds,
            rank,
            supported_models: supported_models.iter().map(|model| model.to_string()).collect(),
        })
    }
}

#[async_trait::async_trait]
impl ComputeBackend for ConfigurableUnit {
    fn identifier(&self) -> &str {
        &self.unit_identifier
    }
    fn display_name(&self) -> &str {
        "Configurable Unit"
    }
    fn hardware_class(&self) -> HardwareClass {
        self.hardware
    }
    fn is_healthy(&self) -> bool {
        self.healthy
    }
    fn nominal_power_watts(&self) -> f32 {
        self.power_watts
    }
    fn average_latency_milliseconds(&self) -> u64 {
        self.latency_milliseconds
    }
    fn priority_rank(&self) -> i32 {
        self.rank
    }
    fn max_model_size_gigabytes(&self) -> f32 {
        16.0
    }
    fn supports_model(&self, model_name: &str) -> bool {
        self.supported_models.iter().any(|supported| {
            supported == "*" || supported.eq_ignore_ascii_case(model_name)
        })
    }
    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::text_generation()
    }

    async fn generate(
        &self,
        _dispatch_token: &DispatchToken,
        _request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendFault> {
        Ok(GenerateResponse::default())
    }

    async fn generate_stream(
        &self,
        _dispatch_token: &DispatchToken,
        _request: &GenerateRequest,
    ) -> Result<TokenStream, BackendFault> {
        Err(BackendFault::OperationUnsupported("generate_stream"))
    }

    async fn embed(
        &self,
        _dispatch_token: &DispatchToken,
        _request: &EmbedRequest,
    ) -> Result<EmbedResponse, BackendFault> {
        Ok(EmbedResponse::default())
    }

    async fn shutdown(&self) {}
}

/// Banco de pruebas: registro + monitor + colas + scorer.
fn proving_grounds(units: Vec<Arc<ConfigurableUnit>>) -> (InferenceRouter, Arc<ThermalMonitor>, Arc<QueueTracker>) {
    let registry = Arc::new(BackendRegistry::new());
    for unit in units {
        registry.register(unit).expect("CRITICAL_FAULT: seed registration collapsed.");
    }
    let thermal_monitor = Arc::new(ThermalMonitor::with_config(ThermalConfig::default()));
    let queue_tracker = Arc::new(QueueTracker::new());
    let router = InferenceRouter::new(
        Arc::clone(&registry),
        Arc::clone(&thermal_monitor),
        Arc::clone(&queue_tracker),
        RouterConfig::default(),
    );
    (router, thermal_monitor, queue_tracker)
}

fn hot_state(hardware: HardwareClass, temperature_celsius: f32) -> ThermalState {
    ThermalState {
        hardware,
        temperature_celsius,
        fan_speed_percent: 0.0,
        power_draw_watts: 0.0,
        utilization_percent: 0.0,
        is_throttling: false,
        last_update_timestamp: Utc::now(),
    }
}

/**
 * CERTIFICACIÓN (Escenario S1): El objetivo explícito sano se honra.
 */
#[test]
fn certify_explicit_target_honoured() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("npu", HardwareClass::Npu, true, 8.0, 150, 40, &["*"]),
        ConfigurableUnit::seeded("igpu", HardwareClass::IntegratedGpu, true, 18.0, 250, 30, &["*"]),
    ]);

    let annotations = RequestAnnotations {
        target_backend: "igpu".to_string(),
        ..Default::default()
    };

    let selection = router
        .select_backend("llama3:8b", &annotations, &RoutingHints::default())
        .expect("CRITICAL_FAULT: explicit selection collapsed.");

    assert_eq!(selection.decision.backend_identifier, "igpu");
    assert!(selection.decision.selection_reason.contains("Explicit target"));
    assert_eq!(selection.decision.alternative_backend_identifiers, vec!["npu".to_string()]);
}

/**
 * CERTIFICACIÓN (Escenario S3): Compatibilidad directa y sustitución.
 */
#[test]
fn certify_model_substitution_pipeline() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("npu", HardwareClass::Npu, true, 8.0, 150, 40, &["qwen2.5:0.5b"]),
        ConfigurableUnit::seeded("igpu", HardwareClass::IntegratedGpu, true, 18.0, 250, 30, &["llama3:7b"]),
    ]);

    // Caso A: el modelo pedido casa directamente; sin sustitución.
    let direct_selection = router
        .select_backend("llama3:7b", &RequestAnnotations::default(), &RoutingHints::default())
        .expect("CRITICAL_FAULT: direct selection collapsed.");
    assert_eq!(direct_selection.decision.backend_identifier, "igpu");
    assert!(!direct_selection.decision.model_substituted);
    assert_eq!(direct_selection.effective_model, "llama3:7b");

    // Caso B: modelo huérfano rescatado por el preferido del detector.
    let mut hints_with_substitute = RoutingHints::default();
    hints_with_substitute.preferred_model = "llama3:7b".to_string();

    let substituted_selection = router
        .select_backend("gpt-4", &RequestAnnotations::default(), &hints_with_substitute)
        .expect("CRITICAL_FAULT: substitution selection collapsed.");
    assert_eq!(substituted_selection.decision.backend_identifier, "igpu");
    assert!(substituted_selection.decision.model_substituted);
    assert!(substituted_selection
        .decision
        .substitution_reason
        .as_deref()
        .unwrap_or_default()
        .contains("gpt-4"));
    assert_eq!(substituted_selection.effective_model, "llama3:7b");

    // Caso C: huérfano sin rescate posible → error estructurado.
    let orphan_outcome =
        router.select_backend("gpt-4", &RequestAnnotations::default(), &RoutingHints::default());
    assert!(matches!(
        orphan_outcome,
        Err(RoutingError::ModelUnsupported { .. })
    ));
}

/**
 * CERTIFICACIÓN (Axioma de dominancia): menor potencia gana bajo
 * preferencia de eficiencia energética.
 */
#[test]
fn certify_lower_power_wins_under_power_preference() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("frugal", HardwareClass::Npu, true, 10.0, 300, 20, &["*"]),
        ConfigurableUnit::seeded("hungry", HardwareClass::Nvidia, true, 20.0, 300, 20, &["*"]),
    ]);

    let annotations = RequestAnnotations {
        prefer_low_power: true,
        ..Default::default()
    };

    let selection = router
        .select_backend("llama3:8b", &annotations, &RoutingHints::default())
        .expect("CRITICAL_FAULT: power-preference selection collapsed.");
    assert_eq!(selection.decision.backend_identifier, "frugal");
}

/**
 * CERTIFICACIÓN (Axioma de dominancia): menor latencia gana bajo
 * criticidad de latencia.
 */
#[test]
fn certify_lower_latency_wins_under_latency_criticality() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("sluggish", HardwareClass::Cpu, true, 15.0, 900, 20, &["*"]),
        ConfigurableUnit::seeded("swift", HardwareClass::Nvidia, true, 15.0, 90, 20, &["*"]),
    ]);

    let annotations = RequestAnnotations {
        latency_critical: true,
        ..Default::default()
    };

    let selection = router
        .select_backend("llama3:8b", &annotations, &RoutingHints::default())
        .expect("CRITICAL_FAULT: latency-critical selection collapsed.");
    assert_eq!(selection.decision.backend_identifier, "swift");
}

/**
 * CERTIFICACIÓN (Exclusión por gating): silicio vetado térmicamente
 * jamás aparece en un veredicto.
 */
#[test]
fn certify_thermal_gate_excludes_silicon() {
    let (router, thermal_monitor, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("npu", HardwareClass::Npu, true, 8.0, 150, 40, &["*"]),
        ConfigurableUnit::seeded("cpu", HardwareClass::Cpu, true, 45.0, 900, 10, &["*"]),
    ]);

    // La NPU entra en temperatura crítica.
    thermal_monitor.publish_state(hot_state(HardwareClass::Npu, 88.0));

    let selection = router
        .select_backend("llama3:8b", &RequestAnnotations::default(), &RoutingHints::default())
        .expect("CRITICAL_FAULT: gated selection collapsed.");
    assert_eq!(selection.decision.backend_identifier, "cpu", "Gated unit must never win.");

    // Con el único candidato vetado, el conjunto queda vacío.
    thermal_monitor.publish_state(hot_state(HardwareClass::Cpu, 90.0));
    let gated_outcome =
        router.select_backend("llama3:8b", &RequestAnnotations::default(), &RoutingHints::default());
    match gated_outcome {
        Err(RoutingError::NoBackendsMatch { remaining_constraints, .. }) => {
            assert!(remaining_constraints.contains(&"thermal admission".to_string()));
        }
        other => panic!("INTEGRITY_COLLAPSE: expected NoBackendsMatch, got {:?}", other.map(|s| s.decision)),
    }
}

/**
 * CERTIFICACIÓN: Las restricciones duras filtran y viajan en el error.
 */
#[test]
fn certify_hard_constraints_filter() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("cpu", HardwareClass::Cpu, true, 45.0, 900, 10, &["*"]),
    ]);

    let annotations = RequestAnnotations {
        max_latency_milliseconds: 100,
        ..Default::default()
    };

    let constrained_outcome =
        router.select_backend("llama3:8b", &annotations, &RoutingHints::default());
    match constrained_outcome {
        Err(RoutingError::NoBackendsMatch { remaining_constraints, healthy_count, total_registered }) => {
            assert_eq!(total_registered, 1);
            assert_eq!(healthy_count, 1);
            assert!(remaining_constraints
                .iter()
                .any(|constraint| constraint.contains("max_latency_milliseconds")));
        }
        other => panic!("INTEGRITY_COLLAPSE: expected NoBackendsMatch, got {:?}", other.map(|s| s.decision)),
    }
}

/**
 * CERTIFICACIÓN: La presión de cola desplaza el veredicto hacia la
 * unidad ociosa entre gemelas.
 */
#[test]
fn certify_queue_pressure_shifts_verdict() {
    let (router, _, queue_tracker) = proving_grounds(vec![
        ConfigurableUnit::seeded("busy", HardwareClass::IntegratedGpu, true, 18.0, 250, 30, &["*"]),
        ConfigurableUnit::seeded("idle", HardwareClass::DiscreteGpu, true, 18.0, 250, 30, &["*"]),
    ]);

    for _ in 0..5 {
        queue_tracker.mark_start("busy", synapse_domain_models::RequestPriority::Normal);
    }

    let selection = router
        .select_backend("llama3:8b", &RequestAnnotations::default(), &RoutingHints::default())
        .expect("CRITICAL_FAULT: queue-pressure selection collapsed.");
    assert_eq!(selection.decision.backend_identifier, "idle");
}

/**
 * CERTIFICACIÓN: Un objetivo explícito enfermo colapsa al scoring.
 */
#[test]
fn certify_unhealthy_explicit_target_falls_back() {
    let (router, _, _) = proving_grounds(vec![
        ConfigurableUnit::seeded("npu", HardwareClass::Npu, false, 8.0, 150, 40, &["*"]),
        ConfigurableUnit::seeded("cpu", HardwareClass::Cpu, true, 45.0, 900, 10, &["*"]),
    ]);

    let annotations = RequestAnnotations {
        target_backend: "npu".to_string(),
        ..Default::default()
    };

    let selection = router
        .select_backend("llama3:8b", &annotations, &RoutingHints::default())
        .expect("CRITICAL_FAULT: fallback selection collapsed.");
    assert_eq!(selection.decision.backend_identifier, "cpu");
    assert!(selection
        .decision
        .reasoning_chain
        .iter()
        .any(|line| line.contains("unhealthy")));
}
