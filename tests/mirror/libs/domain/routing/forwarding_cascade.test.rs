// [tests/mirror/libs/domain/routing/forwarding_cascade.test.rs]
/**
 * =================================================================
 * APARATO: FORWARDING CASCADE CERTIFIER (V11.0 - CASCADE EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-ROUTING
 * RESPONSABILIDAD: VALIDACIÓN DE LA CASCADA DE ESCALADO POR CONFIANZA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SKIP INTERLEAVE: Saltos térmicos y de resolución intercalados
 *    como prefijo del camino de escalado (Escenario S2, Invariante 7).
 * 2. BEST ATTEMPT RESCUE: Tres confianzas bajas y rescate del mejor
 *    intento con forwarded=true (Escenario S4).
 * 3. RETRY CEILING: El tope de reintentos acota el rastro y queda
 *    registrado en la cadena de razonamiento (Escenario S5).
 * 4. DIAGNOSTIC SEAL: El agotamiento sin rescate retorna el resultado
 *    parcial dentro del error.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;
use synapse_domain_models::{
    CapabilityMatrix, ConfidenceScore, HardwareClass, RequestAnnotations, ThermalConfig,
};
use synapse_domain_routing::{
    BackendFault, BackendRegistry, ComputeBackend, ConfidenceEstimator, DispatchToken,
    EmbedRequest, EmbedResponse, ForwardingConfig, ForwardingEngine, GenerateRequest,
    GenerateResponse, QueueTracker, RoutingError, StreamChunk, ThermalMonitor, TokenStream,
};

/// Unidad de silicio guionizada para la cascada.
struct ScriptedUnit {
    unit_identifier: String,
    hardware: HardwareClass,
    healthy: bool,
    supports_requested_model: bool,
    transport_collapses: bool,
    scripted_response: String,
}

impl ScriptedUnit {
    fn healthy_unit(unit_identifier: &str, hardware: HardwareClass) -> Arc<Self> {
        Arc::new(Self {
            unit_identifier: unit_identifier.to_string(),
            hardware,
            healthy: true,
            supports_requested_model: true,
            transport_collapses: false,
            scripted_response: format!("response from {}", unit_identifier),
        })
    }

    fn unhealthy_unit(unit_identifier: &str, hardware: HardwareClass) -> Arc<Self> {
        Arc::new(Self {
            unit_identifier: unit_identifier.to_string(),
            hardware,
            healthy: false,
            supports_requested_model: true,
            transport_collapses: false,
            scripted_response: String::new(),
        })
    }

    fn collapsing_unit(unit_identifier: &str, hardware: HardwareClass) -> Arc<Self> {
        Arc::new(Self {
            unit_identifier: unit_identifier.to_string(),
            hardware,
            healthy: true,
            supports_requested_model: true,
            transport_collapses: true,
            scripted_response: String::new(),
        })
    }

    fn incompatible_unit(unit_identifier: &str, hardware: HardwareClass) -> Arc<Self> {
        Arc::new(Self {
            unit_identifier: unit_identifier.to_string(),
            hardware,
            healthy: true,
            supports_requested_model: false,
            transport_collapses: false,
            scripted_response: String::new(),
        })
    }
}

#[async_trait::async_trait]
impl ComputeBackend for ScriptedUnit {
    fn identifier(&self) -> &str {
        &self.unit_identifier
    }
    fn display_name(&self) -> &str {
        "Scripted Unit"
    }
    fn hardware_class(&self) -> HardwareClass {
        self.hardware
    }
    fn is_healthy(&self) -> bool {
        self.healthy
    }
    fn nominal_power_watts(&self) -> f32 {
        15.0
    }
    fn average_latency_milliseconds(&self) -> u64 {
        120
    }
    fn priority_rank(&self) -> i32 {
        25
    }
    fn max_model_size_gigabytes(&self) -> f32 {
        16.0
    }
    fn supports_model(&self, _model_name: &str) -> bool {
        self.supports_requested_model
    }
    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::text_generation()
    }

    async fn generate(
        &self,
        _dispatch_token: &DispatchToken,
        _request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendFault> {
        if self.transport_collapses {
            return Err(BackendFault::Transport("scripted collapse".to_string()));
        }
        Ok(GenerateResponse {
            response_text: self.scripted_response.clone(),
            stats: Default::default(),
        })
    }

    async fn generate_stream(
        &self,
        _dispatch_token: &DispatchToken,
        _request: &GenerateRequest,
    ) -> Result<TokenStream, BackendFault> {
        if self.transport_collapses {
            return Err(BackendFault::Transport("scripted stream collapse".to_string()));
        }
        let (chunk_sender, chunk_receiver) = tokio::sync::mpsc::channel(4);
        let scripted_response = self.scripted_response.clone();
        tokio::spawn(async move {
            let _ = chunk_sender
                .send(Ok(StreamChunk {
                    token_text: scripted_response,
                    is_final: true,
                    stats: None,
                }))
                .await;
        });
        Ok(TokenStream::from_receiver(chunk_receiver))
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

/// Estimador guionizado: veredicto fijo por identificador de unidad.
struct ScriptedEstimator {
    response_verdicts: HashMap<String, f32>,
    prospective_verdicts: HashMap<String, f32>,
}

impl ScriptedEstimator {
    fn with_verdicts(verdicts: &[(&str, f32)]) -> Arc<Self> {
        Arc::new(Self {
            response_verdicts: verdicts
                .iter()
                .map(|(unit, overall)| (unit.to_string(), *overall))
                .collect(),
            prospective_verdicts: verdicts
                .iter()
                .map(|(unit, overall)| (unit.to_string(), *overall))
                .collect(),
        })
    }
}

impl ConfidenceEstimator for ScriptedEstimator {
    fn estimate(
        &self,
        _prompt: &str,
        _response_text: &str,
        _model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore {
        let overall = self
            .response_verdicts
            .get(backend.identifier())
            .copied()
            .unwrap_or(0.0);
        ConfidenceScore::sealed(overall, Vec::new(), "scripted verdict")
    }

    fn estimate_for_prompt(
        &self,
        _prompt: &str,
        _model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore {
        let overall = self
            .prospective_verdicts
            .get(backend.identifier())
            .copied()
            .unwrap_or(0.0);
        ConfidenceScore::sealed(overall, Vec::new(), "scripted prospective verdict")
    }
}

/// Banco de pruebas de la cascada.
fn cascade_grounds(
    units: Vec<Arc<ScriptedUnit>>,
    estimator: Arc<ScriptedEstimator>,
    forwarding_config: ForwardingConfig,
) -> (ForwardingEngine, Arc<QueueTracker>) {
    let registry = Arc::new(BackendRegistry::new());
    for unit in units {
        registry.register(unit).expect("CRITICAL_FAULT: seed registration collapsed.");
    }
    let thermal_monitor = Arc::new(ThermalMonitor::with_config(ThermalConfig::default()));
    let queue_tracker = Arc::new(QueueTracker::new());
    let engine = ForwardingEngine::new(
        registry,
        thermal_monitor,
        Arc::clone(&queue_tracker),
        estimator,
        forwarding_config,
    );
    (engine, queue_tracker)
}

/**
 * CERTIFICACIÓN (Escenario S2): Salto térmico intercalado y reenvío.
 */
#[tokio::test]
async fn certify_thermal_skip_then_forward() {
    let estimator = ScriptedEstimator::with_verdicts(&[("igpu", 0.9)]);
    let (engine, _) = cascade_grounds(
        vec![
            ScriptedUnit::unhealthy_unit("npu", HardwareClass::Npu),
            ScriptedUnit::healthy_unit("igpu", HardwareClass::IntegratedGpu),
        ],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["npu".to_string(), "igpu".to_string()],
            respect_thermal_limits: true,
            ..Default::default()
        },
    );

    let cascade_result = engine
        .generate_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "qwen2.5:0.5b",
            &RequestAnnotations::default(),
        )
        .await
        .expect("CRITICAL_FAULT: cascade collapsed.");

    assert_eq!(cascade_result.attempts.len(), 2);
    assert_eq!(cascade_result.attempts[0].backend_identifier, "npu");
    assert_eq!(cascade_result.attempts[0].skip_reason.as_deref(), Some("thermal"));
    assert_eq!(cascade_result.attempts[1].backend_identifier, "igpu");
    assert!(cascade_result.attempts[1].succeeded);
    assert!(cascade_result.forwarded, "Selection past step zero must mark forwarded.");
    assert_eq!(cascade_result.final_backend_identifier.as_deref(), Some("igpu"));
}

/**
 * CERTIFICACIÓN (Escenario S4): Tres confianzas bajas y rescate del
 * mejor intento.
 */
#[tokio::test]
async fn certify_low_confidence_cascade_rescues_best_attempt() {
    let estimator = ScriptedEstimator::with_verdicts(&[
        ("npu", 0.60),
        ("igpu", 0.70),
        ("nvidia", 0.80),
    ]);
    let (engine, _) = cascade_grounds(
        vec![
            ScriptedUnit::healthy_unit("npu", HardwareClass::Npu),
            ScriptedUnit::healthy_unit("igpu", HardwareClass::IntegratedGpu),
            ScriptedUnit::healthy_unit("nvidia", HardwareClass::Nvidia),
        ],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["npu".to_string(), "igpu".to_string(), "nvidia".to_string()],
            minimum_confidence: 0.95,
            max_retries: 3,
            return_best_attempt: true,
            ..Default::default()
        },
    );

    let cascade_result = engine
        .generate_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "llama3:8b",
            &RequestAnnotations::default(),
        )
        .await
        .expect("CRITICAL_FAULT: best-attempt rescue collapsed.");

    assert_eq!(cascade_result.attempts.len(), 3);
    assert_eq!(cascade_result.total_attempts, 3);
    assert_eq!(cascade_result.final_backend_identifier.as_deref(), Some("nvidia"));
    assert!(cascade_result.forwarded);

    let final_confidence = cascade_result
        .final_confidence
        .as_ref()
        .expect("CRITICAL_FAULT: final confidence void.");
    assert!((final_confidence.overall - 0.80).abs() < 1e-6);

    let low_confidence_lines = cascade_result
        .reasoning_chain
        .iter()
        .filter(|line| line.contains("Confidence too low"))
        .count();
    assert_eq!(low_confidence_lines, 3, "Three low-confidence entries expected.");

    let best_attempt_lines = cascade_result
        .reasoning_chain
        .iter()
        .filter(|line| line.contains("Best attempt"))
        .count();
    assert_eq!(best_attempt_lines, 1, "One best-attempt entry expected.");
}

/**
 * CERTIFICACIÓN (Escenario S5): El tope de reintentos acota el rastro.
 */
#[tokio::test]
async fn certify_max_retries_enforced() {
    let estimator = ScriptedEstimator::with_verdicts(&[
        ("u1", 0.1),
        ("u2", 0.2),
        ("u3", 0.3),
        ("u4", 0.4),
        ("u5", 0.5),
    ]);
    let escalation_path: Vec<String> =
        ["u1", "u2", "u3", "u4", "u5"].iter().map(|unit| unit.to_string()).collect();

    let (engine, _) = cascade_grounds(
        vec![
            ScriptedUnit::healthy_unit("u1", HardwareClass::Npu),
            ScriptedUnit::healthy_unit("u2", HardwareClass::IntegratedGpu),
            ScriptedUnit::healthy_unit("u3", HardwareClass::DiscreteGpu),
            ScriptedUnit::healthy_unit("u4", HardwareClass::Nvidia),
            ScriptedUnit::healthy_unit("u5", HardwareClass::Cpu),
        ],
        estimator,
        ForwardingConfig {
            escalation_path,
            minimum_confidence: 0.95,
            max_retries: 2,
            return_best_attempt: true,
            ..Default::default()
        },
    );

    let cascade_result = engine
        .generate_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "llama3:8b",
            &RequestAnnotations::default(),
        )
        .await
        .expect("CRITICAL_FAULT: bounded cascade collapsed.");

    assert!(cascade_result.attempts.len() <= 2, "Trail must respect the retry ceiling.");
    assert!(cascade_result
        .reasoning_chain
        .iter()
        .any(|line| line.contains("Max retries (2) reached")));
}

/**
 * CERTIFICACIÓN: Agotamiento sin rescate retorna el parcial en el error.
 */
#[tokio::test]
async fn certify_exhaustion_carries_partial_result() {
    let estimator = ScriptedEstimator::with_verdicts(&[]);
    let (engine, _) = cascade_grounds(
        vec![
            ScriptedUnit::collapsing_unit("npu", HardwareClass::Npu),
            ScriptedUnit::collapsing_unit("igpu", HardwareClass::IntegratedGpu),
        ],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["npu".to_string(), "igpu".to_string()],
            return_best_attempt: true,
            ..Default::default()
        },
    );

    let cascade_outcome = engine
        .generate_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "llama3:8b",
            &RequestAnnotations::default(),
        )
        .await;

    match cascade_outcome {
        Err(RoutingError::AllBackendsFailed { partial_result }) => {
            assert_eq!(partial_result.attempts.len(), 2);
            assert_eq!(partial_result.total_attempts, 2);
            assert!(partial_result.attempts.iter().all(|attempt| !attempt.succeeded));
            assert!(partial_result.attempts[0].error_detail.is_some());
        }
        other => panic!(
            "INTEGRITY_COLLAPSE: expected AllBackendsFailed, got {:?}",
            other.map(|result| result.final_backend_identifier)
        ),
    }
}

/**
 * CERTIFICACIÓN: Saltos por resolución y por modelo no soportado.
 */
#[tokio::test]
async fn certify_resolution_and_model_skips() {
    let estimator = ScriptedEstimator::with_verdicts(&[("cpu", 0.9)]);
    let (engine, _) = cascade_grounds(
        vec![
            ScriptedUnit::incompatible_unit("igpu", HardwareClass::IntegratedGpu),
            ScriptedUnit::healthy_unit("cpu", HardwareClass::Cpu),
        ],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["ghost".to_string(), "igpu".to_string(), "cpu".to_string()],
            ..Default::default()
        },
    );

    let cascade_result = engine
        .generate_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "llama3:8b",
            &RequestAnnotations::default(),
        )
        .await
        .expect("CRITICAL_FAULT: skip cascade collapsed.");

    assert_eq!(cascade_result.attempts.len(), 3);
    assert_eq!(cascade_result.attempts[0].skip_reason.as_deref(), Some("not found in registry"));
    assert_eq!(cascade_result.attempts[1].skip_reason.as_deref(), Some("model unsupported"));
    assert!(cascade_result.attempts[2].succeeded);
    assert_eq!(cascade_result.total_attempts, 1, "Skips must not count as dispatches.");
}

/**
 * CERTIFICACIÓN: La cancelación es terminal y jamás se reintenta.
 */
#[tokio::test]
async fn certify_cancellation_is_terminal() {
    let estimator = ScriptedEstimator::with_verdicts(&[("cpu", 0.9)]);
    let (engine, queue_tracker) = cascade_grounds(
        vec![ScriptedUnit::healthy_unit("cpu", HardwareClass::Cpu)],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["cpu".to_string()],
            ..Default::default()
        },
    );

    let revoked_token = DispatchToken::with_default_deadline();
    revoked_token.revoke();

    let revoked_outcome = engine
        .generate_with_forwarding(&revoked_token, "hola", "llama3:8b", &RequestAnnotations::default())
        .await;
    assert!(matches!(revoked_outcome, Err(RoutingError::Cancelled)));
    assert_eq!(queue_tracker.raw_depth("cpu"), 0, "No slot may leak on cancellation.");

    let expired_token = DispatchToken::with_deadline(std::time::Duration::ZERO);
    let expired_outcome = engine
        .generate_with_forwarding(&expired_token, "hola", "llama3:8b", &RequestAnnotations::default())
        .await;
    assert!(matches!(expired_outcome, Err(RoutingError::DeadlineExceeded)));
}

/**
 * CERTIFICACIÓN: Selección streaming comprometida por adelantado; el
 * cierre del stream libera el slot de cola.
 */
#[tokio::test]
async fn certify_streaming_upfront_selection() {
    let estimator = ScriptedEstimator::with_verdicts(&[("npu", 0.5), ("igpu", 0.9)]);
    let (engine, queue_tracker) = cascade_grounds(
        vec![
            ScriptedUnit::healthy_unit("npu", HardwareClass::Npu),
            ScriptedUnit::healthy_unit("igpu", HardwareClass::IntegratedGpu),
        ],
        estimator,
        ForwardingConfig {
            escalation_path: vec!["npu".to_string(), "igpu".to_string()],
            minimum_confidence: 0.7,
            ..Default::default()
        },
    );

    let (mut token_stream, committed_unit) = engine
        .generate_stream_with_forwarding(
            &DispatchToken::with_default_deadline(),
            "hola",
            "llama3:8b",
            &RequestAnnotations::default(),
        )
        .await
        .expect("CRITICAL_FAULT: upfront streaming selection collapsed.");

    assert_eq!(
        committed_unit.identifier(),
        "igpu",
        "Prospective verdict must skip the low-confidence unit."
    );
    assert_eq!(queue_tracker.raw_depth("igpu"), 1, "Mid-stream depth must be one.");

    let first_chunk = token_stream.recv().await;
    assert!(first_chunk.is_some());

    token_stream.close();
    assert_eq!(queue_tracker.raw_depth("igpu"), 0, "Close must release the slot.");

    token_stream.close();
    assert_eq!(queue_tracker.raw_depth("igpu"), 0, "Second close must be a no-op.");
}

/**
 * CERTIFICACIÓN: Derivación del camino de escalado por defecto.
 */
#[test]
fn certify_default_escalation_path_derivation() {
    let small_model_path = ForwardingEngine::default_escalation_path("Qwen2.5:0.5B");
    assert_eq!(small_model_path, vec!["npu", "igpu", "nvidia", "cpu"]);

    let large_model_path = ForwardingEngine::default_escalation_path("llama3:70b");
    assert_eq!(large_model_path, vec!["igpu", "nvidia", "cpu"]);
}
