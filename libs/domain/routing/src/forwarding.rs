// [libs/domain/routing/src/forwarding.rs]
/*!
 * =================================================================
 * APARATO: CONFIDENCE FORWARDING ENGINE (V27.0 - CASCADE MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CASCADA DE ESCALADO ENTRE BACKENDS POR CONFIANZA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RECOVERABLE FAULTS: unidad ausente, gating térmico, modelo no
 *    soportado, colapso de transporte y confianza baja continúan la
 *    iteración; la cancelación JAMÁS se reintenta.
 * 2. DIAGNOSTIC SEAL: El agotamiento total retorna error, pero el
 *    resultado parcial con todos los intentos viaja dentro del payload.
 * 3. UPFRONT STREAMING: El cambio de backend a mitad de stream es
 *    inseguro; el modo streaming compromete la selección por adelantado
 *    con una estimativa prospectiva (prompt + modelo, sin respuesta).
 * 4. SNAPSHOT DISCIPLINE: La configuración se clona bajo lock exclusivo
 *    antes del bucle; ningún lock sobrevive hasta una llamada de red.
 *
 * # Logic (Iteration State Machine):
 * Para cada paso i < max_retries del camino de escalado: resolver por
 * id (ausencia = salto), verificar salud/térmica (salto), verificar
 * soporte de modelo (salto), despachar vía wrapper de cola, estimar
 * confianza, rastrear el mejor intento; umbral alcanzado = selección
 * con forwarded = (i > 0).
 * =================================================================
 */

use crate::confidence::ConfidenceEstimator;
use crate::contract::{ComputeBackend, GenerateRequest, TokenStream};
use crate::errors::RoutingError;
use crate::queue_tracker::{QueueTracker, TrackedBackend};
use crate::registry::BackendRegistry;
use crate::thermal_monitor::ThermalMonitor;
use crate::token::DispatchToken;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use synapse_domain_models::{AttemptSummary, ConfidenceScore, RequestAnnotations};
use tracing::{info, instrument, warn};

/// Marcadores nominales de modelos de gama pequeña: su presencia
/// antepone la unidad NPU al camino de escalado por defecto.
const SMALL_MODEL_MARKERS: [&str; 4] = ["0.5b", "1.5b", "tiny", "mini"];

/// Identificadores convencionales del camino de escalado por defecto.
const DEFAULT_NPU_IDENTIFIER: &str = "npu";
const DEFAULT_IGPU_IDENTIFIER: &str = "igpu";
const DEFAULT_NVIDIA_IDENTIFIER: &str = "nvidia";
const DEFAULT_CPU_IDENTIFIER: &str = "cpu";

/// Configuración del motor, inmutable salvo por los setters exclusivos.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Camino de escalado configurado. Vacío = derivar del modelo.
    pub escalation_path: Vec<String>,
    /// Umbral de confianza que sella una selección.
    pub minimum_confidence: f32,
    /// Tope de pasos de la cascada (saltos incluidos).
    pub max_retries: usize,
    /// Honrar el gating térmico/salud durante la iteración.
    pub respect_thermal_limits: bool,
    /// Rescatar el mejor intento cuando nadie alcanza el umbral.
    pub return_best_attempt: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            escalation_path: Vec::new(),
            minimum_confidence: 0.7,
            max_retries: 3,
            respect_thermal_limits: true,
            return_best_attempt: true,
        }
    }
}

/// Registro de un paso individual de la cascada (despacho o salto).
#[derive(Debug, Clone, Serialize)]
pub struct ForwardingAttempt {
    /// Unidad contra la que se intentó (o se saltó) el paso.
    pub backend_identifier: String,
    /// Texto producido, cuando el despacho tuvo éxito.
    pub response_text: Option<String>,
    /// Veredicto de confianza de la respuesta producida.
    pub confidence: Option<ConfidenceScore>,
    /// Latencia observada del despacho en milisegundos.
    pub latency_milliseconds: u64,
    /// El despacho produjo una respuesta transportable.
    pub succeeded: bool,
    /// Detalle del colapso de transporte, cuando lo hubo.
    pub error_detail: Option<String>,
    /// Razón del salto cuando la unidad no llegó a despacharse.
    pub skip_reason: Option<String>,
}

impl ForwardingAttempt {
    /// Registro de salto: la unidad jamás fue despachada.
    fn skipped(backend_identifier: &str, skip_reason: impl Into<String>) -> Self {
        Self {
            backend_identifier: backend_identifier.to_string(),
            response_text: None,
            confidence: None,
            latency_milliseconds: 0,
            succeeded: false,
            error_detail: None,
            skip_reason: Some(skip_reason.into()),
        }
    }

    /// Resumen de cable para payloads de error y diagnóstico.
    #[must_use]
    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            backend_identifier: self.backend_identifier.clone(),
            succeeded: self.succeeded,
            confidence_overall: self.confidence.as_ref().map(|score| score.overall),
            latency_milliseconds: self.latency_milliseconds,
            skip_reason: self.skip_reason.clone(),
            error_detail: self.error_detail.clone(),
        }
    }
}

/// Resultado agregado de una cascada de reenvío.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ForwardingResult {
    /// Rastro completo de pasos (saltos intercalados), prefijo del
    /// camino de escalado configurado.
    pub attempts: Vec<ForwardingAttempt>,
    /// Cantidad de despachos reales (los saltos no cuentan).
    pub total_attempts: u64,
    /// Más de una unidad participó en la resolución final.
    pub forwarded: bool,
    /// Latencia total de la cascada en milisegundos.
    pub total_latency_milliseconds: u64,
    /// Texto de la respuesta finalmente seleccionada.
    pub final_response_text: Option<String>,
    /// Unidad cuya respuesta fue seleccionada.
    pub final_backend_identifier: Option<String>,
    /// Veredicto de confianza de la respuesta seleccionada.
    pub final_confidence: Option<ConfidenceScore>,
    /// Rastro forense de la cascada (umbrales, rescates, topes).
    pub reasoning_chain: Vec<String>,
}

impl ForwardingResult {
    /// Resúmenes de cable de todos los pasos registrados.
    #[must_use]
    pub fn attempt_summaries(&self) -> Vec<AttemptSummary> {
        self.attempts.iter().map(ForwardingAttempt::summary).collect()
    }
}

/// Motor de reenvío por confianza sobre un camino de escalado ordenado.
pub struct ForwardingEngine {
    registry: Arc<BackendRegistry>,
    thermal_monitor: Arc<ThermalMonitor>,
    queue_tracker: Arc<QueueTracker>,
    confidence_estimator: Arc<dyn ConfidenceEstimator>,
    forwarding_config: RwLock<ForwardingConfig>,
}

impl ForwardingEngine {
    #[must_use]
    pub fn new(
        registry: Arc<BackendRegistry>,
        thermal_monitor: Arc<ThermalMonitor>,
        queue_tracker: Arc<QueueTracker>,
        confidence_estimator: Arc<dyn ConfidenceEstimator>,
        forwarding_config: ForwardingConfig,
    ) -> Self {
        Self {
            registry,
            thermal_monitor,
            queue_tracker,
            confidence_estimator,
            forwarding_config: RwLock::new(forwarding_config),
        }
    }

    /// Reemplaza el camino de escalado bajo lock exclusivo.
    pub fn set_escalation_path(&self, escalation_path: Vec<String>) {
        let mut config_guard = self.forwarding_config.write().expect("FORWARDING_LOCK_POISONED");
        config_guard.escalation_path = escalation_path;
    }

    /// Reemplaza el umbral de confianza bajo lock exclusivo.
    pub fn set_minimum_confidence(&self, minimum_confidence: f32) {
        let mut config_guard = self.forwarding_config.write().expect("FORWARDING_LOCK_POISONED");
        config_guard.minimum_confidence = minimum_confidence.clamp(0.0, 1.0);
    }

    /// Instantánea propia de la configuración (el lock muere aquí).
    fn snapshot_config(&self) -> ForwardingConfig {
        self.forwarding_config
            .read()
            .expect("FORWARDING_LOCK_POISONED")
            .clone()
    }

    /**
     * Camino de escalado por defecto derivado del nombre del modelo:
     * la gama pequeña antepone la unidad NPU; iGPU, NVIDIA y CPU se
     * anexan siempre en ese orden. Los identificadores se resuelven
     * perezosamente durante la iteración; una ausencia es un salto.
     */
    #[must_use]
    pub fn default_escalation_path(model_name: &str) -> Vec<String> {
        let lowercase_model = model_name.to_lowercase();
        let mut escalation_path = Vec::with_capacity(4);

        if SMALL_MODEL_MARKERS.iter().any(|marker| lowercase_model.contains(marker)) {
            escalation_path.push(DEFAULT_NPU_IDENTIFIER.to_string());
        }
        escalation_path.push(DEFAULT_IGPU_IDENTIFIER.to_string());
        escalation_path.push(DEFAULT_NVIDIA_IDENTIFIER.to_string());
        escalation_path.push(DEFAULT_CPU_IDENTIFIER.to_string());
        escalation_path
    }

    /// Camino efectivo: el configurado, o el derivado del modelo.
    fn resolve_escalation_path(config: &ForwardingConfig, model_name: &str) -> Vec<String> {
        if config.escalation_path.is_empty() {
            Self::default_escalation_path(model_name)
        } else {
            config.escalation_path.clone()
        }
    }

    /// Verificación combinada de salud reportada y biometría térmica.
    fn unit_is_dispatchable(&self, backend_unit: &Arc<dyn ComputeBackend>) -> bool {
        backend_unit.is_healthy() && self.thermal_monitor.is_healthy(backend_unit.hardware_class())
    }

    /**
     * Generación unaria con cascada de reenvío por confianza.
     *
     * # Errors:
     * - `Cancelled` / `DeadlineExceeded` ante token inactivo (terminal).
     * - `AllBackendsFailed` cuando la cascada se agota sin intento
     *   rescatable; el resultado parcial viaja dentro del error.
     */
    #[instrument(skip(self, dispatch_token, prompt, annotations), fields(model = %model_name))]
    pub async fn generate_with_forwarding(
        &self,
        dispatch_token: &DispatchToken,
        prompt: &str,
        model_name: &str,
        annotations: &RequestAnnotations,
    ) -> Result<ForwardingResult, RoutingError> {
        let config_snapshot = self.snapshot_config();
        let escalation_path = Self::resolve_escalation_path(&config_snapshot, model_name);

        let cascade_started = tokio::time::Instant::now();
        let mut cascade_result = ForwardingResult::default();
        let mut best_attempt_index: Option<usize> = None;
        let mut threshold_selection_sealed = false;

        let generate_request = GenerateRequest {
            prompt: prompt.to_string(),
            model: model_name.to_string(),
            options: Default::default(),
        };

        for (step_index, backend_identifier) in escalation_path
            .iter()
            .take(config_snapshot.max_retries)
            .enumerate()
        {
            // La cancelación se verifica antes de cada intento y jamás
            // se recupera dentro de la cascada.
            dispatch_token.ensure_active()?;

            // 1. RESOLUCIÓN PEREZOSA: ausencia = salto, jamás fatal.
            let Some(backend_unit) = self.registry.get(backend_identifier) else {
                cascade_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "not found in registry",
                ));
                continue;
            };

            // 2. GATING TÉRMICO / SALUD DE LA UNIDAD.
            if config_snapshot.respect_thermal_limits && !self.unit_is_dispatchable(&backend_unit) {
                cascade_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "thermal",
                ));
                continue;
            }

            // 3. SOPORTE DE MODELO.
            if !backend_unit.supports_model(model_name) {
                cascade_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "model unsupported",
                ));
                continue;
            }

            // 4. DESPACHO VÍA WRAPPER DE COLA (contabilidad garantizada).
            let tracked_unit = TrackedBackend::new(
                Arc::clone(&backend_unit),
                Arc::clone(&self.queue_tracker),
                annotations.priority,
            );

            let attempt_started = tokio::time::Instant::now();
            match tracked_unit.generate(dispatch_token, &generate_request).await {
                Err(transport_fault) => {
                    let observed_latency = attempt_started.elapsed().as_millis() as u64;
                    warn!(
                        "❌ [CASCADE]: Unit [{}] transport fault: {}",
                        backend_identifier, transport_fault
                    );
                    cascade_result.attempts.push(ForwardingAttempt {
                        backend_identifier: backend_identifier.clone(),
                        response_text: None,
                        confidence: None,
                        latency_milliseconds: observed_latency,
                        succeeded: false,
                        error_detail: Some(transport_fault.to_string()),
                        skip_reason: None,
                    });
                    cascade_result.total_attempts += 1;
                    continue;
                }
                Ok(generate_response) => {
                    let observed_latency = attempt_started.elapsed().as_millis() as u64;
                    let confidence_verdict = self.confidence_estimator.estimate(
                        prompt,
                        &generate_response.response_text,
                        model_name,
                        backend_unit.as_ref(),
                    );

                    cascade_result.attempts.push(ForwardingAttempt {
                        backend_identifier: backend_identifier.clone(),
                        response_text: Some(generate_response.response_text),
                        confidence: Some(confidence_verdict.clone()),
                        latency_milliseconds: observed_latency,
                        succeeded: true,
                        error_detail: None,
                        skip_reason: None,
                    });
                    cascade_result.total_attempts += 1;

                    // Rastreo del mejor intento por confianza observada.
                    let current_attempt_index = cascade_result.attempts.len() - 1;
                    let is_new_best = match best_attempt_index {
                        None => true,
                        Some(previous_best) => {
                            let previous_overall = cascade_result.attempts[previous_best]
                                .confidence
                                .as_ref()
                                .map(|score| score.overall)
                                .unwrap_or(0.0);
                            confidence_verdict.overall > previous_overall
                        }
                    };
                    if is_new_best {
                        best_attempt_index = Some(current_attempt_index);
                    }

                    if confidence_verdict.overall >= config_snapshot.minimum_confidence {
                        cascade_result.reasoning_chain.push(format!(
                            "Confidence {:.2} on [{}] meets threshold {:.2}",
                            confidence_verdict.overall,
                            backend_identifier,
                            config_snapshot.minimum_confidence
                        ));
                        cascade_result.final_response_text =
                            cascade_result.attempts[current_attempt_index].response_text.clone();
                        cascade_result.final_backend_identifier =
                            Some(backend_identifier.clone());
                        cascade_result.final_confidence = Some(confidence_verdict);
                        cascade_result.forwarded = step_index > 0;
                        threshold_selection_sealed = true;
                        break;
                    }

                    cascade_result.reasoning_chain.push(format!(
                        "Confidence too low on [{}]: {:.2} < {:.2}",
                        backend_identifier,
                        confidence_verdict.overall,
                        config_snapshot.minimum_confidence
                    ));
                }
            }
        }

        // --- TERMINACIÓN DE LA CASCADA ---
        if !threshold_selection_sealed {
            if escalation_path.len() > config_snapshot.max_retries {
                cascade_result.reasoning_chain.push(format!(
                    "Max retries ({}) reached",
                    config_snapshot.max_retries
                ));
            }

            let rescuable_best = best_attempt_index.filter(|_| config_snapshot.return_best_attempt);
            match rescuable_best {
                Some(best_index) => {
                    let best_attempt = &cascade_result.attempts[best_index];
                    cascade_result.reasoning_chain.push(format!(
                        "Best attempt fallback: [{}] at {:.2}",
                        best_attempt.backend_identifier,
                        best_attempt
                            .confidence
                            .as_ref()
                            .map(|score| score.overall)
                            .unwrap_or(0.0)
                    ));
                    cascade_result.final_response_text = best_attempt.response_text.clone();
                    cascade_result.final_backend_identifier =
                        Some(best_attempt.backend_identifier.clone());
                    cascade_result.final_confidence = best_attempt.confidence.clone();
                    cascade_result.forwarded = true;
                }
                None => {
                    cascade_result.total_latency_milliseconds =
                        cascade_started.elapsed().as_millis() as u64;
                    warn!(
                        "💀 [CASCADE_EXHAUSTED]: {} step(s), no rescuable attempt.",
                        cascade_result.attempts.len()
                    );
                    return Err(RoutingError::AllBackendsFailed {
                        partial_result: Box::new(cascade_result),
                    });
                }
            }
        }

        cascade_result.total_latency_milliseconds = cascade_started.elapsed().as_millis() as u64;
        info!(
            "🏁 [CASCADE]: Sealed on [{}] after {} dispatch(es) (forwarded: {}).",
            cascade_result
                .final_backend_identifier
                .as_deref()
                .unwrap_or("void"),
            cascade_result.total_attempts,
            cascade_result.forwarded
        );
        Ok(cascade_result)
    }

    /**
     * Generación en streaming con selección comprometida por adelantado.
     *
     * El cambio de unidad a mitad de stream es inseguro: se recorre el
     * mismo camino de escalado verificando salud, soporte de modelo y
     * una estimativa prospectiva; la primera unidad cuyo umbral y cuya
     * apertura de stream tienen éxito gana. El cierre del stream sigue
     * liberando el slot de cola vía gancho idempotente.
     *
     * # Errors:
     * - `Cancelled` / `DeadlineExceeded` ante token inactivo.
     * - `AllBackendsFailed` cuando ninguna unidad compromete el stream;
     *   los saltos registrados viajan en el resultado parcial.
     */
    #[instrument(skip(self, dispatch_token, prompt, annotations), fields(model = %model_name))]
    pub async fn generate_stream_with_forwarding(
        &self,
        dispatch_token: &DispatchToken,
        prompt: &str,
        model_name: &str,
        annotations: &RequestAnnotations,
    ) -> Result<(TokenStream, Arc<dyn ComputeBackend>), RoutingError> {
        let config_snapshot = self.snapshot_config();
        let escalation_path = Self::resolve_escalation_path(&config_snapshot, model_name);

        let mut upfront_result = ForwardingResult::default();

        let generate_request = GenerateRequest {
            prompt: prompt.to_string(),
            model: model_name.to_string(),
            options: Default::default(),
        };

        for backend_identifier in escalation_path.iter().take(config_snapshot.max_retries) {
            dispatch_token.ensure_active()?;

            let Some(backend_unit) = self.registry.get(backend_identifier) else {
                upfront_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "not found in registry",
                ));
                continue;
            };

            if config_snapshot.respect_thermal_limits && !self.unit_is_dispatchable(&backend_unit) {
                upfront_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "thermal",
                ));
                continue;
            }

            if !backend_unit.supports_model(model_name)
                || !backend_unit.capabilities().generate_stream
            {
                upfront_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    "model unsupported",
                ));
                continue;
            }

            // SELECCIÓN PROSPECTIVA: sin respuesta aún, solo prompt+modelo.
            let prospective_verdict = self.confidence_estimator.estimate_for_prompt(
                prompt,
                model_name,
                backend_unit.as_ref(),
            );
            if prospective_verdict.overall < config_snapshot.minimum_confidence {
                upfront_result.attempts.push(ForwardingAttempt::skipped(
                    backend_identifier,
                    format!(
                        "prospective confidence {:.2} below threshold {:.2}",
                        prospective_verdict.overall, config_snapshot.minimum_confidence
                    ),
                ));
                continue;
            }

            let tracked_unit = TrackedBackend::new(
                Arc::clone(&backend_unit),
                Arc::clone(&self.queue_tracker),
                annotations.priority,
            );

            match tracked_unit.generate_stream(dispatch_token, &generate_request).await {
                Ok(token_stream) => {
                    info!(
                        "🌊 [CASCADE_STREAM]: Upfront commitment to [{}] (prospective {:.2}).",
                        backend_identifier, prospective_verdict.overall
                    );
                    return Ok((token_stream, backend_unit));
                }
                Err(stream_fault) => {
                    warn!(
                        "❌ [CASCADE_STREAM]: Unit [{}] failed to open stream: {}",
                        backend_identifier, stream_fault
                    );
                    upfront_result.attempts.push(ForwardingAttempt {
                        backend_identifier: backend_identifier.clone(),
                        response_text: None,
                        confidence: None,
                        latency_milliseconds: 0,
                        succeeded: false,
                        error_detail: Some(stream_fault.to_string()),
                        skip_reason: None,
                    });
                    upfront_result.total_attempts += 1;
                }
            }
        }

        Err(RoutingError::AllBackendsFailed {
            partial_result: Box::new(upfront_result),
        })
    }
}
