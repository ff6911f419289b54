// [libs/domain/routing/src/router.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE ROUTER (V21.0 - WEIGHTED VERDICT)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: FILTRADO POR RESTRICCIONES Y SCORING PONDERADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ORDERED PIPELINE: objetivo explícito → compatibilidad de modelo
 *    (con sustitución del detector) → gating térmico → restricciones
 *    duras → scoring ponderado. Cada etapa puede cortocircuitar.
 * 2. SNAPSHOT DISCIPLINE: Todas las lecturas compartidas (registro,
 *    térmica, colas) producen copias propias antes de puntuar; ningún
 *    lock sobrevive hasta el despacho.
 * 3. STABLE VERDICT: Desempate estable por prioridad base y luego por
 *    orden de inserción; el veredicto nombra el término dominante.
 * =================================================================
 */

use crate::contract::ComputeBackend;
use crate::errors::RoutingError;
use crate::queue_tracker::QueueTracker;
use crate::thermal_monitor::ThermalMonitor;
use std::sync::Arc;
use synapse_domain_models::{RequestAnnotations, RequestPriority, RoutingDecision, RoutingHints};
use tracing::{debug, info, instrument};

/// Factor del castigo de cola sobre la profundidad ponderada.
const QUEUE_PENALTY_FACTOR: f64 = 50.0;
/// Bonificación de silicio silencioso bajo modo quiet global.
const QUIET_FAN_BONUS: f64 = 200.0;
/// Umbral de ventilador para optar a la bonificación silenciosa.
const QUIET_FAN_CEILING: f32 = 40.0;

/// Conmutadores de proceso del scorer, inmutables tras la ignición.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Activa el término de latencia para todas las peticiones.
    pub auto_optimize: bool,
    /// Activa el término de potencia para todas las peticiones.
    pub power_aware: bool,
}

/// Veredicto del pipeline: unidad elegida, decisión serializable y el
/// modelo efectivo (posiblemente sustituido) a despachar.
pub struct RankedSelection {
    pub backend: Arc<dyn ComputeBackend>,
    pub decision: RoutingDecision,
    pub effective_model: String,
}

/// Candidato puntuado durante la fase final del pipeline.
struct ScoredCandidate {
    backend: Arc<dyn ComputeBackend>,
    total_score: f64,
    dominant_term_label: &'static str,
}

/// Enrutador de inferencia: consume el registro, la biometría térmica y
/// la contabilidad de colas para producir un veredicto por petición.
pub struct InferenceRouter {
    registry: Arc<crate::registry::BackendRegistry>,
    thermal_monitor: Arc<ThermalMonitor>,
    queue_tracker: Arc<QueueTracker>,
    router_config: RouterConfig,
}

impl InferenceRouter {
    #[must_use]
    pub fn new(
        registry: Arc<crate::registry::BackendRegistry>,
        thermal_monitor: Arc<ThermalMonitor>,
        queue_tracker: Arc<QueueTracker>,
        router_config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            thermal_monitor,
            queue_tracker,
            router_config,
        }
    }

    /**
     * Ejecuta el pipeline completo de selección para una petición.
     *
     * # Errors:
     * - `ModelUnsupported` cuando ni el modelo pedido ni el sustituto
     *   preferido casan con silicio sano alguno.
     * - `NoBackendsMatch` cuando el gating térmico o las restricciones
     *   duras vacían el conjunto de candidatos.
     */
    #[instrument(skip(self, annotations, hints), fields(model = %model_name))]
    pub fn select_backend(
        &self,
        model_name: &str,
        annotations: &RequestAnnotations,
        hints: &RoutingHints,
    ) -> Result<RankedSelection, RoutingError> {
        let mut reasoning_chain = hints.reasoning_chain.clone();

        // --- ETAPA 1: OBJETIVO EXPLÍCITO DEL CLIENTE ---
        if annotations.has_explicit_target() {
            if let Some(explicit_unit) = self.registry.get(&annotations.target_backend) {
                if explicit_unit.is_healthy() {
                    return Ok(self.seal_explicit_selection(explicit_unit, model_name, reasoning_chain));
                }
                reasoning_chain.push(format!(
                    "Explicit target [{}] is unhealthy; falling back to scoring",
                    annotations.target_backend
                ));
            } else {
                reasoning_chain.push(format!(
                    "Explicit target [{}] is not registered; falling back to scoring",
                    annotations.target_backend
                ));
            }
        }

        let all_units = self.registry.list();
        let total_registered = all_units.len();
        let healthy_units: Vec<Arc<dyn ComputeBackend>> = all_units
            .into_iter()
            .filter(|unit| unit.is_healthy())
            .collect();
        let healthy_count = healthy_units.len();

        // --- ETAPA 2: COMPATIBILIDAD DE MODELO (CON SUSTITUCIÓN) ---
        let mut effective_model = model_name.to_string();
        let mut model_substituted = false;
        let mut substitution_reason: Option<String> = None;

        let mut model_compatible_units: Vec<Arc<dyn ComputeBackend>> = healthy_units
            .iter()
            .filter(|unit| unit.supports_model(&effective_model))
            .cloned()
            .collect();

        if model_compatible_units.is_empty()
            && !hints.preferred_model.is_empty()
            && hints.preferred_model != model_name
        {
            let substitute_candidates: Vec<Arc<dyn ComputeBackend>> = healthy_units
                .iter()
                .filter(|unit| unit.supports_model(&hints.preferred_model))
                .cloned()
                .collect();

            if !substitute_candidates.is_empty() {
                let recorded_reason = format!(
                    "Requested model [{}] unsupported on all silicon; substituted workload-preferred [{}]",
                    model_name, hints.preferred_model
                );
                reasoning_chain.push(recorded_reason.clone());
                substitution_reason = Some(recorded_reason);
                model_substituted = true;
                effective_model = hints.preferred_model.clone();
                model_compatible_units = substitute_candidates;
            }
        }

        if model_compatible_units.is_empty() {
            return Err(RoutingError::ModelUnsupported {
                model_name: model_name.to_string(),
                attempted_substitution: if hints.preferred_model.is_empty() {
                    None
                } else {
                    Some(hints.preferred_model.clone())
                },
            });
        }

        // --- ETAPA 3: GATING TÉRMICO ---
        let mut remaining_constraints: Vec<String> = Vec::new();
        let mut thermally_admitted: Vec<Arc<dyn ComputeBackend>> = Vec::new();
        for candidate_unit in model_compatible_units {
            let (is_admitted, gate_reason) = self.thermal_monitor.can_use(candidate_unit.hardware_class());
            if is_admitted {
                thermally_admitted.push(candidate_unit);
            } else {
                reasoning_chain.push(format!(
                    "Thermal gate rejected [{}]: {}",
                    candidate_unit.identifier(),
                    gate_reason
                ));
            }
        }
        if thermally_admitted.is_empty() {
            remaining_constraints.push("thermal admission".to_string());
            return Err(RoutingError::NoBackendsMatch {
                total_registered,
                healthy_count,
                remaining_constraints,
            });
        }

        // --- ETAPA 4: RESTRICCIONES DURAS DE LATENCIA Y POTENCIA ---
        let mut constraint_survivors = thermally_admitted;
        if annotations.max_latency_milliseconds > 0 {
            remaining_constraints.push(format!(
                "max_latency_milliseconds <= {}",
                annotations.max_latency_milliseconds
            ));
            constraint_survivors.retain(|unit| {
                unit.average_latency_milliseconds() <= annotations.max_latency_milliseconds
            });
        }
        if annotations.max_power_watts > 0.0 {
            remaining_constraints.push(format!("max_power_watts <= {}", annotations.max_power_watts));
            constraint_survivors
                .retain(|unit| unit.nominal_power_watts() <= annotations.max_power_watts);
        }
        if constraint_survivors.is_empty() {
            return Err(RoutingError::NoBackendsMatch {
                total_registered,
                healthy_count,
                remaining_constraints,
            });
        }

        // --- ETAPA 5: SCORING PONDERADO Y VEREDICTO ---
        let quiet_mode_active = self.thermal_monitor.should_prefer_quiet();

        let mut scored_candidates: Vec<ScoredCandidate> = constraint_survivors
            .into_iter()
            .map(|candidate_unit| self.score_unit(candidate_unit, annotations, hints, quiet_mode_active))
            .collect();

        // Desempate estable: prioridad base primero, luego puntuación.
        // Ambos sorts son estables, preservando el orden de inserción.
        scored_candidates.sort_by(|left, right| {
            right.backend.priority_rank().cmp(&left.backend.priority_rank())
        });
        scored_candidates.sort_by(|left, right| {
            right
                .total_score
                .partial_cmp(&left.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for scored in &scored_candidates {
            debug!(
                "🧮 [SCORER]: [{}] => {:.1} (dominant: {})",
                scored.backend.identifier(),
                scored.total_score,
                scored.dominant_term_label
            );
        }

        let winner = scored_candidates.remove(0);
        let alternative_backend_identifiers: Vec<String> = scored_candidates
            .iter()
            .map(|scored| scored.backend.identifier().to_string())
            .collect();

        reasoning_chain.push(format!(
            "Selected [{}] with score {:.1} (dominant term: {})",
            winner.backend.identifier(),
            winner.total_score,
            winner.dominant_term_label
        ));

        info!(
            "🎯 [ROUTER]: Verdict [{}] for model [{}] ({}).",
            winner.backend.identifier(),
            effective_model,
            winner.dominant_term_label
        );

        let decision = RoutingDecision {
            backend_identifier: winner.backend.identifier().to_string(),
            selection_reason: winner.dominant_term_label.to_string(),
            estimated_power_watts: winner.backend.nominal_power_watts(),
            estimated_latency_milliseconds: winner.backend.average_latency_milliseconds(),
            alternative_backend_identifiers,
            model_substituted,
            substitution_reason,
            reasoning_chain,
        };

        Ok(RankedSelection {
            backend: winner.backend,
            decision,
            effective_model,
        })
    }

    /// Sella el veredicto del camino de objetivo explícito (sin scoring).
    fn seal_explicit_selection(
        &self,
        explicit_unit: Arc<dyn ComputeBackend>,
        model_name: &str,
        mut reasoning_chain: Vec<String>,
    ) -> RankedSelection {
        let alternative_backend_identifiers: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .filter(|unit| unit.identifier() != explicit_unit.identifier())
            .map(|unit| unit.identifier().to_string())
            .collect();

        let selection_reason = format!("Explicit target [{}] honoured", explicit_unit.identifier());
        reasoning_chain.push(selection_reason.clone());

        let decision = RoutingDecision {
            backend_identifier: explicit_unit.identifier().to_string(),
            selection_reason,
            estimated_power_watts: explicit_unit.nominal_power_watts(),
            estimated_latency_milliseconds: explicit_unit.average_latency_milliseconds(),
            alternative_backend_identifiers,
            model_substituted: false,
            substitution_reason: None,
            reasoning_chain,
        };

        RankedSelection {
            backend: explicit_unit,
            decision,
            effective_model: model_name.to_string(),
        }
    }

    /**
     * Puntúa una unidad candidata y nombra su término dominante.
     *
     * Términos (un único escalar adimensional):
     * base de prioridad, latencia (W 2.0 anotación / 2.5 pista), potencia
     * (W 1.5 anotación / 2.0 pista), balanceado (sin preferencia activa),
     * castigo de cola ponderada, bonificación de prioridad, penalización
     * térmica y bonificación de silencio.
     */
    fn score_unit(
        &self,
        candidate_unit: Arc<dyn ComputeBackend>,
        annotations: &RequestAnnotations,
        hints: &RoutingHints,
        quiet_mode_active: bool,
    ) -> ScoredCandidate {
        let average_latency = candidate_unit.average_latency_milliseconds() as f64;
        let nominal_power = f64::from(candidate_unit.nominal_power_watts());

        let mut score_terms: Vec<(&'static str, f64)> = Vec::with_capacity(8);
        score_terms.push((
            "base-priority",
            f64::from(candidate_unit.priority_rank()) * 10.0,
        ));

        let latency_term_active =
            annotations.latency_critical || self.router_config.auto_optimize || hints.prefer_low_latency;
        let power_term_active =
            annotations.prefer_low_power || self.router_config.power_aware || hints.prefer_low_power;

        if latency_term_active {
            let latency_weight = if annotations.latency_critical || self.router_config.auto_optimize {
                2.0
            } else {
                2.5
            };
            score_terms.push(("latency-critical", (1000.0 - average_latency) * latency_weight));
        }

        if power_term_active {
            let power_weight = if annotations.prefer_low_power || self.router_config.power_aware {
                1.5
            } else {
                2.0
            };
            score_terms.push(("power-efficient", (1000.0 - nominal_power * 10.0) * power_weight));
        }

        if !latency_term_active && !power_term_active {
            score_terms.push((
                "balanced",
                ((1000.0 - average_latency) + (1000.0 - nominal_power * 10.0)) / 2.0,
            ));
        }

        let weighted_queue_depth = self
            .queue_tracker
            .weighted_depth(candidate_unit.identifier(), annotations.priority);
        score_terms.push(("queue-pressure", -(weighted_queue_depth * QUEUE_PENALTY_FACTOR)));

        match annotations.priority {
            RequestPriority::Critical => score_terms.push(("priority-critical", 500.0)),
            RequestPriority::High => score_terms.push(("priority-high", 200.0)),
            _ => {}
        }

        score_terms.push((
            "thermal-pressure",
            -self.thermal_monitor.penalty(candidate_unit.hardware_class()),
        ));

        if quiet_mode_active {
            let fan_speed_percent = self
                .thermal_monitor
                .snapshot(candidate_unit.hardware_class())
                .map(|state| state.fan_speed_percent)
                .unwrap_or(0.0);
            if fan_speed_percent < QUIET_FAN_CEILING {
                score_terms.push(("quiet-mode", QUIET_FAN_BONUS));
            }
        }

        let total_score: f64 = score_terms.iter().map(|(_, term_value)| term_value).sum();
        let dominant_term_label = score_terms
            .iter()
            .max_by(|left, right| {
                left.1.partial_cmp(&right.1).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(term_label, _)| *term_label)
            .unwrap_or("balanced");

        ScoredCandidate {
            backend: candidate_unit,
            total_score,
            dominant_term_label,
        }
    }
}
