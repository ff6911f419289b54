// [libs/domain/routing/src/thermal_monitor.rs]
/*!
 * =================================================================
 * APARATO: SILICON THERMAL MONITOR (V18.0 - BIOMETRÍA ADAPTIVA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: GATING TÉRMICO, PENALIZACIÓN Y DAEMON DE SONDEO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SNAPSHOT DISCIPLINE: El mapa de estados vive bajo RwLock; los
 *    lectores copian el valor y sueltan el lock antes de usarlo.
 * 2. SILENT PROBE FAULTS: Un sondeo fallido se ignora en silencio y el
 *    estado del tick anterior sobrevive intacto.
 * 3. MISSING-STATE OPTIMISM: Sin lectura no hay veto: hardware sin
 *    estado se admite, se considera sano y penaliza cero.
 *
 * # Mathematical Proof (Additive Penalty):
 * penalty = r²·1000 [r = (t−warn)/(crit−warn), t > warn]
 *         + (fan − loud)·5          [fan > loud]
 *         + (util − 80)·10          [util > 80]
 *         + 2000                    [throttling]
 * Cada término es no-negativo y no-decreciente en su entrada, por lo
 * que la suma preserva la monotonía exigida por el scorer.
 * =================================================================
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use synapse_domain_models::{HardwareClass, ThermalConfig, ThermalState};
use tracing::{debug, info, instrument, warn};

/// Penalización plana aplicada al silicio bajo throttling activo.
const THROTTLING_FLAT_PENALTY: f64 = 2000.0;
/// Umbral de utilización a partir del cual se penaliza la saturación.
const UTILIZATION_PENALTY_FLOOR: f64 = 80.0;

/// Fuente de telemetría específica de plataforma para una clase de
/// silicio. Cada sondeo retorna un estado fresco completo o nada.
#[async_trait]
pub trait ThermalProbe: Send + Sync {
    /// Clase de silicio que esta fuente observa.
    fn hardware_class(&self) -> HardwareClass;

    /// Lectura fresca de sensores. `None` ante cualquier fallo de la
    /// fuente; el monitor conserva el estado previo sin alarmas.
    async fn sample(&self) -> Option<ThermalState>;
}

/// Monitor biométrico del pool de silicio.
pub struct ThermalMonitor {
    thermal_config: ThermalConfig,
    states: RwLock<HashMap<HardwareClass, ThermalState>>,
    probes: Vec<Arc<dyn ThermalProbe>>,
}

impl ThermalMonitor {
    /// Monitor con sondas de plataforma inyectadas.
    #[must_use]
    pub fn new(thermal_config: ThermalConfig, probes: Vec<Arc<dyn ThermalProbe>>) -> Self {
        Self {
            thermal_config,
            states: RwLock::new(HashMap::new()),
            probes,
        }
    }

    /// Monitor sin sondas (estados publicados manualmente).
    #[must_use]
    pub fn with_config(thermal_config: ThermalConfig) -> Self {
        Self::new(thermal_config, Vec::new())
    }

    /// Umbrales activos del proceso.
    #[must_use]
    pub fn config(&self) -> &ThermalConfig {
        &self.thermal_config
    }

    /// Publica un estado fresco, reemplazando al completo el anterior.
    pub fn publish_state(&self, fresh_state: ThermalState) {
        let mut states_guard = self.states.write().expect("THERMAL_LOCK_POISONED");
        if fresh_state.temperature_celsius >= self.thermal_config.critical_temperature_celsius {
            warn!(
                "🔥 [THERMAL_ALERT]: [{}] critical: {:.1}°C",
                fresh_state.hardware, fresh_state.temperature_celsius
            );
        }
        states_guard.insert(fresh_state.hardware, fresh_state);
    }

    /// Instantánea (copia por valor) del estado de una clase de silicio.
    #[must_use]
    pub fn snapshot(&self, hardware: HardwareClass) -> Option<ThermalState> {
        let states_guard = self.states.read().expect("THERMAL_LOCK_POISONED");
        states_guard.get(&hardware).cloned()
    }

    /// Instantánea completa del mapa biométrico.
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<HardwareClass, ThermalState> {
        let states_guard = self.states.read().expect("THERMAL_LOCK_POISONED");
        states_guard.clone()
    }

    /**
     * Decisión de admisión (gating) para una clase de silicio.
     *
     * Veta ante apagado inminente (mensaje propio), temperatura crítica
     * o throttling activo. Sin estado registrado, admite.
     */
    #[must_use]
    pub fn can_use(&self, hardware: HardwareClass) -> (bool, String) {
        let Some(state_snapshot) = self.snapshot(hardware) else {
            return (true, String::from("no thermal reading; admission granted"));
        };

        if state_snapshot.temperature_celsius >= self.thermal_config.shutdown_temperature_celsius {
            return (
                false,
                format!(
                    "SHUTDOWN_IMMINENT: [{}] at {:.1}°C exceeds shutdown threshold {:.1}°C",
                    hardware,
                    state_snapshot.temperature_celsius,
                    self.thermal_config.shutdown_temperature_celsius
                ),
            );
        }

        if state_snapshot.temperature_celsius >= self.thermal_config.critical_temperature_celsius {
            return (
                false,
                format!(
                    "CRITICAL_TEMPERATURE: [{}] at {:.1}°C exceeds critical threshold {:.1}°C",
                    hardware,
                    state_snapshot.temperature_celsius,
                    self.thermal_config.critical_temperature_celsius
                ),
            );
        }

        if state_snapshot.is_throttling {
            return (
                false,
                format!("THROTTLING_ACTIVE: [{}] is thermal-throttling", hardware),
            );
        }

        (true, String::from("nominal thermal envelope"))
    }

    /// Salud térmica: temperatura bajo crítico y sin throttling.
    /// Sin estado registrado, sano.
    #[must_use]
    pub fn is_healthy(&self, hardware: HardwareClass) -> bool {
        match self.snapshot(hardware) {
            Some(state_snapshot) => {
                state_snapshot.temperature_celsius < self.thermal_config.critical_temperature_celsius
                    && !state_snapshot.is_throttling
            }
            None => true,
        }
    }

    /**
     * Penalización aditiva de scoring para una clase de silicio.
     * Cuatro términos en orden de diseño: temperatura cuadrática,
     * ruido de ventilador, saturación de utilización y throttling.
     */
    #[must_use]
    pub fn penalty(&self, hardware: HardwareClass) -> f64 {
        let Some(state_snapshot) = self.snapshot(hardware) else {
            return 0.0;
        };

        let mut accumulated_penalty = 0.0_f64;

        // 1. RAMPA TÉRMICA CUADRÁTICA
        let warning_threshold = self.thermal_config.warning_temperature_celsius;
        let critical_threshold = self.thermal_config.critical_temperature_celsius;
        if state_snapshot.temperature_celsius > warning_threshold {
            let overheat_ratio = f64::from(state_snapshot.temperature_celsius - warning_threshold)
                / f64::from(critical_threshold - warning_threshold);
            accumulated_penalty += overheat_ratio * overheat_ratio * 1000.0;
        }

        // 2. RUIDO ACÚSTICO DEL VENTILADOR
        let loud_threshold = self.thermal_config.loud_fan_percent;
        if state_snapshot.fan_speed_percent > loud_threshold {
            accumulated_penalty += f64::from(state_snapshot.fan_speed_percent - loud_threshold) * 5.0;
        }

        // 3. SATURACIÓN DE UTILIZACIÓN
        if f64::from(state_snapshot.utilization_percent) > UTILIZATION_PENALTY_FLOOR {
            accumulated_penalty +=
                (f64::from(state_snapshot.utilization_percent) - UTILIZATION_PENALTY_FLOOR) * 10.0;
        }

        // 4. THROTTLING PLANO
        if state_snapshot.is_throttling {
            accumulated_penalty += THROTTLING_FLAT_PENALTY;
        }

        accumulated_penalty
    }

    /// Modo silencioso global: algún silicio supera el umbral moderado
    /// de ventilador.
    #[must_use]
    pub fn should_prefer_quiet(&self) -> bool {
        let states_guard = self.states.read().expect("THERMAL_LOCK_POISONED");
        states_guard
            .values()
            .any(|state| state.fan_speed_percent > self.thermal_config.moderate_fan_percent)
    }

    /// Candidato de menor temperatura entre los presentes en el mapa.
    /// Primero gana ante empate; cadena vacía cuando ninguno tiene estado.
    #[must_use]
    pub fn coolest_of(&self, candidates: &[HardwareClass]) -> String {
        let states_guard = self.states.read().expect("THERMAL_LOCK_POISONED");

        let mut coolest_tag = String::new();
        let mut coolest_temperature = f32::INFINITY;

        for candidate in candidates {
            if let Some(state) = states_guard.get(candidate) {
                if state.temperature_celsius < coolest_temperature {
                    coolest_temperature = state.temperature_celsius;
                    coolest_tag = candidate.as_tag().to_string();
                }
            }
        }

        coolest_tag
    }

    /**
     * Lanza el daemon de sondeo periódico. Cada tick consulta todas las
     * sondas inyectadas; los fallos se ignoran en silencio y el estado
     * previo sobrevive hasta la próxima lectura exitosa.
     */
    #[instrument(skip(self))]
    pub fn spawn_monitor_daemon(self: &Arc<Self>) {
        let monitor_reference = Arc::clone(self);
        let poll_interval = Duration::from_secs(self.thermal_config.poll_interval_seconds.max(1));

        tokio::spawn(async move {
            info!(
                "🌡️ [THERMAL_DAEMON]: Polling {} probe(s) every {:?}.",
                monitor_reference.probes.len(),
                poll_interval
            );
            let mut tick_interval = tokio::time::interval(poll_interval);

            loop {
                tick_interval.tick().await;

                for platform_probe in &monitor_reference.probes {
                    match platform_probe.sample().await {
                        Some(fresh_state) => monitor_reference.publish_state(fresh_state),
                        None => debug!(
                            "🔕 [THERMAL_DAEMON]: Probe [{}] returned nothing; previous state survives.",
                            platform_probe.hardware_class()
                        ),
                    }
                }
            }
        });
    }
}
