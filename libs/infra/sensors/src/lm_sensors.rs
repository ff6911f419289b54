// [libs/infra/sensors/src/lm_sensors.rs]
/*!
 * =================================================================
 * APARATO: LM-SENSORS CPU PROBE (V7.0 - JSON FALLBACK)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: TELEMETRÍA DE CPU VÍA `sensors -j` COMO FALLBACK
 *
 * # Logic:
 * En hosts donde los descriptores sysfs del paquete CPU no existen o
 * están capados por el hipervisor, el CLI de lm-sensors sigue
 * exponiendo la biometría en JSON. Se extrae la máxima lectura
 * "*_input" de cualquier chip (aproximación conservadora del paquete).
 * =================================================================
 */

use async_trait::async_trait;
use chrono::Utc;
use synapse_domain_models::{HardwareClass, ThermalState};
use synapse_domain_routing::ThermalProbe;
use tokio::process::Command;
use tracing::debug;

/// Sonda de CPU sobre el CLI de lm-sensors.
pub struct LmSensorsProbe {
    sensors_binary_path: String,
}

impl LmSensorsProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sensors_binary_path: "sensors".to_string(),
        }
    }

    /// Sonda con ruta de binario explícita.
    #[must_use]
    pub fn with_binary_path(sensors_binary_path: impl Into<String>) -> Self {
        Self {
            sensors_binary_path: sensors_binary_path.into(),
        }
    }

    /**
     * Extrae la temperatura máxima de un volcado JSON de `sensors -j`.
     *
     * Recorre recursivamente el árbol buscando claves "temp*_input" y
     * retorna el máximo observado. None cuando el árbol carece de
     * lecturas positivas.
     */
    #[must_use]
    pub fn parse_sensors_json(json_dump: &str) -> Option<f32> {
        let parsed_tree: serde_json::Value = serde_json::from_str(json_dump).ok()?;
        let mut hottest_reading: Option<f32> = None;
        Self::collect_temperature_inputs(&parsed_tree, &mut hottest_reading);
        hottest_reading
    }

    fn collect_temperature_inputs(node: &serde_json::Value, hottest_reading: &mut Option<f32>) {
        if let serde_json::Value::Object(object_fields) = node {
            for (field_key, field_value) in object_fields {
                if field_key.starts_with("temp") && field_key.ends_with("_input") {
                    if let Some(temperature) = field_value.as_f64() {
                        let temperature = temperature as f32;
                        if temperature > 0.0
                            && hottest_reading.map_or(true, |current| temperature > current)
                        {
                            *hottest_reading = Some(temperature);
                        }
                    }
                }
                Self::collect_temperature_inputs(field_value, hottest_reading);
            }
        }
    }
}

impl Default for LmSensorsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThermalProbe for LmSensorsProbe {
    fn hardware_class(&self) -> HardwareClass {
        HardwareClass::Cpu
    }

    async fn sample(&self) -> Option<ThermalState> {
        let command_output = Command::new(&self.sensors_binary_path)
            .arg("-j")
            .output()
            .await
            .ok()?;

        if !command_output.status.success() {
            debug!("🔕 [LM_SENSORS_PROBE]: sensors exited non-zero; keeping previous state.");
            return None;
        }

        let stdout_text = String::from_utf8_lossy(&command_output.stdout);
        let temperature_celsius = Self::parse_sensors_json(&stdout_text)?;

        Some(ThermalState {
            hardware: HardwareClass::Cpu,
            temperature_celsius,
            fan_speed_percent: 0.0,
            power_draw_watts: 0.0,
            utilization_percent: 0.0,
            is_throttling: false,
            last_update_timestamp: Utc::now(),
        })
    }
}
