// [libs/infra/sensors/src/nvidia.rs]
/*!
 * =================================================================
 * APARATO: NVIDIA SMI PROBE (V9.0 - CSV DISCIPLINE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: TELEMETRÍA DE GPU DISCRETA VÍA CLI nvidia-smi
 *
 * # Logic:
 * Ejecuta el binario nvidia-smi en modo CSV sin cabecera ni unidades y
 * decodifica la primera línea (GPU índice 0). Cualquier fallo (binario
 * ausente, driver caído, CSV deforme) retorna None y el monitor
 * conserva el estado del tick anterior en silencio.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::Utc;
use synapse_domain_models::{HardwareClass, ThermalState};
use synapse_domain_routing::ThermalProbe;
use tokio::process::Command;
use tracing::debug;

/// Consulta SMI: temperatura, ventilador, potencia, utilización y
/// razones de throttling activas.
const SMI_QUERY_FIELDS: &str =
    "temperature.gpu,fan.speed,power.draw,utilization.gpu,clocks_event_reasons.active";

/// Sonda de telemetría para GPU NVIDIA vía el CLI oficial.
pub struct NvidiaSmiProbe {
    smi_binary_path: String,
}

impl NvidiaSmiProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            smi_binary_path: "nvidia-smi".to_string(),
        }
    }

    /// Sonda con ruta de binario explícita (entornos contenedorizados).
    #[must_use]
    pub fn with_binary_path(smi_binary_path: impl Into<String>) -> Self {
        Self {
            smi_binary_path: smi_binary_path.into(),
        }
    }

    /**
     * Decodifica una línea CSV de nvidia-smi en un estado térmico.
     *
     * Formato esperado: "temp, fan, power, util, throttle_bitmask".
     * Campos "[N/A]" colapsan a cero; el bitmask distinto de 0x0 sella
     * la bandera de throttling.
     */
    #[must_use]
    pub fn parse_smi_csv_line(csv_line: &str) -> Option<ThermalState> {
        let fields: Vec<&str> = csv_line.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            return None;
        }

        let parse_numeric = |raw_field: &str| -> f32 {
            raw_field.parse::<f32>().unwrap_or(0.0)
        };

        let throttle_bitmask = fields[4].trim_start_matches("0x");
        let is_throttling = u64::from_str_radix(throttle_bitmask, 16)
            .map(|bitmask| bitmask != 0)
            .unwrap_or(false);

        Some(ThermalState {
            hardware: HardwareClass::Nvidia,
            temperature_celsius: parse_numeric(fields[0]),
            fan_speed_percent: parse_numeric(fields[1]),
            power_draw_watts: parse_numeric(fields[2]),
            utilization_percent: parse_numeric(fields[3]),
            is_throttling,
            last_update_timestamp: Utc::now(),
        })
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThermalProbe for NvidiaSmiProbe {
    fn hardware_class(&self) -> HardwareClass {
        HardwareClass::Nvidia
    }

    async fn sample(&self) -> Option<ThermalState> {
        let command_output = Command::new(&self.smi_binary_path)
            .arg(format!("--query-gpu={}", SMI_QUERY_FIELDS))
            .arg("--format=csv,noheader,nounits")
            .output()
            .await
            .ok()?;

        if !command_output.status.success() {
            debug!("🔕 [NVIDIA_PROBE]: nvidia-smi exited non-zero; keeping previous state.");
            return None;
        }

        let stdout_text = String::from_utf8_lossy(&command_output.stdout);
        let first_gpu_line = stdout_text.lines().next()?;
        Self::parse_smi_csv_line(first_gpu_line)
    }
}
