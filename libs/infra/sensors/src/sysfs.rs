// [libs/infra/sensors/src/sysfs.rs]
/*!
 * =================================================================
 * APARATO: SYSFS THERMAL PROBE (V11.0 - HWMON ADAPTIVO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: TELEMETRÍA GENÉRICA VÍA DESCRIPTORES DEL KERNEL
 *
 * # Logic:
 * Orquesta la lectura en dos estratos del kernel de Linux:
 * 1. hwmon: primer descriptor temp*_input disponible bajo la raíz.
 * 2. thermal_zone: fallback clásico thermal_zone* / temp.
 * Los valores llegan en miligrados; la conversión y el saneamiento
 * viven en funciones puras verificables sin hardware real.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use synapse_domain_models::{HardwareClass, ThermalState};
use synapse_domain_routing::ThermalProbe;
use tokio::fs;
use tracing::debug;

/// Sonda de temperatura genérica sobre descriptores sysfs.
pub struct SysfsThermalProbe {
    observed_hardware: HardwareClass,
    hwmon_root: PathBuf,
    thermal_zone_root: PathBuf,
}

impl SysfsThermalProbe {
    /// Sonda sobre las rutas estándar del kernel.
    #[must_use]
    pub fn new(observed_hardware: HardwareClass) -> Self {
        Self::with_roots(
            observed_hardware,
            PathBuf::from("/sys/class/hwmon"),
            PathBuf::from("/sys/class/thermal"),
        )
    }

    /// Sonda con raíces explícitas (fixtures del Proving Grounds).
    #[must_use]
    pub fn with_roots(
        observed_hardware: HardwareClass,
        hwmon_root: PathBuf,
        thermal_zone_root: PathBuf,
    ) -> Self {
        Self {
            observed_hardware,
            hwmon_root,
            thermal_zone_root,
        }
    }

    /// Convierte una lectura cruda en miligrados a grados Celsius.
    /// Retorna None ante contenido no numérico o lecturas absurdas.
    #[must_use]
    pub fn parse_millidegrees(raw_content: &str) -> Option<f32> {
        let millidegrees = raw_content.trim().parse::<f32>().ok()?;
        if millidegrees <= 0.0 {
            return None;
        }
        Some(millidegrees / 1000.0)
    }

    /// Primer descriptor temp*_input disponible bajo una raíz hwmon.
    async fn first_hwmon_temperature(&self) -> Option<f32> {
        let mut hwmon_entries = fs::read_dir(&self.hwmon_root).await.ok()?;
        while let Ok(Some(hwmon_device)) = hwmon_entries.next_entry().await {
            for sensor_index in 1..=4 {
                let sensor_path = hwmon_device
                    .path()
                    .join(format!("temp{}_input", sensor_index));
                if let Some(temperature) = Self::read_temperature_descriptor(&sensor_path).await {
                    return Some(temperature);
                }
            }
        }
        None
    }

    /// Primer descriptor thermal_zone*/temp disponible.
    async fn first_thermal_zone_temperature(&self) -> Option<f32> {
        let mut zone_entries = fs::read_dir(&self.thermal_zone_root).await.ok()?;
        while let Ok(Some(zone_device)) = zone_entries.next_entry().await {
            let zone_name = zone_device.file_name();
            if !zone_name.to_string_lossy().starts_with("thermal_zone") {
                continue;
            }
            let sensor_path = zone_device.path().join("temp");
            if let Some(temperature) = Self::read_temperature_descriptor(&sensor_path).await {
                return Some(temperature);
            }
        }
        None
    }

    async fn read_temperature_descriptor(sensor_path: &Path) -> Option<f32> {
        let raw_content = fs::read_to_string(sensor_path).await.ok()?;
        Self::parse_millidegrees(&raw_content)
    }
}

#[async_trait]
impl ThermalProbe for SysfsThermalProbe {
    fn hardware_class(&self) -> HardwareClass {
        self.observed_hardware
    }

    async fn sample(&self) -> Option<ThermalState> {
        // Estrato 1: hwmon. Estrato 2: thermal_zone clásico.
        let temperature_celsius = match self.first_hwmon_temperature().await {
            Some(temperature) => temperature,
            None => {
                debug!("🔍 [SYSFS_PROBE]: hwmon void; falling back to thermal_zone.");
                self.first_thermal_zone_temperature().await?
            }
        };

        Some(ThermalState {
            hardware: self.observed_hardware,
            temperature_celsius,
            fan_speed_percent: 0.0,
            power_draw_watts: 0.0,
            utilization_percent: 0.0,
            is_throttling: false,
            last_update_timestamp: Utc::now(),
        })
    }
}
