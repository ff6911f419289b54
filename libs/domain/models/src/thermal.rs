// [libs/domain/models/src/thermal.rs]
/*!
 * =================================================================
 * APARATO: SILICON THERMAL CONTRACT (V11.0 - BIOMETRÍA DE SILICIO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CLASES DE HARDWARE, ESTADO TÉRMICO Y UMBRALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLOSED SUM TYPES: La clase de hardware es un enum cerrado con
 *    etiquetas de cable estables (npu|igpu|dgpu|nvidia|cpu).
 * 2. SNAPSHOT SEMANTICS: ThermalState se reemplaza al completo en cada
 *    tick del monitor; los lectores siempre copian el valor.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Clase gruesa de silicio sobre la que se enruta una petición.
/// La etiqueta de cable es la clave del estado térmico y de las
/// heurísticas de potencia.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HardwareClass {
    /// Unidad de procesamiento neural dedicada (baja potencia).
    #[serde(rename = "npu")]
    Npu,
    /// GPU integrada en el SoC.
    #[serde(rename = "igpu")]
    IntegratedGpu,
    /// GPU discreta genérica.
    #[serde(rename = "dgpu")]
    DiscreteGpu,
    /// GPU discreta NVIDIA con telemetría SMI.
    #[serde(rename = "nvidia")]
    Nvidia,
    /// Procesador de propósito general (fallback universal).
    #[serde(rename = "cpu")]
    Cpu,
}

impl HardwareClass {
    /// Etiqueta estable de cable para mapas y logs.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Npu => "npu",
            Self::IntegratedGpu => "igpu",
            Self::DiscreteGpu => "dgpu",
            Self::Nvidia => "nvidia",
            Self::Cpu => "cpu",
        }
    }

    /// Reconstruye la clase desde una etiqueta de cable.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "npu" => Some(Self::Npu),
            "igpu" => Some(Self::IntegratedGpu),
            "dgpu" => Some(Self::DiscreteGpu),
            "nvidia" => Some(Self::Nvidia),
            "cpu" => Some(Self::Cpu),
            _ => None,
        }
    }
}

impl std::fmt::Display for HardwareClass {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_tag())
    }
}

/// Instantánea biométrica de una clase de hardware.
/// Reemplazada al completo en cada tick de sondeo.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalState {
    /// Clase de silicio a la que pertenece la lectura.
    pub hardware: HardwareClass,
    /// Temperatura del núcleo en grados Celsius.
    pub temperature_celsius: f32,
    /// Velocidad del ventilador como porcentaje del máximo.
    pub fan_speed_percent: f32,
    /// Consumo instantáneo en vatios.
    pub power_draw_watts: f32,
    /// Porcentaje de utilización del silicio (0.0 - 100.0).
    pub utilization_percent: f32,
    /// Indica si el silicio está bajo throttling térmico.
    pub is_throttling: bool,
    /// Marca temporal de la última lectura fresca.
    pub last_update_timestamp: DateTime<Utc>,
}

impl ThermalState {
    /// Construye una lectura fresca sellada con el instante actual.
    #[must_use]
    pub fn fresh(hardware: HardwareClass) -> Self {
        Self {
            hardware,
            temperature_celsius: 0.0,
            fan_speed_percent: 0.0,
            power_draw_watts: 0.0,
            utilization_percent: 0.0,
            is_throttling: false,
            last_update_timestamp: Utc::now(),
        }
    }
}

/// Umbrales térmicos del proceso, inmutables tras la ignición.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalConfig {
    /// Temperatura a partir de la cual se aplica penalización cuadrática.
    pub warning_temperature_celsius: f32,
    /// Temperatura de veto de admisión (gating).
    pub critical_temperature_celsius: f32,
    /// Temperatura de apagado inminente (veto con mensaje distinto).
    pub shutdown_temperature_celsius: f32,
    /// Umbral de ventilador silencioso.
    pub quiet_fan_percent: f32,
    /// Umbral de ventilador moderado (activa el modo silencioso global).
    pub moderate_fan_percent: f32,
    /// Umbral de ventilador ruidoso (activa penalización acústica).
    pub loud_fan_percent: f32,
    /// Ventana de enfriamiento tras un evento crítico, en segundos.
    #[typeshare(serialized_as = "number")]
    pub cooldown_seconds: u64,
    /// Cadencia del daemon de sondeo, en segundos.
    #[typeshare(serialized_as = "number")]
    pub poll_interval_seconds: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            warning_temperature_celsius: 75.0,
            critical_temperature_celsius: 85.0,
            shutdown_temperature_celsius: 95.0,
            quiet_fan_percent: 30.0,
            moderate_fan_percent: 60.0,
            loud_fan_percent: 80.0,
            cooldown_seconds: 120,
            poll_interval_seconds: 5,
        }
    }
}
