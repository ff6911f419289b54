// [libs/infra/sensors/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SENSOR PROBES MANIFEST (V6.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE SONDAS DE PLATAFORMA
 * =================================================================
 */

pub mod lm_sensors;
pub mod nvidia;
pub mod sysfs;

pub use lm_sensors::LmSensorsProbe;
pub use nvidia::NvidiaSmiProbe;
pub use sysfs::SysfsThermalProbe;
