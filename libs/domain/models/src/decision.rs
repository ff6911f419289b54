// [libs/domain/models/src/decision.rs]
/*!
 * =================================================================
 * APARATO: ROUTING DECISION CONTRACT (V16.0 - AUDIT SEALED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: VEREDICTO DE ENRUTAMIENTO, CAPACIDADES Y RESÚMENES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LOSSLESS ROUNDTRIP: El veredicto serializado reconstruye sin
 *    pérdida {backend, razón, potencia, latencia, alternativas}.
 * 2. DIAGNOSTIC PARITY: AttemptSummary viaja dentro del payload de
 *    error cuando la cascada de reenvío se agota.
 * =================================================================
 */

use crate::thermal::HardwareClass;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Matriz de capacidades operativas que un backend anuncia.
/// El motor consulta estos predicados antes del despacho; una operación
/// no soportada es un salto inmediato, jamás un fallo en runtime.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CapabilityMatrix {
    pub generate: bool,
    pub generate_stream: bool,
    pub embed: bool,
    pub audio_to_text: bool,
    pub text_to_audio: bool,
    pub image_to_text: bool,
    pub text_to_image: bool,
    pub video_to_text: bool,
    pub text_to_video: bool,
}

impl CapabilityMatrix {
    /// Perfil típico de un backend de texto con streaming y embeddings.
    #[must_use]
    pub fn text_generation() -> Self {
        Self {
            generate: true,
            generate_stream: true,
            embed: true,
            ..Self::default()
        }
    }
}

/// Veredicto final e inmutable del scorer para una petición.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    /// Backend elegido para el despacho.
    pub backend_identifier: String,
    /// Resumen del término dominante de la puntuación
    /// (p.ej. "latency-critical", "balanced", "quiet-mode").
    pub selection_reason: String,
    /// Potencia nominal estimada del backend elegido, en vatios.
    pub estimated_power_watts: f32,
    /// Latencia media estimada del backend elegido, en milisegundos.
    #[typeshare(serialized_as = "number")]
    pub estimated_latency_milliseconds: u64,
    /// Identificadores de los candidatos descartados, en orden de mérito.
    pub alternative_backend_identifiers: Vec<String>,
    /// Indica si el modelo pedido fue sustituido por el preferido.
    pub model_substituted: bool,
    /// Justificación de la sustitución, cuando aplica.
    pub substitution_reason: Option<String>,
    /// Rastro forense completo: pistas del detector + etapas del scorer.
    pub reasoning_chain: Vec<String>,
}

/// Resumen serializable de un intento de la cascada de reenvío.
/// Viaja en las respuestas de diagnóstico y en el payload del error
/// de agotamiento total.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptSummary {
    /// Backend contra el que se intentó (o se saltó) el despacho.
    pub backend_identifier: String,
    /// El despacho produjo una respuesta transportable.
    pub succeeded: bool,
    /// Confianza global estimada de la respuesta, si existió.
    pub confidence_overall: Option<f32>,
    /// Latencia observada del intento, en milisegundos.
    #[typeshare(serialized_as = "number")]
    pub latency_milliseconds: u64,
    /// Razón del salto cuando el backend no llegó a ser despachado.
    pub skip_reason: Option<String>,
    /// Detalle del fallo de transporte, cuando lo hubo.
    pub error_detail: Option<String>,
}

/// Descriptor de cable de un backend registrado (superficie ListBackends).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendDescriptor {
    /// Identificador estable del backend.
    pub backend_identifier: String,
    /// Nombre humano de la unidad de cómputo.
    pub display_name: String,
    /// Clase de silicio subyacente.
    pub hardware: HardwareClass,
    /// Bit de salud dinámico en el instante del listado.
    pub is_healthy: bool,
    /// Consumo nominal en vatios.
    pub nominal_power_watts: f32,
    /// Latencia media nominal en milisegundos.
    #[typeshare(serialized_as = "number")]
    pub nominal_latency_milliseconds: u64,
    /// Rango de prioridad estática (mayor = preferido).
    pub priority_rank: i32,
    /// Tamaño máximo de modelo admitido, en gigabytes.
    pub max_model_size_gigabytes: f32,
    /// Matriz de capacidades anunciada.
    pub capabilities: CapabilityMatrix,
    /// Profundidad de cola pendiente en el instante del listado.
    #[typeshare(serialized_as = "number")]
    pub pending_queue_depth: u64,
}
