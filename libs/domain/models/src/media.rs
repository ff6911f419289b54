// [libs/domain/models/src/media.rs]
/*!
 * =================================================================
 * APARATO: MEDIA TYPE & ROUTING HINTS CONTRACT (V8.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CLASIFICACIÓN DE CARGA DE TRABAJO Y PISTAS DE RUTA
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Modalidad detectada de una carga de trabajo de inferencia.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Generación de lenguaje natural convencional.
    Text,
    /// Procesamiento de señal de audio genérica.
    Audio,
    /// Comprensión o síntesis de imagen.
    Image,
    /// Comprensión o síntesis de video.
    Video,
    /// Transcripción o síntesis de voz humana.
    Speech,
    /// Generación o análisis de código fuente.
    Code,
    /// Modalidad indeterminada; el enrutador aplica la ruta conservadora.
    #[default]
    Unknown,
}

/// Pistas emitidas por el detector de carga de trabajo y consumidas por
/// el scorer. La cadena de razonamiento es de solo-anexado y viaja hasta
/// la respuesta final para auditoría del operador.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoutingHints {
    /// Modalidad inferida de la petición.
    pub detected_media_type: MediaType,
    /// Modelo sugerido cuando la modalidad no casa con el modelo pedido.
    /// Cadena vacía cuando no hay sustitución recomendada.
    pub preferred_model: String,
    /// La carga se beneficia de la ruta de menor latencia.
    pub prefer_low_latency: bool,
    /// La carga tolera la ruta de menor consumo energético.
    pub prefer_low_power: bool,
    /// Rastro forense legible de cada decisión heurística tomada.
    pub reasoning_chain: Vec<String>,
}

impl RoutingHints {
    /// Anexa una línea de razonamiento al rastro forense.
    pub fn push_reasoning(&mut self, reasoning_line: impl Into<String>) {
        self.reasoning_chain.push(reasoning_line.into());
    }
}
