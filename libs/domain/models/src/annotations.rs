// [libs/domain/models/src/annotations.rs]
/*!
 * =================================================================
 * APARATO: REQUEST ANNOTATIONS CONTRACT (V14.0 - WIRE PARITY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DIRECTIVAS DE ENRUTAMIENTO POR PETICIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WIRE PARITY: Mapeo 1:1 con las anotaciones RPC del cliente;
 *    los campos ausentes colapsan a sus valores por defecto.
 * 2. CLOSED SUM TYPES: La prioridad es un enum cerrado de cuatro
 *    niveles; nunca una etiqueta de texto abierta.
 * 3. HYGIENE: Nomenclatura nominal absoluta sin abreviaciones.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use typeshare::typeshare;

/// Niveles de prioridad de una petición de inferencia.
/// El orden numérico es significativo: un rango mayor precede en el scoring.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestPriority {
    /// Sin garantías; absorbe la capacidad sobrante del silicio.
    BestEffort = 0,
    /// Tráfico interactivo estándar.
    #[default]
    Normal = 1,
    /// Tráfico sensible a latencia (asistentes en vivo).
    High = 2,
    /// Tráfico de misión crítica; desplaza a todos los demás estratos.
    Critical = 3,
}

impl RequestPriority {
    /// Cantidad total de niveles de prioridad del sistema.
    pub const LEVEL_COUNT: usize = 4;

    /// Índice denso [0..4) para el array de contadores de cola.
    #[must_use]
    pub fn as_index(self) -> usize {
        self as usize
    }

    /// Reconstruye la prioridad desde un índice denso. Índices fuera de
    /// rango colapsan al estrato BestEffort.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Normal,
            2 => Self::High,
            3 => Self::Critical,
            _ => Self::BestEffort,
        }
    }

    /// Rango numérico para la aritmética de profundidad ponderada.
    #[must_use]
    pub fn rank(self) -> i64 {
        self as i64
    }
}

/// Directivas explícitas del cliente que acompañan a cada petición.
///
/// Todos los campos son opcionales en el cable; un mapa nulo o ausente
/// equivale a `RequestAnnotations::default()`.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RequestAnnotations {
    /// Backend objetivo explícito. Vacío o "auto" delega en el enrutador.
    pub target_backend: String,
    /// La petición es crítica en latencia (activa el término de latencia).
    pub latency_critical: bool,
    /// Preferencia de eficiencia energética (activa el término de potencia).
    pub prefer_low_power: bool,
    /// Habilita la capa de caché de respuestas aguas arriba (pass-through).
    pub cache_enabled: bool,
    /// Latencia máxima admisible en milisegundos. 0 = sin límite.
    #[typeshare(serialized_as = "number")]
    pub max_latency_milliseconds: u64,
    /// Potencia máxima admisible en vatios. 0 = sin límite.
    pub max_power_watts: f32,
    /// Anulación explícita del tipo de medio detectado heurísticamente.
    pub media_type_override: Option<crate::media::MediaType>,
    /// Estrato de prioridad de la petición.
    pub priority: RequestPriority,
    /// Mapa opaco de directivas propietarias del cliente.
    pub custom_directives: HashMap<String, String>,
}

impl RequestAnnotations {
    /// Determina si el cliente fijó un backend objetivo explícito.
    #[must_use]
    pub fn has_explicit_target(&self) -> bool {
        !self.target_backend.is_empty() && self.target_backend != "auto"
    }
}
