// [libs/domain/models/src/confidence.rs]
/*!
 * =================================================================
 * APARATO: CONFIDENCE SCORE CONTRACT (V5.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: VEREDICTO DE CONFIANZA DE UNA RESPUESTA GENERADA
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Veredicto de confianza sobre una respuesta producida por un backend.
///
/// El escalar global vive en [0.0, 1.0]; las etiquetas de incertidumbre
/// nombran los factores que lo deprimieron y el razonamiento condensa
/// el veredicto en una sola frase para el operador.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScore {
    /// Confianza global normalizada en [0.0, 1.0].
    pub overall: f32,
    /// Etiquetas nominales de incertidumbre detectadas.
    pub uncertainty_tags: Vec<String>,
    /// Justificación de una frase del veredicto.
    pub reasoning: String,
}

impl ConfidenceScore {
    /// Construye un veredicto sellando el escalar dentro de [0.0, 1.0].
    #[must_use]
    pub fn sealed(overall: f32, uncertainty_tags: Vec<String>, reasoning: impl Into<String>) -> Self {
        Self {
            overall: overall.clamp(0.0, 1.0),
            uncertainty_tags,
            reasoning: reasoning.into(),
        }
    }

    /// Veredicto de certeza máxima sin incertidumbres.
    #[must_use]
    pub fn certain(reasoning: impl Into<String>) -> Self {
        Self::sealed(1.0, Vec::new(), reasoning)
    }
}
