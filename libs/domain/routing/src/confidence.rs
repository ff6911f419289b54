// [libs/domain/routing/src/confidence.rs]
/*!
 * =================================================================
 * APARATO: CONFIDENCE ESTIMATOR (V9.0 - VEREDICTO DETERMINISTA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ESTIMACIÓN DE CONFIANZA DE RESPUESTAS Y PROMPTS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BLACK BOX CONTRACT: El motor de reenvío solo consume el escalar
 *    global; las etiquetas y el razonamiento son para el operador.
 * 2. PURE W.R.T. INPUTS: Mismo (prompt, respuesta, modelo, unidad)
 *    produce el mismo veredicto. Sin reloj, sin azar.
 * 3. PROSPECTIVE MODE: El modo streaming exige un veredicto previo a
 *    la respuesta; se estima desde (prompt, modelo, silicio) solamente.
 * =================================================================
 */

use crate::contract::ComputeBackend;
use synapse_domain_models::{ConfidenceScore, HardwareClass};

/// Marcadores de modelos de gama pequeña (despachables a NPU).
const SMALL_MODEL_MARKERS: [&str; 4] = ["0.5b", "1.5b", "tiny", "mini"];
/// Marcadores de modelos de gama media.
const MEDIUM_MODEL_MARKERS: [&str; 3] = ["3b", "7b", "8b"];
/// Frases de cobertura que deprimen la confianza de una respuesta.
const HEDGING_PHRASES: [&str; 4] = ["i'm not sure", "i cannot", "as an ai", "i don't know"];

/// Estimador de confianza sobre respuestas producidas y prompts previos.
pub trait ConfidenceEstimator: Send + Sync {
    /// Veredicto sobre una respuesta ya producida.
    fn estimate(
        &self,
        prompt: &str,
        response_text: &str,
        model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore;

    /// Veredicto prospectivo (modo streaming): solo prompt y modelo.
    fn estimate_for_prompt(
        &self,
        prompt: &str,
        model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore;
}

/// Estimador heurístico determinista de serie del gateway.
pub struct HeuristicConfidenceEstimator;

impl HeuristicConfidenceEstimator {
    /// Gama del modelo según sus marcadores nominales: 0 pequeña,
    /// 1 media, 2 grande (sin marcador se asume grande).
    fn model_size_class(lowercase_model: &str) -> u8 {
        if SMALL_MODEL_MARKERS.iter().any(|marker| lowercase_model.contains(marker)) {
            0
        } else if MEDIUM_MODEL_MARKERS.iter().any(|marker| lowercase_model.contains(marker)) {
            1
        } else {
            2
        }
    }

    /// Proporción de palabras únicas de la respuesta (detección de
    /// degeneración repetitiva).
    fn unique_word_ratio(response_text: &str) -> (usize, f32) {
        let words: Vec<&str> = response_text.split_whitespace().collect();
        if words.is_empty() {
            return (0, 1.0);
        }
        let mut seen_words = std::collections::HashSet::new();
        for word in &words {
            seen_words.insert(*word);
        }
        (words.len(), seen_words.len() as f32 / words.len() as f32)
    }
}

impl ConfidenceEstimator for HeuristicConfidenceEstimator {
    fn estimate(
        &self,
        prompt: &str,
        response_text: &str,
        model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore {
        let lowercase_model = model_name.to_lowercase();
        let lowercase_response = response_text.to_lowercase();

        let mut overall_confidence = 0.9_f32;
        let mut uncertainty_tags: Vec<String> = Vec::new();

        // 1. RESPUESTA VACÍA: veredicto casi nulo inmediato.
        if response_text.trim().is_empty() {
            return ConfidenceScore::sealed(
                0.05,
                vec!["empty_response".to_string()],
                "Backend produced an empty response",
            );
        }

        // 2. SALIDA TRUNCADA ante un prompt sustancial.
        if response_text.len() < 16 && prompt.len() > 64 {
            overall_confidence -= 0.25;
            uncertainty_tags.push("truncated_output".to_string());
        }

        // 3. LENGUAJE DE COBERTURA (hedging).
        if HEDGING_PHRASES.iter().any(|phrase| lowercase_response.contains(phrase)) {
            overall_confidence -= 0.2;
            uncertainty_tags.push("hedging_language".to_string());
        }

        // 4. DEGENERACIÓN REPETITIVA.
        let (word_count, unique_ratio) = Self::unique_word_ratio(response_text);
        if word_count > 20 && unique_ratio < 0.3 {
            overall_confidence -= 0.3;
            uncertainty_tags.push("degenerate_repetition".to_string());
        }

        // 5. TENSIÓN DE MODELO PEQUEÑO ante prompts largos.
        if Self::model_size_class(&lowercase_model) == 0 && prompt.len() > 1500 {
            overall_confidence -= 0.15;
            uncertainty_tags.push("small_model_strain".to_string());
        }

        // 6. BONIFICACIÓN DE SILICIO DE ALTA CAPACIDAD.
        if matches!(
            backend.hardware_class(),
            HardwareClass::Nvidia | HardwareClass::DiscreteGpu
        ) {
            overall_confidence += 0.05;
        }

        let reasoning_sentence = if uncertainty_tags.is_empty() {
            format!("Response from [{}] shows no uncertainty markers", backend.identifier())
        } else {
            format!(
                "Response from [{}] depressed by: {}",
                backend.identifier(),
                uncertainty_tags.join(", ")
            )
        };

        ConfidenceScore::sealed(overall_confidence, uncertainty_tags, reasoning_sentence)
    }

    fn estimate_for_prompt(
        &self,
        prompt: &str,
        model_name: &str,
        backend: &dyn ComputeBackend,
    ) -> ConfidenceScore {
        let lowercase_model = model_name.to_lowercase();
        let mut uncertainty_tags: Vec<String> = Vec::new();

        // Base por gama de modelo.
        let mut prospective_confidence = match Self::model_size_class(&lowercase_model) {
            0 => {
                uncertainty_tags.push("small_model_tier".to_string());
                0.75
            }
            1 => 0.85,
            _ => 0.92,
        };

        // Los prompts voluminosos castigan a la gama pequeña.
        if Self::model_size_class(&lowercase_model) == 0 && prompt.len() > 1500 {
            prospective_confidence -= 0.2;
            uncertainty_tags.push("small_model_strain".to_string());
        }

        // El fallback CPU es funcional pero de menor fidelidad percibida.
        if matches!(backend.hardware_class(), HardwareClass::Cpu) {
            prospective_confidence -= 0.05;
            uncertainty_tags.push("cpu_fallback_tier".to_string());
        }

        ConfidenceScore::sealed(
            prospective_confidence,
            uncertainty_tags,
            format!(
                "Prospective estimate for model [{}] on [{}]",
                model_name,
                backend.identifier()
            ),
        )
    }
}
