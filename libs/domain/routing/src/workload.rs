// [libs/domain/routing/src/workload.rs]
/*!
 * =================================================================
 * APARATO: WORKLOAD DETECTOR (V12.0 - HEURÍSTICA DETERMINISTA)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CLASIFICACIÓN DE MODALIDAD Y EMISIÓN DE PISTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE FUNCTION: Sin I/O, sin reloj, sin azar. Mismo (prompt,
 *    modelo, anotaciones) produce bit a bit las mismas pistas.
 * 2. OVERRIDE FIRST: La anotación explícita de modalidad precede a
 *    toda heurística de texto.
 * 3. FORENSIC TRAIL: Cada decisión anexa una línea legible al rastro
 *    de razonamiento que viaja hasta la respuesta final.
 * =================================================================
 */

use synapse_domain_models::{MediaType, RequestAnnotations, RoutingHints};

/// Longitud bajo la cual un prompt se considera interactivo.
const INTERACTIVE_PROMPT_CHARS: usize = 160;
/// Longitud sobre la cual un prompt se considera carga por lotes.
const BATCH_PROMPT_CHARS: usize = 4000;

/// Marcadores léxicos de voz humana (más específicos que audio genérico).
const SPEECH_MARKERS: [&str; 5] = ["transcribe", "speech", "voice", "spoken", "dictation"];
/// Marcadores léxicos de señal de audio genérica.
const AUDIO_MARKERS: [&str; 5] = ["audio", ".wav", ".mp3", ".flac", "waveform"];
/// Marcadores léxicos de imagen.
const IMAGE_MARKERS: [&str; 6] = ["image", "picture", "photo", ".png", ".jpg", "diagram"];
/// Marcadores léxicos de video.
const VIDEO_MARKERS: [&str; 5] = ["video", ".mp4", "footage", "frames", "clip"];
/// Marcadores léxicos de código fuente.
const CODE_MARKERS: [&str; 7] = ["```", "fn ", "def ", "class ", "refactor", "compile", "stack trace"];

/// Familias de modelo capaces por modalidad: si el modelo pedido no
/// pertenece a la familia de la modalidad detectada, se sugiere el
/// sustituto canónico.
const SPEECH_CAPABLE_MARKERS: [&str; 2] = ["whisper", "speech"];
const VISION_CAPABLE_MARKERS: [&str; 3] = ["llava", "vision", "vl"];
const CODE_CAPABLE_MARKERS: [&str; 3] = ["coder", "codellama", "starcoder"];

const CANONICAL_SPEECH_MODEL: &str = "whisper-base";
const CANONICAL_VISION_MODEL: &str = "llava:7b";
const CANONICAL_CODE_MODEL: &str = "qwen2.5-coder:7b";

/// Detector puro de carga de trabajo.
pub struct WorkloadDetector;

impl WorkloadDetector {
    /**
     * Deriva las pistas de enrutamiento de una petición.
     *
     * Orden de resolución de modalidad: anulación explícita del
     * cliente, luego heurística léxica sobre el prompt (voz antes que
     * audio genérico), finalmente texto por longitud.
     */
    #[must_use]
    pub fn hints(
        prompt: &str,
        requested_model: &str,
        annotations: &RequestAnnotations,
    ) -> RoutingHints {
        let mut routing_hints = RoutingHints::default();
        let lowercase_prompt = prompt.to_lowercase();
        let lowercase_model = requested_model.to_lowercase();

        // --- FASE 1: RESOLUCIÓN DE MODALIDAD ---
        routing_hints.detected_media_type = match annotations.media_type_override {
            Some(override_media_type) => {
                routing_hints.push_reasoning(format!(
                    "Media type forced by client annotation: {:?}",
                    override_media_type
                ));
                override_media_type
            }
            None => Self::classify_prompt(&lowercase_prompt, &mut routing_hints),
        };

        // --- FASE 2: SUGERENCIA DE MODELO POR DESAJUSTE DE MODALIDAD ---
        let preferred_substitute = match routing_hints.detected_media_type {
            MediaType::Speech | MediaType::Audio
                if !Self::model_matches_family(&lowercase_model, &SPEECH_CAPABLE_MARKERS) =>
            {
                Some(CANONICAL_SPEECH_MODEL)
            }
            MediaType::Image | MediaType::Video
                if !Self::model_matches_family(&lowercase_model, &VISION_CAPABLE_MARKERS) =>
            {
                Some(CANONICAL_VISION_MODEL)
            }
            MediaType::Code
                if !Self::model_matches_family(&lowercase_model, &CODE_CAPABLE_MARKERS) =>
            {
                Some(CANONICAL_CODE_MODEL)
            }
            _ => None,
        };

        if let Some(substitute_model) = preferred_substitute {
            routing_hints.preferred_model = substitute_model.to_string();
            routing_hints.push_reasoning(format!(
                "Requested model [{}] mismatches {:?} workload; suggesting [{}]",
                requested_model, routing_hints.detected_media_type, substitute_model
            ));
        }

        // --- FASE 3: PREFERENCIAS DE LATENCIA Y POTENCIA POR LONGITUD ---
        let prompt_length = prompt.chars().count();
        if prompt_length < INTERACTIVE_PROMPT_CHARS {
            routing_hints.prefer_low_latency = true;
            routing_hints.push_reasoning(format!(
                "Short interactive prompt ({} chars); preferring low latency",
                prompt_length
            ));
        } else if prompt_length > BATCH_PROMPT_CHARS {
            routing_hints.prefer_low_power = true;
            routing_hints.push_reasoning(format!(
                "Batch-sized prompt ({} chars); preferring low power",
                prompt_length
            ));
        }

        // Las cargas de voz son el territorio natural del silicio NPU.
        if matches!(routing_hints.detected_media_type, MediaType::Speech) {
            routing_hints.prefer_low_power = true;
            routing_hints.push_reasoning("Speech workload; preferring low-power silicon".to_string());
        }

        routing_hints
    }

    /// Heurística léxica de modalidad sobre el prompt en minúsculas.
    fn classify_prompt(lowercase_prompt: &str, routing_hints: &mut RoutingHints) -> MediaType {
        let marker_table: [(&[&str], MediaType); 5] = [
            (&SPEECH_MARKERS, MediaType::Speech),
            (&AUDIO_MARKERS, MediaType::Audio),
            (&VIDEO_MARKERS, MediaType::Video),
            (&IMAGE_MARKERS, MediaType::Image),
            (&CODE_MARKERS, MediaType::Code),
        ];

        for (markers, media_type) in marker_table {
            if let Some(matched_marker) = markers.iter().find(|marker| lowercase_prompt.contains(**marker)) {
                routing_hints.push_reasoning(format!(
                    "Detected media type: {:?} (marker \"{}\")",
                    media_type,
                    matched_marker.trim()
                ));
                return media_type;
            }
        }

        routing_hints.push_reasoning("Detected media type: text (no modality markers)".to_string());
        MediaType::Text
    }

    /// El modelo pedido pertenece a la familia capaz de la modalidad.
    fn model_matches_family(lowercase_model: &str, family_markers: &[&str]) -> bool {
        family_markers.iter().any(|marker| lowercase_model.contains(marker))
    }
}
