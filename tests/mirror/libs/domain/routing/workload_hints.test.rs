// [tests/mirror/libs/domain/routing/workload_hints.test.rs]
/**
 * =================================================================
 * APARATO: WORKLOAD HINTS CERTIFIER (V5.0 - DETERMINISM EVIDENCE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-ROUTING
 * RESPONSABILIDAD: VALIDACIÓN DEL DETECTOR PURO DE MODALIDAD
 * =================================================================
 */

use synapse_domain_models::{MediaType, RequestAnnotations};
use synapse_domain_routing::WorkloadDetector;

/**
 * CERTIFICACIÓN: Determinismo bit-perfecto del detector.
 */
#[test]
fn certify_detector_determinism() {
    let annotations = RequestAnnotations::default();
    let prompt = "Transcribe the attached voice memo and summarize the speaker's intent.";

    let first_pass = WorkloadDetector::hints(prompt, "llama3:8b", &annotations);
    let second_pass = WorkloadDetector::hints(prompt, "llama3:8b", &annotations);

    assert_eq!(first_pass, second_pass, "L2_DETERMINISM_COLLAPSE: hint drift detected.");
}

/**
 * CERTIFICACIÓN: La anulación explícita del cliente precede a toda
 * heurística léxica.
 */
#[test]
fn certify_explicit_override_precedes_heuristics() {
    let annotations = RequestAnnotations {
        media_type_override: Some(MediaType::Image),
        ..Default::default()
    };

    let hints = WorkloadDetector::hints("transcribe this speech", "llama3:8b", &annotations);
    assert_eq!(hints.detected_media_type, MediaType::Image);
    assert!(
        hints.reasoning_chain.iter().any(|line| line.contains("forced by client annotation")),
        "Reasoning must record the override."
    );
}

/**
 * CERTIFICACIÓN: Carga de voz contra modelo de texto produce el
 * sustituto canónico y la preferencia de bajo consumo.
 */
#[test]
fn certify_speech_workload_against_text_model() {
    let annotations = RequestAnnotations::default();
    let hints = WorkloadDetector::hints(
        "Please transcribe the spoken dictation from this recording.",
        "llama3:8b",
        &annotations,
    );

    assert_eq!(hints.detected_media_type, MediaType::Speech);
    assert_eq!(hints.preferred_model, "whisper-base");
    assert!(hints.prefer_low_power, "Speech workloads prefer low-power silicon.");
    assert!(!hints.reasoning_chain.is_empty());
}

/**
 * CERTIFICACIÓN: Un modelo ya capaz no dispara sustitución.
 */
#[test]
fn certify_capable_model_skips_substitution() {
    let annotations = RequestAnnotations::default();
    let hints = WorkloadDetector::hints(
        "Transcribe this speech sample accurately.",
        "whisper-base",
        &annotations,
    );

    assert_eq!(hints.detected_media_type, MediaType::Speech);
    assert!(hints.preferred_model.is_empty(), "Capable model must not be substituted.");
}

/**
 * CERTIFICACIÓN: Detección de código y sugerencia de modelo coder.
 */
#[test]
fn certify_code_workload_detection() {
    let annotations = RequestAnnotations::default();
    let prompt = "Refactor this function and explain the change:\n```\nfn main() { println!(\"hi\"); }\n```";
    let hints = WorkloadDetector::hints(prompt, "llama3:8b", &annotations);

    assert_eq!(hints.detected_media_type, MediaType::Code);
    assert_eq!(hints.preferred_model, "qwen2.5-coder:7b");
}

/**
 * CERTIFICACIÓN: Preferencias por longitud de prompt.
 */
#[test]
fn certify_length_driven_preferences() {
    let annotations = RequestAnnotations::default();

    let interactive_hints = WorkloadDetector::hints("hola", "llama3:8b", &annotations);
    assert_eq!(interactive_hints.detected_media_type, MediaType::Text);
    assert!(interactive_hints.prefer_low_latency, "Short prompts are interactive.");
    assert!(!interactive_hints.prefer_low_power);

    let batch_prompt = "resumen ".repeat(800);
    let batch_hints = WorkloadDetector::hints(&batch_prompt, "llama3:8b", &annotations);
    assert!(batch_hints.prefer_low_power, "Batch-sized prompts prefer low power.");
    assert!(!batch_hints.prefer_low_latency);
}
