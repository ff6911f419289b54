// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V6.1 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL VEREDICTO DE RUTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LOSSLESS DECISION: Valida que el roundtrip del RoutingDecision
 *    preserve backend, razón, potencia, latencia y alternativas.
 * 2. WIRE DEFAULTS: Un mapa de anotaciones vacío debe colapsar a los
 *    valores por defecto del contrato, jamás a un error de esquema.
 * 3. TAG STABILITY: Las etiquetas de clase de hardware son el contrato
 *    de clave del estado térmico; cualquier deriva es corrupción L2.
 * =================================================================
 */
