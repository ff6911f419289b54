// [libs/infra/backend-ollama/src/wire.rs]
/*!
 * =================================================================
 * APARATO: OLLAMA WIRE PAYLOADS (V5.0 - NDJSON PARITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DTOs DE CABLE DEL PROTOCOLO OLLAMA
 *
 * # Logic:
 * El protocolo reporta duraciones en nanosegundos; la conversión a
 * milisegundos vive aquí para que el dominio jamás vea unidades crudas.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use synapse_domain_routing::GenerationStats;

/// Payload de generación (unaria o streaming según `stream`).
#[derive(Debug, Serialize)]
pub struct GeneratePayload<'request> {
    pub model: &'request str,
    pub prompt: &'request str,
    pub stream: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub options: &'request HashMap<String, serde_json::Value>,
}

/// Fragmento de respuesta de generación. En modo unario llega uno
/// solo con `done = true`; en streaming, una línea NDJSON por token.
#[derive(Debug, Deserialize)]
pub struct GenerateFragment {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    /// Duración total en nanosegundos, presente en el fragmento final.
    #[serde(default)]
    pub total_duration: u64,
    /// Tokens evaluados, presente en el fragmento final.
    #[serde(default)]
    pub eval_count: u64,
}

impl GenerateFragment {
    /// Métricas del dominio a partir del fragmento final.
    #[must_use]
    pub fn final_stats(&self) -> GenerationStats {
        GenerationStats {
            total_duration_milliseconds: self.total_duration / 1_000_000,
            evaluated_token_count: self.eval_count,
        }
    }
}

/// Payload de embeddings.
#[derive(Debug, Serialize)]
pub struct EmbeddingsPayload<'request> {
    pub model: &'request str,
    pub prompt: &'request str,
}

/// Respuesta de embeddings.
#[derive(Debug, Deserialize)]
pub struct EmbeddingsEnvelope {
    #[serde(default)]
    pub embedding: Vec<f32>,
}
