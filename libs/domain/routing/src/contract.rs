// [libs/domain/routing/src/contract.rs]
/*!
 * =================================================================
 * APARATO: SILICON CAPABILITY CONTRACT (V19.0 - STREAM SEALED)
 * CLASIFICACIÓN: DOMAIN CONTRACTS (ESTRATO L2)
 * RESPONSABILIDAD: TRAIT DE BACKEND HETEROGÉNEO Y OBJETO DE STREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. POLYMORPHIC DISPATCH: Un único trait para NPU, iGPU, dGPU y CPU;
 *    los implementadores anuncian soporte vía predicados booleanos y
 *    el motor trata lo no soportado como salto, jamás como fallo.
 * 2. CLOSE-HOOK DISCIPLINE: El stream de tokens porta ganchos de cierre
 *    idempotentes; la liberación de la cola se engancha aquí y dispara
 *    en cierre normal, cierre del llamador y colapso de construcción.
 * 3. NON-OWNING REFERENCES: El registro es el único propietario de los
 *    handles; el resto del núcleo transporta Arc compartidos.
 * =================================================================
 */

use crate::token::DispatchToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use synapse_domain_models::{BackendDescriptor, CapabilityMatrix, HardwareClass};
use thiserror::Error;
use tokio::sync::mpsc;

/// Fallos a nivel de contrato de un backend individual.
/// El motor de reenvío los recupera localmente; solo escalan si la
/// cascada completa se agota.
#[derive(Error, Debug)]
pub enum BackendFault {
    #[error("TRANSPORT_FAULT: Silicon uplink collapsed: {0}")]
    Transport(String),

    #[error("DECODE_FAULT: Backend emitted an undecodable payload: {0}")]
    Decode(String),

    #[error("OPERATION_UNSUPPORTED: Unit does not implement [{0}]")]
    OperationUnsupported(&'static str),

    #[error("DEADLINE_EXHAUSTED: Backend call exceeded the remaining dispatch budget")]
    DeadlineExhausted,

    #[error("DISPATCH_REVOKED: The client cancelled the dispatch token mid-flight")]
    Revoked,
}

/// Petición de generación unaria o streaming.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerateRequest {
    /// Prompt del cliente, transportado sin alteración.
    pub prompt: String,
    /// Nombre del modelo efectivo (posiblemente ya sustituido).
    pub model: String,
    /// Opciones propietarias del backend (temperatura, top_p, ...).
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Métricas de ejecución reportadas por el backend tras generar.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationStats {
    /// Duración total de la generación en milisegundos.
    pub total_duration_milliseconds: u64,
    /// Cantidad de tokens evaluados por el modelo.
    pub evaluated_token_count: u64,
}

/// Respuesta unaria de generación.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerateResponse {
    /// Texto completo producido por el modelo.
    pub response_text: String,
    /// Métricas de la pasada de generación.
    pub stats: GenerationStats,
}

/// Petición de embedding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedRequest {
    /// Texto a vectorizar.
    pub text: String,
    /// Modelo de embeddings solicitado.
    pub model: String,
}

/// Respuesta de embedding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmbedResponse {
    /// Vector denso de la representación semántica.
    pub embedding: Vec<f32>,
}

/// Fragmento individual de un stream de generación.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamChunk {
    /// Texto del token (o ráfaga de tokens) emitido.
    pub token_text: String,
    /// Marca de fin de stream; el fragmento final porta las métricas.
    pub is_final: bool,
    /// Métricas agregadas, presentes solo en el fragmento final.
    pub stats: Option<GenerationStats>,
}

/// Gancho de cierre de un stream. Consumido exactamente una vez.
type StreamCloseHook = Box<dyn FnOnce() + Send>;

/// Stream explícito de tokens con cierre idempotente.
///
/// El productor (adaptador HTTP) alimenta el canal desde una tarea
/// propia; el consumidor extrae con `recv`. Los ganchos de cierre se
/// drenan una única vez, tanto en cierre explícito como en Drop, por lo
/// que un segundo `close` es un no-op estructural.
pub struct TokenStream {
    chunk_receiver: mpsc::Receiver<Result<StreamChunk, BackendFault>>,
    close_hooks: Vec<StreamCloseHook>,
}

impl TokenStream {
    /// Construye el stream sobre un canal ya poblado por el productor.
    #[must_use]
    pub fn from_receiver(chunk_receiver: mpsc::Receiver<Result<StreamChunk, BackendFault>>) -> Self {
        Self {
            chunk_receiver,
            close_hooks: Vec::new(),
        }
    }

    /// Registra un gancho que dispara exactamente una vez al cerrar.
    /// La liberación del slot de cola del wrapper viaja por aquí.
    pub fn on_close(&mut self, close_hook: impl FnOnce() + Send + 'static) {
        self.close_hooks.push(Box::new(close_hook));
    }

    /// Extrae el siguiente fragmento. `None` sella el fin del stream.
    pub async fn recv(&mut self) -> Option<Result<StreamChunk, BackendFault>> {
        self.chunk_receiver.recv().await
    }

    /// Cierra el stream y dispara los ganchos pendientes.
    /// Idempotente: una segunda invocación no encuentra ganchos vivos.
    pub fn close(&mut self) {
        self.chunk_receiver.close();
        for pending_hook in self.close_hooks.drain(..) {
            pending_hook();
        }
    }
}

impl Drop for TokenStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TokenStream {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TokenStream")
            .field("pending_close_hooks", &self.close_hooks.len())
            .finish()
    }
}

/**
 * Contrato de capacidad de una unidad de cómputo heterogénea.
 *
 * El registro es el propietario exclusivo de cada handle; el resto del
 * núcleo consume referencias compartidas no propietarias. El bit de
 * salud muta vía atómicos internos del implementador; los atributos
 * estáticos jamás cambian tras el registro.
 */
#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Identificador estable de la unidad.
    fn identifier(&self) -> &str;

    /// Nombre humano de la unidad.
    fn display_name(&self) -> &str;

    /// Clase de silicio subyacente (clave del estado térmico).
    fn hardware_class(&self) -> HardwareClass;

    /// Bit de salud dinámico reportado por la propia unidad.
    fn is_healthy(&self) -> bool;

    /// Consumo nominal en vatios.
    fn nominal_power_watts(&self) -> f32;

    /// Latencia media nominal (o rodante) en milisegundos.
    fn average_latency_milliseconds(&self) -> u64;

    /// Rango de prioridad estática; mayor es preferido.
    fn priority_rank(&self) -> i32;

    /// Tamaño máximo de modelo admitido, en gigabytes.
    fn max_model_size_gigabytes(&self) -> f32;

    /// Predicado de compatibilidad de modelo (patrones glob, sin
    /// distinción de mayúsculas).
    fn supports_model(&self, model_name: &str) -> bool;

    /// Matriz de operaciones que la unidad implementa.
    fn capabilities(&self) -> CapabilityMatrix;

    /// Generación unaria.
    async fn generate(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendFault>;

    /// Generación en streaming. El stream retornado libera los recursos
    /// del lado del backend en su cierre idempotente.
    async fn generate_stream(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<TokenStream, BackendFault>;

    /// Vectorización de texto.
    async fn embed(
        &self,
        dispatch_token: &DispatchToken,
        request: &EmbedRequest,
    ) -> Result<EmbedResponse, BackendFault>;

    /// Contrato de parada: libera recursos de la unidad. Invocado por el
    /// registro durante el apagado, en orden de registro.
    async fn shutdown(&self);

    /// Descriptor de cable para la superficie de listado.
    fn describe(&self, pending_queue_depth: u64) -> BackendDescriptor {
        BackendDescriptor {
            backend_identifier: self.identifier().to_string(),
            display_name: self.display_name().to_string(),
            hardware: self.hardware_class(),
            is_healthy: self.is_healthy(),
            nominal_power_watts: self.nominal_power_watts(),
            nominal_latency_milliseconds: self.average_latency_milliseconds(),
            priority_rank: self.priority_rank(),
            max_model_size_gigabytes: self.max_model_size_gigabytes(),
            capabilities: self.capabilities(),
            pending_queue_depth,
        }
    }
}
