// [libs/infra/backend-ollama/src/client.rs]
/*!
 * =================================================================
 * APARATO: OLLAMA SILICON UPLINK (V14.0 - STREAM DISCIPLINE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: IMPLEMENTACIÓN DEL CONTRATO DE BACKEND SOBRE HTTP
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE ADAPTER, ALL SILICON: Cada acelerador (NPU vía OpenVINO
 *    server, iGPU, dGPU, CPU) expone su propio endpoint estilo Ollama;
 *    este adaptador sirve a todas las clases con configuración.
 * 2. TOKEN HONOUR: Toda llamada de red se acota al presupuesto
 *    restante del token de despacho; el motor jamás interrumpe a la
 *    fuerza.
 * 3. ROLLING BIOMETRY: Latencia rodante EMA y bit de salud atómico;
 *    los atributos estáticos jamás mutan tras el registro.
 *
 * # Mathematical Proof (EMA Latency):
 * latencia_nueva = (latencia_previa·3 + observada) / 4
 * El factor 3/4 amortigua picos transitorios preservando la señal de
 * degradación sostenida que consume el scorer.
 * =================================================================
 */

use crate::errors::AdapterError;
use crate::wire::{EmbeddingsEnvelope, EmbeddingsPayload, GenerateFragment, GeneratePayload};
use async_trait::async_trait;
use futures_util::StreamExt;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synapse_domain_models::{CapabilityMatrix, HardwareClass};
use synapse_domain_routing::{
    BackendFault, ComputeBackend, DispatchToken, EmbedRequest, EmbedResponse, GenerateRequest,
    GenerateResponse, StreamChunk, TokenStream,
};
use tracing::{debug, info, instrument, warn};

/// Capacidad del canal interno de fragmentos de streaming.
const STREAM_CHANNEL_CAPACITY: usize = 32;
/// Cadencia por defecto del daemon de sondeo de salud.
const HEALTH_PROBE_INTERVAL_SECONDS: u64 = 15;

/// Configuración declarativa de una unidad de silicio (manifiesto de
/// topología del gateway).
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaBackendConfig {
    /// Identificador estable de la unidad.
    pub backend_identifier: String,
    /// Nombre humano de la unidad.
    pub display_name: String,
    /// Clase de silicio subyacente.
    pub hardware: HardwareClass,
    /// Endpoint raíz del servidor de inferencia de la unidad.
    pub base_endpoint: String,
    /// Consumo nominal en vatios.
    pub nominal_power_watts: f32,
    /// Latencia media nominal en milisegundos.
    pub nominal_latency_milliseconds: u64,
    /// Rango de prioridad estática (mayor = preferido).
    pub priority_rank: i32,
    /// Tamaño máximo de modelo admitido en gigabytes.
    pub max_model_size_gigabytes: f32,
    /// Patrones glob de modelos soportados (sin distinción de caja).
    pub supported_model_patterns: Vec<String>,
    /// Matriz de capacidades anunciada.
    #[serde(default = "CapabilityMatrix::text_generation")]
    pub capabilities: CapabilityMatrix,
}

/// Unidad de cómputo sobre un servidor de inferencia estilo Ollama.
pub struct OllamaBackend {
    adapter_config: OllamaBackendConfig,
    model_pattern_matcher: GlobSet,
    http_client: reqwest::Client,
    health_flag: AtomicBool,
    rolling_latency_milliseconds: AtomicU64,
    observed_error_count: AtomicU64,
}

impl OllamaBackend {
    /**
     * Construye la unidad desde su configuración declarativa.
     *
     * # Errors:
     * - `PatternCompilation` ante un glob de modelo inválido.
     * - `ClientConstruction` ante fallo de ignición del cliente HTTP.
     */
    pub fn from_config(adapter_config: OllamaBackendConfig) -> Result<Self, AdapterError> {
        let mut pattern_set_builder = GlobSetBuilder::new();
        for model_pattern in &adapter_config.supported_model_patterns {
            pattern_set_builder.add(
                GlobBuilder::new(model_pattern)
                    .case_insensitive(true)
                    .build()?,
            );
        }
        let model_pattern_matcher = pattern_set_builder.build()?;

        let http_client = reqwest::Client::builder()
            .user_agent("Synapse-Gateway/V14")
            .build()?;

        Ok(Self {
            rolling_latency_milliseconds: AtomicU64::new(adapter_config.nominal_latency_milliseconds),
            adapter_config,
            model_pattern_matcher,
            http_client,
            health_flag: AtomicBool::new(true),
            observed_error_count: AtomicU64::new(0),
        })
    }

    /// Endpoint absoluto de una operación del protocolo.
    fn endpoint_for(&self, operation_path: &str) -> String {
        format!(
            "{}/{}",
            self.adapter_config.base_endpoint.trim_end_matches('/'),
            operation_path.trim_start_matches('/')
        )
    }

    /// Integra una latencia observada en la media rodante (EMA 3/4).
    fn record_observed_latency(&self, observed_milliseconds: u64) {
        let previous = self.rolling_latency_milliseconds.load(Ordering::Acquire);
        let updated = (previous * 3 + observed_milliseconds) / 4;
        self.rolling_latency_milliseconds.store(updated, Ordering::Release);
    }

    /// Registra un colapso de transporte en la biometría de errores.
    fn record_transport_fault(&self) {
        self.observed_error_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Colapsos de transporte acumulados desde la ignición.
    #[must_use]
    pub fn observed_error_count(&self) -> u64 {
        self.observed_error_count.load(Ordering::Acquire)
    }

    /// Barrera de admisión del token previa a toda llamada de red.
    fn admission_barrier(dispatch_token: &DispatchToken) -> Result<Duration, BackendFault> {
        if dispatch_token.is_revoked() {
            return Err(BackendFault::Revoked);
        }
        let remaining_budget = dispatch_token.remaining();
        if remaining_budget.is_zero() {
            return Err(BackendFault::DeadlineExhausted);
        }
        Ok(remaining_budget)
    }

    /// Traduce un fallo de reqwest al contrato del dominio.
    fn translate_transport_fault(network_fault: reqwest::Error) -> BackendFault {
        if network_fault.is_timeout() {
            BackendFault::DeadlineExhausted
        } else if network_fault.is_decode() {
            BackendFault::Decode(network_fault.to_string())
        } else {
            BackendFault::Transport(network_fault.to_string())
        }
    }

    /**
     * Sondea la salud de la unidad contra `/api/tags` y sella el bit.
     */
    #[instrument(skip(self), fields(unit = %self.adapter_config.backend_identifier))]
    pub async fn probe_health(&self) -> bool {
        let probe_outcome = self
            .http_client
            .get(self.endpoint_for("api/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        let is_reachable = matches!(&probe_outcome, Ok(response) if response.status().is_success());
        let was_healthy = self.health_flag.swap(is_reachable, Ordering::AcqRel);

        if was_healthy != is_reachable {
            if is_reachable {
                info!("💚 [UPLINK]: Unit [{}] recovered.", self.adapter_config.backend_identifier);
            } else {
                warn!("💔 [UPLINK]: Unit [{}] went dark.", self.adapter_config.backend_identifier);
            }
        }
        is_reachable
    }

    /// Lanza el daemon de sondeo de salud periódico de la unidad.
    pub fn spawn_health_daemon(self: &Arc<Self>) {
        let unit_reference = Arc::clone(self);
        tokio::spawn(async move {
            let mut probe_interval =
                tokio::time::interval(Duration::from_secs(HEALTH_PROBE_INTERVAL_SECONDS));
            loop {
                probe_interval.tick().await;
                unit_reference.probe_health().await;
            }
        });
    }
}

#[async_trait]
impl ComputeBackend for OllamaBackend {
    fn identifier(&self) -> &str {
        &self.adapter_config.backend_identifier
    }

    fn display_name(&self) -> &str {
        &self.adapter_config.display_name
    }

    fn hardware_class(&self) -> HardwareClass {
        self.adapter_config.hardware
    }

    fn is_healthy(&self) -> bool {
        self.health_flag.load(Ordering::Acquire)
    }

    fn nominal_power_watts(&self) -> f32 {
        self.adapter_config.nominal_power_watts
    }

    fn average_latency_milliseconds(&self) -> u64 {
        self.rolling_latency_milliseconds.load(Ordering::Acquire)
    }

    fn priority_rank(&self) -> i32 {
        self.adapter_config.priority_rank
    }

    fn max_model_size_gigabytes(&self) -> f32 {
        self.adapter_config.max_model_size_gigabytes
    }

    fn supports_model(&self, model_name: &str) -> bool {
        self.model_pattern_matcher.is_match(model_name)
    }

    fn capabilities(&self) -> CapabilityMatrix {
        self.adapter_config.capabilities
    }

    #[instrument(skip(self, dispatch_token, request), fields(unit = %self.identifier(), model = %request.model))]
    async fn generate(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendFault> {
        let remaining_budget = Self::admission_barrier(dispatch_token)?;
        let dispatch_started = tokio::time::Instant::now();

        let network_response = self
            .http_client
            .post(self.endpoint_for("api/generate"))
            .timeout(remaining_budget)
            .json(&GeneratePayload {
                model: &request.model,
                prompt: &request.prompt,
                stream: false,
                options: &request.options,
            })
            .send()
            .await
            .map_err(|network_fault| {
                self.record_transport_fault();
                Self::translate_transport_fault(network_fault)
            })?;

        if !network_response.status().is_success() {
            self.record_transport_fault();
            return Err(BackendFault::Transport(format!(
                "HTTP_{} from unit [{}]",
                network_response.status(),
                self.identifier()
            )));
        }

        let final_fragment: GenerateFragment = network_response
            .json()
            .await
            .map_err(|decode_fault| BackendFault::Decode(decode_fault.to_string()))?;

        let observed_latency = dispatch_started.elapsed().as_millis() as u64;
        self.record_observed_latency(observed_latency);
        debug!("⚡ [UPLINK]: Unit [{}] answered in {} ms.", self.identifier(), observed_latency);

        Ok(GenerateResponse {
            stats: final_fragment.final_stats(),
            response_text: final_fragment.response,
        })
    }

    /**
     * Streaming NDJSON: una tarea propia decodifica el cuerpo línea a
     * línea y alimenta el canal del stream del dominio. El cierre del
     * consumidor sella el canal; la tarea observa el fallo de envío y
     * abandona, liberando la conexión del lado del backend.
     */
    #[instrument(skip(self, dispatch_token, request), fields(unit = %self.identifier(), model = %request.model))]
    async fn generate_stream(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<TokenStream, BackendFault> {
        let remaining_budget = Self::admission_barrier(dispatch_token)?;

        let network_response = self
            .http_client
            .post(self.endpoint_for("api/generate"))
            .timeout(remaining_budget)
            .json(&GeneratePayload {
                model: &request.model,
                prompt: &request.prompt,
                stream: true,
                options: &request.options,
            })
            .send()
            .await
            .map_err(|network_fault| {
                self.record_transport_fault();
                Self::translate_transport_fault(network_fault)
            })?;

        if !network_response.status().is_success() {
            self.record_transport_fault();
            return Err(BackendFault::Transport(format!(
                "HTTP_{} from unit [{}]",
                network_response.status(),
                self.identifier()
            )));
        }

        let (chunk_sender, chunk_receiver) = tokio::sync::mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let unit_identifier = self.identifier().to_string();

        tokio::spawn(async move {
            let mut body_stream = network_response.bytes_stream();
            let mut line_assembly_buffer: Vec<u8> = Vec::new();

            'network: while let Some(body_segment) = body_stream.next().await {
                let body_bytes = match body_segment {
                    Ok(body_bytes) => body_bytes,
                    Err(segment_fault) => {
                        let _ = chunk_sender
                            .send(Err(BackendFault::Transport(segment_fault.to_string())))
                            .await;
                        break 'network;
                    }
                };

                line_assembly_buffer.extend_from_slice(&body_bytes);

                // Drenaje de líneas NDJSON completas del buffer de ensamblado.
                while let Some(newline_position) =
                    line_assembly_buffer.iter().position(|byte| *byte == b'\n')
                {
                    let raw_line: Vec<u8> =
                        line_assembly_buffer.drain(..=newline_position).collect();
                    let line_text = String::from_utf8_lossy(&raw_line);
                    let trimmed_line = line_text.trim();
                    if trimmed_line.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<GenerateFragment>(trimmed_line) {
                        Ok(fragment) => {
                            let is_final_fragment = fragment.done;
                            let outbound_chunk = StreamChunk {
                                token_text: fragment.response.clone(),
                                is_final: is_final_fragment,
                                stats: is_final_fragment.then(|| fragment.final_stats()),
                            };
                            if chunk_sender.send(Ok(outbound_chunk)).await.is_err() {
                                // El consumidor cerró el stream; abandonar.
                                debug!("🔌 [UPLINK_STREAM]: Consumer closed [{}].", unit_identifier);
                                break 'network;
                            }
                            if is_final_fragment {
                                break 'network;
                            }
                        }
                        Err(decode_fault) => {
                            let _ = chunk_sender
                                .send(Err(BackendFault::Decode(decode_fault.to_string())))
                                .await;
                            break 'network;
                        }
                    }
                }
            }
        });

        Ok(TokenStream::from_receiver(chunk_receiver))
    }

    #[instrument(skip(self, dispatch_token, request), fields(unit = %self.identifier(), model = %request.model))]
    async fn embed(
        &self,
        dispatch_token: &DispatchToken,
        request: &EmbedRequest,
    ) -> Result<EmbedResponse, BackendFault> {
        let remaining_budget = Self::admission_barrier(dispatch_token)?;

        let network_response = self
            .http_client
            .post(self.endpoint_for("api/embeddings"))
            .timeout(remaining_budget)
            .json(&EmbeddingsPayload {
                model: &request.model,
                prompt: &request.text,
            })
            .send()
            .await
            .map_err(|network_fault| {
                self.record_transport_fault();
                Self::translate_transport_fault(network_fault)
            })?;

        if !network_response.status().is_success() {
            self.record_transport_fault();
            return Err(BackendFault::Transport(format!(
                "HTTP_{} from unit [{}]",
                network_response.status(),
                self.identifier()
            )));
        }

        let embeddings_envelope: EmbeddingsEnvelope = network_response
            .json()
            .await
            .map_err(|decode_fault| BackendFault::Decode(decode_fault.to_string()))?;

        Ok(EmbedResponse {
            embedding: embeddings_envelope.embedding,
        })
    }

    async fn shutdown(&self) {
        self.health_flag.store(false, Ordering::Release);
        info!("🔻 [UPLINK]: Unit [{}] sealed for shutdown.", self.identifier());
    }
}
