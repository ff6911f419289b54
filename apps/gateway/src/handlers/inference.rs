// [apps/gateway/src/handlers/inference.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE HANDLER (V18.0 - DUAL PATH)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: SUPERFICIE RPC DE GENERACIÓN Y EMBEDDINGS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL PATH: El camino de generación usa la cascada de reenvío por
 *    confianza; un objetivo explícito del cliente (o el conmutador de
 *    proceso) colapsa al scorer directo.
 * 2. FORENSIC ENVELOPE: Toda respuesta transporta la cadena de
 *    razonamiento completa (detector + scorer/cascada) y los resúmenes
 *    de intentos para la auditoría del operador.
 * 3. NDJSON STREAMING: El stream de tokens viaja como cuerpo NDJSON;
 *    la desconexión del cliente cierra el stream del dominio, cuyo
 *    gancho idempotente libera el slot de cola.
 * =================================================================
 */

use crate::handlers::wire_errors::routing_error_response;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use synapse_domain_models::{AttemptSummary, ConfidenceScore, RequestAnnotations, RoutingDecision};
use synapse_domain_routing::{
    ComputeBackend, DispatchToken, EmbedRequest, GenerateRequest, GenerationStats, RoutingError,
    TokenStream, TrackedBackend, WorkloadDetector,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument};
use uuid::Uuid;

/// Capacidad del canal de líneas NDJSON hacia el cliente.
const NDJSON_LINE_CHANNEL_CAPACITY: usize = 32;

/// Payload de cable de una petición de generación.
#[derive(Debug, Deserialize)]
pub struct GeneratePayload {
    pub prompt: String,
    pub model: String,
    /// Directivas del cliente; un mapa ausente colapsa a defaults.
    #[serde(default)]
    pub annotations: RequestAnnotations,
    /// Deadline explícito en milisegundos. 0 = default del sistema (30 s).
    #[serde(default)]
    pub deadline_milliseconds: u64,
}

/// Sobre de respuesta de generación con rastro forense completo.
#[derive(Debug, Serialize)]
pub struct GenerateEnvelope {
    pub request_identifier: String,
    pub response_text: String,
    pub backend_identifier: String,
    pub forwarded: bool,
    pub total_attempts: u64,
    pub total_latency_milliseconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceScore>,
    pub attempts: Vec<AttemptSummary>,
    pub reasoning_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<RoutingDecision>,
}

/// Payload de cable de una petición de embeddings.
#[derive(Debug, Deserialize)]
pub struct EmbedPayload {
    pub text: String,
    pub model: String,
    #[serde(default)]
    pub annotations: RequestAnnotations,
    #[serde(default)]
    pub deadline_milliseconds: u64,
}

/// Sobre de respuesta de embeddings.
#[derive(Debug, Serialize)]
pub struct EmbedEnvelope {
    pub request_identifier: String,
    pub embedding: Vec<f32>,
    pub backend_identifier: String,
    pub reasoning_chain: Vec<String>,
    pub decision: RoutingDecision,
}

/// Línea NDJSON individual del stream de generación.
#[derive(Debug, Serialize)]
struct StreamLineEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_identifier: Option<String>,
    token: String,
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<GenerationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct InferenceHandler;

impl InferenceHandler {
    /// Token de despacho desde el deadline de cable (0 = default).
    fn dispatch_token_for(deadline_milliseconds: u64) -> DispatchToken {
        if deadline_milliseconds == 0 {
            DispatchToken::with_default_deadline()
        } else {
            DispatchToken::with_deadline(Duration::from_millis(deadline_milliseconds))
        }
    }

    /**
     * Endpoint: POST /api/v1/inference/generate
     *
     * Camino por defecto: cascada de reenvío por confianza. Un objetivo
     * explícito (o el conmutador de proceso apagado) colapsa al scorer
     * directo con despacho único.
     */
    #[instrument(skip(application_state, request_payload), fields(model = %request_payload.model))]
    pub async fn handle_generate(
        State(application_state): State<AppState>,
        Json(request_payload): Json<GeneratePayload>,
    ) -> Response {
        let request_identifier = Uuid::new_v4().to_string();
        let dispatch_token = Self::dispatch_token_for(request_payload.deadline_milliseconds);

        let routing_hints = WorkloadDetector::hints(
            &request_payload.prompt,
            &request_payload.model,
            &request_payload.annotations,
        );

        let use_forwarding_cascade = application_state.forwarding_enabled
            && !request_payload.annotations.has_explicit_target();

        if use_forwarding_cascade {
            let cascade_outcome = application_state
                .forwarding_engine
                .generate_with_forwarding(
                    &dispatch_token,
                    &request_payload.prompt,
                    &request_payload.model,
                    &request_payload.annotations,
                )
                .await;

            return match cascade_outcome {
                Ok(cascade_result) => {
                    let mut reasoning_chain = routing_hints.reasoning_chain.clone();
                    reasoning_chain.extend(cascade_result.reasoning_chain.clone());

                    Json(GenerateEnvelope {
                        request_identifier,
                        response_text: cascade_result.final_response_text.clone().unwrap_or_default(),
                        backend_identifier: cascade_result
                            .final_backend_identifier
                            .clone()
                            .unwrap_or_default(),
                        forwarded: cascade_result.forwarded,
                        total_attempts: cascade_result.total_attempts,
                        total_latency_milliseconds: cascade_result.total_latency_milliseconds,
                        confidence: cascade_result.final_confidence.clone(),
                        attempts: cascade_result.attempt_summaries(),
                        reasoning_chain,
                        decision: None,
                    })
                    .into_response()
                }
                Err(routing_fault) => routing_error_response(&routing_fault).into_response(),
            };
        }

        // --- CAMINO DIRECTO: SCORER + DESPACHO ÚNICO ---
        if let Err(admission_fault) = dispatch_token.ensure_active() {
            return routing_error_response(&admission_fault).into_response();
        }

        let ranked_selection = match application_state.inference_router.select_backend(
            &request_payload.model,
            &request_payload.annotations,
            &routing_hints,
        ) {
            Ok(ranked_selection) => ranked_selection,
            Err(routing_fault) => return routing_error_response(&routing_fault).into_response(),
        };

        let tracked_unit = TrackedBackend::new(
            Arc::clone(&ranked_selection.backend),
            Arc::clone(&application_state.queue_tracker),
            request_payload.annotations.priority,
        );

        let generate_request = GenerateRequest {
            prompt: request_payload.prompt.clone(),
            model: ranked_selection.effective_model.clone(),
            options: Default::default(),
        };

        let dispatch_started = tokio::time::Instant::now();
        match tracked_unit.generate(&dispatch_token, &generate_request).await {
            Ok(generate_response) => {
                info!(
                    "✨ [INFERENCE]: Direct dispatch sealed on [{}].",
                    ranked_selection.decision.backend_identifier
                );
                Json(GenerateEnvelope {
                    request_identifier,
                    response_text: generate_response.response_text,
                    backend_identifier: ranked_selection.decision.backend_identifier.clone(),
                    forwarded: false,
                    total_attempts: 1,
                    total_latency_milliseconds: dispatch_started.elapsed().as_millis() as u64,
                    confidence: None,
                    attempts: Vec::new(),
                    reasoning_chain: ranked_selection.decision.reasoning_chain.clone(),
                    decision: Some(ranked_selection.decision),
                })
                .into_response()
            }
            Err(transport_fault) => {
                let routing_fault = RoutingError::BackendTransport {
                    backend_identifier: ranked_selection.decision.backend_identifier.clone(),
                    cause: transport_fault.to_string(),
                };
                routing_error_response(&routing_fault).into_response()
            }
        }
    }

    /**
     * Endpoint: POST /api/v1/inference/generate/stream
     *
     * Selección comprometida por adelantado; el cuerpo de la respuesta
     * es NDJSON (una línea por fragmento, preámbulo con la unidad).
     */
    #[instrument(skip(application_state, request_payload), fields(model = %request_payload.model))]
    pub async fn handle_generate_stream(
        State(application_state): State<AppState>,
        Json(request_payload): Json<GeneratePayload>,
    ) -> Response {
        let dispatch_token = Self::dispatch_token_for(request_payload.deadline_milliseconds);

        let routing_hints = WorkloadDetector::hints(
            &request_payload.prompt,
            &request_payload.model,
            &request_payload.annotations,
        );

        let use_forwarding_cascade = application_state.forwarding_enabled
            && !request_payload.annotations.has_explicit_target();

        let (token_stream, backend_identifier) = if use_forwarding_cascade {
            match application_state
                .forwarding_engine
                .generate_stream_with_forwarding(
                    &dispatch_token,
                    &request_payload.prompt,
                    &request_payload.model,
                    &request_payload.annotations,
                )
                .await
            {
                Ok((token_stream, committed_unit)) => {
                    (token_stream, committed_unit.identifier().to_string())
                }
                Err(routing_fault) => return routing_error_response(&routing_fault).into_response(),
            }
        } else {
            if let Err(admission_fault) = dispatch_token.ensure_active() {
                return routing_error_response(&admission_fault).into_response();
            }

            let ranked_selection = match application_state.inference_router.select_backend(
                &request_payload.model,
                &request_payload.annotations,
                &routing_hints,
            ) {
                Ok(ranked_selection) => ranked_selection,
                Err(routing_fault) => return routing_error_response(&routing_fault).into_response(),
            };

            let tracked_unit = TrackedBackend::new(
                Arc::clone(&ranked_selection.backend),
                Arc::clone(&application_state.queue_tracker),
                request_payload.annotations.priority,
            );

            let generate_request = GenerateRequest {
                prompt: request_payload.prompt.clone(),
                model: ranked_selection.effective_model.clone(),
                options: Default::default(),
            };

            match tracked_unit.generate_stream(&dispatch_token, &generate_request).await {
                Ok(token_stream) => {
                    (token_stream, ranked_selection.decision.backend_identifier.clone())
                }
                Err(transport_fault) => {
                    let routing_fault = RoutingError::BackendTransport {
                        backend_identifier: ranked_selection.decision.backend_identifier.clone(),
                        cause: transport_fault.to_string(),
                    };
                    return routing_error_response(&routing_fault).into_response();
                }
            }
        };

        info!("🌊 [INFERENCE_STREAM]: Streaming from [{}].", backend_identifier);
        let ndjson_body = Self::ndjson_body_from_stream(token_stream, backend_identifier);

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/x-ndjson")
            .body(ndjson_body)
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }

    /**
     * Bombea el stream del dominio hacia un cuerpo NDJSON.
     *
     * La desconexión del cliente cierra el canal de líneas; la tarea de
     * bombeo observa el fallo de envío y cierra el stream del dominio,
     * disparando el gancho idempotente que libera el slot de cola.
     */
    fn ndjson_body_from_stream(mut token_stream: TokenStream, backend_identifier: String) -> Body {
        let (line_sender, line_receiver) =
            tokio::sync::mpsc::channel::<Result<Vec<u8>, std::convert::Infallible>>(
                NDJSON_LINE_CHANNEL_CAPACITY,
            );

        tokio::spawn(async move {
            // Preámbulo: anuncia la unidad comprometida.
            let preamble = StreamLineEnvelope {
                backend_identifier: Some(backend_identifier),
                token: String::new(),
                done: false,
                stats: None,
                error: None,
            };
            if Self::send_ndjson_line(&line_sender, &preamble).await.is_err() {
                token_stream.close();
                return;
            }

            while let Some(chunk_outcome) = token_stream.recv().await {
                let outbound_line = match chunk_outcome {
                    Ok(stream_chunk) => StreamLineEnvelope {
                        backend_identifier: None,
                        token: stream_chunk.token_text,
                        done: stream_chunk.is_final,
                        stats: stream_chunk.stats,
                        error: None,
                    },
                    Err(stream_fault) => StreamLineEnvelope {
                        backend_identifier: None,
                        token: String::new(),
                        done: true,
                        stats: None,
                        error: Some(stream_fault.to_string()),
                    },
                };

                let is_final_line = outbound_line.done;
                if Self::send_ndjson_line(&line_sender, &outbound_line).await.is_err() {
                    break;
                }
                if is_final_line {
                    break;
                }
            }

            // Cierre idempotente: libera el slot de cola y el backend.
            token_stream.close();
        });

        Body::from_stream(ReceiverStream::new(line_receiver))
    }

    /// Serializa y envía una línea NDJSON individual.
    async fn send_ndjson_line(
        line_sender: &tokio::sync::mpsc::Sender<Result<Vec<u8>, std::convert::Infallible>>,
        line_envelope: &StreamLineEnvelope,
    ) -> Result<(), ()> {
        let Ok(mut serialized_line) = serde_json::to_vec(line_envelope) else {
            return Err(());
        };
        serialized_line.push(b'\n');
        line_sender.send(Ok(serialized_line)).await.map_err(|_| ())
    }

    /**
     * Endpoint: POST /api/v1/inference/embed
     *
     * Los embeddings no participan de la cascada de confianza: el
     * scorer directo elige la unidad y el wrapper contabiliza.
     */
    #[instrument(skip(application_state, request_payload), fields(model = %request_payload.model))]
    pub async fn handle_embed(
        State(application_state): State<AppState>,
        Json(request_payload): Json<EmbedPayload>,
    ) -> Response {
        let request_identifier = Uuid::new_v4().to_string();
        let dispatch_token = Self::dispatch_token_for(request_payload.deadline_milliseconds);

        if let Err(admission_fault) = dispatch_token.ensure_active() {
            return routing_error_response(&admission_fault).into_response();
        }

        let routing_hints = WorkloadDetector::hints(
            &request_payload.text,
            &request_payload.model,
            &request_payload.annotations,
        );

        let ranked_selection = match application_state.inference_router.select_backend(
            &request_payload.model,
            &request_payload.annotations,
            &routing_hints,
        ) {
            Ok(ranked_selection) => ranked_selection,
            Err(routing_fault) => return routing_error_response(&routing_fault).into_response(),
        };

        let tracked_unit = TrackedBackend::new(
            Arc::clone(&ranked_selection.backend),
            Arc::clone(&application_state.queue_tracker),
            request_payload.annotations.priority,
        );

        let embed_request = EmbedRequest {
            text: request_payload.text.clone(),
            model: ranked_selection.effective_model.clone(),
        };

        match tracked_unit.embed(&dispatch_token, &embed_request).await {
            Ok(embed_response) => Json(EmbedEnvelope {
                request_identifier,
                embedding: embed_response.embedding,
                backend_identifier: ranked_selection.decision.backend_identifier.clone(),
                reasoning_chain: ranked_selection.decision.reasoning_chain.clone(),
                decision: ranked_selection.decision,
            })
            .into_response(),
            Err(transport_fault) => {
                let routing_fault = RoutingError::BackendTransport {
                    backend_identifier: ranked_selection.decision.backend_identifier.clone(),
                    cause: transport_fault.to_string(),
                };
                routing_error_response(&routing_fault).into_response()
            }
        }
    }
}
