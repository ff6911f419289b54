// [libs/domain/routing/src/errors.rs]
/*!
 * =================================================================
 * APARATO: ROUTING ERROR TAXONOMY (V10.0 - CASCADE AWARE)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN CERRADA DE FALLOS DE ENRUTAMIENTO
 *
 * # Logic:
 * Suma cerrada: los consumidores disciernen por variante, jamás por la
 * forma textual del mensaje. El agotamiento de la cascada transporta el
 * resultado parcial completo para el diagnóstico del operador. El
 * underflow de cola NO tiene variante: se registra y se sella a cero
 * sin escalar, conforme a la disciplina del tracker.
 * =================================================================
 */

use crate::forwarding::ForwardingResult;
use thiserror::Error;

/// Taxonomía cerrada de fallos del núcleo de enrutamiento.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// Ningún backend sobrevivió al pipeline de filtrado.
    #[error("NO_BACKENDS_MATCH: {healthy_count}/{total_registered} healthy units, none satisfies constraints {remaining_constraints:?}")]
    NoBackendsMatch {
        /// Unidades registradas en el instante del filtrado.
        total_registered: usize,
        /// Unidades con bit de salud activo.
        healthy_count: usize,
        /// Restricciones aún activas cuando el conjunto quedó vacío.
        remaining_constraints: Vec<String>,
    },

    /// Ningún silicio acepta el modelo pedido ni su sustituto preferido.
    #[error("MODEL_UNSUPPORTED: No unit accepts model [{model_name}] (substitution attempted: {attempted_substitution:?})")]
    ModelUnsupported {
        /// Modelo originalmente solicitado por el cliente.
        model_name: String,
        /// Modelo sustituto que también fue rechazado, si se intentó.
        attempted_substitution: Option<String>,
    },

    /// El backend objetivo explícito no existe en el registro.
    #[error("BACKEND_NOT_FOUND: Unit [{backend_identifier}] is not registered")]
    BackendNotFound {
        backend_identifier: String,
    },

    /// Colapso de transporte contra una unidad concreta. El motor de
    /// reenvío lo recupera localmente; solo escala fuera de la cascada.
    #[error("BACKEND_TRANSPORT: Unit [{backend_identifier}] collapsed: {cause}")]
    BackendTransport {
        backend_identifier: String,
        cause: String,
    },

    /// La cascada de reenvío se agotó sin intento rescatable. El
    /// resultado parcial viaja con el error para diagnóstico.
    #[error("ALL_BACKENDS_FAILED: Forwarding cascade exhausted with no viable attempt")]
    AllBackendsFailed {
        partial_result: Box<ForwardingResult>,
    },

    /// Revocación explícita del token de despacho. Jamás se reintenta.
    #[error("DISPATCH_CANCELLED: The client revoked the dispatch token")]
    Cancelled,

    /// El deadline global de la petición expiró. Jamás se reintenta.
    #[error("DEADLINE_EXCEEDED: The routing deadline elapsed before completion")]
    DeadlineExceeded,

    /// Doble registro del mismo identificador de backend.
    #[error("REGISTER_CONFLICT: Unit [{backend_identifier}] is already registered")]
    RegisterConflict {
        backend_identifier: String,
    },
}

impl RoutingError {
    /// El fallo es terminal para la petición (no recuperable dentro de
    /// la iteración de la cascada).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::BackendTransport { .. })
    }
}
