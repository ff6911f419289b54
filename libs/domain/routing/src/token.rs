// [libs/domain/routing/src/token.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH TOKEN (V6.0 - DEADLINE SOBERANO)
 * CLASIFICACIÓN: DOMAIN CONTRACTS (ESTRATO L2)
 * RESPONSABILIDAD: SEÑAL DE CANCELACIÓN COOPERATIVA CON DEADLINE
 *
 * # Logic:
 * Cada punto de entrada del núcleo acepta un token con deadline (30 s
 * por defecto cuando el llamador no fija uno). El motor lo consulta
 * antes de cada intento y antes del scoring; una revocación aborta el
 * bucle sin interrumpir forzosamente la llamada en vuelo, que debe
 * honrar el token por sí misma vía el presupuesto restante.
 * =================================================================
 */

use crate::errors::RoutingError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline por defecto cuando el cliente no aporta uno.
const DEFAULT_DEADLINE_SECONDS: u64 = 30;

/// Señal de cancelación cooperativa compartida entre el motor, los
/// wrappers de cola y los adaptadores de backend.
#[derive(Clone, Debug)]
pub struct DispatchToken {
    /// Instante absoluto en que el presupuesto de la petición expira.
    deadline: Instant,
    /// Bandera de revocación explícita del cliente.
    revocation_flag: Arc<AtomicBool>,
}

impl DispatchToken {
    /// Token con el deadline por defecto del sistema (30 s).
    #[must_use]
    pub fn with_default_deadline() -> Self {
        Self::with_deadline(Duration::from_secs(DEFAULT_DEADLINE_SECONDS))
    }

    /// Token con un presupuesto explícito a partir de ahora.
    #[must_use]
    pub fn with_deadline(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
            revocation_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Revoca el token. Todos los clones observan la revocación.
    pub fn revoke(&self) {
        self.revocation_flag.store(true, Ordering::Release);
    }

    /// La revocación explícita fue señalizada.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revocation_flag.load(Ordering::Acquire)
    }

    /// El deadline absoluto ya fue superado.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Presupuesto restante, sellado a cero cuando ya expiró.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Barrera de admisión: falla con el error semántico correcto si el
    /// token ya no autoriza trabajo adicional.
    ///
    /// # Errors:
    /// - `RoutingError::Cancelled` ante revocación explícita.
    /// - `RoutingError::DeadlineExceeded` ante expiración del presupuesto.
    pub fn ensure_active(&self) -> Result<(), RoutingError> {
        if self.is_revoked() {
            return Err(RoutingError::Cancelled);
        }
        if self.is_expired() {
            return Err(RoutingError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for DispatchToken {
    fn default() -> Self {
        Self::with_default_deadline()
    }
}
