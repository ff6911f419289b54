// [libs/domain/routing/src/queue_tracker.rs]
/*!
 * =================================================================
 * APARATO: PRIORITY QUEUE TRACKER (V15.0 - GUARD DISCIPLINE)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONTABILIDAD EN VUELO POR (BACKEND, PRIORIDAD)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INVARIANT SEAL: pending = Σ contadores de prioridad; un doble
 *    release sella a cero y registra advertencia, jamás colapsa.
 * 2. GUARD DISCIPLINE: El wrapper marca inicio antes del despacho y
 *    garantiza el cierre en TODO camino de retorno (éxito, fallo,
 *    unwind) mediante un guard con Drop. El camino streaming engancha
 *    la liberación al cierre idempotente del stream.
 * 3. WEIGHTED VIEW: La profundidad ponderada es la vista del scorer;
 *    cada petición pendiente pesa según la brecha de prioridades.
 *
 * # Mathematical Proof (Weighted Depth):
 * Para prioridad consultante p y pendiente q con peso K:
 *   contribución = 1 + (p − q)·K        cuando p > q
 *   contribución = max(1, 1 − (q − p)·K) en caso contrario
 * La suma es estrictamente creciente en p mientras la rama de sellado
 * inferior permanezca inactiva (contenido en estratos ≤ p).
 * =================================================================
 */

use crate::contract::{
    BackendFault, ComputeBackend, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse,
    TokenStream,
};
use crate::token::DispatchToken;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use synapse_domain_models::RequestPriority;
use tracing::{debug, warn};

/// Peso por defecto de la brecha de prioridades.
const DEFAULT_PRIORITY_GAP_WEIGHT: f64 = 1.0;

/// Contadores en vuelo de un backend individual.
///
/// El total pendiente es atómico para lecturas O(1); el desglose por
/// prioridad vive bajo un Mutex pequeño que mantiene la consistencia
/// entre el total y los cubos durante cada transición.
struct QueueEntry {
    pending_total: AtomicU64,
    priority_buckets: Mutex<[u64; RequestPriority::LEVEL_COUNT]>,
}

impl QueueEntry {
    fn new() -> Self {
        Self {
            pending_total: AtomicU64::new(0),
            priority_buckets: Mutex::new([0; RequestPriority::LEVEL_COUNT]),
        }
    }
}

/// Contabilidad de despachos en vuelo para el scoring equitativo.
pub struct QueueTracker {
    priority_gap_weight: f64,
    entries: RwLock<HashMap<String, Arc<QueueEntry>>>,
}

impl QueueTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_gap_weight(DEFAULT_PRIORITY_GAP_WEIGHT)
    }

    /// Tracker con un peso de brecha de prioridades explícito.
    #[must_use]
    pub fn with_gap_weight(priority_gap_weight: f64) -> Self {
        Self {
            priority_gap_weight,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Recupera (o crea) la entrada de contadores de un backend.
    fn entry_for(&self, backend_identifier: &str) -> Arc<QueueEntry> {
        {
            let entries_guard = self.entries.read().expect("QUEUE_LOCK_POISONED");
            if let Some(existing_entry) = entries_guard.get(backend_identifier) {
                return Arc::clone(existing_entry);
            }
        }
        let mut entries_guard = self.entries.write().expect("QUEUE_LOCK_POISONED");
        Arc::clone(
            entries_guard
                .entry(backend_identifier.to_string())
                .or_insert_with(|| Arc::new(QueueEntry::new())),
        )
    }

    /// Marca el inicio de un despacho: incrementa el total pendiente y
    /// el cubo de la prioridad en una única sección crítica.
    pub fn mark_start(&self, backend_identifier: &str, priority: RequestPriority) {
        let queue_entry = self.entry_for(backend_identifier);
        let mut buckets_guard = queue_entry.priority_buckets.lock().expect("QUEUE_LOCK_POISONED");
        buckets_guard[priority.as_index()] += 1;
        queue_entry.pending_total.fetch_add(1, Ordering::AcqRel);
        debug!("📈 [QUEUE]: Unit [{}] +1 at {:?}.", backend_identifier, priority);
    }

    /// Marca el fin de un despacho. Un decremento que fuera a cruzar
    /// cero se sella en cero y emite advertencia: jamás falla.
    pub fn mark_end(&self, backend_identifier: &str, priority: RequestPriority) {
        let queue_entry = self.entry_for(backend_identifier);
        let mut buckets_guard = queue_entry.priority_buckets.lock().expect("QUEUE_LOCK_POISONED");

        let priority_bucket = &mut buckets_guard[priority.as_index()];
        if *priority_bucket == 0 {
            warn!(
                "⚠️ [QUEUE_UNDERFLOW]: Unit [{}] double-release at {:?}; sealing at zero.",
                backend_identifier, priority
            );
        } else {
            *priority_bucket -= 1;
        }

        let previous_total = queue_entry.pending_total.load(Ordering::Acquire);
        if previous_total == 0 {
            warn!(
                "⚠️ [QUEUE_UNDERFLOW]: Unit [{}] pending total already zero; sealing.",
                backend_identifier
            );
        } else {
            queue_entry.pending_total.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Profundidad cruda: total de peticiones en vuelo del backend.
    #[must_use]
    pub fn raw_depth(&self, backend_identifier: &str) -> u64 {
        let entries_guard = self.entries.read().expect("QUEUE_LOCK_POISONED");
        entries_guard
            .get(backend_identifier)
            .map(|queue_entry| queue_entry.pending_total.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Desglose por prioridad [BestEffort, Normal, High, Critical].
    #[must_use]
    pub fn priority_breakdown(&self, backend_identifier: &str) -> [u64; RequestPriority::LEVEL_COUNT] {
        let entries_guard = self.entries.read().expect("QUEUE_LOCK_POISONED");
        entries_guard
            .get(backend_identifier)
            .map(|queue_entry| *queue_entry.priority_buckets.lock().expect("QUEUE_LOCK_POISONED"))
            .unwrap_or([0; RequestPriority::LEVEL_COUNT])
    }

    /**
     * Profundidad ponderada desde la perspectiva de una prioridad
     * consultante: la vista que consume el scorer.
     */
    #[must_use]
    pub fn weighted_depth(&self, backend_identifier: &str, asking_priority: RequestPriority) -> f64 {
        let breakdown = self.priority_breakdown(backend_identifier);
        let asking_rank = asking_priority.rank();

        let mut weighted_total = 0.0_f64;
        for (bucket_index, pending_count) in breakdown.iter().enumerate() {
            if *pending_count == 0 {
                continue;
            }
            let pending_rank = RequestPriority::from_index(bucket_index).rank();
            let rank_gap = asking_rank - pending_rank;

            let per_request_weight = if rank_gap > 0 {
                1.0 + rank_gap as f64 * self.priority_gap_weight
            } else {
                (1.0 - (-rank_gap) as f64 * self.priority_gap_weight).max(1.0)
            };

            weighted_total += per_request_weight * *pending_count as f64;
        }
        weighted_total
    }
}

impl Default for QueueTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard de slot de cola: marca inicio al adquirirse y garantiza el
/// cierre exactamente una vez, incluso ante unwind del despacho.
pub struct QueueSlotGuard {
    queue_tracker: Arc<QueueTracker>,
    backend_identifier: String,
    priority: RequestPriority,
    released: AtomicBool,
}

impl QueueSlotGuard {
    /// Adquiere el slot: ejecuta `mark_start` inmediatamente.
    #[must_use]
    pub fn acquire(
        queue_tracker: Arc<QueueTracker>,
        backend_identifier: &str,
        priority: RequestPriority,
    ) -> Self {
        queue_tracker.mark_start(backend_identifier, priority);
        Self {
            queue_tracker,
            backend_identifier: backend_identifier.to_string(),
            priority,
            released: AtomicBool::new(false),
        }
    }

    /// Libera el slot. Idempotente: la segunda invocación es un no-op.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.queue_tracker.mark_end(&self.backend_identifier, self.priority);
    }
}

impl Drop for QueueSlotGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/**
 * Wrapper de despacho retornado por el enrutador.
 *
 * Toda unidad elegida viaja envuelta aquí: el camino unario adquiere el
 * guard antes del despacho y lo libera en todo camino de retorno; el
 * camino streaming transfiere el guard al gancho de cierre del stream,
 * que dispara en cierre normal, cierre del llamador y colapso de
 * construcción. El wrapper porta una referencia no propietaria al
 * tracker, jamás al motor.
 */
pub struct TrackedBackend {
    inner_unit: Arc<dyn ComputeBackend>,
    queue_tracker: Arc<QueueTracker>,
    priority: RequestPriority,
}

impl TrackedBackend {
    #[must_use]
    pub fn new(
        inner_unit: Arc<dyn ComputeBackend>,
        queue_tracker: Arc<QueueTracker>,
        priority: RequestPriority,
    ) -> Self {
        Self {
            inner_unit,
            queue_tracker,
            priority,
        }
    }

    /// Referencia compartida a la unidad envuelta.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn ComputeBackend> {
        &self.inner_unit
    }

    /// Identificador de la unidad envuelta.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.inner_unit.identifier()
    }

    /// Generación unaria con contabilidad garantizada.
    pub async fn generate(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendFault> {
        let slot_guard = QueueSlotGuard::acquire(
            Arc::clone(&self.queue_tracker),
            self.inner_unit.identifier(),
            self.priority,
        );
        let dispatch_outcome = self.inner_unit.generate(dispatch_token, request).await;
        slot_guard.release();
        dispatch_outcome
    }

    /// Embedding con contabilidad garantizada.
    pub async fn embed(
        &self,
        dispatch_token: &DispatchToken,
        request: &EmbedRequest,
    ) -> Result<EmbedResponse, BackendFault> {
        let slot_guard = QueueSlotGuard::acquire(
            Arc::clone(&self.queue_tracker),
            self.inner_unit.identifier(),
            self.priority,
        );
        let dispatch_outcome = self.inner_unit.embed(dispatch_token, request).await;
        slot_guard.release();
        dispatch_outcome
    }

    /**
     * Generación en streaming. El slot se libera vía gancho de cierre:
     * si la construcción del stream colapsa, el guard se libera aquí
     * mismo por Drop antes de propagar el fallo.
     */
    pub async fn generate_stream(
        &self,
        dispatch_token: &DispatchToken,
        request: &GenerateRequest,
    ) -> Result<TokenStream, BackendFault> {
        let slot_guard = QueueSlotGuard::acquire(
            Arc::clone(&self.queue_tracker),
            self.inner_unit.identifier(),
            self.priority,
        );

        match self.inner_unit.generate_stream(dispatch_token, request).await {
            Ok(mut token_stream) => {
                token_stream.on_close(move || slot_guard.release());
                Ok(token_stream)
            }
            Err(construction_fault) => Err(construction_fault),
        }
    }
}
