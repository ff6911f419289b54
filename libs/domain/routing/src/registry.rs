// [libs/domain/routing/src/registry.rs]
/*!
 * =================================================================
 * APARATO: SILICON BACKEND REGISTRY (V9.0 - ONE-SHOT SEAL)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PROPIEDAD EXCLUSIVA DE HANDLES DE SILICIO
 *
 * # Logic:
 * Mapa id -> handle bajo RwLock: lecturas paralelas, registro
 * exclusivo y de un solo disparo. Los consumidores reciben Arc
 * compartidos no propietarios; el orden de iteración no es contrato.
 * El apagado recorre las unidades en orden de registro e invoca el
 * contrato de parada de cada una.
 * =================================================================
 */

use crate::contract::ComputeBackend;
use crate::errors::RoutingError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument, warn};

/// Interior sincronizado del registro: mapa de unidades + orden de alta.
struct RegistryInterior {
    registered_units: HashMap<String, Arc<dyn ComputeBackend>>,
    registration_order: Vec<String>,
}

/// Registro propietario de todas las unidades de cómputo del gateway.
pub struct BackendRegistry {
    interior: RwLock<RegistryInterior>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interior: RwLock::new(RegistryInterior {
                registered_units: HashMap::new(),
                registration_order: Vec::new(),
            }),
        }
    }

    /**
     * Registra una unidad de silicio. Operación de un solo disparo.
     *
     * # Errors:
     * - `RegisterConflict` si el identificador ya fue sellado.
     */
    #[instrument(skip(self, backend_unit), fields(unit = %backend_unit.identifier()))]
    pub fn register(&self, backend_unit: Arc<dyn ComputeBackend>) -> Result<(), RoutingError> {
        let unit_identifier = backend_unit.identifier().to_string();
        let mut interior_guard = self.interior.write().expect("REGISTRY_LOCK_POISONED");

        if interior_guard.registered_units.contains_key(&unit_identifier) {
            warn!("⛔ [REGISTRY_CONFLICT]: Unit [{}] attempted double registration.", unit_identifier);
            return Err(RoutingError::RegisterConflict {
                backend_identifier: unit_identifier,
            });
        }

        info!(
            "🔌 [REGISTRY]: Unit [{}] ({}) sealed into the silicon pool.",
            unit_identifier,
            backend_unit.hardware_class()
        );
        interior_guard.registration_order.push(unit_identifier.clone());
        interior_guard.registered_units.insert(unit_identifier, backend_unit);
        Ok(())
    }

    /// Recupera una referencia compartida a la unidad, si existe.
    #[must_use]
    pub fn get(&self, backend_identifier: &str) -> Option<Arc<dyn ComputeBackend>> {
        let interior_guard = self.interior.read().expect("REGISTRY_LOCK_POISONED");
        interior_guard.registered_units.get(backend_identifier).cloned()
    }

    /// Instantánea de todas las unidades registradas.
    /// El orden retornado no forma parte del contrato.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn ComputeBackend>> {
        let interior_guard = self.interior.read().expect("REGISTRY_LOCK_POISONED");
        interior_guard
            .registration_order
            .iter()
            .filter_map(|unit_identifier| interior_guard.registered_units.get(unit_identifier).cloned())
            .collect()
    }

    /// Cantidad de unidades registradas.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        let interior_guard = self.interior.read().expect("REGISTRY_LOCK_POISONED");
        interior_guard.registered_units.len()
    }

    /// Sondeo de salud de todo el pool: id -> bit de salud.
    #[must_use]
    pub fn health_check_all(&self) -> HashMap<String, bool> {
        let unit_snapshot = self.list();
        unit_snapshot
            .into_iter()
            .map(|backend_unit| (backend_unit.identifier().to_string(), backend_unit.is_healthy()))
            .collect()
    }

    /**
     * Apagado ordenado del pool: invoca el contrato de parada de cada
     * unidad en su orden de registro. Las referencias se toman como
     * instantánea fuera del lock antes de la primera llamada asíncrona.
     */
    #[instrument(skip(self))]
    pub async fn shutdown_all(&self) {
        let unit_snapshot = self.list();
        for backend_unit in unit_snapshot {
            info!("🔻 [REGISTRY]: Stopping unit [{}].", backend_unit.identifier());
            backend_unit.shutdown().await;
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
