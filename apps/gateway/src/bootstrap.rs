// [apps/gateway/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: SILICON BOOTSTRAP (V13.0 - TOPOLOGY CRYSTALLIZER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CRISTALIZACIÓN DEL REGISTRO Y DIAGNÓSTICO INICIAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE-SHOT SEAL: Cada unidad declarada se construye y registra una
 *    única vez; un identificador duplicado en el manifiesto aborta la
 *    ignición con un error semántico.
 * 2. NON-BLOCKING DIAGNOSTICS: El sondeo de salud inicial corre en un
 *    hilo secundario de Tokio para que la superficie RPC responda de
 *    inmediato mientras concluye la auditoría.
 * =================================================================
 */

use crate::config::SiliconTopologyManifest;
use std::sync::Arc;
use synapse_domain_routing::{BackendRegistry, ComputeBackend};
use synapse_infra_ollama::OllamaBackend;
use tracing::{info, instrument, warn};

/// Autoridad de arranque de la topología de silicio.
pub struct Bootstrap;

impl Bootstrap {
    /**
     * Construye y registra todas las unidades declaradas del manifiesto.
     *
     * # Errors:
     * Retorna error si un glob de modelo es inválido, el cliente HTTP
     * colapsa en construcción o un identificador está duplicado.
     */
    #[instrument(skip(registry, topology_manifest))]
    pub fn crystallize_topology(
        registry: &Arc<BackendRegistry>,
        topology_manifest: &SiliconTopologyManifest,
    ) -> anyhow::Result<Vec<Arc<OllamaBackend>>> {
        let mut crystallized_units = Vec::with_capacity(topology_manifest.backends.len());

        for unit_config in &topology_manifest.backends {
            let unit_identifier = unit_config.backend_identifier.clone();
            let silicon_unit = Arc::new(OllamaBackend::from_config(unit_config.clone())?);

            registry
                .register(silicon_unit.clone())
                .map_err(|registration_fault| {
                    anyhow::anyhow!(
                        "TOPOLOGY_CONFLICT: Unit [{}] rejected: {}",
                        unit_identifier,
                        registration_fault
                    )
                })?;

            crystallized_units.push(silicon_unit);
        }

        info!(
            "🔌 [BOOTSTRAP]: {} silicon unit(s) crystallized into the registry.",
            crystallized_units.len()
        );
        Ok(crystallized_units)
    }

    /**
     * Lanza la auditoría de salud inicial en un hilo secundario.
     *
     * # Logic:
     * Sondea cada unidad una vez y publica el censo de disponibilidad.
     * Las unidades oscuras no abortan la ignición: el scorer las
     * filtrará por su bit de salud hasta que el daemon las recupere.
     */
    #[instrument(skip(silicon_units))]
    pub fn spawn_diagnostics(silicon_units: Vec<Arc<OllamaBackend>>) {
        tokio::spawn(async move {
            info!("🩺 [BOOTSTRAP]: Initiating silicon availability census...");

            let mut reachable_count = 0usize;
            for silicon_unit in &silicon_units {
                if silicon_unit.probe_health().await {
                    reachable_count += 1;
                } else {
                    warn!(
                        "🌑 [BOOTSTRAP]: Unit [{}] is dark at ignition; health daemon will retry.",
                        silicon_unit.identifier()
                    );
                }
            }

            info!(
                "✅ [BOOTSTRAP]: Census sealed: {}/{} unit(s) reachable.",
                reachable_count,
                silicon_units.len()
            );
        });
    }
}
