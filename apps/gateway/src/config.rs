// [apps/gateway/src/config.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY CONFIGURATION (V11.0 - TOPOLOGY MANIFEST)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CAPTURA DE ENTORNO Y MANIFIESTO DE TOPOLOGÍA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ENV SOVEREIGNTY: Las coordenadas del proceso (puerto, ruta del
 *    manifiesto, conmutador de reenvío) se hidratan desde el entorno
 *    con defaults operativos.
 * 2. DECLARATIVE SILICON: La topología de unidades, los umbrales
 *    térmicos y la cascada de reenvío viven en un manifiesto JSON
 *    validado con errores semánticos ricos antes de la ignición.
 * =================================================================
 */

use serde::Deserialize;
use std::path::Path;
use synapse_domain_models::ThermalConfig;
use synapse_domain_routing::{ForwardingConfig, RouterConfig};
use synapse_infra_ollama::OllamaBackendConfig;
use tokio::fs;
use tracing::info;

/// Peso por defecto de la brecha de prioridades en la cola.
fn default_queue_gap_weight() -> f64 {
    1.0
}

/// Coordenadas del proceso capturadas del entorno.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Puerto TCP de la superficie RPC.
    pub listening_port: u16,
    /// Ruta del manifiesto de topología de silicio.
    pub topology_manifest_path: String,
    /// El camino de generación usa la cascada de reenvío por defecto.
    pub forwarding_enabled: bool,
}

impl GatewayConfig {
    /// Hidrata la configuración desde el entorno del proceso.
    #[must_use]
    pub fn from_environment() -> Self {
        let listening_port = std::env::var("SYNAPSE_GATEWAY_PORT")
            .unwrap_or_else(|_| "11500".to_string())
            .parse()
            .unwrap_or(11500);

        let topology_manifest_path = std::env::var("SYNAPSE_TOPOLOGY_FILE")
            .unwrap_or_else(|_| "config/topology.json".to_string());

        let forwarding_enabled = std::env::var("SYNAPSE_FORWARDING_ENABLED")
            .map(|raw_flag| raw_flag != "0" && raw_flag.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            listening_port,
            topology_manifest_path,
            forwarding_enabled,
        }
    }
}

/// Manifiesto declarativo de la topología de silicio del host.
#[derive(Debug, Clone, Deserialize)]
pub struct SiliconTopologyManifest {
    /// Umbrales térmicos del proceso.
    #[serde(default)]
    pub thermal: ThermalConfig,
    /// Configuración de la cascada de reenvío.
    #[serde(default)]
    pub forwarding: ForwardingConfig,
    /// Conmutadores del scorer.
    #[serde(default)]
    pub router: RouterConfig,
    /// Peso de la brecha de prioridades de la cola.
    #[serde(default = "default_queue_gap_weight")]
    pub queue_priority_gap_weight: f64,
    /// Unidades de silicio declaradas del host.
    pub backends: Vec<OllamaBackendConfig>,
}

impl SiliconTopologyManifest {
    /**
     * Carga y valida el manifiesto de topología.
     *
     * # Errors:
     * Retorna error semántico rico si el fichero está ausente, el JSON
     * deriva del esquema o la topología declara cero unidades.
     */
    pub async fn load(manifest_path: &str) -> anyhow::Result<Self> {
        let manifest_file_path = Path::new(manifest_path);
        if !manifest_file_path.exists() {
            return Err(anyhow::anyhow!(
                "TOPOLOGY_MANIFEST_VOID: [{}] is missing. Check SYNAPSE_TOPOLOGY_FILE.",
                manifest_path
            ));
        }

        let manifest_content = fs::read_to_string(manifest_file_path)
            .await
            .map_err(|io_fault| anyhow::anyhow!("IO_READ_FAULT: {}", io_fault))?;

        let parsed_manifest: Self = serde_json::from_str(&manifest_content)
            .map_err(|parsing_fault| {
                anyhow::anyhow!("MANIFEST_CORRUPTION: Schema drift in JSON -> {}", parsing_fault)
            })?;

        if parsed_manifest.backends.is_empty() {
            return Err(anyhow::anyhow!(
                "TOPOLOGY_VOID: Manifest declares zero silicon units."
            ));
        }

        info!(
            "📜 [CONFIG]: Topology manifest acquired: {} unit(s) declared.",
            parsed_manifest.backends.len()
        );
        Ok(parsed_manifest)
    }
}
