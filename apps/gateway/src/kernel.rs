// [apps/gateway/src/kernel.rs]
/**
 * =================================================================
 * APARATO: GATEWAY SOVEREIGN KERNEL (V16.0 - SILICON IGNITION)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los estratos: carga
 * el manifiesto de topología, cristaliza el registro de silicio, lanza
 * los daemons de biometría y levanta el transporte HTTP. El apagado
 * ordenado recorre el registro invocando el contrato de parada de cada
 * unidad en su orden de alta.
 * =================================================================
 */

use crate::bootstrap::Bootstrap;
use crate::config::{GatewayConfig, SiliconTopologyManifest};
use crate::routes::create_sovereign_router;
use crate::state::AppState;
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use synapse_domain_models::HardwareClass;
use synapse_domain_routing::{
    BackendRegistry, ForwardingEngine, HeuristicConfidenceEstimator, InferenceRouter, QueueTracker,
    ThermalMonitor, ThermalProbe,
};
use synapse_infra_ollama::OllamaBackend;
use synapse_infra_sensors::{LmSensorsProbe, NvidiaSmiProbe, SysfsThermalProbe};
use tracing::{error, info, instrument};

pub struct GatewayKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
    registered_units: Vec<Arc<OllamaBackend>>,
}

impl GatewayKernel {
    /**
     * Realiza la ignición del núcleo: manifiesto, registro, biometría.
     * Un manifiesto corrupto o una topología vacía abortan el proceso.
     */
    #[instrument(skip(gateway_config))]
    pub async fn ignite(gateway_config: &GatewayConfig) -> Self {
        let topology_manifest = SiliconTopologyManifest::load(&gateway_config.topology_manifest_path)
            .await
            .expect("FATAL: Topology manifest collapse. Ignition aborted.");

        // --- 1. ESTRATOS HOJA: COLAS Y BIOMETRÍA TÉRMICA ---
        let queue_tracker = Arc::new(QueueTracker::with_gap_weight(
            topology_manifest.queue_priority_gap_weight,
        ));

        let platform_probes = Self::assemble_platform_probes(&topology_manifest);
        let thermal_monitor = Arc::new(ThermalMonitor::new(
            topology_manifest.thermal.clone(),
            platform_probes,
        ));

        // --- 2. REGISTRO DE SILICIO (TOPOLOGÍA DECLARATIVA) ---
        let registry = Arc::new(BackendRegistry::new());
        let registered_units = Bootstrap::crystallize_topology(&registry, &topology_manifest)
            .expect("FATAL: Silicon topology crystallization failed. Ignition aborted.");

        // --- 3. ESTRATOS DE DECISIÓN: SCORER Y CASCADA ---
        let inference_router = Arc::new(InferenceRouter::new(
            Arc::clone(&registry),
            Arc::clone(&thermal_monitor),
            Arc::clone(&queue_tracker),
            topology_manifest.router,
        ));

        let forwarding_engine = Arc::new(ForwardingEngine::new(
            Arc::clone(&registry),
            Arc::clone(&thermal_monitor),
            Arc::clone(&queue_tracker),
            Arc::new(HeuristicConfidenceEstimator),
            topology_manifest.forwarding.clone(),
        ));

        Self {
            server_network_port: gateway_config.listening_port,
            application_shared_state: AppState {
                registry,
                queue_tracker,
                thermal_monitor,
                inference_router,
                forwarding_engine,
                forwarding_enabled: gateway_config.forwarding_enabled,
            },
            registered_units,
        }
    }

    /// Ensambla una sonda de plataforma por clase de silicio declarada.
    fn assemble_platform_probes(
        topology_manifest: &SiliconTopologyManifest,
    ) -> Vec<Arc<dyn ThermalProbe>> {
        let declared_classes: HashSet<HardwareClass> = topology_manifest
            .backends
            .iter()
            .map(|unit_config| unit_config.hardware)
            .collect();

        declared_classes
            .into_iter()
            .map(|hardware_class| -> Arc<dyn ThermalProbe> {
                match hardware_class {
                    HardwareClass::Nvidia => Arc::new(NvidiaSmiProbe::new()),
                    HardwareClass::Cpu => Arc::new(LmSensorsProbe::new()),
                    other_class => Arc::new(SysfsThermalProbe::new(other_class)),
                }
            })
            .collect()
    }

    /**
     * Lanza los daemons autónomos y el servidor HTTP principal.
     * La señal Ctrl-C dispara el apagado ordenado del registro.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. DAEMON DE BIOMETRÍA TÉRMICA ---
        shared_application_state.thermal_monitor.spawn_monitor_daemon();

        // --- 2. DAEMONS DE SALUD POR UNIDAD DE SILICIO ---
        for silicon_unit in &self.registered_units {
            silicon_unit.spawn_health_daemon();
        }

        // --- 3. DIAGNÓSTICO DE ARRANQUE (NO BLOQUEANTE) ---
        Bootstrap::spawn_diagnostics(self.registered_units.clone());

        // --- 4. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let sovereign_router = create_sovereign_router(shared_application_state.clone());

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().expect("CRITICAL_FAULT: Invalid bind address."),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Synapse Gateway listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        let shutdown_state = shared_application_state.clone();
        let serve_outcome = axum::serve(tcp_listener, sovereign_router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("🔻 [KERNEL]: Shutdown signal received; stopping silicon pool.");
                shutdown_state.registry.shutdown_all().await;
            })
            .await;

        if let Err(server_error) = serve_outcome {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}
