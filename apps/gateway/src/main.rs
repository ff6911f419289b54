// [apps/gateway/src/main.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY MAIN ENTRY POINT (V12.0 - SILICON IGNITION)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La cristalización de la topología de silicio ocurre antes de la
 * apertura del socket TCP, previniendo estados de carrera donde un
 * cliente solicite inferencia contra un registro aún vacío.
 * =================================================================
 */

use synapse_gateway::prelude::*;

use dotenvy::dotenv;
use synapse_shared_argus::init_tracing;
use tracing::info;

/**
 * Punto de ignición supremo del binario del Gateway.
 */
#[tokio::main]
async fn main() {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (ARGUS)
    init_tracing("synapse_gateway");

    info!("🛰️  [GATEWAY]: Global ignition sequence starting...");

    // 3. ADQUISICIÓN DE COORDENADAS Y CONSTRUCCIÓN DEL KERNEL
    let gateway_config = GatewayConfig::from_environment();
    let kernel_instance = GatewayKernel::ignite(&gateway_config).await;

    // 4. IGNICIÓN DE OPERACIONES (DAEMONS + TRANSPORTE HTTP)
    info!(
        "🚀 [SYNAPSE_ONLINE]: System fully operational on port {}.",
        kernel_instance.server_network_port
    );
    kernel_instance.launch_sovereign_operations().await;
}
