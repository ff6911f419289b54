// [apps/gateway/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GATEWAY LIBRARY MANIFEST (V9.0)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LOS ESTRATOS DEL GATEWAY
 * =================================================================
 */

pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod kernel;
pub mod routes;
pub mod state;

pub mod prelude {
    pub use crate::config::GatewayConfig;
    pub use crate::kernel::GatewayKernel;
    pub use crate::state::AppState;
}
