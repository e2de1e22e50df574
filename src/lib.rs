// Public modules
pub mod config;
pub mod context;
pub mod domains;
pub mod errors;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod types;
pub mod validation;

pub use config::GraceConfig;
pub use context::ApplicationContext;

/// Initialize the server core: connect and migrate the state store,
/// wire the event bus, reminder service, read-model index, and actor
/// host, and return the context everything else hangs off.
/// This function must be called once, before any service is used.
pub async fn initialize(config: GraceConfig) -> errors::ServiceResult<ApplicationContext> {
    ApplicationContext::initialize(config).await
}

/// Install the process logger. Safe to call more than once; later
/// calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
