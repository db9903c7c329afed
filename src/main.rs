use std::sync::Arc;

use viator::config::{Config, SessionConfig};
use viator::engine::Engine;
use viator::error::Error;
use viator::external::RoutingService;
use viator::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    tracing::info!("routing service at {}", config.service_base);

    let engine = Engine::new(Arc::new(RoutingService::new(&config)), SessionConfig::default());

    serve(engine).await
}
