//! `parley serve`: start the HTTP gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    workers: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(workers) = workers {
        config.dispatch.workers = workers.max(1);
    }

    println!("parley gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Workers:   {}", config.dispatch.workers);
    println!("   Model:     {}:{}", config.default_provider, config.default_model);
    println!("   History:   {}", config.history.backend);

    parley_gateway::start(config).await?;

    Ok(())
}
