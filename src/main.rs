use rimagen::{logger, Config, VertexClient};

fn load_env() {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }
}

#[cfg(feature = "server")]
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use actix_web::{web, App, HttpServer};
    use rimagen::server::{self, SharedGenerator};
    use std::sync::Arc;

    logger::init_with_config(logger::LoggerConfig::from_env())?;
    load_env();

    let config = Config::from_env();
    logger::log_config_info(&config);

    let client = VertexClient::new(config.vertex.clone())?;
    let generator: SharedGenerator = Arc::new(client.image().clone());

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), config.port());

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(generator.clone()))
            .configure(server::configure)
    })
    .bind(("0.0.0.0", config.port()))?
    .run()
    .await?;

    Ok(())
}

/// Runs every prompt given on the command line as one batch.
#[cfg(not(feature = "server"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use rimagen::{ItemTracker, StopSignal};

    logger::init_with_config(logger::LoggerConfig::from_env())?;
    load_env();

    let prompts: Vec<String> = std::env::args().skip(1).collect();
    if prompts.is_empty() {
        eprintln!("usage: rimagen <prompt> [<prompt>...]");
        std::process::exit(2);
    }

    let config = Config::from_env();
    logger::log_config_info(&config);

    let client = VertexClient::new(config.vertex.clone())?;
    let orchestrator = client.orchestrator(config.batch.clone());
    let tracker = ItemTracker::with_prompts(prompts);

    let stop = StopSignal::new();
    let on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the current item and stopping");
            on_ctrl_c.stop();
        }
    });

    let summary = orchestrator.run_all_until(&tracker, &stop).await;

    for item in tracker.items() {
        match (item.result(), item.error_message()) {
            (Some(result), _) => println!(
                "{} {} -> {} image(s), {} bytes",
                item.id,
                item.status(),
                result.images.len(),
                result
                    .images
                    .iter()
                    .map(|image| image.decode().map(|bytes| bytes.len()).unwrap_or(0))
                    .sum::<usize>()
            ),
            (None, Some(message)) => println!("{} {} -> {}", item.id, item.status(), message),
            (None, None) => println!("{} {}", item.id, item.status()),
        }
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
