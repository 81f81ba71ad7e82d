use std::error::Error;
use std::path::Path;

use clap::Parser;
use log::info;

use silicon_projector::config::ServerConfig;
use silicon_projector::model::LinearModel;
use silicon_projector::predictor::Predictor;
use silicon_projector::ui::routes::run_server;

/// Serves transistor-count predictions from a pre-fit linear regression.
#[derive(Parser, Debug)]
#[command(name = "silicon_projector", version)]
struct Args {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Path to the safetensors model artifact (overrides the config file).
    #[arg(long)]
    model: Option<String>,

    /// Address to bind (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file).
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Application error: {}", e);
        let mut current_err: Option<&(dyn Error + 'static)> = e.source();
        while let Some(source) = current_err {
            eprintln!("Caused by: {}", source);
            current_err = source.source();
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let model = LinearModel::load(Path::new(&config.model_path))?;
    info!(
        "loaded linear model from {} ({} coefficients)",
        config.model_path,
        model.num_coefficients()
    );

    let predictor = Predictor::new(model, config.confidence_band);
    run_server(config, predictor).await?;
    Ok(())
}
