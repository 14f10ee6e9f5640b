use anyhow::Result;
use engine_logging::engine_info;
use relay_app::platform::config::{self, ConfigSource, CONTROLLER_CONFIG_FILE};
use relay_app::platform::{app, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let path = config::path_from_args(CONTROLLER_CONFIG_FILE);
    let loaded = config::load_controller_config(&path)?;
    logging::initialize(loaded.config.log_destination, loaded.config.level()?);

    match &loaded.source {
        ConfigSource::File(path) => engine_info!("Loaded config from {:?}", path),
        ConfigSource::Defaults(path) => {
            engine_info!("No config at {:?}; using defaults", path)
        }
    }
    app::run_controller(loaded.config).await
}
