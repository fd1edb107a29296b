use std::process::ExitCode;
use std::sync::Arc;

use sen5x_bridge::{
    ConfigLoader, LogWriter, LoggingConfig, Supervisor, ThingsBoardSink, init_logging, open_linux,
};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let loader = ConfigLoader::from_env();
    let loaded = loader.load();

    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cannot initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(
                path = %loader.path().display(),
                label = e.as_label(),
                error = %e,
                "cannot load configuration"
            );
            return ExitCode::FAILURE;
        }
    };

    info!(
        i2c_port = %config.i2c_port,
        tb_host = %config.tb_host,
        tb_port = config.tb_port,
        publish_interval = config.publish_interval,
        "starting sen5x bridge"
    );

    let sensor = open_linux(config.i2c_port.clone());
    let sink = ThingsBoardSink::new(config.thingsboard_settings());

    Supervisor::builder(config.supervisor_config(), sensor, sink)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()
        .serve()
        .await;

    info!("sen5x bridge stopped");
    ExitCode::SUCCESS
}
