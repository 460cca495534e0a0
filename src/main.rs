use tracing::{error, info, Level};

use sportfes_push::{
    configuration::{
        get_configuration, set_configuration, AppState, Config, State,
    },
    error::Error,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::INFO
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match init() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    info!(
        "Listening on {}:{} ({} allowed origins)",
        config.server_host,
        config.port,
        config.allowed_origins.len()
    );

    let state = State::from_config(config).await?;
    let app_state = AppState::new(state);

    tokio::select! {
        result = server::server_task(&app_state) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        },
    }

    Ok(())
}

fn init() -> Result<Config, Error> {
    set_configuration()?;
    let config = get_configuration()?;
    Ok(config)
}
