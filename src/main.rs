use std::error::Error;

use tracing::error;
use tracing_subscriber::EnvFilter;
use yakap_sql::{ExportConfig, run};

fn main() {
    init_tracing();

    let config = ExportConfig::default();
    if let Err(err) = run(&config) {
        error!(error = %err, "export failed");
        let mut cause = err.source();
        while let Some(inner) = cause {
            error!(cause = %inner, "caused by");
            cause = inner.source();
        }
        println!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
