use std::{
    error::Error,
    fs::File,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cluster_viz::{app::App, config::Config, ui, util::format_rate};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.validate()?;
    init_tracing(&config)?;

    let app = App::new(&config);
    if config.headless {
        run_headless(app, &config)?;
    } else {
        ui::run(app)?;
    }
    Ok(())
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else if let Some(path) = &config.log_file {
        // Keep the alternate screen clean; logs go to the file instead
        let file = File::create(path).map_err(cluster_viz::Error::from)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn run_headless(mut app: App, config: &Config) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).map_err(cluster_viz::Error::from)?;

    let tick_rate = config.tick_rate();
    while running.load(Ordering::SeqCst) {
        thread::sleep(tick_rate);
        app.on_tick();

        if !app.props.data_is_valid {
            info!("waiting for cluster data");
            continue;
        }
        for row in app.node_rows() {
            if !row.activity_rate.is_finite() {
                warn!(node_id = row.node_id, "non-finite activity rate");
            }
            info!(
                node_id = row.node_id,
                locality = %row.locality,
                liveness = row.liveness.label(),
                rate = %format_rate(row.activity_rate),
                "node activity"
            );
        }
        info!(tick = app.ticks, total = %format_rate(app.cluster_activity_rate()), "cluster activity");

        if config.ticks > 0 && app.ticks >= config.ticks {
            break;
        }
    }
    info!(ticks = app.ticks, "headless run finished");
    Ok(())
}
