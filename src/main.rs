use std::process;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use tidemon_service::config::{self, ServiceConfig};
use tidemon_service::ingest::coops::CoopsClient;
use tidemon_service::ingest::window::{plan_windows, year_range};
use tidemon_service::ingest::Ingestor;
use tidemon_service::logging::{self, DataSource};
use tidemon_service::server;
use tidemon_service::station::STATION;
use tidemon_service::store::IntervalStore;
use tidemon_service::verify::{self, VerificationStatus};

fn main() {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    logging::init_logger(
        config.log_level(),
        config.log_file.as_deref(),
        config.console_timestamps,
    );

    let client = match CoopsClient::new(
        config.data_request(),
        Duration::from_secs(config.request_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => fail(&format!("Failed to create HTTP client: {}", e)),
    };

    if std::env::args().any(|arg| arg == "--verify") {
        run_verification(&client, &config);
        return;
    }

    let store = match IntervalStore::for_year(config.year) {
        Some(store) => store.into_shared(),
        None => fail(&format!("Year {} cannot be represented", config.year)),
    };
    let windows = match year_range(config.year) {
        Some((start, end)) => plan_windows(start, end, config.window_days),
        None => fail(&format!("Year {} cannot be represented", config.year)),
    };

    logging::info(
        DataSource::System,
        Some(STATION.station_id),
        &format!(
            "Serving {} {} for {} ({} windows of {} days)",
            config.product,
            config.year,
            STATION.name,
            windows.len(),
            config.window_days
        ),
    );

    // Queries are answered while ingestion is still running; intervals not
    // yet fetched read as missing.
    let ingest_store = store.clone();
    let spawned = thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || Ingestor::new(client, ingest_store, windows).run());
    if let Err(e) = spawned {
        fail(&format!("Failed to start ingestion thread: {}", e));
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => fail(&format!("Failed to start async runtime: {}", e)),
    };

    if let Err(e) = runtime.block_on(server::serve(store, &config.listen_addr)) {
        fail(&format!("HTTP server stopped: {}", e));
    }
}

fn run_verification(client: &CoopsClient, config: &ServiceConfig) {
    let probe_day = NaiveDate::from_ymd_opt(config.year, 1, 1).unwrap_or_default();
    let result = verify::verify_station(client, STATION.station_id, config.product, probe_day);

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => logging::error(DataSource::System, None, &format!("Failed to encode report: {}", e)),
    }

    if result.status == VerificationStatus::Failed {
        process::exit(2);
    }
}

fn fail(message: &str) -> ! {
    logging::error(DataSource::System, None, message);
    process::exit(1);
}
