use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use transit_sensor::auth::{Credential, TokenGuard, TokenIssuer};
use transit_sensor::cache::RestoredSnapshot;
use transit_sensor::config::{BackendConfig, Config, MotisBackend, RnvBackend};
use transit_sensor::coordinator::Coordinator;
use transit_sensor::domain::{Slot, StationQuery};
use transit_sensor::motis::{MotisClient, MotisConfig};
use transit_sensor::rnv::{RnvClient, RnvConfig};
use transit_sensor::sensor::{DepartureSensor, unique_id};
use transit_sensor::source::{CachedSource, CombinedSource, DepartureSource, PayloadCacheConfig};
use transit_sensor::state_store::StateStore;
use transit_sensor::stations::StationDirectory;
use transit_sensor::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = Config::path_from_env();
    let config = Config::load(&path)?;
    info!(path = %path.display(), stations = config.stations.len(), "configuration loaded");

    let locale = config.locale()?;
    let coordinator_config = config.coordinator_config();
    let cache_config = PayloadCacheConfig {
        ttl: config.payload_cache_ttl(),
        ..PayloadCacheConfig::default()
    };

    let directory = match &config.station_directory {
        Some(path) => match StationDirectory::global(path).await {
            Ok(directory) => {
                info!(stations = directory.len(), "station directory loaded");
                Some(directory)
            }
            Err(e) => {
                warn!(error = %e, "station directory unavailable");
                None
            }
        },
        None => None,
    };

    let queries: Vec<StationQuery> = config
        .station_queries()?
        .into_iter()
        .map(|query| match (&directory, query.name()) {
            (Some(directory), None) => {
                let name = directory.station_name(query.station_id());
                query.with_name(name)
            }
            _ => query,
        })
        .collect();

    let store = StateStore::new(&config.state_file);
    let restored = store.load();
    info!(entries = restored.len(), "restored sensor state");

    let mut sensors = Vec::new();
    let mut geocoder = None;

    match &config.backend {
        BackendConfig::Motis(motis) => {
            let client = motis_client(motis, &config).await?;
            geocoder = Some(client.clone());
            let source = Arc::new(CachedSource::new(client, &cache_config));
            for query in queries {
                let coordinator =
                    Coordinator::new(Arc::clone(&source), query, locale, coordinator_config.clone());
                sensors.extend(launch(coordinator, &restored));
            }
        }
        BackendConfig::Rnv(rnv) => {
            let client = rnv_client(rnv, &config)?;
            let source = Arc::new(CachedSource::new(client.clone(), &cache_config));
            for query in queries {
                let guard = TokenGuard::new(client.clone(), initial_credential(rnv));
                let coordinator =
                    Coordinator::new(Arc::clone(&source), query, locale, coordinator_config.clone())
                        .with_auth(guard);
                sensors.extend(launch(coordinator, &restored));
            }
        }
        BackendConfig::Combined { motis, rnv } => {
            let motis = motis_client(motis, &config).await?;
            let client = rnv_client(rnv, &config)?;
            geocoder = Some(motis.clone());
            let source = Arc::new(CachedSource::new(
                CombinedSource::new(motis, client.clone()),
                &cache_config,
            ));
            for query in queries {
                let guard = TokenGuard::new(client.clone(), initial_credential(rnv));
                let coordinator =
                    Coordinator::new(Arc::clone(&source), query, locale, coordinator_config.clone())
                        .with_auth(guard);
                sensors.extend(launch(coordinator, &restored));
            }
        }
    }

    let mut state = AppState::new(sensors);
    if let Some(geocoder) = geocoder {
        state = state.with_geocoder(geocoder);
    }
    if let Some(directory) = directory {
        state = state.with_directory(directory);
    }

    let persist_sensors = Arc::clone(&state.sensors);
    let persist_store = store.clone();
    let persist_interval = coordinator_config.poll_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(persist_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            persist(&persist_store, &persist_sensors);
        }
    });

    let sensors = Arc::clone(&state.sensors);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, sensors = sensors.len(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    persist(&store, &sensors);
    info!("shut down");
    Ok(())
}

/// Seed a coordinator from persisted state, start polling, and return its
/// three sensors.
fn launch<S, I>(
    mut coordinator: Coordinator<S, I>,
    restored: &HashMap<String, RestoredSnapshot>,
) -> Vec<DepartureSensor>
where
    S: DepartureSource + 'static,
    I: TokenIssuer + 'static,
{
    for slot in Slot::ALL {
        if let Some(snapshot) = restored.get(&unique_id(coordinator.query(), slot)) {
            coordinator = coordinator.with_restored(slot, snapshot.clone());
        }
    }

    let sensors = DepartureSensor::for_station(coordinator.query(), &coordinator.subscribe());
    tokio::spawn(coordinator.run());
    sensors
}

async fn motis_client(
    motis: &MotisBackend,
    config: &Config,
) -> Result<MotisClient, Box<dyn std::error::Error>> {
    let client = MotisClient::new(
        MotisConfig::new(&motis.url).with_timeout(config.request_timeout_secs),
    )?;

    if client.probe().await {
        info!(base_url = %client.base_url(), "motis reachable");
    } else {
        warn!(base_url = %client.base_url(), "motis not reachable, polling anyway");
    }

    Ok(client)
}

fn rnv_client(rnv: &RnvBackend, config: &Config) -> Result<RnvClient, Box<dyn std::error::Error>> {
    let mut client_config = RnvConfig::new(
        &rnv.tenant_id,
        &rnv.client_id,
        &rnv.client_secret,
        &rnv.resource,
    )
    .with_timeout(config.request_timeout_secs);
    if let Some(url) = &rnv.api_url {
        client_config = client_config.with_api_url(url);
    }

    Ok(RnvClient::new(client_config)?)
}

fn initial_credential(rnv: &RnvBackend) -> Option<Credential> {
    rnv.access_token
        .as_ref()
        .map(|token| Credential::new(token, rnv.expires_on.unwrap_or(0)))
}

fn persist(store: &StateStore, sensors: &[DepartureSensor]) {
    let now = Utc::now();
    let snapshots: BTreeMap<String, RestoredSnapshot> = sensors
        .iter()
        .map(|sensor| (sensor.unique_id().to_string(), sensor.reading(now).to_snapshot()))
        .collect();

    if let Err(e) = store.save(&snapshots) {
        error!(path = %store.path().display(), error = %e, "failed to persist sensor state");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

