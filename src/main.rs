use omen::services::{
    HttpPredictor, Predictor, Session, SessionRunner, TickSimulator, UnconfiguredPredictor,
};
use omen::{api, AppState, Config, CurrencyPair, CURRENCY_PAIRS};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omen=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Omen server on {}:{}", config.host, config.port);

    let pair = CurrencyPair::find(&config.default_pair).unwrap_or_else(|| {
        warn!(
            "Unknown DEFAULT_PAIR {}, using {}",
            config.default_pair, CURRENCY_PAIRS[0].name
        );
        CURRENCY_PAIRS[0]
    });

    let predictor: Arc<dyn Predictor> = match &config.predictor_url {
        Some(url) => {
            info!("Prediction service at {}", url);
            Arc::new(HttpPredictor::new(url.clone(), config.predictor_timeout())?)
        }
        None => {
            warn!("PREDICTOR_URL not set, predictions will fail");
            Arc::new(UnconfiguredPredictor)
        }
    };

    // Session runner owns all analysis state
    let session = Session::new(pair, config.prediction_settings(), config.window_capacity);
    let (runner, handle) = SessionRunner::new(session, predictor);
    runner.spawn();

    // Simulated feed
    tokio::spawn(TickSimulator::new(config.tick_interval()).run(handle.clone()));

    // Log signals and alerts as they change
    {
        let mut views = handle.subscribe();
        tokio::spawn(async move {
            let mut last_signal = None;
            let mut last_alert = None;
            while views.changed().await.is_ok() {
                let view = views.borrow_and_update().clone();
                if let Some(alert) = view.alert {
                    if last_alert != Some(alert) {
                        info!("Pattern detected: {} at {}", alert.name, alert.time);
                    }
                }
                last_alert = view.alert;

                let latest = view.history.first().map(|entry| entry.id);
                if latest.is_some() && latest != last_signal {
                    if let Some(entry) = view.history.first() {
                        info!("{} {} @ {:.5}", entry.pair, entry.signal, entry.price);
                    }
                }
                last_signal = latest;
            }
        });
    }

    let state = AppState {
        config: config.clone(),
        session: handle,
    };

    // Build router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
