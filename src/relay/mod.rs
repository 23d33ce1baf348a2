//! Websocket relay server
//!
//! One route, `GET /ws`, upgraded to a persistent bidirectional connection
//! per client. Sessions live in a shared [`Registry`] that the
//! [`Broadcaster`] fans reply audio out to.

mod broadcast;
pub mod protocol;
mod registry;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use broadcast::Broadcaster;
pub use registry::Registry;
pub use session::SessionState;

use crate::config::Config;
use crate::engines::{GeminiGenerator, OpenAiSynthesizer, WhisperTranscriber};
use crate::pipeline::Pipeline;
use crate::{Error, Result};

/// Shared state behind every session
pub struct RelayState {
    /// Relay configuration
    pub config: Config,

    /// Live-session registry
    pub registry: Arc<Registry>,

    /// Pipeline shared by all sessions
    pub pipeline: Arc<Pipeline>,

    /// Streamer over the registry
    pub broadcaster: Broadcaster,
}

/// The relay server
pub struct RelayServer {
    state: Arc<RelayState>,
}

impl RelayServer {
    /// Build a server around an already-assembled pipeline
    #[must_use]
    pub fn new(config: Config, pipeline: Arc<Pipeline>) -> Self {
        let registry = Arc::new(Registry::new());
        let broadcaster = Broadcaster::new(
            Arc::clone(&registry),
            config.chunk_size,
            config.sample_rate,
        );

        Self {
            state: Arc::new(RelayState {
                config,
                registry,
                pipeline,
                broadcaster,
            }),
        }
    }

    /// Build a server with the hosted engines from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a required engine API key is missing
    pub fn from_config(config: Config) -> Result<Self> {
        let engines = &config.engines;
        let openai_key = engines.openai_api_key.clone().unwrap_or_default();
        let gemini_key = engines.gemini_api_key.clone().unwrap_or_default();

        let transcriber = Arc::new(WhisperTranscriber::new(
            openai_key.clone(),
            engines.stt_model.clone(),
        )?);
        let generator = Arc::new(GeminiGenerator::new(
            gemini_key,
            engines.llm_model.clone(),
        )?);
        let synthesizer = Arc::new(OpenAiSynthesizer::new(
            openai_key,
            engines.tts_model.clone(),
            engines.tts_voice.clone(),
        )?);

        let pipeline = Arc::new(Pipeline::new(
            transcriber,
            generator,
            synthesizer,
            config.persona_prompt.clone(),
            config.sample_rate,
        ));

        Ok(Self::new(config, pipeline))
    }

    /// Build the router
    fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_upgrade))
            .with_state(Arc::clone(&self.state))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until interrupted, then close all sessions
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "relay listening");

        let router = self.router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Config(format!("relay server error: {e}")))?;

        tracing::info!("relay stopped");
        Ok(())
    }
}

/// Resolve on ctrl-c
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("interrupt received, shutting down");
    }
}

/// Upgrade a websocket connection into a session
async fn ws_upgrade(
    State(state): State<Arc<RelayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max = state.config.max_message_bytes;
    ws.max_message_size(max)
        .on_upgrade(move |socket| session::handle_socket(socket, addr, state))
}
