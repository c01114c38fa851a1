//! Servidor web Axum com WebSocket para visualização do tokenizador em tempo real

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokeniser_core::{
    config::{TokeniserConfig, TokeniserMode},
    corpus::{demo_texts, get_corpus},
    evaluation::evaluate_with_mode,
    model::TokeniserModel,
    pipeline::{PipelineEvent, TokeniserPipeline, TokeniserResult},
    session::TokeniserSession,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: TokeniserPipeline,
}

#[derive(Deserialize)]
struct TokeniseRequest {
    text: String,
    #[serde(default)]
    mode: Option<TokeniserMode>,
}

#[derive(Serialize)]
struct TokeniseResponse {
    tokens: Vec<String>,
    results: Vec<TokeniserResult>,
    total_tokens: usize,
    processing_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let pipeline = build_pipeline()?;
    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/tokenise", post(tokenise_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-sentences", get(demo_sentences_handler))
        .route("/evaluate", post(evaluate_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Servidor do tokenizador iniciado em http://localhost:3000");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Monta o pipeline a partir de `TOKENISER_CONFIG` (JSON) e `TOKENISER_MODEL` (modelo
/// salvo), ambos opcionais. Sem modelo salvo, treina o modelo francês padrão.
fn build_pipeline() -> tokeniser_core::Result<TokeniserPipeline> {
    let config = match std::env::var("TOKENISER_CONFIG") {
        Ok(path) => {
            info!(%path, "carregando configuração");
            TokeniserConfig::from_path(path)?
        }
        Err(_) => TokeniserConfig::default(),
    };

    match std::env::var("TOKENISER_MODEL") {
        Ok(path) => {
            let session = TokeniserSession::new(
                config.separator_class()?,
                Arc::new(tokeniser_core::lexicon::MemoryLexicon::french()),
            );
            let model = TokeniserModel::load(path)?;
            TokeniserPipeline::from_model(config, session, model)
        }
        Err(_) => TokeniserPipeline::new(config),
    }
}

/// Retorna a página principal HTML
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("templates/index.html"))
}

/// Tokenização via HTTP POST (sem streaming)
async fn tokenise_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokeniseRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Texto vazio"})),
        )
            .into_response();
    }

    let start = Instant::now();
    let mode = req.mode.unwrap_or(state.pipeline.config().mode);
    let results = state.pipeline.tokenise_with_mode(&req.text, mode);
    let tokens: Vec<String> = results
        .first()
        .map(|best| best.tokens.texts().into_iter().map(String::from).collect())
        .unwrap_or_default();

    Json(TokeniseResponse {
        total_tokens: tokens.len(),
        tokens,
        results,
        processing_ms: start.elapsed().as_millis() as u64,
    })
    .into_response()
}

/// Retorna as sentenças de demonstração
async fn demo_sentences_handler() -> impl IntoResponse {
    let sentences: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(domain, text)| {
            serde_json::json!({
                "domain": domain,
                "text": text
            })
        })
        .collect();
    Json(sentences)
}

#[derive(Deserialize, Default)]
struct EvaluateRequest {
    #[serde(default)]
    mode: Option<TokeniserMode>,
}

/// Avalia o pipeline contra o corpus embutido
async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    req: Option<Json<EvaluateRequest>>,
) -> impl IntoResponse {
    let mode = req
        .and_then(|Json(req)| req.mode)
        .unwrap_or(state.pipeline.config().mode);
    let worker_state = Arc::clone(&state);
    let evaluation = tokio::task::spawn_blocking(move || {
        evaluate_with_mode(&worker_state.pipeline, &get_corpus(), mode)
    })
    .await;

    match evaluation {
        Ok(Ok(evaluation)) => {
            let outcomes: Vec<serde_json::Value> = evaluation
                .overall
                .outcomes()
                .map(|outcome| {
                    serde_json::json!({
                        "outcome": outcome,
                        "counts": evaluation.overall.counts(outcome),
                        "precision": evaluation.overall.precision(outcome),
                        "recall": evaluation.overall.recall(outcome),
                        "f_score": evaluation.overall.f_score(outcome),
                    })
                })
                .collect();
            let by_authority: serde_json::Map<String, serde_json::Value> = evaluation
                .by_authority
                .iter()
                .map(|(authority, calculator)| (authority.clone(), calculator.total_f_score().into()))
                .collect();

            Json(serde_json::json!({
                "mode": mode,
                "sentences": evaluation.sentences,
                "f_score": evaluation.overall.total_f_score(),
                "outcomes": outcomes,
                "by_authority": by_authority,
                "errors": evaluation.errors,
            }))
            .into_response()
        }
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
        Err(e) => {
            warn!("avaliação interrompida: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "falha na avaliação"})),
            )
                .into_response()
        }
    }
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe uma sentença, executa o pipeline e reenvia os eventos passo a passo
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {text, mode}; senão o texto puro no modo configurado
                let (sentence, mode) = match serde_json::from_str::<TokeniseRequest>(&text) {
                    Ok(req) => (
                        req.text.trim().to_string(),
                        req.mode.unwrap_or(state.pipeline.config().mode),
                    ),
                    Err(_) => (text.trim().to_string(), state.pipeline.config().mode),
                };

                if sentence.is_empty() {
                    continue;
                }

                info!("Tokenizando via WebSocket [{:?}]: {} chars", mode, sentence.len());

                // O pipeline é síncrono: roda fora do runtime
                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let worker_state = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    worker_state.pipeline.tokenise_streaming(&sentence, mode, tx);
                });

                let mut events: Vec<PipelineEvent> = Vec::new();
                if let Err(e) = handle.await {
                    warn!("pipeline interrompido: {e}");
                    events.push(PipelineEvent::Error {
                        message: "falha ao tokenizar a sentença".into(),
                    });
                } else {
                    events.extend(rx.try_iter());
                }

                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                        // Pequena pausa para animação visual (passo a passo)
                        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
