use quiznight_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load();
    let (app, _state) = quiznight_server::build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {}: {err}", config.listen_addr));

    tracing::info!(addr = %config.listen_addr, "quiznight server listening");

    axum::serve(listener, app).await.expect("server error");
}
