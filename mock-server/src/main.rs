use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let defaults = mock_server::Account::default();
    let account = mock_server::Account {
        api_key: std::env::var("PAYAPI_API_KEY").unwrap_or(defaults.api_key),
        secret: std::env::var("PAYAPI_SECRET").unwrap_or(defaults.secret),
        password: std::env::var("PAYAPI_PASSWORD").unwrap_or(defaults.password),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock PayApi listening");
    mock_server::run_with_account(listener, account).await
}
