//! Device check example
//!
//! Talks to a terminal behind a serial device server:
//!
//! ```text
//! TERMINAL_HOST=192.168.0.50 TERMINAL_PORT=4001 TERMINAL_ID=CAT0001 \
//!     RUST_LOG=tlpay=debug cargo run --example device_check
//! ```

use tlpay::{Client, ClientConfig, FrameSummary, Gateway, Requests};
use tlpay_transport::TcpTransport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::var("TERMINAL_HOST").unwrap_or_else(|_| "192.168.0.50".to_string());
    let port = std::env::var("TERMINAL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4001);
    let terminal_id = std::env::var("TERMINAL_ID").unwrap_or_else(|_| "CAT0001".to_string());

    let gateway = Gateway::new(
        Client::new(TcpTransport::new(host, port), ClientConfig::default()),
        Requests::new(terminal_id),
    );

    let reply = gateway.device_check().await?;

    println!("{}", FrameSummary::from(&reply));
    if !reply.is_success() {
        println!("Terminal reported response code {}", reply.response_code);
    }

    Ok(())
}
