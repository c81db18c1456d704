//! Shared sockets and reconnection policy.
//!
//! Demonstrates:
//! - Two subscriptions sharing one physical connection
//! - Reconnect ceiling and backoff configuration
//! - Reading ready state from the hub
//!
//! Usage:
//!   cargo run --example 002_shared_sockets -- wss://echo.websocket.events
//!   cargo run --example 002_shared_sockets -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use ws_tether::{ConnectionConfig, Result, SocketHub};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "wss://echo.websocket.events";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 002: Shared Sockets ===\n");

    let url = args.url.as_deref().unwrap_or(DEFAULT_URL);
    let hub = SocketHub::new();

    let feed = hub.subscribe(
        url,
        ConnectionConfig::new()
            .with_shared()
            .with_on_message(|message| println!("[Feed] {message:?}")),
    )?;

    let audit = hub.subscribe(
        url,
        ConnectionConfig::new()
            .with_shared()
            .with_reconnect_attempts(5)
            .with_reconnect_backoff(|attempt| Duration::from_secs(u64::from(attempt)))
            .with_on_open(|| println!("[Audit] Socket open")),
    )?;

    println!("[Hub] Shared sockets: {}", hub.shared_socket_count());
    println!("[Hub] State for {}: {}", feed.url(), hub.ready_state(feed.url()));

    common::wait_for_exit().await;

    // The physical socket deliberately stays registered for future
    // subscribers; only the consumers detach.
    feed.unsubscribe();
    audit.unsubscribe();
    Ok(())
}
