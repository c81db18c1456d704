//! Basic subscription lifecycle.
//!
//! Demonstrates:
//! - Creating a SocketHub
//! - Subscribing with lifecycle callbacks
//! - Sending a frame once the connection opens
//! - Unsubscribing on exit
//!
//! Usage:
//!   cargo run --example 001_basic_subscribe -- wss://echo.websocket.events
//!   cargo run --example 001_basic_subscribe -- --debug ws://127.0.0.1:9001

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use ws_tether::{ConnectionConfig, Message, Result, SocketHub};

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
    println!("=== 001: Basic Subscribe ===\n");

    let url = args.url.as_deref().unwrap_or(DEFAULT_URL);
    let hub = SocketHub::new();

    let subscription = hub.subscribe(
        url,
        ConnectionConfig::new()
            .with_on_open(|| println!("[Open] Connected"))
            .with_on_message(|message| println!("[Message] {message:?}"))
            .with_on_close(|event| println!("[Close] {event:?}")),
    )?;

    println!("[Subscribe] Physical URL: {}", subscription.url());

    // Give the handshake a moment, then say hello.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    println!("[Send] State: {}", subscription.ready_state());
    subscription.send(Message::text("hello from ws-tether"));

    common::wait_for_exit().await;

    subscription.unsubscribe();
    Ok(())
}
