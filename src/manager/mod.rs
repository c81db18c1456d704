//! Connection lifecycle management.
//!
//! One manager task per subscription drives the reconnection state
//! machine; the [`Subscription`] handle is the consumer's end of it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | manager task: session loop, reconnection policy |
//! | `subscription` | consumer-facing handle and message type |

// ============================================================================
// Submodules
// ============================================================================

pub(crate) mod core;

/// Consumer-facing subscription handle.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use subscription::{SocketMessage, Subscription};
