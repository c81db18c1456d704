//! Hub: subscription factory and process-scoped stores.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`SocketHub`] and `subscribe` |
//! | `builder` | [`SocketHubBuilder`] for transport-factory injection |

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SocketHubBuilder;
pub use core::SocketHub;
