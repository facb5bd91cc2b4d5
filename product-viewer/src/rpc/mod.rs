//! JSON-RPC 2.0 bridge between the viewer and its host page.
//!
//! Implements bidirectional messaging over `postMessage`, supporting both
//! request-response and notification patterns.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (parent)  <──postMessage──>  Viewer (wasm)
//!        │                                     │
//!        ├─ Request (with ID) ───────────────> │
//!        │                                     ├─ Process request
//!        │ <────────────── Response (with ID) ─┤
//!        │                                     │
//!        │ <─────────── Notification (no ID) ──┤
//! ```
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//!
//! ## Methods
//!
//! ### Diagnostics
//! - `get_fps`: Current smoothed frame rate
//! - `get_loading_progress`: Status of the manifest, model and environment loads
//!
//! ### Pass chain
//! - `get_pass_chain`: Ordered passes with their enabled flags
//! - `set_pass_enabled`: `{ pass, enabled }`
//! - `get_pass_parameters`: `{ pass }`
//! - `set_pass_parameter`: `{ pass, name, value }`, constrained like the debug panel
//!
//! ### Debug panel
//! - `set_debug_panel_visible`: `{ visible }`
//!
//! ## Notifications
//!
//! - `fps_update`: `{ fps }`, every half second
//! - `loading_progress`: per-asset status whenever it changes
//! - `asset_load_failed`: `{ asset, error }`
//! - `quality_changed`: `{ reduced, pixel_ratio }`

/// JSON-RPC 2.0 messages, request dispatch and the wasm message listener.
pub mod web_rpc;
