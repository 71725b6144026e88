//! Platform adapter contract.

use std::sync::Arc;

use serde_json::Value;

use crate::connection::{BoxedConnection, ConnectionHandle};
use crate::error::AdapterResult;
use crate::update::CanonicalUpdate;

/// Bridges one messaging platform to the canonical model.
///
/// An adapter is stateless: it creates one [`Connection`](crate::Connection)
/// per bot token and converts that platform's raw webhook payloads. The
/// runtime validates every converted update, so adapters only need to map
/// fields.
pub trait Adapter: Send + Sync + 'static {
    /// Platform name, e.g. `telegram`.
    fn name(&self) -> &'static str;

    /// Creates the outbound connection for a bot token.
    fn create_connection(&self, token: &str, handle: ConnectionHandle) -> BoxedConnection;

    /// Converts a raw webhook payload into a canonical update.
    fn convert_update(&self, raw: Value) -> AdapterResult<CanonicalUpdate>;
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;
