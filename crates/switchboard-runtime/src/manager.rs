//! The service manager: the entry point callers talk to.
//!
//! ```rust,ignore
//! let manager = ServiceManager::builder()
//!     .adapter(Arc::new(TelegramAdapter::new()))
//!     .config_file("switchboard.toml")
//!     .build()?;
//!
//! manager.handle_webhook("telegram", "main", raw).await?;
//! manager.handle_event("telegram", None, "daily-report", json!({})).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use switchboard_core::BoxedAdapter;
use switchboard_framework::{BoxedEvent, Dispatched, Webhook};

use crate::bot::ManagedBot;
use crate::config::{ConfigLoader, SwitchboardConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::router::{EmitRequest, EventRouter};
use crate::service::Service;

/// Registry of services, plus the event router shared by all of them.
pub struct ServiceManager {
    services: RwLock<HashMap<String, Arc<Service>>>,
    router: EventRouter,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceManager")
            .field("services", &self.service_names())
            .field("default_bot", &self.router.default_bot())
            .finish()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        Self::with_router(EventRouter::new())
    }

    pub fn with_router(router: EventRouter) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            router,
        }
    }

    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Builds services and bots from configuration.
    ///
    /// Disabled services and bots are skipped. Every enabled service needs
    /// an adapter whose name matches its platform.
    pub fn from_config(
        config: &SwitchboardConfig,
        adapters: impl IntoIterator<Item = BoxedAdapter>,
    ) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        let adapters: HashMap<&'static str, BoxedAdapter> = adapters
            .into_iter()
            .map(|adapter| (adapter.name(), adapter))
            .collect();
        let manager = Self::with_router(EventRouter::with_default_bot(
            config.router.default_bot.clone(),
        ));

        for service_config in config.enabled_services() {
            let platform = service_config.platform();
            let adapter = adapters
                .get(platform)
                .cloned()
                .ok_or_else(|| RuntimeError::UnknownPlatform(platform.to_owned()))?;

            let service = manager.register_service(Service::new(&service_config.name, adapter))?;
            for bot in service_config.enabled_bots() {
                service.register_bot(&bot.name, &bot.token)?;
            }
        }

        info!(
            services = manager.services.read().len(),
            log_level = %config.logging.level,
            default_bot = %manager.router.default_bot(),
            "service manager initialized from configuration"
        );
        Ok(manager)
    }

    // =========================================================================
    // Services and bots
    // =========================================================================

    pub fn register_service(&self, service: Service) -> RuntimeResult<Arc<Service>> {
        let mut services = self.services.write();
        if services.contains_key(service.name()) {
            return Err(RuntimeError::ServiceExists(service.name().to_owned()));
        }
        info!(service = %service.name(), platform = service.platform(), "service registered");
        let service = Arc::new(service);
        services.insert(service.name().to_owned(), service.clone());
        Ok(service)
    }

    pub fn get_service(&self, name: &str) -> RuntimeResult<Arc<Service>> {
        self.services
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::ServiceNotFound(name.to_owned()))
    }

    /// Service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_bot(&self, service: &str, bot: &str) -> RuntimeResult<ManagedBot> {
        self.get_service(service)?.get_bot(bot)
    }

    /// Binds `webhook` to a bot and starts it listening.
    pub async fn start_bot(
        &self,
        service: &str,
        bot: &str,
        webhook: Option<Webhook>,
    ) -> RuntimeResult<()> {
        self.get_bot(service, bot)?.start(webhook).await
    }

    /// Closes every bot connection.
    pub fn shutdown(&self) {
        let services: Vec<_> = self.services.read().values().cloned().collect();
        for service in services {
            for bot in service.bots() {
                bot.connection().handle().close();
            }
            debug!(service = %service.name(), "service connections closed");
        }
        info!("service manager shut down");
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Registers an event on one bot.
    pub fn register_event(&self, service: &str, bot: &str, event: BoxedEvent) -> RuntimeResult<()> {
        self.get_bot(service, bot)?.register_event(event);
        Ok(())
    }

    /// Runs a bot-level event. Without a bot name, the first bot of the
    /// service that has the event runs it.
    pub async fn handle_event(
        &self,
        service: &str,
        bot: Option<&str>,
        event: &str,
        payload: Value,
    ) -> RuntimeResult<()> {
        let service = self.get_service(service)?;
        let bot = match bot {
            Some(name) => service.get_bot(name)?,
            None => service.find_bot_with_event(event).ok_or_else(|| {
                RuntimeError::NoBotForEvent {
                    service: service.name().to_owned(),
                    event: event.to_owned(),
                }
            })?,
        };
        bot.handle_event(event, payload).await
    }

    /// Registers a routed event for a service.
    pub fn register_route(&self, service: &str, event: BoxedEvent) -> RuntimeResult<()> {
        let service = self.get_service(service)?;
        self.router.register(service.name(), event);
        Ok(())
    }

    /// Emits a routed event on a service.
    pub async fn emit(&self, service: &str, request: EmitRequest) -> RuntimeResult<()> {
        let service = self.get_service(service)?;
        self.router.emit(&service, request).await
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    // =========================================================================
    // Webhooks
    // =========================================================================

    /// Converts and dispatches one raw webhook payload.
    pub async fn handle_webhook(
        &self,
        service: &str,
        bot: &str,
        raw: Value,
    ) -> RuntimeResult<Dispatched> {
        self.get_bot(service, bot)?.handle_webhook(raw).await
    }
}

// =============================================================================
// ManagerBuilder
// =============================================================================

/// Builds a [`ServiceManager`] from layered configuration and a set of
/// adapters.
pub struct ManagerBuilder {
    config_loader: ConfigLoader,
    adapters: Vec<BoxedAdapter>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().search_path("."),
            adapters: Vec::new(),
        }
    }

    /// Makes a platform available to configured services.
    pub fn adapter(mut self, adapter: BoxedAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically. Config files and environment
    /// variables still override it.
    pub fn merge(mut self, config: SwitchboardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<ServiceManager> {
        let config = self.config_loader.load()?;
        ServiceManager::from_config(&config, self.adapters)
    }
}
