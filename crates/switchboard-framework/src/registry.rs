//! Handler registry and update resolution.
//!
//! A registry holds five binding categories:
//!
//! | category | key                       | lookup                                   |
//! |----------|---------------------------|------------------------------------------|
//! | command  | lower-cased name          | exact only                               |
//! | action   | literal or regex          | exact (case-sensitive), then patterns    |
//! | text     | literal or regex          | exact (case-insensitive), then patterns  |
//! | contact  | none (singleton)          |                                          |
//! | location | none (singleton)          |                                          |
//!
//! Patterns are tried in registration order and the first match wins; its
//! capture groups are attached to the update before the handler runs.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use tracing::{debug, trace};

use switchboard_core::{CanonicalUpdate, MatchGroups, UpdatePayload};

use crate::error::{PatternError, PatternResult};
use crate::handler::BoxedHandler;

// ============================================================================
// Pattern
// ============================================================================

/// Key of an action or text binding.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal key.
    Exact(String),
    /// Regular expression tried after all literals missed.
    Regex(Regex),
}

impl Pattern {
    /// Compiles a regular expression pattern.
    pub fn regex(source: &str) -> PatternResult<Self> {
        Regex::new(source)
            .map(Self::Regex)
            .map_err(|source_err| PatternError::Invalid {
                pattern: source.to_owned(),
                source: source_err,
            })
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for Pattern {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s:?}"),
            Self::Regex(r) => write!(f, "/{}/", r.as_str()),
        }
    }
}

// ============================================================================
// Route
// ============================================================================

/// Which binding resolved an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(String),
    Action(Matched),
    Text(Matched),
    Contact,
    Location,
}

/// How an action or text binding matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matched {
    /// Literal key that matched.
    Exact(String),
    /// Source of the regex that matched.
    Pattern(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(name) => write!(f, "command /{name}"),
            Self::Action(m) => write!(f, "action {m}"),
            Self::Text(m) => write!(f, "text {m}"),
            Self::Contact => f.write_str("contact"),
            Self::Location => f.write_str("location"),
        }
    }
}

impl fmt::Display for Matched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => write!(f, "{key:?}"),
            Self::Pattern(src) => write!(f, "/{src}/"),
        }
    }
}

/// A resolved handler and the binding it came from.
#[derive(Clone)]
pub struct Resolution {
    pub handler: BoxedHandler,
    pub route: Route,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bindings
// ============================================================================

/// Exact and pattern bindings of one category.
#[derive(Clone, Default)]
struct Bindings {
    exact: HashMap<String, BoxedHandler>,
    patterns: Vec<(Regex, BoxedHandler)>,
    fold_case: bool,
}

impl Bindings {
    fn folding() -> Self {
        Self {
            fold_case: true,
            ..Self::default()
        }
    }

    fn key(&self, key: &str) -> String {
        if self.fold_case {
            key.to_lowercase()
        } else {
            key.to_owned()
        }
    }

    fn insert(&mut self, pattern: Pattern, handler: BoxedHandler) {
        match pattern {
            Pattern::Exact(key) => {
                let key = self.key(&key);
                self.exact.insert(key, handler);
            }
            Pattern::Regex(regex) => self.patterns.push((regex, handler)),
        }
    }

    fn lookup(&self, input: &str) -> Option<(BoxedHandler, Matched, Option<MatchGroups>)> {
        let key = self.key(input);
        if let Some(handler) = self.exact.get(&key) {
            return Some((handler.clone(), Matched::Exact(key), None));
        }

        self.patterns.iter().find_map(|(regex, handler)| {
            trace!(pattern = regex.as_str(), "trying pattern");
            let captures = regex.captures(input)?;
            Some((
                handler.clone(),
                Matched::Pattern(regex.as_str().to_owned()),
                Some(MatchGroups::from_captures(regex, &captures)),
            ))
        })
    }

    fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }
}

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Per-webhook handler bindings.
#[derive(Clone)]
pub struct HandlerRegistry {
    commands: HashMap<String, BoxedHandler>,
    actions: Bindings,
    texts: Bindings,
    contact: Option<BoxedHandler>,
    location: Option<BoxedHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            actions: Bindings::default(),
            texts: Bindings::folding(),
            contact: None,
            location: None,
        }
    }

    /// Binds a command. The name is lower-cased; re-binding replaces.
    pub fn register_command(&mut self, name: &str, handler: BoxedHandler) {
        let name = name.trim_start_matches('/').to_lowercase();
        debug!(command = %name, "registering command");
        if self.commands.insert(name.clone(), handler).is_some() {
            debug!(command = %name, "command handler replaced");
        }
    }

    /// Binds a callback action.
    pub fn register_action(&mut self, pattern: impl Into<Pattern>, handler: BoxedHandler) {
        let pattern = pattern.into();
        debug!(action = %pattern, "registering action");
        self.actions.insert(pattern, handler);
    }

    /// Binds free text.
    pub fn register_text(&mut self, pattern: impl Into<Pattern>, handler: BoxedHandler) {
        let pattern = pattern.into();
        debug!(text = %pattern, "registering text");
        self.texts.insert(pattern, handler);
    }

    pub fn register_contact(&mut self, handler: BoxedHandler) {
        debug!("registering contact handler");
        self.contact = Some(handler);
    }

    pub fn register_location(&mut self, handler: BoxedHandler) {
        debug!("registering location handler");
        self.location = Some(handler);
    }

    /// Number of bindings across all categories.
    pub fn len(&self) -> usize {
        self.commands.len()
            + self.actions.len()
            + self.texts.len()
            + usize::from(self.contact.is_some())
            + usize::from(self.location.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves an update to at most one handler.
    ///
    /// A `start` deep link (`/start key=value`) is rewritten in place to the
    /// command it addresses. A pattern match attaches its capture groups to
    /// the update.
    pub fn resolve(&self, update: &mut CanonicalUpdate) -> Option<Resolution> {
        if let Some(command) = update.command_mut() {
            if let Some(linked) = command.deep_link() {
                debug!(from = %command.name, to = %linked.name, "rewriting deep link");
                *command = linked;
            }
        }

        let (handler, route, matches) = self.lookup(update)?;
        if let Some(matches) = matches {
            update.attach_matches(matches);
        }
        debug!(route = %route, "update resolved");
        Some(Resolution { handler, route })
    }

    fn lookup(
        &self,
        update: &CanonicalUpdate,
    ) -> Option<(BoxedHandler, Route, Option<MatchGroups>)> {
        match &update.payload {
            UpdatePayload::Command(command) => {
                let key = command.key()?;
                let handler = self.commands.get(&key)?.clone();
                Some((handler, Route::Command(key), None))
            }
            UpdatePayload::Callback(callback) => {
                let action = callback.data.action()?;
                let (handler, matched, groups) = self.actions.lookup(&action)?;
                Some((handler, Route::Action(matched), groups))
            }
            UpdatePayload::Text => {
                let text = update.text()?;
                let (handler, matched, groups) = self.texts.lookup(text)?;
                Some((handler, Route::Text(matched), groups))
            }
            UpdatePayload::Contact(_) => Some((self.contact.clone()?, Route::Contact, None)),
            UpdatePayload::Location(_) => Some((self.location.clone()?, Route::Location, None)),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.commands.keys().collect();
        commands.sort();
        f.debug_struct("HandlerRegistry")
            .field("commands", &commands)
            .field("actions", &self.actions.len())
            .field("texts", &self.texts.len())
            .field("contact", &self.contact.is_some())
            .field("location", &self.location.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;
    use switchboard_core::{Callback, CallbackData, Command, Contact, Location};

    use crate::handler::tests::{null_bot, text_update, update};
    use crate::handler::{DispatchContext, into_handler};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn marker(log: &Log, name: &'static str) -> BoxedHandler {
        let log = Arc::clone(log);
        into_handler(move || {
            let log = Arc::clone(&log);
            async move { log.lock().push(name) }
        })
    }

    async fn run(registry: &HandlerRegistry, mut update: CanonicalUpdate) -> Option<Route> {
        let resolution = registry.resolve(&mut update)?;
        (resolution.handler)(DispatchContext::new(null_bot(), update))
            .await
            .unwrap();
        Some(resolution.route)
    }

    fn command(text: &str) -> CanonicalUpdate {
        let parsed = Command::parse(text).unwrap();
        update(UpdatePayload::Command(parsed), Some(text))
    }

    fn callback(data: &str) -> CanonicalUpdate {
        update(
            UpdatePayload::Callback(Callback {
                id: None,
                data: CallbackData::parse(data),
            }),
            None,
        )
    }

    #[tokio::test]
    async fn test_command_with_value() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("foo", marker(&log, "foo"));

        let mut update = command("/foo bar");
        let resolution = registry.resolve(&mut update).unwrap();
        assert_eq!(resolution.route, Route::Command("foo".into()));
        assert_eq!(update.command(), Some(&Command::new("foo", Some("bar".into()))));
    }

    #[tokio::test]
    async fn test_command_lookup_is_case_insensitive() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("Help", marker(&log, "help"));

        assert_eq!(run(&registry, command("/HELP")).await, Some(Route::Command("help".into())));
        assert_eq!(*log.lock(), ["help"]);
    }

    #[tokio::test]
    async fn test_command_last_registration_wins() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("menu", marker(&log, "first"));
        registry.register_command("MENU", marker(&log, "second"));

        run(&registry, command("/menu")).await.unwrap();
        assert_eq!(*log.lock(), ["second"]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_start_deep_link_is_rewritten() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("start", marker(&log, "start"));
        registry.register_command("x", marker(&log, "x"));

        let mut update = command("/start x=y");
        let resolution = registry.resolve(&mut update).unwrap();
        assert_eq!(resolution.route, Route::Command("x".into()));
        assert_eq!(update.command(), Some(&Command::new("x", Some("y".into()))));

        assert_eq!(run(&registry, command("/start")).await, Some(Route::Command("start".into())));
    }

    #[tokio::test]
    async fn test_commands_have_no_pattern_fallback() {
        let mut registry = HandlerRegistry::new();
        registry.register_text(Pattern::regex(".*").unwrap(), marker(&Log::default(), "text"));
        assert!(registry.resolve(&mut command("/unknown")).is_none());
    }

    #[tokio::test]
    async fn test_exact_action_beats_pattern_in_any_order() {
        for exact_first in [true, false] {
            let log = Log::default();
            let mut registry = HandlerRegistry::new();
            if exact_first {
                registry.register_action("abc", marker(&log, "B"));
                registry.register_action(Pattern::regex("^a.*").unwrap(), marker(&log, "A"));
            } else {
                registry.register_action(Pattern::regex("^a.*").unwrap(), marker(&log, "A"));
                registry.register_action("abc", marker(&log, "B"));
            }

            run(&registry, callback("abc")).await.unwrap();
            assert_eq!(*log.lock(), ["B"]);
        }
    }

    #[tokio::test]
    async fn test_earliest_pattern_wins() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_action(Pattern::regex("a").unwrap(), marker(&log, "H1"));
        registry.register_action(Pattern::regex("ab").unwrap(), marker(&log, "H2"));

        let route = run(&registry, callback("ab")).await.unwrap();
        assert_eq!(route, Route::Action(Matched::Pattern("a".into())));
        assert_eq!(*log.lock(), ["H1"]);
    }

    #[tokio::test]
    async fn test_action_exact_is_case_sensitive() {
        let mut registry = HandlerRegistry::new();
        registry.register_action("Buy", marker(&Log::default(), "buy"));
        assert!(registry.resolve(&mut callback("buy")).is_none());
        assert!(registry.resolve(&mut callback("Buy")).is_some());
    }

    #[tokio::test]
    async fn test_structured_callback_uses_action_field() {
        let mut registry = HandlerRegistry::new();
        registry.register_action(
            Pattern::regex(r"^buy:(?P<id>\d+)$").unwrap(),
            marker(&Log::default(), "buy"),
        );

        let mut update = callback(&json!({"action": "buy:42", "qty": 2}).to_string());
        registry.resolve(&mut update).unwrap();
        let matches = update.matches().unwrap();
        assert_eq!(matches.name("id"), Some("42"));
        assert_eq!(matches.get(0), Some("buy:42"));

        assert!(registry.resolve(&mut callback(r#"{"qty":2}"#)).is_none());
    }

    #[tokio::test]
    async fn test_text_exact_is_case_insensitive() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        registry.register_text("Hello", marker(&log, "hello"));

        let route = run(&registry, text_update("HELLO")).await.unwrap();
        assert_eq!(route, Route::Text(Matched::Exact("hello".into())));
    }

    #[tokio::test]
    async fn test_text_pattern_attaches_matches() {
        let mut registry = HandlerRegistry::new();
        registry.register_text(
            Pattern::regex(r"^order (\d+)$").unwrap(),
            marker(&Log::default(), "order"),
        );

        let mut update = text_update("order 17");
        registry.resolve(&mut update).unwrap();
        assert_eq!(update.matches().and_then(|m| m.get(1)), Some("17"));

        let mut update = text_update("nothing here");
        assert!(registry.resolve(&mut update).is_none());
        assert!(update.matches().is_none());
    }

    #[tokio::test]
    async fn test_singletons() {
        let log = Log::default();
        let mut registry = HandlerRegistry::new();
        let contact = update(
            UpdatePayload::Contact(Contact {
                phone: "+10000000000".into(),
                is_own: true,
                first_name: None,
                user_id: None,
            }),
            None,
        );
        let location = update(
            UpdatePayload::Location(Location {
                latitude: 55.75,
                longitude: 37.61,
            }),
            None,
        );

        assert!(registry.resolve(&mut contact.clone()).is_none());
        registry.register_contact(marker(&log, "contact"));
        registry.register_location(marker(&log, "location"));

        assert_eq!(run(&registry, contact).await, Some(Route::Contact));
        assert_eq!(run(&registry, location).await, Some(Route::Location));
        assert_eq!(*log.lock(), ["contact", "location"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Pattern::regex("(unclosed").unwrap_err();
        assert!(err.to_string().starts_with("invalid pattern '(unclosed'"));
    }
}
