use tracing::{debug, info};

use crate::config::ConfigError;
use crate::engine::{MapEngine, TransitionToken};

/// Cycles through a fixed list of base styles.
///
/// A switch replaces the whole style. The overlay is restored when the load
/// notification for the *latest* switch arrives; notifications for switches
/// that were superseded before they finished are ignored.
#[derive(Debug, Clone)]
pub struct BasemapController {
    styles: Vec<String>,
    index: usize,
    in_flight: Option<TransitionToken>,
    next_token: u64,
}

impl BasemapController {
    pub fn new(styles: Vec<String>, initial: usize) -> Result<Self, ConfigError> {
        if styles.is_empty() {
            return Err(ConfigError::NoBasemaps);
        }
        if initial >= styles.len() {
            return Err(ConfigError::BasemapIndex {
                index: initial,
                len: styles.len(),
            });
        }
        Ok(Self {
            styles,
            index: initial,
            in_flight: None,
            next_token: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn current(&self) -> &str {
        &self.styles[self.index]
    }

    pub fn in_flight(&self) -> Option<TransitionToken> {
        self.in_flight
    }

    /// Moves to the next style and opens a new transition, superseding any pending one.
    pub fn advance(&mut self) -> TransitionToken {
        self.index = (self.index + 1) % self.styles.len();
        self.next_token = self.next_token.wrapping_add(1);
        let token = TransitionToken(self.next_token);
        if let Some(previous) = self.in_flight.replace(token) {
            debug!(previous = previous.0, next = token.0, "pending basemap switch superseded");
        }
        token
    }

    /// Advances and asks the engine for the new style plus a load notification.
    pub fn switch<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> TransitionToken {
        let token = self.advance();
        engine.set_style(self.current());
        engine.notify_style_loaded(token);
        info!(style = self.current(), token = token.0, "switching basemap");
        token
    }

    /// Closes the transition if `token` is the latest one. Stale tokens return `false`.
    pub fn complete(&mut self, token: TransitionToken) -> bool {
        if self.in_flight == Some(token) {
            self.in_flight = None;
            true
        } else {
            debug!(token = token.0, "ignoring load notification of a superseded basemap switch");
            false
        }
    }
}
