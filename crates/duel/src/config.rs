//! Client configuration.

use std::time::Duration;

use duel_effects::EffectTimings;
use duel_protocol::PlayerId;
use duel_session::SideChannelConfig;
use tracing::warn;

use crate::DuelError;

/// `"true"` selects `wss://`; anything else selects `ws://`.
pub const ENV_SECURE_CONNECTION: &str = "DUEL_SECURE_CONNECTION";
/// Server `host[:port]`.
pub const ENV_SERVER_HOST: &str = "DUEL_SERVER_HOST";
/// The local player's id.
pub const ENV_PLAYER_ID: &str = "DUEL_PLAYER_ID";

const DEFAULT_HOST: &str = "127.0.0.1:8080";
const MIN_DEADLINE: Duration = Duration::from_secs(1);

/// Screen dimensions used to aim effects that have no unit to aim at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Everything the client needs to connect and pace a match.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// Server `host[:port]`.
    pub host: String,
    /// The local player. Prompts addressed to anyone else are not answered.
    pub player_id: PlayerId,
    /// Time limit on the option panel.
    pub option_deadline: Duration,
    /// Time limit on card selection when the server sends none.
    pub card_deadline: Duration,
    /// Mulligan countdown.
    pub mulligan: Duration,
    /// Length of one turn on the turn timer.
    pub turn_timer: Duration,
    /// Upper bound on prompts that carry no deadline (unit, block,
    /// intercept, effect dialog).
    pub prompt_watchdog: Duration,
    /// How long a correlated request waits for its response.
    pub request_timeout: Duration,
    pub screen: ScreenSize,
    pub effects: EffectTimings,
    pub side_channel: SideChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            secure: false,
            host: DEFAULT_HOST.to_string(),
            player_id: PlayerId::from(""),
            option_deadline: Duration::from_secs(10),
            card_deadline: Duration::from_secs(10),
            mulligan: Duration::from_secs(10),
            turn_timer: Duration::from_secs(60),
            prompt_watchdog: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            screen: ScreenSize::default(),
            effects: EffectTimings::default(),
            side_channel: SideChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// A default configuration for `player_id`.
    pub fn for_player(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    /// Reads `DUEL_SECURE_CONNECTION`, `DUEL_SERVER_HOST` and
    /// `DUEL_PLAYER_ID` from the environment.
    ///
    /// # Errors
    /// Returns [`DuelError::Config`] if the player id is missing.
    pub fn from_env() -> Result<Self, DuelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading from `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DuelError> {
        let player_id = lookup(ENV_PLAYER_ID)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DuelError::Config(format!("{ENV_PLAYER_ID} is not set")))?;

        let mut config = Self::for_player(player_id);
        config.secure = lookup(ENV_SECURE_CONNECTION).as_deref() == Some("true");
        if let Some(host) = lookup(ENV_SERVER_HOST) {
            config.host = host;
        }
        Ok(config.validated())
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_option_deadline(mut self, deadline: Duration) -> Self {
        self.option_deadline = deadline;
        self
    }

    pub fn with_card_deadline(mut self, deadline: Duration) -> Self {
        self.card_deadline = deadline;
        self
    }

    pub fn with_mulligan(mut self, countdown: Duration) -> Self {
        self.mulligan = countdown;
        self
    }

    pub fn with_turn_timer(mut self, length: Duration) -> Self {
        self.turn_timer = length;
        self
    }

    pub fn with_prompt_watchdog(mut self, watchdog: Duration) -> Self {
        self.prompt_watchdog = watchdog;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_screen(mut self, width: f64, height: f64) -> Self {
        self.screen = ScreenSize { width, height };
        self
    }

    /// The server URL, `ws://host` or `wss://host`.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}", self.host)
    }

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - an empty host falls back to `127.0.0.1:8080`
    /// - prompt deadlines, the watchdog and the request timeout are at
    ///   least one second, so no prompt can resolve before it is shown
    /// - a non-positive or non-finite screen size falls back to 1280×720
    pub fn validated(mut self) -> Self {
        let host = self.host.trim();
        if host.is_empty() {
            warn!("empty server host, using {DEFAULT_HOST}");
            self.host = DEFAULT_HOST.to_string();
        } else if host.len() != self.host.len() {
            self.host = host.to_string();
        }

        for (name, value) in [
            ("option_deadline", &mut self.option_deadline),
            ("card_deadline", &mut self.card_deadline),
            ("mulligan", &mut self.mulligan),
            ("turn_timer", &mut self.turn_timer),
            ("prompt_watchdog", &mut self.prompt_watchdog),
            ("request_timeout", &mut self.request_timeout),
        ] {
            if *value < MIN_DEADLINE {
                warn!(setting = name, ?value, "below minimum, clamping to 1s");
                *value = MIN_DEADLINE;
            }
        }

        let ScreenSize { width, height } = self.screen;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!(width, height, "invalid screen size, using default");
            self.screen = ScreenSize::default();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.option_deadline, Duration::from_secs(10));
        assert_eq!(config.mulligan, Duration::from_secs(10));
        assert_eq!(config.turn_timer, Duration::from_secs(60));
        assert_eq!(config.url(), "ws://127.0.0.1:8080");
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_PLAYER_ID, "alice"),
            (ENV_SECURE_CONNECTION, "true"),
            (ENV_SERVER_HOST, "duel.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.player_id, PlayerId::from("alice"));
        assert_eq!(config.url(), "wss://duel.example.com");
    }

    #[test]
    fn test_secure_flag_must_be_exactly_true() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_PLAYER_ID, "alice"),
            (ENV_SECURE_CONNECTION, "yes"),
        ]))
        .unwrap();
        assert!(!config.secure);
        assert_eq!(config.url(), "ws://127.0.0.1:8080");
    }

    #[test]
    fn test_missing_player_id_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_PLAYER_ID, "  ")])).unwrap_err();
        assert!(matches!(err, DuelError::Config(_)));
        assert!(err.to_string().contains(ENV_PLAYER_ID));
    }

    #[test]
    fn test_validated_clamps() {
        let config = ClientConfig::for_player("me")
            .with_host("   ")
            .with_option_deadline(Duration::ZERO)
            .with_screen(-1.0, f64::NAN)
            .validated();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.option_deadline, MIN_DEADLINE);
        assert_eq!(config.screen, ScreenSize::default());
    }
}
