//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::cart::menu::StoreInfo;
use crate::error::ConfigError;
use crate::flow::handoff::DeviceClass;
use crate::llm::retry::RetryPolicy;

/// Default postal-code directory (ViaCEP).
pub const DEFAULT_CEP_ENDPOINT: &str = "https://viacep.com.br/ws";
/// Default text-generation endpoint.
pub const DEFAULT_TEXT_ENDPOINT: &str = "https://text.pollinations.ai/";
/// Default image-generation endpoint.
pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://image.pollinations.ai/prompt";

/// Instruction prepended to every remote text-generation prompt.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
Você é o atendente virtual de uma hamburgueria delivery. Responda em português, \
de forma simpática e curta (no máximo 3 frases). Você NÃO registra pedidos: \
quando o cliente quiser pedir, oriente-o a usar os botões + e - do cardápio e \
depois o botão \"Finalizar pedido\". Não invente itens nem preços.";

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    pub store: StoreInfo,
    /// Base URL of the postal-code directory; `/{cep}/json/` is appended.
    pub cep_endpoint: String,
    pub text_endpoint: String,
    pub image_endpoint: String,
    pub system_instruction: String,
    pub lookup_timeout: Duration,
    pub generation_timeout: Duration,
    pub retry: RetryPolicy,
    /// Prior chat turns included in each generation prompt.
    pub history_turns: usize,
    /// Lifetime of a dismissible notification.
    pub notification_ttl: Duration,
    pub max_notifications: usize,
    pub sweep_interval: Duration,
    /// Progress increment (percent) of the finishing sequence.
    pub progress_step: u8,
    pub progress_tick: Duration,
    pub device: DeviceClass,
    /// Port for the HTTP UI boundary; disabled when `None`.
    pub http_port: Option<u16>,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            store: StoreInfo::default(),
            cep_endpoint: DEFAULT_CEP_ENDPOINT.to_string(),
            text_endpoint: DEFAULT_TEXT_ENDPOINT.to_string(),
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            lookup_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            history_turns: 6,
            notification_ttl: Duration::from_secs(5),
            max_notifications: 4,
            sweep_interval: Duration::from_secs(1),
            progress_step: 20,
            progress_tick: Duration::from_millis(300),
            device: DeviceClass::Desktop,
            http_port: None,
        }
    }
}

impl OrderConfig {
    /// Build from `ORDER_ASSIST_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("ORDER_ASSIST_STORE_NAME") {
            config.store.name = name;
        }
        if let Some(phone) = lookup("ORDER_ASSIST_WHATSAPP") {
            config.store.whatsapp = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        }
        if let Some(fee) = parse::<Decimal>(&lookup, "ORDER_ASSIST_DELIVERY_FEE")? {
            if fee < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    key: "ORDER_ASSIST_DELIVERY_FEE".into(),
                    message: "must not be negative".into(),
                });
            }
            config.store.delivery_fee = fee;
        }
        if let Some(hours) = lookup("ORDER_ASSIST_HOURS") {
            config.store.hours = hours;
        }
        if let Some(location) = lookup("ORDER_ASSIST_LOCATION") {
            config.store.location = location;
        }
        if let Some(url) = lookup("ORDER_ASSIST_CEP_ENDPOINT") {
            config.cep_endpoint = url;
        }
        if let Some(url) = lookup("ORDER_ASSIST_TEXT_ENDPOINT") {
            config.text_endpoint = url;
        }
        if let Some(url) = lookup("ORDER_ASSIST_IMAGE_ENDPOINT") {
            config.image_endpoint = url;
        }
        if let Some(instruction) = lookup("ORDER_ASSIST_SYSTEM_PROMPT") {
            config.system_instruction = instruction;
        }
        if let Some(secs) = parse::<u64>(&lookup, "ORDER_ASSIST_LOOKUP_TIMEOUT_SECS")? {
            config.lookup_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "ORDER_ASSIST_GENERATION_TIMEOUT_SECS")? {
            config.generation_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse::<u32>(&lookup, "ORDER_ASSIST_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(ms) = parse::<u64>(&lookup, "ORDER_ASSIST_BACKOFF_BASE_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(turns) = parse::<usize>(&lookup, "ORDER_ASSIST_HISTORY_TURNS")? {
            config.history_turns = turns;
        }
        if let Some(ms) = parse::<u64>(&lookup, "ORDER_ASSIST_PROGRESS_TICK_MS")? {
            config.progress_tick = Duration::from_millis(ms);
        }
        if let Some(device) = parse::<DeviceClass>(&lookup, "ORDER_ASSIST_DEVICE")? {
            config.device = device;
        }
        config.http_port = parse::<u16>(&lookup, "ORDER_ASSIST_HTTP_PORT")?;

        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Default delivery fee.
pub const DEFAULT_DELIVERY_FEE: Decimal = dec!(7.00);

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = OrderConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.lookup_timeout, Duration::from_secs(10));
        assert_eq!(config.generation_timeout, Duration::from_secs(15));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.history_turns, 6);
        assert_eq!(config.max_notifications, 4);
        assert_eq!(config.store.delivery_fee, DEFAULT_DELIVERY_FEE);
        assert!(config.http_port.is_none());
    }

    #[test]
    fn overrides_from_env() {
        let config = OrderConfig::from_lookup(lookup_from(&[
            ("ORDER_ASSIST_STORE_NAME", "Burger Bros"),
            ("ORDER_ASSIST_WHATSAPP", "+55 (11) 99999-0000"),
            ("ORDER_ASSIST_DELIVERY_FEE", "5.50"),
            ("ORDER_ASSIST_DEVICE", "mobile"),
            ("ORDER_ASSIST_HTTP_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.store.name, "Burger Bros");
        assert_eq!(config.store.whatsapp, "5511999990000");
        assert_eq!(config.store.delivery_fee, dec!(5.50));
        assert_eq!(config.device, DeviceClass::Mobile);
        assert_eq!(config.http_port, Some(8080));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = OrderConfig::from_lookup(lookup_from(&[("ORDER_ASSIST_HTTP_PORT", "abc")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ORDER_ASSIST_HTTP_PORT"));

        let err = OrderConfig::from_lookup(lookup_from(&[("ORDER_ASSIST_DELIVERY_FEE", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err: crate::error::Error = err.into();
        assert!(err.to_string().starts_with("Configuration error: Invalid configuration value"));
    }
}
