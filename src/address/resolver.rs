//! Postal code → partial street address, reported through notifications.

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::lookup::{CepDirectory, CepRecord};
use crate::error::LookupError;
use crate::notifications::NotificationCenter;
use crate::validation::validate_cep;

static REPEATED_COMMAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,(\s*,)+").expect("valid regex"));

const MSG_OFFLINE: &str = "Você está offline. Digite o endereço manualmente.";
const MSG_NOT_FOUND: &str = "CEP não encontrado. Confira o número ou digite o endereço.";
const MSG_FAILED: &str = "Não foi possível consultar o CEP agora. Digite o endereço manualmente.";
const MSG_TIMEOUT: &str = "A consulta do CEP demorou demais. Digite o endereço manualmente.";
const MSG_INCOMPLETE: &str =
    "Encontramos o CEP, mas sem detalhes da rua. Digite o endereço completo.";
const MSG_BUSY: &str = "Aguarde, ainda estamos consultando o CEP anterior.";
const MSG_FOUND: &str = "Endereço encontrado!";

/// A resolved, not-yet-numbered address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAddress {
    pub cep: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl ResolvedAddress {
    fn from_record(cep: &str, record: CepRecord) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();
        Self {
            cep: cep.to_string(),
            street: clean(record.logradouro),
            neighborhood: clean(record.bairro),
            city: clean(record.localidade),
            state: clean(record.uf),
        }
    }

    fn is_incomplete(&self) -> bool {
        self.street.is_empty() && self.neighborhood.is_empty() && self.city.is_empty()
    }

    /// Single-line form, e.g. `Praça da Sé, Sé, São Paulo - SP`.
    pub fn display(&self) -> String {
        let city = match (self.city.is_empty(), self.state.is_empty()) {
            (false, false) => format!("{} - {}", self.city, self.state),
            (false, true) => self.city.clone(),
            (true, _) => self.state.clone(),
        };
        let joined = [self.street.as_str(), self.neighborhood.as_str(), city.as_str()].join(", ");
        REPEATED_COMMAS
            .replace_all(&joined, ",")
            .trim_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string()
    }
}

/// Holds the single-lookup flag; released on drop, including when the
/// lookup future is cancelled.
struct LookupGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LookupGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Resolves postal codes through a [`CepDirectory`].
///
/// Never returns an error: every outcome is reported through the
/// notification center and failures yield `None`.
pub struct AddressResolver {
    directory: Arc<dyn CepDirectory>,
    notifications: Arc<NotificationCenter>,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl AddressResolver {
    pub fn new(
        directory: Arc<dyn CepDirectory>,
        notifications: Arc<NotificationCenter>,
        timeout: Duration,
    ) -> Self {
        Self {
            directory,
            notifications,
            timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a lookup is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn resolve(&self, raw_cep: &str, online: bool) -> Option<ResolvedAddress> {
        let validation = validate_cep(raw_cep);
        if let Some(error) = validation.error {
            debug!(cep = raw_cep, kind = ?error.kind, "Postal code rejected before lookup");
            self.notifications.error(error.message).await;
            return None;
        }
        let cep = validation.normalized;

        if !online {
            self.report(&LookupError::Offline).await;
            return None;
        }

        let Some(guard) = LookupGuard::acquire(&self.in_flight) else {
            self.report(&LookupError::Busy).await;
            return None;
        };

        let outcome = tokio::time::timeout(self.timeout, self.directory.lookup(&cep)).await;
        drop(guard);

        let record = match outcome {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                self.report(&e).await;
                return None;
            }
            Err(_) => {
                self.report(&LookupError::Timeout(self.timeout)).await;
                return None;
            }
        };

        let address = ResolvedAddress::from_record(&cep, record);
        if address.is_incomplete() {
            info!(%cep, "Postal code resolved without street details");
            self.notifications.warning(MSG_INCOMPLETE).await;
            return None;
        }

        info!(%cep, address = %address.display(), "Postal code resolved");
        self.notifications.success(MSG_FOUND).await;
        Some(address)
    }

    async fn report(&self, error: &LookupError) {
        warn!(error = %error, "Postal code lookup failed");
        let message = match error {
            LookupError::Offline => MSG_OFFLINE,
            LookupError::Busy => {
                self.notifications.info(MSG_BUSY).await;
                return;
            }
            LookupError::NotFound { .. } => MSG_NOT_FOUND,
            LookupError::Timeout(_) => MSG_TIMEOUT,
            LookupError::Status { .. } | LookupError::Transport(_) | LookupError::Decode(_) => {
                MSG_FAILED
            }
        };
        self.notifications.error(message).await;
    }
}
