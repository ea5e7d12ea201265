//! Postal-code directory client (ViaCEP-compatible).

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::LookupError;

/// Raw directory record. Every field is optional; `erro` marks not-found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CepRecord {
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(default)]
    pub erro: Option<serde_json::Value>,
}

impl CepRecord {
    /// The directory answers `{"erro": true}` (or `"true"`) for unknown codes.
    pub fn is_not_found(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// A postal-code directory keyed by the normalized 8-digit code.
#[async_trait]
pub trait CepDirectory: Send + Sync {
    async fn lookup(&self, cep: &str) -> Result<CepRecord, LookupError>;
}

/// HTTP directory at `{base_url}/{cep}/json/`.
pub struct ViaCepDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl ViaCepDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, cep: &str) -> String {
        format!("{}/{cep}/json/", self.base_url)
    }
}

#[async_trait]
impl CepDirectory for ViaCepDirectory {
    async fn lookup(&self, cep: &str) -> Result<CepRecord, LookupError> {
        let resp = self
            .client
            .get(self.url(cep))
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LookupError::Status {
                status: resp.status().as_u16(),
            });
        }

        let record: CepRecord = resp
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        if record.is_not_found() {
            return Err(LookupError::NotFound {
                cep: cep.to_string(),
            });
        }
        Ok(record)
    }
}
