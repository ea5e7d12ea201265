//! Field validators for the checkout dialogue.
//!
//! Every validator is pure and returns a result struct; none of them
//! return `Err` or panic. Callers branch on `valid`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Postal-code digits required after normalization.
pub const CEP_DIGITS: usize = 8;
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const ADDRESS_MIN_CHARS: usize = 5;
pub const ADDRESS_NUMBER_MAX_CHARS: usize = 50;
pub const PAYMENT_MIN_CHARS: usize = 2;
pub const PAYMENT_MAX_CHARS: usize = 50;

static CEP_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}\.?\d{3}-?\d{3}\b").expect("valid regex"));
static NAME_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z\x{00C0}-\x{024F}]").expect("valid regex"));
static DIGITS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s]+$").expect("valid regex"));
static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+[A-Za-z]?\b").expect("valid regex"));
static NO_NUMBER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[\s,])(s\s*/\s*n|s\.\s*n\.?|sem\s+n[uú]mero)([\s,.]|$)").expect("valid regex")
});

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldErrorKind {
    Empty,
    LengthMismatch,
    Implausible,
    TooShort,
    TooLong,
    NotAName,
    MissingNumber,
}

/// A field-level validation failure with a customer-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Postal-code (CEP) validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CepValidation {
    pub valid: bool,
    /// The 8-digit code; empty unless valid.
    pub normalized: String,
    pub error: Option<FieldError>,
}

/// Name validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValidation {
    pub valid: bool,
    /// Trimmed name, truncated to the maximum length for redisplay.
    pub cleaned: String,
    pub error: Option<FieldError>,
}

/// Which part of an address is still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMissing {
    Number,
    All,
}

/// Address validation result.
///
/// `missing == Some(Number)` is a soft failure: the controller asks for the
/// number next instead of rejecting the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressValidation {
    pub valid: bool,
    pub missing: Option<AddressMissing>,
    pub error: Option<FieldError>,
}

/// Result for validators without a normalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidation {
    pub valid: bool,
    pub error: Option<FieldError>,
}

impl FieldValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn fail(error: FieldError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// Validate a Brazilian postal code (CEP).
pub fn validate_cep(input: &str) -> CepValidation {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    let fail = |error: FieldError| CepValidation {
        valid: false,
        normalized: String::new(),
        error: Some(error),
    };

    if digits.is_empty() {
        return fail(FieldError::new(FieldErrorKind::Empty, "Informe o CEP."));
    }

    if digits.len() != CEP_DIGITS {
        return fail(FieldError::new(
            FieldErrorKind::LengthMismatch,
            format!(
                "O CEP deve ter {CEP_DIGITS} dígitos (você digitou {}).",
                digits.len()
            ),
        ));
    }

    if is_implausible_cep(&digits) {
        return fail(FieldError::new(
            FieldErrorKind::Implausible,
            "Esse CEP não parece válido. Confira os números.",
        ));
    }

    CepValidation {
        valid: true,
        normalized: digits,
        error: None,
    }
}

fn is_implausible_cep(digits: &str) -> bool {
    let mut chars = digits.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    // Unreachable for ASCII digits; kept as an explicit guard.
    if !first.is_ascii_digit() {
        return true;
    }
    chars.all(|c| c == first) || digits == "12345678" || digits == "87654321"
}

/// Find the first postal-code-looking substring in free text.
pub fn find_cep(text: &str) -> Option<&str> {
    CEP_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Validate a customer name.
pub fn validate_name(input: &str) -> NameValidation {
    let trimmed = input.trim();
    let length = trimmed.chars().count();

    if length < NAME_MIN_CHARS {
        return NameValidation {
            valid: false,
            cleaned: trimmed.to_string(),
            error: Some(FieldError::new(
                FieldErrorKind::TooShort,
                format!("O nome deve ter pelo menos {NAME_MIN_CHARS} letras."),
            )),
        };
    }

    if length > NAME_MAX_CHARS {
        return NameValidation {
            valid: false,
            cleaned: trimmed.chars().take(NAME_MAX_CHARS).collect(),
            error: Some(FieldError::new(
                FieldErrorKind::TooLong,
                format!("O nome pode ter no máximo {NAME_MAX_CHARS} caracteres."),
            )),
        };
    }

    if DIGITS_AND_SPACES.is_match(trimmed) || !NAME_LETTER.is_match(trimmed) {
        return NameValidation {
            valid: false,
            cleaned: trimmed.to_string(),
            error: Some(FieldError::new(
                FieldErrorKind::NotAName,
                "Isso não parece um nome. Como posso te chamar?",
            )),
        };
    }

    NameValidation {
        valid: true,
        cleaned: trimmed.to_string(),
        error: None,
    }
}

/// Validate a free-text street address.
///
/// "s/n" (no number) counts as having a number.
pub fn validate_address(input: &str) -> AddressValidation {
    let trimmed = input.trim();

    if trimmed.chars().count() < ADDRESS_MIN_CHARS {
        return AddressValidation {
            valid: false,
            missing: Some(AddressMissing::All),
            error: Some(FieldError::new(
                FieldErrorKind::TooShort,
                "Endereço muito curto. Informe rua, número e bairro.",
            )),
        };
    }

    if has_number(trimmed) {
        return AddressValidation {
            valid: true,
            missing: None,
            error: None,
        };
    }

    AddressValidation {
        valid: false,
        missing: Some(AddressMissing::Number),
        error: Some(FieldError::new(
            FieldErrorKind::MissingNumber,
            "Faltou o número do endereço.",
        )),
    }
}

fn has_number(address: &str) -> bool {
    NUMBER_TOKEN.is_match(address) || NO_NUMBER_MARKER.is_match(address)
}

/// Validate a house number or complement. Non-numeric values are accepted.
pub fn validate_address_number(input: &str) -> FieldValidation {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return FieldValidation::fail(FieldError::new(
            FieldErrorKind::Empty,
            "Informe o número (ou complemento) do endereço.",
        ));
    }
    if trimmed.chars().count() > ADDRESS_NUMBER_MAX_CHARS {
        return FieldValidation::fail(FieldError::new(
            FieldErrorKind::TooLong,
            format!("O número pode ter no máximo {ADDRESS_NUMBER_MAX_CHARS} caracteres."),
        ));
    }
    FieldValidation::ok()
}

/// Validate a payment method. Free text within the length bounds.
pub fn validate_payment(input: &str) -> FieldValidation {
    let length = input.trim().chars().count();
    if length < PAYMENT_MIN_CHARS {
        return FieldValidation::fail(FieldError::new(
            FieldErrorKind::TooShort,
            "Informe a forma de pagamento (ex.: Pix, cartão, dinheiro).",
        ));
    }
    if length > PAYMENT_MAX_CHARS {
        return FieldValidation::fail(FieldError::new(
            FieldErrorKind::TooLong,
            format!("A forma de pagamento pode ter no máximo {PAYMENT_MAX_CHARS} caracteres."),
        ));
    }
    FieldValidation::ok()
}
