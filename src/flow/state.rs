//! Conversation state machine: which question is currently open.

use serde::{Deserialize, Serialize};

use crate::safety::fold;

/// The single active step of the ordering dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Ordering,
    AskName,
    AskAddress,
    AskAddressNumber,
    ConfirmAddress,
    AskPayment,
    Review,
    EditInfo,
    Finished,
}

impl FlowStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowStep) -> bool {
        use FlowStep::*;
        matches!(
            (self, target),
            (Ordering, AskName)
                | (AskName, AskAddress)
                | (AskName, Review)
                | (AskAddress, ConfirmAddress)
                | (AskAddress, AskAddressNumber)
                | (AskAddress, AskPayment)
                | (AskAddress, Review)
                | (ConfirmAddress, AskAddressNumber)
                | (ConfirmAddress, AskAddress)
                | (AskAddressNumber, AskPayment)
                | (AskAddressNumber, Review)
                | (AskPayment, Review)
                | (Review, Finished)
                | (Review, EditInfo)
                | (Review, Ordering)
                | (EditInfo, AskName)
                | (EditInfo, AskAddress)
                | (EditInfo, AskPayment)
                | (EditInfo, Review)
        )
    }
}

impl Default for FlowStep {
    fn default() -> Self {
        Self::Ordering
    }
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ordering => "ordering",
            Self::AskName => "ask_name",
            Self::AskAddress => "ask_address",
            Self::AskAddressNumber => "ask_address_number",
            Self::ConfirmAddress => "confirm_address",
            Self::AskPayment => "ask_payment",
            Self::Review => "review",
            Self::EditInfo => "edit_info",
            Self::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

/// Which customer field is being edited from the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditTarget {
    Name,
    Address,
    Payment,
}

impl EditTarget {
    /// The step that collects this field.
    pub fn step(&self) -> FlowStep {
        match self {
            Self::Name => FlowStep::AskName,
            Self::Address => FlowStep::AskAddress,
            Self::Payment => FlowStep::AskPayment,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "nome",
            Self::Address => "endereço",
            Self::Payment => "forma de pagamento",
        }
    }
}

impl std::str::FromStr for EditTarget {
    type Err = String;

    /// Accepts menu numbers and Portuguese field names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s.trim());
        match folded.trim_end_matches(['.', ')']) {
            "1" | "nome" | "name" => Ok(Self::Name),
            "2" | "endereco" | "address" => Ok(Self::Address),
            "3" | "pagamento" | "forma de pagamento" | "payment" => Ok(Self::Payment),
            _ => Err(format!("Unknown field: {}", s)),
        }
    }
}

/// Customer reply to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unclear,
}

impl Answer {
    /// Classify by the first word, ignoring case, accents and punctuation.
    pub fn parse(text: &str) -> Self {
        let folded = fold(text);
        let first = folded
            .split(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == '!')
            .find(|w| !w.is_empty())
            .unwrap_or("");
        match first {
            "sim" | "s" | "yes" | "isso" | "correto" | "certo" | "confirmo" | "confirma" | "ok"
            | "exato" | "perfeito" => Self::Yes,
            "nao" | "n" | "no" | "errado" | "incorreto" | "negativo" => Self::No,
            _ => Self::Unclear,
        }
    }
}
