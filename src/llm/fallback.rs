//! Deterministic keyword responder used when remote generation fails.
//!
//! Rules are evaluated in order and the first match wins. Buckets overlap
//! ("fome" is both an ordering and a recommendation keyword), so the order
//! of `default_rules` is significant.

use regex::Regex;
use tracing::debug;

use crate::cart::StoreInfo;
use crate::safety::fold;

/// What the customer seems to want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Order,
    Menu,
    Recommendation,
    Checkout,
    Hours,
    Location,
    Payment,
    Greeting,
    Thanks,
}

/// A keyword bucket with a canned reply.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    /// Compiled alternation of the bucket's keywords.
    pub regex: Regex,
    pub reply: String,
}

/// Keyword-bucket responder. Never fails.
pub struct FallbackResponder {
    rules: Vec<IntentRule>,
    generic_reply: String,
}

const GENERIC_REPLY: &str = "Posso te ajudar com o cardápio! Use os botões + e - para \
adicionar itens ao carrinho e toque em \"Finalizar pedido\" quando estiver pronto.";

impl FallbackResponder {
    /// The standard bucket list, with hours and location taken from `store`.
    pub fn default_rules(store: &StoreInfo) -> Self {
        let rule = |intent, keywords: &[&str], reply: String| IntentRule {
            intent,
            regex: keyword_regex(keywords),
            reply,
        };

        let rules = vec![
            rule(
                Intent::Order,
                &["quero", "queria", "pedir", "pedido", "comprar", "fome", "me ve", "me da"],
                "Para pedir, use os botões + e - no cardápio para montar seu carrinho. \
                 Depois é só tocar em \"Finalizar pedido\"! 🍔"
                    .to_string(),
            ),
            rule(
                Intent::Menu,
                &[
                    "cardapio", "menu", "opcoes", "o que tem", "o que voces tem", "lanches",
                    "hamburgueres", "bebidas", "sobremesas", "preco", "precos", "quanto custa",
                ],
                "Nosso cardápio está logo acima: hambúrgueres, acompanhamentos, bebidas e \
                 sobremesas. Deslize entre as categorias para ver tudo!"
                    .to_string(),
            ),
            rule(
                Intent::Recommendation,
                &["recomenda", "recomendacao", "sugere", "sugestao", "indica", "melhor", "mais pedido", "fome", "popular"],
                "O Classic Burger é o campeão da casa! Combina muito bem com uma Batata Frita. \
                 Adicione pelo botão + no cardápio."
                    .to_string(),
            ),
            rule(
                Intent::Checkout,
                &["finalizar", "fechar o pedido", "fechar pedido", "checkout", "concluir", "terminar", "pagar agora"],
                "Quando terminar de escolher, toque em \"Finalizar pedido\" que eu pego seus \
                 dados de entrega."
                    .to_string(),
            ),
            rule(
                Intent::Hours,
                &["horario", "horarios", "abre", "fecha", "aberto", "aberta", "funcionamento", "que horas"],
                format!("Funcionamos {}.", store.hours),
            ),
            rule(
                Intent::Location,
                &["onde fica", "onde voces", "localizacao", "endereco da loja", "entregam", "entrega em", "retirar"],
                format!("Estamos na {}. Fazemos entregas na região!", store.location),
            ),
            rule(
                Intent::Payment,
                &["pagamento", "pagar", "pix", "cartao", "dinheiro", "credito", "debito", "vale refeicao"],
                "Aceitamos Pix, cartão de crédito/débito, dinheiro e vale-refeição. Você \
                 informa a forma de pagamento ao finalizar o pedido."
                    .to_string(),
            ),
            rule(
                Intent::Greeting,
                &["oi", "ola", "bom dia", "boa tarde", "boa noite", "e ai", "opa", "hello", "hey"],
                format!(
                    "Olá! Bem-vindo à {}! Dá uma olhada no cardápio e monte seu pedido. 😊",
                    store.name
                ),
            ),
            rule(
                Intent::Thanks,
                &["obrigado", "obrigada", "valeu", "agradeco", "thanks", "brigado"],
                "Por nada! Se precisar de algo, é só chamar.".to_string(),
            ),
        ];

        Self {
            rules,
            generic_reply: GENERIC_REPLY.to_string(),
        }
    }

    /// Classify `text` into the first matching bucket.
    pub fn classify(&self, text: &str) -> Option<Intent> {
        self.matching_rule(text).map(|rule| rule.intent)
    }

    /// Reply for `text`; the generic redirect when nothing matches.
    pub fn respond(&self, text: &str) -> String {
        match self.matching_rule(text) {
            Some(rule) => {
                debug!(intent = ?rule.intent, "Fallback responder matched");
                rule.reply.clone()
            }
            None => self.generic_reply.clone(),
        }
    }

    fn matching_rule(&self, text: &str) -> Option<&IntentRule> {
        let folded = fold(text);
        self.rules.iter().find(|rule| rule.regex.is_match(&folded))
    }
}

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("keyword alternation is a valid regex")
}
