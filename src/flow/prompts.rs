//! Bot copy for each step of the dialogue.

use super::model::UserData;
use super::state::EditTarget;
use crate::cart::{Cart, StoreInfo, format_brl};

/// Persistent warning shown while the client is offline.
pub const OFFLINE_WARNING: &str =
    "Você está sem conexão. Você ainda pode montar o pedido pelo cardápio.";
pub const BACK_ONLINE: &str = "Conexão restabelecida!";
pub const OFFLINE_REPLY: &str = "Estou sem conexão no momento, mas você pode continuar \
montando seu pedido pelo cardápio. Assim que a conexão voltar, respondo suas dúvidas!";
pub const EMPTY_CART: &str =
    "Seu carrinho está vazio. Adicione pelo menos um item do cardápio antes de finalizar.";
pub const ASK_ADDRESS_AGAIN: &str =
    "Sem problemas. Informe o CEP ou o endereço completo (rua, número e bairro).";
pub const CEP_UNUSABLE: &str =
    "Não consegui usar esse CEP. Digite o endereço completo (rua, número e bairro).";
pub const ASK_PAYMENT: &str = "Como você prefere pagar? (Pix, cartão ou dinheiro)";
pub const EDIT_MENU: &str = "O que você deseja alterar?\n1. Nome\n2. Endereço\n3. Forma de pagamento\n\
Ou digite \"voltar\" para revisar o pedido.";
pub const REVIEW_HINT: &str =
    "Digite \"confirmar\" para enviar o pedido ou \"editar\" para alterar seus dados.";
pub const FINISHING: &str = "Perfeito! Estou preparando seu pedido para envio...";
pub const FAREWELL: &str = "Obrigado pela visita! Até a próxima. 👋";
pub const DATA_UPDATED: &str = "Dados atualizados!";
pub const ITEM_NOT_FOUND: &str = "Item não encontrado no cardápio.";
pub const VOICE_UNSUPPORTED: &str = "Seu navegador não suporta reconhecimento de voz.";
pub const VOICE_LISTENING: &str = "Ouvindo... fale seu pedido.";
pub const VOICE_ALREADY_ACTIVE: &str = "O microfone já está ativo.";
pub const VOICE_FAILED: &str = "Não foi possível iniciar o microfone.";

pub fn greeting(store: &StoreInfo) -> String {
    format!(
        "Olá! 👋 Bem-vindo à {}! Escolha seus itens no cardápio usando os botões + e -. \
         Se tiver alguma dúvida, é só me perguntar aqui.",
        store.name
    )
}

pub fn ask_name(cart: &Cart, store: &StoreInfo) -> String {
    format!(
        "Ótimo! Seu pedido ficou em {}. Para continuar, qual é o seu nome?",
        format_brl(cart.total(store.delivery_fee))
    )
}

pub fn ask_address(name: &str) -> String {
    format!(
        "Prazer, {name}! Qual é o endereço de entrega? Você pode informar o CEP \
         ou o endereço completo (rua, número e bairro)."
    )
}

pub fn confirm_address(address: &str) -> String {
    format!("Encontrei: {address}. Está correto? (sim/não)")
}

pub fn confirm_address_unclear(address: &str) -> String {
    format!("Não entendi. O endereço {address} está correto? Responda sim ou não.")
}

pub fn ask_number(base: &str) -> String {
    format!("Qual é o número e o complemento (se houver)? Endereço: {base}")
}

/// Re-prompt after a validation failure.
pub fn retry(error: &str, prompt: &str) -> String {
    format!("{error} {prompt}")
}

pub fn edit_prompt(target: EditTarget, current: &str) -> String {
    let question = match target {
        EditTarget::Name => "Qual é o seu nome?",
        EditTarget::Address => "Informe o CEP ou o endereço completo (rua, número e bairro).",
        EditTarget::Payment => ASK_PAYMENT,
    };
    if current.is_empty() {
        question.to_string()
    } else {
        format!("Atual: {current}. {question}")
    }
}

pub fn incomplete_profile(target: EditTarget) -> String {
    format!("Falta informar: {}. Complete seus dados antes de confirmar.", target.label())
}

/// Order review shown before confirmation.
pub fn review_summary(store: &StoreInfo, user: &UserData, cart: &Cart) -> String {
    let mut lines = vec!["📋 Resumo do pedido".to_string(), String::new()];
    for line in cart.lines() {
        lines.push(format!(
            "{}x {} - {}",
            line.quantity,
            line.item.name,
            format_brl(line.line_total())
        ));
    }
    lines.extend([
        String::new(),
        format!("Subtotal: {}", format_brl(cart.subtotal())),
        format!("Entrega: {}", format_brl(cart.delivery_fee(store.delivery_fee))),
        format!("Total: {}", format_brl(cart.total(store.delivery_fee))),
        String::new(),
        format!("Nome: {}", user.name),
        format!("Endereço: {}", user.address),
        format!("Pagamento: {}", user.payment_method),
        String::new(),
        REVIEW_HINT.to_string(),
    ]);
    lines.join("\n")
}

pub fn sent(opened: bool) -> String {
    if opened {
        "Pedido pronto! Abrimos o WhatsApp da loja com o resumo do seu pedido. \
         É só enviar a mensagem para confirmar. 😋"
            .to_string()
    } else {
        "Pedido pronto! Não conseguimos abrir o WhatsApp automaticamente. \
         Use o link do pedido para enviá-lo à loja."
            .to_string()
    }
}
