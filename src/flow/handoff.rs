//! Messaging-app handoff: order message composition and deep links.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::model::UserData;
use crate::cart::{Cart, StoreInfo, format_brl};

/// Client device class, which picks the preferred link variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl std::str::FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!("Unknown device class: {other}")),
        }
    }
}

/// Deep-link flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkVariant {
    /// Opens the conversation with the message ready to send.
    AutoSend,
    /// Short link; the customer taps send.
    ManualSend,
}

/// Opens URLs on the client. Implementations report whether the attempt
/// succeeded (a blocked popup is a failure).
pub trait LinkOpener: Send + Sync {
    fn open_new_window(&self, url: &str) -> bool;
    fn open_same_tab(&self, url: &str) -> bool;
}

/// Opener for a remote rendering layer: every attempt is accepted and the
/// URL travels to the client in the session snapshot.
pub struct DeferredOpener;

impl LinkOpener for DeferredOpener {
    fn open_new_window(&self, url: &str) -> bool {
        info!(url, "Handoff link ready for client");
        true
    }

    fn open_same_tab(&self, url: &str) -> bool {
        info!(url, "Handoff link ready for client (same tab)");
        true
    }
}

/// The link that was actually opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffOutcome {
    pub variant: LinkVariant,
    pub url: String,
    pub same_tab: bool,
    /// False when even the same-tab attempt failed.
    pub opened: bool,
}

/// Itemized order text sent to the store.
pub fn compose_order_message(store: &StoreInfo, user: &UserData, cart: &Cart) -> String {
    let mut lines = vec![
        format!("*Novo pedido - {}*", store.name),
        String::new(),
        format!("*Cliente:* {}", user.name),
        format!("*Endereço:* {}", user.address),
        format!("*Pagamento:* {}", user.payment_method),
        String::new(),
        "*Itens:*".to_string(),
    ];
    for line in cart.lines() {
        lines.push(format!(
            "{}x {} - {}",
            line.quantity,
            line.item.name,
            format_brl(line.line_total())
        ));
    }
    lines.push(String::new());
    lines.push(format!("Subtotal: {}", format_brl(cart.subtotal())));
    lines.push(format!(
        "Taxa de entrega: {}",
        format_brl(cart.delivery_fee(store.delivery_fee))
    ));
    lines.push(format!("*Total: {}*", format_brl(cart.total(store.delivery_fee))));
    lines.join("\n")
}

pub fn deep_link(variant: LinkVariant, phone: &str, message: &str) -> String {
    let text = urlencoding::encode(message);
    match variant {
        LinkVariant::AutoSend => format!("https://api.whatsapp.com/send?phone={phone}&text={text}"),
        LinkVariant::ManualSend => format!("https://wa.me/{phone}?text={text}"),
    }
}

/// Open the order in the messaging app.
///
/// Desktop tries the auto-send link, then the manual link, in a new window.
/// Mobile goes straight to the manual link. The manual link is finally
/// tried in the same tab.
pub fn perform(
    opener: &dyn LinkOpener,
    device: DeviceClass,
    phone: &str,
    message: &str,
) -> HandoffOutcome {
    let manual = deep_link(LinkVariant::ManualSend, phone, message);

    if device == DeviceClass::Desktop {
        let auto = deep_link(LinkVariant::AutoSend, phone, message);
        if opener.open_new_window(&auto) {
            return HandoffOutcome {
                variant: LinkVariant::AutoSend,
                url: auto,
                same_tab: false,
                opened: true,
            };
        }
        warn!("Auto-send link blocked, trying manual link");
    }

    if opener.open_new_window(&manual) {
        return HandoffOutcome {
            variant: LinkVariant::ManualSend,
            url: manual,
            same_tab: false,
            opened: true,
        };
    }

    warn!("New window blocked, opening handoff in the same tab");
    let opened = opener.open_same_tab(&manual);
    if !opened {
        warn!("Handoff link could not be opened");
    }
    HandoffOutcome {
        variant: LinkVariant::ManualSend,
        url: manual,
        same_tab: true,
        opened,
    }
}
