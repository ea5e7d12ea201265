//! CLI channel: stdin/stdout REPL over an [`OrderSession`].

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::error;

use crate::cart::{Category, format_brl};
use crate::flow::{ButtonAction, OrderSession, Sender, UiEvent};
use crate::notifications::NotificationEvent;

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Event(UiEvent),
    /// Print the menu, optionally switching category first.
    Menu(Option<Category>),
    Cart,
    Help,
    Quit,
}

const HELP: &str = "\
Comandos:
  /menu [categoria]   mostra o cardápio (burgers, sides, drinks, desserts)
  /add <id>           adiciona um item
  /remove <id>        remove um item
  /cart               mostra o carrinho
  /checkout           finaliza o pedido
  /confirm            confirma o pedido na revisão
  /back               volta / edita os dados
  /offline, /online   simula a conexão
  /quit               encerra
Qualquer outro texto é enviado ao atendente.";

/// Parse one input line. Anything that is not a slash command is chat text.
pub fn parse_command(line: &str) -> Result<CliCommand, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(CliCommand::Event(UiEvent::SubmitText {
            text: line.to_string(),
        }));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();

    let item_id = |arg: Option<&str>| -> Result<u32, String> {
        arg.ok_or_else(|| format!("Uso: /{name} <id>"))?
            .parse::<u32>()
            .map_err(|_| format!("Id inválido: {}", arg.unwrap_or("")))
    };

    let action = |action: ButtonAction| -> Result<CliCommand, String> {
        Ok(CliCommand::Event(UiEvent::Action { action }))
    };

    match name {
        "menu" => match arg {
            None => Ok(CliCommand::Menu(None)),
            Some(raw) => raw.parse::<Category>().map(|c| CliCommand::Menu(Some(c))),
        },
        "add" => Ok(CliCommand::Event(UiEvent::AddItem {
            item_id: item_id(arg)?,
        })),
        "remove" => Ok(CliCommand::Event(UiEvent::RemoveItem {
            item_id: item_id(arg)?,
        })),
        "cart" => Ok(CliCommand::Cart),
        "checkout" => action(ButtonAction::Checkout),
        "confirm" => action(ButtonAction::Confirm),
        "back" => action(ButtonAction::Back),
        "offline" => Ok(CliCommand::Event(UiEvent::SetOnline { online: false })),
        "online" => Ok(CliCommand::Event(UiEvent::SetOnline { online: true })),
        "help" => Ok(CliCommand::Help),
        "quit" | "exit" => Ok(CliCommand::Quit),
        other => Err(format!("Comando desconhecido: /{other}. Digite /help.")),
    }
}

/// Reads stdin lines and drives a shared session.
pub struct CliChannel {
    session: Arc<Mutex<OrderSession>>,
}

impl CliChannel {
    pub fn new(session: Arc<Mutex<OrderSession>>) -> Self {
        Self { session }
    }

    /// Run until `/quit`, EOF, or the session locks.
    pub async fn run(&self) {
        let mut seen = 0;
        self.print_new_messages(&mut seen).await;
        self.spawn_notification_printer().await;

        let reader = BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();
        eprint!("> ");

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                eprint!("> ");
                continue;
            }

            match parse_command(&line) {
                Ok(CliCommand::Event(event)) => {
                    self.session.lock().await.dispatch(event).await;
                }
                Ok(CliCommand::Menu(category)) => {
                    let mut session = self.session.lock().await;
                    if let Some(category) = category {
                        session.dispatch(UiEvent::SelectCategory { category }).await;
                    }
                    print_menu(&session);
                }
                Ok(CliCommand::Cart) => print_cart(&*self.session.lock().await),
                Ok(CliCommand::Help) => println!("{HELP}"),
                Ok(CliCommand::Quit) => {
                    self.session.lock().await.dispatch(UiEvent::ConfirmExit).await;
                    self.print_new_messages(&mut seen).await;
                    break;
                }
                Err(message) => eprintln!("{message}"),
            }

            self.print_new_messages(&mut seen).await;
            if self.session.lock().await.is_locked() {
                break;
            }
            eprint!("> ");
        }
    }

    async fn print_new_messages(&self, seen: &mut usize) {
        let session = self.session.lock().await;
        let messages = session.messages();
        for message in &messages[(*seen).min(messages.len())..] {
            if message.sender == Sender::Bot {
                println!("\n🍔 [{}] {}", message.timestamp, message.text);
                if let Some(image) = &message.image {
                    println!("   🖼  {image}");
                }
            }
        }
        *seen = messages.len();

        if let Some(handoff) = session.handoff() {
            println!("\n📲 {}\n", handoff.url);
        }
    }

    async fn spawn_notification_printer(&self) {
        let mut rx = self.session.lock().await.notifications().subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let NotificationEvent::Shown { notification } = event {
                    eprintln!("\n[{}] {}", notification.severity, notification.message);
                }
            }
        });
    }
}

fn print_menu(session: &OrderSession) {
    let category = session.selected_category();
    println!("\n── {} ──", category.label());
    for item in session.menu().by_category(category) {
        println!(
            "  {:>2}. {} - {} ({}x no carrinho)",
            item.id,
            item.name,
            format_brl(item.price),
            session.cart().quantity_of(item.id)
        );
    }
    println!();
}

fn print_cart(session: &OrderSession) {
    let cart = session.cart();
    if cart.is_empty() {
        println!("\nCarrinho vazio.\n");
        return;
    }
    let fee = session.store().delivery_fee;
    println!();
    for line in cart.lines() {
        println!(
            "  {}x {} - {}",
            line.quantity,
            line.item.name,
            format_brl(line.line_total())
        );
    }
    println!("  Subtotal: {}", format_brl(cart.subtotal()));
    println!("  Entrega: {}", format_brl(cart.delivery_fee(fee)));
    println!("  Total: {}\n", format_brl(cart.total(fee)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_submitted() {
        assert_eq!(
            parse_command("  quero um burger ").unwrap(),
            CliCommand::Event(UiEvent::SubmitText {
                text: "quero um burger".into()
            })
        );
    }

    #[test]
    fn slash_commands() {
        assert_eq!(
            parse_command("/add 3").unwrap(),
            CliCommand::Event(UiEvent::AddItem { item_id: 3 })
        );
        assert_eq!(
            parse_command("/checkout").unwrap(),
            CliCommand::Event(UiEvent::Action {
                action: ButtonAction::Checkout
            })
        );
        assert_eq!(
            parse_command("/menu drinks").unwrap(),
            CliCommand::Menu(Some(Category::Drinks))
        );
        assert_eq!(
            parse_command("/offline").unwrap(),
            CliCommand::Event(UiEvent::SetOnline { online: false })
        );
        assert_eq!(parse_command("/quit").unwrap(), CliCommand::Quit);
    }

    #[test]
    fn bad_commands_are_errors() {
        assert!(parse_command("/add").is_err());
        assert!(parse_command("/add abc").is_err());
        assert!(parse_command("/menu pizzas").is_err());
        assert!(parse_command("/fly").is_err());
    }
}
