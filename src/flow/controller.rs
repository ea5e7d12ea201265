//! Conversation flow controller.
//!
//! [`OrderSession`] owns the whole order dialogue. Every UI event goes
//! through [`OrderSession::dispatch`], which is the only place the
//! [`FlowStep`] changes. Input is processed strictly one event at a time:
//! the caller holds the session exclusively until the event's async work
//! (postal-code lookup, text generation, finishing sequence) resolves.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handoff::{self, DeferredOpener, HandoffOutcome, LinkOpener};
use super::model::{ChatLog, Message, Sender, UserData};
use super::prompts;
use super::state::{Answer, EditTarget, FlowStep};
use crate::address::{AddressResolver, CepDirectory, ViaCepDirectory};
use crate::cart::{Cart, Category, Menu, MenuItem, StoreInfo};
use crate::config::OrderConfig;
use crate::error::VoiceError;
use crate::llm::{
    FallbackResponder, HttpTextGenerator, ImageGenerator, ResponseAdapter, TextGenerator,
};
use crate::notifications::{Notification, NotificationCenter, Severity};
use crate::safety::{fold, sanitize_for_chat};
use crate::validation::{
    AddressMissing, FieldError, find_cep, validate_address, validate_address_number,
    validate_name, validate_payment,
};
use crate::voice::VoiceTranscriber;

const ASK_NAME_AGAIN: &str = "Qual é o seu nome?";
const ASK_ADDRESS_FULL: &str = "Informe o CEP ou o endereço completo (rua, número e bairro).";
const ASK_NUMBER_AGAIN: &str = "Qual é o número e o complemento (se houver)?";
const ORDER_SENT: &str = "Pedido enviado!";
const HANDOFF_BLOCKED: &str = "Não foi possível abrir o WhatsApp automaticamente.";

/// Buttons offered by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Checkout,
    Confirm,
    Back,
    EditName,
    EditAddress,
    EditPayment,
}

/// Everything the UI can ask the session to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    SubmitText { text: String },
    AddItem { item_id: u32 },
    RemoveItem { item_id: u32 },
    SelectCategory { category: Category },
    StartVoice,
    StopVoice,
    Action { action: ButtonAction },
    SetOnline { online: bool },
    ConfirmExit,
}

/// External capabilities a session talks to.
pub struct SessionServices {
    pub notifications: Arc<NotificationCenter>,
    pub resolver: AddressResolver,
    pub responder: ResponseAdapter,
    pub images: ImageGenerator,
    pub voice: VoiceTranscriber,
    pub opener: Arc<dyn LinkOpener>,
}

impl SessionServices {
    /// Production wiring over the configured HTTP endpoints.
    pub fn from_config(config: &OrderConfig) -> Self {
        let notifications =
            NotificationCenter::new(config.max_notifications, config.notification_ttl);
        let directory: Arc<dyn CepDirectory> =
            Arc::new(ViaCepDirectory::new(config.cep_endpoint.clone()));
        let generator: Arc<dyn TextGenerator> =
            Arc::new(HttpTextGenerator::new(config.text_endpoint.clone()));
        Self::with_backends(config, notifications, directory, generator)
    }

    /// Wiring over caller-supplied lookup and generation backends. Voice is
    /// unsupported and links are deferred to the client until overridden.
    pub fn with_backends(
        config: &OrderConfig,
        notifications: Arc<NotificationCenter>,
        directory: Arc<dyn CepDirectory>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let responder = ResponseAdapter::new(
            generator,
            FallbackResponder::default_rules(&config.store),
            config.retry.clone(),
            config.generation_timeout,
        )
        .with_system_instruction(config.system_instruction.clone())
        .with_history_turns(config.history_turns);

        Self {
            resolver: AddressResolver::new(
                directory,
                Arc::clone(&notifications),
                config.lookup_timeout,
            ),
            responder,
            images: ImageGenerator::new(config.image_endpoint.clone()),
            voice: VoiceTranscriber::unsupported(),
            opener: Arc::new(DeferredOpener),
            notifications,
        }
    }

    pub fn with_voice(mut self, voice: VoiceTranscriber) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.opener = opener;
        self
    }
}

/// A cart line as shown to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: u32,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u8,
    pub line_total: Decimal,
}

/// Read model of the session for the rendering layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub step: FlowStep,
    pub edit_target: Option<EditTarget>,
    pub messages: Vec<Message>,
    pub cart: Vec<CartLineView>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub notifications: Vec<Notification>,
    pub online: bool,
    pub voice_supported: bool,
    pub voice_active: bool,
    pub voice_draft: String,
    pub selected_category: Category,
    pub visible_menu: Vec<MenuItem>,
    pub progress: u8,
    pub handoff: Option<HandoffOutcome>,
    pub locked: bool,
    pub user: UserData,
}

/// One customer's ordering session.
pub struct OrderSession {
    config: OrderConfig,
    menu: Menu,
    services: SessionServices,
    step: FlowStep,
    edit_target: Option<EditTarget>,
    log: ChatLog,
    user: UserData,
    /// Resolved or typed address still waiting for a house number.
    pending_address: Option<String>,
    cart: Cart,
    selected_category: Category,
    online: bool,
    locked: bool,
    progress: u8,
    handoff: Option<HandoffOutcome>,
    voice_rx: Option<mpsc::UnboundedReceiver<String>>,
    voice_draft: String,
    voice_unsupported_reported: bool,
}

impl OrderSession {
    pub fn new(config: OrderConfig, menu: Menu, services: SessionServices) -> Self {
        let mut session = Self {
            config,
            menu,
            services,
            step: FlowStep::Ordering,
            edit_target: None,
            log: ChatLog::default(),
            user: UserData::default(),
            pending_address: None,
            cart: Cart::new(),
            selected_category: Category::Burgers,
            online: true,
            locked: false,
            progress: 0,
            handoff: None,
            voice_rx: None,
            voice_draft: String::new(),
            voice_unsupported_reported: false,
        };
        let greeting = prompts::greeting(&session.config.store);
        session.push_bot(greeting);
        session
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn edit_target(&self) -> Option<EditTarget> {
        self.edit_target
    }

    pub fn messages(&self) -> &[Message] {
        self.log.as_slice()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn store(&self) -> &StoreInfo {
        &self.config.store
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }

    pub fn pending_address(&self) -> Option<&str> {
        self.pending_address.as_deref()
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn handoff(&self) -> Option<&HandoffOutcome> {
        self.handoff.as_ref()
    }

    pub fn selected_category(&self) -> Category {
        self.selected_category
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.services.notifications
    }

    /// Latest partial transcript of the open voice session.
    pub fn voice_draft(&mut self) -> &str {
        self.drain_voice();
        &self.voice_draft
    }

    /// Apply one UI event.
    pub async fn dispatch(&mut self, event: UiEvent) {
        if self.locked {
            debug!(?event, "Session locked, ignoring event");
            return;
        }

        match event {
            UiEvent::SubmitText { text } => self.submit_text(&text).await,
            UiEvent::AddItem { item_id } => self.add_item(item_id).await,
            UiEvent::RemoveItem { item_id } => self.cart.remove(item_id),
            UiEvent::SelectCategory { category } => self.selected_category = category,
            UiEvent::StartVoice => self.start_voice().await,
            UiEvent::StopVoice => self.stop_voice().await,
            UiEvent::Action { action } => self.handle_action(action).await,
            UiEvent::SetOnline { online } => self.set_online(online).await,
            UiEvent::ConfirmExit => self.close(),
        }
    }

    pub async fn snapshot(&mut self) -> SessionSnapshot {
        self.drain_voice();
        let fee = self.config.store.delivery_fee;
        SessionSnapshot {
            step: self.step,
            edit_target: self.edit_target,
            messages: self.log.as_slice().to_vec(),
            cart: self
                .cart
                .lines()
                .iter()
                .map(|line| CartLineView {
                    item_id: line.item.id,
                    name: line.item.name.clone(),
                    unit_price: line.item.price,
                    quantity: line.quantity,
                    line_total: line.line_total(),
                })
                .collect(),
            subtotal: self.cart.subtotal(),
            delivery_fee: self.cart.delivery_fee(fee),
            total: self.cart.total(fee),
            notifications: self.services.notifications.visible().await,
            online: self.online,
            voice_supported: self.services.voice.is_supported(),
            voice_active: self.services.voice.is_active(),
            voice_draft: self.voice_draft.clone(),
            selected_category: self.selected_category,
            visible_menu: self
                .menu
                .by_category(self.selected_category)
                .into_iter()
                .cloned()
                .collect(),
            progress: self.progress,
            handoff: self.handoff.clone(),
            locked: self.locked,
            user: self.user.clone(),
        }
    }

    // ── Transitions ────────────────────────────────────────────────────────

    fn transition(&mut self, to: FlowStep) {
        if !self.step.can_transition_to(to) {
            warn!(from = %self.step, to = %to, "Rejected flow transition");
            return;
        }
        info!(from = %self.step, to = %to, "Flow transition");
        self.step = to;
    }

    fn push_bot(&mut self, text: impl Into<String>) {
        self.log.push(Message::new(Sender::Bot, text));
    }

    async fn reject(&mut self, error: Option<FieldError>, prompt: &str) {
        let message = error
            .map(|e| e.message)
            .unwrap_or_else(|| "Não entendi.".to_string());
        debug!(step = %self.step, %message, "Input rejected");
        self.services.notifications.error(message.clone()).await;
        self.push_bot(prompts::retry(&message, prompt));
    }

    // ── Text input ─────────────────────────────────────────────────────────

    async fn submit_text(&mut self, raw: &str) {
        let text = sanitize_for_chat(raw);
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return;
        }

        let history = self.log.history(self.config.history_turns);
        self.log.push(Message::new(Sender::User, text.clone()));

        match self.step {
            FlowStep::Ordering => self.answer_free_text(&text, &history).await,
            FlowStep::AskName => self.collect_name(&text).await,
            FlowStep::AskAddress => self.collect_address(&text).await,
            FlowStep::ConfirmAddress => self.confirm_address(&text),
            FlowStep::AskAddressNumber => self.collect_address_number(&text).await,
            FlowStep::AskPayment => self.collect_payment(&text).await,
            FlowStep::Review => self.review_text(&text).await,
            FlowStep::EditInfo => self.edit_text(&text).await,
            FlowStep::Finished => {}
        }
    }

    async fn answer_free_text(&mut self, text: &str, history: &[crate::llm::ChatMessage]) {
        if !self.online {
            self.push_bot(prompts::OFFLINE_REPLY);
            return;
        }

        let reply = self.services.responder.respond(text, history).await;
        debug!(source = ?reply.source, attempts = reply.attempts, "Free-text reply");

        let image = self
            .menu
            .mentioned_in(text)
            .first()
            .and_then(|item| self.services.images.generate(&item.name));
        self.log
            .push(Message::new(Sender::Bot, reply.text).with_image(image));
    }

    async fn collect_name(&mut self, text: &str) {
        let result = validate_name(text);
        if !result.valid {
            self.reject(result.error, ASK_NAME_AGAIN).await;
            return;
        }

        self.user.name = result.cleaned;
        if self.edit_target.is_some() {
            self.finish_edit().await;
        } else {
            self.transition(FlowStep::AskAddress);
            let prompt = prompts::ask_address(&self.user.name);
            self.push_bot(prompt);
        }
    }

    async fn collect_address(&mut self, text: &str) {
        if let Some(cep) = find_cep(text) {
            let cep = cep.to_string();
            match self.services.resolver.resolve(&cep, self.online).await {
                Some(address) => {
                    let display = address.display();
                    self.pending_address = Some(display.clone());
                    self.transition(FlowStep::ConfirmAddress);
                    self.push_bot(prompts::confirm_address(&display));
                }
                None => self.push_bot(prompts::CEP_UNUSABLE),
            }
            return;
        }

        let result = validate_address(text);
        if result.valid {
            self.user.address = text.trim().to_string();
            self.pending_address = None;
            self.address_complete().await;
        } else if result.missing == Some(AddressMissing::Number) {
            self.pending_address = Some(text.trim().to_string());
            self.transition(FlowStep::AskAddressNumber);
            self.push_bot(prompts::ask_number(text.trim()));
        } else {
            self.reject(result.error, ASK_ADDRESS_FULL).await;
        }
    }

    fn confirm_address(&mut self, text: &str) {
        let pending = self.pending_address.clone().unwrap_or_default();
        match Answer::parse(text) {
            Answer::Yes => {
                self.transition(FlowStep::AskAddressNumber);
                self.push_bot(prompts::ask_number(&pending));
            }
            Answer::No => {
                self.pending_address = None;
                self.transition(FlowStep::AskAddress);
                self.push_bot(prompts::ASK_ADDRESS_AGAIN);
            }
            Answer::Unclear => self.push_bot(prompts::confirm_address_unclear(&pending)),
        }
    }

    async fn collect_address_number(&mut self, text: &str) {
        let result = validate_address_number(text);
        if !result.valid {
            self.reject(result.error, ASK_NUMBER_AGAIN).await;
            return;
        }

        let base = self
            .pending_address
            .take()
            .unwrap_or_else(|| self.user.address.clone());
        let number = text.trim();
        self.user.address = if base.trim().is_empty() {
            number.to_string()
        } else {
            format!("{}, {number}", base.trim())
        };
        self.address_complete().await;
    }

    async fn address_complete(&mut self) {
        if self.edit_target == Some(EditTarget::Address) {
            self.finish_edit().await;
        } else {
            self.transition(FlowStep::AskPayment);
            self.push_bot(prompts::ASK_PAYMENT);
        }
    }

    async fn collect_payment(&mut self, text: &str) {
        let result = validate_payment(text);
        if !result.valid {
            self.reject(result.error, prompts::ASK_PAYMENT).await;
            return;
        }

        self.user.payment_method = text.trim().to_string();
        if self.edit_target.is_some() {
            self.finish_edit().await;
        } else {
            self.transition(FlowStep::Review);
            self.show_review();
        }
    }

    async fn review_text(&mut self, text: &str) {
        let folded = fold(text);
        let folded = folded.trim();
        if folded.starts_with("confirm") {
            self.handle_action(ButtonAction::Confirm).await;
        } else if ["voltar", "editar", "alterar"].iter().any(|w| folded.starts_with(w)) {
            self.handle_action(ButtonAction::Back).await;
        } else {
            self.push_bot(prompts::REVIEW_HINT);
        }
    }

    async fn edit_text(&mut self, text: &str) {
        if fold(text).trim().starts_with("voltar") {
            self.handle_action(ButtonAction::Back).await;
            return;
        }
        match text.parse::<EditTarget>() {
            Ok(target) => self.begin_edit(target),
            Err(_) => self.push_bot(prompts::EDIT_MENU),
        }
    }

    // ── Buttons ────────────────────────────────────────────────────────────

    async fn handle_action(&mut self, action: ButtonAction) {
        match (action, self.step) {
            (ButtonAction::Checkout, FlowStep::Ordering) => self.checkout().await,
            (ButtonAction::Confirm, FlowStep::Review) => self.confirm_order().await,
            (ButtonAction::Back, FlowStep::Review) => {
                self.transition(FlowStep::EditInfo);
                self.push_bot(prompts::EDIT_MENU);
            }
            (ButtonAction::Back, FlowStep::EditInfo) => {
                self.transition(FlowStep::Review);
                self.show_review();
            }
            (ButtonAction::EditName, FlowStep::Review | FlowStep::EditInfo) => {
                self.begin_edit(EditTarget::Name)
            }
            (ButtonAction::EditAddress, FlowStep::Review | FlowStep::EditInfo) => {
                self.begin_edit(EditTarget::Address)
            }
            (ButtonAction::EditPayment, FlowStep::Review | FlowStep::EditInfo) => {
                self.begin_edit(EditTarget::Payment)
            }
            (action, step) => debug!(?action, %step, "Action not available in this step"),
        }
    }

    async fn checkout(&mut self) {
        if self.cart.is_empty() {
            self.services.notifications.error(prompts::EMPTY_CART).await;
            self.push_bot(prompts::EMPTY_CART);
            return;
        }

        info!(
            items = self.cart.item_count(),
            total = %self.cart.total(self.config.store.delivery_fee),
            "Checkout started"
        );
        self.transition(FlowStep::AskName);
        let prompt = prompts::ask_name(&self.cart, &self.config.store);
        self.push_bot(prompt);
    }

    fn begin_edit(&mut self, target: EditTarget) {
        if self.step == FlowStep::Review {
            self.transition(FlowStep::EditInfo);
        }
        self.edit_target = Some(target);
        self.pending_address = None;
        self.transition(target.step());
        let prompt = prompts::edit_prompt(target, self.user.field(target));
        self.push_bot(prompt);
    }

    async fn finish_edit(&mut self) {
        if let Some(target) = self.edit_target.take() {
            info!(field = target.label(), "Customer data edited");
        }
        self.transition(FlowStep::Review);
        self.services.notifications.success(prompts::DATA_UPDATED).await;
        self.show_review();
    }

    fn show_review(&mut self) {
        let summary = prompts::review_summary(&self.config.store, &self.user, &self.cart);
        self.push_bot(summary);
    }

    async fn confirm_order(&mut self) {
        if self.cart.is_empty() {
            warn!("Confirmation with an empty cart, back to ordering");
            self.services.notifications.error(prompts::EMPTY_CART).await;
            self.transition(FlowStep::Ordering);
            self.push_bot(prompts::EMPTY_CART);
            return;
        }
        if let Some(missing) = self.user.missing_field() {
            warn!(field = missing.label(), "Confirmation with incomplete customer data");
            let message = prompts::incomplete_profile(missing);
            self.services.notifications.error(message.clone()).await;
            self.transition(FlowStep::EditInfo);
            self.push_bot(message);
            self.push_bot(prompts::EDIT_MENU);
            return;
        }

        self.transition(FlowStep::Finished);
        self.push_bot(prompts::FINISHING);
        self.run_progress().await;

        let message = handoff::compose_order_message(&self.config.store, &self.user, &self.cart);
        let outcome = handoff::perform(
            self.services.opener.as_ref(),
            self.config.device,
            &self.config.store.whatsapp,
            &message,
        );
        info!(
            variant = ?outcome.variant,
            same_tab = outcome.same_tab,
            opened = outcome.opened,
            "Order handed off"
        );

        if outcome.opened {
            self.services.notifications.success(ORDER_SENT).await;
        } else {
            self.services.notifications.warning(HANDOFF_BLOCKED).await;
        }
        self.push_bot(prompts::sent(outcome.opened));
        self.handoff = Some(outcome);

        self.services.voice.stop();
        self.voice_rx = None;
        self.locked = true;
    }

    async fn run_progress(&mut self) {
        let increment = self.config.progress_step.clamp(1, 100);
        self.progress = 0;
        while self.progress < 100 {
            tokio::time::sleep(self.config.progress_tick).await;
            self.progress = self.progress.saturating_add(increment).min(100);
            debug!(progress = self.progress, "Finishing order");
        }
    }

    // ── Cart ───────────────────────────────────────────────────────────────

    async fn add_item(&mut self, item_id: u32) {
        match self.menu.find(item_id) {
            Some(item) => {
                self.cart.add(item);
                debug!(item_id, quantity = self.cart.quantity_of(item_id), "Item added");
            }
            None => {
                warn!(item_id, "Unknown menu item");
                self.services.notifications.error(prompts::ITEM_NOT_FOUND).await;
            }
        }
    }

    // ── Connectivity ───────────────────────────────────────────────────────

    async fn set_online(&mut self, online: bool) {
        if self.online == online {
            return;
        }
        self.online = online;
        info!(online, "Connectivity changed");

        let notifications = &self.services.notifications;
        if online {
            notifications.dismiss_message(prompts::OFFLINE_WARNING).await;
            notifications.success(prompts::BACK_ONLINE).await;
        } else {
            notifications
                .show(Severity::Warning, prompts::OFFLINE_WARNING, false)
                .await;
        }
    }

    // ── Voice ──────────────────────────────────────────────────────────────

    async fn start_voice(&mut self) {
        if !self.services.voice.is_supported() {
            if !self.voice_unsupported_reported {
                self.voice_unsupported_reported = true;
                self.services.notifications.error(prompts::VOICE_UNSUPPORTED).await;
            }
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let notifications = &self.services.notifications;
        match self.services.voice.start(tx).await {
            Ok(()) => {
                self.voice_rx = Some(rx);
                self.voice_draft.clear();
                notifications.info(prompts::VOICE_LISTENING).await;
            }
            Err(VoiceError::AlreadyActive) => {
                notifications.warning(prompts::VOICE_ALREADY_ACTIVE).await;
            }
            Err(VoiceError::Recognition { kind }) => {
                notifications.error(kind.user_message()).await;
            }
            Err(e) => {
                warn!(error = %e, "Voice session failed to start");
                notifications.error(prompts::VOICE_FAILED).await;
            }
        }
    }

    async fn stop_voice(&mut self) {
        self.services.voice.stop();
        self.drain_voice();
        self.voice_rx = None;

        let draft = std::mem::take(&mut self.voice_draft);
        if !draft.trim().is_empty() {
            self.submit_text(&draft).await;
        }
    }

    fn drain_voice(&mut self) {
        if let Some(rx) = self.voice_rx.as_mut() {
            while let Ok(text) = rx.try_recv() {
                self.voice_draft = text;
            }
        }
    }

    fn close(&mut self) {
        self.services.voice.stop();
        self.voice_rx = None;
        self.push_bot(prompts::FAREWELL);
        self.locked = true;
        info!(step = %self.step, "Session closed by customer");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::address::CepRecord;
    use crate::error::{GenerationError, LookupError};
    use crate::llm::RetryPolicy;
    use crate::voice::RecognitionEvent;
    use crate::voice::tests::ScriptedRecognizer;

    struct SeDirectory;

    #[async_trait]
    impl CepDirectory for SeDirectory {
        async fn lookup(&self, cep: &str) -> Result<CepRecord, LookupError> {
            if cep != "01001000" {
                return Err(LookupError::NotFound { cep: cep.to_string() });
            }
            Ok(CepRecord {
                logradouro: Some("Praça da Sé".into()),
                bairro: Some("Sé".into()),
                localidade: Some("São Paulo".into()),
                uf: Some("SP".into()),
                erro: None,
            })
        }
    }

    /// Always returns `reply`, or a 400 when `reply` is `None`.
    struct CannedGenerator {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => Err(GenerationError::ClientError { status: 400 }),
            }
        }
    }

    fn config() -> OrderConfig {
        OrderConfig {
            progress_tick: Duration::ZERO,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
            },
            ..OrderConfig::default()
        }
    }

    fn session_with(reply: Option<&'static str>) -> (OrderSession, Arc<CannedGenerator>) {
        let config = config();
        let generator = Arc::new(CannedGenerator {
            reply,
            calls: AtomicUsize::new(0),
        });
        let notifications =
            NotificationCenter::new(config.max_notifications, config.notification_ttl);
        let services = SessionServices::with_backends(
            &config,
            notifications,
            Arc::new(SeDirectory),
            generator.clone(),
        );
        (OrderSession::new(config, Menu::default(), services), generator)
    }

    fn session() -> OrderSession {
        session_with(Some("Resposta remota")).0
    }

    async fn say(session: &mut OrderSession, text: &str) {
        session
            .dispatch(UiEvent::SubmitText { text: text.to_string() })
            .await;
    }

    async fn act(session: &mut OrderSession, action: ButtonAction) {
        session.dispatch(UiEvent::Action { action }).await;
    }

    fn last_bot(session: &OrderSession) -> &Message {
        session
            .messages()
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Bot)
            .unwrap()
    }

    async fn has_notification(session: &OrderSession, severity: Severity, message: &str) -> bool {
        session
            .notifications()
            .visible()
            .await
            .iter()
            .any(|n| n.severity == severity && n.message == message)
    }

    /// Two Classic Burgers, customer data filled in, at the review step.
    async fn reach_review(session: &mut OrderSession) {
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        act(session, ButtonAction::Checkout).await;
        say(session, "Ana").await;
        say(session, "Rua A, 123, Centro").await;
        say(session, "Pix").await;
        assert_eq!(session.step(), FlowStep::Review);
    }

    #[tokio::test]
    async fn greets_on_construction() {
        let session = session();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].sender, Sender::Bot);
        assert!(session.messages()[0].text.contains("Burger House"));
        assert_eq!(session.step(), FlowStep::Ordering);
    }

    #[tokio::test]
    async fn checkout_with_empty_cart_stays_in_ordering() {
        let mut session = session();
        act(&mut session, ButtonAction::Checkout).await;
        assert_eq!(session.step(), FlowStep::Ordering);
        assert!(has_notification(&session, Severity::Error, prompts::EMPTY_CART).await);
    }

    #[tokio::test]
    async fn full_order_with_typed_address() {
        let mut session = session();
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;

        act(&mut session, ButtonAction::Checkout).await;
        assert_eq!(session.step(), FlowStep::AskName);
        assert!(last_bot(&session).text.contains("R$ 57,00"));

        say(&mut session, "Ana").await;
        assert_eq!(session.step(), FlowStep::AskAddress);

        say(&mut session, "Rua A, Centro").await;
        assert_eq!(session.step(), FlowStep::AskAddressNumber);
        assert_eq!(session.pending_address(), Some("Rua A, Centro"));

        say(&mut session, "123").await;
        assert_eq!(session.step(), FlowStep::AskPayment);
        assert_eq!(session.user().address, "Rua A, Centro, 123");
        assert!(session.pending_address().is_none());

        say(&mut session, "Pix").await;
        assert_eq!(session.step(), FlowStep::Review);
        assert!(last_bot(&session).text.contains("Total: R$ 57,00"));

        act(&mut session, ButtonAction::Confirm).await;
        assert_eq!(session.step(), FlowStep::Finished);
        assert_eq!(session.progress(), 100);
        assert!(session.is_locked());
        let outcome = session.handoff().unwrap();
        assert!(outcome.url.starts_with("https://api.whatsapp.com/send?phone=5511999999999"));
        assert!(outcome.url.contains("Classic%20Burger"));

        let count = session.messages().len();
        say(&mut session, "oi de novo").await;
        assert_eq!(session.messages().len(), count);
    }

    #[tokio::test]
    async fn address_with_number_skips_number_step() {
        let mut session = session();
        session.dispatch(UiEvent::AddItem { item_id: 4 }).await;
        act(&mut session, ButtonAction::Checkout).await;
        say(&mut session, "Ana").await;
        say(&mut session, "Rua A, 123, Centro").await;
        assert_eq!(session.step(), FlowStep::AskPayment);
        assert_eq!(session.user().address, "Rua A, 123, Centro");
    }

    #[tokio::test]
    async fn postal_code_lookup_and_confirmation() {
        let mut session = session();
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        act(&mut session, ButtonAction::Checkout).await;
        say(&mut session, "Ana").await;

        say(&mut session, "meu cep é 01001-000").await;
        assert_eq!(session.step(), FlowStep::ConfirmAddress);
        assert_eq!(session.pending_address(), Some("Praça da Sé, Sé, São Paulo - SP"));

        say(&mut session, "não").await;
        assert_eq!(session.step(), FlowStep::AskAddress);
        assert!(session.pending_address().is_none());

        say(&mut session, "01001000").await;
        say(&mut session, "talvez").await;
        assert_eq!(session.step(), FlowStep::ConfirmAddress);

        say(&mut session, "sim").await;
        assert_eq!(session.step(), FlowStep::AskAddressNumber);
        say(&mut session, "100, apto 5").await;
        assert_eq!(session.step(), FlowStep::AskPayment);
        assert_eq!(session.user().address, "Praça da Sé, Sé, São Paulo - SP, 100, apto 5");
    }

    #[tokio::test]
    async fn unknown_postal_code_stays_on_address() {
        let mut session = session();
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        act(&mut session, ButtonAction::Checkout).await;
        say(&mut session, "Ana").await;
        say(&mut session, "04538-132").await;
        assert_eq!(session.step(), FlowStep::AskAddress);
        assert_eq!(last_bot(&session).text, prompts::CEP_UNUSABLE);
    }

    #[tokio::test]
    async fn invalid_fields_reprompt_in_place() {
        let mut session = session();
        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        act(&mut session, ButtonAction::Checkout).await;

        say(&mut session, "12345").await;
        assert_eq!(session.step(), FlowStep::AskName);
        assert!(session.user().name.is_empty());

        say(&mut session, "Ana").await;
        say(&mut session, "Rua").await;
        assert_eq!(session.step(), FlowStep::AskAddress);

        say(&mut session, "Rua A, 10").await;
        say(&mut session, "x").await;
        assert_eq!(session.step(), FlowStep::AskPayment);
        assert!(session.user().payment_method.is_empty());
    }

    #[tokio::test]
    async fn editing_the_same_field_twice_is_idempotent() {
        let mut session = session();
        reach_review(&mut session).await;

        act(&mut session, ButtonAction::Back).await;
        assert_eq!(session.step(), FlowStep::EditInfo);
        act(&mut session, ButtonAction::EditName).await;
        assert_eq!(session.step(), FlowStep::AskName);
        assert_eq!(session.edit_target(), Some(EditTarget::Name));
        say(&mut session, "Bia").await;
        assert_eq!(session.step(), FlowStep::Review);
        assert!(session.edit_target().is_none());
        let once = (session.user().clone(), session.step());

        say(&mut session, "editar").await;
        say(&mut session, "1").await;
        assert_eq!(session.step(), FlowStep::AskName);
        say(&mut session, "Bia").await;
        assert_eq!((session.user().clone(), session.step()), once);
        assert_eq!(session.user().address, "Rua A, 123, Centro");
    }

    #[tokio::test]
    async fn editing_address_returns_to_review() {
        let mut session = session();
        reach_review(&mut session).await;
        act(&mut session, ButtonAction::EditAddress).await;
        assert_eq!(session.step(), FlowStep::AskAddress);
        say(&mut session, "Av. Paulista, Bela Vista").await;
        assert_eq!(session.step(), FlowStep::AskAddressNumber);
        say(&mut session, "900").await;
        assert_eq!(session.step(), FlowStep::Review);
        assert_eq!(session.user().address, "Av. Paulista, Bela Vista, 900");
        assert!(has_notification(&session, Severity::Success, prompts::DATA_UPDATED).await);
    }

    #[tokio::test]
    async fn confirmation_rechecks_the_cart() {
        let mut session = session();
        reach_review(&mut session).await;
        session.dispatch(UiEvent::RemoveItem { item_id: 1 }).await;
        session.dispatch(UiEvent::RemoveItem { item_id: 1 }).await;

        say(&mut session, "confirmar").await;
        assert_eq!(session.step(), FlowStep::Ordering);
        assert!(!session.is_locked());
        assert!(session.handoff().is_none());
        assert!(has_notification(&session, Severity::Error, prompts::EMPTY_CART).await);
    }

    #[tokio::test]
    async fn confirmation_rechecks_customer_data() {
        let mut session = session();
        reach_review(&mut session).await;
        session.user.payment_method.clear();

        act(&mut session, ButtonAction::Confirm).await;
        assert_eq!(session.step(), FlowStep::EditInfo);
        assert!(!session.is_locked());
        assert!(session.handoff().is_none());
        let message = prompts::incomplete_profile(EditTarget::Payment);
        assert!(has_notification(&session, Severity::Error, &message).await);
        assert_eq!(last_bot(&session).text, prompts::EDIT_MENU);
    }

    #[tokio::test]
    async fn offline_free_text_gets_static_notice() {
        let (mut session, generator) = session_with(Some("Resposta remota"));
        session.dispatch(UiEvent::SetOnline { online: false }).await;
        let warning = session.notifications().visible().await;
        assert_eq!(warning.len(), 1);
        assert!(!warning[0].dismissible);

        say(&mut session, "qual o cardápio?").await;
        assert_eq!(last_bot(&session).text, prompts::OFFLINE_REPLY);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

        session.dispatch(UiEvent::SetOnline { online: true }).await;
        assert!(!has_notification(&session, Severity::Warning, prompts::OFFLINE_WARNING).await);
        assert!(has_notification(&session, Severity::Success, prompts::BACK_ONLINE).await);
    }

    #[tokio::test]
    async fn free_text_reply_carries_item_image() {
        let mut session = session();
        say(&mut session, "me fala do classic burger").await;
        let reply = last_bot(&session);
        assert_eq!(reply.text, "Resposta remota");
        assert!(reply.image.as_deref().unwrap().contains("Classic%20Burger"));

        say(&mut session, "oi").await;
        assert!(last_bot(&session).image.is_none());
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_keywords() {
        let (mut session, generator) = session_with(None);
        say(&mut session, "que horas vocês abrem?").await;
        assert!(last_bot(&session).text.contains("18h"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_voice_is_reported_once() {
        let mut session = session();
        session.dispatch(UiEvent::StartVoice).await;
        session.notifications().dismiss_message(prompts::VOICE_UNSUPPORTED).await;
        session.dispatch(UiEvent::StartVoice).await;
        assert!(!has_notification(&session, Severity::Error, prompts::VOICE_UNSUPPORTED).await);
        assert!(!session.snapshot().await.voice_supported);
    }

    #[tokio::test]
    async fn voice_draft_is_submitted_on_stop() {
        let config = config();
        let notifications =
            NotificationCenter::new(config.max_notifications, config.notification_ttl);
        let generator = Arc::new(CannedGenerator {
            reply: Some("Anotado!"),
            calls: AtomicUsize::new(0),
        });
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            RecognitionEvent::Started,
            RecognitionEvent::Transcript("quero".into()),
            RecognitionEvent::Transcript("quero um brownie".into()),
        ]));
        let services =
            SessionServices::with_backends(&config, notifications, Arc::new(SeDirectory), generator)
                .with_voice(VoiceTranscriber::new(Some(recognizer)));
        let mut session = OrderSession::new(config, Menu::default(), services);

        session.dispatch(UiEvent::StartVoice).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.voice_draft(), "quero um brownie");
        assert!(session.snapshot().await.voice_active);

        session.dispatch(UiEvent::StopVoice).await;
        let user_turn = session
            .messages()
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User)
            .unwrap();
        assert_eq!(user_turn.text, "quero um brownie");
        assert_eq!(last_bot(&session).text, "Anotado!");
        assert!(!session.snapshot().await.voice_active);
    }

    /// Blocks every new window; same-tab opens succeed.
    struct PopupBlocker {
        urls: std::sync::Mutex<Vec<String>>,
    }

    impl LinkOpener for PopupBlocker {
        fn open_new_window(&self, url: &str) -> bool {
            self.urls.lock().unwrap().push(url.to_string());
            false
        }

        fn open_same_tab(&self, url: &str) -> bool {
            self.urls.lock().unwrap().push(url.to_string());
            true
        }
    }

    #[tokio::test]
    async fn mobile_handoff_falls_back_to_same_tab() {
        let config = OrderConfig {
            device: crate::flow::DeviceClass::Mobile,
            ..config()
        };
        let notifications =
            NotificationCenter::new(config.max_notifications, config.notification_ttl);
        let generator = Arc::new(CannedGenerator {
            reply: None,
            calls: AtomicUsize::new(0),
        });
        let opener = Arc::new(PopupBlocker {
            urls: std::sync::Mutex::new(Vec::new()),
        });
        let services =
            SessionServices::with_backends(&config, notifications, Arc::new(SeDirectory), generator)
                .with_opener(opener.clone());
        let mut session = OrderSession::new(config, Menu::default(), services);

        reach_review(&mut session).await;
        act(&mut session, ButtonAction::Confirm).await;

        let outcome = session.handoff().unwrap();
        assert!(outcome.same_tab);
        assert!(outcome.opened);
        assert!(outcome.url.starts_with("https://wa.me/5511999999999?text="));
        let urls = opener.urls.lock().unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.starts_with("https://wa.me/")));
    }

    #[tokio::test]
    async fn confirm_exit_locks_the_session() {
        let mut session = session();
        session.dispatch(UiEvent::ConfirmExit).await;
        assert!(session.is_locked());
        assert_eq!(last_bot(&session).text, prompts::FAREWELL);

        session.dispatch(UiEvent::AddItem { item_id: 1 }).await;
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn category_selection_filters_visible_menu() {
        let mut session = session();
        session
            .dispatch(UiEvent::SelectCategory { category: Category::Drinks })
            .await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.selected_category, Category::Drinks);
        assert!(snapshot.visible_menu.iter().all(|i| i.category == Category::Drinks));
        assert!(!snapshot.visible_menu.is_empty());
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: UiEvent = serde_json::from_str(r#"{"type":"add_item","item_id":1}"#).unwrap();
        assert_eq!(event, UiEvent::AddItem { item_id: 1 });
        let event: UiEvent =
            serde_json::from_str(r#"{"type":"action","action":"edit_payment"}"#).unwrap();
        assert_eq!(event, UiEvent::Action { action: ButtonAction::EditPayment });
        let event: UiEvent = serde_json::from_str(r#"{"type":"confirm_exit"}"#).unwrap();
        assert_eq!(event, UiEvent::ConfirmExit);
    }
}
