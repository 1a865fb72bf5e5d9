// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::config::{AVATARS, BackendConfig, MESSAGES_TABLE, PIN_LEN};
use crate::state::{ChatSession, FlowError, LoginFlow, LoginStep, clip_status};
use crate::supabase::{Message, Subscription, SupabaseClient, User, subscribe_inserts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
}

/// Overlay on top of the chat screen.
pub enum Modal {
    /// Edit the own status message; the buffer lives in `App::status_input`.
    MyProfile,
    /// Read-only view of another user's profile.
    PeerProfile(User),
}

/// Top-level application state and event dispatcher.
pub struct App {
    pub screen: Screen,
    pub flow: LoginFlow,
    pub session: Option<ChatSession>,

    /// Login inputs.
    pub nickname_input: String,
    pub pin_input: String,
    pub avatar_index: usize,

    /// Chat inputs and overlays.
    pub composer: String,
    /// Message-list cursor; `None` keeps the view pinned to the newest row.
    pub selected: Option<usize>,
    pub modal: Option<Modal>,
    pub status_input: String,

    /// One-line notice shown in the status bar.
    pub notice: Option<String>,

    client: Arc<SupabaseClient>,
    backend: BackendConfig,
    feed_rx: Option<mpsc::UnboundedReceiver<Message>>,
    subscription: Option<Subscription>,
}

impl App {
    pub fn new(client: SupabaseClient, backend: BackendConfig) -> Self {
        Self {
            screen: Screen::Login,
            flow: LoginFlow::new(),
            session: None,
            nickname_input: String::new(),
            pin_input: String::new(),
            avatar_index: 0,
            composer: String::new(),
            selected: None,
            modal: None,
            status_input: String::new(),
            notice: None,
            client: Arc::new(client),
            backend,
            feed_rx: None,
            subscription: None,
        }
    }

    /// Move feed deliveries into the log. Called every tick of the event
    /// loop; only ever appends.
    pub fn drain_feed(&mut self) {
        let Some(rx) = self.feed_rx.as_mut() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        while let Ok(message) = rx.try_recv() {
            tracing::debug!("feed delivered message {}", message.id);
            session.log.append(message);
        }
    }

    /// Release the change feed. Called on every way out of the event loop.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.feed_rx = None;
    }

    /// Process a key event. Returns `true` to continue, `false` to quit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Global: Ctrl-C / Ctrl-Q quit from anywhere.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            return false;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key).await,
            Screen::Chat => self.handle_chat_key(key).await,
        }
        true
    }

    // ── Login ────────────────────────────────────────────────────────────

    async fn handle_login_key(&mut self, key: KeyEvent) {
        match self.flow.step() {
            LoginStep::Nickname => self.handle_nickname_key(key).await,
            LoginStep::Pin => self.handle_pin_key(key).await,
            LoginStep::Register => self.handle_register_key(key).await,
        }
    }

    async fn handle_nickname_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.nickname_input.push(c),
            KeyCode::Backspace => {
                self.nickname_input.pop();
            }
            KeyCode::Enter => {
                let nickname = self.nickname_input.clone();
                match self.flow.submit_nickname(self.client.as_ref(), &nickname).await {
                    Ok(()) => {
                        self.pin_input.clear();
                        self.notice = None;
                    }
                    // Blank input: stay put, no call was issued.
                    Err(FlowError::EmptyNickname) => {}
                    Err(e) => self.notice = Some(format!("Login failed: {e}")),
                }
            }
            _ => {}
        }
    }

    async fn handle_pin_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                if self.pin_input.chars().count() < PIN_LEN {
                    self.pin_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.pin_input.pop();
            }
            KeyCode::Esc => {
                self.flow.back();
                self.pin_input.clear();
                self.notice = None;
            }
            KeyCode::Enter => {
                let pin = self.pin_input.clone();
                match self.flow.submit_pin(&pin) {
                    Ok(user) => self.enter_session(user).await,
                    Err(e) => {
                        self.notice = Some(e.to_string());
                        self.pin_input.clear();
                    }
                }
            }
            _ => {}
        }
    }

    async fn handle_register_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => {
                self.avatar_index = (self.avatar_index + AVATARS.len() - 1) % AVATARS.len();
            }
            KeyCode::Right => {
                self.avatar_index = (self.avatar_index + 1) % AVATARS.len();
            }
            KeyCode::Char(c) => {
                if self.pin_input.chars().count() < PIN_LEN {
                    self.pin_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.pin_input.pop();
            }
            KeyCode::Esc => {
                self.flow.back();
                self.pin_input.clear();
                self.notice = None;
            }
            KeyCode::Enter => {
                let avatar = AVATARS[self.avatar_index];
                let pin = self.pin_input.clone();
                match self
                    .flow
                    .submit_registration(self.client.as_ref(), avatar, &pin)
                    .await
                {
                    Ok(user) => self.enter_session(user).await,
                    Err(e) => self.notice = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    /// Authenticated: fetch history, then join the change feed — in that
    /// order, so the log starts from the batch and grows with deliveries.
    async fn enter_session(&mut self, user: User) {
        self.status_input = user.status_message.clone();
        let mut session = ChatSession::new(user);
        self.notice = None;

        match self.client.list_messages().await {
            Ok(history) => session.log.replace(history),
            Err(e) => self.notice = Some(format!("Could not load messages: {e}")),
        }

        let (tx, rx) = mpsc::unbounded_channel();
        match subscribe_inserts(&self.backend, MESSAGES_TABLE, tx).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.feed_rx = Some(rx);
            }
            Err(e) => {
                self.notice = Some(format!("Live updates unavailable: {e}"));
            }
        }

        self.session = Some(session);
        self.screen = Screen::Chat;
    }

    // ── Chat ─────────────────────────────────────────────────────────────

    async fn handle_chat_key(&mut self, key: KeyEvent) {
        if self.modal.is_some() {
            self.handle_modal_key(key).await;
            return;
        }

        match key.code {
            KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(session) = &self.session {
                    self.status_input = session.user.status_message.clone();
                    self.modal = Some(Modal::MyProfile);
                }
            }
            KeyCode::Char(c) => self.composer.push(c),
            KeyCode::Backspace => {
                self.composer.pop();
            }
            KeyCode::Up => {
                let len = self.session.as_ref().map(|s| s.log.len()).unwrap_or(0);
                if len == 0 {
                    return;
                }
                self.selected = Some(match self.selected {
                    Some(i) => i.saturating_sub(1),
                    None => len - 1,
                });
            }
            KeyCode::Down => {
                let len = self.session.as_ref().map(|s| s.log.len()).unwrap_or(0);
                self.selected = match self.selected {
                    Some(i) if i + 1 < len => Some(i + 1),
                    // Past the end: back to following the live tail.
                    _ => None,
                };
            }
            KeyCode::Esc => {
                self.selected = None;
                self.notice = None;
            }
            KeyCode::Enter => {
                if !self.composer.trim().is_empty() {
                    self.send_current_message().await;
                } else if let Some(index) = self.selected {
                    self.view_selected_profile(index).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_modal_key(&mut self, key: KeyEvent) {
        match self.modal {
            Some(Modal::MyProfile) => match key.code {
                KeyCode::Char(c) => {
                    self.status_input.push(c);
                    self.status_input = clip_status(&self.status_input);
                }
                KeyCode::Backspace => {
                    self.status_input.pop();
                }
                KeyCode::Enter => self.save_profile().await,
                KeyCode::Esc => self.modal = None,
                _ => {}
            },
            Some(Modal::PeerProfile(_)) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.modal = None;
                }
            }
            None => {}
        }
    }

    /// Send the composer contents. Blank input issues no insert; on failure
    /// the input stays for another try. No local copy is appended — the
    /// message shows up when the feed delivers it back.
    async fn send_current_message(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(payload) = session.compose(&self.composer) else {
            return;
        };

        match self.client.send_message(&payload).await {
            Ok(()) => {
                self.composer.clear();
                self.selected = None;
            }
            Err(e) => self.notice = Some(format!("Send failed: {e}")),
        }
    }

    /// Store the edited status message and refresh the local identity from
    /// the returned row.
    async fn save_profile(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match self
            .client
            .update_status(&session.user.nickname, &self.status_input)
            .await
        {
            Ok(updated) => {
                session.user = updated;
                self.modal = None;
                self.notice = Some("Profile updated.".to_string());
            }
            Err(e) => self.notice = Some(format!("Could not save profile: {e}")),
        }
    }

    /// Look up the sender of the selected message. Failures are dropped
    /// without a visible notice; a profile peek is not worth interrupting
    /// the chat for.
    async fn view_selected_profile(&mut self, index: usize) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(nickname) = session.log.messages().get(index).map(|m| m.nickname.clone())
        else {
            return;
        };

        match self.client.find_user(&nickname).await {
            Ok(user) => self.modal = Some(Modal::PeerProfile(user)),
            Err(e) => tracing::debug!("profile lookup for {nickname} failed: {e}"),
        }
    }
}
