use std::path::{Path, PathBuf};

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::api::{BackendClient, ClientError};
use crate::config::Config;
use crate::state::{Action, ChatTurn, ClassificationResult, ClientState, Effect, Notice, SelectedFile};
use crate::tui::AppEvent;

pub const CHAT_WELCOME: [&str; 2] = [
    "👋 Olá! Sou o assistente da AutoU. Como posso ajudar você hoje?",
    "Posso explicar sobre classificação de emails, sugerir respostas ou tirar outras dúvidas.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Email,
    Chat,
}

/// Path being typed into the file popup
#[derive(Debug, Clone, Default)]
pub struct FilePrompt {
    pub input: String,
    pub cursor: usize,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    state: ClientState,

    // Editor cursors (char indices into the texts owned by `state`)
    pub text_cursor: usize,
    pub chat_cursor: usize,

    // Chat panel scroll
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub file_prompt: Option<FilePrompt>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    backend: BackendClient,
    events: UnboundedSender<AppEvent>,
    config: Config,
    config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        backend: BackendClient,
        config: Config,
        config_path: Option<PathBuf>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Email,
            state: ClientState::new(),

            text_cursor: 0,
            chat_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            file_prompt: None,

            chat_area: None,

            backend,
            events,
            config,
            config_path,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn backend_url(&self) -> &str {
        self.backend.base_url()
    }

    /// Apply one transition and start whatever request it asks for.
    pub fn dispatch(&mut self, action: Action) {
        if let Some(effect) = self.state.apply(action) {
            self.spawn_effect(effect);
        }

        self.text_cursor = self.text_cursor.min(self.state.draft().text().chars().count());
        self.chat_cursor = self.chat_cursor.min(self.state.chat_input().chars().count());

        if self.state.take_scroll_request() {
            self.scroll_chat_to_bottom();
        }
    }

    fn spawn_effect(&self, effect: Effect) {
        let backend = self.backend.clone();
        let tx = self.events.clone();

        match effect {
            Effect::Classify { token, request } => {
                tokio::spawn(async move {
                    let outcome = backend.classify(&request).await;
                    let _ = tx.send(AppEvent::ClassificationDone { token, outcome });
                });
            }
            Effect::Chat { token, message, history } => {
                tokio::spawn(async move {
                    let outcome = backend.chat(&message, &history).await;
                    let _ = tx.send(AppEvent::ChatDone { token, outcome });
                });
            }
        }
    }

    pub fn on_classification_done(&mut self, token: u64, outcome: Result<ClassificationResult, ClientError>) {
        if let Err(e) = &outcome {
            warn!(token, error = %e, "classification request failed");
        }
        self.dispatch(Action::ClassificationCompleted {
            token,
            outcome: outcome.map_err(|e| e.to_string()),
        });
    }

    pub fn on_chat_done(&mut self, token: u64, outcome: Result<Option<Vec<ChatTurn>>, ClientError>) {
        let failed = outcome.is_err();
        if let Err(e) = &outcome {
            warn!(token, error = %e, "chat request failed");
        }
        self.dispatch(Action::ChatCompleted {
            token,
            outcome: outcome.map_err(|e| e.to_string()),
        });

        // Failed turns put the message back; leave the cursor after it
        if failed {
            self.chat_cursor = self.state.chat_input().chars().count();
        }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.dispatch(Action::ShowNotice(notice));
    }

    /// Switch focus between the email form and the chat (only while it is open).
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Email if self.state.flags().chat_panel_open => FocusPane::Chat,
            _ => FocusPane::Email,
        };
    }

    pub fn toggle_chat_panel(&mut self) {
        self.dispatch(Action::ToggleChatPanel);
        self.focus = if self.state.flags().chat_panel_open {
            FocusPane::Chat
        } else {
            FocusPane::Email
        };
        self.input_mode = InputMode::Normal;
    }

    pub fn open_file_prompt(&mut self) {
        let input = self
            .config
            .last_file_dir
            .as_ref()
            .map(|dir| format!("{}/", dir.trim_end_matches('/')))
            .unwrap_or_default();
        let cursor = input.chars().count();
        self.file_prompt = Some(FilePrompt { input, cursor });
        self.input_mode = InputMode::Normal;
    }

    /// Validate the typed path; keeps the prompt open when it is rejected.
    pub fn confirm_file_prompt(&mut self) {
        let Some(prompt) = &self.file_prompt else {
            return;
        };
        let path = expand_home(prompt.input.trim());

        match SelectedFile::from_path(path) {
            Ok(file) => {
                self.file_prompt = None;
                if let Some(config_path) = &self.config_path {
                    if let Err(e) = self.config.remember_file_dir(&file.path, config_path) {
                        warn!(error = %e, "could not save last file directory");
                    }
                }
                self.dispatch(Action::SelectFile(file));
            }
            Err(rejection) => self.notify(Notice::validation(rejection.to_string())),
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        let flags = self.state.flags();
        if flags.classification_loading || flags.chat_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max_scroll = self.chat_total_lines().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    /// Scroll chat to bottom so the latest turn or the typing indicator is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.chat_total_lines().saturating_sub(self.visible_chat_height());
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn chat_total_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        chat_line_count(self.state.history(), self.state.flags().chat_loading, wrap_width)
    }
}

/// Rendered height of the chat history, matching the layout in `ui`.
pub fn chat_line_count(history: &[ChatTurn], loading: bool, wrap_width: usize) -> u16 {
    let wrap_width = wrap_width.max(1);
    let mut total_lines: usize = 0;

    if history.is_empty() {
        for line in CHAT_WELCOME {
            total_lines += line.chars().count().div_ceil(wrap_width).max(1) + 1;
        }
    }

    for turn in history {
        // The role prefix shares the first content line
        for (i, line) in turn.content.split('\n').enumerate() {
            let prefix = if i == 0 { 2 } else { 0 };
            // Use character count, not byte length, for proper UTF-8 handling
            let char_count = line.chars().count() + prefix;
            total_lines += char_count.div_ceil(wrap_width).max(1);
        }
        total_lines += 1; // Blank line after message
    }

    if loading {
        total_lines += 1; // "Digitando..."
    }

    u16::try_from(total_lines).unwrap_or(u16::MAX)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => Path::new(path).to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NoticeKind;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        // Nothing listens here; requests fail fast with a network error
        let backend = BackendClient::new("http://127.0.0.1:9");
        (App::new(backend, Config::default(), None, tx), rx)
    }

    #[test]
    fn test_chat_line_count() {
        assert_eq!(chat_line_count(&[], false, 200), 4);

        let history = vec![ChatTurn::user("oi"), ChatTurn::assistant("linha 1\nlinha 2")];
        assert_eq!(chat_line_count(&history, false, 80), 5);
        assert_eq!(chat_line_count(&history, true, 80), 6);

        let long = vec![ChatTurn::user("x".repeat(18))];
        assert_eq!(chat_line_count(&long, false, 10), 3);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/a.txt"), PathBuf::from("/tmp/a.txt"));
        assert_eq!(expand_home("~user/a.txt"), PathBuf::from("~user/a.txt"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/emails/a.txt"), home.join("emails/a.txt"));
        }
    }

    #[test]
    fn test_cycle_focus_requires_open_chat() {
        let (mut app, _rx) = test_app();

        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Email);

        app.toggle_chat_panel();
        assert_eq!(app.focus, FocusPane::Chat);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Email);
    }

    #[test]
    fn test_selecting_file_resets_text_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("email.txt");
        std::fs::write(&path, "conteúdo").unwrap();
        let (mut app, _rx) = test_app();
        app.dispatch(Action::EditText("rascunho".to_string()));
        app.text_cursor = 8;

        app.file_prompt = Some(FilePrompt {
            input: path.display().to_string(),
            cursor: 0,
        });
        app.confirm_file_prompt();

        assert!(app.file_prompt.is_none());
        assert_eq!(app.text_cursor, 0);
        assert_eq!(app.state().draft().file().map(|f| f.name.as_str()), Some("email.txt"));
    }

    #[test]
    fn test_rejected_file_keeps_prompt_open() {
        let (mut app, _rx) = test_app();
        app.file_prompt = Some(FilePrompt {
            input: "/nao/existe/email.doc".to_string(),
            cursor: 0,
        });

        app.confirm_file_prompt();

        assert!(app.file_prompt.is_some());
        assert_eq!(app.state().notice().map(|n| n.kind), Some(NoticeKind::Validation));
    }

    #[tokio::test]
    async fn test_failed_request_round_trip() {
        let (mut app, mut rx) = test_app();
        app.dispatch(Action::EditChatInput("Olá".to_string()));
        app.chat_cursor = 3;
        app.dispatch(Action::SubmitChatTurn);
        assert_eq!(app.chat_cursor, 0);

        match rx.recv().await {
            Some(AppEvent::ChatDone { token, outcome }) => {
                assert!(outcome.is_err());
                app.on_chat_done(token, outcome);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(app.state().chat_input(), "Olá");
        assert_eq!(app.chat_cursor, 3);
        assert!(app.state().history().is_empty());
        assert_eq!(app.state().notice().map(|n| n.kind), Some(NoticeKind::Error));
    }
}
