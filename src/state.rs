//! Client state and the transitions that drive it.
//!
//! Every user action and every network completion goes through
//! [`ClientState::apply`]. Transitions that need the backend return an
//! [`Effect`]; the caller runs it and feeds the completion back as another
//! [`Action`] carrying the same token. Completions whose token is no longer
//! current are dropped, so a slow response can never overwrite a newer one.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const EMPTY_SUBMISSION: &str = "Digite um texto ou selecione um arquivo.";
pub const PRODUCTIVE_CATEGORY: &str = "Produtivo";

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf"];

/// Why a picked path was not accepted as the draft file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("Formato não suportado. Use .txt ou .pdf")]
    Unsupported,
    #[error("Arquivo não encontrado: {}", .0.display())]
    Missing(PathBuf),
}

/// A file chosen for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
}

impl SelectedFile {
    /// Accepts existing `.txt` and `.pdf` files only.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, FileRejection> {
        let path = path.into();
        if extension_of(&path).is_none() {
            return Err(FileRejection::Unsupported);
        }
        if !path.is_file() {
            return Err(FileRejection::Missing(path));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { path, name })
    }

    pub fn mime_type(&self) -> &'static str {
        match extension_of(&self.path).as_deref() {
            Some("pdf") => "application/pdf",
            _ => "text/plain",
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// The email being prepared: free text or a file, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DraftInput {
    #[default]
    Empty,
    Text(String),
    File(SelectedFile),
}

impl DraftInput {
    pub fn text(&self) -> &str {
        match self {
            DraftInput::Text(text) => text,
            _ => "",
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            DraftInput::File(file) => Some(file),
            _ => None,
        }
    }

    fn set_text(&mut self, value: String) {
        if !value.is_empty() {
            *self = DraftInput::Text(value);
        } else if matches!(self, DraftInput::Text(_)) {
            *self = DraftInput::Empty;
        }
    }
}

/// Backend verdict for one email
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    #[serde(rename = "resposta", default)]
    pub suggested_reply: Option<String>,
}

impl ClassificationResult {
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }

    pub fn reply_text(&self) -> &str {
        self.suggested_reply.as_deref().unwrap_or_default()
    }

    pub fn is_productive(&self) -> bool {
        self.category.as_deref() == Some(PRODUCTIVE_CATEGORY)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the assistant conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Error,
    Info,
}

/// Message that blocks the view until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn validation(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Validation,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiFlags {
    pub classification_loading: bool,
    pub chat_loading: bool,
    pub chat_panel_open: bool,
}

/// What to send for a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyRequest {
    Text(String),
    File(SelectedFile),
}

/// Network work requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Classify {
        token: u64,
        request: ClassifyRequest,
    },
    Chat {
        token: u64,
        message: String,
        history: Vec<ChatTurn>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EditText(String),
    SelectFile(SelectedFile),
    ClearFile,
    SubmitClassification,
    ClassificationCompleted {
        token: u64,
        outcome: Result<ClassificationResult, String>,
    },
    EditChatInput(String),
    SubmitChatTurn,
    /// `Ok(None)` means the server answered without a `history` field.
    ChatCompleted {
        token: u64,
        outcome: Result<Option<Vec<ChatTurn>>, String>,
    },
    ClearChat,
    ToggleChatPanel,
    ShowNotice(Notice),
    DismissNotice,
}

/// The chat turn waiting on the server
#[derive(Debug, Clone)]
struct PendingTurn {
    token: u64,
    message: String,
    snapshot: Vec<ChatTurn>,
}

#[derive(Debug, Default)]
pub struct ClientState {
    draft: DraftInput,
    result: Option<ClassificationResult>,
    history: Vec<ChatTurn>,
    chat_input: String,
    pending_turn: Option<PendingTurn>,
    flags: UiFlags,
    /// Shown one at a time, oldest first
    notices: VecDeque<Notice>,
    classification_token: u64,
    chat_token: u64,
    scroll_requested: bool,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &DraftInput {
        &self.draft
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn chat_pending(&self) -> bool {
        self.pending_turn.is_some()
    }

    pub fn flags(&self) -> UiFlags {
        self.flags
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    /// True once after any change to chat history or the chat loading flag.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn apply(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::EditText(value) => {
                self.draft.set_text(value);
                None
            }
            Action::SelectFile(file) => {
                self.draft = DraftInput::File(file);
                None
            }
            Action::ClearFile => {
                if self.draft.file().is_some() {
                    self.draft = DraftInput::Empty;
                }
                None
            }
            Action::SubmitClassification => self.submit_classification(),
            Action::ClassificationCompleted { token, outcome } => {
                self.complete_classification(token, outcome);
                None
            }
            Action::EditChatInput(value) => {
                self.chat_input = value;
                None
            }
            Action::SubmitChatTurn => self.submit_chat_turn(),
            Action::ChatCompleted { token, outcome } => {
                self.complete_chat_turn(token, outcome);
                None
            }
            Action::ClearChat => {
                self.history.clear();
                if self.pending_turn.take().is_some() {
                    self.flags.chat_loading = false;
                }
                self.scroll_requested = true;
                None
            }
            Action::ToggleChatPanel => {
                self.flags.chat_panel_open = !self.flags.chat_panel_open;
                None
            }
            Action::ShowNotice(notice) => {
                self.notices.push_back(notice);
                None
            }
            Action::DismissNotice => {
                self.notices.pop_front();
                None
            }
        }
    }

    fn submit_classification(&mut self) -> Option<Effect> {
        let request = match &self.draft {
            DraftInput::File(file) => ClassifyRequest::File(file.clone()),
            DraftInput::Text(text) if !text.trim().is_empty() => ClassifyRequest::Text(text.clone()),
            _ => {
                self.notices.push_back(Notice::validation(EMPTY_SUBMISSION));
                return None;
            }
        };

        self.classification_token += 1;
        self.result = None;
        self.flags.classification_loading = true;

        Some(Effect::Classify {
            token: self.classification_token,
            request,
        })
    }

    fn complete_classification(&mut self, token: u64, outcome: Result<ClassificationResult, String>) {
        if token != self.classification_token {
            debug!(token, latest = self.classification_token, "discarding stale classification response");
            return;
        }

        self.flags.classification_loading = false;
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(message) => self.notices.push_back(Notice::error(format!("Erro: {}", message))),
        }
    }

    fn submit_chat_turn(&mut self) -> Option<Effect> {
        if self.chat_input.trim().is_empty() || self.pending_turn.is_some() {
            return None;
        }

        let message = std::mem::take(&mut self.chat_input);
        self.chat_token += 1;
        let token = self.chat_token;

        let snapshot = self.history.clone();
        self.history.push(ChatTurn::user(message.clone()));
        self.pending_turn = Some(PendingTurn {
            token,
            message: message.clone(),
            snapshot,
        });
        self.flags.chat_loading = true;
        self.scroll_requested = true;

        Some(Effect::Chat {
            token,
            message,
            history: self.history.clone(),
        })
    }

    fn complete_chat_turn(&mut self, token: u64, outcome: Result<Option<Vec<ChatTurn>>, String>) {
        let pending = match self.pending_turn.take() {
            Some(pending) if pending.token == token => pending,
            other => {
                debug!(token, "discarding chat response with no matching pending turn");
                self.pending_turn = other;
                return;
            }
        };

        match outcome {
            Ok(Some(history)) => self.history = history,
            // keep the optimistic list
            Ok(None) => {}
            Err(message) => {
                self.history = pending.snapshot;
                self.chat_input = pending.message;
                self.notices.push_back(Notice::error(format!("Erro no chat: {}", message)));
            }
        }

        self.flags.chat_loading = false;
        self.scroll_requested = true;
    }
}
