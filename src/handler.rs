use anyhow::{anyhow, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::app::{App, FocusPane, InputMode};
use crate::input;
use crate::state::{Action, Notice};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::ClassificationDone { token, outcome } => app.on_classification_done(token, outcome),
        AppEvent::ChatDone { token, outcome } => app.on_chat_done(token, outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Notices block everything else until dismissed
    if app.state().notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dispatch(Action::DismissNotice);
        }
        return;
    }

    if app.file_prompt.is_some() {
        handle_file_prompt(app, key);
        return;
    }

    match (app.input_mode, app.focus) {
        (InputMode::Normal, _) => handle_normal_mode(app, key),
        (InputMode::Editing, FocusPane::Email) => handle_email_editing(app, key),
        (InputMode::Editing, FocusPane::Chat) => handle_chat_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let chat_open = app.state().flags().chat_panel_open;

    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => start_editing(app),
        KeyCode::Char('f') => app.open_file_prompt(),
        KeyCode::Char('F') => app.dispatch(Action::ClearFile),
        KeyCode::Char('s') => app.dispatch(Action::SubmitClassification),
        KeyCode::Char('c') => copy_reply(app),
        KeyCode::Char('a') => app.toggle_chat_panel(),
        KeyCode::Tab => app.cycle_focus(),

        // Chat panel
        KeyCode::Char('L') if chat_open => {
            info!("clearing chat history");
            app.dispatch(Action::ClearChat);
        }
        KeyCode::Char('j') | KeyCode::Down if chat_open => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up if chat_open => app.scroll_chat_up(1),
        KeyCode::PageDown if chat_open => app.scroll_chat_down(app.chat_height / 2),
        KeyCode::PageUp if chat_open => app.scroll_chat_up(app.chat_height / 2),
        KeyCode::Char('G') if chat_open => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn start_editing(app: &mut App) {
    match app.focus {
        FocusPane::Email => {
            app.text_cursor = app.state().draft().text().chars().count();
        }
        FocusPane::Chat => {
            // Input stays disabled while a turn is in flight
            if app.state().chat_pending() {
                return;
            }
            app.chat_cursor = app.state().chat_input().chars().count();
        }
    }
    app.input_mode = InputMode::Editing;
}

fn handle_email_editing(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char('s') if ctrl => app.dispatch(Action::SubmitClassification),
        KeyCode::Enter => edit_text(app, |text, cursor| input::insert_char(text, cursor, '\n')),
        KeyCode::Backspace => edit_text(app, input::backspace),
        KeyCode::Delete => edit_text(app, |text, cursor| input::delete_forward(text, *cursor)),
        KeyCode::Left => {
            app.text_cursor = app.text_cursor.saturating_sub(1);
        }
        KeyCode::Right => edit_text(app, |text, cursor| input::move_right(text, cursor)),
        KeyCode::Home => {
            app.text_cursor = 0;
        }
        KeyCode::End => {
            app.text_cursor = app.state().draft().text().chars().count();
        }
        KeyCode::Char(c) if !ctrl => edit_text(app, |text, cursor| input::insert_char(text, cursor, c)),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }
    if app.state().chat_pending() {
        return;
    }

    match key.code {
        KeyCode::Enter => app.dispatch(Action::SubmitChatTurn),
        KeyCode::Backspace => edit_chat(app, input::backspace),
        KeyCode::Delete => edit_chat(app, |text, cursor| input::delete_forward(text, *cursor)),
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => edit_chat(app, |text, cursor| input::move_right(text, cursor)),
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.state().chat_input().chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            edit_chat(app, |text, cursor| input::insert_char(text, cursor, c))
        }
        _ => {}
    }
}

fn handle_file_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.file_prompt = None;
            return;
        }
        KeyCode::Enter => {
            app.confirm_file_prompt();
            return;
        }
        _ => {}
    }

    let Some(prompt) = app.file_prompt.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Backspace => input::backspace(&mut prompt.input, &mut prompt.cursor),
        KeyCode::Delete => input::delete_forward(&mut prompt.input, prompt.cursor),
        KeyCode::Left => prompt.cursor = prompt.cursor.saturating_sub(1),
        KeyCode::Right => input::move_right(&prompt.input, &mut prompt.cursor),
        KeyCode::Home => prompt.cursor = 0,
        KeyCode::End => prompt.cursor = prompt.input.chars().count(),
        KeyCode::Char(c) => input::insert_char(&mut prompt.input, &mut prompt.cursor, c),
        _ => {}
    }
}

/// Edit the email text through the reducer so the file selection is kept in sync.
fn edit_text(app: &mut App, edit: impl FnOnce(&mut String, &mut usize)) {
    let mut text = app.state().draft().text().to_string();
    let mut cursor = app.text_cursor;
    edit(&mut text, &mut cursor);
    app.text_cursor = cursor;

    if text != app.state().draft().text() {
        app.dispatch(Action::EditText(text));
    }
}

fn edit_chat(app: &mut App, edit: impl FnOnce(&mut String, &mut usize)) {
    let mut text = app.state().chat_input().to_string();
    let mut cursor = app.chat_cursor;
    edit(&mut text, &mut cursor);
    app.chat_cursor = cursor;

    if text != app.state().chat_input() {
        app.dispatch(Action::EditChatInput(text));
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.state().notice().is_some() {
        return;
    }

    if let Some(prompt) = app.file_prompt.as_mut() {
        let path = text.lines().next().unwrap_or_default().trim();
        input::insert_str(&mut prompt.input, &mut prompt.cursor, path);
        return;
    }

    match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Chat) => {
            if app.state().chat_pending() {
                return;
            }
            let line = text.replace(['\r', '\n'], " ");
            edit_chat(app, |buffer, cursor| input::insert_str(buffer, cursor, &line));
        }
        (_, FocusPane::Email) => {
            // Pasting an email while browsing starts editing at the end
            if app.input_mode == InputMode::Normal {
                start_editing(app);
            }
            let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
            edit_text(app, |buffer, cursor| input::insert_str(buffer, cursor, &normalized));
        }
        _ => {}
    }
}

fn copy_reply(app: &mut App) {
    let reply = app
        .state()
        .result()
        .map(|result| result.reply_text().to_string())
        .filter(|reply| !reply.is_empty());

    let Some(reply) = reply else {
        app.notify(Notice::error("Nenhuma resposta sugerida para copiar."));
        return;
    };

    match copy_to_clipboard(&reply) {
        Ok(()) => app.notify(Notice::info("Resposta copiada para a área de transferência!")),
        Err(e) => {
            warn!(error = %e, "clipboard copy failed");
            app.notify(Notice::error(format!("Não foi possível copiar: {}", e)));
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    const TOOLS: [(&str, &[&str]); 4] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ];

    for (program, args) in TOOLS {
        let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        if child.wait()?.success() {
            return Ok(());
        }
    }

    Err(anyhow!("nenhuma ferramenta de área de transferência disponível"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BackendClient;
    use crate::config::Config;
    use crate::state::{NoticeKind, EMPTY_SUBMISSION};
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = BackendClient::new("http://127.0.0.1:9");
        (App::new(backend, Config::default(), None, tx), rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_edits_email_text() {
        let (mut app, _rx) = test_app();

        press(&mut app, KeyCode::Char('i'));
        type_str(&mut app, "Olá");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "tudo");
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.state().draft().text(), "Olá\ntud");
        assert_eq!(app.text_cursor, 7);
    }

    #[test]
    fn test_submit_empty_shows_validation_notice() {
        let (mut app, _rx) = test_app();

        press(&mut app, KeyCode::Char('s'));

        let notice = app.state().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Validation);
        assert_eq!(notice.text, EMPTY_SUBMISSION);
        assert!(!app.state().flags().classification_loading);
    }

    #[test]
    fn test_notice_blocks_keys_until_dismissed() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('s'));

        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        assert!(app.state().notice().is_none());

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('i'));

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));

        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_ctrl_s_submits_while_editing() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('i'));
        type_str(&mut app, "Preciso de ajuda");

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

        assert!(app.state().flags().classification_loading);
        assert_eq!(app.state().draft().text(), "Preciso de ajuda");
    }

    #[test]
    fn test_paste_in_normal_mode_starts_editing() {
        let (mut app, _rx) = test_app();

        handle_paste(&mut app, "Linha 1\r\nLinha 2");

        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.state().draft().text(), "Linha 1\nLinha 2");
    }

    #[test]
    fn test_chat_paste_is_single_line() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('i'));

        handle_paste(&mut app, "uma\nduas");

        assert_eq!(app.state().chat_input(), "uma duas");
    }

    #[tokio::test]
    async fn test_chat_input_locked_while_pending() {
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "Oi");
        press(&mut app, KeyCode::Enter);
        assert!(app.state().chat_pending());

        type_str(&mut app, "mais");

        assert_eq!(app.state().chat_input(), "");
        assert_eq!(app.state().history().len(), 1);
    }

    #[test]
    fn test_file_prompt_selects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pedido.txt");
        std::fs::write(&path, "Pedido de suporte").unwrap();
        let (mut app, _rx) = test_app();
        press(&mut app, KeyCode::Char('i'));
        type_str(&mut app, "rascunho");
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('f'));
        type_str(&mut app, &path.display().to_string());
        press(&mut app, KeyCode::Enter);

        assert!(app.file_prompt.is_none());
        assert_eq!(app.state().draft().text(), "");
        assert_eq!(app.state().draft().file().map(|f| f.path.clone()), Some(path));
    }

    #[tokio::test]
    async fn test_submitting_file_spawns_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pedido.pdf");
        std::fs::write(&path, "%PDF-1.4").unwrap();
        let (mut app, mut rx) = test_app();
        press(&mut app, KeyCode::Char('f'));
        type_str(&mut app, &path.display().to_string());
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('s'));
        assert!(app.state().flags().classification_loading);

        // Nothing listens on the test address, so the upload fails
        match rx.recv().await {
            Some(AppEvent::ClassificationDone { token, outcome }) => {
                assert!(outcome.is_err());
                handle_event(&mut app, AppEvent::ClassificationDone { token, outcome });
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert!(!app.state().flags().classification_loading);
        assert_eq!(app.state().notice().map(|n| n.kind), Some(NoticeKind::Error));
        assert!(app.state().result().is_none());
        assert!(app.state().draft().file().is_some());
    }

    #[test]
    fn test_copy_without_result_is_an_error() {
        let (mut app, _rx) = test_app();

        press(&mut app, KeyCode::Char('c'));

        let notice = app.state().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "Nenhuma resposta sugerida para copiar.");
    }
}
