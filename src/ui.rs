use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::app::{chat_line_count, App, FocusPane, InputMode, CHAT_WELCOME};
use crate::input;
use crate::state::{ChatRole, DraftInput, NoticeKind};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Form on the left; result on the right, sharing it with the chat when open
    let [email_area, right_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(body_area);

    let result_area = if app.state().flags().chat_panel_open {
        let [result_area, chat_area] = Layout::vertical([
            Constraint::Percentage(40),
            Constraint::Percentage(60),
        ])
        .areas(right_area);
        render_chat(app, frame, chat_area);
        result_area
    } else {
        app.chat_area = None;
        right_area
    };

    render_email_form(app, frame, email_area);
    render_result(app, frame, result_area);
    render_footer(app, frame, footer_area);

    // Popups; the notice sits on top of everything
    if app.file_prompt.is_some() {
        render_file_prompt(app, frame, area);
    }
    if app.state().notice().is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" 📧 Classificação de Emails - AutoU ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.backend_url()), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDITANDO ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::Email) => vec![
            (" Ctrl+S ", " classificar "),
            (" Enter ", " nova linha "),
            (" Esc ", " sair "),
        ],
        (InputMode::Editing, FocusPane::Chat) => vec![(" Enter ", " enviar "), (" Esc ", " sair ")],
        (InputMode::Normal, focus) => {
            let mut pairs = vec![
                (" i ", " editar "),
                (" f ", " arquivo "),
                (" s ", " classificar "),
                (" c ", " copiar "),
                (" a ", " assistente "),
            ];
            if app.state().draft().file().is_some() {
                pairs.insert(2, (" F ", " remover arquivo "));
            }
            if app.state().flags().chat_panel_open {
                pairs.push((" Tab ", " foco "));
                if focus == FocusPane::Chat {
                    pairs.push((" j/k ", " rolar "));
                    pairs.push((" L ", " limpar chat "));
                }
            }
            pairs.push((" q ", " sair "));
            pairs
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn border_color(app: &App, pane: FocusPane) -> Color {
    match (app.focus == pane, app.input_mode) {
        (true, InputMode::Editing) => Color::Yellow,
        (true, InputMode::Normal) => Color::Cyan,
        (false, _) => Color::DarkGray,
    }
}

fn render_email_form(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, FocusPane::Email)))
        .title(" Analisar Email ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [text_area, file_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    let text = app.state().draft().text();
    let width = text_area.width as usize;
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Email;

    if text.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "Cole o conteúdo do email aqui...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(placeholder, text_area);
    } else {
        let (cursor_row, _) = input::cursor_position(text, app.text_cursor, width);
        // Keep the cursor row on screen
        let visible = text_area.height as usize;
        let scroll = cursor_row.saturating_sub(visible.saturating_sub(1));

        let lines: Vec<Line> = input::wrap_lines(text, width)
            .into_iter()
            .skip(scroll)
            .take(visible)
            .map(Line::from)
            .collect();
        frame.render_widget(Paragraph::new(lines), text_area);
    }

    if editing && text_area.width > 0 && text_area.height > 0 {
        let (row, col) = input::cursor_position(text, app.text_cursor, width);
        let row = row.min(text_area.height as usize - 1);
        frame.set_cursor_position((text_area.x + col as u16, text_area.y + row as u16));
    }

    let file_line = match app.state().draft() {
        DraftInput::File(file) => Line::from(vec![
            Span::styled("Arquivo selecionado: ", Style::default().fg(Color::Gray)),
            Span::styled(file.name.clone(), Style::default().fg(Color::Cyan).bold()),
        ]),
        _ => Line::from(Span::styled(
            "Ou selecione um arquivo .txt ou .pdf (f)",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(file_line), file_area);

    let status = if app.state().flags().classification_loading {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        Span::styled(format!("⏳ Classificando{}", dots), Style::default().fg(Color::Yellow))
    } else {
        Span::styled("📤 s para enviar", Style::default().fg(Color::Green))
    };
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);
}

fn render_result(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Resultado da Análise ");

    let text = match app.state().result() {
        Some(result) => {
            let (icon, color) = if result.is_productive() {
                ("✅", Color::Green)
            } else {
                ("ℹ️", Color::Blue)
            };

            let mut lines = vec![
                Line::from(vec![
                    Span::raw(format!("{} ", icon)),
                    Span::styled("Categoria: ", Style::default().fg(Color::Gray)),
                    Span::styled(result.category_label().to_string(), Style::default().fg(color).bold()),
                ]),
                Line::default(),
                Line::from(Span::styled(
                    "Resposta sugerida:",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
            ];
            lines.extend(result.reply_text().lines().map(|line| Line::from(line.to_string())));
            Text::from(lines)
        }
        None if app.state().flags().classification_loading => Text::from(Span::styled(
            "Aguardando a classificação...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        None => Text::from(Span::styled(
            "O resultado aparecerá aqui após o envio.",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [history_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area for mouse hit-testing and its inner size for scroll calculations
    app.chat_area = Some(history_area);
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);

    let chat_focused = app.focus == FocusPane::Chat;
    let history_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if chat_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Assistente Virtual ");

    let loading = app.state().flags().chat_loading;
    let history = app.state().history();
    let mut lines: Vec<Line> = Vec::new();

    if history.is_empty() {
        for welcome in CHAT_WELCOME {
            lines.push(Line::from(Span::styled(welcome, Style::default().fg(Color::Gray))));
            lines.push(Line::default());
        }
    }

    for turn in history {
        let (prefix, style) = match turn.role {
            ChatRole::User => ("👤 ", Style::default().fg(Color::Cyan)),
            ChatRole::Assistant => ("🤖 ", Style::default().fg(Color::Yellow)),
        };
        for (i, line) in turn.content.split('\n').enumerate() {
            if i == 0 {
                lines.push(Line::from(vec![
                    Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
                    Span::styled(line.to_string(), style),
                ]));
            } else {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
        }
        lines.push(Line::default());
    }

    if loading {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("🤖 Digitando{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(history_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, history_area);

    let total_lines = chat_line_count(history, loading, app.chat_width as usize);
    if total_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        let mut scrollbar_state = ScrollbarState::new(total_lines.saturating_sub(app.chat_height) as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(scrollbar, history_area, &mut scrollbar_state);
    }

    render_chat_input(app, frame, input_area);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Chat;
    let pending = app.state().chat_pending();

    let title = if pending {
        " Aguardando resposta... "
    } else {
        " Digite sua mensagem... "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, FocusPane::Chat)))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .state()
        .chat_input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text).style(style).block(input_block);
    frame.render_widget(input, area);

    if editing && !pending {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Rect of the given size centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

fn render_file_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let Some(prompt) = &app.file_prompt else {
        return;
    };

    let popup_area = centered(area, 70, 6);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Selecionar arquivo (.txt ou .pdf) ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Caminho do arquivo. Enter para confirmar, Esc para cancelar.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let scroll_offset = if width > 0 && prompt.cursor >= width {
        prompt.cursor - width + 1
    } else {
        0
    };
    let visible: String = prompt.input.chars().skip(scroll_offset).take(width).collect();

    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);
    frame.set_cursor_position((input_area.x + (prompt.cursor - scroll_offset) as u16, input_area.y));
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = app.state().notice() else {
        return;
    };

    let (title, color) = match notice.kind {
        NoticeKind::Validation => (" Atenção ", Color::Yellow),
        NoticeKind::Error => (" Erro ", Color::Red),
        NoticeKind::Info => (" Aviso ", Color::Green),
    };

    let width = 60u16;
    let body_lines = input::wrap_lines(&notice.text, width.saturating_sub(4) as usize).len() as u16;
    let popup_area = centered(area, width, body_lines + 4);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let mut lines = vec![Line::from(notice.text.as_str())];
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Enter/Esc para fechar",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup_area);
}
