//! Cursor editing on plain `String` buffers.
//!
//! Cursors are char indices, not byte offsets, so accented input stays valid UTF-8.

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn insert_char(s: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(s, *cursor);
    s.insert(byte_pos, c);
    *cursor += 1;
}

pub fn insert_str(s: &mut String, cursor: &mut usize, text: &str) {
    let byte_pos = char_to_byte_index(s, *cursor);
    s.insert_str(byte_pos, text);
    *cursor += text.chars().count();
}

pub fn backspace(s: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        *cursor -= 1;
        let byte_pos = char_to_byte_index(s, *cursor);
        s.remove(byte_pos);
    }
}

pub fn delete_forward(s: &mut String, cursor: usize) {
    if cursor < s.chars().count() {
        let byte_pos = char_to_byte_index(s, cursor);
        s.remove(byte_pos);
    }
}

pub fn move_right(s: &str, cursor: &mut usize) {
    *cursor = (*cursor + 1).min(s.chars().count());
}

/// Hard-wrap at `width` chars, keeping explicit line breaks.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            lines.push(chunk.iter().collect());
        }
    }

    lines
}

/// Row and column of `cursor` in the output of [`wrap_lines`].
pub fn cursor_position(text: &str, cursor: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0;
    let mut col = 0;

    for c in text.chars().take(cursor) {
        if c == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        if col == width {
            row += 1;
            col = 0;
        }
        col += 1;
    }

    // A full row puts the cursor at the start of the next one
    if col == width {
        (row + 1, 0)
    } else {
        (row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_accented_text() {
        let mut text = String::from("Olá");
        let mut cursor = 3;

        insert_char(&mut text, &mut cursor, '!');
        assert_eq!(text, "Olá!");

        cursor = 3;
        backspace(&mut text, &mut cursor);
        assert_eq!(text, "Ol!");
        assert_eq!(cursor, 2);

        delete_forward(&mut text, cursor);
        assert_eq!(text, "Ol");

        insert_str(&mut text, &mut cursor, "á, ação");
        assert_eq!(text, "Olá, ação");
        assert_eq!(cursor, 9);

        move_right(&text, &mut cursor);
        assert_eq!(cursor, 9);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut text = String::from("abc");
        let mut cursor = 0;

        backspace(&mut text, &mut cursor);

        assert_eq!(text, "abc");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn test_wrap_lines() {
        assert_eq!(wrap_lines("abcdef\n\nxy", 4), vec!["abcd", "ef", "", "xy"]);
        assert_eq!(wrap_lines("", 10), vec![""]);
    }

    #[test]
    fn test_cursor_position_follows_wrapping() {
        let text = "abcdef\nxy";

        assert_eq!(cursor_position(text, 0, 4), (0, 0));
        assert_eq!(cursor_position(text, 5, 4), (1, 1));
        assert_eq!(cursor_position(text, 7, 4), (2, 0));
        assert_eq!(cursor_position(text, 9, 4), (2, 2));
    }

    #[test]
    fn test_cursor_at_wrap_boundary_starts_next_row() {
        assert_eq!(wrap_lines("abcde", 4), vec!["abcd", "e"]);
        assert_eq!(cursor_position("abcde", 4, 4), (1, 0));
        assert_eq!(cursor_position("abcde", 5, 4), (1, 1));
        assert_eq!(cursor_position("abcd", 4, 4), (1, 0));
        // An explicit break right after a full row does not add a row
        assert_eq!(cursor_position("abcd\nx", 5, 4), (1, 0));
    }
}
