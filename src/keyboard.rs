//! Platform-neutral button grids and cards.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Payload command sent back when the button is pressed.
    pub command: String,
    pub color: Option<Color>,
}

impl Button {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            color: None,
        }
    }

    pub fn primary(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            color: Some(Color::Primary),
            ..Self::new(label, command)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub inline: bool,
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rich card with a link and action buttons (a VK carousel element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub description: String,
    pub link: String,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardError {
    /// Requested page has no items on it.
    NoSuchPage { page: usize, total: usize, page_size: usize },
    /// Rows or columns is zero.
    EmptyGrid,
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchPage { page, total, page_size } => write!(
                f,
                "no page {} for {} items with {} buttons per page",
                page, total, page_size
            ),
            Self::EmptyGrid => write!(f, "keyboard needs at least one row and one column"),
        }
    }
}

impl std::error::Error for KeyboardError {}

pub fn grand_prix_command(number: usize) -> String {
    format!("gpPage_{number}")
}

pub fn list_page_command(page: usize) -> String {
    format!("gpListPage_{page}")
}

/// Build page `page` (1-based) of a numbered grid covering `total` items.
///
/// `total == 0` yields an empty keyboard, which closes an open one.
pub fn make_keyboard(
    rows: usize,
    cols: usize,
    page: usize,
    total: usize,
    inline: bool,
) -> Result<Keyboard, KeyboardError> {
    if total == 0 {
        return Ok(Keyboard { inline, rows: Vec::new() });
    }
    if rows == 0 || cols == 0 {
        return Err(KeyboardError::EmptyGrid);
    }

    let page_size = rows * cols;
    let no_such_page = KeyboardError::NoSuchPage { page, total, page_size };
    if page == 0 {
        return Err(no_such_page);
    }
    // Page numbers come from payloads and may be arbitrarily large.
    let offset = match page_size.checked_mul(page - 1) {
        Some(offset) if offset < total => offset,
        _ => return Err(no_such_page),
    };
    let visible = (total - offset).min(page_size);

    let numbers: Vec<Button> = (offset + 1..=offset + visible)
        .map(|n| Button::new(n.to_string(), grand_prix_command(n)))
        .collect();
    let mut grid: Vec<Vec<Button>> = numbers.chunks(cols).map(<[Button]>::to_vec).collect();

    let last_page = total.div_ceil(page_size);
    let navigation = match (page == 1, page == last_page) {
        (true, true) => None,
        (true, false) => Some(vec![Button::primary("Далее", list_page_command(2))]),
        (false, false) => Some(vec![
            Button::primary("Назад", list_page_command(page - 1)),
            Button::primary("Далее", list_page_command(page + 1)),
        ]),
        (false, true) => Some(vec![
            Button::primary("Назад", list_page_command(page - 1)),
            Button::primary("В начало", list_page_command(1)),
        ]),
    };
    grid.extend(navigation);

    Ok(Keyboard { inline, rows: grid })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(keyboard: &Keyboard) -> Vec<Vec<&str>> {
        keyboard
            .rows
            .iter()
            .map(|row| row.iter().map(|b| b.label.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_first_page() {
        let kb = make_keyboard(2, 4, 1, 9, false).unwrap();
        assert_eq!(
            labels(&kb),
            vec![
                vec!["1", "2", "3", "4"],
                vec!["5", "6", "7", "8"],
                vec!["Далее"],
            ]
        );
        assert_eq!(kb.rows[0][0].command, "gpPage_1");
        assert_eq!(kb.rows[2][0].command, "gpListPage_2");
        assert_eq!(kb.rows[2][0].color, Some(Color::Primary));
        assert!(!kb.inline);
    }

    #[test]
    fn test_middle_page() {
        let kb = make_keyboard(2, 4, 2, 22, false).unwrap();
        assert_eq!(kb.rows.len(), 3);
        assert_eq!(kb.rows[0][0].label, "9");
        assert_eq!(kb.rows[1][3].label, "16");
        assert_eq!(labels(&kb)[2], vec!["Назад", "Далее"]);
        assert_eq!(kb.rows[2][0].command, "gpListPage_1");
        assert_eq!(kb.rows[2][1].command, "gpListPage_3");
    }

    #[test]
    fn test_last_partial_page() {
        let kb = make_keyboard(2, 4, 3, 22, true).unwrap();
        assert_eq!(
            labels(&kb),
            vec![
                vec!["17", "18", "19", "20"],
                vec!["21", "22"],
                vec!["Назад", "В начало"],
            ]
        );
        assert_eq!(kb.rows[2][1].command, "gpListPage_1");
        assert!(kb.inline);
    }

    #[test]
    fn test_single_page_has_no_navigation() {
        let kb = make_keyboard(2, 4, 1, 5, false).unwrap();
        assert_eq!(labels(&kb), vec![vec!["1", "2", "3", "4"], vec!["5"]]);
    }

    #[test]
    fn test_zero_items_is_empty() {
        let kb = make_keyboard(2, 4, 1, 0, false).unwrap();
        assert!(kb.is_empty());
    }

    #[test]
    fn test_page_out_of_range() {
        let err = make_keyboard(2, 4, 4, 22, false).unwrap_err();
        assert_eq!(err, KeyboardError::NoSuchPage { page: 4, total: 22, page_size: 8 });
        assert!(make_keyboard(2, 4, 0, 22, false).is_err());
        assert!(make_keyboard(2, 4, 2, 8, false).is_err());
    }

    #[test]
    fn test_huge_page_is_out_of_range() {
        let page: usize = "9999999999999999999".parse().unwrap();
        assert_eq!(
            make_keyboard(2, 4, page, 22, false).unwrap_err(),
            KeyboardError::NoSuchPage { page, total: 22, page_size: 8 }
        );
        // (page - 1) * 8 wraps to zero without the overflow check.
        let wrapping = usize::MAX / 8 + 2;
        assert!(make_keyboard(2, 4, wrapping, 22, false).is_err());
    }

    #[test]
    fn test_zero_sized_grid() {
        assert_eq!(make_keyboard(0, 4, 1, 3, false).unwrap_err(), KeyboardError::EmptyGrid);
    }
}
