//! Event handling.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::presentation::widgets::GridCommand;

/// Rows scrolled per mouse wheel notch.
pub const WHEEL_STEP: i32 = 3;

/// What a key press asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Exit application.
    Quit,
    /// Open the focused image's page in the browser.
    OpenFocused,
    /// Drive the grid.
    Grid(GridCommand),
}

/// What a mouse event asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    /// Scroll the grid by rows.
    Scroll(i32),
    /// Focus the card at a screen position.
    Click {
        /// Screen column.
        column: u16,
        /// Screen row.
        row: u16,
    },
}

/// Terminal event classification.
pub struct EventHandler;

impl EventHandler {
    /// Checks if key is a quit event.
    #[must_use]
    pub fn is_quit_event(key: &KeyEvent) -> bool {
        matches!(
            key,
            KeyEvent {
                code: KeyCode::Char('q'),
                modifiers: KeyModifiers::NONE,
                ..
            } | KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } | KeyEvent {
                code: KeyCode::Esc,
                modifiers: KeyModifiers::NONE,
                ..
            }
        )
    }

    /// Maps a key press to an action. Releases and unbound keys map to `None`.
    #[must_use]
    pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if Self::is_quit_event(key) {
            return Some(KeyAction::Quit);
        }

        let command = match key.code {
            KeyCode::Char('j') | KeyCode::Down => GridCommand::ScrollBy(1),
            KeyCode::Char('k') | KeyCode::Up => GridCommand::ScrollBy(-1),
            KeyCode::Char(' ') | KeyCode::PageDown => GridCommand::ScrollPages(1),
            KeyCode::Char('b') | KeyCode::PageUp => GridCommand::ScrollPages(-1),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                GridCommand::ScrollPages(1)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                GridCommand::ScrollPages(-1)
            }
            KeyCode::Char('g') | KeyCode::Home => GridCommand::ScrollTo(0),
            KeyCode::Char('G') | KeyCode::End => GridCommand::ScrollTo(u32::MAX),
            KeyCode::Char('r') => GridCommand::RecomputeCellPositions,
            KeyCode::Char('o') | KeyCode::Enter => return Some(KeyAction::OpenFocused),
            _ => return None,
        };
        Some(KeyAction::Grid(command))
    }

    /// Maps a mouse event to an action.
    #[must_use]
    pub const fn mouse_action(mouse: &MouseEvent) -> Option<MouseAction> {
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(MouseAction::Scroll(WHEEL_STEP)),
            MouseEventKind::ScrollUp => Some(MouseAction::Scroll(-WHEEL_STEP)),
            MouseEventKind::Down(MouseButton::Left) => Some(MouseAction::Click {
                column: mouse.column,
                row: mouse.row,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn make_key_event(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press)
    }

    fn mouse(kind: MouseEventKind) -> MouseEvent {
        MouseEvent {
            kind,
            column: 7,
            row: 3,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_quit_events() {
        assert!(EventHandler::is_quit_event(&make_key_event(
            KeyCode::Char('q'),
            KeyModifiers::NONE
        )));
        assert!(EventHandler::is_quit_event(&make_key_event(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(EventHandler::is_quit_event(&make_key_event(
            KeyCode::Esc,
            KeyModifiers::NONE
        )));
        assert!(!EventHandler::is_quit_event(&make_key_event(
            KeyCode::Char('c'),
            KeyModifiers::NONE
        )));
    }

    #[test_case(KeyCode::Char('j'), KeyModifiers::NONE, GridCommand::ScrollBy(1) ; "j_down")]
    #[test_case(KeyCode::Up, KeyModifiers::NONE, GridCommand::ScrollBy(-1) ; "arrow_up")]
    #[test_case(KeyCode::PageDown, KeyModifiers::NONE, GridCommand::ScrollPages(1) ; "page_down")]
    #[test_case(KeyCode::Char('u'), KeyModifiers::CONTROL, GridCommand::ScrollPages(-1) ; "ctrl_u")]
    #[test_case(KeyCode::Home, KeyModifiers::NONE, GridCommand::ScrollTo(0) ; "home")]
    #[test_case(KeyCode::Char('G'), KeyModifiers::SHIFT, GridCommand::ScrollTo(u32::MAX) ; "shift_g")]
    #[test_case(KeyCode::Char('r'), KeyModifiers::NONE, GridCommand::RecomputeCellPositions ; "recompute")]
    fn test_grid_keys(code: KeyCode, modifiers: KeyModifiers, expected: GridCommand) {
        assert_eq!(
            EventHandler::key_action(&make_key_event(code, modifiers)),
            Some(KeyAction::Grid(expected))
        );
    }

    #[test]
    fn test_other_keys() {
        assert_eq!(
            EventHandler::key_action(&make_key_event(KeyCode::Char('o'), KeyModifiers::NONE)),
            Some(KeyAction::OpenFocused)
        );
        assert_eq!(
            EventHandler::key_action(&make_key_event(KeyCode::Esc, KeyModifiers::NONE)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            EventHandler::key_action(&make_key_event(KeyCode::Char('d'), KeyModifiers::NONE)),
            None
        );

        let release =
            KeyEvent::new_with_kind(KeyCode::Char('j'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(EventHandler::key_action(&release), None);
    }

    #[test]
    fn test_mouse_actions() {
        assert_eq!(
            EventHandler::mouse_action(&mouse(MouseEventKind::ScrollDown)),
            Some(MouseAction::Scroll(WHEEL_STEP))
        );
        assert_eq!(
            EventHandler::mouse_action(&mouse(MouseEventKind::ScrollUp)),
            Some(MouseAction::Scroll(-WHEEL_STEP))
        );
        assert_eq!(
            EventHandler::mouse_action(&mouse(MouseEventKind::Down(MouseButton::Left))),
            Some(MouseAction::Click { column: 7, row: 3 })
        );
        assert_eq!(EventHandler::mouse_action(&mouse(MouseEventKind::Moved)), None);
    }
}
