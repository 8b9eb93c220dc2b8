//! Reply colouring, decided separately for stdout and stderr.

use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT_THEME: OnceLock<Theme> = OnceLock::new();
static STDERR_THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    /// Listing headers
    pub header: Style,
    /// Accepted commands
    pub accepted: Style,
    /// Refused or failed commands
    pub refused: Style,
}

impl Theme {
    /// Colour only when the stream is an interactive terminal
    pub fn for_term(term: &console::Term) -> Self {
        if term.is_term() {
            Self {
                header: Style::new().cyan().bold(),
                accepted: Style::new().green(),
                refused: Style::new().red().bold(),
            }
        } else {
            Self {
                header: Style::new(),
                accepted: Style::new(),
                refused: Style::new(),
            }
        }
    }
}

pub fn stdout_theme() -> &'static Theme {
    STDOUT_THEME.get_or_init(|| Theme::for_term(&console::Term::stdout()))
}

pub fn stderr_theme() -> &'static Theme {
    STDERR_THEME.get_or_init(|| Theme::for_term(&console::Term::stderr()))
}
