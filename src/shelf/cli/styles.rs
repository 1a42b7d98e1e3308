use colored::{ColoredString, Colorize};
use shelf::model::ReadingStatus;
use shelf::settings::{parse_hex_color, Rgb, ThemeSpec};

fn paint(text: &str, color: Rgb) -> ColoredString {
    text.truecolor(color.r, color.g, color.b)
}

/// Terminal styles derived from the active theme.
#[derive(Clone, Copy)]
pub(super) struct Palette {
    theme: &'static ThemeSpec,
}

impl Palette {
    pub(super) fn new(theme: &'static ThemeSpec) -> Self {
        Self { theme }
    }

    pub(super) fn accent(&self, text: &str) -> ColoredString {
        paint(text, self.theme.accent)
    }

    pub(super) fn heading(&self, text: &str) -> ColoredString {
        paint(text, self.theme.heading).bold()
    }

    pub(super) fn muted(&self, text: &str) -> ColoredString {
        paint(text, self.theme.muted)
    }

    pub(super) fn success(&self, text: &str) -> ColoredString {
        paint(text, self.theme.success)
    }

    pub(super) fn warning(&self, text: &str) -> ColoredString {
        paint(text, self.theme.warning)
    }

    pub(super) fn status(&self, status: ReadingStatus, text: &str) -> ColoredString {
        match status {
            ReadingStatus::ToBeRead => self.muted(text),
            ReadingStatus::CurrentlyReading => self.accent(text),
            ReadingStatus::Finished => self.success(text),
            ReadingStatus::DidNotFinish => self.warning(text),
        }
    }

    /// Paints with a library's own color, falling back to the accent.
    pub(super) fn library(&self, hex: &str, text: &str) -> ColoredString {
        match parse_hex_color(hex) {
            Some(color) => paint(text, color).bold(),
            None => self.accent(text).bold(),
        }
    }
}
