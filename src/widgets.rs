//! Styling helpers shared by the composer panels.

use ratatui::{
    style::{Color, Modifier, Style, Stylize},
    text::Span,
    widgets::{Block, Borders, Padding},
};

use nucleo_matcher::{Config, Matcher};
use ratatui_themes::ThemePalette;

use crate::completion::fuzzy_match_indices;

/// Semantic color palette derived from the active theme.
/// Maps abstract UI roles to concrete `Color` values.
pub struct UiColors {
    pub key: Color,
    pub command: Color,
    pub value: Color,
    pub help: Color,
    pub border: Color,
    pub title: Color,
    pub preview: Color,
    pub message: Color,
    pub prompt: Color,
    pub selected_bg: Color,
    pub bg: Color,
    pub bar_bg: Color,
}

impl UiColors {
    pub fn from_palette(p: &ThemePalette) -> Self {
        let bar_bg = match p.bg {
            Color::Rgb(r, g, b) => Color::Rgb(
                r.saturating_add(10),
                g.saturating_add(10),
                b.saturating_add(15),
            ),
            _ => Color::Rgb(30, 30, 40),
        };

        let selected_bg = match p.selection {
            Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
            _ => Color::Rgb(40, 40, 60),
        };

        Self {
            key: p.warning,
            command: p.info,
            value: p.accent,
            help: p.muted,
            border: p.muted,
            title: p.accent,
            preview: p.fg,
            message: p.error,
            prompt: p.success,
            selected_bg,
            bg: p.bg,
            bar_bg,
        }
    }
}

/// Bordered panel with the title in the accent color.
pub fn panel_block(title: String, colors: &UiColors) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border))
        .title(title)
        .title_style(Style::default().fg(colors.title).bold())
        .padding(Padding::horizontal(1))
}

/// A mnemonic as shown in the listings.
pub fn key_span(text: String, colors: &UiColors, dimmed: bool) -> Span<'static> {
    Span::styled(text, dim_if(key_style(colors), dimmed))
}

pub fn key_style(colors: &UiColors) -> Style {
    Style::default().fg(colors.key).add_modifier(Modifier::BOLD)
}

pub fn dim_if(style: Style, dimmed: bool) -> Style {
    if dimmed {
        style.add_modifier(Modifier::DIM)
    } else {
        style
    }
}

/// Build spans with highlighted characters based on fuzzy match indices.
pub fn build_highlighted_text(
    text: &str,
    pattern: &str,
    normal_style: Style,
    highlight_style: Style,
) -> Vec<Span<'static>> {
    if pattern.is_empty() {
        return vec![Span::styled(text.to_string(), normal_style)];
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let (_score, indices) = fuzzy_match_indices(text, pattern, &mut matcher);

    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_highlighted = false;

    for (i, c) in chars.iter().enumerate() {
        let highlighted = indices.binary_search(&(i as u32)).is_ok();
        if highlighted != run_highlighted && !run.is_empty() {
            let style = if run_highlighted {
                highlight_style
            } else {
                normal_style
            };
            spans.push(Span::styled(std::mem::take(&mut run), style));
        }
        run_highlighted = highlighted;
        run.push(*c);
    }

    if !run.is_empty() {
        let style = if run_highlighted {
            highlight_style
        } else {
            normal_style
        };
        spans.push(Span::styled(run, style));
    }

    spans
}
