use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ENVVAR_KEY, HELP_KEY};
use crate::completion;
use crate::layout::{Page, PagedText};
use crate::spec::{OptionKind, OptionSpec};
use crate::widgets::{self, dim_if, key_span, panel_block, UiColors};

/// Main render function called from the event loop.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let colors = UiColors::from_palette(&app.palette());

    // Top-level vertical layout:
    //   [command preview]
    //   [subcommands | options]
    //   [message / minibuffer]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(outer[1]);

    render_preview(frame, app, outer[0], &colors);
    render_subcommands(frame, app, body[0], &colors);
    render_options(frame, app, body[1], &colors);

    if app.minibuffer.is_some() {
        render_minibuffer(frame, app, outer[2], &colors);
        render_completions(frame, app, area, outer[2], &colors);
    } else {
        render_message(frame, app, outer[2], &colors);
    }

    if app.help_visible {
        render_help(frame, area, &colors);
    }
}

/// One line of tokens with the token under the cursor reversed. The trailing
/// blank cell stands for the position after the last token.
pub fn preview_line(app: &App, colors: &UiColors) -> Line<'static> {
    let cursor = app.composition.cursor();
    let normal = Style::default().fg(colors.preview);
    let at_cursor = normal.add_modifier(Modifier::REVERSED);

    let mut spans = Vec::new();
    let regions = app.composition.regions(&app.tree);
    let end = regions.len();
    for region in regions {
        if region.id > 0 {
            spans.push(Span::raw(" "));
        }
        let style = if region.id == cursor { at_cursor } else { normal };
        spans.push(Span::styled(region.text, style));
    }
    spans.push(Span::raw(" "));
    let style = if cursor == end { at_cursor } else { normal };
    spans.push(Span::styled(" ", style));

    Line::from(spans)
}

fn render_preview(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let block = panel_block(" Command preview ".to_string(), colors);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let line = preview_line(app, colors);
    let rows = preview_rows(line.width(), inner.width).min(inner.height);
    let area = Rect {
        y: inner.y + (inner.height - rows) / 2,
        height: inner.height - (inner.height - rows) / 2,
        ..inner
    };
    let paragraph = Paragraph::new(line)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Rows a preview of `width` cells takes when wrapped to `available` columns.
fn preview_rows(width: usize, available: u16) -> u16 {
    let available = available.max(1) as usize;
    width.div_ceil(available).max(1) as u16
}

fn render_subcommands(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let dimmed = app.prefix.is_some();
    let text_style = dim_if(Style::default(), dimmed);

    let mut lines = vec![
        Line::from(vec![
            key_span(format!(" {ENVVAR_KEY}"), colors, dimmed),
            Span::styled("  add environment variable", text_style),
        ]),
        Line::from(vec![
            key_span(format!(" {HELP_KEY}"), colors, dimmed),
            Span::styled("  show help", text_style),
        ]),
        Line::default(),
    ];

    for command in &app.keys.commands {
        let node = app.tree.node(command.node);
        let mut spans = vec![
            key_span(format!(" {}", command.key), colors, dimmed),
            Span::styled(
                format!("  {}", node.name),
                dim_if(Style::default().fg(colors.command), dimmed),
            ),
        ];
        if !node.help.is_empty() {
            spans.push(Span::styled(format!(" - {}", node.help), text_style));
        }
        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines).block(panel_block(" Subcommands ".to_string(), colors));
    frame.render_widget(paragraph, area);
}

fn render_options(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let height = area.height.saturating_sub(2) as usize;
    let pages = option_pages(app, colors, height);
    app.options_page_count.set(pages.len());
    let page = app.options_page.min(pages.len().saturating_sub(1));

    let title = if pages.len() > 1 {
        format!(" Options ({}/{}) ", page + 1, pages.len())
    } else {
        " Options ".to_string()
    };

    let lines = pages.into_iter().nth(page).unwrap_or_default();
    let paragraph = Paragraph::new(lines).block(panel_block(title, colors));
    frame.render_widget(paragraph, area);
}

/// The option catalog for the active path, laid out over pages of `height`
/// lines. Rows that the armed prefix cannot reach are dimmed.
pub fn option_pages(app: &App, colors: &UiColors, height: usize) -> Vec<Page> {
    let mut text = PagedText::new(height);

    for &node_id in app.composition.path() {
        let node = app.tree.node(node_id);
        if node.options.is_empty() {
            continue;
        }
        text.write(&format!("{}:\n", node.name));

        for &option_id in &node.options {
            let option = app.tree.option(option_id);
            let Some((prefix, key)) = app.keys.flag_key(option_id) else {
                continue;
            };
            let dimmed = app.prefix.is_some_and(|armed| armed != prefix);
            if dimmed {
                text.dim();
            }
            text.fg(colors.key).bold().write(&format!(" {prefix}{key}"));
            text.unbold().reset_fg().write(&format!("  {}", option.help));
            text.dim().write(&format!(" ({})", flag_synopsis(option)));
            text.undim().write("\n");
        }

        for &option_id in &node.options {
            let Some(key) = app.keys.argument_key(option_id) else {
                continue;
            };
            if app.prefix.is_some() {
                text.dim();
            }
            let option = app.tree.option(option_id);
            text.fg(colors.key).bold().write(&format!("  {key}"));
            text.unbold().reset_fg().write(&format!("  {}", option.help));
            text.dim().italic().write(&format!(" ({})", argument_synopsis(option)));
            text.unitalic().undim().write("\n");
        }

        text.reset().write("\n");
    }

    text.into_pages()
}

/// Spellings with the value shape, e.g. `-j, --jobs <n>` or
/// `--message-format [fmt]`.
pub fn flag_synopsis(option: &OptionSpec) -> String {
    let mut synopsis = option.display_name();
    match option.kind {
        OptionKind::Value => {
            synopsis.push_str(&format!("{}<{}>", option.separator, option.metavar()));
        }
        OptionKind::ValueOptional => {
            synopsis.push_str(&format!("{}[{}]", option.separator, option.metavar()));
        }
        OptionKind::Toggle => {}
    }
    if option.repeatable {
        synopsis.push_str(" [repeatable]");
    }
    synopsis
}

/// `name`, or `name...` when the argument takes several values.
pub fn argument_synopsis(option: &OptionSpec) -> String {
    let mut synopsis = option.display_name();
    if option.repeatable {
        synopsis.push_str("...");
    }
    synopsis
}

fn render_message(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" {}", app.message),
        Style::default().fg(colors.message),
    )))
    .style(Style::default().bg(colors.bar_bg));
    frame.render_widget(paragraph, area);
}

fn render_minibuffer(frame: &mut Frame, app: &App, area: Rect, colors: &UiColors) {
    let Some(minibuffer) = &app.minibuffer else {
        return;
    };
    let (before, after) = minibuffer.split_at_cursor();
    let value = Style::default().fg(colors.value);

    let mut spans = vec![
        Span::styled(
            format!(" {} ", minibuffer.label),
            Style::default().fg(colors.prompt).add_modifier(Modifier::BOLD),
        ),
        Span::styled(before, value),
        Span::styled("▎", value.add_modifier(Modifier::SLOW_BLINK)),
        Span::styled(after, value),
    ];
    if minibuffer.text().is_empty() && !minibuffer.placeholder.is_empty() {
        spans.push(Span::styled(
            minibuffer.placeholder.clone(),
            Style::default().fg(colors.help).add_modifier(Modifier::DIM),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.bar_bg));
    frame.render_widget(paragraph, area);
}

/// Matching candidates stacked above the prompt. When they do not all fit,
/// the last row says how many were left out.
fn render_completions(frame: &mut Frame, app: &App, area: Rect, prompt: Rect, colors: &UiColors) {
    let Some(minibuffer) = &app.minibuffer else {
        return;
    };
    let matches = minibuffer.matches();
    let rows = completion::visible_rows(area.height);
    if matches.is_empty() || rows == 0 {
        return;
    }

    let (shown, omitted) = if matches.len() > rows {
        (rows - 1, matches.len() - (rows - 1))
    } else {
        (matches.len(), 0)
    };
    let offset = (minibuffer.selected + 1).saturating_sub(shown);

    let normal = Style::default().fg(colors.preview);
    let highlight = normal.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let mut lines: Vec<Line> = matches
        .iter()
        .enumerate()
        .skip(offset)
        .take(shown)
        .map(|(i, candidate)| {
            let mut spans = vec![Span::raw(" ")];
            spans.extend(widgets::build_highlighted_text(
                candidate,
                minibuffer.text(),
                normal,
                highlight,
            ));
            let line = Line::from(spans);
            if i == minibuffer.selected {
                line.style(Style::default().bg(colors.selected_bg))
            } else {
                line
            }
        })
        .collect();
    if omitted > 0 {
        lines.push(Line::from(Span::styled(
            format!(" [{omitted} results omitted]"),
            Style::default().fg(colors.help).italic(),
        )));
    }

    let height = lines.len() as u16;
    let popup = Rect {
        x: prompt.x,
        y: prompt.y.saturating_sub(height),
        width: prompt.width,
        height: height.min(prompt.y),
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(colors.bar_bg)),
        popup,
    );
}

const HELP_TEXT: &[(&str, &str)] = &[
    ("a-z A-Z", "enter the subcommand with that key"),
    ("0-9", "set or clear a positional argument"),
    ("- = +", "arm a flag prefix; press again to disarm"),
    ("! ", "add an environment variable"),
    ("←/→", "move the cursor between tokens"),
    ("Bksp/Del", "delete the token before/at the cursor"),
    ("PgUp/PgDn", "page through the options"),
    ("[ ]", "cycle the color theme"),
    ("Enter", "accept and print the command"),
    ("Esc", "disarm the prefix or cancel a prompt"),
    ("Ctrl-C", "quit without a command"),
];

fn render_help(frame: &mut Frame, area: Rect, colors: &UiColors) {
    let width = area.width.min(64);
    let height = (HELP_TEXT.len() as u16 + 4).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let mut lines: Vec<Line> = HELP_TEXT
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:>10}"), widgets::key_style(colors)),
                Span::raw(format!("  {what}")),
            ])
        })
        .collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "press any key to return",
        Style::default().fg(colors.help).italic(),
    )));

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(colors.bg))
            .block(panel_block(" Keys ".to_string(), colors))
            .wrap(Wrap { trim: false }),
        popup,
    );
}
