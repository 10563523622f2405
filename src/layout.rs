//! Styled text laid out over fixed-height pages.
//!
//! [`PagedText`] is written to like a terminal: text, newlines, and style
//! switches. Instead of growing past the panel it breaks onto a new page, so a
//! long option catalog is browsed page by page rather than scrolled. Layout is
//! a pure function of the content and the page height; a resize means building
//! the text again.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub type Page = Vec<Line<'static>>;

#[derive(Debug, Clone)]
pub struct PagedText {
    height: usize,
    pages: Vec<Page>,
    current: Vec<Span<'static>>,
    /// Lines used on the last page, counting the open one.
    lines_in_page: usize,
    modifiers: Modifier,
    color: Option<Color>,
}

impl PagedText {
    pub fn new(height: usize) -> Self {
        Self {
            height: height.max(1),
            pages: vec![Vec::new()],
            current: Vec::new(),
            lines_in_page: 1,
            modifiers: Modifier::empty(),
            color: None,
        }
    }

    /// The style new text is written with.
    ///
    /// Every span carries the complete active style, with inactive modifiers
    /// explicitly removed, so the first span of a new page re-asserts whatever
    /// was active when the previous page ended.
    pub fn style(&self) -> Style {
        Style::default()
            .fg(self.color.unwrap_or(Color::Reset))
            .add_modifier(self.modifiers)
            .remove_modifier(Modifier::all() - self.modifiers)
    }

    pub fn write(&mut self, text: &str) -> &mut Self {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            if !part.is_empty() {
                self.current.push(Span::styled(part.to_string(), self.style()));
            }
        }
        self
    }

    /// End the open line. If the next line would not fit, it opens a new
    /// page instead.
    pub fn newline(&mut self) -> &mut Self {
        let line = Line::from(std::mem::take(&mut self.current));
        self.last_page().push(line);
        if self.lines_in_page + 1 > self.height {
            self.pages.push(Vec::new());
            self.lines_in_page = 1;
        } else {
            self.lines_in_page += 1;
        }
        self
    }

    fn last_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn add_modifier(&mut self, modifier: Modifier) -> &mut Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn remove_modifier(&mut self, modifier: Modifier) -> &mut Self {
        self.modifiers.remove(modifier);
        self
    }

    pub fn bold(&mut self) -> &mut Self {
        self.add_modifier(Modifier::BOLD)
    }

    pub fn unbold(&mut self) -> &mut Self {
        self.remove_modifier(Modifier::BOLD)
    }

    pub fn dim(&mut self) -> &mut Self {
        self.add_modifier(Modifier::DIM)
    }

    pub fn undim(&mut self) -> &mut Self {
        self.remove_modifier(Modifier::DIM)
    }

    pub fn italic(&mut self) -> &mut Self {
        self.add_modifier(Modifier::ITALIC)
    }

    pub fn unitalic(&mut self) -> &mut Self {
        self.remove_modifier(Modifier::ITALIC)
    }

    pub fn fg(&mut self, color: Color) -> &mut Self {
        self.color = Some(color);
        self
    }

    pub fn reset_fg(&mut self) -> &mut Self {
        self.color = None;
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.modifiers = Modifier::empty();
        self.color = None;
        self
    }

    /// Close the open line and return the pages. A trailing page with nothing
    /// on it is dropped; there is always at least one page.
    pub fn into_pages(mut self) -> Vec<Page> {
        if !self.current.is_empty() {
            let line = Line::from(std::mem::take(&mut self.current));
            self.last_page().push(line);
        }
        while self.pages.len() > 1 && self.pages.last().is_some_and(Vec::is_empty) {
            self.pages.pop();
        }
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(pages: &[Page]) -> Vec<Vec<String>> {
        pages
            .iter()
            .map(|page| page.iter().map(|line| line.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_fits_on_one_page() {
        let mut text = PagedText::new(5);
        text.write("one\ntwo\nthree");
        assert_eq!(plain(&text.into_pages()), vec![vec!["one", "two", "three"]]);
    }

    #[test]
    fn test_breaks_onto_new_pages() {
        let mut text = PagedText::new(2);
        text.write("a\nb\nc\nd\ne\n");
        assert_eq!(
            plain(&text.into_pages()),
            vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]
        );
    }

    #[test]
    fn test_exact_fit_has_no_empty_trailing_page() {
        let mut text = PagedText::new(2);
        text.write("a\nb\n");
        assert_eq!(plain(&text.into_pages()), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_blank_lines_count_toward_height() {
        let mut text = PagedText::new(3);
        text.write("cmd:\n x\n\nsub:\n y\n");
        assert_eq!(
            plain(&text.into_pages()),
            vec![vec!["cmd:", " x", ""], vec!["sub:", " y"]]
        );
    }

    #[test]
    fn test_zero_height_is_treated_as_one_line() {
        let mut text = PagedText::new(0);
        text.write("a\nb");
        assert_eq!(plain(&text.into_pages()), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_empty_text_has_one_empty_page() {
        let text = PagedText::new(4);
        let pages = text.into_pages();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_toggling_one_modifier_keeps_others() {
        let mut text = PagedText::new(4);
        text.bold().write("a").dim().write("b").unbold().write("c").undim().write("d");
        let pages = text.into_pages();
        let styles: Vec<Style> = pages[0][0].spans.iter().map(|s| s.style).collect();

        assert!(styles[0].add_modifier.contains(Modifier::BOLD));
        assert!(!styles[0].add_modifier.contains(Modifier::DIM));
        assert!(styles[1].add_modifier.contains(Modifier::BOLD | Modifier::DIM));
        assert!(styles[2].add_modifier.contains(Modifier::DIM));
        assert!(!styles[2].add_modifier.contains(Modifier::BOLD));
        assert!(styles[3].add_modifier.is_empty());
        assert!(styles[3].sub_modifier.contains(Modifier::DIM));
    }

    #[test]
    fn test_styles_are_reasserted_on_new_page() {
        let mut text = PagedText::new(1);
        text.dim().fg(Color::Magenta).write("first\nsecond");
        let pages = text.into_pages();
        assert_eq!(pages.len(), 2);
        let opening = pages[1][0].spans[0].style;
        assert!(opening.add_modifier.contains(Modifier::DIM));
        assert_eq!(opening.fg, Some(Color::Magenta));
    }

    #[test]
    fn test_relayout_depends_only_on_height() {
        let build = |height| {
            let mut text = PagedText::new(height);
            for i in 0..7 {
                text.write(&format!("line {i}\n"));
            }
            text.into_pages()
        };
        assert_eq!(build(3).len(), 3);
        assert_eq!(build(7).len(), 1);
        assert_eq!(plain(&build(3)), plain(&build(3)));
    }
}
