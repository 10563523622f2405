use std::cell::Cell;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui_interact::components::InputState;
use ratatui_themes::{ThemeName, ThemePalette};

use crate::completion;
use crate::compose::{Composition, Direction, OptionAction, OptionTarget, PendingInput};
use crate::error::{AllocationError, CompositionError};
use crate::keys::{self, KeyMap};
use crate::spec::SpecTree;

pub const ENVVAR_KEY: char = '!';
pub const HELP_KEY: char = '?';

/// Actions that the event loop should take after handling a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Accept,
}

/// Which kind of input is currently accepted. Only one mode is active at a
/// time; the non-compose modes suspend mnemonic handling until they finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Compose,
    Prompt,
    Help,
}

/// Single-line prompt shown in place of the message bar.
pub struct Minibuffer {
    pub label: String,
    pub input: InputState,
    pub placeholder: String,
    pub candidates: Vec<String>,
    /// Index into the filtered candidates.
    pub selected: usize,
}

impl Minibuffer {
    fn new(label: &str, text: String, placeholder: String, candidates: Vec<String>) -> Self {
        let mut input = InputState::empty();
        input.set_text(text);
        input.move_end();
        Self {
            label: label.to_string(),
            input,
            placeholder,
            candidates,
            selected: 0,
        }
    }

    pub fn text(&self) -> &str {
        self.input.text()
    }

    /// Text before and after the edit cursor.
    pub fn split_at_cursor(&self) -> (String, String) {
        let text = self.input.text();
        let at = self.input.cursor_pos.min(text.chars().count());
        (text.chars().take(at).collect(), text.chars().skip(at).collect())
    }

    /// Candidates matching what has been typed so far.
    pub fn matches(&self) -> Vec<String> {
        completion::filter(&self.candidates, self.input.text())
    }
}

/// Session state. Owns the spec and the composition; the key map is
/// recomputed from them after every event.
pub struct App {
    pub tree: SpecTree,
    pub composition: Composition,
    pub keys: KeyMap,

    /// Value entry in progress, and the prompt collecting it.
    pub pending: PendingInput,
    pub minibuffer: Option<Minibuffer>,

    /// Armed flag prefix, if any.
    pub prefix: Option<char>,

    /// One-line feedback for the last event.
    pub message: String,

    pub help_visible: bool,

    /// Current page of the option catalog.
    pub options_page: usize,

    /// Page count of the catalog as last laid out. The layout depends on the
    /// panel height, so it is recorded while rendering.
    pub options_page_count: Cell<usize>,

    pub theme_name: ThemeName,

    environment_names: Vec<String>,
}

impl App {
    pub fn new(tree: SpecTree) -> Result<Self, AllocationError> {
        Self::with_environment(tree, completion::process_environment_names())
    }

    /// Build an app with a fixed list of environment variable names for the
    /// environment prompt's completions.
    pub fn with_environment(
        tree: SpecTree,
        environment_names: Vec<String>,
    ) -> Result<Self, AllocationError> {
        let composition = Composition::new(tree.root());
        let keys = keys::allocate(&tree, composition.path())?;
        Ok(Self {
            tree,
            composition,
            keys,
            pending: PendingInput::Idle,
            minibuffer: None,
            prefix: None,
            message: String::new(),
            help_visible: false,
            options_page: 0,
            options_page_count: Cell::new(1),
            theme_name: ThemeName::default(),
            environment_names,
        })
    }

    pub fn mode(&self) -> AppMode {
        if self.help_visible {
            AppMode::Help
        } else if self.minibuffer.is_some() {
            AppMode::Prompt
        } else {
            AppMode::Compose
        }
    }

    /// Get the current theme palette.
    pub fn palette(&self) -> ThemePalette {
        self.theme_name.palette()
    }

    pub fn next_theme(&mut self) {
        self.theme_name = self.theme_name.next();
    }

    pub fn prev_theme(&mut self) {
        self.theme_name = self.theme_name.prev();
    }

    /// The command line as it stands.
    pub fn build_command(&self) -> String {
        self.composition.command_line(&self.tree)
    }

    /// Handle one key event to completion. A key map that can no longer be
    /// allocated ends the session.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<Action, AllocationError> {
        let action = match self.mode() {
            AppMode::Help => {
                self.help_visible = false;
                Action::None
            }
            AppMode::Prompt => {
                self.handle_prompt_key(key);
                Action::None
            }
            AppMode::Compose => self.handle_compose_key(key),
        };
        self.refresh()?;
        Ok(action)
    }

    fn refresh(&mut self) -> Result<(), AllocationError> {
        self.composition.clamp_cursor();
        let last_page = self.options_page_count.get().saturating_sub(1);
        self.options_page = self.options_page.min(last_page);
        self.keys = keys::allocate(&self.tree, self.composition.path())?;
        Ok(())
    }

    fn report(&mut self, error: CompositionError) {
        log::debug!("refused: {error}");
        self.message = error.to_string();
    }

    fn handle_compose_key(&mut self, key: KeyEvent) -> Action {
        self.message.clear();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => Action::Quit,
            KeyCode::Char('x') if ctrl => Action::Accept,
            KeyCode::Char('g') if ctrl => {
                self.prefix = None;
                Action::None
            }
            KeyCode::Esc => {
                self.prefix = None;
                Action::None
            }
            KeyCode::Enter => Action::Accept,
            KeyCode::Backspace => {
                self.handle_deletion(Direction::Backward);
                Action::None
            }
            KeyCode::Delete => {
                self.handle_deletion(Direction::Forward);
                Action::None
            }
            KeyCode::Left => {
                self.composition.move_cursor_left();
                Action::None
            }
            KeyCode::Right => {
                self.composition.move_cursor_right();
                Action::None
            }
            KeyCode::PageDown => {
                if self.options_page + 1 < self.options_page_count.get() {
                    self.options_page += 1;
                }
                Action::None
            }
            KeyCode::PageUp => {
                self.options_page = self.options_page.saturating_sub(1);
                Action::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.handle_printable(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_printable(&mut self, c: char) {
        if keys::is_prefix(c) {
            self.handle_prefix_key(c);
        } else if c == ENVVAR_KEY {
            self.handle_environment_key();
        } else if c == HELP_KEY {
            // Help is reachable even with a prefix armed.
            self.prefix = None;
            self.help_visible = true;
        } else if c.is_ascii_alphanumeric() {
            self.handle_mnemonic(c);
        } else if c == ']' {
            self.next_theme();
        } else if c == '[' {
            self.prev_theme();
        } else {
            let undefined = match self.prefix.take() {
                Some(prefix) => format!("{prefix}{c}"),
                None => c.to_string(),
            };
            self.report(CompositionError::UndefinedKey(undefined));
        }
    }

    /// Arm a prefix, or disarm it when pressed twice.
    fn handle_prefix_key(&mut self, c: char) {
        if self.prefix == Some(c) {
            self.prefix = None;
        } else if self.keys.has_prefix(c) {
            self.prefix = Some(c);
            self.message = c.to_string();
        } else {
            self.prefix = None;
            self.report(CompositionError::UndefinedKey(c.to_string()));
        }
    }

    fn handle_environment_key(&mut self) {
        if let Some(prefix) = self.prefix.take() {
            self.report(CompositionError::UndefinedKey(format!("{prefix}{ENVVAR_KEY}")));
            return;
        }
        self.pending = PendingInput::Environment;
        self.open_prompt();
    }

    fn handle_mnemonic(&mut self, c: char) {
        match self.prefix.take() {
            Some(prefix) => {
                let result = self
                    .composition
                    .toggle_flag(&self.tree, &self.keys, prefix, c);
                self.after_option_key(result);
            }
            None if c.is_ascii_digit() => {
                let result = self.composition.toggle_argument(&self.tree, &self.keys, c);
                self.after_option_key(result);
            }
            None => match self.composition.enter_command(&self.keys, c) {
                Ok(node) => {
                    log::debug!("entered `{}`", self.tree.node(node).name);
                    self.options_page = 0;
                }
                Err(e) => self.report(e),
            },
        }
    }

    fn after_option_key(&mut self, result: Result<OptionAction, CompositionError>) {
        match result {
            Ok(OptionAction::NeedsValue(target)) => self.begin_value_entry(target),
            Ok(OptionAction::Added | OptionAction::Removed) => {}
            Err(e) => self.report(e),
        }
    }

    fn begin_value_entry(&mut self, target: OptionTarget) {
        self.pending = PendingInput::for_option(&self.tree, target);
        self.open_prompt();
    }

    fn handle_deletion(&mut self, direction: Direction) {
        self.prefix = None;
        if let Err(e) = self.composition.delete(&self.tree, direction) {
            self.report(e);
        }
    }

    /// Show the prompt for the current pending stage.
    fn open_prompt(&mut self) {
        self.minibuffer = match &self.pending {
            PendingInput::Idle => None,
            PendingInput::Environment => Some(Minibuffer::new(
                "value:",
                String::new(),
                "VAR=VAL".to_string(),
                completion::environment_candidates(self.environment_names.iter().cloned()),
            )),
            PendingInput::FlagSpelling(target) => {
                let option = self.tree.option(target.option);
                Some(Minibuffer::new(
                    "flag:",
                    option.canonical_flag().unwrap_or_default().to_string(),
                    String::new(),
                    Vec::new(),
                ))
            }
            PendingInput::Value { target, .. } => {
                let option = self.tree.option(target.option);
                Some(Minibuffer::new(
                    "value:",
                    option.default.clone().unwrap_or_default(),
                    option.placeholder.clone().unwrap_or_default(),
                    completion::option_candidates(option),
                ))
            }
        };
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let Some(minibuffer) = self.minibuffer.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.cancel_prompt(),
            KeyCode::Char('g') if ctrl => self.cancel_prompt(),
            KeyCode::Enter => self.confirm_prompt(),
            KeyCode::Tab => {
                if let Some(candidate) = minibuffer.matches().get(minibuffer.selected) {
                    minibuffer.input.set_text(candidate.clone());
                    minibuffer.input.move_end();
                    minibuffer.selected = 0;
                }
            }
            KeyCode::Up => {
                minibuffer.selected = minibuffer.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let count = minibuffer.matches().len();
                if minibuffer.selected + 1 < count {
                    minibuffer.selected += 1;
                }
            }
            KeyCode::Backspace => {
                minibuffer.input.delete_char_backward();
                minibuffer.selected = 0;
            }
            KeyCode::Delete => {
                minibuffer.input.delete_char_forward();
                minibuffer.selected = 0;
            }
            KeyCode::Left => minibuffer.input.move_left(),
            KeyCode::Right => minibuffer.input.move_right(),
            KeyCode::Home => minibuffer.input.move_home(),
            KeyCode::End => minibuffer.input.move_end(),
            KeyCode::Char(c) if !ctrl => {
                minibuffer.input.insert_char(c);
                minibuffer.selected = 0;
            }
            _ => {}
        }
    }

    /// Drop the prompt and whatever stage it was collecting.
    fn cancel_prompt(&mut self) {
        self.minibuffer = None;
        self.pending = PendingInput::Idle;
    }

    fn confirm_prompt(&mut self) {
        let Some(minibuffer) = self.minibuffer.take() else {
            return;
        };
        let stage = std::mem::take(&mut self.pending);
        match stage.submit(minibuffer.text(), &mut self.composition) {
            Ok(next) => {
                self.pending = next;
                self.open_prompt();
            }
            Err(e) => self.report(e),
        }
    }
}
