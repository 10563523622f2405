//! The command under construction.
//!
//! A [`Composition`] holds environment assignments, the enabled command path
//! and the option values attached to each command on it. Everything the UI
//! addresses is a position in the flattened token sequence:
//!
//! ```text
//! FOO=bar  mycli  -C /tmp  build  -v  --jobs 4  |
//! env      cmd    value    cmd    value value   end
//! ```
//!
//! Tokens are derived from the state on demand, never cached.

use crate::error::CompositionError;
use crate::keys::KeyMap;
use crate::spec::{has_placeholder, NodeId, OptionId, OptionKind, OptionSpec, Quoting, SpecTree};

/// One value attached to a command on the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue {
    pub option: OptionId,
    pub value: String,
    /// Concrete spelling for template flags, e.g. `--set-user.name`.
    pub flag: Option<String>,
}

/// What a position in the flattened sequence refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Environment(usize),
    Command(usize),
    Value { depth: usize, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// An option declared by the command at `depth` on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionTarget {
    pub depth: usize,
    pub option: OptionId,
}

/// Result of pressing an option's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    Added,
    Removed,
    NeedsValue(OptionTarget),
}

/// A rendered token: `id` is its index in the flattened sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    environment: Vec<String>,
    path: Vec<NodeId>,
    /// Parallel to `path`.
    values: Vec<Vec<OptionValue>>,
    cursor: usize,
}

impl Composition {
    /// A fresh composition with only the root enabled and the cursor at the
    /// end.
    pub fn new(root: NodeId) -> Self {
        let mut composition = Self {
            environment: Vec::new(),
            path: vec![root],
            values: vec![Vec::new()],
            cursor: usize::MAX,
        };
        composition.clamp_cursor();
        composition
    }

    pub fn environment(&self) -> &[String] {
        &self.environment
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn values(&self, depth: usize) -> &[OptionValue] {
        self.values.get(depth).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn token_count(&self) -> usize {
        self.environment.len() + self.path.len() + self.values.iter().map(Vec::len).sum::<usize>()
    }

    /// The flattened sequence, without the virtual end position.
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.token_count());
        tokens.extend((0..self.environment.len()).map(Token::Environment));
        for (depth, values) in self.values.iter().enumerate() {
            tokens.push(Token::Command(depth));
            tokens.extend((0..values.len()).map(|index| Token::Value { depth, index }));
        }
        tokens
    }

    pub fn token_at(&self, position: usize) -> Option<Token> {
        self.tokens().get(position).copied()
    }

    pub fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.token_count());
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
        self.clamp_cursor();
    }

    fn move_cursor_to_end(&mut self) {
        self.cursor = self.token_count();
    }

    /// Append a `NAME=VALUE` assignment.
    pub fn insert_environment(&mut self, raw: &str) -> Result<(), CompositionError> {
        match raw.split_once('=') {
            Some((name, _)) if !name.is_empty() => {}
            _ => return Err(CompositionError::InvalidEnvironment),
        }
        let index = self.environment.len();
        self.environment.push(raw.to_string());
        self.cursor = self.cursor.max(index) + 1;
        self.clamp_cursor();
        Ok(())
    }

    /// Descend into the visible subcommand bound to `key`.
    pub fn enter_command(&mut self, keys: &KeyMap, key: char) -> Result<NodeId, CompositionError> {
        let node = keys
            .command(key)
            .ok_or_else(|| CompositionError::UndefinedKey(key.to_string()))?
            .node;
        self.path.push(node);
        self.values.push(Vec::new());
        self.move_cursor_to_end();
        Ok(node)
    }

    /// Press a flag's prefix and key.
    pub fn toggle_flag(
        &mut self,
        tree: &SpecTree,
        keys: &KeyMap,
        prefix: char,
        key: char,
    ) -> Result<OptionAction, CompositionError> {
        let flag = keys
            .flag(prefix, key)
            .ok_or_else(|| CompositionError::UndefinedKey(format!("{prefix}{key}")))?;
        Ok(self.toggle_option(
            tree,
            OptionTarget {
                depth: flag.depth,
                option: flag.option,
            },
        ))
    }

    /// Press an argument's digit key.
    pub fn toggle_argument(
        &mut self,
        tree: &SpecTree,
        keys: &KeyMap,
        key: char,
    ) -> Result<OptionAction, CompositionError> {
        let argument = keys
            .argument(key)
            .ok_or_else(|| CompositionError::UndefinedKey(key.to_string()))?;
        Ok(self.toggle_option(
            tree,
            OptionTarget {
                depth: argument.depth,
                option: argument.option,
            },
        ))
    }

    /// Repeatable options always ask for another value. Otherwise a set
    /// option is cleared, an unset toggle is added, and anything else asks.
    fn toggle_option(&mut self, tree: &SpecTree, target: OptionTarget) -> OptionAction {
        let spec = tree.option(target.option);
        if spec.repeatable {
            return OptionAction::NeedsValue(target);
        }
        if self.value_count(target) > 0 {
            self.remove_values(target);
            return OptionAction::Removed;
        }
        if spec.is_flag() && spec.kind == OptionKind::Toggle {
            self.append_value(target, String::new(), None);
            return OptionAction::Added;
        }
        OptionAction::NeedsValue(target)
    }

    pub fn value_count(&self, target: OptionTarget) -> usize {
        self.values(target.depth)
            .iter()
            .filter(|v| v.option == target.option)
            .count()
    }

    fn remove_values(&mut self, target: OptionTarget) {
        if let Some(values) = self.values.get_mut(target.depth) {
            values.retain(|v| v.option != target.option);
        }
        self.clamp_cursor();
    }

    /// Attach a value and move the cursor to the end.
    pub fn append_value(&mut self, target: OptionTarget, value: String, flag: Option<String>) {
        if let Some(values) = self.values.get_mut(target.depth) {
            values.push(OptionValue {
                option: target.option,
                value,
                flag,
            });
        }
        self.move_cursor_to_end();
    }

    /// Delete next to the cursor.
    pub fn delete(
        &mut self,
        tree: &SpecTree,
        direction: Direction,
    ) -> Result<Token, CompositionError> {
        self.delete_at(tree, self.cursor, direction)
    }

    /// Delete the token at `position` (forward) or `position - 1` (backward).
    /// Returns the token that was removed, as addressed before removal.
    pub fn delete_at(
        &mut self,
        tree: &SpecTree,
        position: usize,
        direction: Direction,
    ) -> Result<Token, CompositionError> {
        let index = match direction {
            Direction::Forward => position,
            Direction::Backward => position
                .checked_sub(1)
                .ok_or(CompositionError::NothingToDelete)?,
        };
        let token = self
            .token_at(index)
            .ok_or(CompositionError::NothingToDelete)?;

        match token {
            Token::Environment(i) => {
                self.environment.remove(i);
            }
            Token::Command(depth) => {
                self.check_command_removable(tree, depth)?;
                self.path.pop();
                self.values.pop();
            }
            Token::Value { depth, index } => {
                self.values[depth].remove(index);
            }
        }

        if index < self.cursor {
            self.cursor -= 1;
        }
        self.clamp_cursor();
        Ok(token)
    }

    /// Only the tail of the path can go, and only once it is empty. The root
    /// never goes.
    fn check_command_removable(
        &self,
        tree: &SpecTree,
        depth: usize,
    ) -> Result<(), CompositionError> {
        let name = || tree.node(self.path[depth]).name.clone();
        if depth + 1 != self.path.len() {
            return Err(CompositionError::SubcommandsPresent(name()));
        }
        if !self.values(depth).is_empty() {
            return Err(CompositionError::OptionsPresent(name()));
        }
        if depth == 0 {
            return Err(CompositionError::NothingToDelete);
        }
        Ok(())
    }

    /// `(region id, text)` for every token in flattened order.
    pub fn regions(&self, tree: &SpecTree) -> Vec<Region> {
        self.tokens()
            .into_iter()
            .enumerate()
            .map(|(id, token)| Region {
                id,
                text: self.token_text(tree, token),
            })
            .collect()
    }

    pub fn token_text(&self, tree: &SpecTree, token: Token) -> String {
        match token {
            Token::Environment(i) => self.environment[i].clone(),
            Token::Command(depth) => tree.node(self.path[depth]).name.clone(),
            Token::Value { depth, index } => {
                let value = &self.values[depth][index];
                render_value(tree.option(value.option), value)
            }
        }
    }

    /// The final command line: every token separated by one space.
    pub fn command_line(&self, tree: &SpecTree) -> String {
        self.regions(tree)
            .into_iter()
            .map(|r| r.text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render an option value the way it appears on the command line.
pub fn render_value(option: &OptionSpec, value: &OptionValue) -> String {
    let quoted = quote(&value.value, option.quote);
    let Some(main) = option.main_flag() else {
        return quoted;
    };
    let flag = value.flag.as_deref().unwrap_or(main);
    let bare = option.kind == OptionKind::Toggle
        || (option.kind == OptionKind::ValueOptional && value.value.is_empty());
    if bare {
        flag.to_string()
    } else {
        format!("{flag}{}{quoted}", option.separator)
    }
}

/// Wrap `value` in the configured quote character. An unquoted empty value is
/// shown as `""` so it stays visible as a token.
pub fn quote(value: &str, style: Quoting) -> String {
    match style {
        Quoting::None if value.is_empty() => "\"\"".to_string(),
        Quoting::None => value.to_string(),
        Quoting::Single => format!("'{value}'"),
        Quoting::Double => format!("\"{value}\""),
    }
}

/// A concrete spelling typed for a template flag must look like a flag.
pub fn is_valid_flag_spelling(text: &str) -> bool {
    text.starts_with(crate::spec::FLAG_LEADERS)
        && text.chars().count() >= 2
        && !text.chars().any(char::is_whitespace)
        && !has_placeholder(text)
}

/// Value entry in progress. Each confirmed prompt consumes the current stage
/// and yields the next one; cancelling at any stage simply drops it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingInput {
    #[default]
    Idle,
    Environment,
    FlagSpelling(OptionTarget),
    Value {
        target: OptionTarget,
        flag: Option<String>,
    },
}

impl PendingInput {
    /// The first stage of value entry for `target`. Template flags ask for
    /// their concrete spelling before the value.
    pub fn for_option(tree: &SpecTree, target: OptionTarget) -> Self {
        if tree.option(target.option).is_template() {
            PendingInput::FlagSpelling(target)
        } else {
            PendingInput::Value { target, flag: None }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PendingInput::Idle)
    }

    /// Apply confirmed `text` and return the next stage. The composition is
    /// only touched by the final stage.
    pub fn submit(
        self,
        text: &str,
        composition: &mut Composition,
    ) -> Result<PendingInput, CompositionError> {
        match self {
            PendingInput::Idle => Ok(PendingInput::Idle),
            PendingInput::Environment => {
                composition.insert_environment(text)?;
                Ok(PendingInput::Idle)
            }
            PendingInput::FlagSpelling(target) => {
                if !is_valid_flag_spelling(text) {
                    return Err(CompositionError::InvalidFlag(text.to_string()));
                }
                Ok(PendingInput::Value {
                    target,
                    flag: Some(text.to_string()),
                })
            }
            PendingInput::Value { target, flag } => {
                composition.append_value(target, text.to_string(), flag);
                Ok(PendingInput::Idle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::allocate;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> SpecTree {
        SpecTree::load(include_str!("../fixtures/sample.cmd.yaml")).unwrap()
    }

    fn texts(composition: &Composition, tree: &SpecTree) -> Vec<String> {
        composition.regions(tree).into_iter().map(|r| r.text).collect()
    }

    fn keys(tree: &SpecTree, composition: &Composition) -> KeyMap {
        allocate(tree, composition.path()).unwrap()
    }

    /// Environment entry, then `build`.
    fn foo_bar_build(tree: &SpecTree) -> Composition {
        let mut composition = Composition::new(tree.root());
        composition.insert_environment("FOO=bar").unwrap();
        let keys = keys(tree, &composition);
        composition.enter_command(&keys, 'b').unwrap();
        composition
    }

    #[test]
    fn test_new_composition_has_root_and_cursor_at_end() {
        let tree = sample_tree();
        let composition = Composition::new(tree.root());
        assert_eq!(texts(&composition, &tree), vec!["mycli"]);
        assert_eq!(composition.token_count(), 1);
        assert_eq!(composition.cursor(), 1);
    }

    #[test]
    fn test_insert_environment_entry() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        composition.insert_environment("FOO=bar").unwrap();
        assert_eq!(texts(&composition, &tree), vec!["FOO=bar", "mycli"]);
        assert_eq!(composition.cursor(), 2);
    }

    #[test]
    fn test_insert_environment_from_start_lands_after_new_entry() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        composition.insert_environment("A=1").unwrap();
        composition.insert_environment("B=2").unwrap();
        composition.move_cursor_left();
        composition.move_cursor_left();
        composition.move_cursor_left();
        assert_eq!(composition.cursor(), 0);
        composition.insert_environment("C=3").unwrap();
        assert_eq!(composition.cursor(), 3);
        assert_eq!(composition.environment(), &["A=1", "B=2", "C=3"]);
    }

    #[test]
    fn test_invalid_environment_entries_are_refused() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let before = composition.clone();
        for raw in ["FOO", "=bar", ""] {
            assert_eq!(
                composition.insert_environment(raw),
                Err(CompositionError::InvalidEnvironment)
            );
        }
        assert_eq!(composition, before);
        assert!(composition.insert_environment("EMPTY=").is_ok());
    }

    #[test]
    fn test_enter_command_moves_cursor_to_end() {
        let tree = sample_tree();
        let composition = foo_bar_build(&tree);
        assert_eq!(texts(&composition, &tree), vec!["FOO=bar", "mycli", "build"]);
        assert_eq!(composition.path().len(), 2);
        assert_eq!(tree.node(composition.path()[1]).name, "build");
        assert_eq!(composition.cursor(), 3);
    }

    #[test]
    fn test_enter_command_with_unknown_key() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let keys = keys(&tree, &composition);
        let before = composition.clone();
        assert_eq!(
            composition.enter_command(&keys, 'z'),
            Err(CompositionError::UndefinedKey("z".to_string()))
        );
        assert_eq!(composition, before);
    }

    #[test]
    fn test_toggle_flag_adds_then_removes() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        let count = composition.token_count();

        assert_eq!(
            composition.toggle_flag(&tree, &keys, '-', 'v'),
            Ok(OptionAction::Added)
        );
        assert_eq!(
            texts(&composition, &tree),
            vec!["FOO=bar", "mycli", "build", "-v"]
        );
        assert_eq!(composition.cursor(), 4);

        assert_eq!(
            composition.toggle_flag(&tree, &keys, '-', 'v'),
            Ok(OptionAction::Removed)
        );
        assert_eq!(composition.token_count(), count);
        assert_eq!(composition.cursor(), count);
    }

    #[test]
    fn test_toggle_flag_with_unknown_pair() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        assert_eq!(
            composition.toggle_flag(&tree, &keys, '+', 'v'),
            Err(CompositionError::UndefinedKey("+v".to_string()))
        );
    }

    #[test]
    fn test_value_flag_asks_for_value() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        let action = composition.toggle_flag(&tree, &keys, '-', 'j').unwrap();
        let OptionAction::NeedsValue(target) = action else {
            panic!("expected a value prompt, got {action:?}");
        };
        assert_eq!(target.depth, 1);
        assert_eq!(composition.token_count(), 3);

        let next = PendingInput::for_option(&tree, target)
            .submit("4", &mut composition)
            .unwrap();
        assert!(next.is_idle());
        assert_eq!(
            texts(&composition, &tree),
            vec!["FOO=bar", "mycli", "build", "-j 4"]
        );

        // Pressing it again clears it.
        assert_eq!(
            composition.toggle_flag(&tree, &keys, '-', 'j'),
            Ok(OptionAction::Removed)
        );
        assert_eq!(composition.token_count(), 3);
    }

    #[test]
    fn test_repeatable_flag_always_asks() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        for feature in ["serde", "tokio"] {
            let OptionAction::NeedsValue(target) =
                composition.toggle_flag(&tree, &keys, '-', 'F').unwrap()
            else {
                panic!("repeatable flags always prompt");
            };
            PendingInput::for_option(&tree, target)
                .submit(feature, &mut composition)
                .unwrap();
        }
        assert_eq!(
            texts(&composition, &tree)[3..].to_vec(),
            vec!["-F=\"serde\"", "-F=\"tokio\""]
        );
    }

    #[test]
    fn test_root_values_are_rendered_before_subcommand() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        let OptionAction::NeedsValue(target) =
            composition.toggle_flag(&tree, &keys, '-', 'C').unwrap()
        else {
            panic!("value flag prompts");
        };
        PendingInput::for_option(&tree, target)
            .submit("/tmp", &mut composition)
            .unwrap();
        assert_eq!(
            composition.command_line(&tree),
            "FOO=bar mycli -C /tmp build"
        );
        assert_eq!(composition.cursor(), composition.token_count());
    }

    #[test]
    fn test_argument_toggle_and_repeat() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let root_keys = keys(&tree, &composition);
        composition.enter_command(&root_keys, 'r').unwrap();
        let keys = keys(&tree, &composition);

        let OptionAction::NeedsValue(script) =
            composition.toggle_argument(&tree, &keys, '0').unwrap()
        else {
            panic!("argument prompts");
        };
        PendingInput::for_option(&tree, script)
            .submit("deploy", &mut composition)
            .unwrap();
        for extra in ["--fast", ""] {
            let OptionAction::NeedsValue(args) =
                composition.toggle_argument(&tree, &keys, '9').unwrap()
            else {
                panic!("repeatable argument prompts");
            };
            PendingInput::for_option(&tree, args)
                .submit(extra, &mut composition)
                .unwrap();
        }
        insta::assert_snapshot!(composition.command_line(&tree), @r#"mycli run deploy --fast """#);

        assert_eq!(
            composition.toggle_argument(&tree, &keys, '0'),
            Ok(OptionAction::Removed)
        );
        assert_eq!(composition.command_line(&tree), r#"mycli run --fast """#);
    }

    #[test]
    fn test_template_flag_takes_two_stages() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let root_keys = keys(&tree, &composition);
        composition.enter_command(&root_keys, 'c').unwrap();
        let keys = keys(&tree, &composition);

        let OptionAction::NeedsValue(target) =
            composition.toggle_flag(&tree, &keys, '-', 's').unwrap()
        else {
            panic!("template flag prompts");
        };
        let first = PendingInput::for_option(&tree, target);
        assert_eq!(first, PendingInput::FlagSpelling(target));

        let second = first.submit("--set-user.name", &mut composition).unwrap();
        assert_eq!(
            second,
            PendingInput::Value {
                target,
                flag: Some("--set-user.name".to_string())
            }
        );
        assert_eq!(composition.token_count(), 2, "nothing appended yet");

        second.submit("Ada", &mut composition).unwrap();
        assert_eq!(composition.command_line(&tree), "mycli config --set-user.name 'Ada'");
    }

    #[test]
    fn test_template_flag_rejects_non_flag_spelling() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let root_keys = keys(&tree, &composition);
        composition.enter_command(&root_keys, 'c').unwrap();
        let keys = keys(&tree, &composition);
        let OptionAction::NeedsValue(target) =
            composition.toggle_flag(&tree, &keys, '-', 's').unwrap()
        else {
            panic!("template flag prompts");
        };
        let before = composition.clone();
        for bad in ["user.name", "--set-<key>", "--set user", "-"] {
            let result = PendingInput::FlagSpelling(target).submit(bad, &mut composition);
            assert_eq!(result, Err(CompositionError::InvalidFlag(bad.to_string())));
        }
        assert_eq!(composition, before);
    }

    #[test]
    fn test_delete_root_refused() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        let before = composition.clone();
        assert_eq!(
            composition.delete(&tree, Direction::Backward),
            Err(CompositionError::NothingToDelete)
        );
        assert_eq!(
            composition.delete(&tree, Direction::Forward),
            Err(CompositionError::NothingToDelete)
        );
        assert_eq!(composition, before);
    }

    #[test]
    fn test_delete_command_with_enabled_subcommand_refused() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let before = composition.clone();
        let err = composition
            .delete_at(&tree, 1, Direction::Forward)
            .unwrap_err();
        assert_eq!(err, CompositionError::SubcommandsPresent("mycli".to_string()));
        assert!(err.to_string().contains("subcommands present"));
        assert_eq!(composition, before);
    }

    #[test]
    fn test_delete_command_with_options_refused() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        composition.toggle_flag(&tree, &keys, '-', 'v').unwrap();
        let err = composition
            .delete_at(&tree, 2, Direction::Forward)
            .unwrap_err();
        assert_eq!(err.to_string(), "unable to delete build command: options present");
    }

    #[test]
    fn test_backspace_pops_tail_command() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        assert_eq!(
            composition.delete(&tree, Direction::Backward),
            Ok(Token::Command(1))
        );
        assert_eq!(composition.path(), &[tree.root()]);
        assert_eq!(composition.token_count(), 2);
        assert_eq!(composition.cursor(), 2);
    }

    #[test]
    fn test_forward_delete_keeps_cursor_gap() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        composition.move_cursor_left();
        composition.move_cursor_left();
        composition.move_cursor_left();
        assert_eq!(composition.cursor(), 0);
        assert_eq!(
            composition.delete(&tree, Direction::Forward),
            Ok(Token::Environment(0))
        );
        assert_eq!(composition.cursor(), 0);
        assert_eq!(texts(&composition, &tree), vec!["mycli", "build"]);
    }

    #[test]
    fn test_delete_option_value_in_middle() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        composition.toggle_flag(&tree, &keys, '-', 'v').unwrap();
        composition.toggle_flag(&tree, &keys, '-', 'r').unwrap();
        assert_eq!(composition.cursor(), 5);
        composition.move_cursor_left();
        assert_eq!(
            composition.delete(&tree, Direction::Backward),
            Ok(Token::Value { depth: 1, index: 0 })
        );
        assert_eq!(composition.cursor(), 3);
        assert_eq!(
            texts(&composition, &tree),
            vec!["FOO=bar", "mycli", "build", "--release"]
        );
    }

    #[test]
    fn test_regions_match_tokens() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        composition.toggle_flag(&tree, &keys, '-', 'v').unwrap();
        let regions = composition.regions(&tree);
        assert_eq!(regions.len(), composition.token_count());
        let ids: Vec<usize> = regions.iter().map(|r| r.id).collect();
        assert_eq!(ids, (0..composition.token_count()).collect::<Vec<_>>());
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let tree = sample_tree();
        let mut composition = Composition::new(tree.root());
        // Small deterministic generator so the sequence is reproducible.
        let mut seed: u32 = 7;
        let mut next = move || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) % 8
        };

        for _ in 0..500 {
            let keys = keys(&tree, &composition);
            match next() {
                0 => {
                    let _ = composition.insert_environment("X=1");
                }
                1 => {
                    if let Some(c) = keys.commands.first() {
                        let _ = composition.enter_command(&keys, c.key);
                    }
                }
                2 => {
                    if let Some(f) = keys.flags.last() {
                        if let Ok(OptionAction::NeedsValue(target)) =
                            composition.toggle_flag(&tree, &keys, f.prefix, f.key)
                        {
                            composition.append_value(target, "v".to_string(), None);
                        }
                    }
                }
                3 => {
                    let _ = composition.delete(&tree, Direction::Backward);
                }
                4 => {
                    let _ = composition.delete(&tree, Direction::Forward);
                }
                5 => composition.move_cursor_left(),
                _ => composition.move_cursor_right(),
            }
            assert!(composition.cursor() <= composition.token_count());
            assert_eq!(composition.regions(&tree).len(), composition.token_count());
        }
    }

    #[test]
    fn test_quote_styles() {
        assert_eq!(quote("a b", Quoting::None), "a b");
        assert_eq!(quote("", Quoting::None), "\"\"");
        assert_eq!(quote("x", Quoting::Single), "'x'");
        assert_eq!(quote("", Quoting::Single), "''");
        assert_eq!(quote("x", Quoting::Double), "\"x\"");
    }

    #[test]
    fn test_optional_value_flag_renders_bare_when_empty() {
        let tree = sample_tree();
        let mut composition = foo_bar_build(&tree);
        let keys = keys(&tree, &composition);
        let OptionAction::NeedsValue(target) =
            composition.toggle_flag(&tree, &keys, '-', 'm').unwrap()
        else {
            panic!("optional value flags prompt");
        };
        composition.append_value(target, String::new(), None);
        assert_eq!(texts(&composition, &tree)[3], "--message-format");

        composition.toggle_flag(&tree, &keys, '-', 'm').unwrap();
        composition.append_value(target, "json".to_string(), None);
        assert_eq!(texts(&composition, &tree)[3], "--message-format json");
    }
}
