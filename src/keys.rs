//! Mnemonic key allocation.
//!
//! Keys are a pure function of the visible part of the tree: the active path
//! and the children of its tail. [`allocate`] is called from scratch after
//! every change, so there is no stale assignment to patch up.

use std::collections::HashSet;

use crate::error::AllocationError;
use crate::spec::{NodeId, OptionId, SpecTree};

pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0987654321";

pub const PREFIX_DASH: char = '-';
pub const PREFIX_EQUALS: char = '=';
pub const PREFIX_PLUS: char = '+';

pub fn is_prefix(c: char) -> bool {
    matches!(c, PREFIX_DASH | PREFIX_EQUALS | PREFIX_PLUS)
}

/// Key for a subcommand of the path's tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandKey {
    pub node: NodeId,
    pub key: char,
}

/// Prefix and key for a flag. `depth` is the position on the path of the
/// command declaring the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagKey {
    pub depth: usize,
    pub option: OptionId,
    pub prefix: char,
    pub key: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentKey {
    pub depth: usize,
    pub option: OptionId,
    pub key: char,
}

/// Every key assigned for one visible set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    pub commands: Vec<CommandKey>,
    pub flags: Vec<FlagKey>,
    pub arguments: Vec<ArgumentKey>,
}

impl KeyMap {
    pub fn command(&self, key: char) -> Option<&CommandKey> {
        self.commands.iter().find(|c| c.key == key)
    }

    pub fn flag(&self, prefix: char, key: char) -> Option<&FlagKey> {
        self.flags
            .iter()
            .find(|f| f.prefix == prefix && f.key == key)
    }

    pub fn argument(&self, key: char) -> Option<&ArgumentKey> {
        self.arguments.iter().find(|a| a.key == key)
    }

    /// Whether any visible flag is reached through `prefix`.
    pub fn has_prefix(&self, prefix: char) -> bool {
        self.flags.iter().any(|f| f.prefix == prefix)
    }

    pub fn flag_key(&self, option: OptionId) -> Option<(char, char)> {
        self.flags
            .iter()
            .find(|f| f.option == option)
            .map(|f| (f.prefix, f.key))
    }

    pub fn argument_key(&self, option: OptionId) -> Option<char> {
        self.arguments
            .iter()
            .find(|a| a.option == option)
            .map(|a| a.key)
    }
}

/// Assign keys for `path` (root first) and the children of its last node.
pub fn allocate(tree: &SpecTree, path: &[NodeId]) -> Result<KeyMap, AllocationError> {
    let children = path
        .last()
        .map(|tail| tree.node(*tail).children.as_slice())
        .unwrap_or_default();

    Ok(KeyMap {
        commands: allocate_commands(tree, children)?,
        flags: allocate_flags(tree, path)?,
        arguments: allocate_arguments(tree, path)?,
    })
}

/// Run the allocator for every path a session can reach, so exhaustion is
/// reported at load time rather than in the middle of a session.
pub fn check_all_paths(tree: &SpecTree) -> Result<(), AllocationError> {
    let mut pending = vec![vec![tree.root()]];
    while let Some(path) = pending.pop() {
        allocate(tree, &path)?;
        if let Some(tail) = path.last() {
            for child in &tree.node(*tail).children {
                let mut next = path.clone();
                next.push(*child);
                pending.push(next);
            }
        }
    }
    Ok(())
}

fn allocate_commands(
    tree: &SpecTree,
    children: &[NodeId],
) -> Result<Vec<CommandKey>, AllocationError> {
    let mut used = HashSet::new();
    let mut keys = Vec::with_capacity(children.len());

    for &node in children {
        let name = &tree.node(node).name;
        let key = name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .chain(LETTERS.chars())
            .find(|c| used.insert(*c))
            .ok_or_else(|| AllocationError::Command(name.clone()))?;
        keys.push(CommandKey { node, key });
    }

    Ok(keys)
}

fn allocate_arguments(
    tree: &SpecTree,
    path: &[NodeId],
) -> Result<Vec<ArgumentKey>, AllocationError> {
    let mut pool = DIGITS.chars();
    let mut keys = Vec::new();

    for (depth, node) in path.iter().enumerate() {
        for &option in &tree.node(*node).options {
            let spec = tree.option(option);
            if !spec.is_argument() {
                continue;
            }
            let key = pool
                .next()
                .ok_or_else(|| AllocationError::Argument(spec.display_name()))?;
            keys.push(ArgumentKey { depth, option, key });
        }
    }

    Ok(keys)
}

fn allocate_flags(tree: &SpecTree, path: &[NodeId]) -> Result<Vec<FlagKey>, AllocationError> {
    let mut used: HashSet<(char, char)> = HashSet::new();
    let mut keys = Vec::new();

    for (depth, node) in path.iter().enumerate() {
        for &option in &tree.node(*node).options {
            let spec = tree.option(option);
            let (Some(main), Some(canonical)) = (spec.main_flag(), spec.canonical_flag()) else {
                continue;
            };
            let natural = main.chars().next().unwrap_or(PREFIX_DASH);

            let own = main
                .chars()
                .chain(canonical.chars())
                .filter(|c| c.is_ascii_alphanumeric());
            let (prefix, key) = own
                .chain(LETTERS.chars().chain(DIGITS.chars()))
                .find_map(|c| claim_flag_pair(&mut used, natural, c))
                .ok_or_else(|| AllocationError::Flag(spec.display_name()))?;

            keys.push(FlagKey {
                depth,
                option,
                prefix,
                key,
            });
        }
    }

    log::trace!("allocated {} flag keys over {} commands", keys.len(), path.len());
    Ok(keys)
}

/// Take `(prefix, key)` if free; dash flags fall back to the equals prefix.
fn claim_flag_pair(
    used: &mut HashSet<(char, char)>,
    prefix: char,
    key: char,
) -> Option<(char, char)> {
    let fallback = (prefix == PREFIX_DASH).then_some((PREFIX_EQUALS, key));
    std::iter::once((prefix, key))
        .chain(fallback)
        .find(|pair| used.insert(*pair))
}
