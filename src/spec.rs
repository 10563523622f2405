//! Specification documents and the immutable command tree built from them.
//!
//! A spec is a YAML document describing one root command, its options and its
//! nested subcommands. Parsing converts the recursive document into an arena
//! ([`SpecTree`]) so the rest of the crate can refer to commands and options by
//! [`NodeId`] and [`OptionId`] instead of holding references into the tree.

use std::path::Path;

use serde::Deserialize;

use crate::error::SpecError;

/// The only document version this crate understands.
pub const SPEC_VERSION: &str = "1.0.0";

/// Characters a flag spelling may start with.
pub const FLAG_LEADERS: [char; 2] = ['-', '+'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub usize);

/// Whether an option takes no value, a required value, or an optional one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionKind {
    #[default]
    Value,
    ValueOptional,
    Toggle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    #[default]
    None,
    Single,
    Double,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub values: Vec<String>,
    /// External command whose stdout lines are offered as candidates.
    #[serde(default)]
    pub command: Vec<String>,
}

/// What an option is: a flag with one or more spellings, or a positional
/// argument with a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionIdentity {
    Flag(Vec<String>),
    Argument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub identity: OptionIdentity,
    pub kind: OptionKind,
    pub repeatable: bool,
    pub separator: String,
    pub quote: Quoting,
    pub default: Option<String>,
    pub placeholder: Option<String>,
    pub completion: Completion,
    pub metavar: Option<String>,
    pub help: String,
}

impl OptionSpec {
    pub fn is_flag(&self) -> bool {
        matches!(self.identity, OptionIdentity::Flag(_))
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.identity, OptionIdentity::Argument(_))
    }

    /// All spellings of a flag; empty for arguments.
    pub fn spellings(&self) -> &[String] {
        match &self.identity {
            OptionIdentity::Flag(spellings) => spellings,
            OptionIdentity::Argument(_) => &[],
        }
    }

    /// The first declared spelling, used when rendering a value.
    pub fn main_flag(&self) -> Option<&str> {
        self.spellings().first().map(String::as_str)
    }

    /// The longest spelling, alphabetically first among equally long ones.
    pub fn canonical_flag(&self) -> Option<&str> {
        self.spellings()
            .iter()
            .map(String::as_str)
            .min_by(|a, b| {
                b.chars()
                    .count()
                    .cmp(&a.chars().count())
                    .then_with(|| a.cmp(b))
            })
    }

    /// A template flag has a user-supplied segment in its canonical
    /// spelling, e.g. `--validate-<check>`.
    pub fn is_template(&self) -> bool {
        self.canonical_flag().is_some_and(has_placeholder)
    }

    /// Name shown for the option in messages and prompts.
    pub fn display_name(&self) -> String {
        match &self.identity {
            OptionIdentity::Flag(spellings) => spellings.join(", "),
            OptionIdentity::Argument(name) => name.clone(),
        }
    }

    pub fn metavar(&self) -> &str {
        self.metavar.as_deref().unwrap_or("value")
    }
}

/// True if `text` contains `<`, followed by at least one character, followed
/// by `>`.
pub fn has_placeholder(text: &str) -> bool {
    text.find('<')
        .map(|start| text[start + 1..].chars().skip(1).any(|c| c == '>'))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    pub name: String,
    pub help: String,
    pub options: Vec<OptionId>,
    pub children: Vec<NodeId>,
}

/// Arena holding every command and option of one spec. The root is always
/// `NodeId(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTree {
    nodes: Vec<CommandNode>,
    options: Vec<OptionSpec>,
}

impl SpecTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub fn option(&self, id: OptionId) -> &OptionSpec {
        &self.options[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Parse a document and build the tree, running the shape checks but not
    /// the key allocation check.
    pub fn parse(input: &str) -> Result<Self, SpecError> {
        let document: SpecDocument = serde_yaml::from_str(input)?;
        if document.spec_version != SPEC_VERSION {
            return Err(SpecError::UnsupportedVersion {
                found: document.spec_version,
                expected: SPEC_VERSION,
            });
        }

        let mut tree = SpecTree {
            nodes: Vec::new(),
            options: Vec::new(),
        };
        tree.insert_command(document.command, "")?;
        Ok(tree)
    }

    /// Parse a document and verify that keys can be allocated for every
    /// reachable path. This is what the binary uses.
    pub fn load(input: &str) -> Result<Self, SpecError> {
        let tree = Self::parse(input)?;
        crate::keys::check_all_paths(&tree)?;
        log::debug!(
            "loaded spec `{}` with {} commands",
            tree.node(tree.root()).name,
            tree.node_count()
        );
        Ok(tree)
    }

    pub fn load_file(path: &Path) -> Result<Self, SpecError> {
        let input = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load(&input)
    }

    fn insert_command(&mut self, doc: CommandDocument, parent: &str) -> Result<NodeId, SpecError> {
        let path = if parent.is_empty() {
            doc.name.clone()
        } else {
            format!("{parent} {}", doc.name)
        };
        if doc.name.trim().is_empty() {
            return Err(SpecError::EmptyCommandName {
                path: if parent.is_empty() {
                    "<root>".to_string()
                } else {
                    parent.to_string()
                },
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(CommandNode {
            name: doc.name,
            help: doc.help,
            options: Vec::new(),
            children: Vec::new(),
        });

        for (index, option) in doc.options.into_iter().enumerate() {
            let option = option.into_spec(&path, index)?;
            let option_id = OptionId(self.options.len());
            self.options.push(option);
            self.nodes[id.0].options.push(option_id);
        }

        for child in doc.subcommands {
            let child_id = self.insert_command(child, &path)?;
            self.nodes[id.0].children.push(child_id);
        }

        Ok(id)
    }
}

// --- Document structures ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecDocument {
    spec_version: String,
    command: CommandDocument,
}

#[derive(Debug, Deserialize)]
struct CommandDocument {
    name: String,
    #[serde(default)]
    help: String,
    #[serde(default)]
    subcommands: Vec<CommandDocument>,
    #[serde(default)]
    options: Vec<OptionDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Spellings {
    One(String),
    Many(Vec<String>),
}

impl Spellings {
    fn into_vec(self) -> Vec<String> {
        match self {
            Spellings::One(s) => vec![s],
            Spellings::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OptionDocument {
    flag: Option<Spellings>,
    argument: Option<String>,
    #[serde(rename = "type", default)]
    kind: OptionKind,
    #[serde(default)]
    repeatable: bool,
    separator: Option<String>,
    #[serde(default)]
    quote: Quoting,
    default: Option<String>,
    placeholder: Option<String>,
    #[serde(default)]
    completion: Completion,
    metavar: Option<String>,
    #[serde(default)]
    help: String,
}

impl OptionDocument {
    fn into_spec(self, command: &str, index: usize) -> Result<OptionSpec, SpecError> {
        let spellings = self.flag.map(Spellings::into_vec).unwrap_or_default();
        let argument = self.argument.filter(|a| !a.is_empty());

        let identity = match (spellings.is_empty(), argument) {
            (false, None) => {
                if let Some(bad) = spellings
                    .iter()
                    .find(|s| !s.starts_with(FLAG_LEADERS) || s.chars().count() < 2)
                {
                    return Err(SpecError::InvalidFlagSpelling {
                        command: command.to_string(),
                        spelling: bad.clone(),
                    });
                }
                OptionIdentity::Flag(spellings)
            }
            (true, Some(name)) => OptionIdentity::Argument(name),
            _ => {
                return Err(SpecError::AmbiguousOption {
                    command: command.to_string(),
                    index,
                })
            }
        };

        Ok(OptionSpec {
            identity,
            kind: self.kind,
            repeatable: self.repeatable,
            separator: self
                .separator
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| " ".to_string()),
            quote: self.quote,
            default: self.default,
            placeholder: self.placeholder,
            completion: self.completion,
            metavar: self.metavar,
            help: self.help,
        })
    }
}
