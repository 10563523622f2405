use thiserror::Error;

/// Defects in a specification document. These are fatal: they are reported
/// before the interactive session starts.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("unable to read spec file `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to parse spec: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported spec version `{found}` (expected `{expected}`)")]
    UnsupportedVersion { found: String, expected: &'static str },

    #[error("command at `{path}` has an empty name")]
    EmptyCommandName { path: String },

    #[error("option #{index} of `{command}` must declare exactly one of `flag` or `argument`")]
    AmbiguousOption { command: String, index: usize },

    #[error("flag `{spelling}` of `{command}` must start with `-` or `+`")]
    InvalidFlagSpelling { command: String, spelling: String },

    #[error("no spec named `{0}` was found")]
    NotFound(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// A mnemonic alphabet ran out of keys. This is a specification defect: one
/// level declares more commands, flags or arguments than can be reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("no key left for command `{0}`")]
    Command(String),

    #[error("no key left for flag `{0}`")]
    Flag(String),

    #[error("no key left for argument `{0}`")]
    Argument(String),
}

/// Recoverable refusals during composition. Each one becomes a single-line
/// message and leaves the composition unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("{0} is undefined")]
    UndefinedKey(String),

    #[error("invalid environment variable format")]
    InvalidEnvironment,

    #[error("invalid flag `{0}`")]
    InvalidFlag(String),

    #[error("nothing to delete")]
    NothingToDelete,

    #[error("unable to delete {0} command: subcommands present")]
    SubcommandsPresent(String),

    #[error("unable to delete {0} command: options present")]
    OptionsPresent(String),
}
