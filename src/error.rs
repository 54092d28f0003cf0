use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`ConsensusError`], used to pick the process exit status.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    Input,
    SchemaMismatch,
    Configuration,
    InvariantViolation,
    Output,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Output => 1,
            Self::Configuration => 2,
            Self::Input => 3,
            Self::SchemaMismatch => 4,
            Self::InvariantViolation => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("unable to read {path:?}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} contains no sequences")]
    EmptyFasta { path: PathBuf },

    #[error("no alignments found in {0}")]
    NoAlignments(String),

    #[error("alignment {alignment} has no columns")]
    EmptyAlignment { alignment: String },

    #[error("alignment {alignment} contains the identifier {id} more than once")]
    DuplicateIdentifier { alignment: String, id: String },

    #[error("alignment {alignment} is missing the identifier {id}")]
    MissingIdentifier { alignment: String, id: String },

    #[error("alignment {alignment} contains the unexpected identifier {id}")]
    UnexpectedIdentifier { alignment: String, id: String },

    #[error(
        "sequence {id} in alignment {alignment} has length {found}, but the alignment has {expected} columns"
    )]
    LengthMismatch {
        alignment: String,
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("sequence {id} in alignment {alignment} does not match the residues of the first alignment")]
    ResidueMismatch { alignment: String, id: String },

    #[error("sequence {id} contains residue {residue:?} which is not part of the {alphabet} alphabet")]
    InvalidResidue {
        id: String,
        residue: char,
        alphabet: String,
    },

    #[error("threshold must be > 0 and <= 1, but is {0}")]
    InvalidThreshold(f64),

    #[error("no alignment directory or input files given")]
    MissingAlignments,

    #[error("unable to read alignment directory {path:?}")]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("coordinate tuple {coordinates} has {found} components, expected {expected}")]
    DimensionMismatch {
        coordinates: String,
        expected: usize,
        found: usize,
    },

    #[error("coordinate step from {from} to {to} is not monotone")]
    NonMonotoneStep { from: String, to: String },

    #[error("backtracking from {terminal} did not reach the origin")]
    BrokenBacktrack { terminal: String },

    #[error("offset {offset} is invalid for sequence {id} of length {length}")]
    InvalidOffset {
        id: String,
        offset: usize,
        length: usize,
    },

    #[error("unable to write {path:?}")]
    UnwritableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConsensusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnreadableFile { .. }
            | Self::EmptyFasta { .. }
            | Self::NoAlignments(_)
            | Self::EmptyAlignment { .. }
            | Self::InvalidResidue { .. } => ErrorKind::Input,
            Self::DuplicateIdentifier { .. }
            | Self::MissingIdentifier { .. }
            | Self::UnexpectedIdentifier { .. }
            | Self::LengthMismatch { .. }
            | Self::ResidueMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::InvalidThreshold(_)
            | Self::MissingAlignments
            | Self::UnreadableDirectory { .. } => ErrorKind::Configuration,
            Self::DimensionMismatch { .. }
            | Self::NonMonotoneStep { .. }
            | Self::BrokenBacktrack { .. }
            | Self::InvalidOffset { .. } => ErrorKind::InvariantViolation,
            Self::UnwritableFile { .. } | Self::Io(_) => ErrorKind::Output,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
