//! CLI-local error kinds (spec §6, §7 — `INPUT_FORMAT` is raised by this
//! collaborator, not the core).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalFileError {
    #[error("line {line}: no pll= Intel URL found")]
    MissingPllUrl { line: usize },

    #[error("line {line}: more than one pll= Intel URL")]
    MultiplePllUrls { line: usize },

    #[error("line {line}: pll= URL has malformed coordinates: {raw:?}")]
    InvalidPllCoordinates { line: usize, raw: String },

    #[error("line {line}: more than one key-count field")]
    MultipleKeyCounts { line: usize },

    #[error("line {line}: more than one sbul token")]
    MultipleSbulTokens { line: usize },

    #[error("line {line}: sbul and inbound tokens cannot both be set on one portal")]
    SbulAndInbound { line: usize },

    #[error("line {line}: inbound is already set on an earlier portal")]
    MultipleInboundPortals { line: usize },

    #[error("line {line}: unrecognised field {token:?}")]
    UnrecognizedToken { line: usize, token: String },
}
