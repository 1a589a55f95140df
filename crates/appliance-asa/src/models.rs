//! ASA CLI passthrough models.

use serde::{Deserialize, Serialize};

/// Body of a `POST /api/cli` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliRequest {
    /// Commands run in order
    pub commands: Vec<String>,
}

impl CliRequest {
    /// Build a request from command lines.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reply to a `POST /api/cli` call: one output per command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CliResponse {
    /// Command outputs in request order
    #[serde(default)]
    pub response: Vec<String>,
}

/// A command paired with its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOutput {
    /// Command line
    pub command: String,
    /// Raw output
    pub output: String,
}

impl CliResponse {
    /// Pair outputs with the commands that produced them.
    ///
    /// Pairing stops at the shorter of the two lists.
    #[must_use]
    pub fn pair_with(self, request: CliRequest) -> Vec<CliOutput> {
        request
            .commands
            .into_iter()
            .zip(self.response)
            .map(|(command, output)| CliOutput { command, output })
            .collect()
    }
}
