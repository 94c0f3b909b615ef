use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compiler toolchain named by the second label component.
///
/// Only `intel` and `gnu` are accepted; anything else means the label is not
/// meant for this bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
    Intel,
    Gnu,
}

impl Compiler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compiler::Intel => "intel",
            Compiler::Gnu => "gnu",
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compiler {
    type Err = String;

    // Exact, case-sensitive: `Intel` is not `intel`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intel" => Ok(Compiler::Intel),
            "gnu" => Ok(Compiler::Gnu),
            other => Err(format!(
                "invalid compiler: {other} (expected \"intel\" or \"gnu\")"
            )),
        }
    }
}

/// What a matched label asks the bot to do.
///
/// - `Build`: clone and build the app.
/// - `EndToEnd`: build, then launch the WE2E workflow experiments and poll them.
/// - `Regression`: clone and build GSI, then run its ctest regression suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Build,
    EndToEnd,
    Regression,
}

impl ActionKind {
    /// Name used in labels and in `[actions].approved`.
    pub fn label_name(&self) -> &'static str {
        match self {
            ActionKind::Build => "build",
            ActionKind::EndToEnd => "WE",
            ActionKind::Regression => "rt",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_name())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "build" => Ok(ActionKind::Build),
            "WE" => Ok(ActionKind::EndToEnd),
            "rt" => Ok(ActionKind::Regression),
            other => Err(format!(
                "unknown action: {other} (expected \"build\", \"WE\" or \"rt\")"
            )),
        }
    }
}
