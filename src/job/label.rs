// src/job/label.rs

//! Label → action matching.
//!
//! Labels look like `ci-<machine>-<compiler>-<action>`, e.g.
//! `ci-hera-intel-build`. A label that does not fit is simply not for this
//! bot instance; it is never an error.

use regex::Regex;
use tracing::debug;

use crate::types::{ActionKind, Compiler};

pub const LABEL_PREFIX: &str = "ci";
const LABEL_SEPARATOR: char = '-';

/// What a label asks for on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMatch {
    pub compiler: Compiler,
    pub action: ActionKind,
}

/// `^(?:pattern)`: the pattern must match at the start of the subject.
fn start_anchored(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{pattern})")).ok()
}

/// Match `label` against the current `machine` and the `approved` actions.
///
/// - the prefix must be `ci` and exactly three components must follow;
/// - the machine component is a pattern matched at the start of `machine`;
/// - the compiler component must be exactly `intel` or `gnu`;
/// - the first approved action whose name matches the start of the action
///   component wins.
pub fn match_label(label: &str, machine: &str, approved: &[ActionKind]) -> Option<LabelMatch> {
    let mut parts = label.split(LABEL_SEPARATOR);
    if parts.next()? != LABEL_PREFIX {
        return None;
    }

    let rest: Vec<&str> = parts.collect();
    let [label_machine, label_compiler, label_action] = rest.as_slice() else {
        return None;
    };
    if rest.iter().any(|part| part.is_empty()) {
        return None;
    }

    if !start_anchored(label_machine)?.is_match(machine) {
        return None;
    }

    let compiler = label_compiler.parse::<Compiler>().ok()?;

    let action = approved.iter().copied().find(|action| {
        start_anchored(action.label_name())
            .map(|re| re.is_match(label_action))
            .unwrap_or(false)
    })?;

    debug!(label, %compiler, %action, "label matched");
    Some(LabelMatch { compiler, action })
}

/// The label that re-triggers `action` on `machine` with `compiler`.
pub fn label_for(machine: &str, compiler: Compiler, action: ActionKind) -> String {
    format!("{LABEL_PREFIX}-{machine}-{compiler}-{action}")
}
