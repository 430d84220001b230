//! Label flags and step guards

use serde::{Deserialize, Serialize};

/// Label that enables the JS release candidate path
pub const JS_RC_LABEL: &str = "js-rc";

/// Label that enables the Python release candidate path
pub const PYTHON_RC_LABEL: &str = "python-rc";

/// Boolean flags derived once from the triggering pull request's labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFlags {
    /// Label set contains exactly "js-rc"
    pub has_js_rc: bool,

    /// Label set contains exactly "python-rc"
    pub has_python_rc: bool,
}

impl LabelFlags {
    /// Compute flags from a label collection (exact, case-sensitive match)
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = LabelFlags::default();
        for label in labels {
            match label.as_ref() {
                JS_RC_LABEL => flags.has_js_rc = true,
                PYTHON_RC_LABEL => flags.has_python_rc = true,
                _ => {}
            }
        }
        flags
    }

    /// True when at least one release candidate path is enabled
    pub fn any(&self) -> bool {
        self.has_js_rc || self.has_python_rc
    }
}

/// Guard predicate deciding whether a step runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Guard {
    /// Runs on every event
    #[default]
    Always,
    /// Runs when "js-rc" is present
    JsRc,
    /// Runs when "python-rc" is present
    PythonRc,
    /// Runs when either release candidate label is present
    AnyRc,
}

impl Guard {
    /// Evaluate the guard against the run's flags
    pub fn allows(&self, flags: &LabelFlags) -> bool {
        match self {
            Guard::Always => true,
            Guard::JsRc => flags.has_js_rc,
            Guard::PythonRc => flags.has_python_rc,
            Guard::AnyRc => flags.any(),
        }
    }

    /// Human-readable requirement, used in skip reasons
    pub fn describe(&self) -> &'static str {
        match self {
            Guard::Always => "always",
            Guard::JsRc => "label 'js-rc'",
            Guard::PythonRc => "label 'python-rc'",
            Guard::AnyRc => "label 'js-rc' or 'python-rc'",
        }
    }
}
