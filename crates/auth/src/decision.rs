use serde::Serialize;

/// Fixed redirect destinations the pipeline may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Login,
    Dashboard,
    AccessDenied,
}

impl RedirectTarget {
    pub fn as_path(&self) -> &'static str {
        match self {
            RedirectTarget::Login => "/login",
            RedirectTarget::Dashboard => "/private/dashboard",
            RedirectTarget::AccessDenied => "/access-denied",
        }
    }
}

impl core::fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum Decision {
    Continue,
    Redirect(RedirectTarget),
}

impl Decision {
    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue)
    }
}
