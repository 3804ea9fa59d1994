//! Client-side processing status of one request.
//!
//! Whether a template is evaluated on the server or shipped to the browser
//! for client-side processing is decided per request from the `yst.yeipee`
//! request parameter or cookie, and passed to [`crate::template::Template::print`]
//! as a plain value.
//!
//! | Status                    | Code | Server evaluates | Link parameter |
//! |---------------------------|------|------------------|----------------|
//! | `YeipeeAndSendOn`         | `1`  | yes              | `yst.yeipee=1` |
//! | `YeipeeAndSendOff`        | `2`  | yes              | `yst.yeipee=0` |
//! | `NotYeipeeAndSendOff`     | `-1` | no               | `yst.yeipee=0` |
//! | `DisableYeipeeOnClient`   | `-2` | no               | none           |

use std::fmt;
use std::str::FromStr;

use crate::text::{is_false, is_true};

/// Name of the request parameter and cookie carrying the status.
pub const YEIPEE_PARAM: &str = "yst.yeipee";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientStatus {
    /// The client asked for server processing and keeps asking.
    YeipeeAndSendOn,
    /// No preference was expressed; the server processes.
    #[default]
    YeipeeAndSendOff,
    /// The client asked to process templates itself.
    NotYeipeeAndSendOff,
    /// The server may not process templates at all.
    DisableYeipeeOnClient,
}

impl ClientStatus {
    /// Status for a request carrying `param` and `cookie` values of
    /// [`YEIPEE_PARAM`].  The parameter wins over the cookie.
    pub fn detect(param: Option<&str>, cookie: Option<&str>, may_process_on_server: bool) -> Self {
        if !may_process_on_server {
            return ClientStatus::DisableYeipeeOnClient;
        }
        match param.or(cookie) {
            None => ClientStatus::YeipeeAndSendOff,
            Some(v) if is_true(v) => ClientStatus::YeipeeAndSendOn,
            Some(_) => ClientStatus::NotYeipeeAndSendOff,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ClientStatus::YeipeeAndSendOn => 1,
            ClientStatus::YeipeeAndSendOff => 2,
            ClientStatus::NotYeipeeAndSendOff => -1,
            ClientStatus::DisableYeipeeOnClient => -2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ClientStatus::YeipeeAndSendOn),
            2 => Some(ClientStatus::YeipeeAndSendOff),
            -1 => Some(ClientStatus::NotYeipeeAndSendOff),
            -2 => Some(ClientStatus::DisableYeipeeOnClient),
            _ => None,
        }
    }

    /// Whether templates are evaluated on the server for this request.
    pub fn must_process_on_server(self) -> bool {
        matches!(self, ClientStatus::YeipeeAndSendOn | ClientStatus::YeipeeAndSendOff)
    }

    /// `href` with the status parameter appended, so following the link
    /// keeps the choice.  Unchanged when disabled or already present.
    pub fn add_to_href(self, href: &str) -> String {
        if self == ClientStatus::DisableYeipeeOnClient || href.contains(YEIPEE_PARAM) {
            return href.to_owned();
        }
        let flag = if self == ClientStatus::YeipeeAndSendOn { 1 } else { 0 };
        let (base, fragment) = match href.find('#') {
            Some(i) => href.split_at(i),
            None => (href, ""),
        };
        let sep = if base.contains('?') { '&' } else { '?' };
        format!("{base}{sep}{YEIPEE_PARAM}={flag}{fragment}")
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientStatus::YeipeeAndSendOn => "YEIPEE_AND_SEND_ON",
            ClientStatus::YeipeeAndSendOff => "YEIPEE_AND_SEND_OFF",
            ClientStatus::NotYeipeeAndSendOff => "NOT_YEIPEE_AND_SEND_OFF",
            ClientStatus::DisableYeipeeOnClient => "DISABLE_YEIPEE_ON_CLIENT",
        };
        f.write_str(name)
    }
}

/// Parses a status code (`1`, `2`, `-1`, `-2`) or a yes/no word as a
/// request value would be read.
impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = s.trim().parse().ok().and_then(ClientStatus::from_code) {
            return Ok(status);
        }
        if is_true(s) || is_false(s) {
            return Ok(ClientStatus::detect(Some(s), None, true));
        }
        Err(format!("invalid client status: {s}"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
