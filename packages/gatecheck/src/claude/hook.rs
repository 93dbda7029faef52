//! Types and serialization for the Claude Code hook protocol.
//!
//! Input arrives as one JSON object on stdin; output is at most one JSON
//! object on stdout. Absence of output (with exit status 0) is a valid
//! response meaning "not applicable, no opinion".

use std::io::Read;

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Hard cap on the bytes of any reason/context field in a response.
///
/// Phase output can contain megabytes of compiler spew; everything past the
/// cap is replaced with a truncation marker before serialization.
pub const RESPONSE_BYTE_CAP: usize = 4096;

const TRUNCATION_MARKER: &str = "… [output truncated]";

/// A `PreToolUse` hook payload, reduced to the fields gatecheck consumes.
///
/// Every field is defaulted: extraction from upstream input degrades to a
/// safe empty value rather than erroring, so a malformed payload can never
/// itself be the cause of a blocked operation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HookInput {
    /// The hook event name (expected: `PreToolUse`).
    pub hook_event_name: String,

    /// The tool about to be used (gatecheck only acts on `Bash`).
    pub tool_name: String,

    /// The working directory of the session.
    pub cwd: String,

    /// The input to the tool.
    pub tool_input: ToolInput,
}

/// Input for the `Bash` tool.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ToolInput {
    /// The full shell command the agent is about to execute.
    pub command: String,
}

impl HookInput {
    /// Parse a hook payload, defaulting every field on any failure.
    ///
    /// This is the single deserialization step at the input boundary; it
    /// never errors.
    pub fn read(reader: impl Read) -> Self {
        serde_json::from_reader(reader).unwrap_or_default()
    }

    /// Whether this payload could carry a shell command gatecheck gates.
    ///
    /// An absent tool name is tolerated (older hook payloads omit it); any
    /// other tool is someone else's business.
    pub fn is_bash(&self) -> bool {
        self.tool_name.is_empty() || self.tool_name == "Bash"
    }
}

/// The final outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Permit the operation. The summary goes to `additionalContext` only:
    /// when a sibling hook denies the same action, the host renders every
    /// populated `reason` field in error styling, and a passing stage
    /// showing up styled as an error is actively misleading.
    Allow { context: String },

    /// Block the operation. The same failure summary is carried in both
    /// the human-readable reason and the machine-readable context.
    Deny { summary: String },
}

impl Decision {
    /// Serialize to the hook response envelope as a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let output = match self {
            Decision::Allow { context } => HookSpecificOutput::builder()
                .permission_decision("allow")
                .additional_context(truncate(context.clone()))
                .build(),
            Decision::Deny { summary } => {
                let summary = truncate(summary.clone());
                HookSpecificOutput::builder()
                    .permission_decision("deny")
                    .permission_decision_reason(summary.clone())
                    .additional_context(summary)
                    .build()
            }
        };
        serde_json::to_string(&HookResponse::builder().hook_specific_output(output).build())
    }
}

/// The top-level structure of a hook response.
#[derive(Debug, Serialize, Clone, Builder)]
#[serde(rename_all = "camelCase")]
struct HookResponse {
    /// Hook specific output.
    hook_specific_output: HookSpecificOutput,
}

/// Hook specific output for `PreToolUse` hooks.
#[derive(Debug, Serialize, Clone, Builder)]
#[serde(rename_all = "camelCase")]
struct HookSpecificOutput {
    /// The hook event name.
    #[builder(skip = String::from("PreToolUse"))]
    hook_event_name: String,

    /// The permission decision: `allow` or `deny`.
    #[builder(into)]
    permission_decision: String,

    /// Why the operation was denied. Present only on deny.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    permission_decision_reason: Option<String>,

    /// Outcome summary for the calling agent, never shown to end users.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    additional_context: Option<String>,
}

/// Convert captured subprocess output to a string that is guaranteed to
/// serialize: invalid byte sequences are replaced, never propagated.
pub fn sanitize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Cap a response field at [`RESPONSE_BYTE_CAP`] bytes on a char boundary,
/// appending a truncation marker when anything was cut.
pub fn truncate(text: String) -> String {
    if text.len() <= RESPONSE_BYTE_CAP {
        return text;
    }

    let mut end = RESPONSE_BYTE_CAP - TRUNCATION_MARKER.len();
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATION_MARKER}", &text[..end])
}
