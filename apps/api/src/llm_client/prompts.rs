// Shared prompt fragments. Each completion unit keeps its own instructions in
// agents::profiles; this file holds the cross-cutting pieces.

/// Appended to every unit's system prompt; the UI renders markdown.
pub const MARKDOWN_OUTPUT: &str = "Format your answer in Markdown.";

/// Appended for units whose instructions ask for an embedded JSON document.
pub const EMBEDDED_JSON: &str = "When you return JSON, put it in a single ```json fenced block \
    so it can be parsed. Do NOT invent fields you cannot support from the input.";

/// Appended for units that carry tools.
pub const TOOL_USE: &str = "Use the tools provided to fetch live data. \
    If a tool returns an object with an `error` field, report that the data is unavailable \
    for that item and continue with the rest.";
