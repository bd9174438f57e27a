//! Canonical tool names and read-only classification
//!
//! The parallelization classifier needs to know whether a tool mutates the
//! environment. That knowledge lives here as a static table over canonical
//! names, plus a name-based heuristic for tools the table has never heard
//! of. Unrecognized names default to mutating.

/// File operation tools
pub mod file_ops {
    /// Read file contents
    pub const READ_FILE: &str = "read_file";
    /// Write file contents
    pub const WRITE_FILE: &str = "write_file";
    /// Edit file with string replacement
    pub const EDIT_FILE: &str = "edit_file";
    /// Search for files by pattern
    pub const GLOB: &str = "glob";
    /// Search file contents
    pub const GREP: &str = "grep";
    /// List a directory
    pub const LIST_DIR: &str = "list_dir";
}

/// Process/execution tools
pub mod process {
    /// Execute shell commands
    pub const BASH: &str = "bash";
}

/// Network tools
pub mod network {
    /// Fetch web content
    pub const WEB_FETCH: &str = "web_fetch";
    /// Search the web
    pub const WEB_SEARCH: &str = "web_search";
}

/// Tools known to be read-only (safe to run concurrently with anything)
const READ_ONLY_TOOLS: &[&str] = &[
    file_ops::READ_FILE,
    file_ops::GLOB,
    file_ops::GREP,
    file_ops::LIST_DIR,
    network::WEB_FETCH,
    network::WEB_SEARCH,
];

/// Keywords that suggest a tool only reads data
const READ_INDICATORS: &[&str] = &["get", "list", "search", "read", "find", "fetch", "view"];

/// Keywords that suggest a tool mutates state
const WRITE_INDICATORS: &[&str] = &[
    "create", "delete", "update", "write", "edit", "remove", "move", "set", "run", "exec",
];

/// Check whether a name is in the static read-only table
#[inline]
pub fn is_known_read_only(name: &str) -> bool {
    READ_ONLY_TOOLS.contains(&name)
}

/// Heuristic classification for names absent from the table.
///
/// A name is treated as read-only only when it contains a read-indicator
/// keyword and no write-indicator keyword; anything else defaults to
/// mutating.
pub fn looks_read_only(name: &str) -> bool {
    let lower = name.to_lowercase();
    let reads = READ_INDICATORS.iter().any(|kw| lower.contains(kw));
    let writes = WRITE_INDICATORS.iter().any(|kw| lower.contains(kw));
    reads && !writes
}

/// Argument keys probed, in order, when extracting a resource identifier
/// for conflict detection
pub const RESOURCE_ARGUMENT_KEYS: &[&str] = &["path", "file_path", "file", "target", "url"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_read_only() {
        assert!(is_known_read_only("grep"));
        assert!(is_known_read_only("glob"));
        assert!(is_known_read_only("read_file"));
        assert!(!is_known_read_only("write_file"));
        assert!(!is_known_read_only("bash"));
    }

    #[test]
    fn test_heuristic_read_only() {
        assert!(looks_read_only("get_weather"));
        assert!(looks_read_only("list_branches"));
        assert!(looks_read_only("search_docs"));
        // Write indicator wins over a read indicator
        assert!(!looks_read_only("get_and_update"));
        assert!(!looks_read_only("create_branch"));
        // No indicator at all defaults to mutating
        assert!(!looks_read_only("frobnicate"));
    }
}
