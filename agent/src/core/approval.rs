//! Approval ladder: the ordered checks made before asking a human.

use std::path::Path;

use crate::core::path::is_within_workspace;

/// Special cases that skip the approval prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Command roots that never need confirmation.
    pub safe_commands: Vec<String>,
    /// Allow file reads that stay inside the current directory.
    pub auto_approve_workspace_reads: bool,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            safe_commands: vec!["echo".to_string()],
            auto_approve_workspace_reads: true,
        }
    }
}

/// Session switches that widen auto-approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalFlags {
    /// `--yes-all`: approve every action.
    pub approve_all: bool,
    /// `--yes`: approve the next action only.
    pub approve_next: bool,
    /// The action is the model's own fix for a failed action.
    pub correction_mode: bool,
}

/// What an approval is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalSubject<'a> {
    Command(&'a str),
    FileChange(&'a str),
    FileRead(&'a str),
}

impl<'a> ApprovalSubject<'a> {
    /// Key under which an "always" grant is remembered.
    ///
    /// Commands are keyed by their first whitespace-delimited token; file
    /// actions by the literal path.
    pub fn key(&self) -> &'a str {
        match self {
            ApprovalSubject::Command(command) => command_root(command),
            ApprovalSubject::FileChange(path) | ApprovalSubject::FileRead(path) => path,
        }
    }
}

/// Which rung of the ladder approved an action without prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoApproval {
    SafeCommand,
    WorkspaceRead,
    ApproveAll,
    Remembered,
    ApproveNext,
    CorrectionMode,
}

/// First whitespace-delimited token of a command.
pub fn command_root(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Walk the ladder and return the rung that approves `subject`, if any.
///
/// `is_remembered` is consulted only when the cheaper rungs above it did not
/// already decide.
pub fn auto_approval(
    policy: &ApprovalPolicy,
    flags: ApprovalFlags,
    subject: ApprovalSubject<'_>,
    cwd: &Path,
    is_remembered: impl FnOnce(&str) -> bool,
) -> Option<AutoApproval> {
    match subject {
        ApprovalSubject::Command(command) => {
            let root = command_root(command);
            if !root.is_empty() && policy.safe_commands.iter().any(|safe| safe == root) {
                return Some(AutoApproval::SafeCommand);
            }
        }
        ApprovalSubject::FileRead(path) => {
            if policy.auto_approve_workspace_reads && is_within_workspace(cwd, path) {
                return Some(AutoApproval::WorkspaceRead);
            }
        }
        ApprovalSubject::FileChange(_) => {}
    }

    if flags.approve_all {
        return Some(AutoApproval::ApproveAll);
    }
    if is_remembered(subject.key()) {
        return Some(AutoApproval::Remembered);
    }
    if flags.approve_next {
        return Some(AutoApproval::ApproveNext);
    }
    if flags.correction_mode {
        return Some(AutoApproval::CorrectionMode);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd() -> &'static Path {
        Path::new("/work")
    }

    fn never(_: &str) -> bool {
        false
    }

    #[test]
    fn command_key_is_first_token() {
        assert_eq!(ApprovalSubject::Command("  git status -s").key(), "git");
        assert_eq!(ApprovalSubject::FileChange("a b.txt").key(), "a b.txt");
    }

    #[test]
    fn echo_is_safe_by_default() {
        let decision = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags::default(),
            ApprovalSubject::Command("echo hi"),
            cwd(),
            never,
        );
        assert_eq!(decision, Some(AutoApproval::SafeCommand));
    }

    #[test]
    fn safe_commands_do_not_apply_to_file_paths() {
        let decision = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags::default(),
            ApprovalSubject::FileChange("echo"),
            cwd(),
            never,
        );
        assert_eq!(decision, None);
    }

    #[test]
    fn safe_commands_are_configurable() {
        let policy = ApprovalPolicy {
            safe_commands: Vec::new(),
            ..ApprovalPolicy::default()
        };
        let decision = auto_approval(
            &policy,
            ApprovalFlags::default(),
            ApprovalSubject::Command("echo hi"),
            cwd(),
            never,
        );
        assert_eq!(decision, None);
    }

    #[test]
    fn workspace_read_skips_prompt_only_inside_cwd() {
        let policy = ApprovalPolicy::default();
        let inside = auto_approval(
            &policy,
            ApprovalFlags::default(),
            ApprovalSubject::FileRead("src/lib.rs"),
            cwd(),
            never,
        );
        let outside = auto_approval(
            &policy,
            ApprovalFlags::default(),
            ApprovalSubject::FileRead("../etc/passwd"),
            cwd(),
            never,
        );
        assert_eq!(inside, Some(AutoApproval::WorkspaceRead));
        assert_eq!(outside, None);
    }

    #[test]
    fn remembered_key_is_looked_up_by_command_root() {
        let mut looked_up = String::new();
        let decision = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags::default(),
            ApprovalSubject::Command("ls -la"),
            cwd(),
            |key| {
                looked_up = key.to_string();
                key == "ls"
            },
        );
        assert_eq!(decision, Some(AutoApproval::Remembered));
        assert_eq!(looked_up, "ls");
    }

    #[test]
    fn approve_all_short_circuits_store_lookup() {
        let decision = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags {
                approve_all: true,
                ..ApprovalFlags::default()
            },
            ApprovalSubject::Command("rm -rf build"),
            cwd(),
            |_| panic!("store must not be consulted"),
        );
        assert_eq!(decision, Some(AutoApproval::ApproveAll));
    }

    #[test]
    fn approve_next_then_correction_mode() {
        let next = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags {
                approve_next: true,
                correction_mode: true,
                ..ApprovalFlags::default()
            },
            ApprovalSubject::FileChange("a.txt"),
            cwd(),
            never,
        );
        let correction = auto_approval(
            &ApprovalPolicy::default(),
            ApprovalFlags {
                correction_mode: true,
                ..ApprovalFlags::default()
            },
            ApprovalSubject::FileChange("a.txt"),
            cwd(),
            never,
        );
        assert_eq!(next, Some(AutoApproval::ApproveNext));
        assert_eq!(correction, Some(AutoApproval::CorrectionMode));
    }
}
