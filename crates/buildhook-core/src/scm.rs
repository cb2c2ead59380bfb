//! SCM metadata resolution

use buildhook_api::{
    BuildEvent,
    BuildEventKind,
    ScmInfo,
    VcsRoot,
};

/// Branch name the build server reports when no explicit branch was requested
pub const DEFAULT_BRANCH_SENTINEL: &str = "<default>";

const URL_PROPERTY: &str = "url";
const BRANCH_PROPERTY: &str = "branch";

/// Resolves repository URL, branch and commit for a build.
///
/// Only the first revision (and its VCS root) is considered for multi-root
/// builds. Change lists are not collected.
pub fn resolve_scm(kind: BuildEventKind, event: &BuildEvent) -> Option<ScmInfo> {
    if let Some(revision) = event.revisions.first() {
        let root = &revision.root;
        let branch = revision
            .vcs_branch
            .clone()
            .or_else(|| fallback_branch(event, root));

        return Some(ScmInfo {
            url: root.property(URL_PROPERTY).map(str::to_string),
            branch,
            commit: Some(revision.revision.clone()),
            changes: None,
        });
    }

    // Queued builds have no revisions yet, only the promotion's VCS roots.
    if kind == BuildEventKind::Queued {
        if let Some(root) = event.vcs_roots.first() {
            return Some(ScmInfo {
                url: root.property(URL_PROPERTY).map(str::to_string),
                branch: fallback_branch(event, root),
                commit: None,
                changes: None,
            });
        }
    }

    None
}

fn fallback_branch(event: &BuildEvent, root: &VcsRoot) -> Option<String> {
    match event.promotion_branch.as_deref() {
        Some(branch) if branch != DEFAULT_BRANCH_SENTINEL => Some(branch.to_string()),
        _ => {
            let branch = root.property(BRANCH_PROPERTY).map(str::to_string);
            if branch.is_none() && root.vcs_name == "svn" {
                tracing::debug!(
                    build = %event.full_name,
                    "Couldn't find a branch name, probably because this build uses svn"
                );
            }
            branch
        }
    }
}
