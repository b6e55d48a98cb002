//! Reconciling an imported snapshot with live state.

use crate::ImportPayload;
use std::collections::{BTreeMap, HashSet};
use store::{new_id, LiveState, User};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Present fields wholesale-replace live state.
    #[default]
    Replace,
    /// Present fields are unioned with live state; live entities win.
    Merge,
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub queries_imported: usize,
    /// Imported queries that received a fresh id
    pub ids_rewritten: usize,
    pub queries_replaced: bool,
}

/// Compute fresh ids for incoming entries whose id is already taken.
///
/// Returns positions into `incoming` mapped to their new id. Ids taken
/// earlier in `incoming` count as taken too.
pub fn rewrite_ids<'a, F>(
    existing: impl IntoIterator<Item = &'a str>,
    incoming: impl IntoIterator<Item = &'a str>,
    mut fresh: F,
) -> BTreeMap<usize, String>
where
    F: FnMut() -> String,
{
    let mut taken: HashSet<String> = existing.into_iter().map(str::to_string).collect();
    let mut rewrites = BTreeMap::new();

    for (index, id) in incoming.into_iter().enumerate() {
        let id = if taken.contains(id) {
            let mut replacement = fresh();
            while taken.contains(&replacement) {
                replacement = fresh();
            }
            rewrites.insert(index, replacement.clone());
            replacement
        } else {
            id.to_string()
        };
        taken.insert(id);
    }

    rewrites
}

/// Apply a sanitized payload.
///
/// Each top-level field is applied whole or not at all.
pub fn apply(state: &mut LiveState, payload: ImportPayload, mode: ImportMode) -> ImportReport {
    let mut report = ImportReport::default();

    if let Some(user) = payload.user {
        apply_user(&mut state.user, user, mode);
    }

    if let Some(chains) = payload.chains {
        match mode {
            ImportMode::Replace => state.registry.replace(chains),
            ImportMode::Merge => state.registry.merge(chains),
        }
    }

    if let Some(projects) = payload.projects {
        match mode {
            ImportMode::Replace => state.projects = projects,
            ImportMode::Merge => state.projects.extend(projects.names()),
        }
    }

    if let Some(selected) = payload.selected_project {
        state.selected_project = selected;
    }

    if let Some(mut queries) = payload.queries {
        report.queries_imported = queries.len();
        // Replace still has to keep ids unique within the incoming set
        let existing = match mode {
            ImportMode::Replace => Vec::new(),
            ImportMode::Merge => state.queries.ids(),
        };
        let rewrites = rewrite_ids(
            existing.iter().map(String::as_str),
            queries.iter().map(|q| q.id.as_str()),
            new_id,
        );
        report.ids_rewritten = rewrites.len();
        for (index, id) in rewrites {
            queries[index].id = id;
        }

        match mode {
            ImportMode::Replace => {
                state.queries.replace(queries);
                report.queries_replaced = true;
            }
            ImportMode::Merge => state.queries.extend(queries),
        }
    }

    if let Some(enabled) = payload.refresh_enabled {
        state.refresh.enabled = enabled;
    }
    if let Some(seconds) = payload.refresh_seconds {
        state.refresh.set_seconds(seconds);
    }

    state.heal();
    info!(
        ?mode,
        imported = report.queries_imported,
        rewritten = report.ids_rewritten,
        "Applied imported configuration"
    );
    report
}

fn apply_user(live: &mut User, imported: User, mode: ImportMode) {
    match mode {
        ImportMode::Replace => {
            if !imported.id.is_empty() {
                live.id = imported.id;
            }
            live.name = imported.name;
        }
        ImportMode::Merge => {
            if !imported.name.is_empty() {
                live.name = imported.name;
            }
        }
    }
}
