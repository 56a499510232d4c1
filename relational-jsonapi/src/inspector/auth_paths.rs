//! Search for the relationship paths leading from each entity to the principal.
//!
//! An entity may reach the principal in several independent ways, like a post which is visible to
//! both its author and its reviewer. An authorization filter must accept a row if _any_ of these
//! paths leads to the authenticated subject, so the search enumerates all of them.
//!
//! The search is breadth-first over partial paths. Each partial path remembers the relations it
//! has crossed, in either direction, and never crosses one of them again. There is no global
//! visited set: two different paths may share relations, which is exactly what makes diamond
//! shapes enumerate fully. Since each path crosses every relation at most once, the search
//! terminates even when the relationship graph is cyclic.

use super::{EntityInfo, InspectorConfig, RelationId};
use crate::schema::EntityName;
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// A partial path from the entity being searched.
struct Path<'a> {
    steps: Vec<&'a str>,
    used: HashSet<&'a RelationId>,
    last: &'a EntityName,
}

/// Fill in the `auth_user_paths` of every entity.
///
/// The principal, and every entity marked [`is_principal`](EntityInfo::is_principal), gets the
/// single empty path. Every other entity gets the paths to the principal in order of increasing
/// length, as field names joined by [`path_separator`](InspectorConfig::path_separator). An
/// entity with no paths gets an empty list.
pub(crate) fn compute_auth_paths(
    entities: &mut BTreeMap<EntityName, EntityInfo>,
    config: &InspectorConfig,
) {
    let graph: &BTreeMap<_, _> = entities;
    let paths = graph
        .iter()
        .map(|(name, info)| {
            let paths = if info.is_principal {
                vec![String::new()]
            } else {
                search(graph, name, config)
            };
            (name.clone(), paths)
        })
        .collect::<Vec<_>>();
    for (name, paths) in paths {
        if let Some(info) = entities.get_mut(&name) {
            info.auth_user_paths = paths;
        }
    }
}

fn search(
    entities: &BTreeMap<EntityName, EntityInfo>,
    start: &EntityName,
    config: &InspectorConfig,
) -> Vec<String> {
    let mut found = vec![];
    let mut truncated = false;
    let mut worklist = VecDeque::from([Path {
        steps: vec![],
        used: HashSet::new(),
        last: start,
    }]);

    while let Some(path) = worklist.pop_front() {
        let Some(info) = entities.get(path.last) else { continue; };
        for edge in &info.edges {
            if path.used.contains(&edge.relation) {
                continue;
            }
            let Some(related) = edge.field.related_entity() else { continue; };
            let Some(related_info) = entities.get(related) else { continue; };

            let mut steps = path.steps.clone();
            steps.push(edge.field.name());
            if related_info.is_principal {
                found.push(steps.join(&config.path_separator));
                continue;
            }
            if config
                .max_auth_path_depth
                .map_or(false, |max| steps.len() >= max)
            {
                truncated = true;
                continue;
            }

            let mut used = path.used.clone();
            used.insert(&edge.relation);
            worklist.push_back(Path {
                steps,
                used,
                last: related,
            });
        }
    }

    if truncated {
        tracing::warn!(
            entity = %start,
            max_depth = ?config.max_auth_path_depth,
            "auth path search was cut short; longer paths to the principal are ignored"
        );
    }
    tracing::debug!(entity = %start, ?found, "found auth paths");
    found.into_iter().unique().collect()
}
