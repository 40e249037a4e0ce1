//! Composition graph validation.
//!
//! A content type may compose other types, inheriting their property types
//! and groups. Saving a type must fail when the change would introduce a
//! duplicate property alias or a group alias carried with two different
//! kinds anywhere in the affected portion of the graph. The affected portion
//! is transitive in both directions: everything the candidate composes,
//! directly or not, and everything that composes the candidate.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::model::{ContentType, GroupKind};

/// The conflicts found when a composition graph fails validation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompositionConflicts {
    /// Property aliases contributed by more than one type in the graph.
    pub duplicate_property_aliases: Vec<String>,
    /// Group aliases appearing with both kinds in the graph.
    pub conflicting_group_aliases: Vec<String>,
}

impl CompositionConflicts {
    pub fn is_empty(&self) -> bool {
        self.duplicate_property_aliases.is_empty() && self.conflicting_group_aliases.is_empty()
    }
}

impl fmt::Display for CompositionConflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.duplicate_property_aliases.is_empty() {
            write!(
                f,
                "duplicate property aliases [{}]",
                self.duplicate_property_aliases.join(", ")
            )?;
            if !self.conflicting_group_aliases.is_empty() {
                write!(f, "; ")?;
            }
        }
        if !self.conflicting_group_aliases.is_empty() {
            write!(
                f,
                "group aliases with conflicting kinds [{}]",
                self.conflicting_group_aliases.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Validate `candidate` against the full set of known types, as if the
/// candidate had already been saved.
///
/// Returns the conflicts when the combined graph would carry a duplicate
/// property alias or a group alias with two kinds. Aliases compare
/// case-insensitively. The traversal keeps a visited set so cyclic
/// composition references terminate instead of looping.
pub fn validate_composition(
    candidate: &ContentType,
    all: &[ContentType],
) -> Result<(), CompositionConflicts> {
    let by_alias: HashMap<String, &ContentType> = all
        .iter()
        .map(|t| (t.alias.to_ascii_lowercase(), t))
        .collect();

    // Reverse edges: for each type, who composes it.
    let mut dependents: HashMap<String, Vec<&ContentType>> = HashMap::new();
    for t in all {
        for composed in &t.compositions {
            dependents
                .entry(composed.to_ascii_lowercase())
                .or_default()
                .push(t);
        }
    }

    let candidate_key = candidate.alias.to_ascii_lowercase();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(candidate_key.clone());

    let mut members: Vec<&ContentType> = vec![candidate];
    let mut queue: VecDeque<&ContentType> = VecDeque::new();

    fn enqueue<'a>(
        t: &'a ContentType,
        by_alias: &HashMap<String, &'a ContentType>,
        dependents: &HashMap<String, Vec<&'a ContentType>>,
        visited: &mut HashSet<String>,
        queue: &mut VecDeque<&'a ContentType>,
    ) {
        for composed in &t.compositions {
            let key = composed.to_ascii_lowercase();
            if visited.insert(key.clone()) {
                if let Some(resolved) = by_alias.get(&key) {
                    queue.push_back(*resolved);
                }
            }
        }
        if let Some(deps) = dependents.get(&t.alias.to_ascii_lowercase()) {
            for dep in deps.iter().copied() {
                if visited.insert(dep.alias.to_ascii_lowercase()) {
                    queue.push_back(dep);
                }
            }
        }
    }

    enqueue(candidate, &by_alias, &dependents, &mut visited, &mut queue);
    while let Some(next) = queue.pop_front() {
        members.push(next);
        enqueue(next, &by_alias, &dependents, &mut visited, &mut queue);
    }

    debug!(
        candidate = %candidate.alias,
        members = members.len(),
        "validating composition graph"
    );

    // Count property aliases across the whole graph. The candidate replaces
    // any stored version of itself, which the visited set already ensured.
    let mut property_counts: HashMap<String, usize> = HashMap::new();
    for member in &members {
        for property in &member.property_types {
            *property_counts
                .entry(property.alias.to_ascii_lowercase())
                .or_insert(0) += 1;
        }
    }
    let duplicate_property_aliases: BTreeSet<String> = property_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(alias, _)| alias)
        .collect();

    // A group alias must keep one kind everywhere it appears.
    let mut group_kinds: HashMap<String, GroupKind> = HashMap::new();
    let mut conflicting_group_aliases: BTreeSet<String> = BTreeSet::new();
    for member in &members {
        for group in &member.property_groups {
            let key = group.alias.to_ascii_lowercase();
            match group_kinds.get(&key) {
                Some(kind) if *kind != group.kind => {
                    conflicting_group_aliases.insert(key);
                }
                Some(_) => {}
                None => {
                    group_kinds.insert(key, group.kind);
                }
            }
        }
    }

    if duplicate_property_aliases.is_empty() && conflicting_group_aliases.is_empty() {
        return Ok(());
    }
    Err(CompositionConflicts {
        duplicate_property_aliases: duplicate_property_aliases.into_iter().collect(),
        conflicting_group_aliases: conflicting_group_aliases.into_iter().collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{PropertyGroup, PropertyType};

    fn type_with(alias: &str, properties: &[&str], compositions: &[&str]) -> ContentType {
        let mut t = ContentType::new(alias, alias, false);
        t.property_types = properties
            .iter()
            .map(|a| PropertyType::new(a, a))
            .collect();
        t.compositions = compositions.iter().map(|c| (*c).to_string()).collect();
        t
    }

    #[test]
    fn disjoint_aliases_validate() {
        let base = type_with("base", &["title"], &[]);
        let page = type_with("page", &["body"], &["base"]);
        assert!(validate_composition(&page, &[base.clone(), page.clone()]).is_ok());
    }

    #[test]
    fn duplicate_alias_across_composition_is_rejected() {
        let base = type_with("base", &["title"], &[]);
        let page = type_with("page", &["Title"], &["base"]);
        let conflicts =
            validate_composition(&page, &[base.clone(), page.clone()]).unwrap_err();
        assert_eq!(conflicts.duplicate_property_aliases, vec!["title"]);
    }

    #[test]
    fn conflict_is_found_through_reverse_edges() {
        // page composes base; validating base must still see page's aliases.
        let base = type_with("base", &["title"], &[]);
        let page = type_with("page", &["title"], &["base"]);
        let conflicts =
            validate_composition(&base, &[base.clone(), page.clone()]).unwrap_err();
        assert_eq!(conflicts.duplicate_property_aliases, vec!["title"]);
    }

    #[test]
    fn cyclic_composition_references_terminate() {
        let a = type_with("a", &["one"], &["b"]);
        let b = type_with("b", &["two"], &["a"]);
        assert!(validate_composition(&a, &[a.clone(), b.clone()]).is_ok());
    }

    #[test]
    fn group_alias_with_two_kinds_is_rejected() {
        let mut base = type_with("base", &[], &[]);
        base.property_groups = vec![PropertyGroup::new("content", "Content", GroupKind::Group)];
        let mut page = type_with("page", &[], &["base"]);
        page.property_groups = vec![PropertyGroup::new("content", "Content", GroupKind::Tab)];
        let conflicts =
            validate_composition(&page, &[base.clone(), page.clone()]).unwrap_err();
        assert_eq!(conflicts.conflicting_group_aliases, vec!["content"]);
    }
}
