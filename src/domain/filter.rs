//! Destination-class filter
//!
//! Pure computation over already-fetched data: given a source class and the
//! selected students, which classes are eligible promotion targets. The UI
//! recomputes this on every change of source class or selection; the server
//! exposes the same computation on `/promotion-targets`.

use std::collections::HashSet;

use uuid::Uuid;

use super::model::{ClassInfo, StudentRecord};

/// Compute the classes eligible as promotion targets.
///
/// A class is excluded when it is the source class itself, when any selected
/// student currently occupies it or ever occupied it per their history, or
/// when both the source and the candidate expose a level and the candidate's
/// level is strictly below the source's. A missing level on either side
/// places no constraint.
///
/// With no source class or an empty selection the full list is returned
/// unfiltered; that is a UI convenience state, not a business rule.
pub fn eligible_destinations<'a>(
    classes: &'a [ClassInfo],
    source_class_id: Option<Uuid>,
    selected: &[StudentRecord],
) -> Vec<&'a ClassInfo> {
    let Some(source_id) = source_class_id else {
        return classes.iter().collect();
    };
    if selected.is_empty() {
        return classes.iter().collect();
    }

    let Some(source) = classes.iter().find(|class| class.id == source_id) else {
        return classes.iter().collect();
    };

    let mut occupied: HashSet<Uuid> = HashSet::new();
    for student in selected {
        occupied.insert(student.class.id);
        for entry in &student.history {
            occupied.insert(entry.new_class_id);
        }
    }

    classes
        .iter()
        .filter(|candidate| {
            candidate.id != source_id
                && !occupied.contains(&candidate.id)
                && level_allows(source.level, candidate.level)
        })
        .collect()
}

fn level_allows(source: Option<i32>, candidate: Option<i32>) -> bool {
    match (source, candidate) {
        (Some(source), Some(candidate)) => candidate >= source,
        _ => true,
    }
}
