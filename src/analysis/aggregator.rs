//! Grouping and collision detection.
//!
//! Descriptors are grouped by a key built from their `source` and `name`
//! tags, the values of any prepend tags, and the discovered metric name.
//! Keys shared by more than one descriptor are collisions.

use crate::error::MergeResult;
use crate::models::{CollisionGroup, Descriptor, MergeOutcome};
use serde_yaml::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Resource placeholder inserted for a prepended tag.
pub fn tag_placeholder(tag: &str) -> String {
    format!("${{tag:{}}}", tag)
}

/// Insert placeholders for every prepend tag the descriptor carries.
///
/// Tags are processed in list order and each placeholder goes to the front
/// of `metric.resource`. Returns the values of the tags that were found.
pub fn apply_prepend_tags(
    descriptor: &mut Descriptor,
    prepend_tags: &[String],
) -> MergeResult<Vec<String>> {
    let mut values = Vec::new();

    for tag in prepend_tags {
        if let Some(value) = descriptor.tag(tag)? {
            values.push(value);
            descriptor.prepend_resource(tag_placeholder(tag))?;
        }
    }

    Ok(values)
}

/// Build the grouping key for a descriptor.
///
/// `source|name|<prepend values>` followed directly by the discovered name.
/// A missing `source` is empty and a missing `name` falls back to `source`.
pub fn grouping_key(descriptor: &Descriptor, prepend_values: &[String]) -> MergeResult<String> {
    let discovered_name = descriptor.discovered_name()?;
    let source = descriptor.tag("source")?.unwrap_or_default();
    let name = descriptor.tag("name")?.unwrap_or_else(|| source.clone());

    Ok(format!(
        "{}|{}|{}{}",
        source,
        name,
        prepend_values.join("|"),
        discovered_name
    ))
}

/// Group descriptors by key, preserving first-seen key order.
pub fn group_descriptors(
    descriptors: Vec<Descriptor>,
    prepend_tags: &[String],
) -> MergeResult<Vec<(String, Vec<Descriptor>)>> {
    let mut groups: Vec<(String, Vec<Descriptor>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for mut descriptor in descriptors {
        let prepend_values = apply_prepend_tags(&mut descriptor, prepend_tags)?;
        let key = grouping_key(&descriptor, &prepend_values)?;

        match positions.get(&key) {
            Some(&pos) => groups[pos].1.push(descriptor),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![descriptor]));
            }
        }
    }

    Ok(groups)
}

/// Tag names present on every member.
pub fn common_tags(members: &[Descriptor]) -> MergeResult<BTreeSet<String>> {
    let mut iter = members.iter();
    let mut common = match iter.next() {
        Some(first) => first.tag_names()?,
        None => return Ok(BTreeSet::new()),
    };

    for member in iter {
        let names = member.tag_names()?;
        common.retain(|tag| names.contains(tag));
    }

    Ok(common)
}

/// Common tags whose value is not the same on every member, sorted by name.
pub fn disambiguating_tags(
    members: &[Descriptor],
    common: &BTreeSet<String>,
) -> MergeResult<Vec<String>> {
    let mut tags = Vec::new();

    for tag in common {
        let mut values: Vec<&Value> = Vec::with_capacity(members.len());
        for member in members {
            if let Some(value) = member.tag_value(tag)? {
                values.push(value);
            }
        }

        if let Some((first, rest)) = values.split_first() {
            if rest.iter().any(|v| v != first) {
                tags.push(tag.clone());
            }
        }
    }

    Ok(tags)
}

/// Split groups into unique descriptors and collision groups.
///
/// Unique descriptors are enabled; colliding ones are left untouched.
pub fn partition(groups: Vec<(String, Vec<Descriptor>)>) -> MergeResult<MergeOutcome> {
    let mut outcome = MergeOutcome::default();

    for (key, mut members) in groups {
        if members.len() > 1 {
            let common = common_tags(&members)?;
            let disambiguating = disambiguating_tags(&members, &common)?;
            debug!(
                "Collision on {} ({} descriptors, common tags: {:?})",
                key,
                members.len(),
                common
            );

            outcome.collisions.push(CollisionGroup {
                key,
                common_tags: common,
                disambiguating_tags: disambiguating,
                members,
            });
        } else if let Some(mut descriptor) = members.pop() {
            descriptor.enable();
            outcome.unique.push(descriptor);
        }
    }

    Ok(outcome)
}

/// Group and partition in one step.
pub fn merge(descriptors: Vec<Descriptor>, prepend_tags: &[String]) -> MergeResult<MergeOutcome> {
    let groups = group_descriptors(descriptors, prepend_tags)?;
    partition(groups)
}
