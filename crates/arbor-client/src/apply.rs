//! The apply engine: idempotent create-or-update per entity kind.
//!
//! Every apply call evaluates one transition of a two-state machine,
//! Absent or Present, at call time. An entity plan locates the existing
//! object, diffs the desired configuration against it and issues at most
//! one create or modify call. Nothing is persisted between calls.
//!
//! The central distinction throughout is [`Desired`]: "leave this field
//! alone" and "set this field to empty" are different instructions, and
//! conflating them either destroys data or silently skips changes.

use arbor_wire::{ApiResult, Attribute, Outcome};
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::resolver::{Located, PathResolver};
use crate::session::DirectoryClient;

/// A field's desired state relative to the existing object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Desired<T> {
    /// Leave the field as it is; it is omitted from the modify call.
    Unchanged,
    /// Explicitly clear the field by sending it with no values.
    Clear,
    /// Replace the field with this value.
    Set(T),
}

impl<T> Desired<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Desired::Unchanged)
    }
}

impl Desired<String> {
    /// Renders the field as a wire attribute, or nothing for [`Desired::Unchanged`].
    pub fn into_attribute(self, name: &str) -> Option<Attribute> {
        match self {
            Desired::Unchanged => None,
            Desired::Clear => Some(Attribute::empty(name)),
            Desired::Set(value) => Some(Attribute::single(name, value)),
        }
    }
}

impl Desired<Vec<String>> {
    pub fn into_attribute(self, name: &str) -> Option<Attribute> {
        match self {
            Desired::Unchanged => None,
            Desired::Clear => Some(Attribute::empty(name)),
            Desired::Set(values) => Some(Attribute::new(name, values)),
        }
    }
}

/// Diffs a desired scalar against the existing attribute values.
///
/// An attribute absent from the remote object and a desired empty string
/// agree: nothing to do. An absent attribute with a non-empty desired value
/// is a set; a present value with an empty desired one is a clear.
pub fn diff_scalar(desired: &str, existing: Option<&[String]>) -> Desired<String> {
    let current = existing.and_then(|values| values.first()).map(String::as_str);
    match current {
        None => {
            if desired.is_empty() {
                Desired::Unchanged
            } else {
                Desired::Set(desired.to_string())
            }
        }
        Some(current) => {
            if desired == current {
                Desired::Unchanged
            } else if desired.is_empty() {
                Desired::Clear
            } else {
                Desired::Set(desired.to_string())
            }
        }
    }
}

/// Diffs a desired value list against the existing attribute values,
/// comparing as multisets: order does not matter, multiplicity does.
pub fn diff_multiset(desired: &[String], existing: Option<&[String]>) -> Desired<Vec<String>> {
    match existing {
        None => {
            if desired.is_empty() {
                Desired::Unchanged
            } else {
                Desired::Set(desired.to_vec())
            }
        }
        Some(current) => {
            if multiset_eq(desired, current) {
                Desired::Unchanged
            } else if desired.is_empty() {
                Desired::Clear
            } else {
                Desired::Set(desired.to_vec())
            }
        }
    }
}

/// Order-independent equality with multiplicity.
pub fn multiset_eq(left: &[String], right: &[String]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut counts = std::collections::HashMap::<&str, i64>::new();
    for value in left {
        *counts.entry(value.as_str()).or_default() += 1;
    }
    for value in right {
        *counts.entry(value.as_str()).or_default() -= 1;
    }
    counts.values().all(|count| *count == 0)
}

/// The verdict of comparing a desired configuration with an existing object.
#[derive(Debug)]
pub enum Diff<C> {
    /// Nothing differs; no remote call is needed.
    Unchanged,
    /// These fields differ and should be written.
    Changed(C),
    /// The difference cannot be reconciled in place (an immutable field
    /// differs); report the message and take no action.
    Blocked(String),
}

impl<C> Diff<C> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Diff::Unchanged)
    }

    /// The change set, if one was produced.
    pub fn into_change(self) -> Option<C> {
        match self {
            Diff::Changed(change) => Some(change),
            _ => None,
        }
    }
}

/// Per-call switches for the apply engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Report what would change without contacting the server for writes.
    pub check_mode: bool,
    /// Create a new object regardless of whether one already exists.
    pub force: bool,
}

/// Shared collaborators every apply call needs.
pub struct ApplyContext<'a> {
    pub client: &'a DirectoryClient,
    pub resolver: &'a PathResolver,
}

/// One entity kind's contribution to the apply state machine.
///
/// A plan carries the desired configuration with path references already
/// validated. The engine drives it: locate, then either create, diff and
/// modify, or do nothing.
#[async_trait]
pub trait Reconcile {
    /// The located form of the existing object.
    type Existing: Send + Sync;
    /// The computed set of differing fields, fed to `modify`.
    type Change: Send;

    /// A short phrase naming the object, used in logs and warnings.
    fn describe(&self) -> String;

    /// Finds the existing object, if any.
    async fn locate(&self, cx: &ApplyContext<'_>) -> ApiResult<Located<Self::Existing>>;

    /// Compares the desired configuration with the existing object.
    fn diff(&self, existing: &Self::Existing) -> ApiResult<Diff<Self::Change>>;

    async fn create(&self, cx: &ApplyContext<'_>) -> ApiResult<Outcome<Value>>;

    async fn modify(
        &self,
        cx: &ApplyContext<'_>,
        existing: &Self::Existing,
        change: Self::Change,
    ) -> ApiResult<Outcome<Value>>;
}

/// Drives one apply transition.
///
/// Several same-named candidates should be impossible given the sibling
/// uniqueness the directory enforces, but if they do turn up the engine
/// must not guess which one to modify: it reports no change and a warning.
pub async fn reconcile<P>(
    cx: &ApplyContext<'_>,
    plan: &P,
    options: ApplyOptions,
) -> ApiResult<Outcome<Value>>
where
    P: Reconcile + Sync,
{
    match plan.locate(cx).await? {
        Located::Ambiguous(count) => {
            let message = format!(
                "More than one instance of {} was found ({count} matches). No action was taken.",
                plan.describe()
            );
            warn!("{message}");
            Ok(Outcome::unchanged().with_warning(message))
        }
        Located::Absent => {
            if options.check_mode {
                Ok(Outcome::changed())
            } else {
                plan.create(cx).await
            }
        }
        Located::One(_) if options.force => {
            if options.check_mode {
                Ok(Outcome::changed())
            } else {
                plan.create(cx).await
            }
        }
        Located::One(existing) => match plan.diff(&existing)? {
            Diff::Unchanged => Ok(Outcome::unchanged()),
            Diff::Blocked(message) => {
                warn!("{message}");
                Ok(Outcome::unchanged().with_warning(message))
            }
            Diff::Changed(change) => {
                if options.check_mode {
                    Ok(Outcome::changed())
                } else {
                    plan.modify(cx, &existing, change).await
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn scalar_absent_and_desired_empty_agree() {
        assert_eq!(diff_scalar("", None), Desired::Unchanged);
    }

    #[test]
    fn scalar_absent_with_desired_value_is_a_set() {
        assert_eq!(
            diff_scalar("helpdesk", None),
            Desired::Set("helpdesk".to_string())
        );
    }

    #[test]
    fn scalar_matching_value_is_unchanged() {
        let existing = values(&["helpdesk"]);
        assert_eq!(diff_scalar("helpdesk", Some(&existing)), Desired::Unchanged);
    }

    #[test]
    fn scalar_desired_empty_clears_a_present_value() {
        let existing = values(&["helpdesk"]);
        assert_eq!(diff_scalar("", Some(&existing)), Desired::Clear);
    }

    #[test]
    fn scalar_present_but_empty_matches_desired_empty() {
        assert_eq!(diff_scalar("", Some(&[])), Desired::Unchanged);
        assert_eq!(
            diff_scalar("x", Some(&[])),
            Desired::Set("x".to_string())
        );
    }

    #[test]
    fn multiset_comparison_ignores_order_but_not_multiplicity() {
        let existing = values(&["a", "b", "a"]);
        assert_eq!(
            diff_multiset(&values(&["b", "a", "a"]), Some(&existing)),
            Desired::Unchanged
        );
        assert_eq!(
            diff_multiset(&values(&["a", "b"]), Some(&existing)),
            Desired::Set(values(&["a", "b"]))
        );
    }

    #[test]
    fn multiset_desired_empty_clears_present_values() {
        let existing = values(&["a"]);
        assert_eq!(diff_multiset(&[], Some(&existing)), Desired::Clear);
        assert_eq!(diff_multiset(&[], None), Desired::Unchanged);
    }

    #[test]
    fn unchanged_renders_no_attribute() {
        assert_eq!(Desired::<String>::Unchanged.into_attribute("description"), None);
        let cleared = Desired::<String>::Clear
            .into_attribute("description")
            .expect("clear renders an attribute");
        assert!(cleared.values.item.is_empty());
    }
}
