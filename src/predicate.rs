//!
//! Selective-receive filters over event records.
//!

use crate::event::{EventRecord, Tag};

/// Upper bound of tags a [`Predicate::Tags`] filter can hold.
pub const MAX_TAGS: usize = 3;

///
/// A pure boolean filter over an [`EventRecord`], used only for
/// selection, never for mutation.
///
/// Predicates are a closed set of variants rather than an open trait:
/// match anything, match nothing, or match if the record's tag is one of
/// up to three given tags.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every event.
    Any,
    /// Matches no event.
    None,
    /// Matches events whose tag equals one of the stored tags.
    Tags { tags: [Tag; MAX_TAGS], len: usize },
}

impl Predicate {
    /// A predicate matching events with the given tag.
    #[must_use]
    pub fn tag(tag: Tag) -> Predicate {
        Predicate::Tags {
            tags: [tag, 0, 0],
            len: 1,
        }
    }

    ///
    /// A predicate matching events whose tag is contained in `tags`.
    ///
    /// # Panics
    ///
    /// Panics if `tags` is empty or holds more than [`MAX_TAGS`] entries.
    ///
    #[must_use]
    pub fn tags(tags: &[Tag]) -> Predicate {
        assert!(
            !tags.is_empty() && tags.len() <= MAX_TAGS,
            "a tag predicate holds between 1 and {MAX_TAGS} tags"
        );
        let mut stored = [0; MAX_TAGS];
        stored[..tags.len()].copy_from_slice(tags);
        Predicate::Tags {
            tags: stored,
            len: tags.len(),
        }
    }

    /// Applies the filter to an event record.
    #[must_use]
    pub fn matches(&self, event: &EventRecord) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::None => false,
            Predicate::Tags { tags, len } => tags[..*len].contains(&event.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Payload};
    use crate::time::SimTime;

    fn record(tag: Tag) -> EventRecord {
        EventRecord {
            id: 0,
            kind: EventKind::Send,
            time: SimTime::ZERO,
            src: 0,
            dest: Some(0),
            tag,
            payload: Payload::Empty,
        }
    }

    #[test]
    fn any_and_none() {
        assert!(Predicate::Any.matches(&record(42)));
        assert!(!Predicate::None.matches(&record(42)));
    }

    #[test]
    fn tag_sets() {
        let p = Predicate::tags(&[3, 7]);
        assert!(p.matches(&record(3)));
        assert!(p.matches(&record(7)));
        assert!(!p.matches(&record(8)));

        assert!(Predicate::tag(5).matches(&record(5)));
        assert!(!Predicate::tag(5).matches(&record(6)));
    }

    #[test]
    #[should_panic = "between 1 and"]
    fn oversized_tag_sets_are_rejected() {
        let _ = Predicate::tags(&[1, 2, 3, 4]);
    }
}
