//! Quality variant selection.

use crate::platform::PlaybackVariant;

/// Outcome of matching the operator's quality target against a variant list.
#[derive(Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    /// A variant matched the target
    Exact(&'a PlaybackVariant),
    /// Nothing matched; the first returned variant is used instead
    Fallback {
        chosen: &'a PlaybackVariant,
        available: Vec<String>,
    },
    /// The stream offered no variants at all
    Empty,
}

impl<'a> Selection<'a> {
    pub fn variant(&self) -> Option<&'a PlaybackVariant> {
        match self {
            Selection::Exact(v) => Some(v),
            Selection::Fallback { chosen, .. } => Some(chosen),
            Selection::Empty => None,
        }
    }
}

/// The part of `target` before the first `p` (`"1080p60"` -> `"1080"`).
pub fn target_prefix(target: &str) -> &str {
    target.split('p').next().unwrap_or_default()
}

/// Picks the variant whose resolution ends with, or label starts with, the target prefix.
///
/// No ranking is done: list order as returned by the platform decides ties and the fallback.
pub fn select_variant<'a>(variants: &'a [PlaybackVariant], target: &str) -> Selection<'a> {
    let Some(first) = variants.first() else {
        return Selection::Empty;
    };

    let prefix = target_prefix(target);
    if !prefix.is_empty() {
        let found = variants.iter().find(|v| {
            v.resolution.as_deref().is_some_and(|r| r.ends_with(prefix)) || v.label.starts_with(prefix)
        });
        if let Some(found) = found {
            return Selection::Exact(found);
        }
    }

    Selection::Fallback {
        chosen: first,
        available: variants.iter().map(|v| v.label.clone()).collect(),
    }
}
