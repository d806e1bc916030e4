//! Hierarchical gameplay tags and tag containers.
//!
//! A [`GameplayTag`] is a dot-separated label such as `State.Debuff.Stunned`.
//! Tags form a hierarchy: `State.Debuff.Stunned` matches `State.Debuff` and
//! `State`, but not the other way round.
//!
//! # Key Types
//!
//! - [`GameplayTag`] - A validated, cheaply clonable tag name
//! - [`TagContainer`] - An ordered set of tags with exact and hierarchical queries
//! - [`TagRequirements`] - Required and ignored tags checked against a container

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator between tag segments.
const SEPARATOR: char = '.';

/// A hierarchical gameplay tag.
///
/// Cloning a tag is cheap (the name is reference counted).
///
/// # Example
///
/// ```
/// use ability_tasks_core::GameplayTag;
///
/// let stunned = GameplayTag::new("State.Debuff.Stunned").unwrap();
/// let debuff = GameplayTag::new("State.Debuff").unwrap();
///
/// assert!(stunned.matches(&debuff));
/// assert!(!debuff.matches(&stunned));
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameplayTag {
    name: Arc<str>,
}

impl GameplayTag {
    /// Create a tag, validating its name.
    ///
    /// Names are one or more non-empty segments separated by `.`; segments
    /// may contain ASCII letters, digits and `_`.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        validate(name)?;
        Ok(Self { name: name.into() })
    }

    /// The full tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of segments in the tag.
    pub fn depth(&self) -> usize {
        self.name.split(SEPARATOR).count()
    }

    /// Returns `true` if this tag equals `other` or is a descendant of it.
    pub fn matches(&self, other: &GameplayTag) -> bool {
        let name = self.name.as_bytes();
        let prefix = other.name.as_bytes();
        name == prefix
            || (name.len() > prefix.len()
                && name.starts_with(prefix)
                && name[prefix.len()] == SEPARATOR as u8)
    }

    /// The direct parent tag, if this tag has more than one segment.
    pub fn parent(&self) -> Option<GameplayTag> {
        self.name.rfind(SEPARATOR).map(|index| Self {
            name: self.name[..index].into(),
        })
    }

    /// Iterate over all ancestors, nearest first.
    pub fn parents(&self) -> impl Iterator<Item = GameplayTag> + use<> {
        std::iter::successors(self.parent(), GameplayTag::parent)
    }
}

fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_tag(name, "tag name is empty"));
    }
    for segment in name.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(Error::invalid_tag(name, "tag name has an empty segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::invalid_tag(
                name,
                "tag segments may only contain ASCII letters, digits and '_'",
            ));
        }
    }
    Ok(())
}

impl FromStr for GameplayTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for GameplayTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GameplayTag> for String {
    fn from(tag: GameplayTag) -> Self {
        tag.name.to_string()
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameplayTag({})", self.name)
    }
}

/// An ordered set of gameplay tags.
///
/// Methods without the `_exact` suffix use hierarchical matching: a container
/// holding `State.Debuff.Stunned` "has" `State.Debuff`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagContainer {
    tags: BTreeSet<GameplayTag>,
}

impl TagContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container holding a single tag.
    pub fn single(tag: GameplayTag) -> Self {
        let mut container = Self::new();
        container.add_tag(tag);
        container
    }

    /// Add a tag. Returns `true` if it was not present.
    pub fn add_tag(&mut self, tag: GameplayTag) -> bool {
        self.tags.insert(tag)
    }

    /// Remove a tag. Returns `true` if it was present.
    pub fn remove_tag(&mut self, tag: &GameplayTag) -> bool {
        self.tags.remove(tag)
    }

    /// Remove every tag.
    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayTag> {
        self.tags.iter()
    }

    /// Returns `true` if any held tag matches `tag` hierarchically.
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.tags.iter().any(|held| held.matches(tag))
    }

    /// Returns `true` if `tag` itself is held.
    pub fn has_tag_exact(&self, tag: &GameplayTag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns `true` if any tag of `other` is matched. False for an empty `other`.
    pub fn has_any(&self, other: &TagContainer) -> bool {
        other.iter().any(|tag| self.has_tag(tag))
    }

    /// Returns `true` if every tag of `other` is matched. True for an empty `other`.
    pub fn has_all(&self, other: &TagContainer) -> bool {
        other.iter().all(|tag| self.has_tag(tag))
    }

    pub fn has_any_exact(&self, other: &TagContainer) -> bool {
        other.iter().any(|tag| self.has_tag_exact(tag))
    }

    pub fn has_all_exact(&self, other: &TagContainer) -> bool {
        other.iter().all(|tag| self.has_tag_exact(tag))
    }
}

impl FromIterator<GameplayTag> for TagContainer {
    fn from_iter<I: IntoIterator<Item = GameplayTag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl Extend<GameplayTag> for TagContainer {
    fn extend<I: IntoIterator<Item = GameplayTag>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

impl<'a> IntoIterator for &'a TagContainer {
    type Item = &'a GameplayTag;
    type IntoIter = std::collections::btree_set::Iter<'a, GameplayTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// Tags that must and must not be present on a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagRequirements {
    /// Every one of these must be matched.
    pub require: TagContainer,
    /// None of these may be matched.
    pub ignore: TagContainer,
}

impl TagRequirements {
    /// Returns `true` if there is nothing to check.
    pub fn is_empty(&self) -> bool {
        self.require.is_empty() && self.ignore.is_empty()
    }

    /// Check the requirements against a container.
    pub fn requirements_met(&self, container: &TagContainer) -> bool {
        container.has_all(&self.require) && !container.has_any(&self.ignore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name).unwrap()
    }

    #[test]
    fn test_tag_validation() {
        assert!(GameplayTag::new("Ability.Fire_Ball2").is_ok());
        assert!(GameplayTag::new("").is_err());
        assert!(GameplayTag::new("State..Stunned").is_err());
        assert!(GameplayTag::new("State.").is_err());
        assert!(GameplayTag::new("State.Stun ned").is_err());
    }

    #[test]
    fn test_hierarchical_match() {
        let stunned = tag("State.Debuff.Stunned");
        assert!(stunned.matches(&tag("State.Debuff.Stunned")));
        assert!(stunned.matches(&tag("State.Debuff")));
        assert!(stunned.matches(&tag("State")));
        assert!(!stunned.matches(&tag("State.Deb")));
        assert!(!tag("State").matches(&stunned));
    }

    #[test]
    fn test_parents_nearest_first() {
        let parents: Vec<_> = tag("A.B.C").parents().collect();
        assert_eq!(parents, vec![tag("A.B"), tag("A")]);
        assert_eq!(tag("A").parent(), None);
        assert_eq!(tag("A.B.C").depth(), 3);
    }

    #[test]
    fn test_container_queries() {
        let container: TagContainer = [tag("State.Debuff.Stunned"), tag("Team.Red")]
            .into_iter()
            .collect();

        assert!(container.has_tag(&tag("State.Debuff")));
        assert!(!container.has_tag_exact(&tag("State.Debuff")));
        assert!(container.has_tag_exact(&tag("Team.Red")));

        let wanted: TagContainer = [tag("State"), tag("Team.Blue")].into_iter().collect();
        assert!(container.has_any(&wanted));
        assert!(!container.has_all(&wanted));
        assert!(!container.has_any_exact(&wanted));
        assert!(container.has_all(&TagContainer::new()));
        assert!(!container.has_any(&TagContainer::new()));
    }

    #[test]
    fn test_requirements() {
        let owned: TagContainer = [tag("State.Burning"), tag("Team.Red")].into_iter().collect();

        let requirements = TagRequirements {
            require: TagContainer::single(tag("Team.Red")),
            ignore: TagContainer::single(tag("State.Immune")),
        };
        assert!(requirements.requirements_met(&owned));

        let blocked = TagRequirements {
            require: TagContainer::new(),
            ignore: TagContainer::single(tag("State")),
        };
        assert!(!blocked.requirements_met(&owned));
        assert!(TagRequirements::default().requirements_met(&owned));
    }

    #[test]
    fn test_tag_deserialize_rejects_invalid_names() {
        #[derive(Deserialize)]
        struct Doc {
            tags: TagContainer,
        }

        let doc: Doc = toml::from_str(r#"tags = ["State.Stunned", "Team.Red"]"#).unwrap();
        assert_eq!(doc.tags.len(), 2);

        assert!(toml::from_str::<Doc>(r#"tags = ["State..Stunned"]"#).is_err());
    }
}
