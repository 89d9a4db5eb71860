//! Sections: named anchor regions in page order

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::error::SectionError;

/// Identifier of a section (the element id it is anchored on; cheap to clone)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(Rc<str>);

impl SectionId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Rc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragment link for this section (`#about`)
    pub fn href(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for SectionId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SectionId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// A section and its position in page order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub order: usize,
}

/// The fixed, ordered set of sections a tracker follows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionList {
    sections: Vec<Section>,
}

impl SectionList {
    /// Build from ids in page order; ids must be non-empty and unique
    pub fn new<I, S>(ids: I) -> Result<Self, SectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut sections = Vec::new();

        for (order, id) in ids.into_iter().enumerate() {
            let id = id.as_ref().trim_start_matches('#');
            if id.is_empty() {
                return Err(SectionError::EmptyId(order));
            }
            if !seen.insert(id.to_string()) {
                return Err(SectionError::Duplicate(id.to_string()));
            }
            sections.push(Section {
                id: SectionId::new(id),
                order,
            });
        }

        Ok(Self { sections })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.iter().map(|s| &s.id)
    }
}

impl<'a> IntoIterator for &'a SectionList {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_hash_prefix() {
        let list = SectionList::new(["#about", "projects", "#connect"]).unwrap();
        assert_eq!(list.len(), 3);

        let ids: Vec<&str> = list.ids().map(SectionId::as_str).collect();
        assert_eq!(ids, vec!["about", "projects", "connect"]);
        assert_eq!(list.get("connect").map(|s| s.order), Some(2));
        assert_eq!(list.get("connect").unwrap().id.href(), "#connect");
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert_eq!(
            SectionList::new(["about", "#about"]),
            Err(SectionError::Duplicate("about".into()))
        );
        assert_eq!(SectionList::new(["about", "#"]), Err(SectionError::EmptyId(1)));
    }
}
