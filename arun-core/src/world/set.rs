use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::acode::Aint;

/// Set of integers or instances, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    members: Vec<Aint>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_members(members: impl IntoIterator<Item = Aint>) -> Self {
        let mut set = Self::new();
        for member in members {
            set.add(member);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: Aint) -> bool {
        self.members.contains(&member)
    }

    pub fn add(&mut self, member: Aint) {
        if !self.contains(member) {
            self.members.push(member);
        }
    }

    pub fn remove(&mut self, member: Aint) {
        if let Some(pos) = self.members.iter().position(|m| *m == member) {
            self.members.remove(pos);
        }
    }

    /// Member by 1-based index.
    pub fn member(&self, index: Aint) -> Option<Aint> {
        if index < 1 {
            return None;
        }
        self.members.get(index as usize - 1).copied()
    }

    pub fn union(&self, other: &Set) -> Set {
        let mut result = self.clone();
        for member in &other.members {
            result.add(*member);
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = Aint> + '_ {
        self.members.iter().copied()
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.members.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn members_are_unique_and_ordered() {
        let mut set = Set::from_members([3, 1, 3, 2]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(set.member(1), Some(3));
        assert_eq!(set.member(0), None);
        assert_eq!(set.member(4), None);

        set.remove(1);
        assert_eq!(set.to_string(), "{3, 2}");
    }

    #[test]
    fn union_keeps_left_order() {
        let a = Set::from_members([1, 2]);
        let b = Set::from_members([2, 5]);
        assert_eq!(a.union(&b), Set::from_members([1, 2, 5]));
    }
}
