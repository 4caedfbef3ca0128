use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Case-insensitive identifier: keeps the original spelling for display and a
/// lower-cased form for every comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Name {
    pub o: String,
    pub l: String,
}

impl Name {
    pub fn new(s: &str) -> Self {
        Name {
            o: s.to_string(),
            l: s.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.o.is_empty()
    }

    pub fn eq_str(&self, other: &str) -> bool {
        self.l == other.to_lowercase()
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.l == other.l
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.l.hash(state);
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_case_insensitive_eq() {
        let a = Name::new("UserName");
        assert_eq!(a, Name::new("username"));
        assert_eq!(a.o, "UserName");
        assert!(a.eq_str("USERNAME"));
        let set: HashSet<Name> = [Name::new("Idx"), Name::new("IDX")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
