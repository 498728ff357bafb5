use std::fmt;

macro_rules! rowid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

rowid_newtype!(FolderId);
rowid_newtype!(VideoId);
rowid_newtype!(ClipId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_raw_value() {
        let id = VideoId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(ClipId::new(1) < ClipId::new(2));
    }
}
