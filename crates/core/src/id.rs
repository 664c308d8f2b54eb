// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed ID newtypes.
//!
//! Every persistent entity gets a prefixed nanoid: a 4-character type tag
//! followed by 20 random characters. IDs are stored inline (no heap) so
//! they stay `Copy` and cheap to pass through event envelopes.

/// Byte capacity of an inline ID (4-char prefix + 20-char nanoid).
pub const ID_CAPACITY: usize = 24;

/// Fixed-size inline ID buffer. Always ASCII, at most [`ID_CAPACITY`] bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdBuf {
    len: u8,
    buf: [u8; ID_CAPACITY],
}

impl IdBuf {
    pub const fn empty() -> Self {
        Self { len: 0, buf: [0; ID_CAPACITY] }
    }

    /// Build from a string, truncating anything past [`ID_CAPACITY`] bytes.
    pub fn new(s: &str) -> Self {
        debug_assert!(s.len() <= ID_CAPACITY, "ID exceeds {ID_CAPACITY} bytes: {s:?}");
        let len = s.len().min(ID_CAPACITY);
        let mut buf = [0u8; ID_CAPACITY];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, buf }
    }

    pub fn as_str(&self) -> &str {
        // Only constructed from &str, so the bytes are valid UTF-8.
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash the active bytes only so Borrow<str> lookups agree.
        self.as_str().hash(state);
    }
}

impl PartialOrd for IdBuf {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdBuf {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() > ID_CAPACITY {
            return Err(serde::de::Error::custom(format!(
                "ID exceeds {ID_CAPACITY} bytes: {s:?}"
            )));
        }
        Ok(IdBuf::new(&s))
    }
}

/// Define an ID newtype over [`IdBuf`] with a 4-character type prefix.
///
/// Generates `generate()` (fresh random ID), `from_string()`, `as_str()`,
/// `short()`, plus `Display`, `From<&str>/<String>`, `PartialEq<str>`,
/// `Borrow<str>`, and `Deref<Target = str>`.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $crate::id::IdBuf);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh random ID with the type prefix.
            pub fn generate() -> Self {
                Self($crate::id::IdBuf::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(20)
                )))
            }

            /// Wrap an existing string (parsing, deserialization, test fixtures).
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::IdBuf::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// First `n` characters after the prefix, for display.
            pub fn short(&self, n: usize) -> &str {
                let suffix = self.0.as_str().strip_prefix(Self::PREFIX).unwrap_or(self.0.as_str());
                &suffix[..n.min(suffix.len())]
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

define_id! {
    /// A single execution attempt of a worker CLI.
    pub struct RunId("run-");
}

define_id! {
    /// One line in a run's events.jsonl.
    pub struct EventId("evt-");
}

define_id! {
    /// A project under work/projects/.
    pub struct ProjectId("prj-");
}

define_id! {
    /// An org agent (worker, manager, director, ceo).
    pub struct AgentId("agt-");
}

define_id! {
    /// A team under org/teams/.
    pub struct TeamId("team");
}

define_id! {
    /// A task markdown file under a project.
    pub struct TaskId("tsk-");
}

define_id! {
    /// A governed artifact markdown file.
    pub struct ArtifactId("art-");
}

define_id! {
    /// An append-only approval record under inbox/reviews/.
    pub struct ReviewId("rev-");
}

define_id! {
    /// A live event subscription on the RPC server.
    pub struct SubscriptionId("sub-");
}

define_id! {
    /// A comment record written by a heartbeat action.
    pub struct CommentId("com-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
