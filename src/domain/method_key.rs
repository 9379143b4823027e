//! Method identity.
//!
//! A method is identified by the pair (owning type, method name). Both halves are
//! opaque host identities, so keys compare and hash on identity, never on the
//! printable names.

use std::collections::hash_map::{self, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ports::HostTypes;

/// Host identity of a type, module, singleton wrapper or inclusion proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub u64);

/// Host identity of an interned method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub u64);

/// Immutable (owner, method) identity of a profiled method.
///
/// `owner == None` is a global/top-level method. The all-`None` key is
/// [`MethodKey::BLANK`]; it names a real method with neither owner nor name.
/// Root calls are not keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MethodKey {
    owner: Option<TypeRef>,
    method: Option<MethodId>,
}

impl MethodKey {
    /// Key of a method with no owner and no name.
    pub const BLANK: MethodKey = MethodKey {
        owner: None,
        method: None,
    };

    /// Build a key, collapsing a mixin-inclusion proxy owner onto its module.
    ///
    /// The rewrite happens here rather than in the resolver because it has to
    /// change table identity: every proxy of the same module must land on one key.
    pub fn new(host: &dyn HostTypes, owner: Option<TypeRef>, method: Option<MethodId>) -> Self {
        let owner = owner.map(|ty| {
            if host.is_mixin_inclusion_proxy(ty) {
                host.target_module_of(ty)
            } else {
                ty
            }
        });
        Self { owner, method }
    }

    pub fn owner(&self) -> Option<TypeRef> {
        self.owner
    }

    pub fn method(&self) -> Option<MethodId> {
        self.method
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::BLANK
    }

    /// Composite identity hash: `(owner << 4) + (method << 2)`.
    #[inline]
    pub fn composite_hash(&self) -> u64 {
        let owner = self.owner.map_or(0, |ty| ty.0);
        let method = self.method.map_or(0, |m| m.0);
        (owner << 4).wrapping_add(method << 2)
    }
}

impl Hash for MethodKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.composite_hash());
    }
}

// ============================================================================
// MethodTable - hash table keyed by MethodKey
// ============================================================================

/// Table keyed by [`MethodKey`].
///
/// Used as the session's method registry (values are node handles) and as each
/// node's caller/callee edge index (values are edge handles keyed by the peer).
/// The table never owns the nodes or edges its values point at.
#[derive(Debug, Clone)]
pub struct MethodTable<V> {
    entries: HashMap<MethodKey, V>,
}

impl<V> Default for MethodTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> MethodTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, replacing and returning any previous value.
    ///
    /// Get-or-create callers must check [`lookup`](Self::lookup) first.
    pub fn insert(&mut self, key: MethodKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn lookup(&self, key: &MethodKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &MethodKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MethodKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, MethodKey, V> {
        self.entries.iter()
    }

    /// Drop every entry. Values are handles, so nothing they point at is freed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V: Copy> MethodTable<V> {
    pub fn get(&self, key: &MethodKey) -> Option<V> {
        self.entries.get(key).copied()
    }
}
