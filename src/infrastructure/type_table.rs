/// Static Host Type Table
///
/// A host type system described as data. Backs replayed traces and doubles as
/// the fake hierarchy in tests.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::method_key::{MethodId, TypeRef};
use crate::domain::resolver;
use crate::ports::{Attached, HostTypes};

/// Shape of one host type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    Class {
        name: String,
        #[serde(default)]
        superclass: Option<TypeRef>,
    },
    Module {
        name: String,
    },
    Singleton {
        attached: Attached,
        #[serde(default)]
        superclass: Option<TypeRef>,
    },
    IncludeProxy {
        module: TypeRef,
        #[serde(default)]
        superclass: Option<TypeRef>,
    },
    Other {
        description: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    pub id: TypeRef,
    #[serde(flatten)]
    pub shape: TypeShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodEntry {
    pub id: MethodId,
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct StaticTypeTable {
    types: HashMap<TypeRef, TypeShape>,
    methods: HashMap<MethodId, String>,
    next_id: u64,
}

impl StaticTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(types: &[TypeEntry], methods: &[MethodEntry]) -> Self {
        let mut table = Self::new();
        for entry in types {
            table.insert(entry.id, entry.shape.clone());
        }
        for entry in methods {
            table.next_id = table.next_id.max(entry.id.0);
            table.methods.insert(entry.id, entry.name.clone());
        }
        table
    }

    pub fn insert(&mut self, id: TypeRef, shape: TypeShape) {
        self.next_id = self.next_id.max(id.0);
        self.types.insert(id, shape);
    }

    pub fn add_class(&mut self, name: &str, superclass: Option<TypeRef>) -> TypeRef {
        self.push(TypeShape::Class {
            name: name.to_string(),
            superclass,
        })
    }

    pub fn add_module(&mut self, name: &str) -> TypeRef {
        self.push(TypeShape::Module {
            name: name.to_string(),
        })
    }

    pub fn add_singleton(&mut self, attached: Attached, superclass: Option<TypeRef>) -> TypeRef {
        self.push(TypeShape::Singleton { attached, superclass })
    }

    pub fn add_include_proxy(&mut self, module: TypeRef, superclass: Option<TypeRef>) -> TypeRef {
        self.push(TypeShape::IncludeProxy { module, superclass })
    }

    pub fn add_other(&mut self, description: &str) -> TypeRef {
        self.push(TypeShape::Other {
            description: description.to_string(),
        })
    }

    /// Intern a method name; the same name always yields the same id.
    pub fn intern_method(&mut self, name: &str) -> MethodId {
        if let Some(id) = self.find_method(name) {
            return id;
        }
        self.next_id += 1;
        let id = MethodId(self.next_id);
        self.methods.insert(id, name.to_string());
        id
    }

    pub fn find_method(&self, name: &str) -> Option<MethodId> {
        self.methods
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Class or module with the given namespaced name.
    pub fn find_type(&self, name: &str) -> Option<TypeRef> {
        self.types.iter().find_map(|(id, shape)| match shape {
            TypeShape::Class { name: n, .. } | TypeShape::Module { name: n } if n == name => Some(*id),
            _ => None,
        })
    }

    /// Every host identity whose full name is `full_name`.
    ///
    /// Owners match on their display name, so singleton forms such as
    /// `<Class::Foo>#bar` and `<Object::Foo>#x` work too. Several object
    /// singletons can share one display name; all of them are returned.
    /// `[global]` is the absent owner and `[no method]` the absent method.
    pub fn parse_full_name(&self, full_name: &str) -> Vec<(Option<TypeRef>, Option<MethodId>)> {
        let Some((owner, method)) = full_name.rsplit_once('#') else {
            return Vec::new();
        };
        let method = match method {
            "[no method]" => None,
            name => match self.find_method(name) {
                Some(id) => Some(id),
                None => return Vec::new(),
            },
        };
        if owner == "[global]" {
            return vec![(None, method)];
        }

        let mut owners: Vec<TypeRef> = self
            .types
            .keys()
            .copied()
            .filter(|ty| resolver::owner_display_name(self, Some(*ty)) == owner)
            .collect();
        owners.sort();
        owners.into_iter().map(|ty| (Some(ty), method)).collect()
    }

    fn push(&mut self, shape: TypeShape) -> TypeRef {
        self.next_id += 1;
        let id = TypeRef(self.next_id);
        self.types.insert(id, shape);
        id
    }
}

impl HostTypes for StaticTypeTable {
    fn is_singleton_wrapper(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(&ty), Some(TypeShape::Singleton { .. }))
    }

    fn wrapped_entity_of(&self, ty: TypeRef) -> Attached {
        match self.types.get(&ty) {
            Some(TypeShape::Singleton { attached, .. }) => *attached,
            _ => Attached::Other,
        }
    }

    fn is_mixin_inclusion_proxy(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(&ty), Some(TypeShape::IncludeProxy { .. }))
    }

    fn target_module_of(&self, proxy: TypeRef) -> TypeRef {
        match self.types.get(&proxy) {
            Some(TypeShape::IncludeProxy { module, .. }) => *module,
            _ => proxy,
        }
    }

    fn supertype_of(&self, ty: TypeRef) -> Option<TypeRef> {
        match self.types.get(&ty)? {
            TypeShape::Class { superclass, .. }
            | TypeShape::Singleton { superclass, .. }
            | TypeShape::IncludeProxy { superclass, .. } => *superclass,
            TypeShape::Module { .. } | TypeShape::Other { .. } => None,
        }
    }

    fn namespaced_name_of(&self, ty: TypeRef) -> String {
        match self.types.get(&ty) {
            Some(TypeShape::Class { name, .. }) | Some(TypeShape::Module { name }) => name.clone(),
            _ => self.inspect(ty),
        }
    }

    fn is_module(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(&ty), Some(TypeShape::Module { .. }))
    }

    fn is_class(&self, ty: TypeRef) -> bool {
        matches!(self.types.get(&ty), Some(TypeShape::Class { .. }))
    }

    fn inspect(&self, ty: TypeRef) -> String {
        match self.types.get(&ty) {
            Some(TypeShape::Other { description }) => description.clone(),
            _ => format!("#<Type:{:#x}>", ty.0),
        }
    }

    fn method_name_of(&self, method: MethodId) -> String {
        self.methods
            .get(&method)
            .cloned()
            .unwrap_or_else(|| format!("method_{}", method.0))
    }
}
