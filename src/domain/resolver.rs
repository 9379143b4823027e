//! Canonical source identity.
//!
//! Singleton wrappers and inclusion proxies are implementation artifacts; the
//! resolver walks them back to the type or module a programmer wrote the
//! method on, and records which collapses it applied so reports can still
//! tell instance methods, type-level methods and mixed-in methods apart.

use bitflags::bitflags;
use tracing::trace;

use crate::domain::method_key::{MethodId, TypeRef};
use crate::ports::{Attached, HostTypes};

bitflags! {
    /// Wrapper/proxy transformations collapsed while resolving an owner.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Relation: u8 {
        /// Went through a mixin-inclusion proxy.
        const MODULE_INCLUDEE = 1 << 0;
        /// Went through the singleton of a class or module.
        const MODULE_SINGLETON = 1 << 1;
        /// Went through the singleton of an instance.
        const OBJECT_SINGLETON = 1 << 2;
    }
}

/// Result of resolving one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub owner: Option<TypeRef>,
    pub relation: Relation,
}

const GLOBAL: &str = "[global]";
const NO_METHOD: &str = "[no method]";

/// Walk `owner` through singleton wrappers and inclusion proxies.
///
/// Terminates because each step moves to a supertype or a proxy's module,
/// and the host hierarchy is acyclic.
pub fn resolve_source_owner(host: &dyn HostTypes, owner: Option<TypeRef>) -> Resolved {
    let mut current = owner;
    let mut relation = Relation::empty();

    while let Some(ty) = current {
        if host.is_singleton_wrapper(ty) {
            match host.wrapped_entity_of(ty) {
                Attached::Class(attached) | Attached::Module(attached) => {
                    relation |= Relation::MODULE_SINGLETON;
                    current = Some(attached);
                }
                // Step up from the wrapper, not the instance, so we never land
                // on an inclusion proxy in the instance's ancestry.
                Attached::Object | Attached::Other => {
                    relation |= Relation::OBJECT_SINGLETON;
                    current = host.supertype_of(ty);
                }
            }
        } else if host.is_mixin_inclusion_proxy(ty) {
            relation |= Relation::MODULE_INCLUDEE;
            current = Some(host.target_module_of(ty));
        } else {
            break;
        }
    }

    trace!(?owner, resolved = ?current, ?relation, "resolved source owner");
    Resolved {
        owner: current,
        relation,
    }
}

/// Display name of a raw (unresolved) owner.
pub fn owner_display_name(host: &dyn HostTypes, owner: Option<TypeRef>) -> String {
    let Some(ty) = owner else {
        return GLOBAL.to_string();
    };

    if host.is_module(ty) {
        host.namespaced_name_of(ty)
    } else if host.is_singleton_wrapper(ty) {
        singleton_display_name(host, ty)
    } else if host.is_class(ty) {
        host.namespaced_name_of(ty)
    } else {
        host.inspect(ty)
    }
}

fn singleton_display_name(host: &dyn HostTypes, ty: TypeRef) -> String {
    match host.wrapped_entity_of(ty) {
        Attached::Class(attached) => format!("<Class::{}>", host.namespaced_name_of(attached)),
        Attached::Module(attached) => format!("<Module::{}>", host.namespaced_name_of(attached)),
        Attached::Object => match host.supertype_of(ty) {
            Some(sup) => format!("<Object::{}>", host.namespaced_name_of(sup)),
            None => host.inspect(ty),
        },
        Attached::Other => host.inspect(ty),
    }
}

pub fn method_display_name(host: &dyn HostTypes, method: Option<MethodId>) -> String {
    match method {
        Some(id) => host.method_name_of(id),
        None => NO_METHOD.to_string(),
    }
}

/// `Owner#method`.
pub fn full_name(host: &dyn HostTypes, owner: Option<TypeRef>, method: Option<MethodId>) -> String {
    format!(
        "{}#{}",
        owner_display_name(host, owner),
        method_display_name(host, method)
    )
}

/// Path-safe name for call-tree exports, e.g. `Outer/Inner::*^run`.
///
/// `*` marks an object singleton, `^` a class/module singleton.
pub fn call_tree_name(host: &dyn HostTypes, resolved: &Resolved, method: Option<MethodId>) -> String {
    let owner = match resolved.owner {
        Some(ty) => host.namespaced_name_of(ty),
        None => GLOBAL.to_string(),
    };

    let mut result = owner.split("::").collect::<Vec<_>>().join("/");
    result.push_str("::");
    if resolved.relation.contains(Relation::OBJECT_SINGLETON) {
        result.push('*');
    }
    if resolved.relation.contains(Relation::MODULE_SINGLETON) {
        result.push('^');
    }
    result.push_str(&method_display_name(host, method));
    result
}
