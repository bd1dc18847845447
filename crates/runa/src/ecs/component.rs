//! # Component: Typed Data Modules
//!
//! A component is plain data plus an identifier string that entity type files
//! use to refer to it. Components are created empty (`Default`) and then
//! populated exactly once from the JSON node found under their identifier.
//!
//! ## Concrete and Abstract Kinds
//!
//! Kinds are at most one level deep. A *concrete* kind has an identifier and
//! can be instantiated. An *abstract* kind has neither; it names a capability
//! shared by several concrete kinds, which each embed the abstract kind's
//! [`Shared`](AbstractComponent::Shared) fragment by value:
//!
//! ```text
//! Creature (abstract, Shared = Vitals)
//!   ├── Wolfish  { vitals: Vitals, howl }     "wolfish"
//!   └── Birdlike { vitals: Vitals, wingspan } "birdlike"
//! ```
//!
//! Asking an entity for `Creature` matches whichever specialization it holds.
//!
//! ## Declaring Components
//!
//! ```ignore
//! #[derive(Debug, Default, Deserialize)]
//! struct Lifetime { maximum: u64 }
//! impl_component!(Lifetime, "lifetime");
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Wolfish { #[serde(flatten)] vitals: Vitals, howl: u32 }
//! impl_component!(Wolfish, "wolfish", extends Creature => vitals);
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DataShapeError;

/// Type-erasure helpers, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Object-safe behaviour of a component instance.
///
/// Usually implemented through [`impl_component!`](crate::impl_component).
pub trait Component: AsAny + Send + Sync + fmt::Debug {
    /// Identifier of this instance's concrete kind.
    fn identifier(&self) -> &'static str;

    /// Fill an empty instance from its data node. Calling this twice on the
    /// same instance is not supported.
    fn populate(&mut self, node: &Value) -> Result<(), DataShapeError>;

    /// The abstract kind's data fragment embedded in this component, if any.
    fn shared(&self) -> Option<&dyn Any> {
        None
    }

    fn shared_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// A concrete, instantiable component kind.
pub trait ComponentKind: Component + Default {
    /// Unique identifier used as the key in entity type files.
    const IDENTIFIER: &'static str;

    /// The abstract kind this kind specializes, if any.
    fn base() -> Option<KindInfo> {
        None
    }
}

/// A component kind that is never instantiated itself and only serves as a
/// query criterion matching all of its specializations.
pub trait AbstractComponent: 'static {
    /// Data every specialization embeds by value.
    type Shared: Any;
}

/// Runtime name of a component kind (or of any type a caller asks about).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindInfo {
    type_id: TypeId,
    name: &'static str,
}

impl KindInfo {
    pub fn of<K: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            name: std::any::type_name::<K>(),
        }
    }

    pub fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Fully-qualified type name, for diagnostics.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(self) -> &'static str {
        short_type_name(self.name)
    }
}

impl fmt::Debug for KindInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindInfo({})", self.name)
    }
}

/// Deserialize a component from its data node. The population step generated
/// by [`impl_component!`](crate::impl_component) delegates here.
pub fn deserialize_node<T: DeserializeOwned>(node: &Value) -> Result<T, DataShapeError> {
    Ok(T::deserialize(node)?)
}

/// Downcast an erased component to its concrete type.
pub fn downcast_ref<T: ComponentKind>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

pub fn downcast_mut<T: ComponentKind>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

/// Strip the module path from a type name (`game::Wolfish` → `Wolfish`).
/// Generic arguments are left alone.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.find('<').map_or(full, |angle| &full[..angle]);
    let start = head.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// Implement [`Component`] and [`ComponentKind`] for a `Deserialize + Default`
/// struct.
///
/// The second form declares the abstract kind the component specializes and
/// the field holding that kind's shared fragment.
#[macro_export]
macro_rules! impl_component {
    ($ty:ty, $id:literal) => {
        impl $crate::ecs::component::Component for $ty {
            fn identifier(&self) -> &'static str {
                $id
            }

            fn populate(
                &mut self,
                node: &$crate::serde_json::Value,
            ) -> ::std::result::Result<(), $crate::error::DataShapeError> {
                *self = $crate::ecs::component::deserialize_node(node)?;
                Ok(())
            }
        }

        impl $crate::ecs::component::ComponentKind for $ty {
            const IDENTIFIER: &'static str = $id;
        }
    };
    ($ty:ty, $id:literal, extends $base:ty => $field:ident) => {
        impl $crate::ecs::component::Component for $ty {
            fn identifier(&self) -> &'static str {
                $id
            }

            fn populate(
                &mut self,
                node: &$crate::serde_json::Value,
            ) -> ::std::result::Result<(), $crate::error::DataShapeError> {
                *self = $crate::ecs::component::deserialize_node(node)?;
                Ok(())
            }

            fn shared(&self) -> Option<&dyn ::std::any::Any> {
                let shared: &<$base as $crate::ecs::component::AbstractComponent>::Shared =
                    &self.$field;
                Some(shared as &dyn ::std::any::Any)
            }

            fn shared_mut(&mut self) -> Option<&mut dyn ::std::any::Any> {
                let shared: &mut <$base as $crate::ecs::component::AbstractComponent>::Shared =
                    &mut self.$field;
                Some(shared as &mut dyn ::std::any::Any)
            }
        }

        impl $crate::ecs::component::ComponentKind for $ty {
            const IDENTIFIER: &'static str = $id;

            fn base() -> Option<$crate::ecs::component::KindInfo> {
                Some($crate::ecs::component::KindInfo::of::<$base>())
            }
        }
    };
}
