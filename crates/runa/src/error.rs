//! Error types for the entity registry.
//!
//! Errors fall into two groups. Configuration errors (bad component
//! registrations, malformed or inconsistent entity type files) are fatal: they
//! are logged where they are detected and nothing is left half-initialized.
//! Everything else is a contract violation reported to the immediate caller.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = EcsError> = std::result::Result<T, E>;

/// A data node did not have the shape a component or document expected.
#[derive(Debug, Error)]
pub enum DataShapeError {
    #[error("{0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("expected {expected} at \"{key}\"")]
    Mismatch { key: String, expected: &'static str },
}

/// Why an entity type's inheritance chain could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyFault {
    #[error("inherits from unknown entity or template type \"{0}\"")]
    MissingBase(String),

    #[error("component \"{0}\" is declared more than once along the inheritance chain")]
    DuplicateComponent(String),

    #[error("component \"{component}\" specializes the same abstract kind as \"{existing}\"")]
    ConflictingSpecialization { component: String, existing: String },

    #[error("inheritance cycle through \"{0}\"")]
    Cycle(String),
}

#[derive(Debug, Error)]
pub enum EcsError {
    #[error("no component known with id \"{0}\"")]
    UnknownComponent(String),

    #[error("component kind \"{0}\" is registered more than once")]
    DuplicateComponent(String),

    #[error("non-abstract component was used as base kind: \"{kind}\" derives from \"{base}\"")]
    ConcreteBase { kind: String, base: String },

    #[error("unknown entity type \"{name}\": {reason}")]
    UnknownEntityType { name: String, reason: &'static str },

    #[error("entity type \"{0}\" is defined more than once")]
    DuplicateEntityType(String),

    #[error("entity type \"{entity_type}\" {fault}")]
    EntityDependency {
        entity_type: String,
        fault: DependencyFault,
    },

    #[error("entity does not contain a component of kind \"{0}\"")]
    ComponentNotPresent(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to populate component \"{component}\": {source}")]
    DataShape {
        component: String,
        source: DataShapeError,
    },

    #[error("failed to read \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load entity definitions from \"{origin}\": {source}")]
    Document {
        origin: String,
        source: DataShapeError,
    },

    #[error("internal inconsistency: {0}")]
    Inconsistent(String),

    #[error("invalid configuration in \"{}\": {source}", .path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl EcsError {
    /// Returns `true` for errors that leave no usable registry behind: bad
    /// registrations, unreadable or malformed type files and broken inheritance.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EcsError::DuplicateComponent(_)
                | EcsError::ConcreteBase { .. }
                | EcsError::DuplicateEntityType(_)
                | EcsError::EntityDependency { .. }
                | EcsError::Io { .. }
                | EcsError::Document { .. }
                | EcsError::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_message_names_type_and_base() {
        let err = EcsError::EntityDependency {
            entity_type: "elite_wolf".into(),
            fault: DependencyFault::MissingBase("missing".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("elite_wolf"));
        assert!(msg.contains("missing"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn contract_violations_are_not_fatal() {
        assert!(!EcsError::ComponentNotPresent("lifetime".into()).is_configuration_error());
        assert!(!EcsError::InvalidArgument("x".into()).is_configuration_error());
        assert!(
            !EcsError::UnknownEntityType {
                name: "wolf".into(),
                reason: "no such entity type",
            }
            .is_configuration_error()
        );
    }

    #[test]
    fn data_shape_wraps_serde_errors() {
        let source = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let err = EcsError::DataShape {
            component: "lifetime".into(),
            source: source.into(),
        };
        assert!(err.to_string().starts_with("failed to populate component \"lifetime\""));
    }
}
