use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// IntrospectionError

/// A type declaration that can not be turned into a bean model.
///
/// Raised while the model is built, never while decoding. The type can not
/// be (de)serialized until its declaration is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IntrospectionError {
    #[error("No accessible creator found for type: {type_name}")]
    NoCreator { type_name: &'static str },
    #[error("Multiple creators declared for type: {type_name}")]
    MultipleCreators { type_name: &'static str },
    #[error("Any setter of type [{type_name}] must take a map or a (key, value) pair: {reason}")]
    MalformedAnySetter {
        type_name: &'static str,
        reason: &'static str,
    },
    #[error("Multiple any setters declared for type: {type_name}")]
    MultipleAnySetters { type_name: &'static str },
    #[error("Duplicate property name [{property}] declared on type: {type_name}")]
    DuplicateProperty {
        type_name: &'static str,
        property: String,
    },
    #[error("Property [{property}] of type [{type_name}] has conflicting names: {first} and {second}")]
    ConflictingNames {
        type_name: &'static str,
        property: String,
        first: String,
        second: String,
    },
    #[error("Accessors of property [{property}] on type [{type_name}] disagree on its type: {first} and {second}")]
    TypeMismatch {
        type_name: &'static str,
        property: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("Default value of property [{property}] on type [{type_name}] is a {found}, expected {expected}")]
    DefaultTypeMismatch {
        type_name: &'static str,
        property: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Creator parameter {index} of type [{type_name}] is not bound to a property")]
    UnboundCreatorParameter { type_name: &'static str, index: usize },
    #[error("Unwrapped property [{property}] of type [{type_name}] can not be required")]
    RequiredUnwrapped {
        type_name: &'static str,
        property: String,
    },
    #[error("Property [{property}] of type [{type_name}] can not be unwrapped: {reason}")]
    InvalidUnwrapped {
        type_name: &'static str,
        property: String,
        reason: &'static str,
    },
    #[error("Unwrapped properties of type [{type_name}] form a cycle")]
    CyclicUnwrap { type_name: &'static str },
    #[error("Subtype [{subtype}] of type [{type_name}] is invalid: {reason}")]
    InvalidSubtype {
        type_name: &'static str,
        subtype: String,
        reason: &'static str,
    },
}

// -----------------------------------------------------------------------------
// CreateError

/// An error reported by a creator while turning arguments into an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CreateError {
    #[error("argument {index} is missing")]
    MissingArgument { index: usize },
    #[error("argument {index} is not a {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
    },
    #[error("{0}")]
    Custom(String),
}

// -----------------------------------------------------------------------------
// BindError

/// Every way a single decode or encode call can fail.
///
/// All variants are terminal for the call that produced them; no instance is
/// ever returned partially bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BindError {
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error("Unknown property [{property}] encountered during deserialization of type: {type_name}")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },
    #[error("Duplicate property [{property}] encountered during deserialization of type: {type_name}")]
    DuplicateProperty {
        type_name: &'static str,
        property: String,
    },
    #[error("Required property [{property}] for type [{type_name}] is not present in supplied data")]
    MissingRequiredProperty {
        type_name: &'static str,
        property: String,
    },
    #[error("Error decoding property [{path}] of type [{type_name}] as {argument}: {message}")]
    InvalidFormat {
        type_name: &'static str,
        property: String,
        path: String,
        argument: &'static str,
        message: String,
    },
    #[error("Infinite recursion deserializing type: {type_name}")]
    Recursion { type_name: &'static str },
    #[error("Unknown subtype [{discriminator}] for type: {type_name}")]
    UnknownSubtype {
        type_name: &'static str,
        discriminator: String,
    },
    #[error("Discriminator [{discriminator}] of type [{type_name}] matches more than one subtype")]
    AmbiguousSubtype {
        type_name: &'static str,
        discriminator: String,
    },
    #[error("Expected discriminator property [{property}] for type: {type_name}")]
    MissingDiscriminator {
        type_name: &'static str,
        property: String,
    },
    #[error("Malformed subtype value for type [{type_name}]: {reason}")]
    MalformedSubtype {
        type_name: &'static str,
        reason: &'static str,
    },
    #[error("Instantiation of type [{type_name}] failed: {source}")]
    Instantiation {
        type_name: &'static str,
        source: CreateError,
    },
    #[error("No type metadata registered for type: {type_name}")]
    UnregisteredType { type_name: &'static str },
    #[error("Type [{type_name}] does not support {operation}")]
    Unsupported {
        type_name: &'static str,
        operation: &'static str,
    },
    #[error("{0}")]
    Format(String),
}

impl BindError {
    /// Returns `true` for errors raised while building a bean model.
    #[inline]
    pub fn is_introspection(&self) -> bool {
        matches!(self, Self::Introspection(_))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::{BindError, CreateError, IntrospectionError};

    #[test]
    fn messages_name_property_and_type() {
        let err = BindError::UnknownProperty {
            type_name: "Person",
            property: "nick".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown property [nick] encountered during deserialization of type: Person"
        );

        let err = BindError::MissingRequiredProperty {
            type_name: "Circle",
            property: "radius".into(),
        };
        assert_eq!(
            err.to_string(),
            "Required property [radius] for type [Circle] is not present in supplied data"
        );
    }

    #[test]
    fn introspection_errors_convert() {
        let err: BindError = IntrospectionError::NoCreator { type_name: "Shape" }.into();
        assert!(err.is_introspection());
        assert_eq!(err.to_string(), "No accessible creator found for type: Shape");

        let err = BindError::Instantiation {
            type_name: "Point",
            source: CreateError::MissingArgument { index: 1 },
        };
        assert_eq!(
            err.to_string(),
            "Instantiation of type [Point] failed: argument 1 is missing"
        );
    }
}
