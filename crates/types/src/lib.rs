//! Validated identifier types shared by the vital-signs crates.
//!
//! Identifiers cross three boundaries (REST input, the openEHR mapping layer and the external
//! clinical-data server), so each one gets its own newtype. All of them share a single rule: the
//! value is trimmed and must contain at least one non-whitespace character.

use std::fmt;

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// The input text was empty or contained only whitespace
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },
}

/// Trims `input` and rejects empty results.
fn non_empty(kind: &'static str, input: &str) -> Result<String, IdError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    Ok(trimmed.to_owned())
}

macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, utoipa::ToSchema)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given input.
            ///
            /// The input is trimmed of leading and trailing whitespace. If the trimmed
            /// result is empty, an error is returned.
            pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
                non_empty($kind, input.as_ref()).map(Self)
            }

            /// Returns the inner string as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

text_id!(
    /// Application-level patient identifier, owned by the patient registry.
    PatientId,
    "patient_id"
);

text_id!(
    /// Identifier of a patient's EHR on the clinical-data server.
    EhrId,
    "ehr_id"
);

text_id!(
    /// Versioned composition identifier returned by the clinical-data server.
    ///
    /// Typically `<uuid>::<system id>::<version>`. The value is opaque to this workspace: it is
    /// stored and echoed back, never decomposed.
    CompositionUid,
    "composition_uid"
);

text_id!(
    /// Operational template identifier (for example `open-cis.vital-signs.v1`).
    TemplateId,
    "template_id"
);
