//! Named pointer from one document to another.
//!
//! Two encodings decode to the same value: the short form `guardrail: name`
//! and the explicit form `guardrail: { ref: name }`. A reference is only a
//! lookup key; it is resolved against the registry later.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const INVALID_SHAPE: &str = "reference must be either a string or an object with 'ref' field";
const EMPTY_REF: &str = "reference object must have non-empty 'ref' field";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    name: String,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An unset reference; optional fields default to this.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Reference {
    fn from(name: &str) -> Self {
        Reference::new(name)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

struct ReferenceVisitor;

impl<'de> Visitor<'de> for ReferenceVisitor {
    type Value = Reference;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(INVALID_SHAPE)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Reference, E> {
        Ok(Reference::new(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Reference, E> {
        Ok(Reference { name: value })
    }

    fn visit_unit<E: de::Error>(self) -> Result<Reference, E> {
        Ok(Reference::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Reference, E> {
        Ok(Reference::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Reference, D::Error> {
        deserializer.deserialize_any(ReferenceVisitor)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Reference, A::Error> {
        let mut name: Option<String> = None;
        while let Some(key) = map.next_key::<String>()? {
            if key != "ref" {
                return Err(de::Error::custom(INVALID_SHAPE));
            }
            name = Some(map.next_value::<String>()?);
        }
        match name {
            Some(name) if !name.is_empty() => Ok(Reference { name }),
            _ => Err(de::Error::custom(EMPTY_REF)),
        }
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ReferenceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        target: Reference,
    }

    fn decode(yaml: &str) -> Result<Reference, String> {
        serde_yaml::from_str::<Holder>(yaml)
            .map(|h| h.target)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_short_and_explicit_forms_decode_identically() {
        let short = decode("target: my-guardrail").unwrap();
        let explicit = decode("target:\n  ref: my-guardrail").unwrap();
        assert_eq!(short, explicit);
        assert_eq!(short.name(), "my-guardrail");
    }

    #[test]
    fn test_empty_ref_object_is_rejected() {
        let err = decode("target:\n  ref: \"\"").unwrap_err();
        assert!(err.contains(EMPTY_REF), "{}", err);
        let err = decode("target: {}").unwrap_err();
        assert!(err.contains(EMPTY_REF), "{}", err);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let err = decode("target:\n  - a\n  - b").unwrap_err();
        assert!(err.contains(INVALID_SHAPE), "{}", err);
        let err = decode("target:\n  name: x").unwrap_err();
        assert!(err.contains(INVALID_SHAPE), "{}", err);
        assert!(decode("target: true").is_err());
    }

    #[test]
    fn test_null_decodes_to_empty() {
        let r = decode("target: ~").unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn test_serializes_as_bare_name() {
        let yaml = serde_yaml::to_string(&Reference::new("fn-a")).unwrap();
        assert_eq!(yaml.trim(), "fn-a");
    }

    proptest! {
        #[test]
        fn prop_both_encodings_yield_same_name(name in "[a-zA-Z][a-zA-Z0-9_-]{0,40}") {
            let short = decode(&format!("target: \"{}\"", name)).unwrap();
            let explicit = decode(&format!("target:\n  ref: \"{}\"", name)).unwrap();
            prop_assert_eq!(&short, &explicit);
            prop_assert_eq!(short.name(), name.as_str());

            let encoded = serde_yaml::to_string(&short).unwrap();
            let back: Reference = serde_yaml::from_str(&encoded).unwrap();
            prop_assert_eq!(back, short);
        }
    }
}
