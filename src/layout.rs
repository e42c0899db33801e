//! Layout descriptors shipped by this repository
//!
//! A descriptor is authored once per layout variant and never mutated. The
//! installer reads it to produce the registry entry and to find the auxiliary
//! payloads the variant depends on.

use serde::{Deserialize, Serialize};

use crate::types::PayloadKind;

/// Registry identity of one keyboard layout variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    /// Unique identifier, used both as payload filename and registry key
    pub internal_name: String,
    /// Short display label (about 8 characters at most)
    pub short_description: String,
    pub long_description: String,
    /// ISO 639 language code
    pub language_tag: String,
    /// ISO 3166 country code
    pub country_tag: Option<String>,
    /// Emit an empty `variantList` next to the `configItem`
    #[serde(default)]
    pub variant_list: bool,
}

/// An extra file a layout variant needs besides its symbols payload.
///
/// The destination is fixed relative to the XKB root and is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryPayload {
    pub kind: PayloadKind,
    /// File name of the source, next to the symbols payload
    pub source_name: &'static str,
    /// Destination relative to the XKB root
    pub destination: &'static str,
}

/// Internal name of the layout this repository distributes
pub const US_SPLIT_V3: &str = "us_split_v3";

/// The three-level-with-shift key type and its compat interpretation.
pub const US_SPLIT_V3_AUXILIARY: &[AuxiliaryPayload] = &[
    AuxiliaryPayload {
        kind: PayloadKind::Types,
        source_name: "types-threelevelwithshift",
        destination: "types/threelevelwithshift",
    },
    AuxiliaryPayload {
        kind: PayloadKind::Compat,
        source_name: "compat-threelevelwithshift",
        destination: "compat/threelevelwithshift",
    },
];

impl LayoutDescriptor {
    /// Descriptor for `us_split_v3`
    pub fn us_split_v3() -> Self {
        Self {
            internal_name: US_SPLIT_V3.to_string(),
            short_description: "U_SA_3".to_string(),
            long_description: "USA Split v3".to_string(),
            language_tag: "eng".to_string(),
            country_tag: Some("US".to_string()),
            variant_list: false,
        }
    }

    /// Reject descriptors the registry could not hold meaningfully.
    pub fn validate(&self) -> Result<(), String> {
        if self.internal_name.trim().is_empty() {
            return Err("layout internal name must not be empty".to_string());
        }
        if self.internal_name.contains('/') {
            return Err(format!(
                "layout internal name '{}' must not contain '/'",
                self.internal_name
            ));
        }
        if self.short_description.trim().is_empty() {
            return Err("layout short description must not be empty".to_string());
        }
        if self.language_tag.len() != 3 || !self.language_tag.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(format!(
                "language tag '{}' is not a three-letter ISO 639 code",
                self.language_tag
            ));
        }
        if let Some(country) = &self.country_tag {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(format!(
                    "country tag '{}' is not a two-letter ISO 3166 code",
                    country
                ));
            }
        }
        Ok(())
    }
}

impl Default for LayoutDescriptor {
    fn default() -> Self {
        Self::us_split_v3()
    }
}
