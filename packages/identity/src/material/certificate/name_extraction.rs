//! Distinguished name extraction
//!
//! Names compare by their DER encoding. The display string and the common
//! attribute map are derived views used for hints and diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use der::{Decode, Encode};
use x509_cert::name::Name;

use crate::error::{PkiError, Result};

/// Short names of the attributes kept in the attribute map
const NAME_ATTRIBUTES: [(&str, &str); 6] = [
    ("2.5.4.3", "CN"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.6", "C"),
    ("2.5.4.8", "ST"),
    ("2.5.4.7", "L"),
];

/// X.501 distinguished name
#[derive(Clone)]
pub struct DistinguishedName {
    der: Vec<u8>,
    display: String,
    attributes: BTreeMap<&'static str, String>,
}

impl DistinguishedName {
    /// Build from a decoded x509-cert `Name`
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` if the name cannot be re-encoded.
    pub fn from_name(name: &Name) -> Result<Self> {
        let der = name
            .to_der()
            .map_err(|e| PkiError::malformed(format!("Failed to encode name: {e}")))?;
        Ok(Self {
            der,
            display: name.to_string(),
            attributes: extract_name_attributes(name),
        })
    }

    /// Parse a DER-encoded `Name`
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` if the bytes are not a valid name.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let name = Name::from_der(der)
            .map_err(|e| PkiError::malformed(format!("Invalid distinguished name: {e}")))?;
        Self::from_name(&name)
    }

    /// DER encoding, the identity used for comparisons
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Value of a common attribute by short name (`CN`, `O`, `OU`, `C`, `ST`, `L`)
    #[must_use]
    pub fn attribute(&self, short_name: &str) -> Option<&str> {
        self.attributes.get(short_name).map(String::as_str)
    }

    /// Common name, if present
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.attribute("CN")
    }
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for DistinguishedName {}

impl Hash for DistinguishedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DistinguishedName")
            .field(&self.display)
            .finish()
    }
}

/// Extract the common attributes of a name
///
/// Later values win when an attribute repeats across RDNs.
fn extract_name_attributes(name: &Name) -> BTreeMap<&'static str, String> {
    let mut attrs = BTreeMap::new();

    for rdn in &name.0 {
        for atv in rdn.0.iter() {
            let oid = atv.oid.to_string();
            let Some((_, short)) = NAME_ATTRIBUTES.iter().find(|(o, _)| *o == oid) else {
                continue;
            };

            let value = if let Ok(ps) = PrintableStringRef::try_from(&atv.value) {
                Some(ps.to_string())
            } else if let Ok(utf8s) = Utf8StringRef::try_from(&atv.value) {
                Some(utf8s.to_string())
            } else if let Ok(ia5s) = Ia5StringRef::try_from(&atv.value) {
                Some(ia5s.to_string())
            } else {
                None
            };

            if let Some(value) = value {
                attrs.insert(*short, value);
            }
        }
    }

    attrs
}
