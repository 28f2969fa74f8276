//! Core data types for the arm_tiny builder.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// A link-base address, carried as a number but rendered as the exact
/// `0x%08x` literal that appears in the linker script and in output
/// filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkBase(pub u64);

impl LinkBase {
    /// The literal string form used for substitution and filenames.
    pub fn literal(&self) -> String {
        format!("{:#010x}", self.0)
    }
}

impl fmt::Display for LinkBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl FromStr for LinkBase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| format!("Link base must be a 0x-prefixed hex literal, got '{}'", s))?;
        u64::from_str_radix(digits, 16)
            .map(LinkBase)
            .map_err(|e| format!("Invalid link base '{}': {}", s, e))
    }
}

impl Serialize for LinkBase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.literal())
    }
}

impl<'de> Deserialize<'de> for LinkBase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct LinkBaseVisitor;

        impl<'de> Visitor<'de> for LinkBaseVisitor {
            type Value = LinkBase;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 0x-prefixed hex string or an integer link base")
            }

            fn visit_str<E>(self, value: &str) -> Result<LinkBase, E>
            where
                E: de::Error,
            {
                value.parse().map_err(de::Error::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<LinkBase, E>
            where
                E: de::Error,
            {
                Ok(LinkBase(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<LinkBase, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(LinkBase)
                    .map_err(|_| de::Error::custom(format!("negative link base: {}", value)))
            }
        }

        deserializer.deserialize_any(LinkBaseVisitor)
    }
}

/// One build variant: a link-base address plus the optional selector value
/// exported to the toolchain's environment for that build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub link_base: LinkBase,

    /// Value for the selector environment variable (e.g. VM_VERSION).
    /// `None` leaves the variable unset for this build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_version: Option<String>,
}

impl Variant {
    pub fn new(link_base: LinkBase, vm_version: Option<&str>) -> Self {
        Variant {
            link_base,
            vm_version: vm_version.map(str::to_string),
        }
    }

    /// Output filename for this variant, e.g. `arm_tiny_vm_0x80080000.bin`.
    pub fn output_name(&self, prefix: &str) -> String {
        format!("{}_{}.bin", prefix, self.link_base)
    }
}

/// Outcome of one variant's build cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOutcome {
    pub link_base: LinkBase,
    pub output: PathBuf,
    pub size_bytes: u64,
    pub build_duration: Duration,
}

/// Size and modification time of the disk image, as reported after an
/// update run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStatus {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Summary of a completed pipeline run, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub started: SystemTime,
    pub finished: SystemTime,
    pub outcomes: Vec<VariantOutcome>,
    pub disk_updated: bool,
    pub image: Option<ImageStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_base_literal() {
        assert_eq!(LinkBase(0x40080000).literal(), "0x40080000");
        assert_eq!(LinkBase(0x80080000).to_string(), "0x80080000");
    }

    #[test]
    fn test_link_base_parse() {
        let base: LinkBase = "0x40080000".parse().unwrap();
        assert_eq!(base, LinkBase(0x40080000));
        assert!("40080000".parse::<LinkBase>().is_err());
        assert!("0xzz".parse::<LinkBase>().is_err());
    }

    #[test]
    fn test_link_base_serde_roundtrip() {
        let base = LinkBase(0x80080000);
        let json = serde_json::to_string(&base).unwrap();
        assert_eq!(json, "\"0x80080000\"");
        let back: LinkBase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, base);
    }

    #[test]
    fn test_link_base_deserialize_integer() {
        let back: LinkBase = serde_json::from_str("1074266112").unwrap();
        assert_eq!(back, LinkBase(0x40080000));
    }

    #[test]
    fn test_variant_output_name() {
        let variant = Variant::new(LinkBase(0x80080000), Some("1"));
        assert_eq!(
            variant.output_name("arm_tiny_vm"),
            "arm_tiny_vm_0x80080000.bin"
        );
    }
}
