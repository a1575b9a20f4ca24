//! SKU codec.
//!
//! Format: `defindex;quality[;attribute]*` where attributes appear in a fixed
//! order: `u{effect}`, `australium`, `uncraftable`, `w{wear}`, `pk{paintkit}`,
//! `strange`, `kt-{tier}`, `festive`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::currency::MetalGrade;

pub const KEY_SKU: &str = "5021;6";
pub const REFINED_SKU: &str = "5002;6";
pub const RECLAIMED_SKU: &str = "5001;6";
pub const SCRAP_SKU: &str = "5000;6";
/// Generic bucket used to price craftable hats without their own listing.
pub const CRAFT_HAT_SKU: &str = "-100;6";

// --- Sku -----------------------------------------------------------------

/// Stable identifier of an item definition plus its quality attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Wrap a raw string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse and normalize.
    pub fn parse(raw: &str) -> Result<Self, SkuParseError> {
        ItemAttributes::parse(raw).map(|attrs| attrs.to_sku())
    }

    pub fn key() -> Self {
        Self::new(KEY_SKU)
    }

    pub fn craft_hat_bucket() -> Self {
        Self::new(CRAFT_HAT_SKU)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn defindex(&self) -> Option<i32> {
        self.0.split(';').next()?.parse().ok()
    }

    pub fn quality(&self) -> Option<u8> {
        self.0.split(';').nth(1)?.parse().ok()
    }

    pub fn is_key(&self) -> bool {
        self.0 == KEY_SKU
    }

    pub fn metal_grade(&self) -> Option<MetalGrade> {
        match self.0.as_str() {
            REFINED_SKU => Some(MetalGrade::Refined),
            RECLAIMED_SKU => Some(MetalGrade::Reclaimed),
            SCRAP_SKU => Some(MetalGrade::Scrap),
            _ => None,
        }
    }

    /// Key or one of the three metal grades.
    pub fn is_pure(&self) -> bool {
        self.is_key() || self.metal_grade().is_some()
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sku {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// --- Parse error ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuParseError {
    Empty,
    InvalidDefindex(String),
    MissingQuality,
    InvalidQuality(String),
    UnknownAttribute(String),
}

impl fmt::Display for SkuParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkuParseError::Empty => write!(f, "empty sku"),
            SkuParseError::InvalidDefindex(raw) => write!(f, "invalid defindex `{raw}`"),
            SkuParseError::MissingQuality => write!(f, "sku has no quality segment"),
            SkuParseError::InvalidQuality(raw) => write!(f, "invalid quality `{raw}`"),
            SkuParseError::UnknownAttribute(raw) => write!(f, "unknown sku attribute `{raw}`"),
        }
    }
}

impl std::error::Error for SkuParseError {}

// --- Attributes ----------------------------------------------------------

/// Decoded SKU attributes. Also the input used to compose a fresh SKU for
/// items received in a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub defindex: i32,
    pub quality: u8,
    #[serde(default)]
    pub effect: Option<u32>,
    #[serde(default)]
    pub australium: bool,
    #[serde(default = "default_craftable")]
    pub craftable: bool,
    #[serde(default)]
    pub wear: Option<u8>,
    #[serde(default)]
    pub paintkit: Option<u32>,
    /// Strange counter on a non-strange quality item.
    #[serde(default)]
    pub elevated_strange: bool,
    #[serde(default)]
    pub killstreak: u8,
    #[serde(default)]
    pub festivized: bool,
}

fn default_craftable() -> bool {
    true
}

impl ItemAttributes {
    /// Plain craftable item of the given definition and quality.
    pub fn new(defindex: i32, quality: u8) -> Self {
        Self {
            defindex,
            quality,
            effect: None,
            australium: false,
            craftable: true,
            wear: None,
            paintkit: None,
            elevated_strange: false,
            killstreak: 0,
            festivized: false,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, SkuParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SkuParseError::Empty);
        }
        let mut parts = raw.split(';');
        let defindex_raw = parts.next().unwrap_or_default();
        let defindex = defindex_raw
            .parse::<i32>()
            .map_err(|_| SkuParseError::InvalidDefindex(defindex_raw.to_string()))?;
        let quality_raw = parts.next().ok_or(SkuParseError::MissingQuality)?;
        let quality = quality_raw
            .parse::<u8>()
            .map_err(|_| SkuParseError::InvalidQuality(quality_raw.to_string()))?;

        let mut attrs = Self::new(defindex, quality);
        for part in parts {
            match part {
                "australium" => attrs.australium = true,
                "uncraftable" => attrs.craftable = false,
                "strange" => attrs.elevated_strange = true,
                "festive" => attrs.festivized = true,
                _ => attrs.apply_numeric(part)?,
            }
        }
        Ok(attrs)
    }

    fn apply_numeric(&mut self, part: &str) -> Result<(), SkuParseError> {
        let unknown = || SkuParseError::UnknownAttribute(part.to_string());
        if let Some(tier) = part.strip_prefix("kt-") {
            self.killstreak = tier.parse().map_err(|_| unknown())?;
        } else if let Some(kit) = part.strip_prefix("pk") {
            self.paintkit = Some(kit.parse().map_err(|_| unknown())?);
        } else if let Some(effect) = part.strip_prefix('u') {
            self.effect = Some(effect.parse().map_err(|_| unknown())?);
        } else if let Some(wear) = part.strip_prefix('w') {
            self.wear = Some(wear.parse().map_err(|_| unknown())?);
        } else {
            return Err(unknown());
        }
        Ok(())
    }

    pub fn to_sku(&self) -> Sku {
        let mut out = format!("{};{}", self.defindex, self.quality);
        if let Some(effect) = self.effect {
            out.push_str(&format!(";u{effect}"));
        }
        if self.australium {
            out.push_str(";australium");
        }
        if !self.craftable {
            out.push_str(";uncraftable");
        }
        if let Some(wear) = self.wear {
            out.push_str(&format!(";w{wear}"));
        }
        if let Some(kit) = self.paintkit {
            out.push_str(&format!(";pk{kit}"));
        }
        if self.elevated_strange {
            out.push_str(";strange");
        }
        if self.killstreak > 0 {
            out.push_str(&format!(";kt-{}", self.killstreak));
        }
        if self.festivized {
            out.push_str(";festive");
        }
        Sku(out)
    }
}
