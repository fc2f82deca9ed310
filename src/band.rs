//! Amateur band classification.
//!
//! Maps a dial or signal frequency onto one of the fourteen HF/VHF/UHF
//! allocations from 160m through 70cm. Ranges include their lower edge
//! and exclude their upper edge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named amateur-radio band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "160m")]
    M160,
    #[serde(rename = "80m")]
    M80,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "40m")]
    M40,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "20m")]
    M20,
    #[serde(rename = "17m")]
    M17,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "12m")]
    M12,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "6m")]
    M6,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "1.25m")]
    M1_25,
    #[serde(rename = "70cm")]
    Cm70,
}

impl Band {
    /// Every band, lowest frequency first.
    pub const ALL: [Band; 14] = [
        Band::M160,
        Band::M80,
        Band::M60,
        Band::M40,
        Band::M30,
        Band::M20,
        Band::M17,
        Band::M15,
        Band::M12,
        Band::M10,
        Band::M6,
        Band::M2,
        Band::M1_25,
        Band::Cm70,
    ];

    /// Returns the band containing `frequency_hz`, if any.
    pub fn classify(frequency_hz: u64) -> Option<Band> {
        match frequency_hz {
            1_800_000..2_000_000 => Some(Band::M160),
            3_500_000..4_000_000 => Some(Band::M80),
            5_250_000..5_450_000 => Some(Band::M60),
            7_000_000..7_300_000 => Some(Band::M40),
            10_100_000..10_150_000 => Some(Band::M30),
            14_000_000..14_350_000 => Some(Band::M20),
            18_068_000..18_168_000 => Some(Band::M17),
            21_000_000..21_450_000 => Some(Band::M15),
            24_890_000..24_990_000 => Some(Band::M12),
            28_000_000..29_700_000 => Some(Band::M10),
            50_000_000..54_000_000 => Some(Band::M6),
            144_000_000..148_000_000 => Some(Band::M2),
            222_000_000..225_000_000 => Some(Band::M1_25),
            420_000_000..450_000_000 => Some(Band::Cm70),
            _ => None,
        }
    }

    /// The conventional label, e.g. `"20m"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::M160 => "160m",
            Band::M80 => "80m",
            Band::M60 => "60m",
            Band::M40 => "40m",
            Band::M30 => "30m",
            Band::M20 => "20m",
            Band::M17 => "17m",
            Band::M15 => "15m",
            Band::M12 => "12m",
            Band::M10 => "10m",
            Band::M6 => "6m",
            Band::M2 => "2m",
            Band::M1_25 => "1.25m",
            Band::Cm70 => "70cm",
        }
    }
}

/// Convenience wrapper over [`Band::classify`].
#[inline]
pub fn classify(frequency_hz: u64) -> Option<Band> {
    Band::classify(frequency_hz)
}

/// Label for an optional band, `"unknown"` when absent.
pub fn label(band: Option<Band>) -> &'static str {
    band.map(|b| b.as_str()).unwrap_or("unknown")
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Band::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown band: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_detection() {
        assert_eq!(classify(14_074_000), Some(Band::M20));
        assert_eq!(classify(7_074_000), Some(Band::M40));
        assert_eq!(classify(50_313_000), Some(Band::M6));
        assert_eq!(classify(432_065_000), Some(Band::Cm70));
    }

    #[test]
    fn test_band_detection_edge_cases() {
        assert_eq!(classify(28_000_000), Some(Band::M10));
        assert_eq!(classify(29_699_999), Some(Band::M10));
        assert_eq!(classify(29_700_000), None);
        assert_eq!(classify(29_700_001), None);
        assert_eq!(classify(1_799_999), None);
        assert_eq!(classify(1_800_000), Some(Band::M160));
    }

    #[test]
    fn test_out_of_band() {
        assert_eq!(classify(0), None);
        assert_eq!(classify(11_000_000), None);
        assert_eq!(classify(u64::MAX), None);
    }

    #[test]
    fn test_every_band_classifies_its_own_lower_edge() {
        let edges = [
            1_800_000u64,
            3_500_000,
            5_250_000,
            7_000_000,
            10_100_000,
            14_000_000,
            18_068_000,
            21_000_000,
            24_890_000,
            28_000_000,
            50_000_000,
            144_000_000,
            222_000_000,
            420_000_000,
        ];
        for (edge, band) in edges.iter().zip(Band::ALL) {
            assert_eq!(classify(*edge), Some(band));
        }
    }

    #[test]
    fn test_label_round_trip() {
        for band in Band::ALL {
            assert_eq!(band.as_str().parse::<Band>(), Ok(band));
        }
        assert_eq!("70CM".parse::<Band>(), Ok(Band::Cm70));
        assert!("11m".parse::<Band>().is_err());
        assert_eq!(label(None), "unknown");
        assert_eq!(label(Some(Band::M1_25)), "1.25m");
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Band::M1_25).unwrap();
        assert_eq!(json, "\"1.25m\"");
        let band: Band = serde_json::from_str("\"160m\"").unwrap();
        assert_eq!(band, Band::M160);
    }
}
