//! Decoded privacy sections as handed over by the consent string decoder.
//!
//! Every field is optional: the decoder may produce a section with gaps, and
//! the reader turns each gap into [`super::Field::Unset`].

use serde::{Deserialize, Serialize};

/// GPP section for the US national privacy framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsNatSection {
    pub version: Option<u8>,
    pub gpc: Option<bool>,
    pub gpc_segment_type: Option<u8>,
    pub gpc_segment_included: Option<bool>,
    pub sharing_notice: Option<u8>,
    pub sale_opt_out_notice: Option<u8>,
    pub sharing_opt_out_notice: Option<u8>,
    pub targeted_advertising_opt_out_notice: Option<u8>,
    pub sensitive_data_processing_opt_out_notice: Option<u8>,
    pub sensitive_data_limit_use_notice: Option<u8>,
    pub sale_opt_out: Option<u8>,
    pub sharing_opt_out: Option<u8>,
    pub targeted_advertising_opt_out: Option<u8>,
    /// Native order is already the canonical one.
    pub sensitive_data_processing: Option<Vec<u8>>,
    pub known_child_sensitive_data_consents: Option<[u8; 2]>,
    pub personal_data_consents: Option<u8>,
    pub mspa_covered_transaction: Option<u8>,
    pub mspa_opt_out_option_mode: Option<u8>,
    pub mspa_service_provider_mode: Option<u8>,
}

/// GPP section for a US state privacy law.
///
/// State sections are a subset of the national one; fields a given state
/// does not define are ignored by its reader whatever their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsStateSection {
    pub version: Option<u8>,
    pub gpc: Option<bool>,
    pub gpc_segment_type: Option<u8>,
    pub gpc_segment_included: Option<bool>,
    pub sharing_notice: Option<u8>,
    pub sale_opt_out_notice: Option<u8>,
    pub targeted_advertising_opt_out_notice: Option<u8>,
    pub sensitive_data_processing_opt_out_notice: Option<u8>,
    pub sale_opt_out: Option<u8>,
    pub targeted_advertising_opt_out: Option<u8>,
    /// In the state's own category order.
    pub sensitive_data_processing: Option<Vec<u8>>,
    /// Single code, collapsed by the reader into a consent pair.
    pub known_child_sensitive_data_consents: Option<u8>,
    pub mspa_covered_transaction: Option<u8>,
    pub mspa_opt_out_option_mode: Option<u8>,
    pub mspa_service_provider_mode: Option<u8>,
}

/// All sections decoded from one consent string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodedConsent {
    pub us_nat: Option<UsNatSection>,
    pub us_va: Option<UsStateSection>,
    pub us_co: Option<UsStateSection>,
    pub us_ut: Option<UsStateSection>,
}

impl DecodedConsent {
    /// The state section for `jurisdiction`, if decoded.
    ///
    /// Always `None` for [`Jurisdiction::UsNational`], which has its own type.
    #[must_use]
    pub fn state_section(&self, jurisdiction: Jurisdiction) -> Option<&UsStateSection> {
        match jurisdiction {
            Jurisdiction::UsNational => None,
            Jurisdiction::Virginia => self.us_va.as_ref(),
            Jurisdiction::Colorado => self.us_co.as_ref(),
            Jurisdiction::Utah => self.us_ut.as_ref(),
        }
    }
}

/// Privacy jurisdictions with a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Jurisdiction {
    UsNational,
    Virginia,
    Colorado,
    Utah,
}

impl Jurisdiction {
    pub const ALL: [Jurisdiction; 4] = [
        Self::UsNational,
        Self::Virginia,
        Self::Colorado,
        Self::Utah,
    ];

    /// Map a GPP section id onto its jurisdiction.
    #[must_use]
    pub const fn from_section_id(section_id: u16) -> Option<Self> {
        match section_id {
            7 => Some(Self::UsNational),
            9 => Some(Self::Virginia),
            10 => Some(Self::Colorado),
            11 => Some(Self::Utah),
            _ => None,
        }
    }

    #[must_use]
    pub const fn section_id(self) -> u16 {
        match self {
            Self::UsNational => 7,
            Self::Virginia => 9,
            Self::Colorado => 10,
            Self::Utah => 11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_ids_round_trip() {
        for jurisdiction in Jurisdiction::ALL {
            assert_eq!(
                Jurisdiction::from_section_id(jurisdiction.section_id()),
                Some(jurisdiction)
            );
        }
        assert_eq!(Jurisdiction::from_section_id(2), None);
        assert_eq!(Jurisdiction::from_section_id(8), None);
    }

    #[test]
    fn decodes_sections_from_json() {
        let consent: DecodedConsent = serde_json::from_value(serde_json::json!({
            "us_ut": {
                "version": 1,
                "saleOptOut": 2,
                "sensitiveDataProcessing": [0, 1, 2, 0, 1, 2, 0, 1],
                "knownChildSensitiveDataConsents": 1
            }
        }))
        .expect("should decode");

        let utah = consent
            .state_section(Jurisdiction::Utah)
            .expect("utah section");
        assert_eq!(utah.sale_opt_out, Some(2));
        assert_eq!(utah.sharing_notice, None);
        assert!(consent.us_nat.is_none());
        assert!(consent.state_section(Jurisdiction::UsNational).is_none());
    }
}
