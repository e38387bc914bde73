//! Jurisdiction readers producing a [`ConsentSignal`].
//!
//! Each jurisdiction is described by two static tables: where each canonical
//! sensitive category sits in its native vector, and which scalar fields its
//! law does not define. The reader itself is the same for every state.

use super::section::{DecodedConsent, Jurisdiction, UsNatSection, UsStateSection};
use super::signal::{ConsentSignal, Field, SignalField, SENSITIVE_CATEGORY_COUNT};

/// Canonical slot -> native index. `None` marks a category the jurisdiction lacks.
pub type SensitiveDataMap = [Option<usize>; SENSITIVE_CATEGORY_COUNT];

const US_NATIONAL_SENSITIVE_DATA: SensitiveDataMap = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    Some(7),
    Some(8),
    Some(9),
    Some(10),
    Some(11),
];

const VIRGINIA_SENSITIVE_DATA: SensitiveDataMap = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    Some(7),
    None,
    None,
    None,
    None,
];

const COLORADO_SENSITIVE_DATA: SensitiveDataMap = [
    Some(0),
    Some(1),
    Some(2),
    Some(3),
    Some(4),
    Some(5),
    Some(6),
    None,
    None,
    None,
    None,
    None,
];

// Utah lists sexual orientation and citizenship before health.
const UTAH_SENSITIVE_DATA: SensitiveDataMap = [
    Some(0),
    Some(1),
    Some(4),
    Some(2),
    Some(3),
    Some(5),
    Some(6),
    Some(7),
    None,
    None,
    None,
    None,
];

const UTAH_NOT_APPLICABLE: &[SignalField] = &[
    SignalField::Gpc,
    SignalField::GpcSegmentType,
    SignalField::GpcSegmentIncluded,
    SignalField::SharingOptOut,
    SignalField::SharingOptOutNotice,
    SignalField::SensitiveDataLimitUseNotice,
    SignalField::PersonalDataConsents,
];

const VIRGINIA_NOT_APPLICABLE: &[SignalField] = &[
    SignalField::Gpc,
    SignalField::GpcSegmentType,
    SignalField::GpcSegmentIncluded,
    SignalField::SharingOptOut,
    SignalField::SharingOptOutNotice,
    SignalField::SensitiveDataProcessingOptOutNotice,
    SignalField::SensitiveDataLimitUseNotice,
    SignalField::PersonalDataConsents,
];

const COLORADO_NOT_APPLICABLE: &[SignalField] = &[
    SignalField::SharingOptOut,
    SignalField::SharingOptOutNotice,
    SignalField::SensitiveDataProcessingOptOutNotice,
    SignalField::SensitiveDataLimitUseNotice,
    SignalField::PersonalDataConsents,
];

const CHILD_SENSITIVE_DATA: [u8; 2] = [1, 1];
const NON_CHILD_SENSITIVE_DATA: [u8; 2] = [0, 0];

impl Jurisdiction {
    /// Where each canonical sensitive category sits in this jurisdiction's vector.
    #[must_use]
    pub const fn sensitive_data_map(self) -> &'static SensitiveDataMap {
        match self {
            Self::UsNational => &US_NATIONAL_SENSITIVE_DATA,
            Self::Virginia => &VIRGINIA_SENSITIVE_DATA,
            Self::Colorado => &COLORADO_SENSITIVE_DATA,
            Self::Utah => &UTAH_SENSITIVE_DATA,
        }
    }

    /// Scalar fields this jurisdiction's law has no concept of.
    #[must_use]
    pub const fn not_applicable_fields(self) -> &'static [SignalField] {
        match self {
            Self::UsNational => &[],
            Self::Virginia => VIRGINIA_NOT_APPLICABLE,
            Self::Colorado => COLORADO_NOT_APPLICABLE,
            Self::Utah => UTAH_NOT_APPLICABLE,
        }
    }

    #[must_use]
    pub fn supports(self, field: SignalField) -> bool {
        !self.not_applicable_fields().contains(&field)
    }
}

/// Reads one jurisdiction's section into the canonical signal.
///
/// Stateless and cheap to copy. Reading never fails: missing input yields
/// `Unset` fields, and fields the jurisdiction does not define are always
/// `NotApplicable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentSignalReader {
    jurisdiction: Jurisdiction,
}

impl ConsentSignalReader {
    #[must_use]
    pub const fn new(jurisdiction: Jurisdiction) -> Self {
        Self { jurisdiction }
    }

    /// Reader for a GPP section id, if the section has one.
    #[must_use]
    pub const fn for_section_id(section_id: u16) -> Option<Self> {
        match Jurisdiction::from_section_id(section_id) {
            Some(jurisdiction) => Some(Self::new(jurisdiction)),
            None => None,
        }
    }

    #[must_use]
    pub const fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    #[must_use]
    pub fn read(&self, consent: Option<&DecodedConsent>) -> ConsentSignal {
        match self.jurisdiction {
            Jurisdiction::UsNational => self.read_us_nat(consent.and_then(|c| c.us_nat.as_ref())),
            state => self.read_state(consent.and_then(|c| c.state_section(state))),
        }
    }

    fn read_us_nat(&self, section: Option<&UsNatSection>) -> ConsentSignal {
        ConsentSignal {
            version: Field::from_option(section.and_then(|s| s.version)),
            gpc: self.field(SignalField::Gpc, section.and_then(|s| s.gpc)),
            gpc_segment_type: self
                .field(SignalField::GpcSegmentType, section.and_then(|s| s.gpc_segment_type)),
            gpc_segment_included: self.field(
                SignalField::GpcSegmentIncluded,
                section.and_then(|s| s.gpc_segment_included),
            ),
            sale_opt_out: self.field(SignalField::SaleOptOut, section.and_then(|s| s.sale_opt_out)),
            sale_opt_out_notice: self.field(
                SignalField::SaleOptOutNotice,
                section.and_then(|s| s.sale_opt_out_notice),
            ),
            sharing_notice: self
                .field(SignalField::SharingNotice, section.and_then(|s| s.sharing_notice)),
            sharing_opt_out: self
                .field(SignalField::SharingOptOut, section.and_then(|s| s.sharing_opt_out)),
            sharing_opt_out_notice: self.field(
                SignalField::SharingOptOutNotice,
                section.and_then(|s| s.sharing_opt_out_notice),
            ),
            targeted_advertising_opt_out: self.field(
                SignalField::TargetedAdvertisingOptOut,
                section.and_then(|s| s.targeted_advertising_opt_out),
            ),
            targeted_advertising_opt_out_notice: self.field(
                SignalField::TargetedAdvertisingOptOutNotice,
                section.and_then(|s| s.targeted_advertising_opt_out_notice),
            ),
            sensitive_data_processing_opt_out_notice: self.field(
                SignalField::SensitiveDataProcessingOptOutNotice,
                section.and_then(|s| s.sensitive_data_processing_opt_out_notice),
            ),
            sensitive_data_limit_use_notice: self.field(
                SignalField::SensitiveDataLimitUseNotice,
                section.and_then(|s| s.sensitive_data_limit_use_notice),
            ),
            sensitive_data_processing: self
                .sensitive_data(section.and_then(|s| s.sensitive_data_processing.as_deref())),
            known_child_sensitive_data_consents: self.field(
                SignalField::KnownChildSensitiveDataConsents,
                section.and_then(|s| s.known_child_sensitive_data_consents),
            ),
            personal_data_consents: self.field(
                SignalField::PersonalDataConsents,
                section.and_then(|s| s.personal_data_consents),
            ),
            mspa_covered_transaction: Field::from_option(
                section.and_then(|s| s.mspa_covered_transaction),
            ),
            mspa_opt_out_option_mode: Field::from_option(
                section.and_then(|s| s.mspa_opt_out_option_mode),
            ),
            mspa_service_provider_mode: Field::from_option(
                section.and_then(|s| s.mspa_service_provider_mode),
            ),
        }
    }

    fn read_state(&self, section: Option<&UsStateSection>) -> ConsentSignal {
        ConsentSignal {
            version: Field::from_option(section.and_then(|s| s.version)),
            gpc: self.field(SignalField::Gpc, section.and_then(|s| s.gpc)),
            gpc_segment_type: self
                .field(SignalField::GpcSegmentType, section.and_then(|s| s.gpc_segment_type)),
            gpc_segment_included: self.field(
                SignalField::GpcSegmentIncluded,
                section.and_then(|s| s.gpc_segment_included),
            ),
            sale_opt_out: self.field(SignalField::SaleOptOut, section.and_then(|s| s.sale_opt_out)),
            sale_opt_out_notice: self.field(
                SignalField::SaleOptOutNotice,
                section.and_then(|s| s.sale_opt_out_notice),
            ),
            sharing_notice: self
                .field(SignalField::SharingNotice, section.and_then(|s| s.sharing_notice)),
            sharing_opt_out: self.field(SignalField::SharingOptOut, None),
            sharing_opt_out_notice: self.field(SignalField::SharingOptOutNotice, None),
            targeted_advertising_opt_out: self.field(
                SignalField::TargetedAdvertisingOptOut,
                section.and_then(|s| s.targeted_advertising_opt_out),
            ),
            targeted_advertising_opt_out_notice: self.field(
                SignalField::TargetedAdvertisingOptOutNotice,
                section.and_then(|s| s.targeted_advertising_opt_out_notice),
            ),
            sensitive_data_processing_opt_out_notice: self.field(
                SignalField::SensitiveDataProcessingOptOutNotice,
                section.and_then(|s| s.sensitive_data_processing_opt_out_notice),
            ),
            sensitive_data_limit_use_notice: self
                .field(SignalField::SensitiveDataLimitUseNotice, None),
            sensitive_data_processing: self
                .sensitive_data(section.and_then(|s| s.sensitive_data_processing.as_deref())),
            known_child_sensitive_data_consents: self.field(
                SignalField::KnownChildSensitiveDataConsents,
                section
                    .and_then(|s| s.known_child_sensitive_data_consents)
                    .map(collapse_child_consent),
            ),
            personal_data_consents: self.field(SignalField::PersonalDataConsents, None),
            mspa_covered_transaction: Field::from_option(
                section.and_then(|s| s.mspa_covered_transaction),
            ),
            mspa_opt_out_option_mode: Field::from_option(
                section.and_then(|s| s.mspa_opt_out_option_mode),
            ),
            mspa_service_provider_mode: Field::from_option(
                section.and_then(|s| s.mspa_service_provider_mode),
            ),
        }
    }

    fn field<T>(&self, name: SignalField, raw: Option<T>) -> Field<T> {
        if self.jurisdiction.supports(name) {
            Field::from_option(raw)
        } else {
            Field::NotApplicable
        }
    }

    fn sensitive_data(&self, native: Option<&[u8]>) -> [Field<u8>; SENSITIVE_CATEGORY_COUNT] {
        permute_sensitive_data(self.jurisdiction.sensitive_data_map(), native)
    }
}

/// Reorder a native sensitive data vector into canonical order.
///
/// A slot the jurisdiction lacks is `NotApplicable`; a slot it has but the
/// input does not carry (no vector, or a short one) is `Unset`.
#[must_use]
pub fn permute_sensitive_data(
    map: &SensitiveDataMap,
    native: Option<&[u8]>,
) -> [Field<u8>; SENSITIVE_CATEGORY_COUNT] {
    map.map(|slot| match slot {
        None => Field::NotApplicable,
        Some(index) => Field::from_option(native.and_then(|values| values.get(index).copied())),
    })
}

/// Collapse a state's single child consent code into the national pair.
#[must_use]
pub const fn collapse_child_consent(code: u8) -> [u8; 2] {
    match code {
        1 | 2 => CHILD_SENSITIVE_DATA,
        _ => NON_CHILD_SENSITIVE_DATA,
    }
}
