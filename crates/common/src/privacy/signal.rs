//! Canonical consent signal shared by every jurisdiction.

/// Number of sensitive data categories in the canonical vector.
pub const SENSITIVE_CATEGORY_COUNT: usize = 12;

/// Canonical sensitive data categories, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensitiveCategory {
    RacialOrEthnicOrigin,
    ReligiousBeliefs,
    Health,
    SexLifeOrOrientation,
    CitizenshipOrImmigration,
    Genetic,
    Biometric,
    PreciseGeolocation,
    IdentificationDocuments,
    Financial,
    UnionMembership,
    CommunicationContents,
}

impl SensitiveCategory {
    pub const ALL: [SensitiveCategory; SENSITIVE_CATEGORY_COUNT] = [
        Self::RacialOrEthnicOrigin,
        Self::ReligiousBeliefs,
        Self::Health,
        Self::SexLifeOrOrientation,
        Self::CitizenshipOrImmigration,
        Self::Genetic,
        Self::Biometric,
        Self::PreciseGeolocation,
        Self::IdentificationDocuments,
        Self::Financial,
        Self::UnionMembership,
        Self::CommunicationContents,
    ];

    /// Position of this category in [`ConsentSignal::sensitive_data_processing`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One consent field.
///
/// `Unset` and `NotApplicable` are both "no value" but mean different things:
/// the first says the section was not sent, the second that the jurisdiction
/// has no such concept at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Field<T> {
    NotApplicable,
    #[default]
    Unset,
    Value(T),
}

impl<T> Field<T> {
    /// `Value` when present, `Unset` otherwise.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Value)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::NotApplicable | Self::Unset => None,
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Self::NotApplicable => Field::NotApplicable,
            Self::Unset => Field::Unset,
            Self::Value(value) => Field::Value(f(value)),
        }
    }
}

/// Names of the scalar fields of [`ConsentSignal`], used by jurisdictions to
/// declare which ones their law does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalField {
    Gpc,
    GpcSegmentType,
    GpcSegmentIncluded,
    SaleOptOut,
    SaleOptOutNotice,
    SharingNotice,
    SharingOptOut,
    SharingOptOutNotice,
    TargetedAdvertisingOptOut,
    TargetedAdvertisingOptOutNotice,
    SensitiveDataProcessingOptOutNotice,
    SensitiveDataLimitUseNotice,
    KnownChildSensitiveDataConsents,
    PersonalDataConsents,
}

/// Jurisdiction independent view of a US privacy section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentSignal {
    pub version: Field<u8>,
    pub gpc: Field<bool>,
    pub gpc_segment_type: Field<u8>,
    pub gpc_segment_included: Field<bool>,
    pub sale_opt_out: Field<u8>,
    pub sale_opt_out_notice: Field<u8>,
    pub sharing_notice: Field<u8>,
    pub sharing_opt_out: Field<u8>,
    pub sharing_opt_out_notice: Field<u8>,
    pub targeted_advertising_opt_out: Field<u8>,
    pub targeted_advertising_opt_out_notice: Field<u8>,
    pub sensitive_data_processing_opt_out_notice: Field<u8>,
    pub sensitive_data_limit_use_notice: Field<u8>,
    /// Indexed by [`SensitiveCategory::index`].
    pub sensitive_data_processing: [Field<u8>; SENSITIVE_CATEGORY_COUNT],
    pub known_child_sensitive_data_consents: Field<[u8; 2]>,
    pub personal_data_consents: Field<u8>,
    pub mspa_covered_transaction: Field<u8>,
    pub mspa_opt_out_option_mode: Field<u8>,
    pub mspa_service_provider_mode: Field<u8>,
}

impl ConsentSignal {
    /// Consent value for one sensitive category.
    #[must_use]
    pub fn sensitive(&self, category: SensitiveCategory) -> Field<u8> {
        self.sensitive_data_processing[category.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_and_not_applicable_stay_distinct() {
        let unset: Field<u8> = Field::from_option(None);
        assert!(unset.is_unset());
        assert!(!unset.is_not_applicable());
        assert_ne!(unset, Field::NotApplicable);
        assert_eq!(unset.value(), None);

        assert_eq!(Field::from_option(Some(2)).value(), Some(&2));
    }

    #[test]
    fn map_keeps_absence_kind() {
        assert_eq!(Field::<u8>::NotApplicable.map(u16::from), Field::NotApplicable);
        assert_eq!(Field::<u8>::Unset.map(u16::from), Field::Unset);
        assert_eq!(Field::Value(3_u8).map(u16::from), Field::Value(3_u16));
    }

    #[test]
    fn categories_are_indexed_in_canonical_order() {
        for (position, category) in SensitiveCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), position);
        }
        assert_eq!(SensitiveCategory::Health.index(), 2);
        assert_eq!(SensitiveCategory::CommunicationContents.index(), 11);
    }
}
