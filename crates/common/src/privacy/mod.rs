//! Consent signal normalization.
//!
//! The consent string decoder is external; it hands over a [`DecodedConsent`]
//! with one typed section per jurisdiction. [`ConsentSignalReader`] maps a
//! section into the jurisdiction independent [`ConsentSignal`], in which every
//! field is explicitly a value, unset, or not applicable.
//!
//! # Example
//!
//! ```
//! use bidstream_common::privacy::{ConsentSignalReader, DecodedConsent, Field, Jurisdiction};
//!
//! let signal = ConsentSignalReader::new(Jurisdiction::Utah).read(None::<&DecodedConsent>);
//! assert_eq!(signal.sale_opt_out, Field::Unset);
//! assert_eq!(signal.sharing_opt_out, Field::NotApplicable);
//! ```

pub mod reader;
pub mod section;
pub mod signal;

pub use reader::{collapse_child_consent, permute_sensitive_data, ConsentSignalReader, SensitiveDataMap};
pub use section::{DecodedConsent, Jurisdiction, UsNatSection, UsStateSection};
pub use signal::{ConsentSignal, Field, SensitiveCategory, SignalField, SENSITIVE_CATEGORY_COUNT};
