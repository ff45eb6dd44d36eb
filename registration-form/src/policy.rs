use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use registration_common::participant::{
    ParticipantType, INDIVIDUAL_ADDITIONAL_INFO_MAX_LENGTH,
    ORGANIZATION_ADDITIONAL_INFO_MAX_LENGTH,
};

/// Fields of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ParticipantType,
    FirstName,
    LastName,
    PersonalCode,
    CompanyName,
    RegistrationCode,
    ParticipantCount,
    ContactPerson,
    PaymentMethod,
    Email,
    Phone,
    AdditionalInfo,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::ParticipantType,
        Field::FirstName,
        Field::LastName,
        Field::PersonalCode,
        Field::CompanyName,
        Field::RegistrationCode,
        Field::ParticipantCount,
        Field::ContactPerson,
        Field::PaymentMethod,
        Field::Email,
        Field::Phone,
        Field::AdditionalInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ParticipantType => "participantType",
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::PersonalCode => "personalCode",
            Field::CompanyName => "companyName",
            Field::RegistrationCode => "registrationCode",
            Field::ParticipantCount => "participantCount",
            Field::ContactPerson => "contactPerson",
            Field::PaymentMethod => "paymentMethod",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::AdditionalInfo => "additionalInfo",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pattern an organization's registration code must match.
pub static REGISTRATION_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("registration code regex compiles"));

/// Required fields and bounds for one participant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub required: &'static [Field],
    pub additional_info_max_length: usize,
}

impl FieldPolicy {
    pub fn requires(&self, field: Field) -> bool {
        self.required.contains(&field)
    }
}

const INDIVIDUAL_REQUIRED: &[Field] = &[
    Field::FirstName,
    Field::LastName,
    Field::PersonalCode,
    Field::PaymentMethod,
];

const ORGANIZATION_REQUIRED: &[Field] = &[
    Field::CompanyName,
    Field::RegistrationCode,
    Field::ParticipantCount,
    Field::PaymentMethod,
];

// The payment method requirement is never toggled by the type control.
const UNSET_REQUIRED: &[Field] = &[Field::PaymentMethod];

/// Field policy for the given participant type. With no type picked yet only
/// the payment method stays required, and the stricter individual note limit
/// applies.
pub fn policy_for(participant_type: Option<ParticipantType>) -> FieldPolicy {
    match participant_type {
        Some(ParticipantType::Individual) => FieldPolicy {
            required: INDIVIDUAL_REQUIRED,
            additional_info_max_length: INDIVIDUAL_ADDITIONAL_INFO_MAX_LENGTH,
        },
        Some(ParticipantType::Organization) => FieldPolicy {
            required: ORGANIZATION_REQUIRED,
            additional_info_max_length: ORGANIZATION_ADDITIONAL_INFO_MAX_LENGTH,
        },
        None => FieldPolicy {
            required: UNSET_REQUIRED,
            additional_info_max_length: INDIVIDUAL_ADDITIONAL_INFO_MAX_LENGTH,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn individual_required_set_is_exact() {
        let policy = policy_for(Some(ParticipantType::Individual));
        for field in Field::ALL {
            let expected = matches!(
                field,
                Field::FirstName | Field::LastName | Field::PersonalCode | Field::PaymentMethod
            );
            assert_eq!(policy.requires(field), expected, "{field}");
        }
        assert_eq!(policy.additional_info_max_length, 1000);
    }

    #[test]
    fn organization_required_set_is_exact() {
        let policy = policy_for(Some(ParticipantType::Organization));
        for field in Field::ALL {
            let expected = matches!(
                field,
                Field::CompanyName
                    | Field::RegistrationCode
                    | Field::ParticipantCount
                    | Field::PaymentMethod
            );
            assert_eq!(policy.requires(field), expected, "{field}");
        }
        assert_eq!(policy.additional_info_max_length, 5000);
    }

    #[test]
    fn unset_type_keeps_only_payment_method_required() {
        let policy = policy_for(None);
        for field in Field::ALL {
            assert_eq!(policy.requires(field), field == Field::PaymentMethod, "{field}");
        }
        assert_eq!(policy.additional_info_max_length, 1000);
    }

    #[test]
    fn registration_code_pattern_is_eight_digits() {
        assert!(REGISTRATION_CODE_PATTERN.is_match("12345678"));
        assert!(!REGISTRATION_CODE_PATTERN.is_match("1234567"));
        assert!(!REGISTRATION_CODE_PATTERN.is_match("123456789"));
        assert!(!REGISTRATION_CODE_PATTERN.is_match("1234567a"));
    }
}
