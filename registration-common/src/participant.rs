use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest additional-info text accepted for an individual.
pub const INDIVIDUAL_ADDITIONAL_INFO_MAX_LENGTH: usize = 1000;
/// Longest additional-info text accepted for an organization.
pub const ORGANIZATION_ADDITIONAL_INFO_MAX_LENGTH: usize = 5000;

/// Discriminates the two participant shapes the registration API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ParticipantType {
    #[serde(rename = "INDIVIDUAL")]
    Individual,
    #[serde(rename = "ORGANIZATION")]
    Organization,
}

impl ParticipantType {
    /// Upper bound on the free-text additional info for this participant type.
    pub fn additional_info_max_length(self) -> usize {
        match self {
            ParticipantType::Individual => INDIVIDUAL_ADDITIONAL_INFO_MAX_LENGTH,
            ParticipantType::Organization => ORGANIZATION_ADDITIONAL_INFO_MAX_LENGTH,
        }
    }
}

impl fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParticipantType::Individual => write!(f, "INDIVIDUAL"),
            ParticipantType::Organization => write!(f, "ORGANIZATION"),
        }
    }
}

/// How the participant pays for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PaymentMethod {
    #[serde(rename = "CARD")]
    Card,
    #[serde(rename = "BANK_TRANSFER")]
    BankTransfer,
    #[serde(rename = "CASH")]
    Cash,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsePaymentMethodError(pub String);

impl FromStr for PaymentMethod {
    type Err = ParsePaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(PaymentMethod::Card),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "CASH" => Ok(PaymentMethod::Cash),
            invalid => Err(ParsePaymentMethodError(invalid.to_owned())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "CARD"),
            PaymentMethod::BankTransfer => write!(f, "BANK_TRANSFER"),
            PaymentMethod::Cash => write!(f, "CASH"),
        }
    }
}

/// A participant as the stores exchange it.
///
/// `id` is absent until the participant store has created the record. Exactly
/// one of the two identity keys is populated: `personal_code` for individuals,
/// `registration_code` for organizations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub participant_type: ParticipantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

impl Participant {
    pub fn individual(
        first_name: &str,
        last_name: &str,
        personal_code: &str,
        payment_method: PaymentMethod,
    ) -> Self {
        Participant {
            id: None,
            participant_type: ParticipantType::Individual,
            first_name: Some(first_name.to_owned()),
            last_name: Some(last_name.to_owned()),
            personal_code: Some(personal_code.to_owned()),
            company_name: None,
            registration_code: None,
            participant_count: None,
            contact_person: None,
            payment_method,
            email: None,
            phone: None,
            additional_info: None,
        }
    }

    pub fn organization(
        company_name: &str,
        registration_code: &str,
        payment_method: PaymentMethod,
    ) -> Self {
        Participant {
            id: None,
            participant_type: ParticipantType::Organization,
            first_name: None,
            last_name: None,
            personal_code: None,
            company_name: Some(company_name.to_owned()),
            registration_code: Some(registration_code.to_owned()),
            participant_count: Some(1),
            contact_person: None,
            payment_method,
            email: None,
            phone: None,
            additional_info: None,
        }
    }

    /// The identity key for this participant's type, when populated.
    pub fn identity_value(&self) -> Option<&str> {
        match self.participant_type {
            ParticipantType::Individual => self.personal_code.as_deref(),
            ParticipantType::Organization => self.registration_code.as_deref(),
        }
    }

    /// Name shown in participant lists and suggestion dropdowns.
    pub fn display_name(&self) -> String {
        match self.participant_type {
            ParticipantType::Individual => format!(
                "{} {}",
                self.first_name.as_deref().unwrap_or_default(),
                self.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_owned(),
            ParticipantType::Organization => {
                self.company_name.clone().unwrap_or_default()
            }
        }
    }

    /// Which type this record looks like, judged by the populated identity
    /// key first and the display fields second. Used when a search hit is
    /// copied back into the form.
    pub fn inferred_type(&self) -> Option<ParticipantType> {
        if has_text(&self.personal_code) {
            Some(ParticipantType::Individual)
        } else if has_text(&self.registration_code) {
            Some(ParticipantType::Organization)
        } else if has_text(&self.first_name) || has_text(&self.last_name) {
            Some(ParticipantType::Individual)
        } else if has_text(&self.company_name) {
            Some(ParticipantType::Organization)
        } else {
            None
        }
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
