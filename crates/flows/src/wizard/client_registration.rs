//! Client sign-up: personal info, service preferences, additional info,
//! confirmation.

use async_trait::async_trait;
use client_core::{ClientError, MarketplaceApi};
use serde::{Deserialize, Serialize};
use shared::{
    domain::Amount,
    protocol::{ClientRegistrationRequest, RegistrationReceipt},
};

use super::{
    clean_list, merge, optional, trimmed, PersonalInfo, PersonalInfoPatch, SubmissionSink,
    WizardError, WizardSchema,
};
use crate::validation::RequiredField;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub service_type: String,
    pub frequency: String,
    pub preferred_schedule: String,
    pub budget: String,
    pub household: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesPatch {
    pub service_type: Option<String>,
    pub frequency: Option<String>,
    pub preferred_schedule: Option<String>,
    pub budget: Option<String>,
    pub household: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub notes: String,
    pub referral_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdditionalInfoPatch {
    pub notes: Option<String>,
    pub referral_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSections {
    pub personal_info: PersonalInfo,
    pub preferences: Preferences,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "camelCase")]
pub enum ClientRegistrationUpdate {
    PersonalInfo(PersonalInfoPatch),
    Preferences(PreferencesPatch),
    AdditionalInfo(AdditionalInfoPatch),
}

#[derive(Debug, Clone, Copy)]
pub struct ClientRegistration;

impl WizardSchema for ClientRegistration {
    type Sections = ClientSections;
    type Update = ClientRegistrationUpdate;
    type Submission = ClientRegistrationRequest;
    type Receipt = RegistrationReceipt;

    const NAME: &'static str = "client_registration";
    const TOTAL_STEPS: usize = 4;

    fn required_fields(step: usize, sections: &ClientSections) -> Vec<RequiredField<'_>> {
        match step {
            0 => sections.personal_info.required_fields(),
            1 => vec![
                RequiredField::new("serviceType", &sections.preferences.service_type),
                RequiredField::new("frequency", &sections.preferences.frequency),
            ],
            _ => Vec::new(),
        }
    }

    fn apply(sections: &mut ClientSections, update: ClientRegistrationUpdate) {
        match update {
            ClientRegistrationUpdate::PersonalInfo(patch) => {
                patch.merge_into(&mut sections.personal_info)
            }
            ClientRegistrationUpdate::Preferences(patch) => {
                let target = &mut sections.preferences;
                merge(&mut target.service_type, patch.service_type);
                merge(&mut target.frequency, patch.frequency);
                merge(&mut target.preferred_schedule, patch.preferred_schedule);
                merge(&mut target.budget, patch.budget);
                merge(&mut target.household, patch.household);
            }
            ClientRegistrationUpdate::AdditionalInfo(patch) => {
                let target = &mut sections.additional_info;
                merge(&mut target.notes, patch.notes);
                merge(&mut target.referral_source, patch.referral_source);
            }
        }
    }

    fn submission(sections: &ClientSections) -> Result<ClientRegistrationRequest, WizardError> {
        let personal = &sections.personal_info;
        let preferences = &sections.preferences;
        let budget = match optional(&preferences.budget) {
            Some(raw) => Some(parse_budget(&raw)?),
            None => None,
        };
        Ok(ClientRegistrationRequest {
            first_name: trimmed(&personal.first_name),
            last_name: trimmed(&personal.last_name),
            email: trimmed(&personal.email),
            phone: trimmed(&personal.phone),
            address: trimmed(&personal.address),
            service_type: trimmed(&preferences.service_type),
            frequency: trimmed(&preferences.frequency),
            preferred_schedule: optional(&preferences.preferred_schedule),
            budget,
            household: clean_list(&preferences.household),
            notes: optional(&sections.additional_info.notes),
            referral_source: optional(&sections.additional_info.referral_source),
        })
    }
}

/// Accepts "25000", "25 000" or "25000 FCFA".
fn parse_budget(raw: &str) -> Result<Amount, WizardError> {
    let digits: String = raw
        .trim()
        .trim_end_matches("FCFA")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    digits
        .parse::<i64>()
        .ok()
        .filter(|value| *value >= 0)
        .map(Amount)
        .ok_or_else(|| WizardError::InvalidField {
            field: "budget",
            reason: format!("'{raw}' is not an amount in FCFA"),
        })
}

#[async_trait]
impl<T> SubmissionSink<ClientRegistration> for T
where
    T: MarketplaceApi + ?Sized,
{
    async fn deliver(
        &self,
        submission: &ClientRegistrationRequest,
    ) -> Result<RegistrationReceipt, ClientError> {
        self.register_client(submission).await
    }
}
