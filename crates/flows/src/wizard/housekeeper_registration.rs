//! Housekeeper sign-up: personal info, experience, documents, confirmation.

use async_trait::async_trait;
use client_core::{ClientError, MarketplaceApi};
use serde::{Deserialize, Serialize};
use shared::protocol::{Employee, HousekeeperRegistrationRequest};

use super::{
    clean_list, merge, optional, trimmed, PersonalInfo, PersonalInfoPatch, SubmissionSink,
    WizardError, WizardSchema,
};
use crate::validation::RequiredField;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub service_category: String,
    /// Kept as typed text until submit.
    pub years_of_experience: String,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub previous_employer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExperiencePatch {
    pub service_category: Option<String>,
    pub years_of_experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub previous_employer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    pub id_document: String,
    pub criminal_record: String,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentsPatch {
    pub id_document: Option<String>,
    pub criminal_record: Option<String>,
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HousekeeperSections {
    pub personal_info: PersonalInfo,
    pub experience: Experience,
    pub documents: Documents,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "camelCase")]
pub enum HousekeeperRegistrationUpdate {
    PersonalInfo(PersonalInfoPatch),
    Experience(ExperiencePatch),
    Documents(DocumentsPatch),
}

#[derive(Debug, Clone, Copy)]
pub struct HousekeeperRegistration;

impl WizardSchema for HousekeeperRegistration {
    type Sections = HousekeeperSections;
    type Update = HousekeeperRegistrationUpdate;
    type Submission = HousekeeperRegistrationRequest;
    type Receipt = Employee;

    const NAME: &'static str = "housekeeper_registration";
    const TOTAL_STEPS: usize = 4;

    fn required_fields(step: usize, sections: &HousekeeperSections) -> Vec<RequiredField<'_>> {
        match step {
            0 => sections.personal_info.required_fields(),
            1 => vec![
                RequiredField::new("serviceCategory", &sections.experience.service_category),
                RequiredField::new(
                    "yearsOfExperience",
                    &sections.experience.years_of_experience,
                ),
            ],
            2 => vec![RequiredField::new(
                "idDocument",
                &sections.documents.id_document,
            )],
            _ => Vec::new(),
        }
    }

    fn apply(sections: &mut HousekeeperSections, update: HousekeeperRegistrationUpdate) {
        match update {
            HousekeeperRegistrationUpdate::PersonalInfo(patch) => {
                patch.merge_into(&mut sections.personal_info)
            }
            HousekeeperRegistrationUpdate::Experience(patch) => {
                let target = &mut sections.experience;
                merge(&mut target.service_category, patch.service_category);
                merge(&mut target.years_of_experience, patch.years_of_experience);
                merge(&mut target.skills, patch.skills);
                merge(&mut target.languages, patch.languages);
                merge(&mut target.previous_employer, patch.previous_employer);
            }
            HousekeeperRegistrationUpdate::Documents(patch) => {
                let target = &mut sections.documents;
                merge(&mut target.id_document, patch.id_document);
                merge(&mut target.criminal_record, patch.criminal_record);
                merge(&mut target.references, patch.references);
            }
        }
    }

    fn submission(
        sections: &HousekeeperSections,
    ) -> Result<HousekeeperRegistrationRequest, WizardError> {
        let personal = &sections.personal_info;
        let experience = &sections.experience;
        let documents = &sections.documents;
        let raw_years = experience.years_of_experience.trim();
        let years_of_experience =
            raw_years
                .parse::<u32>()
                .map_err(|_| WizardError::InvalidField {
                    field: "yearsOfExperience",
                    reason: format!("'{raw_years}' is not a whole number of years"),
                })?;

        Ok(HousekeeperRegistrationRequest {
            first_name: trimmed(&personal.first_name),
            last_name: trimmed(&personal.last_name),
            email: trimmed(&personal.email),
            phone: trimmed(&personal.phone),
            address: trimmed(&personal.address),
            service_category: trimmed(&experience.service_category),
            years_of_experience,
            skills: clean_list(&experience.skills),
            languages: clean_list(&experience.languages),
            previous_employer: optional(&experience.previous_employer),
            id_document: trimmed(&documents.id_document),
            criminal_record: optional(&documents.criminal_record),
            references: clean_list(&documents.references),
        })
    }
}

#[async_trait]
impl<T> SubmissionSink<HousekeeperRegistration> for T
where
    T: MarketplaceApi + ?Sized,
{
    async fn deliver(
        &self,
        submission: &HousekeeperRegistrationRequest,
    ) -> Result<Employee, ClientError> {
        self.register_housekeeper(submission).await
    }
}
