//! Onboarding progression. Alignment and recommendations only run once the
//! user has an identity archetype and at least one aspiration.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::store::StoreDocument;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Onboarding,
    IdentityCreation,
    SteadyState,
}

impl Stage {
    pub fn of(document: &StoreDocument) -> Stage {
        let has_user = document
            .user
            .as_ref()
            .map_or(false, |user| !user.name.trim().is_empty());
        if !has_user {
            return Stage::Onboarding;
        }

        let has_archetype = document.identity.archetype.is_some();
        if has_archetype && !document.aspirations.is_empty() {
            Stage::SteadyState
        } else {
            Stage::IdentityCreation
        }
    }

    pub fn require(document: &StoreDocument, required: Stage) -> AdvisorResult<()> {
        let current = Stage::of(document);
        if current < required {
            return Err(AdvisorError::Stage { current, required });
        }
        Ok(())
    }
}
