// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agency template profiles and parameter building.
//!
//! Template parameter order: traveler name, coupon code, travel date, and
//! a free-text slot that carries the agency website unless an operator
//! supplied a message override for the batch.

use std::collections::HashMap;

use tripcast_config::model::{TripcastConfig, WhatsAppConfig};
use tripcast_core::{TemplateMessage, TravelerMessage, TripcastError};

/// Template settings resolved for one agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateProfile {
    pub template_name: String,
    pub website_url: Option<String>,
    pub image_url: Option<String>,
}

impl TemplateProfile {
    /// Renders the send request for one traveler.
    pub fn render(&self, record: &TravelerMessage, message_override: Option<&str>) -> TemplateMessage {
        let free_text = message_override
            .map(str::to_string)
            .or_else(|| self.website_url.clone())
            .unwrap_or_default();
        TemplateMessage {
            template_name: self.template_name.clone(),
            params: vec![
                record.traveler_name.clone(),
                record.coupon_code.clone(),
                record.travel_date.clone(),
                free_text,
            ],
            media_url: self.image_url.clone(),
        }
    }
}

/// Lookup of agency profiles with `[whatsapp]` fallbacks.
#[derive(Debug, Clone, Default)]
pub struct AgencyDirectory {
    profiles: HashMap<String, TemplateProfile>,
    defaults: WhatsAppConfig,
}

impl AgencyDirectory {
    /// Builds the directory from `[[agencies]]` and `[whatsapp]`.
    pub fn from_config(config: &TripcastConfig) -> Self {
        let profiles = config
            .agencies
            .iter()
            .map(|a| {
                (
                    a.id.clone(),
                    TemplateProfile {
                        template_name: a.template_name.clone(),
                        website_url: a
                            .website_url
                            .clone()
                            .or_else(|| config.whatsapp.default_website_url.clone()),
                        image_url: a
                            .image_url
                            .clone()
                            .or_else(|| config.whatsapp.default_image_url.clone()),
                    },
                )
            })
            .collect();
        Self {
            profiles,
            defaults: config.whatsapp.clone(),
        }
    }

    /// Profile for `agency_id`, falling back to the default template.
    ///
    /// A [`TripcastError::Config`] here aborts a dispatch before any send.
    pub fn profile(&self, agency_id: &str) -> Result<TemplateProfile, TripcastError> {
        if let Some(profile) = self.profiles.get(agency_id) {
            return Ok(profile.clone());
        }
        let template_name = self.defaults.default_template.clone().ok_or_else(|| {
            TripcastError::Config(format!(
                "agency `{agency_id}` has no template profile and no default template is configured"
            ))
        })?;
        Ok(TemplateProfile {
            template_name,
            website_url: self.defaults.default_website_url.clone(),
            image_url: self.defaults.default_image_url.clone(),
        })
    }
}
