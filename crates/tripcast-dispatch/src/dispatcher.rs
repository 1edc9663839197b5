// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch dispatcher: turns stored traveler records into gateway sends.
//!
//! Every record goes through the same attempt: normalize the phone, claim
//! the row, reserve one quota slot, call the gateway, write the outcome
//! back under the claim. Records are processed sequentially in upload order.
//! A refused reservation stops the pass and leaves the remaining rows as
//! they were, so a later dispatch resumes where this one stopped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use tripcast_config::model::{QuotaScope, TripcastConfig};
use tripcast_core::{
    DeliveryStatus, DeliveryUpdate, GatewayAdapter, GatewayOutcome, QuotaTracker, StorageAdapter,
    TravelerMessage, TripcastError, mask_phone, normalize_phone, now_timestamp,
};
use tripcast_quota::{QuotaCalendar, quota_key};

use crate::template::{AgencyDirectory, TemplateProfile};

/// Dispatcher knobs taken from `[dispatch]`, `[retry]` and `[quota]`.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub default_country_code: String,
    pub claim_lease: Duration,
    pub retry_ceiling: u32,
    pub retry_batch_limit: usize,
    pub quota_scope: QuotaScope,
    pub check_provider_usage: bool,
}

impl DispatchSettings {
    pub fn from_config(config: &TripcastConfig) -> Self {
        Self {
            default_country_code: config.dispatch.default_country_code.clone(),
            claim_lease: Duration::from_secs(config.dispatch.claim_lease_secs),
            retry_ceiling: config.retry.max_retries,
            retry_batch_limit: config.retry.batch_limit,
            quota_scope: config.quota.scope,
            check_provider_usage: config.dispatch.check_provider_usage,
        }
    }
}

/// Result of one `dispatch_batch` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub upload_id: String,
    pub sent_count: u64,
    pub failed_count: u64,
    pub template_required_count: u64,
    /// Candidates owned by a concurrent dispatch.
    pub skipped_count: u64,
    /// Candidates not attempted in this pass.
    pub remaining_to_process: u64,
    pub limit_reached: bool,
}

/// Result of a manual single-record send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingleDispatchResult {
    pub success: bool,
    pub message: String,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Sent { provider_message_id: String },
    Failed { reason: String },
    TemplateRequired { detail: String },
    /// Rejected by phone normalization; the gateway was not called.
    InvalidPhone { reason: String },
    /// Another dispatch owns the record.
    Skipped,
    /// The daily limit refused the reservation; the record is untouched.
    QuotaExhausted,
}

impl AttemptOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            Self::Sent { .. } => "sent",
            Self::Failed { .. } => "failed",
            Self::TemplateRequired { .. } => "template_required",
            Self::InvalidPhone { .. } => "invalid_phone",
            Self::Skipped => "skipped",
            Self::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// Counters of one pass over a list of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassTally {
    pub candidates: u64,
    pub sent: u64,
    pub failed: u64,
    pub template_required: u64,
    pub skipped: u64,
    pub limit_reached: bool,
}

impl PassTally {
    /// Records that reached a final write in this pass.
    pub fn attempted(&self) -> u64 {
        self.sent + self.failed + self.template_required
    }

    /// Candidates left for a later pass.
    pub fn remaining(&self) -> u64 {
        self.candidates - self.attempted()
    }

    fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Sent { .. } => self.sent += 1,
            AttemptOutcome::Failed { .. } | AttemptOutcome::InvalidPhone { .. } => self.failed += 1,
            AttemptOutcome::TemplateRequired { .. } => self.template_required += 1,
            AttemptOutcome::Skipped => self.skipped += 1,
            AttemptOutcome::QuotaExhausted => self.limit_reached = true,
        }
    }
}

/// The batch dispatcher.
pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<dyn GatewayAdapter>,
    quota: Arc<dyn QuotaTracker>,
    calendar: QuotaCalendar,
    templates: AgencyDirectory,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn GatewayAdapter>,
        quota: Arc<dyn QuotaTracker>,
        calendar: QuotaCalendar,
        templates: AgencyDirectory,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            storage,
            gateway,
            quota,
            calendar,
            templates,
            settings,
        }
    }

    /// Builds a dispatcher with every knob taken from `config`.
    pub fn from_config(
        config: &TripcastConfig,
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn GatewayAdapter>,
        quota: Arc<dyn QuotaTracker>,
    ) -> Result<Self, TripcastError> {
        Ok(Self::new(
            storage,
            gateway,
            quota,
            QuotaCalendar::new(config.quota.utc_offset_minutes)?,
            AgencyDirectory::from_config(config),
            DispatchSettings::from_config(config),
        ))
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn templates(&self) -> &AgencyDirectory {
        &self.templates
    }

    pub fn calendar(&self) -> &QuotaCalendar {
        &self.calendar
    }

    /// Sends every record of `upload_id` that still needs delivery.
    ///
    /// Pending rows and Failed rows below the retry ceiling are candidates;
    /// Sent and TemplateRequired rows are never touched. Per-record problems
    /// end up in the counts; only store or configuration errors fail the call.
    pub async fn dispatch_batch(
        &self,
        upload_id: &str,
        message_override: Option<&str>,
    ) -> Result<DispatchSummary, TripcastError> {
        let batch = self
            .storage
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| TripcastError::upload_not_found(upload_id))?;
        let profile = self.templates.profile(&batch.agency_id)?;
        let candidates = self
            .storage
            .list_dispatchable(upload_id, self.settings.retry_ceiling)
            .await?;

        info!(
            upload_id,
            agency_id = %batch.agency_id,
            candidates = candidates.len(),
            "dispatching batch"
        );

        if self.settings.check_provider_usage {
            self.fold_provider_usage(&batch.agency_id).await;
        }

        let tally = self.run_pass(&candidates, &profile, message_override).await?;
        let summary = DispatchSummary {
            upload_id: upload_id.to_string(),
            sent_count: tally.sent,
            failed_count: tally.failed,
            template_required_count: tally.template_required,
            skipped_count: tally.skipped,
            remaining_to_process: tally.remaining(),
            limit_reached: tally.limit_reached,
        };

        info!(
            upload_id,
            sent = summary.sent_count,
            failed = summary.failed_count,
            template_required = summary.template_required_count,
            remaining = summary.remaining_to_process,
            limit_reached = summary.limit_reached,
            "batch dispatch finished"
        );
        Ok(summary)
    }

    /// Manually sends one record, regardless of the retry ceiling.
    pub async fn dispatch_single(
        &self,
        traveler_id: &str,
    ) -> Result<SingleDispatchResult, TripcastError> {
        let record = self
            .storage
            .get_traveler(traveler_id)
            .await?
            .ok_or_else(|| TripcastError::traveler_not_found(traveler_id))?;

        if record.delivery_status == DeliveryStatus::Sent {
            return Ok(SingleDispatchResult {
                success: true,
                message: "already sent".to_string(),
            });
        }

        let profile = self.templates.profile(&record.agency_id)?;
        let outcome = self.attempt(&record, &profile, None).await?;
        let (success, message) = match outcome {
            AttemptOutcome::Sent {
                provider_message_id,
            } => (true, format!("sent (provider id {provider_message_id})")),
            AttemptOutcome::Failed { reason } => (false, format!("send failed: {reason}")),
            AttemptOutcome::TemplateRequired { detail } => {
                (false, format!("template required: {detail}"))
            }
            AttemptOutcome::InvalidPhone { reason } => (false, reason),
            AttemptOutcome::Skipped => (
                false,
                "record is being processed by another dispatch".to_string(),
            ),
            AttemptOutcome::QuotaExhausted => (false, "daily send limit reached".to_string()),
        };
        Ok(SingleDispatchResult { success, message })
    }

    /// Stores a corrected phone for a record rejected by validation (or any
    /// other unsent record) so the retry pass picks it up again.
    ///
    /// The new phone must normalize; it is stored as given.
    pub async fn correct_phone(&self, traveler_id: &str, phone: &str) -> Result<(), TripcastError> {
        normalize_phone(phone, &self.settings.default_country_code)
            .map_err(|e| TripcastError::Validation(format!("invalid phone: {e}")))?;
        let record = self
            .storage
            .get_traveler(traveler_id)
            .await?
            .ok_or_else(|| TripcastError::traveler_not_found(traveler_id))?;
        if record.delivery_status == DeliveryStatus::Sent {
            return Err(TripcastError::Validation(format!(
                "traveler `{traveler_id}` was already sent"
            )));
        }
        if !self.storage.correct_phone(traveler_id, phone).await? {
            return Err(TripcastError::Validation(format!(
                "traveler `{traveler_id}` is being processed by another dispatch"
            )));
        }
        info!(traveler_id, phone = %mask_phone(phone), "phone corrected");
        Ok(())
    }

    /// Runs the per-record attempt over `records` in order, stopping at the
    /// first refused quota reservation.
    pub async fn run_pass(
        &self,
        records: &[TravelerMessage],
        profile: &TemplateProfile,
        message_override: Option<&str>,
    ) -> Result<PassTally, TripcastError> {
        let mut tally = PassTally {
            candidates: records.len() as u64,
            ..PassTally::default()
        };
        for record in records {
            let outcome = self.attempt(record, profile, message_override).await?;
            tally.record(&outcome);
            if outcome == AttemptOutcome::QuotaExhausted {
                info!(
                    upload_id = %record.upload_id,
                    position = record.position,
                    "daily send limit reached, stopping pass"
                );
                break;
            }
        }
        Ok(tally)
    }

    /// One send attempt for one record.
    pub async fn attempt(
        &self,
        record: &TravelerMessage,
        profile: &TemplateProfile,
        message_override: Option<&str>,
    ) -> Result<AttemptOutcome, TripcastError> {
        let outcome = self.attempt_inner(record, profile, message_override).await?;
        metrics::counter!("tripcast_messages_total", "outcome" => outcome.metric_label())
            .increment(1);
        Ok(outcome)
    }

    async fn attempt_inner(
        &self,
        record: &TravelerMessage,
        profile: &TemplateProfile,
        message_override: Option<&str>,
    ) -> Result<AttemptOutcome, TripcastError> {
        let normalized = normalize_phone(&record.phone, &self.settings.default_country_code);

        let Some(token) = self
            .storage
            .claim(
                &record.id,
                record.delivery_status,
                record.retry_count,
                self.settings.claim_lease,
            )
            .await?
        else {
            debug!(traveler_id = %record.id, "record claimed elsewhere, skipping");
            return Ok(AttemptOutcome::Skipped);
        };

        let phone = match normalized {
            Ok(phone) => phone,
            Err(e) => {
                let reason = format!("invalid phone: {e}");
                warn!(traveler_id = %record.id, phone = %mask_phone(&record.phone), %reason, "rejected before send");
                let update = DeliveryUpdate::Failed {
                    error: reason.clone(),
                    gateway_attempt: false,
                };
                self.storage
                    .complete(&record.id, &token, &update, &now_timestamp())
                    .await?;
                return Ok(AttemptOutcome::InvalidPhone { reason });
            }
        };

        let key = quota_key(self.settings.quota_scope, &record.agency_id);
        let today = self.calendar.today();
        let reserved = match self.quota.try_reserve(&key, today, 1).await {
            Ok(reserved) => reserved,
            Err(e) => {
                self.storage.release(&record.id, &token).await?;
                return Err(e);
            }
        };
        if !reserved {
            self.storage.release(&record.id, &token).await?;
            return Ok(AttemptOutcome::QuotaExhausted);
        }

        let message = profile.render(record, message_override);
        let gateway_outcome = self.gateway.send(&phone, &message).await;
        let attempted_at = now_timestamp();

        let (update, outcome) = match gateway_outcome {
            GatewayOutcome::Sent {
                provider_message_id,
            } => (
                DeliveryUpdate::Sent {
                    provider_message_id: provider_message_id.clone(),
                },
                AttemptOutcome::Sent {
                    provider_message_id,
                },
            ),
            GatewayOutcome::Failed { reason } => (
                DeliveryUpdate::Failed {
                    error: reason.clone(),
                    gateway_attempt: true,
                },
                AttemptOutcome::Failed { reason },
            ),
            GatewayOutcome::TemplateRequired { detail } => (
                DeliveryUpdate::TemplateRequired {
                    error: format!("template `{}` not provisioned: {detail}", message.template_name),
                },
                AttemptOutcome::TemplateRequired { detail },
            ),
        };

        let landed = self
            .storage
            .complete(&record.id, &token, &update, &attempted_at)
            .await?;
        if !landed {
            warn!(
                traveler_id = %record.id,
                status = %update.status(),
                "claim expired before the outcome was written"
            );
        }
        debug!(
            traveler_id = %record.id,
            phone = %mask_phone(&phone),
            status = %update.status(),
            "attempt recorded"
        );
        Ok(outcome)
    }

    /// Folds the provider's own sent-today figure into the local counter.
    /// Failures are logged and ignored.
    async fn fold_provider_usage(&self, agency_id: &str) {
        match self.gateway.daily_usage().await {
            Ok(Some(count)) => {
                let key = quota_key(self.settings.quota_scope, agency_id);
                if let Err(e) = self
                    .quota
                    .observe_external(&key, self.calendar.today(), count)
                    .await
                {
                    warn!(error = %e, "failed to record provider usage");
                }
            }
            Ok(None) => debug!("provider usage not available"),
            Err(e) => warn!(error = %e, "provider usage check failed"),
        }
    }
}
