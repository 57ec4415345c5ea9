//! Time passing at the table.
//!
//! Each tick consumes the time elapsed on the live clock since the previous
//! tick and applies it to every active instance: onset countdowns, maximum
//! duration tracking, save-window migration and due-save detection.

use std::sync::Arc;

use afflictor_domain::{AfflictionEvent, AfflictionInstance, InstanceId, TableTime, TargetId};

use super::progression::Progression;
use super::AfflictionError;
use crate::infrastructure::ports::{AfflictionStore, TableClockPort};

/// A stage save whose window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueSave {
    pub target_id: TargetId,
    pub instance_id: InstanceId,
    pub stage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub elapsed_seconds: i64,
    pub onset_ended: usize,
    pub expired: usize,
    pub migrated: usize,
    pub due: Vec<DueSave>,
}

pub struct Tick {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl Tick {
    pub fn new(
        progression: Arc<Progression>,
        store: Arc<dyn AfflictionStore>,
        table_clock: Arc<dyn TableClockPort>,
    ) -> Self {
        Self {
            progression,
            store,
            table_clock,
        }
    }

    pub async fn execute(&self) -> Result<TickReport, AfflictionError> {
        let now = self.table_clock.current().await;
        let elapsed = self.table_clock.elapsed_since_last_tick(now.mode()).await;
        let mut report = TickReport {
            elapsed_seconds: elapsed,
            ..TickReport::default()
        };

        for target_id in self.store.list_targets().await? {
            let records = match self.store.get(target_id).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!(%target_id, error = %e, "Failed to load afflictions, skipping target");
                    continue;
                }
            };
            for instance in records.into_values().filter(AfflictionInstance::is_active) {
                let instance_id = instance.id;
                if let Err(e) = self.advance(instance, elapsed, &now, &mut report).await {
                    tracing::error!(%target_id, %instance_id, error = %e, "Failed to advance affliction");
                }
            }
        }

        if report.onset_ended + report.expired + report.due.len() > 0 {
            tracing::info!(
                elapsed,
                onset_ended = report.onset_ended,
                expired = report.expired,
                due = report.due.len(),
                "Tick processed"
            );
        }
        Ok(report)
    }

    async fn advance(
        &self,
        mut instance: AfflictionInstance,
        elapsed: i64,
        now: &TableTime,
        report: &mut TickReport,
    ) -> Result<(), AfflictionError> {
        let mut dirty = false;
        let mut events = Vec::new();

        if now.is_in_combat() && instance.last_seen_round != Some(now.round) {
            instance.last_seen_round = Some(now.round);
            dirty = true;
        }
        if instance.migrate_next_save(now) {
            tracing::debug!(affliction = %instance.name(), next_save = ?instance.next_save, "Migrated save window");
            report.migrated += 1;
            dirty = true;
        }

        // Time left over once onset ends still counts toward maximum duration.
        let mut remaining = elapsed;
        if instance.in_onset && elapsed > 0 {
            let before = instance.onset_remaining_seconds;
            remaining = 0;
            dirty = true;
            if let Some(stage) = instance.advance_onset(elapsed) {
                remaining = (elapsed - before).max(0);
                self.progression.enter_stage(&mut instance, stage, now).await?;
                report.onset_ended += 1;
                events.push(AfflictionEvent::OnsetEnded { stage });
            }
        }

        if remaining > 0 && instance.current_stage > 0 {
            let max_seconds = if instance.max_duration_expired {
                None
            } else {
                self.progression.max_duration_seconds(&mut instance).await
            };
            if instance.record_elapsed(remaining, max_seconds) {
                let stage = instance.current_stage.max(0) as u32;
                tracing::warn!(affliction = %instance.name(), stage, "Maximum duration reached");
                report.expired += 1;
                events.push(AfflictionEvent::MaxDurationExpired { stage });
            }
            dirty = true;
        }

        if instance.is_save_due(now) {
            if let Some(stage) = instance.current_stage_number() {
                report.due.push(DueSave {
                    target_id: instance.target_id,
                    instance_id: instance.id,
                    stage,
                });
                if instance.mark_save_due_notified() {
                    let dc = instance.definition.valid_dc().unwrap_or_default();
                    events.push(AfflictionEvent::StageSaveDue { stage, dc });
                    dirty = true;
                }
            }
        }

        if dirty {
            self.store.put(&instance).await?;
        }
        for event in events {
            self.progression.notify(&instance, event).await;
        }
        Ok(())
    }
}
