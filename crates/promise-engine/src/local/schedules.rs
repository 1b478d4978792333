//! Schedule registration, lookup, and deletion.

use tracing::debug;

use promise_core::*;

use super::Ops;
use super::search::IdPattern;
use super::tables::*;

/// Minute, hour, day of month, month, day of week.
const CRON_FIELDS: usize = 5;

fn validate_cron(cron: &str) -> EngineResult<()> {
    let fields = cron.split_whitespace().count();
    if fields != CRON_FIELDS {
        return Err(EngineError::Invalid(format!(
            "cron expression {cron:?} has {fields} fields, expected {CRON_FIELDS}"
        )));
    }
    Ok(())
}

impl Ops<'_> {
    pub(super) fn search_schedules(
        &self,
        req: SearchSchedulesRequest,
    ) -> EngineResult<SearchSchedulesResponse> {
        let pattern = IdPattern::new(req.id.as_deref())?;
        let schedules = self
            .txn
            .scan::<ScheduleRecord>(SCHEDULES, "")?
            .into_iter()
            .filter(|s| pattern.matches(&s.id))
            .collect();
        Ok(SearchSchedulesResponse { schedules })
    }

    pub(super) fn create_schedule(
        &self,
        req: CreateScheduleRequest,
    ) -> EngineResult<CreateScheduleResponse> {
        if let Some(existing) = self.txn.get::<ScheduleRecord>(SCHEDULES, &req.id)? {
            if req.i_key.is_some() && existing.idempotency_key == req.i_key {
                return Ok(CreateScheduleResponse { schedule: existing });
            }
            return Err(EngineError::ScheduleAlreadyExists(req.id));
        }
        validate_cron(&req.cron)?;

        let schedule = ScheduleRecord {
            id: req.id,
            description: req.description,
            cron: req.cron,
            tags: req.tags,
            promise_id: req.promise_id,
            promise_timeout: req.promise_timeout,
            promise_param: req.promise_param,
            promise_tags: req.promise_tags,
            idempotency_key: req.i_key,
            last_run_time: None,
            next_run_time: None,
            created_on: self.now,
        };
        self.txn.put(SCHEDULES, &schedule.id, &schedule)?;
        debug!(schedule_id = %schedule.id, cron = %schedule.cron, "schedule created");
        Ok(CreateScheduleResponse { schedule })
    }

    pub(super) fn read_schedule(
        &self,
        req: ReadScheduleRequest,
    ) -> EngineResult<ReadScheduleResponse> {
        let schedule = self
            .txn
            .get(SCHEDULES, &req.id)?
            .ok_or(EngineError::ScheduleNotFound(req.id))?;
        Ok(ReadScheduleResponse { schedule })
    }

    pub(super) fn delete_schedule(
        &self,
        req: DeleteScheduleRequest,
    ) -> EngineResult<DeleteScheduleResponse> {
        if !self.txn.remove(SCHEDULES, &req.id)? {
            return Err(EngineError::ScheduleNotFound(req.id));
        }
        debug!(schedule_id = %req.id, "schedule deleted");
        Ok(DeleteScheduleResponse {})
    }
}
