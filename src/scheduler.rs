use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use tracing::info;

use crate::collector::Collector;
use crate::configuration::ScheduleSettings;
use crate::errors::ConfigurationError;

/// A trigger firing once a day at a fixed local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// The first trigger strictly after `now`.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();
        let tomorrow = today.succ_opt();
        let day_after = tomorrow.and_then(|d| d.succ_opt());

        [Some(today), tomorrow, day_after]
            .into_iter()
            .flatten()
            .filter_map(|date| self.resolve(&tz, date))
            .find(|candidate| candidate > now)
            .unwrap_or_else(|| now.clone() + Duration::days(1))
    }

    // Ambiguous local times (clocks going back) take the earlier instant; times
    // skipped by a DST gap move forward to the first one that exists.
    fn resolve<Tz: TimeZone>(&self, tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
        let local = date.and_time(self.at);
        (0..=8)
            .map(|quarter| local + Duration::minutes(15 * quarter))
            .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
    }
}

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Work the scheduler triggers; handles its own failures.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run_at(&self, now: DateTime<Local>);
}

#[async_trait]
impl Job for Collector {
    async fn run_at(&self, now: DateTime<Local>) {
        self.run_cycle(now).await;
    }
}

/// Drives a job: one optional run at startup, then once a day.
pub struct Scheduler<C = SystemClock> {
    schedule: DailySchedule,
    run_on_startup: bool,
    clock: C,
}

impl Scheduler {
    pub fn new(schedule: DailySchedule, run_on_startup: bool) -> Self {
        Self {
            schedule,
            run_on_startup,
            clock: SystemClock,
        }
    }

    pub fn from_settings(settings: &ScheduleSettings) -> Result<Self, ConfigurationError> {
        Ok(Self::new(
            DailySchedule::new(settings.time()?),
            settings.run_on_startup,
        ))
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock<T: Clock>(self, clock: T) -> Scheduler<T> {
        Scheduler {
            schedule: self.schedule,
            run_on_startup: self.run_on_startup,
            clock,
        }
    }

    /// Runs forever. Job failures never end the loop.
    pub async fn run<J: Job + ?Sized>(&self, job: &J) {
        self.start(job).await;

        info!(
            "Entering the daily schedule at {}",
            self.schedule.at().format("%H:%M")
        );
        let mut last_target = None;
        loop {
            last_target = Some(self.tick(job, last_target).await);
        }
    }

    /// The startup run, if enabled.
    pub async fn start<J: Job + ?Sized>(&self, job: &J) {
        if self.run_on_startup {
            info!("Running the first collection now");
            job.run_at(self.clock.now()).await;
        }
    }

    /// Sleeps until the next target, runs the job once and returns the target it ran for.
    pub async fn tick<J: Job + ?Sized>(
        &self,
        job: &J,
        last_target: Option<DateTime<Local>>,
    ) -> DateTime<Local> {
        let now = self.clock.now();
        let target = self.next_target(now, last_target);
        info!("Next collection at {}", target.format("%Y-%m-%d %H:%M:%S"));

        let wait = (target - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        job.run_at(self.clock.now()).await;
        target
    }

    /// Never returns a target already run, even if the timer woke a little early.
    pub fn next_target(
        &self,
        now: DateTime<Local>,
        last_target: Option<DateTime<Local>>,
    ) -> DateTime<Local> {
        let reference = match last_target {
            Some(target) if target > now => target,
            _ => now,
        };
        self.schedule.next_run_after(&reference)
    }
}
