use crate::application::events::{AppEvent, EventBus};
use crate::domain::models::{DailyEntry, MOOD_MAX, MOOD_MIN, SeedBundle, SeedMeta};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_store::{LocalStore, keys};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::sync::Arc;

pub const DEFAULT_DAYS: u32 = 28;
pub const DEFAULT_VARIABILITY: f64 = 0.12;

// One step in twenty simulates a "bad day" with a larger baseline jump.
const JUMP_CHANCE: f64 = 0.05;
const JUMP_SCALE: f64 = 2.5;
const DRIFT_SCALE: f64 = 0.5;
// Mood swings at 60% of the other metrics' variability.
const MOOD_DAMPING: f64 = 0.6;
const SLEEP_IDEAL_HOURS: f64 = 8.0;

/// Random walk with a per-metric baseline: proportional drift each step,
/// independent additive noise each day, everything clamped to the metric's
/// realistic range.
struct MetricWalk {
    baseline: f64,
    min: f64,
    max: f64,
    damping: f64,
}

impl MetricWalk {
    fn new(baseline: f64, min: f64, max: f64) -> Self {
        Self {
            baseline,
            min,
            max,
            damping: 1.0,
        }
    }

    fn with_damping(baseline: f64, min: f64, max: f64, damping: f64) -> Self {
        Self {
            baseline,
            min,
            max,
            damping,
        }
    }

    fn step(&mut self, rng: &mut impl Rng, variability: f64) -> f64 {
        let scale = if rng.gen_bool(JUMP_CHANCE) {
            JUMP_SCALE
        } else {
            DRIFT_SCALE
        };
        let drift = rng.gen_range(-variability..=variability) * scale * self.damping;
        self.baseline = (self.baseline * (1.0 + drift)).clamp(self.min, self.max);

        let noise = rng.gen_range(-variability..=variability) * self.baseline * self.damping;
        (self.baseline + noise).clamp(self.min, self.max)
    }
}

/// Resolves "today" in the configured timezone, falling back to UTC when the
/// name is missing or unknown.
pub fn local_today(timezone: Option<&str>, now: DateTime<Utc>) -> NaiveDate {
    if let Some(name) = timezone {
        if let Ok(tz) = name.trim().parse::<Tz>() {
            return now.with_timezone(&tz).date_naive();
        }
    }
    now.date_naive()
}

/// Generates `days` consecutive entries ending at `end_date`.
pub fn generate_preview(
    days: u32,
    variability: f64,
    end_date: NaiveDate,
    rng: &mut impl Rng,
) -> Vec<DailyEntry> {
    if days == 0 {
        return Vec::new();
    }
    let variability = if variability.is_finite() {
        variability.clamp(0.0, 0.6)
    } else {
        0.0
    };

    let mut sleep = MetricWalk::new(7.2, 0.0, 13.0);
    let mut activity = MetricWalk::new(38.0, 0.0, 240.0);
    let mut steps = MetricWalk::new(7600.0, 0.0, 40000.0);
    let mut mood = MetricWalk::with_damping(3.4, MOOD_MIN as f64, MOOD_MAX as f64, MOOD_DAMPING);
    let mut meals = MetricWalk::new(3.0, 1.0, 6.0);
    let mut habits = MetricWalk::new(2.5, 0.0, 8.0);

    let start = end_date - Duration::days(days as i64 - 1);
    let mut entries = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let date = start + Duration::days(offset as i64);
        let sleep_hours = round_one_decimal(sleep.step(rng, variability));
        let sleep_score = derive_sleep_score(sleep_hours, rng);

        entries.push(DailyEntry {
            date,
            sleep_hours,
            sleep_score,
            activity_minutes: activity.step(rng, variability).round() as u32,
            steps: steps.step(rng, variability).round() as u32,
            mood: (mood.step(rng, variability).round() as u8).clamp(MOOD_MIN, MOOD_MAX),
            meals: meals.step(rng, variability).round() as u32,
            habits_completed: habits.step(rng, variability).round() as u32,
        });
    }
    entries
}

/// Sleep score follows sleep hours through a ratio against the 8-hour ideal,
/// capped at 1.0 and scaled by a small random multiplier so the score is not
/// a pure function of the hours.
fn derive_sleep_score(sleep_hours: f64, rng: &mut impl Rng) -> u8 {
    let ratio = (sleep_hours / SLEEP_IDEAL_HOURS).min(1.0);
    let score = ratio * 100.0 * rng.gen_range(0.9..=1.05);
    score.clamp(0.0, 100.0).round() as u8
}

pub fn build_bundle(
    daily: Vec<DailyEntry>,
    variability: f64,
    generated_at: DateTime<Utc>,
) -> SeedBundle {
    let dates = daily.iter().map(|entry| entry.date).collect();
    let meta = SeedMeta {
        days: daily.len() as u32,
        variability,
        generated_at,
    };
    SeedBundle { dates, daily, meta }
}

/// Persists seed bundles and announces writes so every open view reloads
/// without a restart.
pub struct SeedService<S>
where
    S: LocalStore,
{
    store: Arc<S>,
    events: EventBus,
}

impl<S> SeedService<S>
where
    S: LocalStore,
{
    pub fn new(store: Arc<S>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub fn save(&self, bundle: &SeedBundle) -> Result<(), InfraError> {
        bundle.validate().map_err(InfraError::InvalidConfig)?;
        let payload = serde_json::to_string(bundle)?;
        self.store.put(keys::MOCK_SEED, &payload)?;
        self.events.publish(AppEvent::SeedUpdated);
        Ok(())
    }

    pub fn load(&self) -> Result<Option<SeedBundle>, InfraError> {
        let Some(payload) = self.store.get(keys::MOCK_SEED)? else {
            return Ok(None);
        };
        let bundle = serde_json::from_str::<SeedBundle>(&payload)?;
        Ok(Some(bundle))
    }

    pub fn clear(&self) -> Result<(), InfraError> {
        self.store.remove(keys::MOCK_SEED)?;
        self.events.publish(AppEvent::SeedUpdated);
        Ok(())
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::local_store::InMemoryLocalStore;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixed_end_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).expect("valid date")
    }

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-07T09:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn preview_has_requested_length_and_valid_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        let entries = generate_preview(28, 0.12, fixed_end_date(), &mut rng);

        assert_eq!(entries.len(), 28);
        for entry in &entries {
            assert!(entry.sleep_hours >= 0.0);
            assert!((MOOD_MIN..=MOOD_MAX).contains(&entry.mood));
            entry.validate().expect("entry within domain ranges");
        }
    }

    #[test]
    fn preview_dates_are_consecutive_and_end_at_requested_day() {
        let mut rng = StdRng::seed_from_u64(3);
        let entries = generate_preview(7, 0.12, fixed_end_date(), &mut rng);

        assert_eq!(entries.last().expect("non-empty").date, fixed_end_date());
        for pair in entries.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
    }

    #[test]
    fn preview_is_deterministic_for_a_fixed_seed() {
        let mut first_rng = StdRng::seed_from_u64(42);
        let mut second_rng = StdRng::seed_from_u64(42);
        let first = generate_preview(14, 0.2, fixed_end_date(), &mut first_rng);
        let second = generate_preview(14, 0.2, fixed_end_date(), &mut second_rng);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_days_yields_empty_preview() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_preview(0, 0.12, fixed_end_date(), &mut rng).is_empty());
    }

    #[test]
    fn local_today_falls_back_to_utc_for_unknown_zone() {
        let now = fixed_time();
        assert_eq!(local_today(Some("Not/AZone"), now), now.date_naive());
        assert_eq!(local_today(None, now), now.date_naive());
    }

    #[test]
    fn local_today_respects_configured_zone() {
        // 2026-08-07T23:30Z is already the 8th in Tokyo.
        let late = DateTime::parse_from_rfc3339("2026-08-07T23:30:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        let tokyo = local_today(Some("Asia/Tokyo"), late);
        assert_eq!(tokyo, NaiveDate::from_ymd_opt(2026, 8, 8).expect("valid date"));
    }

    #[test]
    fn seed_bundle_roundtrips_through_store() {
        let mut rng = StdRng::seed_from_u64(9);
        let entries = generate_preview(10, 0.12, fixed_end_date(), &mut rng);
        let bundle = build_bundle(entries, 0.12, fixed_time());

        let service = SeedService::new(Arc::new(InMemoryLocalStore::default()), EventBus::default());
        service.save(&bundle).expect("save bundle");
        let loaded = service.load().expect("load bundle").expect("bundle exists");

        assert_eq!(loaded.daily.len(), bundle.daily.len());
        assert_eq!(loaded.daily, bundle.daily);
        assert_eq!(loaded.meta, bundle.meta);
    }

    #[test]
    fn save_and_clear_publish_seed_updated() {
        let bus = EventBus::default();
        let mut listener = bus.subscribe();
        let service = SeedService::new(Arc::new(InMemoryLocalStore::default()), bus.clone());

        let mut rng = StdRng::seed_from_u64(5);
        let bundle = build_bundle(
            generate_preview(3, 0.12, fixed_end_date(), &mut rng),
            0.12,
            fixed_time(),
        );
        service.save(&bundle).expect("save bundle");
        assert_eq!(listener.try_recv().expect("save event"), AppEvent::SeedUpdated);

        service.clear().expect("clear bundle");
        assert_eq!(listener.try_recv().expect("clear event"), AppEvent::SeedUpdated);
        assert!(service.load().expect("load after clear").is_none());
    }

    #[test]
    fn load_rejects_corrupted_payload() {
        let store = Arc::new(InMemoryLocalStore::default());
        store.put(keys::MOCK_SEED, "not-json").expect("write junk");
        let service = SeedService::new(store, EventBus::default());
        assert!(service.load().is_err());
    }

    proptest! {
        #[test]
        fn preview_always_matches_requested_days_and_clamps(
            days in 1u32..60,
            variability in 0.0f64..0.5,
            seed in any::<u64>()
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let entries = generate_preview(days, variability, fixed_end_date(), &mut rng);

            prop_assert_eq!(entries.len(), days as usize);
            for entry in entries {
                prop_assert!(entry.validate().is_ok());
            }
        }
    }
}
