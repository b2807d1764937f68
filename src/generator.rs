use crate::config::GeneratorConfig;
use crate::geometry::Geometry;
use crate::types::{DefectRecord, Severity, Status};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Candidate attempts allowed per requested record.
const ATTEMPTS_PER_RECORD: usize = 50;

const SIZE_RANGE_CM: std::ops::RangeInclusive<u32> = 10..=49;

/// Generate up to `config.count` records around the configured center.
///
/// Candidates closer than `min_spacing_m` to an accepted record are rejected and
/// resampled. When the attempt budget runs out fewer records are returned.
/// Output depends only on `(config, now)`.
pub fn generate_records(
    config: &GeneratorConfig,
    now: DateTime<Utc>,
    geometry: &impl Geometry,
) -> Vec<DefectRecord> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let target = config.count;
    let budget = target.saturating_mul(ATTEMPTS_PER_RECORD);
    let max_age_secs = config.max_age_days.max(0).saturating_mul(86_400) as f64;

    let mut records: Vec<DefectRecord> = Vec::with_capacity(target);
    let mut attempts = 0;

    while records.len() < target && attempts < budget {
        attempts += 1;
        let candidate = sample_candidate(&mut rng, config, now, max_age_secs, attempts);
        let point = candidate.point();

        let too_close = records
            .iter()
            .any(|r| geometry.distance(&r.point(), &point) < config.min_spacing_m);
        if too_close {
            continue;
        }
        records.push(candidate);
    }

    if records.len() < target {
        warn!(
            "Attempt budget exhausted: generated {} of {} records",
            records.len(),
            target
        );
    }

    for (i, record) in records.iter_mut().enumerate() {
        record.id = i;
    }

    info!("Generated {} synthetic records (seed {})", records.len(), config.seed);
    records
}

fn sample_candidate(
    rng: &mut StdRng,
    config: &GeneratorConfig,
    now: DateTime<Utc>,
    max_age_secs: f64,
    attempt: usize,
) -> DefectRecord {
    let lat = config.center_lat + rng.gen_range(-1.0_f64..=1.0) * config.lat_jitter;
    let lon = config.center_lon + rng.gen_range(-1.0_f64..=1.0) * config.lon_jitter;
    let severity = Severity::ALL[rng.gen_range(0..Severity::ALL.len())];
    let status = Status::ALL[rng.gen_range(0..Status::ALL.len())];
    let size = rng.gen_range(SIZE_RANGE_CM);
    let age_secs = if max_age_secs > 0.0 {
        rng.gen_range(0.0..max_age_secs)
    } else {
        0.0
    };

    DefectRecord {
        id: attempt,
        lat,
        lon,
        severity,
        status,
        size,
        detected_at: Duration::try_milliseconds((age_secs * 1000.0) as i64)
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
    }
}
