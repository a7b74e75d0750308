use crate::core::types::EventRecord;

pub const MAX_SEVERITY: f64 = 10.0;
pub const MIN_SEVERITY: f64 = 0.0;

/// Deterministic severity in `[0, 10]` from the weather fields of an event.
///
/// Each of `temperature` (°C), `wind_speed` (km/h) and `precipitation`
/// (mm) adds a banded score; missing or non-numeric fields add nothing.
pub fn score_event(event: &EventRecord) -> f64 {
    let score = field(event, "temperature").map_or(0.0, temperature_score)
        + field(event, "wind_speed").map_or(0.0, wind_score)
        + field(event, "precipitation").map_or(0.0, precipitation_score);

    score.clamp(MIN_SEVERITY, MAX_SEVERITY)
}

fn field(event: &EventRecord, name: &str) -> Option<f64> {
    event
        .get(name)
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
}

fn temperature_score(celsius: f64) -> f64 {
    match celsius {
        t if t >= 45.0 || t <= -30.0 => 4.0,
        t if t >= 40.0 || t <= -20.0 => 3.0,
        t if t >= 35.0 || t <= -10.0 => 2.0,
        _ => 0.0,
    }
}

fn wind_score(kmh: f64) -> f64 {
    match kmh {
        w if w >= 120.0 => 4.0,
        w if w >= 90.0 => 3.0,
        w if w >= 60.0 => 2.0,
        w if w >= 40.0 => 1.0,
        _ => 0.0,
    }
}

fn precipitation_score(mm: f64) -> f64 {
    match mm {
        p if p >= 100.0 => 3.0,
        p if p >= 50.0 => 2.0,
        p if p >= 20.0 => 1.0,
        _ => 0.0,
    }
}
