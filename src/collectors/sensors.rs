use crate::models::system::{SensorChip, SensorReading};
use std::process::Command;

/// Run `sensors` (lm-sensors) and parse its chip blocks.
/// Returns an empty list if the tool is missing or prints nothing useful.
pub fn read_sensors() -> Vec<SensorChip> {
    let out = match Command::new("sensors").output() {
        Ok(o)  => o,
        Err(e) => {
            tracing::debug!("sensors not available: {}", e);
            return Vec::new();
        }
    };
    parse_sensors(&String::from_utf8_lossy(&out.stdout))
}

pub fn parse_sensors(text: &str) -> Vec<SensorChip> {
    let mut chips = Vec::new();
    let mut current = SensorChip::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            if !current.name.is_empty() {
                chips.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(adapter) = line.strip_prefix("Adapter:") {
            current.adapter = adapter.trim().to_string();
            continue;
        }
        if !line.contains(':') {
            if current.name.is_empty() { current.name = line.to_string(); }
            continue;
        }
        if let Some(r) = parse_reading(line) {
            current.readings.push(r);
        }
    }
    if !current.name.is_empty() {
        chips.push(current);
    }
    chips
}

/// `Package id 0:  +45.0°C  (high = +80.0°C, crit = +100.0°C)`
fn parse_reading(line: &str) -> Option<SensorReading> {
    let (label, rest) = line.split_once(':')?;
    let (main, extra) = match rest.find('(') {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None    => (rest, ""),
    };
    let main = main.trim();
    let num_end = main
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(main.len());
    let value: f64 = main[..num_end].trim_start_matches('+').parse().ok()?;

    Some(SensorReading {
        label: label.trim().to_string(),
        value,
        unit:  main[num_end..].trim().to_string(),
        extra: extra.to_string(),
    })
}
