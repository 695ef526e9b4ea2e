//! `parkbay check`: build everything the config describes without running it.

use parkbay_core::BayMonitor;
use serde_json::json;

pub fn summary_json(monitor: &BayMonitor) -> serde_json::Value {
    let engine = monitor.engine();
    let range = engine.range_config();
    json!({
        "ok": true,
        "bay": {
            "id": monitor.id(),
            "name": monitor.name(),
            "distance_unit": engine.unit_system().distance_unit().symbol(),
            "sensors": engine.sensor_ids().collect::<Vec<_>>(),
            "range": {
                "sensor": range.sensor,
                "max_detect_range": range.max_detect_range.to_string(),
                "stop_distance": range.stop_distance.to_string(),
                "spread_park": range.spread_park.to_string(),
                "pct_warn": range.pct_warn,
                "pct_crit": range.pct_crit,
            },
            "zones": engine.zones().iter().map(|z| json!({
                "sensor": z.sensor,
                "side": z.side.as_str(),
                "intercept": z.intercept.to_string(),
            })).collect::<Vec<_>>(),
        },
        "triggers": monitor.dispatcher().triggers().iter().map(|t| json!({
            "id": t.id(),
            "type": t.kind().type_name(),
            "topic": t.kind().topic(),
        })).collect::<Vec<_>>(),
    })
}

pub fn summary_text(monitor: &BayMonitor) -> String {
    let engine = monitor.engine();
    let range = engine.range_config();
    let mut out = format!(
        "config ok: bay '{}' ({})\n  range: {} (max {}, stop {})\n",
        monitor.id(),
        monitor.name(),
        range.sensor,
        range.max_detect_range,
        range.stop_distance,
    );
    for z in engine.zones() {
        out.push_str(&format!(
            "  lateral: {} ({}, intercept {})\n",
            z.sensor, z.side, z.intercept
        ));
    }
    let triggers = monitor.dispatcher().triggers();
    out.push_str(&format!("  triggers: {}\n", triggers.len()));
    for t in triggers {
        out.push_str(&format!(
            "    {} {} {}\n",
            t.id(),
            t.kind().type_name(),
            t.kind().topic().unwrap_or("-")
        ));
    }
    out
}
