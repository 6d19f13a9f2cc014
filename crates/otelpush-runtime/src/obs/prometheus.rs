//! Prometheus text exposition of a [`Snapshot`].
//!
//! Instrument names are sanitized (`.`/`/`/`-` become `_`), counters get the
//! `_total` suffix, up-down counters render as gauges. Resource identity is
//! exposed as a `target_info` series like the OTel Prometheus exporter does.

use std::fmt::Write;

use otelpush_core::{InstrumentDescriptor, InstrumentKind, MetricRecord, Snapshot};

use crate::collector::CollectorStats;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect()
}

fn label_str<'a>(pairs: impl Iterator<Item = (&'a str, String)>) -> String {
    pairs
        .map(|(k, v)| format!("{}=\"{}\"", sanitize(k), escape_label(&v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Records sharing one exposed name, possibly from several scopes.
struct Family<'a> {
    name: String,
    kind: InstrumentKind,
    help: &'a str,
    records: Vec<&'a MetricRecord>,
}

fn family_name(d: &InstrumentDescriptor) -> String {
    match d.kind {
        InstrumentKind::Counter => format!("{}_total", sanitize(&d.name)),
        InstrumentKind::UpDownCounter => sanitize(&d.name),
    }
}

/// Render every record of `snapshot`, one `# TYPE` block per metric family.
/// The first instrument seen for a family decides its type and help text.
pub fn render(snapshot: &Snapshot, out: &mut String) {
    let target = label_str(snapshot.resource.iter().map(|(k, v)| (k, v.to_string())));
    let _ = writeln!(out, "# TYPE target_info gauge\ntarget_info{{{}}} 1", target);

    let mut families: Vec<Family<'_>> = Vec::new();
    for rec in &snapshot.records {
        let name = family_name(&rec.descriptor);
        match families.iter_mut().find(|f| f.name == name) {
            Some(f) => f.records.push(rec),
            None => families.push(Family {
                name,
                kind: rec.descriptor.kind,
                help: &rec.descriptor.description,
                records: vec![rec],
            }),
        }
    }

    for f in &families {
        let ty = if f.kind.is_monotonic() { "counter" } else { "gauge" };
        if !f.help.is_empty() {
            let _ = writeln!(out, "# HELP {} {}", f.name, f.help.replace('\n', " "));
        }
        let _ = writeln!(out, "# TYPE {} {}", f.name, ty);

        for rec in &f.records {
            let labels = label_str(
                std::iter::once(("otel_scope_name", rec.scope.to_string()))
                    .chain(rec.attributes.iter().map(|kv| (&*kv.key, kv.value.to_string()))),
            );
            let _ = writeln!(out, "{}{{{}}} {}", f.name, labels, rec.value);
        }
    }
}

/// Render the snapshot plus the collector's own counters.
pub fn render_with_stats(snapshot: &Snapshot, stats: &CollectorStats) -> String {
    let mut out = String::new();
    render(snapshot, &mut out);

    let extra: [(&str, u64); 4] = [
        ("otelpush_collector_ticks_total", stats.ticks),
        ("otelpush_collector_exports_ok_total", stats.exports_ok),
        ("otelpush_collector_exports_failed_total", stats.exports_failed),
        ("otelpush_collector_missed_cycles_total", stats.missed_cycles),
    ];
    for (k, v) in extra {
        let _ = writeln!(out, "# TYPE {} counter\n{} {}", k, k, v);
    }
    out
}
