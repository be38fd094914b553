//! Corrections for known-wrong upstream schema declarations.
//!
//! Several tacc_stats collectors declare counter widths or event flags that do
//! not match what the kernel exports. Analysis tooling downstream relies on the
//! corrected descriptors, so every descriptor goes through [`schema_fixup`]
//! before it is parsed or compared against a cached schema.
//!
//! Every rule rewrites a token's options in place and is idempotent: running the
//! fixup over its own output yields the same string.

/// sched counters that really are 64 bits wide; everything else is 32.
const SCHED_64BIT_FIELDS: [&str; 3] = ["running_time", "waiting_time", "pcount"];

/// block counters that really are 32 bits wide; everything else keeps its default.
const BLOCK_32BIT_FIELDS: [&str; 5] = [
    "rd_ticks",
    "wr_ticks",
    "in_flight",
    "io_ticks",
    "time_in_queue",
];

const FORCED_WIDTH: u32 = 32;

/// Apply the fixup rules for `type_name` to a schema descriptor.
///
/// The result is the descriptor's tokens joined by single spaces, so
/// whitespace differences between two declarations never cause a mismatch.
pub fn schema_fixup(type_name: &str, desc: &str) -> String {
    let tokens = desc.split_whitespace();
    let fixed: Vec<String> = match type_name {
        "irq" => tokens.map(|t| force_width(t, FORCED_WIDTH)).collect(),
        "sched" => tokens
            .map(|t| {
                if SCHED_64BIT_FIELDS.contains(&field_key(t)) {
                    t.to_string()
                } else {
                    force_width(t, FORCED_WIDTH)
                }
            })
            .collect(),
        "block" => tokens
            .map(|t| {
                if BLOCK_32BIT_FIELDS.contains(&field_key(t)) {
                    force_width(t, FORCED_WIDTH)
                } else {
                    t.to_string()
                }
            })
            .collect(),
        "panfs" => tokens.map(strip_duration_event).collect(),
        "ib" => tokens
            .map(|t| {
                if has_width(t) {
                    t.to_string()
                } else {
                    force_width(t, FORCED_WIDTH)
                }
            })
            .collect(),
        _ => tokens.map(str::to_string).collect(),
    };
    fixed.join(" ")
}

/// The field key of a descriptor token (`key,opt,opt`).
fn field_key(token: &str) -> &str {
    token.split(',').next().unwrap_or(token)
}

fn has_width(token: &str) -> bool {
    token.split(',').skip(1).any(|opt| opt.starts_with("W="))
}

/// Replace any declared width on `token` with `width`.
fn force_width(token: &str, width: u32) -> String {
    let width = format!("W={width}");
    let mut parts: Vec<&str> = token
        .split(',')
        .enumerate()
        .filter(|(i, opt)| *i == 0 || !opt.starts_with("W="))
        .map(|(_, opt)| opt)
        .collect();
    parts.push(&width);
    parts.join(",")
}

/// `syscall_*_s` and `syscall_*_ns` are durations, not counted events.
fn strip_duration_event(token: &str) -> String {
    let key = field_key(token);
    let is_duration =
        key.starts_with("syscall_") && (key.ends_with("_s") || key.ends_with("_ns"));
    if !is_duration {
        return token.to_string();
    }
    token
        .split(',')
        .enumerate()
        .filter(|(i, opt)| *i == 0 || *opt != "E")
        .map(|(_, opt)| opt)
        .collect::<Vec<_>>()
        .join(",")
}
