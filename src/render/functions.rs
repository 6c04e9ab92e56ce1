//! Filters and functions available to status templates

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use minijinja::{Environment, Error, ErrorKind, State, Value};
use regex::Regex;

use super::conditions::is_status_condition_healthy;

const GREEN_KEYWORDS: &[&str] = &[
    "Running",
    "Succeeded",
    "Active",
    "Available",
    "Bound",
    "Current",
    "valid",
    "Guaranteed",
    "Completed",
];
const YELLOW_KEYWORDS: &[&str] = &["Pending", "Released", "Burstable", "InProgress"];
const RED_KEYWORDS: &[&str] = &[
    "Failed",
    "Unknown",
    "Terminating",
    "Evicted",
    "BestEffort",
    "OOMKilled",
    "ContainerCannotRun",
    "Error",
];

/// Global holding the render clock, RFC 3339
pub const NOW_GLOBAL: &str = "now";

pub fn register(env: &mut Environment<'static>) {
    env.add_filter("green", green);
    env.add_filter("yellow", yellow);
    env.add_filter("red", red);
    env.add_filter("cyan", cyan);
    env.add_filter("magenta", magenta);
    env.add_filter("bold", bold);
    env.add_filter("color_keyword", color_keyword);
    env.add_filter("ago", ago);
    env.add_filter("color_ago", color_ago);
    env.add_filter("color_bool", color_bool);
    env.add_filter("color_exit_code", color_exit_code);
    env.add_filter("color_percent", color_percent);
    env.add_filter("red_if", red_if);
    env.add_filter("red_bold_if", red_bold_if);
    env.add_filter("mark_red", mark_red);
    env.add_filter("mark_yellow", mark_yellow);
    env.add_filter("mark_green", mark_green);
    env.add_filter("quantity", quantity);
    env.add_filter("humanize_si", humanize_si);
    env.add_filter("signal_name", signal_name);
    env.add_filter("sort_by_key", sort_by_key);
    env.add_function("percent", percent);
    env.add_function("matching_item", matching_item);
    env.add_function("is_healthy", is_healthy);
}

fn green(value: String) -> String {
    value.green().to_string()
}

fn yellow(value: String) -> String {
    value.yellow().to_string()
}

fn red(value: String) -> String {
    value.red().to_string()
}

fn cyan(value: String) -> String {
    value.cyan().to_string()
}

fn magenta(value: String) -> String {
    value.magenta().to_string()
}

fn bold(value: String) -> String {
    value.bold().to_string()
}

pub fn color_keyword(value: String) -> String {
    if GREEN_KEYWORDS.contains(&value.as_str()) {
        value.green().to_string()
    } else if YELLOW_KEYWORDS.contains(&value.as_str()) {
        value.yellow().to_string()
    } else if RED_KEYWORDS.contains(&value.as_str()) {
        value.red().bold().to_string()
    } else {
        value
    }
}

/// Rounded age such as `3d`, `2h` or `45s`
pub fn human_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().abs();
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    match seconds {
        s if s >= YEAR => format!("{}y", s / YEAR),
        s if s >= MONTH => format!("{}mo", s / MONTH),
        s if s >= DAY => format!("{}d", s / DAY),
        s if s >= HOUR => format!("{}h", s / HOUR),
        s if s >= MINUTE => format!("{}m", s / MINUTE),
        s => format!("{}s", s),
    }
}

fn render_clock(state: &State) -> DateTime<Utc> {
    state
        .lookup(NOW_GLOBAL)
        .and_then(|now| now.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or_else(Utc::now)
}

fn elapsed(state: &State, timestamp: &Value) -> Option<Duration> {
    let timestamp: DateTime<Utc> = timestamp.as_str()?.parse().ok()?;
    Some(render_clock(state) - timestamp)
}

fn ago(state: &State, timestamp: Value) -> String {
    elapsed(state, &timestamp)
        .map(human_duration)
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Age colored by recency: red under 5m, yellow under 1h, magenta under 1d
fn color_ago(state: &State, timestamp: Value) -> String {
    let Some(age) = elapsed(state, &timestamp) else {
        return "<unknown>".to_string();
    };
    let text = human_duration(age);
    if age < Duration::minutes(5) {
        text.red().to_string()
    } else if age < Duration::hours(1) {
        text.yellow().to_string()
    } else if age < Duration::days(1) {
        text.magenta().to_string()
    } else {
        text
    }
}

fn color_bool(value: bool) -> String {
    if value {
        "true".green().to_string()
    } else {
        "false".red().to_string()
    }
}

fn color_exit_code(code: i64) -> String {
    if code == 0 {
        code.to_string().green().to_string()
    } else {
        code.to_string().red().bold().to_string()
    }
}

fn color_percent(value: f64) -> String {
    let text = format!("{:.0}%", value);
    if value >= 100.0 {
        text.red().bold().to_string()
    } else if value >= 90.0 {
        text.red().to_string()
    } else if value >= 80.0 {
        text.yellow().to_string()
    } else {
        text
    }
}

fn red_if(value: String, condition: bool) -> String {
    if condition { value.red().to_string() } else { value }
}

fn red_bold_if(value: String, condition: bool) -> String {
    if condition {
        value.red().bold().to_string()
    } else {
        value
    }
}

fn mark(value: &str, pattern: &str, paint: fn(&str) -> String) -> Result<String, Error> {
    let regex = Regex::new(pattern).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("bad pattern {}: {}", pattern, e))
    })?;
    Ok(regex
        .replace_all(value, |caps: &regex::Captures| paint(&caps[0]))
        .into_owned())
}

fn mark_red(value: String, pattern: String) -> Result<String, Error> {
    mark(&value, &pattern, |s| s.red().to_string())
}

fn mark_yellow(value: String, pattern: String) -> Result<String, Error> {
    mark(&value, &pattern, |s| s.yellow().to_string())
}

fn mark_green(value: String, pattern: String) -> Result<String, Error> {
    mark(&value, &pattern, |s| s.green().to_string())
}

/// Parse a resource quantity (`250m`, `1Gi`, `1e3`) into a number
pub fn parse_quantity(text: &str) -> Option<f64> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
        ("n", 1e-9),
        ("u", 1e-6),
        ("m", 1e-3),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            if let Ok(n) = number.parse::<f64>() {
                return Some(n * factor);
            }
        }
    }
    text.parse::<f64>().ok()
}

fn quantity(value: Value) -> Result<f64, Error> {
    if let Some(text) = value.as_str() {
        return parse_quantity(text).ok_or_else(|| {
            Error::new(ErrorKind::InvalidOperation, format!("invalid quantity {}", text))
        });
    }
    f64::try_from(value)
}

/// `part` as a percentage of `total`; zero when `total` is zero
fn percent(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Decimal SI rendering with at most one fractional digit
pub fn humanize_si(value: f64) -> String {
    const PREFIXES: &[&str] = &["", "k", "M", "G", "T", "P", "E"];
    let mut scaled = value;
    let mut prefix = 0;
    while scaled.abs() >= 1000.0 && prefix < PREFIXES.len() - 1 {
        scaled /= 1000.0;
        prefix += 1;
    }
    let number = format!("{:.1}", scaled);
    let number = number.strip_suffix(".0").unwrap_or(&number);
    format!("{}{}", number, PREFIXES[prefix])
}

fn signal_name(signal: i64) -> String {
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        _ => return format!("signal {}", signal),
    };
    name.to_string()
}

/// First item whose `key` attribute equals `expected`
fn matching_item(items: Vec<Value>, key: &str, expected: Value) -> Value {
    items
        .into_iter()
        .find(|item| item.get_attr(key).is_ok_and(|v| v == expected))
        .unwrap_or(Value::UNDEFINED)
}

fn sort_by_key(items: Vec<Value>, key: &str) -> Vec<Value> {
    let mut items = items;
    items.sort_by_key(|item| item.get_attr(key).unwrap_or(Value::UNDEFINED));
    items
}

/// Health of a status condition mapping (`type`, `status`)
fn is_healthy(condition: Value) -> Result<bool, Error> {
    let condition_type = condition.get_attr("type")?;
    let status = condition.get_attr("status")?;
    Ok(is_status_condition_healthy(
        condition_type.as_str().unwrap_or_default(),
        status.as_str().unwrap_or_default(),
    ))
}
