use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single OHLCV candle, as returned by a Provider Client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub t: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Side of a price comparison: is the asset expected above or below a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

/// Comparison operator used by a condition against a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    CrossAbove,
    CrossBelow,
}

/// The three condition shapes a Strategy can reference, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionPayload {
    PriceAlert {
        asset: String,
        direction: Direction,
        target_price: f64,
    },
    TechnicalIndicator {
        asset: String,
        timeframe: String,
        indicator: String,
        params: serde_json::Value,
        operator: Operator,
        value: f64,
    },
    VolumeAlert {
        asset: String,
        timeframe: String,
        operator: Operator,
        threshold: f64,
    },
}

/// One named, independently toggleable condition belonging to a Strategy's
/// condition set. Referenced from the Logic Tree by `condition_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: Uuid,
    pub kind: ConditionPayload,
    pub enabled: bool,
    pub label: Option<String>,
}

/// Boolean combinator for a `LogicNode::Group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOperator {
    And,
    Or,
}

/// A node in a Strategy's evaluation tree: either a leaf referencing one
/// Condition, or a group combining its children with AND/OR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicNode {
    Leaf {
        condition_id: Uuid,
    },
    Group {
        operator: LogicOperator,
        children: Vec<LogicNode>,
    },
}

/// A Strategy's schedule: evaluate every cycle, or only once the interval
/// since `last_run_at` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    Event,
    Interval(std::time::Duration),
}

impl Schedule {
    /// Parses the literal grammar `<n>[smhd]`, e.g. `30s`, `5m`, `1h`, `1d`.
    /// An unrecognised unit or missing digits defaults to one minute.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("event") {
            return Schedule::Event;
        }
        let raw = raw.trim();
        let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((idx, _)) => (&raw[..idx], &raw[idx..]),
            None => (raw, ""),
        };
        let n: u64 = digits.parse().unwrap_or(1);
        let secs = match unit {
            "s" => n,
            "m" => n * 60,
            "h" => n * 3600,
            "d" => n * 86400,
            _ => 60,
        };
        Schedule::Interval(std::time::Duration::from_secs(secs))
    }

    /// Whether a Strategy on this schedule is due to run, given when it last
    /// ran (`None` means never). `Event` strategies are always due.
    pub fn is_due(&self, last_run_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self {
            Schedule::Event => true,
            Schedule::Interval(period) => match last_run_at {
                None => true,
                Some(last) => {
                    let elapsed = (now - last).to_std().unwrap_or(std::time::Duration::ZERO);
                    elapsed >= *period
                }
            },
        }
    }
}

/// Lifecycle state of a Strategy as held in the Strategy Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum StrategyStatus {
    Active,
    Paused,
    Archived,
    Error,
}

/// A user-defined strategy: a schedule, a condition set, and a logic tree
/// combining them into one pass/fail verdict per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub schedule: Schedule,
    pub logic_tree: LogicNode,
    pub conditions: Vec<Condition>,
    pub status: StrategyStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: i64,
}

/// Per-condition verdict snapshot embedded in a Trigger Log and returned by
/// off-cycle simulation/evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionResult {
    pub met: bool,
    pub value: Option<f64>,
    pub details: serde_json::Value,
}

/// Verdict of one Logic Tree evaluation pass, with the full per-condition
/// snapshot nested in `details` for audit purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicResult {
    pub met: bool,
    pub details: serde_json::Value,
}

/// An append-only record of one Strategy cycle where the Logic Tree was met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerLog {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    pub snapshot: serde_json::Value,
    pub message: Option<String>,
}
