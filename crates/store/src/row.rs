use chrono::{DateTime, Utc};
use common::{Condition, Error, LogicNode, Result, Schedule, Strategy, StrategyStatus};
use uuid::Uuid;

/// Raw row shape for the `strategies` table. JSON/text columns are parsed
/// lazily by `into_strategy`, not at the SQL layer.
#[derive(Debug, sqlx::FromRow)]
pub struct StrategyRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub schedule: String,
    pub logic_tree: String,
    pub status: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ConditionRow {
    pub id: String,
    pub strategy_id: String,
    pub payload: String,
    pub enabled: bool,
    pub label: Option<String>,
}

fn parse_status(raw: &str) -> Result<StrategyStatus> {
    match raw {
        "active" => Ok(StrategyStatus::Active),
        "paused" => Ok(StrategyStatus::Paused),
        "archived" => Ok(StrategyStatus::Archived),
        "error" => Ok(StrategyStatus::Error),
        other => Err(Error::Other(format!("unknown strategy status '{other}'"))),
    }
}

/// Converts a loaded row + its conditions into a domain `Strategy`, rejecting
/// unrecognised condition `type` tags and dangling logic-tree references at
/// load time rather than leaving them to surface mid-evaluation.
pub fn into_strategy(row: StrategyRow, condition_rows: Vec<ConditionRow>) -> Result<Strategy> {
    let id = Uuid::parse_str(&row.id).map_err(|e| Error::Other(e.to_string()))?;
    let owner_id = Uuid::parse_str(&row.owner_id).map_err(|e| Error::Other(e.to_string()))?;

    let conditions: Vec<Condition> = condition_rows
        .into_iter()
        .map(|c| {
            let cid = Uuid::parse_str(&c.id).map_err(|e| Error::Other(e.to_string()))?;
            let kind = serde_json::from_str(&c.payload)
                .map_err(|e| Error::Other(format!("condition {}: {e}", c.id)))?;
            Ok(Condition {
                id: cid,
                kind,
                enabled: c.enabled,
                label: c.label,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let logic_tree: LogicNode = serde_json::from_str(&row.logic_tree)?;
    validate_refs(&logic_tree, &conditions)?;

    Ok(Strategy {
        id,
        owner_id,
        name: row.name,
        schedule: Schedule::parse(&row.schedule),
        logic_tree,
        conditions,
        status: parse_status(&row.status)?,
        last_run_at: row.last_run_at,
        last_triggered_at: row.last_triggered_at,
        trigger_count: row.trigger_count,
    })
}

fn validate_refs(node: &LogicNode, conditions: &[Condition]) -> Result<()> {
    match node {
        LogicNode::Leaf { condition_id } => {
            if conditions.iter().any(|c| c.id == *condition_id) {
                Ok(())
            } else {
                Err(Error::Other(format!(
                    "logic tree references unknown condition {condition_id}"
                )))
            }
        }
        LogicNode::Group { children, .. } => {
            children.iter().try_for_each(|c| validate_refs(c, conditions))
        }
    }
}
