//! Batched cell writes with per-cell outcomes.

use std::fmt;
use std::str::FromStr;

use pitwall_common::{CellAddress, CellValue, CellWrite, coerce_payload};
use serde::{Deserialize, Serialize};

use crate::connection::Session;
use crate::error::{BridgeError, EngineError};

/// What a request does when some cells of its batch could not be written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Log failed cells and carry on.
    #[default]
    Permissive,
    /// Abort the request on the first failed cell; earlier writes stay applied.
    Strict,
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(WritePolicy::Permissive),
            "strict" => Ok(WritePolicy::Strict),
            other => Err(format!(
                "unknown write policy `{other}` (expected `permissive` or `strict`)"
            )),
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WritePolicy::Permissive => "permissive",
            WritePolicy::Strict => "strict",
        })
    }
}

#[derive(Debug)]
struct PendingWrite {
    field: String,
    cell: CellAddress,
    write: CellWrite,
}

/// Ordered set of writes applied one cell at a time.
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<PendingWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request value; it goes through the payload coercion first.
    pub fn set(&mut self, field: impl Into<String>, cell: CellAddress, raw: &CellValue) {
        self.push(field, cell, coerce_payload(raw));
    }

    pub fn push(&mut self, field: impl Into<String>, cell: CellAddress, write: CellWrite) {
        self.writes.push(PendingWrite {
            field: field.into(),
            cell,
            write,
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Attempt every write independently and report each outcome.
    pub fn apply(self, session: &mut Session<'_>) -> WriteReport {
        let outcomes = self
            .writes
            .into_iter()
            .map(|pending| {
                let result = session.write_raw(pending.cell, pending.write.into_cell_value());
                if let Err(err) = &result {
                    tracing::error!(
                        sheet = %pending.cell.sheet,
                        cell = %pending.cell.reference(),
                        field = %pending.field,
                        error = %err,
                        "cell write failed"
                    );
                }
                WriteOutcome {
                    field: pending.field,
                    cell: pending.cell,
                    result,
                }
            })
            .collect();
        WriteReport { outcomes }
    }
}

#[derive(Debug)]
pub struct WriteOutcome {
    pub field: String,
    pub cell: CellAddress,
    pub result: Result<(), EngineError>,
}

/// Outcomes of an applied [`WriteBatch`], in submission order.
#[derive(Debug)]
pub struct WriteReport {
    outcomes: Vec<WriteOutcome>,
}

impl WriteReport {
    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Apply `policy`: strict turns any failure into an error, permissive only
    /// returns an error when the engine itself went away.
    pub fn enforce(self, policy: WritePolicy) -> Result<(), BridgeError> {
        let failed = self.failures().count();
        if failed == 0 {
            return Ok(());
        }
        let first = self
            .outcomes
            .into_iter()
            .find(|o| o.result.is_err())
            .map(|o| (o.field, o.cell, o.result));
        let Some((field, cell, Err(source))) = first else {
            return Ok(());
        };
        if policy == WritePolicy::Strict || source.is_disconnect() {
            return Err(BridgeError::CellWrite {
                cell,
                field,
                failed,
                source,
            });
        }
        tracing::warn!(failed, "continuing after failed cell writes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Strict".parse::<WritePolicy>(), Ok(WritePolicy::Strict));
        assert_eq!("permissive".parse::<WritePolicy>(), Ok(WritePolicy::Permissive));
        assert!("lenient".parse::<WritePolicy>().is_err());
        assert_eq!(WritePolicy::default(), WritePolicy::Permissive);
    }

    #[test]
    fn set_coerces_before_queueing() {
        let mut batch = WriteBatch::new();
        let cell = CellAddress::a1(pitwall_common::Sheet::TyreFuel, "C3");
        batch.set("condicao", cell, &CellValue::text("-"));
        batch.set("condicao", cell, &CellValue::text("dry"));
        assert_eq!(batch.len(), 2);
        assert!(batch.writes[0].write.is_clear());
        assert_eq!(batch.writes[1].write, CellWrite::Set(CellValue::text("dry")));
    }
}
