use std::io::{self, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "tgrab.v1";

/// Machine envelope written to stdout in `--json` mode. `apply: false` marks
/// a plan (dry-run preview), `apply: true` a real result.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub time: DateTime<Utc>,
    pub request_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Envelope {
    pub fn plan<T: Serialize>(op: &'static str, plan: &T) -> Result<Self, serde_json::Error> {
        Ok(Envelope {
            schema_version: SCHEMA_VERSION,
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply: false,
            plan: Some(serde_json::to_value(plan)?),
            result: None,
        })
    }

    pub fn result<T: Serialize>(op: &'static str, result: &T) -> Result<Self, serde_json::Error> {
        Ok(Envelope {
            schema_version: SCHEMA_VERSION,
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply: true,
            plan: None,
            result: Some(serde_json::to_value(result)?),
        })
    }
}

pub fn print_plan<T: Serialize>(op: &'static str, plan: &T) -> Result<()> {
    write_envelope(&Envelope::plan(op, plan)?)
}

pub fn print_result<T: Serialize>(op: &'static str, result: &T) -> Result<()> {
    write_envelope(&Envelope::result(op, result)?)
}

fn write_envelope(env: &Envelope) -> Result<()> {
    let mut out = io::stdout();
    serde_json::to_writer(&mut out, env)?;
    writeln!(&mut out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_envelope_shape() {
        let env = Envelope::plan("extract", &json!({"entries": 2})).unwrap();
        let s = serde_json::to_string(&env).unwrap();
        assert!(s.contains("\"schema_version\":\"tgrab.v1\""));
        assert!(s.contains("\"apply\":false"));
        assert!(s.contains("\"plan\""));
        assert!(!s.contains("\"result\""));
    }

    #[test]
    fn result_envelope_shape() {
        let env = Envelope::result("extract", &json!({"success": true})).unwrap();
        let s = serde_json::to_string(&env).unwrap();
        assert!(s.contains("\"apply\":true"));
        assert!(s.contains("\"result\""));
    }
}
