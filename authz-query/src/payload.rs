//! Decoding of kind-specific provisioner job input
//!
//! Dry-run jobs carry the id of the template version they exercise inside
//! their JSON input instead of in a column. This is the only place that
//! reads that payload.

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use error_common::{Error, Result};

/// Input of a `template_version_dry_run` job, version 1
///
/// Unknown fields are ignored so newer writers stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DryRunInputV1 {
    pub template_version_id: Uuid,
}

pub fn decode_dry_run_input(job_id: Uuid, input: &serde_json::Value) -> Result<DryRunInputV1> {
    DryRunInputV1::deserialize(input).map_err(|e| {
        warn!(%job_id, error = %e, "undecodable dry-run job input");
        Error::internal(format!("decode dry-run input of job {job_id}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Written by provisioner daemons in the field. If this stops decoding,
    // existing dry-run jobs become unreadable.
    const GOLDEN: &str = r#"{
        "template_version_id": "2c0d8f5e-8a8f-4c1e-9a53-5d1f0b6f7c11",
        "workspace_name": "dev",
        "rich_parameter_values": [{"name": "region", "value": "eu"}]
    }"#;

    #[test]
    fn golden_payload_still_decodes() {
        let value: serde_json::Value = serde_json::from_str(GOLDEN).unwrap();
        let input = decode_dry_run_input(Uuid::nil(), &value).unwrap();
        assert_eq!(
            input.template_version_id,
            Uuid::parse_str("2c0d8f5e-8a8f-4c1e-9a53-5d1f0b6f7c11").unwrap()
        );
    }

    #[test]
    fn missing_version_id_is_internal() {
        let err = decode_dry_run_input(Uuid::nil(), &json!({"workspace_name": "dev"})).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(err.is_fatal());
    }
}
