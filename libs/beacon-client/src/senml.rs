//! SenML (RFC 8428) records, the usual payload of published measurements.

use serde::{Deserialize, Serialize};

/// One SenML record. Fields use the RFC's short JSON labels and unset
/// fields are omitted from the encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenML {
    /// base name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,
    /// base time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bt: Option<f64>,
    /// base unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bu: Option<String>,
    /// base value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bv: Option<f64>,
    /// base sum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bs: Option<f64>,
    /// base version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bver: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vb: Option<bool>,
    /// data value, base64 per the RFC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    /// update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ut: Option<f64>,
}

impl SenML {
    pub fn measurement(name: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        Self {
            n: Some(name.into()),
            u: Some(unit.into()),
            v: Some(value),
            ..Default::default()
        }
    }

    pub fn text(name: impl Into<String>, unit: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            n: Some(name.into()),
            u: Some(unit.into()),
            vs: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn boolean(name: impl Into<String>, unit: impl Into<String>, value: bool) -> Self {
        Self {
            n: Some(name.into()),
            u: Some(unit.into()),
            vb: Some(value),
            ..Default::default()
        }
    }

    pub fn with_time(mut self, t: f64) -> Self {
        self.t = Some(t);
        self
    }

    /// This record as a single-record pack.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        Self::pack(std::slice::from_ref(self))
    }

    /// Encode `records` as a SenML pack (a JSON array).
    pub fn pack(records: &[SenML]) -> serde_json::Result<String> {
        serde_json::to_string(records)
    }

    pub fn unpack(payload: &str) -> serde_json::Result<Vec<SenML>> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_payload() {
        let payload = SenML::measurement("urn:dev:thermo-1:temp", "Cel", 21.5)
            .with_time(1_700_000_000.0)
            .to_payload()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"n": "urn:dev:thermo-1:temp", "u": "Cel", "v": 21.5, "t": 1.7e9}])
        );
    }

    #[test]
    fn test_pack_with_base_record() {
        let base = SenML {
            bn: Some("urn:dev:heater-2:".into()),
            bt: Some(1_700_000_000.0),
            bver: Some(10),
            ..SenML::boolean("on", "", true)
        };
        let records = vec![base, SenML::text("mode", "", "eco").with_time(5.0)];
        let payload = SenML::pack(&records).unwrap();
        assert!(payload.starts_with('['));
        assert!(!payload.contains("\"v\""));
        assert_eq!(SenML::unpack(&payload).unwrap(), records);
    }

    #[test]
    fn test_unpack_rfc_example() {
        // RFC 8428 section 5.1.2
        let payload = r#"[
            {"bn":"urn:dev:ow:10e2073a01080063:","n":"voltage","u":"V","v":120.1},
            {"n":"current","u":"A","v":1.2}
        ]"#;
        let records = SenML::unpack(payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].bn.as_deref(), Some("urn:dev:ow:10e2073a01080063:"));
        assert_eq!(records[1].v, Some(1.2));
        assert_eq!(records[1].t, None);
    }
}
