//! Values flowing from the sensor port to the telemetry sink.

use std::fmt;

use serde::Serialize;

/// One point-in-time set of measurement-channel values.
///
/// Serializes to the flat JSON object the telemetry platform expects; the two
/// index channels are omitted when the device reported no valid value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    /// Mass concentration PM1.0 [µg/m³]
    #[serde(rename = "pm1.0")]
    pub pm1_0: f64,
    /// Mass concentration PM2.5 [µg/m³]
    #[serde(rename = "pm2.5")]
    pub pm2_5: f64,
    /// Mass concentration PM4.0 [µg/m³]
    #[serde(rename = "pm4.0")]
    pub pm4_0: f64,
    /// Mass concentration PM10 [µg/m³]
    #[serde(rename = "pm10.0")]
    pub pm10_0: f64,
    /// Compensated ambient humidity [%RH]
    pub humidity: f64,
    /// Compensated ambient temperature [°C]
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voc_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nox_index: Option<f64>,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pm1.0={} pm2.5={} pm4.0={} pm10.0={} humidity={}% temperature={}°C",
            self.pm1_0, self.pm2_5, self.pm4_0, self.pm10_0, self.humidity, self.temperature
        )?;
        if let Some(voc) = self.voc_index {
            write!(f, " voc_index={voc}")?;
        }
        if let Some(nox) = self.nox_index {
            write!(f, " nox_index={nox}")?;
        }
        Ok(())
    }
}

/// Device metadata, announced once per successful bring-up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub version: String,
    pub product_name: String,
    pub serial_number: String,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "product={} serial={} version={}",
            self.product_name, self.serial_number, self.version
        )
    }
}

/// Outcome of a non-blocking sensor poll.
#[derive(Clone, Debug, PartialEq)]
pub enum Poll {
    /// A fresh reading was available.
    Ready(Reading),
    /// The device has no new data yet. Not an error.
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            pm1_0: 3.2,
            pm2_5: 4.1,
            pm4_0: 4.5,
            pm10_0: 4.7,
            humidity: 41.5,
            temperature: 22.25,
            voc_index: None,
            nox_index: None,
        }
    }

    #[test]
    fn test_reading_json_omits_missing_indices() {
        let value = serde_json::to_value(reading()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        assert_eq!(obj["pm1.0"], 3.2);
        assert_eq!(obj["temperature"], 22.25);
        assert!(!obj.contains_key("voc_index"));
        assert!(!obj.contains_key("nox_index"));
    }

    #[test]
    fn test_reading_json_includes_present_indices() {
        let r = Reading {
            voc_index: Some(100.0),
            nox_index: Some(1.0),
            ..reading()
        };
        let value = serde_json::to_value(r).unwrap();
        assert_eq!(value["voc_index"], 100.0);
        assert_eq!(value["nox_index"], 1.0);
    }

    #[test]
    fn test_identity_json_shape() {
        let id = DeviceIdentity {
            version: "2.0".into(),
            product_name: "SEN55".into(),
            serial_number: "ABC123".into(),
        };
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(
            json,
            r#"{"version":"2.0","product_name":"SEN55","serial_number":"ABC123"}"#
        );
    }

    #[test]
    fn test_reading_display_lists_indices_when_present() {
        let r = Reading {
            voc_index: Some(12.0),
            ..reading()
        };
        let text = r.to_string();
        assert!(text.contains("voc_index=12"));
        assert!(!text.contains("nox_index"));
    }
}
