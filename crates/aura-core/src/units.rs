//! Unit-aware rendering of insight tags
//!
//! Analyzers always store metric values. Tag keys carry their unit as a suffix
//! (`avgLiters`, `thresholdCelsius`, `avgPressureHpa`, ...) so consumers can
//! render them in the user's preferred system without re-running analysis.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::insights::TagValue;

const FL_OZ_PER_LITER: f64 = 33.814;
const INHG_PER_HPA: f64 = 0.029_53;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "si" => Ok(UnitSystem::Metric),
            "imperial" | "us" => Ok(UnitSystem::Imperial),
            _ => Err(format!("Unknown unit system: {}", s)),
        }
    }
}

pub fn format_volume(liters: f64, system: UnitSystem) -> String {
    match system {
        UnitSystem::Metric => format!("{:.2} L", liters),
        UnitSystem::Imperial => format!("{:.0} fl oz", liters * FL_OZ_PER_LITER),
    }
}

pub fn format_temperature(celsius: f64, system: UnitSystem) -> String {
    match system {
        UnitSystem::Metric => format!("{:.0} °C", celsius),
        UnitSystem::Imperial => format!("{:.0} °F", celsius * 9.0 / 5.0 + 32.0),
    }
}

pub fn format_pressure(hpa: f64, system: UnitSystem) -> String {
    match system {
        UnitSystem::Metric => format!("{:.0} hPa", hpa),
        UnitSystem::Imperial => format!("{:.2} inHg", hpa * INHG_PER_HPA),
    }
}

/// Render one tag value according to the unit encoded in its key
pub fn display_tag(key: &str, value: &TagValue, system: UnitSystem) -> String {
    let Some(n) = value.as_f64() else {
        return value.to_string();
    };

    if key.ends_with("Liters") {
        format_volume(n, system)
    } else if key.ends_with("Celsius") {
        format_temperature(n, system)
    } else if key.ends_with("Hpa") {
        format_pressure(n, system)
    } else if key.ends_with("Hours") {
        format!("{:.1} h", n)
    } else if key.ends_with("Kcal") {
        format!("{:.0} kcal", n)
    } else if key.ends_with("MgPerDl") {
        format!("{:.0} mg/dL", n)
    } else if key.ends_with("Pct") || key == "pct" {
        format!("{:.0}%", n)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_tag_by_suffix() {
        let liters = TagValue::Number(1.05);
        assert_eq!(display_tag("avgLiters", &liters, UnitSystem::Metric), "1.05 L");
        assert_eq!(display_tag("avgLiters", &liters, UnitSystem::Imperial), "36 fl oz");

        let cold = TagValue::Number(5.0);
        assert_eq!(display_tag("thresholdCelsius", &cold, UnitSystem::Imperial), "41 °F");

        let pressure = TagValue::Number(1010.0);
        assert_eq!(
            display_tag("thresholdHpa", &pressure, UnitSystem::Imperial),
            "29.82 inHg"
        );

        assert_eq!(display_tag("pct", &TagValue::Number(150.0), UnitSystem::Metric), "150%");
        assert_eq!(
            display_tag("direction", &TagValue::from("increased"), UnitSystem::Imperial),
            "increased"
        );
    }

    #[test]
    fn test_unit_system_from_str() {
        assert_eq!("Imperial".parse::<UnitSystem>().unwrap(), UnitSystem::Imperial);
        assert!("cubits".parse::<UnitSystem>().is_err());
    }
}
