// Sensor registry domain model - master sensor list and display presets
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct SensorDefinition {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub max_value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub name: String,
    pub sensor_ids: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate sensor id: {0}")]
    DuplicateSensorId(String),

    #[error("preset {preset} references unknown sensor id: {sensor_id}")]
    UnknownPresetSensor { preset: String, sensor_id: String },
}

/// Static table of every known sensor plus the named display presets.
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    sensors: Vec<SensorDefinition>,
    presets: Vec<Preset>,
}

impl SensorRegistry {
    pub fn new(sensors: Vec<SensorDefinition>, presets: Vec<Preset>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for sensor in &sensors {
            if !seen.insert(sensor.id.as_str()) {
                return Err(RegistryError::DuplicateSensorId(sensor.id.clone()));
            }
        }

        for preset in &presets {
            for sensor_id in &preset.sensor_ids {
                if !seen.contains(sensor_id.as_str()) {
                    return Err(RegistryError::UnknownPresetSensor {
                        preset: preset.name.clone(),
                        sensor_id: sensor_id.clone(),
                    });
                }
            }
        }

        Ok(Self { sensors, presets })
    }

    /// All sensors in declaration order.
    pub fn all(&self) -> &[SensorDefinition] {
        &self.sensors
    }

    pub fn resolve(&self, id: &str) -> Option<&SensorDefinition> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Sensor ids of a named preset; `None` for an unknown preset name
    /// (callers treat that as a no-op).
    pub fn preset(&self, name: &str) -> Option<&[String]> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.sensor_ids.as_slice())
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        builtin_registry()
    }
}

fn sensor(id: &str, label: &str, unit: &str, max_value: f64, color: &str) -> SensorDefinition {
    SensorDefinition {
        id: id.to_string(),
        label: label.to_string(),
        unit: unit.to_string(),
        max_value,
        color: color.to_string(),
    }
}

fn preset(name: &str, sensor_ids: &[&str]) -> Preset {
    Preset {
        name: name.to_string(),
        sensor_ids: sensor_ids.iter().map(|s| s.to_string()).collect(),
    }
}

/// The car's full sensor list as wired by the data-acquisition team.
fn builtin_registry() -> SensorRegistry {
    let sensors = vec![
        sensor("engine_rpm", "Engine RPM", "rpm", 9000.0, "#8884d8"),
        sensor("rear_axle_speed", "Rear Axle Speed", "km/h", 120.0, "#82ca9d"),
        sensor("coolant_temperature", "Coolant Temp.", "°C", 120.0, "#ffc658"),
        sensor("battery_voltage", "Battery Voltage", "V", 15.0, "#ff7300"),
        sensor("front_brake_pressure", "Front Brake Press.", "bar", 100.0, "#0088FE"),
        sensor("rear_brake_pressure", "Rear Brake Press.", "bar", 100.0, "#00C49F"),
        sensor("front_brake_temperature", "Front Brake Temp.", "°C", 500.0, "#FFBB28"),
        sensor("rear_brake_temperature", "Rear Brake Temp.", "°C", 500.0, "#FF8042"),
        sensor("battery_temperature", "Battery Temp.", "°C", 100.0, "#FF6666"),
        sensor("fuel_level", "Fuel Level", "%", 100.0, "#66FF66"),
        sensor("front_left_speed", "Front Left Speed", "km/h", 120.0, "#FF66CC"),
        sensor("front_right_speed", "Front Right Speed", "km/h", 120.0, "#66CCFF"),
        sensor("gearbox_oil_temperature", "Gearbox Oil Temp.", "°C", 150.0, "#FF9933"),
        sensor("transmission_pressure", "Transmission Press.", "bar", 100.0, "#33FF99"),
        sensor("throttle_position", "Throttle Position", "%", 100.0, "#3399FF"),
        sensor("brake_pedal_position", "Brake Pedal", "%", 100.0, "#FF3333"),
        sensor("steering_angle", "Steering Angle", "°", 45.0, "#CC33FF"),
        sensor("accel_x", "Accelerometer X", "g", 10.0, "#33FFCC"),
        sensor("accel_y", "Accelerometer Y", "g", 10.0, "#FFCC33"),
        sensor("accel_z", "Accelerometer Z", "g", 10.0, "#CCCCCC"),
    ];

    let presets = vec![
        preset(
            "powertrain",
            &[
                "engine_rpm",
                "rear_axle_speed",
                "coolant_temperature",
                "fuel_level",
                "throttle_position",
            ],
        ),
        preset(
            "freios",
            &[
                "rear_axle_speed",
                "front_brake_pressure",
                "rear_brake_pressure",
                "front_brake_temperature",
                "rear_brake_temperature",
                "throttle_position",
                "brake_pedal_position",
            ],
        ),
        preset(
            "suspensao",
            &["rear_axle_speed", "steering_angle", "accel_x", "accel_y", "accel_z"],
        ),
    ];

    SensorRegistry::new(sensors, presets).expect("builtin registry is valid")
}
