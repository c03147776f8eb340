//! Derivation of per-device equipment commands from a stage definition

use crate::execution::adapters::{CommandKind, DeviceKind, EquipmentCommand};
use crate::models::recipe::Stage;
use uuid::Uuid;

/// Fan speed for high-CO2-tolerance stages (minimal air exchange)
const FAN_SPEED_LOW: f64 = 20.0;
/// Fan speed when the stage demands low CO2 (high air exchange)
const FAN_SPEED_HIGH: f64 = 80.0;
/// Fan speed when the stage expresses no strong CO2 preference
const FAN_SPEED_DEFAULT: f64 = 50.0;

/// Derive the equipment commands that realize a stage's targets.
///
/// Fan speed follows the CO2-tolerance heuristic: a stage tolerating more
/// than 2000 ppm is an incubation-style stage that wants little air exchange;
/// a stage capped under 1000 ppm is fruiting-style and wants a lot.
pub fn stage_commands(zone_id: Uuid, stage: &Stage) -> Vec<EquipmentCommand> {
    let mut commands = Vec::new();

    if let Some(env) = &stage.environmental {
        if let Some(temperature) = &env.temperature {
            commands.push(EquipmentCommand {
                zone_id,
                device: DeviceKind::Heater,
                command: CommandKind::SetValue,
                value: Some(temperature.setpoint()),
                mode: None,
            });
        }

        if let Some(humidity) = &env.humidity {
            commands.push(EquipmentCommand {
                zone_id,
                device: DeviceKind::Humidifier,
                command: CommandKind::SetValue,
                value: Some(humidity.setpoint().round()),
                mode: None,
            });
        }

        let fan_speed = match &env.co2 {
            Some(co2) if co2.max > 2000.0 => FAN_SPEED_LOW,
            Some(co2) if co2.max < 1000.0 => FAN_SPEED_HIGH,
            _ => FAN_SPEED_DEFAULT,
        };
        commands.push(EquipmentCommand {
            zone_id,
            device: DeviceKind::Fan,
            command: CommandKind::SetValue,
            value: Some(fan_speed),
            mode: None,
        });
    }

    if let Some(lighting) = &stage.lighting {
        if lighting.hours_per_day == 0 {
            commands.push(EquipmentCommand {
                zone_id,
                device: DeviceKind::Light,
                command: CommandKind::TurnOff,
                value: None,
                mode: None,
            });
        } else {
            commands.push(EquipmentCommand {
                zone_id,
                device: DeviceKind::Light,
                command: CommandKind::TurnOn,
                value: Some(f64::from(lighting.intensity.unwrap_or(100))),
                mode: None,
            });
        }
    }

    if let Some(irrigation) = &stage.irrigation {
        if irrigation.frequency_per_day > 0 {
            commands.push(EquipmentCommand {
                zone_id,
                device: DeviceKind::Pump,
                command: CommandKind::SetMode,
                value: Some(f64::from(irrigation.frequency_per_day)),
                mode: Some("scheduled".to_string()),
            });
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipe::{
        EnvironmentalTargets, IrrigationSchedule, LightingSchedule, ParamRange,
    };

    fn range(min: f64, max: f64, optimal: Option<f64>) -> ParamRange {
        ParamRange { min, max, optimal }
    }

    fn base_stage() -> Stage {
        Stage {
            name: "test".to_string(),
            duration_days: 7,
            max_duration_days: None,
            environmental: None,
            lighting: None,
            irrigation: None,
            manual_tasks: vec![],
        }
    }

    fn find(commands: &[EquipmentCommand], device: DeviceKind) -> &EquipmentCommand {
        commands.iter().find(|c| c.device == device).unwrap()
    }

    #[test]
    fn test_incubation_stage_runs_fan_low() {
        let mut stage = base_stage();
        stage.environmental = Some(EnvironmentalTargets {
            temperature: Some(range(22.0, 26.0, Some(24.0))),
            humidity: Some(range(85.0, 95.0, Some(90.0))),
            co2: Some(range(2000.0, 10000.0, None)),
            light: None,
        });
        stage.lighting = Some(LightingSchedule {
            hours_per_day: 0,
            intensity: None,
        });

        let commands = stage_commands(Uuid::new_v4(), &stage);

        assert_eq!(find(&commands, DeviceKind::Heater).value, Some(24.0));
        assert_eq!(find(&commands, DeviceKind::Humidifier).value, Some(90.0));
        assert_eq!(find(&commands, DeviceKind::Fan).value, Some(20.0));
        assert_eq!(
            find(&commands, DeviceKind::Light).command,
            CommandKind::TurnOff
        );
    }

    #[test]
    fn test_fruiting_stage_runs_fan_high() {
        let mut stage = base_stage();
        stage.environmental = Some(EnvironmentalTargets {
            temperature: None,
            humidity: None,
            co2: Some(range(400.0, 800.0, None)),
            light: None,
        });

        let commands = stage_commands(Uuid::new_v4(), &stage);
        assert_eq!(find(&commands, DeviceKind::Fan).value, Some(80.0));
    }

    #[test]
    fn test_fan_defaults_to_medium_without_co2_preference() {
        let mut stage = base_stage();
        stage.environmental = Some(EnvironmentalTargets {
            temperature: None,
            humidity: None,
            co2: Some(range(800.0, 1500.0, None)),
            light: None,
        });

        let commands = stage_commands(Uuid::new_v4(), &stage);
        assert_eq!(find(&commands, DeviceKind::Fan).value, Some(50.0));

        stage.environmental = Some(EnvironmentalTargets::default());
        let commands = stage_commands(Uuid::new_v4(), &stage);
        assert_eq!(find(&commands, DeviceKind::Fan).value, Some(50.0));
    }

    #[test]
    fn test_lighting_and_irrigation_commands() {
        let mut stage = base_stage();
        stage.lighting = Some(LightingSchedule {
            hours_per_day: 16,
            intensity: Some(75),
        });
        stage.irrigation = Some(IrrigationSchedule {
            frequency_per_day: 4,
        });

        let commands = stage_commands(Uuid::new_v4(), &stage);

        let light = find(&commands, DeviceKind::Light);
        assert_eq!(light.command, CommandKind::TurnOn);
        assert_eq!(light.value, Some(75.0));

        let pump = find(&commands, DeviceKind::Pump);
        assert_eq!(pump.command, CommandKind::SetMode);
        assert_eq!(pump.mode.as_deref(), Some("scheduled"));
        assert_eq!(pump.value, Some(4.0));
    }

    #[test]
    fn test_zero_frequency_irrigation_emits_nothing() {
        let mut stage = base_stage();
        stage.irrigation = Some(IrrigationSchedule {
            frequency_per_day: 0,
        });

        let commands = stage_commands(Uuid::new_v4(), &stage);
        assert!(commands.is_empty());
    }
}
