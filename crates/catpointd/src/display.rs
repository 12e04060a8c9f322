//! Presentation metadata and text rendering for the console.
//!
//! The core status enums carry no display concerns; descriptions and
//! colours live here.

use std::fmt::Write;

use catpoint_core::{AlarmStatus, ArmingStatus, SecurityEvent, SecuritySnapshot, Sensor};

/// A 24-bit terminal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Wraps `text` in truecolor foreground escapes.
    pub fn paint(self, text: &str) -> String {
        let Rgb(r, g, b) = self;
        format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
    }
}

/// Human-readable description of an alarm status.
pub fn alarm_description(status: AlarmStatus) -> &'static str {
    match status {
        AlarmStatus::NoAlarm => "Cool and Good",
        AlarmStatus::PendingAlarm => "I'm in Danger...",
        AlarmStatus::Alarm => "Awooga!",
    }
}

/// Traffic-light colour of an alarm status.
pub fn alarm_color(status: AlarmStatus) -> Rgb {
    match status {
        AlarmStatus::NoAlarm => Rgb(120, 200, 30),
        AlarmStatus::PendingAlarm => Rgb(200, 150, 20),
        AlarmStatus::Alarm => Rgb(250, 80, 50),
    }
}

pub fn arming_description(status: ArmingStatus) -> &'static str {
    match status {
        ArmingStatus::Disarmed => "Disarmed",
        ArmingStatus::ArmedHome => "Armed - At Home",
        ArmingStatus::ArmedAway => "Armed - Away",
    }
}

pub fn arming_color(status: ArmingStatus) -> Rgb {
    match status {
        ArmingStatus::Disarmed => Rgb(120, 200, 30),
        ArmingStatus::ArmedHome => Rgb(190, 180, 50),
        ArmingStatus::ArmedAway => Rgb(170, 30, 150),
    }
}

/// Renders text output, optionally coloured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    pub color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, color: Rgb, text: &str) -> String {
        if self.color {
            color.paint(text)
        } else {
            text.to_string()
        }
    }

    pub fn alarm(&self, status: AlarmStatus) -> String {
        self.paint(alarm_color(status), alarm_description(status))
    }

    pub fn arming(&self, status: ArmingStatus) -> String {
        self.paint(arming_color(status), arming_description(status))
    }

    /// One line per sensor: short id, state, type, name.
    pub fn sensor_line(&self, sensor: &Sensor) -> String {
        let state = if sensor.is_active() { "Active" } else { "Inactive" };
        format!(
            "{}  {:<8}  {:<6}  {}",
            sensor.id.short(),
            state,
            sensor.sensor_type.as_str(),
            sensor.name
        )
    }

    /// Multi-line status panel.
    pub fn status(&self, snapshot: &SecuritySnapshot) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Alarm:   {}", self.alarm(snapshot.alarm_status));
        let _ = writeln!(out, "Arming:  {}", self.arming(snapshot.arming_status));
        let _ = writeln!(
            out,
            "Camera:  {}",
            if snapshot.cat_detected {
                "DANGER - CAT DETECTED"
            } else {
                "Cat-free"
            }
        );
        let _ = write!(
            out,
            "Sensors: {} ({} active)",
            snapshot.sensors.len(),
            snapshot.active_sensor_count()
        );
        out
    }

    /// Sensor table, or a placeholder when there are none.
    pub fn sensors(&self, sensors: &[Sensor]) -> String {
        if sensors.is_empty() {
            return "No sensors".to_string();
        }
        sensors
            .iter()
            .map(|s| self.sensor_line(s))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One-line notification for a pushed event.
    pub fn event(&self, event: &SecurityEvent) -> String {
        match event {
            SecurityEvent::AlarmStatusChanged(status) => {
                format!("[alarm] {}", self.alarm(*status))
            }
            SecurityEvent::CatDetected(true) => "[camera] DANGER - CAT DETECTED".to_string(),
            SecurityEvent::CatDetected(false) => "[camera] Cat-free".to_string(),
            SecurityEvent::SensorStatusChanged => "[sensors] updated".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catpoint_core::SensorType;

    #[test]
    fn test_alarm_metadata() {
        assert_eq!(alarm_description(AlarmStatus::NoAlarm), "Cool and Good");
        assert_eq!(alarm_description(AlarmStatus::PendingAlarm), "I'm in Danger...");
        assert_eq!(alarm_description(AlarmStatus::Alarm), "Awooga!");
        assert_eq!(alarm_color(AlarmStatus::Alarm), Rgb(250, 80, 50));
    }

    #[test]
    fn test_arming_metadata() {
        assert_eq!(arming_description(ArmingStatus::ArmedHome), "Armed - At Home");
        assert_eq!(arming_color(ArmingStatus::ArmedAway), Rgb(170, 30, 150));
        assert_eq!(arming_color(ArmingStatus::Disarmed), alarm_color(AlarmStatus::NoAlarm));
    }

    #[test]
    fn test_paint_wraps_in_escapes() {
        assert_eq!(Rgb(1, 2, 3).paint("x"), "\x1b[38;2;1;2;3mx\x1b[0m");
    }

    #[test]
    fn test_plain_renderer_has_no_escapes() {
        let r = Renderer::new(false);
        assert_eq!(r.alarm(AlarmStatus::Alarm), "Awooga!");
        assert!(!r.event(&SecurityEvent::AlarmStatusChanged(AlarmStatus::NoAlarm)).contains('\x1b'));
    }

    #[test]
    fn test_status_panel() {
        let snapshot = SecuritySnapshot {
            alarm_status: AlarmStatus::PendingAlarm,
            arming_status: ArmingStatus::ArmedAway,
            cat_detected: true,
            sensors: vec![Sensor::new("Front door", SensorType::Door)],
        };
        let text = Renderer::new(false).status(&snapshot);
        assert!(text.contains("Alarm:   I'm in Danger..."));
        assert!(text.contains("Arming:  Armed - Away"));
        assert!(text.contains("CAT DETECTED"));
        assert!(text.ends_with("Sensors: 1 (0 active)"));
    }

    #[test]
    fn test_sensor_line() {
        let sensor = Sensor::new("Kitchen window", SensorType::Window);
        let line = Renderer::new(false).sensor_line(&sensor);
        assert!(line.starts_with(&sensor.id.short()));
        assert!(line.contains("Inactive"));
        assert!(line.contains("WINDOW"));
        assert!(line.ends_with("Kitchen window"));
    }

    #[test]
    fn test_empty_sensor_table() {
        assert_eq!(Renderer::new(false).sensors(&[]), "No sensors");
    }
}
