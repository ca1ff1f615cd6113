//! [`OdometryComponent`] – pose tracking component backed by an odometry computer.
//!
//! The device is polled once per tick.  A failed poll demotes the component:
//! it stops polling, reports itself non-operational, and [`PoseSource`]
//! callers fall back to the origin.

use std::time::Instant;

use torque_hal::{Clock, OdometryDevice};
use torque_kernel::{Component, InitContext, PoseSource, Telemetry};
use torque_types::{ComponentKind, Pose, RobotError};
use tracing::{error, info};

pub const ODOMETRY: &str = "Odometry";

pub struct OdometryComponent {
    device_id: String,
    clock: Box<dyn Clock>,
    device: Option<Box<dyn OdometryDevice>>,
    operational: bool,
    pose: Pose,
    last_update: Option<Instant>,
    frequency_hz: f64,
    updates: u64,
}

impl OdometryComponent {
    pub fn new(device_id: impl Into<String>, clock: Box<dyn Clock>) -> Self {
        Self {
            device_id: device_id.into(),
            clock,
            device: None,
            operational: false,
            pose: Pose::origin(),
            last_update: None,
            frequency_hz: 0.0,
            updates: 0,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Update rate measured between successful polls.
    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Overwrite the tracked pose, e.g. at the start of a match.
    ///
    /// # Errors
    ///
    /// [`RobotError::NotOperational`] before a successful init or after a
    /// device fault.
    pub fn reset_pose(&mut self, pose: Pose) -> Result<(), RobotError> {
        let device = match (self.operational, self.device.as_mut()) {
            (true, Some(device)) => device,
            _ => return Err(RobotError::NotOperational(format!("{ODOMETRY} is offline"))),
        };
        device.set_pose(pose)?;
        self.pose = pose;
        Ok(())
    }
}

impl Component for OdometryComponent {
    fn name(&self) -> &str {
        ODOMETRY
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Sensor
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), RobotError> {
        let mut device = ctx.hardware.take_odometry(&self.device_id)?;
        device.set_pose(Pose::origin())?;
        self.device = Some(device);
        self.pose = Pose::origin();
        self.operational = true;
        ctx.telemetry
            .add(format!("{ODOMETRY}.device"), self.device_id.clone());
        info!(device = %self.device_id, "odometry initialized");
        Ok(())
    }

    fn update(&mut self) -> Result<(), RobotError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        if !self.operational {
            return Ok(());
        }

        if let Err(e) = device.update() {
            error!(device = %self.device_id, error = %e, "odometry update failed; going offline");
            self.operational = false;
            return Err(e);
        }

        self.pose = device.pose();
        self.updates += 1;
        let now = self.clock.now();
        if let Some(last) = self.last_update {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if dt > 0.0 {
                self.frequency_hz = 1.0 / dt;
            }
        }
        self.last_update = Some(now);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RobotError> {
        self.last_update = None;
        Ok(())
    }

    fn is_operational(&self) -> bool {
        self.operational
    }

    fn telemetry(&self) -> Telemetry {
        let mut t = Telemetry::new();
        let pose = self.position();
        t.insert("operational".into(), self.operational.into());
        t.insert("x".into(), pose.x().into());
        t.insert("y".into(), pose.y().into());
        t.insert("heading".into(), pose.heading().into());
        t.insert("frequency_hz".into(), self.frequency_hz.into());
        t.insert(
            "device_frequency_hz".into(),
            self.device
                .as_ref()
                .map(|d| d.frequency_hz())
                .unwrap_or(0.0)
                .into(),
        );
        t.insert("updates".into(), (self.updates as i64).into());
        t
    }

    fn as_pose_source(&self) -> Option<&dyn PoseSource> {
        Some(self)
    }
}

impl PoseSource for OdometryComponent {
    fn position(&self) -> Pose {
        if self.operational { self.pose } else { Pose::origin() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use torque_hal::{HardwareMap, ManualClock, SimHardware, SimPlant, SimPlantConfig};
    use torque_kernel::TelemetryBatch;
    use torque_types::TelemetryValue;

    fn rig() -> (SimPlant, ManualClock, OdometryComponent) {
        let plant = SimPlant::new(SimPlantConfig::default());
        plant.set_pose(Pose::new(50.0, 50.0, 30.0));
        let mut map = SimHardware::builder(&plant).with_odometry("odo").build();
        let clock = ManualClock::new();
        let mut odo = OdometryComponent::new("odo", Box::new(clock.clone()));
        let mut batch = TelemetryBatch::new(0);
        odo.init(&mut InitContext::new(&mut map, &mut batch)).unwrap();
        assert_eq!(batch.get("Odometry.device"), Some(&TelemetryValue::Text("odo".into())));
        (plant, clock, odo)
    }

    #[test]
    fn init_resets_device_to_origin() {
        let (plant, _clock, odo) = rig();
        assert!(odo.is_operational());
        assert_eq!(plant.pose(), Pose::origin());
        assert_eq!(odo.position(), Pose::origin());
    }

    #[test]
    fn init_fails_without_device() {
        let mut map = HardwareMap::new();
        let mut odo = OdometryComponent::new("odo", Box::new(ManualClock::new()));
        let mut batch = TelemetryBatch::new(0);
        let err = odo
            .init(&mut InitContext::new(&mut map, &mut batch))
            .unwrap_err();
        assert!(matches!(err, RobotError::HardwareFault { .. }));
        assert!(!odo.is_operational());
        assert!(odo.update().is_ok());
    }

    #[test]
    fn update_tracks_pose_and_frequency() {
        let (plant, clock, mut odo) = rig();
        plant.set_pose(Pose::new(10.0, -5.0, 45.0));
        odo.update().unwrap();
        assert_eq!(odo.heading(), 45.0);
        assert_eq!(odo.frequency_hz(), 0.0);

        clock.advance(Duration::from_millis(20));
        odo.update().unwrap();
        assert!((odo.frequency_hz() - 50.0).abs() < 1e-6);
        assert_eq!(odo.position().x(), 10.0);
    }

    #[test]
    fn device_fault_takes_odometry_offline() {
        let (plant, _clock, mut odo) = rig();
        plant.set_pose(Pose::new(100.0, 0.0, 0.0));
        odo.update().unwrap();
        assert_eq!(odo.position().x(), 100.0);

        plant.set_fault("odo", true);
        assert!(matches!(odo.update(), Err(RobotError::HardwareFault { .. })));
        assert!(!odo.is_operational());
        assert_eq!(odo.position(), Pose::origin());

        // Offline odometry is not polled again.
        plant.set_fault("odo", false);
        assert!(odo.update().is_ok());
        assert!(!odo.is_operational());
        assert!(matches!(
            odo.reset_pose(Pose::origin()),
            Err(RobotError::NotOperational(_))
        ));
    }

    #[test]
    fn reset_pose_moves_device() {
        let (plant, _clock, mut odo) = rig();
        odo.reset_pose(Pose::new(0.0, 300.0, 90.0)).unwrap();
        assert_eq!(plant.pose(), Pose::new(0.0, 300.0, 90.0));
        assert_eq!(odo.position().y(), 300.0);
    }

    #[test]
    fn telemetry_reports_pose() {
        let (_plant, _clock, mut odo) = rig();
        odo.update().unwrap();
        let t = odo.telemetry();
        assert_eq!(t.get("updates"), Some(&TelemetryValue::Integer(1)));
        match t.get("device_frequency_hz") {
            Some(TelemetryValue::Number(hz)) => assert!((hz - 50.0).abs() < 1e-6),
            other => panic!("unexpected device frequency {other:?}"),
        }
        assert_eq!(t.get("operational"), Some(&TelemetryValue::Bool(true)));
    }
}
