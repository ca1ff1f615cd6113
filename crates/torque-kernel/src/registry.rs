//! [`ComponentRegistry`] – the components owned by one orchestrator.
//!
//! Entries keep registration order; that order is the update order.  The
//! registry is a separate value from the orchestrator so systems can borrow
//! it mutably while the orchestrator iterates its system list.

use torque_types::RobotError;

use crate::component::{Component, DriveBase, PoseSource};

/// Registration-ordered set of uniquely named components.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<Box<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already-initialized component.
    ///
    /// # Errors
    ///
    /// [`RobotError::Initialization`] if the name is already taken.
    pub fn insert(&mut self, component: Box<dyn Component>) -> Result<(), RobotError> {
        if self.contains(component.name()) {
            return Err(RobotError::initialization(
                component.name(),
                "a component with this name is already registered",
            ));
        }
        self.entries.push(component);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.name())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.entries
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn Component> {
        self.entries
            .iter_mut()
            .find(|c| c.name() == name)
            .map(|c| c.as_mut())
    }

    /// Typed lookup; `None` when absent or of another type.
    pub fn get_as<T: Component>(&self, name: &str) -> Option<&T> {
        self.get(name)?.as_any().downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.get_mut(name)?.as_any_mut().downcast_mut::<T>()
    }

    /// The named component's drive view, if it has one.
    pub fn drive_base_mut(&mut self, name: &str) -> Option<&mut dyn DriveBase> {
        self.get_mut(name)?.as_drive_base_mut()
    }

    /// The named component's pose view, if it has one.
    pub fn pose_source(&self, name: &str) -> Option<&dyn PoseSource> {
        self.get(name)?.as_pose_source()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.entries.iter().map(|c| c.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Component>> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InitContext, Telemetry};
    use torque_types::{ComponentKind, Pose};

    struct Gyro {
        name: String,
        pose: Pose,
    }

    impl Component for Gyro {
        fn name(&self) -> &str {
            &self.name
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Sensor
        }
        fn init(&mut self, _: &mut InitContext<'_>) -> Result<(), RobotError> {
            Ok(())
        }
        fn update(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn is_operational(&self) -> bool {
            true
        }
        fn telemetry(&self) -> Telemetry {
            Telemetry::new()
        }
        fn as_pose_source(&self) -> Option<&dyn PoseSource> {
            Some(self)
        }
    }

    impl PoseSource for Gyro {
        fn position(&self) -> Pose {
            self.pose
        }
    }

    struct Light;

    impl Component for Light {
        fn name(&self) -> &str {
            "light"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Auxiliary
        }
        fn init(&mut self, _: &mut InitContext<'_>) -> Result<(), RobotError> {
            Ok(())
        }
        fn update(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn is_operational(&self) -> bool {
            true
        }
        fn telemetry(&self) -> Telemetry {
            Telemetry::new()
        }
    }

    fn gyro(name: &str) -> Box<Gyro> {
        Box::new(Gyro {
            name: name.to_string(),
            pose: Pose::new(5.0, 0.0, 30.0),
        })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.insert(gyro("imu")).unwrap();
        let err = registry.insert(gyro("imu")).unwrap_err();
        assert!(matches!(err, RobotError::Initialization { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn typed_lookup_downcasts_or_returns_none() {
        let mut registry = ComponentRegistry::new();
        registry.insert(gyro("imu")).unwrap();
        registry.insert(Box::new(Light)).unwrap();

        assert!(registry.get_as::<Gyro>("imu").is_some());
        assert!(registry.get_as::<Light>("imu").is_none());
        assert!(registry.get_as::<Gyro>("missing").is_none());

        registry.get_as_mut::<Gyro>("imu").unwrap().pose = Pose::origin();
        assert_eq!(registry.get_as::<Gyro>("imu").unwrap().pose, Pose::origin());
    }

    #[test]
    fn capability_views() {
        let mut registry = ComponentRegistry::new();
        registry.insert(gyro("imu")).unwrap();
        registry.insert(Box::new(Light)).unwrap();

        assert_eq!(registry.pose_source("imu").unwrap().heading(), 30.0);
        assert!(registry.pose_source("light").is_none());
        assert!(registry.drive_base_mut("imu").is_none());
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = ComponentRegistry::new();
        registry.insert(Box::new(Light)).unwrap();
        registry.insert(gyro("imu")).unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, ["light", "imu"]);
    }
}
