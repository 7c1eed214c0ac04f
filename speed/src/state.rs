use crate::error::RoleViolation;
use crate::models::{Camera, Dispatcher};
use crate::types::HeartbeatInterval;

/// What a connection has declared itself to be. Only `Unidentified` may change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Unidentified,
    Camera(Camera),
    Dispatcher(Dispatcher),
}
impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unidentified => "unidentified",
            Self::Camera(_) => "camera",
            Self::Dispatcher(_) => "dispatcher",
        }
    }
}

/// Per-connection protocol state. Heartbeat subscription is tracked separately from the role.
#[derive(Debug, Default)]
pub struct ConnectionState {
    role: Role,
    heartbeat: Option<HeartbeatInterval>,
}
impl ConnectionState {
    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn identify_as_camera(&mut self, camera: Camera) -> Result<(), RoleViolation> {
        self.identify(Role::Camera(camera))
    }

    pub fn identify_as_dispatcher(&mut self, dispatcher: Dispatcher) -> Result<(), RoleViolation> {
        self.identify(Role::Dispatcher(dispatcher))
    }

    fn identify(&mut self, role: Role) -> Result<(), RoleViolation> {
        match self.role {
            Role::Unidentified => {
                self.role = role;
                Ok(())
            }
            ref current => Err(RoleViolation::AlreadyIdentified(current.name())),
        }
    }

    /// The camera this connection declared, for validating a Plate.
    pub fn camera(&self) -> Result<&Camera, RoleViolation> {
        match &self.role {
            Role::Camera(camera) => Ok(camera),
            _ => Err(RoleViolation::NotACamera),
        }
    }

    /// Records a heartbeat request. An interval of zero still counts as the one request allowed.
    pub fn want_heartbeat(&mut self, interval: HeartbeatInterval) -> Result<(), RoleViolation> {
        if self.heartbeat.is_some() {
            return Err(RoleViolation::AlreadyBeating);
        }
        self.heartbeat = Some(interval);
        Ok(())
    }

    #[cfg(test)]
    pub fn heartbeat(&self) -> Option<HeartbeatInterval> {
        self.heartbeat
    }
}
