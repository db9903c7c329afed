use crate::{
    entities::{GeoPoint, Role},
    error::{precondition_error, Error},
};

/// Holds the inspected point and the start/end roles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointRegistry {
    selection: Option<GeoPoint>,
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
}

impl PointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_selection(&mut self, point: GeoPoint) {
        self.selection = Some(point);
    }

    pub fn clear_selection(&mut self) -> Option<GeoPoint> {
        self.selection.take()
    }

    /// Promotes the selection to `role`.
    #[tracing::instrument(skip(self))]
    pub fn assign_role(&mut self, role: Role) -> Result<GeoPoint, Error> {
        let point = self
            .selection
            .take()
            .ok_or_else(|| precondition_error("no point selected"))?;

        *self.role_mut(role) = Some(point.clone());

        Ok(point)
    }

    /// Returns whether the role was set.
    pub fn clear_role(&mut self, role: Role) -> bool {
        self.role_mut(role).take().is_some()
    }

    pub fn selection(&self) -> Option<&GeoPoint> {
        self.selection.as_ref()
    }

    pub fn role(&self, role: Role) -> Option<&GeoPoint> {
        match role {
            Role::Start => self.start.as_ref(),
            Role::End => self.end.as_ref(),
        }
    }

    pub fn endpoints(&self) -> Option<(&GeoPoint, &GeoPoint)> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    fn role_mut(&mut self, role: Role) -> &mut Option<GeoPoint> {
        match role {
            Role::Start => &mut self.start,
            Role::End => &mut self.end,
        }
    }
}

#[test]
fn assign_role_moves_selection() {
    use crate::entities::Coordinates;

    let mut registry = PointRegistry::new();
    let point = GeoPoint::new(Coordinates { lat: 1.0, lon: 2.0 }, Some("A".into()));

    registry.set_selection(point.clone());
    registry.assign_role(Role::Start).unwrap();

    assert_eq!(registry.selection(), None);
    assert_eq!(registry.role(Role::Start), Some(&point));
    assert_eq!(registry.role(Role::End), None);
}

#[test]
fn assign_role_without_selection_fails_and_keeps_state() {
    use crate::entities::Coordinates;

    let mut registry = PointRegistry::new();
    registry.set_selection(GeoPoint::unlabelled(Coordinates { lat: 1.0, lon: 2.0 }));
    registry.assign_role(Role::Start).unwrap();
    let before = registry.clone();

    let err = registry.assign_role(Role::Start).unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(err.message, "no point selected");
    assert_eq!(registry, before);
}

#[test]
fn endpoints_need_both_roles() {
    use crate::entities::Coordinates;

    let mut registry = PointRegistry::new();
    let a = GeoPoint::unlabelled(Coordinates { lat: 1.0, lon: 1.0 });

    registry.set_selection(a.clone());
    registry.assign_role(Role::Start).unwrap();
    assert!(registry.endpoints().is_none());

    // the same position may serve both roles
    registry.set_selection(a.clone());
    registry.assign_role(Role::End).unwrap();
    assert_eq!(registry.endpoints(), Some((&a, &a)));

    assert!(registry.clear_role(Role::End));
    assert!(!registry.clear_role(Role::End));
    assert!(registry.endpoints().is_none());
}
