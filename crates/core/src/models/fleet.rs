#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::{merge, ActivityStatus, Entity};
use crate::error::ValidationError;

/// Operational state of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    /// Available for service.
    #[default]
    Active,
    /// In the workshop.
    Maintenance,
    /// Withdrawn from service.
    Inactive,
}

impl BusStatus {
    /// Cycle used by the status toggle: active, maintenance, inactive.
    pub fn next(self) -> Self {
        match self {
            Self::Active => Self::Maintenance,
            Self::Maintenance => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    /// Wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Inactive => "inactive",
        }
    }
}

/// A bus in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Identifier (`b1`, `b1718000000000`, or backend assigned).
    pub id: String,
    /// Licence plate. Not checked for uniqueness.
    pub plate: String,
    /// Make and model.
    pub model: String,
    /// Seated capacity.
    pub capacity: u32,
    /// Model year.
    pub year: i32,
    /// Current status.
    pub status: BusStatus,
}

/// Creation input for [`Bus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub plate: String,
    pub model: String,
    pub capacity: u32,
    pub year: i32,
    pub status: BusStatus,
}

impl NewBus {
    /// Check the fields the console form cannot express through types alone.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.plate.trim().is_empty() {
            return Err(ValidationError::field("plate", "must not be empty"));
        }
        if self.capacity == 0 {
            return Err(ValidationError::field("capacity", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Partial update for [`Bus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BusStatus>,
}

impl Entity for Bus {
    type Draft = NewBus;
    type Patch = BusPatch;

    const COLLECTION: &'static str = "buses";
    const ID_PREFIX: &'static str = "b";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewBus) -> Self {
        Self {
            id,
            plate: draft.plate,
            model: draft.model,
            capacity: draft.capacity,
            year: draft.year,
            status: draft.status,
        }
    }

    fn apply(&mut self, patch: BusPatch) {
        merge(&mut self.plate, patch.plate);
        merge(&mut self.model, patch.model);
        merge(&mut self.capacity, patch.capacity);
        merge(&mut self.year, patch.year);
        merge(&mut self.status, patch.status);
    }
}

/// An intercity route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
    /// Kilometres.
    pub distance: f64,
    /// Hours.
    pub duration: f64,
    /// Ticket price; some backends call it `price`.
    #[serde(alias = "price")]
    pub fare: f64,
    pub status: ActivityStatus,
}

/// Creation input for [`Route`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub duration: f64,
    #[serde(alias = "price")]
    pub fare: f64,
    pub status: ActivityStatus,
}

impl NewRoute {
    /// Reject negative or non-finite measurements.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        for (field, value) in [
            ("distance", self.distance),
            ("duration", self.duration),
            ("fare", self.fare),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::field(field, "must be zero or positive"));
            }
        }
        Ok(())
    }
}

/// Partial update for [`Route`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
}

impl Entity for Route {
    type Draft = NewRoute;
    type Patch = RoutePatch;

    const COLLECTION: &'static str = "routes";
    const ID_PREFIX: &'static str = "r";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewRoute) -> Self {
        Self {
            id,
            name: draft.name,
            origin: draft.origin,
            destination: draft.destination,
            distance: draft.distance,
            duration: draft.duration,
            fare: draft.fare,
            status: draft.status,
        }
    }

    fn apply(&mut self, patch: RoutePatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.origin, patch.origin);
        merge(&mut self.destination, patch.destination);
        merge(&mut self.distance, patch.distance);
        merge(&mut self.duration, patch.duration);
        merge(&mut self.fare, patch.fare);
        merge(&mut self.status, patch.status);
    }
}

/// A bus driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    /// Driving licence number. Not checked for uniqueness.
    pub license: String,
    pub phone: String,
    pub email: String,
    /// Years of experience.
    pub experience: u32,
    pub status: ActivityStatus,
    /// Id of the bus this driver operates. Not checked against the bus collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_bus: Option<String>,
}

/// Creation input for [`Driver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    pub name: String,
    pub license: String,
    pub phone: String,
    pub email: String,
    pub experience: u32,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_bus: Option<String>,
}

impl NewDriver {
    /// Name and licence are the minimum needed to identify a driver.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        if self.license.trim().is_empty() {
            return Err(ValidationError::field("license", "must not be empty"));
        }
        Ok(())
    }
}

/// Partial update for [`Driver`].
///
/// `assigned_bus: Some(None)` clears the assignment; it is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_bus: Option<Option<String>>,
}

/// The only fields a driver may change on their own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverContact {
    pub phone: String,
    pub email: String,
}

impl From<DriverContact> for DriverPatch {
    fn from(contact: DriverContact) -> Self {
        Self {
            phone: Some(contact.phone),
            email: Some(contact.email),
            ..Self::default()
        }
    }
}

impl Entity for Driver {
    type Draft = NewDriver;
    type Patch = DriverPatch;

    const COLLECTION: &'static str = "drivers";
    const ID_PREFIX: &'static str = "d";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: NewDriver) -> Self {
        Self {
            id,
            name: draft.name,
            license: draft.license,
            phone: draft.phone,
            email: draft.email,
            experience: draft.experience,
            status: draft.status,
            assigned_bus: draft.assigned_bus,
        }
    }

    fn apply(&mut self, patch: DriverPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.license, patch.license);
        merge(&mut self.phone, patch.phone);
        merge(&mut self.email, patch.email);
        merge(&mut self.experience, patch.experience);
        merge(&mut self.status, patch.status);
        merge(&mut self.assigned_bus, patch.assigned_bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_driver() -> Driver {
        Driver {
            id: "d9".to_string(),
            name: "Ana Torres".to_string(),
            license: "A-II-999999".to_string(),
            phone: "900000000".to_string(),
            email: "ana@etransa.com".to_string(),
            experience: 3,
            status: ActivityStatus::Active,
            assigned_bus: Some("b2".to_string()),
        }
    }

    #[test]
    fn route_accepts_price_alias() -> anyhow::Result<()> {
        let route: Route = serde_json::from_str(
            r#"{"id":"r9","name":"Ruta X","origin":"A","destination":"B",
                "distance":10,"duration":1.5,"price":12.5,"status":"inactive"}"#,
        )?;
        assert_eq!(route.fare, 12.5);
        assert_eq!(route.status, ActivityStatus::Inactive);
        Ok(())
    }

    #[test]
    fn driver_patch_clears_assignment() {
        let mut driver = sample_driver();
        driver.apply(DriverPatch {
            assigned_bus: Some(None),
            ..DriverPatch::default()
        });
        assert_eq!(driver.assigned_bus, None);
        assert_eq!(driver.name, "Ana Torres");
    }

    #[test]
    fn driver_patch_serializes_only_named_fields() -> anyhow::Result<()> {
        let patch = DriverPatch::from(DriverContact {
            phone: "911".to_string(),
            email: "new@etransa.com".to_string(),
        });
        let value = serde_json::to_value(&patch)?;
        assert_eq!(
            value,
            serde_json::json!({ "phone": "911", "email": "new@etransa.com" })
        );

        let cleared = serde_json::to_value(DriverPatch {
            assigned_bus: Some(None),
            ..DriverPatch::default()
        })?;
        assert_eq!(cleared, serde_json::json!({ "assignedBus": null }));
        Ok(())
    }

    #[test]
    fn new_route_rejects_negative_fare() {
        let route = NewRoute {
            name: "Ruta".to_string(),
            origin: "A".to_string(),
            destination: "B".to_string(),
            distance: 10.0,
            duration: 1.0,
            fare: -1.0,
            status: ActivityStatus::Active,
        };
        assert!(matches!(
            route.validate(),
            Err(ValidationError::InvalidField { field: "fare", .. })
        ));
    }

    #[test]
    fn new_bus_requires_capacity() {
        let bus = NewBus {
            plate: "XYZ-000".to_string(),
            model: "Volvo".to_string(),
            capacity: 0,
            year: 2020,
            status: BusStatus::Active,
        };
        assert!(bus.validate().is_err());
    }

    #[test]
    fn bus_status_cycles() {
        assert_eq!(BusStatus::Active.next(), BusStatus::Maintenance);
        assert_eq!(BusStatus::Inactive.next(), BusStatus::Active);
    }
}
