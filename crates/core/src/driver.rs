//! Driver self-service: a driver's own record and the bus assigned to it.

use tracing::info;

use crate::{
    error::{RequestError, ValidationError},
    models::{Bus, Driver, DriverContact, DriverPatch},
    resource::ResourceClient,
};

/// What a driver sees on their own page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverView {
    /// The driver record, `None` when the id resolves to nothing.
    pub driver: Option<Driver>,
    /// The assigned bus, when the record names one that exists.
    pub bus: Option<Bus>,
}

impl DriverContact {
    /// Phone and email must both be present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phone.trim().is_empty() {
            return Err(ValidationError::field("phone", "must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(ValidationError::field("email", "must be an email address"));
        }
        Ok(())
    }
}

/// Read and contact-edit access to one driver record.
#[derive(Clone)]
pub struct DriverDesk {
    drivers: ResourceClient<Driver>,
    buses: ResourceClient<Bus>,
}

impl DriverDesk {
    /// Desk reading through the given clients.
    pub fn new(drivers: ResourceClient<Driver>, buses: ResourceClient<Bus>) -> Self {
        Self { drivers, buses }
    }

    /// Resolve `driver_id` and, when it has one, its assigned bus.
    pub async fn view(&self, driver_id: &str) -> DriverView {
        let driver = self.drivers.get_by_id(driver_id).await;
        let bus = match driver.as_ref().and_then(|d| d.assigned_bus.as_deref()) {
            Some(bus_id) => self.buses.get_by_id(bus_id).await,
            None => None,
        };
        DriverView { driver, bus }
    }

    /// Change phone and email on `driver_id`, leaving every other field alone.
    pub async fn update_contact(
        &self,
        driver_id: &str,
        contact: DriverContact,
    ) -> Result<Option<Driver>, RequestError> {
        let updated = self
            .drivers
            .update(driver_id, &DriverPatch::from(contact))
            .await?;
        if updated.is_some() {
            info!(driver_id, "driver contact updated");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, store::EntityStore};

    fn desk() -> DriverDesk {
        DriverDesk::new(
            ResourceClient::in_memory(EntityStore::new(fixtures::drivers())),
            ResourceClient::in_memory(EntityStore::new(fixtures::buses())),
        )
    }

    #[tokio::test]
    async fn driver_resolves_to_record_and_assigned_bus() {
        let view = desk().view("d1").await;
        assert_eq!(view.driver.map(|d| d.name), Some("Carlos Rodríguez".to_string()));
        assert_eq!(view.bus.map(|b| b.id), Some("b1".to_string()));
    }

    #[tokio::test]
    async fn unassigned_driver_has_no_bus() {
        let view = desk().view("d3").await;
        assert!(view.driver.is_some());
        assert_eq!(view.bus, None);

        assert_eq!(desk().view("d404").await, DriverView::default());
    }

    #[tokio::test]
    async fn contact_update_touches_phone_and_email_only() -> anyhow::Result<()> {
        let desk = desk();
        let before = desk.view("d2").await.driver.ok_or_else(|| anyhow::anyhow!("d2"))?;
        let after = desk
            .update_contact(
                "d2",
                DriverContact {
                    phone: "911222333".to_string(),
                    email: "pedro.s@etransa.com".to_string(),
                },
            )
            .await?
            .ok_or_else(|| anyhow::anyhow!("d2 vanished"))?;

        assert_eq!(after.phone, "911222333");
        assert_eq!(after.email, "pedro.s@etransa.com");
        assert_eq!(
            Driver {
                phone: before.phone.clone(),
                email: before.email.clone(),
                ..after
            },
            before
        );
        Ok(())
    }

    #[test]
    fn contact_needs_phone_and_email() {
        let contact = DriverContact {
            phone: " ".to_string(),
            email: "x@y.z".to_string(),
        };
        assert!(contact.validate().is_err());
        let contact = DriverContact {
            phone: "900".to_string(),
            email: "nope".to_string(),
        };
        assert!(contact.validate().is_err());
    }
}
