//! Seed records for the in-memory fallback.

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use crate::models::{
    ActivityStatus, Admin, AdminRole, Bus, BusStatus, Driver, Role, Route, User,
};

/// Demo login accepted by the fixture fallback. Compared in plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureCredential {
    /// User returned on a successful match.
    pub user: User,
    /// Plaintext password.
    pub password: String,
}

static CREDENTIALS: Lazy<Vec<FixtureCredential>> = Lazy::new(|| {
    vec![
        credential("1", "admin", "admin123", "Juan Pérez", "admin@etransa.com", Role::Admin, None),
        credential(
            "2",
            "readmin",
            "readmin123",
            "María García",
            "readmin@etransa.com",
            Role::Readmin,
            None,
        ),
        credential(
            "3",
            "chofer",
            "chofer123",
            "Carlos Rodríguez",
            "carlos@etransa.com",
            Role::Driver,
            Some("d1"),
        ),
    ]
});

fn credential(
    id: &str,
    username: &str,
    password: &str,
    name: &str,
    email: &str,
    role: Role,
    driver_id: Option<&str>,
) -> FixtureCredential {
    FixtureCredential {
        user: User {
            id: id.to_string(),
            username: username.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            driver_id: driver_id.map(str::to_string),
        },
        password: password.to_string(),
    }
}

/// The demo accounts: `admin`, `readmin` and the driver `chofer`.
pub fn credentials() -> Vec<FixtureCredential> {
    CREDENTIALS.clone()
}

/// Seed buses `b1`..`b3`.
pub fn buses() -> Vec<Bus> {
    [
        ("b1", "ABC-123", "Mercedes-Benz O500", 45, BusStatus::Active, 2022),
        ("b2", "DEF-456", "Volvo 9800", 50, BusStatus::Active, 2023),
        ("b3", "GHI-789", "Scania K410", 42, BusStatus::Maintenance, 2021),
    ]
    .into_iter()
    .map(|(id, plate, model, capacity, status, year)| Bus {
        id: id.to_string(),
        plate: plate.to_string(),
        model: model.to_string(),
        capacity,
        year,
        status,
    })
    .collect()
}

/// Seed routes `r1`..`r3`.
pub fn routes() -> Vec<Route> {
    [
        ("r1", "Ruta Lima-Arequipa", "Lima", "Arequipa", 1010.0, 16.0, 80.0),
        ("r2", "Ruta Lima-Cusco", "Lima", "Cusco", 1100.0, 20.0, 100.0),
        ("r3", "Ruta Arequipa-Puno", "Arequipa", "Puno", 300.0, 5.0, 40.0),
    ]
    .into_iter()
    .map(|(id, name, origin, destination, distance, duration, fare)| Route {
        id: id.to_string(),
        name: name.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        distance,
        duration,
        fare,
        status: ActivityStatus::Active,
    })
    .collect()
}

/// Seed drivers `d1`..`d3`; `d1` drives `b1`, `d2` drives `b2`.
pub fn drivers() -> Vec<Driver> {
    [
        (
            "d1",
            "Carlos Rodríguez",
            "A-II-123456",
            "987654321",
            "carlos@etransa.com",
            8,
            ActivityStatus::Active,
            Some("b1"),
        ),
        (
            "d2",
            "Pedro Sánchez",
            "A-II-234567",
            "987654322",
            "pedro@etransa.com",
            5,
            ActivityStatus::Active,
            Some("b2"),
        ),
        (
            "d3",
            "Luis Martínez",
            "A-II-345678",
            "987654323",
            "luis@etransa.com",
            10,
            ActivityStatus::Inactive,
            None,
        ),
    ]
    .into_iter()
    .map(
        |(id, name, license, phone, email, experience, status, assigned_bus)| Driver {
            id: id.to_string(),
            name: name.to_string(),
            license: license.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            experience,
            status,
            assigned_bus: assigned_bus.map(str::to_string),
        },
    )
    .collect()
}

/// Seed admin accounts matching the `admin` and `readmin` logins.
pub fn admins() -> Vec<Admin> {
    [
        ("1", "Juan Pérez", "admin@etransa.com", "admin", AdminRole::Admin, (2024, 1, 15)),
        ("2", "María García", "readmin@etransa.com", "readmin", AdminRole::Readmin, (2024, 2, 20)),
    ]
    .into_iter()
    .map(|(id, name, email, username, role, (year, month, day))| Admin {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        username: username.to_string(),
        role,
        created_at: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
        status: ActivityStatus::Active,
    })
    .collect()
}
