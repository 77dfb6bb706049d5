use std::str::FromStr;

use fleet_core::{
    ActivityStatus, Admin, AdminPatch, AdminRole, Bus, BusPatch, BusStatus, Driver,
    DriverContact, DriverPatch, NewAdmin, NewBus, NewDriver, NewRoute, PasswordChange,
    ProfileUpdate, Route, RoutePatch, Section, ValidationError,
};

const MAX_INPUT_LEN: usize = 64;

/// One labelled text input. `cursor` counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub input: String,
    pub cursor: usize,
    pub secret: bool,
}

impl FormField {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        let input = value.into();
        let cursor = input.chars().count();
        Self {
            label,
            input,
            cursor,
            secret: false,
        }
    }

    fn secret(label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::new(label, "")
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.len() as isize) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    /// Text as drawn; secrets are masked.
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.len())
        } else {
            self.input.clone()
        }
    }

    fn value(&self) -> &str {
        self.input.trim()
    }
}

/// What submitting the form does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Login,
    Bus(Option<String>),
    Route(Option<String>),
    Driver(Option<String>),
    Admin(Option<String>),
    MyContact,
    Profile,
    Password,
}

impl FormKind {
    /// Section whose notices describe this form.
    pub fn section(&self) -> Section {
        match self {
            Self::Bus(_) => Section::Buses,
            Self::Route(_) => Section::Routes,
            Self::Driver(_) => Section::Drivers,
            Self::Admin(_) => Section::Admins,
            Self::MyContact => Section::MyDriver,
            Self::Login | Self::Profile | Self::Password => Section::Profile,
        }
    }
}

/// Modal with a column of inputs, one focused at a time.
#[derive(Debug, Clone)]
pub struct FormModal {
    pub title: String,
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    /// Extra line drawn under the inputs.
    pub hint: Option<String>,
    /// Bus ids the driver form accepts; `None` outside that form.
    bus_choices: Option<Vec<String>>,
}

impl FormModal {
    fn new(title: impl Into<String>, kind: FormKind, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            kind,
            fields,
            focus: 0,
            hint: None,
            bus_choices: None,
        }
    }

    pub fn login() -> Self {
        Self::new(
            "Iniciar sesión",
            FormKind::Login,
            vec![FormField::new("Usuario", ""), FormField::secret("Contraseña")],
        )
    }

    pub fn bus(existing: Option<&Bus>) -> Self {
        let (title, id) = editing("Bus", existing.map(|bus| bus.id.clone()));
        let fields = vec![
            FormField::new("Placa", existing.map(|b| b.plate.clone()).unwrap_or_default()),
            FormField::new("Modelo", existing.map(|b| b.model.clone()).unwrap_or_default()),
            FormField::new(
                "Capacidad",
                existing.map(|b| b.capacity.to_string()).unwrap_or_default(),
            ),
            FormField::new("Año", existing.map(|b| b.year.to_string()).unwrap_or_default()),
            FormField::new(
                "Estado",
                existing.map_or(BusStatus::Active, |b| b.status).as_str(),
            ),
        ];
        Self::new(title, FormKind::Bus(id), fields)
    }

    pub fn route(existing: Option<&Route>) -> Self {
        let (title, id) = editing("Ruta", existing.map(|route| route.id.clone()));
        let number = |pick: fn(&Route) -> f64| {
            existing
                .map(|route| pick(route).to_string())
                .unwrap_or_default()
        };
        let fields = vec![
            FormField::new("Nombre", existing.map(|r| r.name.clone()).unwrap_or_default()),
            FormField::new("Origen", existing.map(|r| r.origin.clone()).unwrap_or_default()),
            FormField::new(
                "Destino",
                existing.map(|r| r.destination.clone()).unwrap_or_default(),
            ),
            FormField::new("Distancia (km)", number(|r: &Route| r.distance)),
            FormField::new("Duración (h)", number(|r: &Route| r.duration)),
            FormField::new("Tarifa", number(|r: &Route| r.fare)),
            FormField::new(
                "Estado",
                existing.map_or(ActivityStatus::Active, |r| r.status).as_str(),
            ),
        ];
        Self::new(title, FormKind::Route(id), fields)
    }

    /// Assignment is limited to `assignable` plus the driver's current bus.
    pub fn driver(existing: Option<&Driver>, assignable: &[Bus]) -> Self {
        let (title, id) = editing("Chofer", existing.map(|driver| driver.id.clone()));
        let fields = vec![
            FormField::new("Nombre", existing.map(|d| d.name.clone()).unwrap_or_default()),
            FormField::new("Licencia", existing.map(|d| d.license.clone()).unwrap_or_default()),
            FormField::new("Teléfono", existing.map(|d| d.phone.clone()).unwrap_or_default()),
            FormField::new("Email", existing.map(|d| d.email.clone()).unwrap_or_default()),
            FormField::new(
                "Experiencia (años)",
                existing.map(|d| d.experience.to_string()).unwrap_or_default(),
            ),
            FormField::new(
                "Estado",
                existing.map_or(ActivityStatus::Active, |d| d.status).as_str(),
            ),
            FormField::new(
                "Bus asignado",
                existing
                    .and_then(|d| d.assigned_bus.clone())
                    .unwrap_or_default(),
            ),
        ];
        let mut choices: Vec<String> = assignable.iter().map(|bus| bus.id.clone()).collect();
        if let Some(current) = existing.and_then(|d| d.assigned_bus.clone()) {
            if !choices.contains(&current) {
                choices.push(current);
            }
        }
        let hint = if choices.is_empty() {
            "Sin buses activos disponibles".to_string()
        } else {
            format!("Buses disponibles: {}", choices.join(", "))
        };
        Self {
            hint: Some(hint),
            bus_choices: Some(choices),
            ..Self::new(title, FormKind::Driver(id), fields)
        }
    }

    pub fn admin(existing: Option<&Admin>) -> Self {
        let (title, id) = editing("Administrador", existing.map(|admin| admin.id.clone()));
        let fields = vec![
            FormField::new("Nombre", existing.map(|a| a.name.clone()).unwrap_or_default()),
            FormField::new("Email", existing.map(|a| a.email.clone()).unwrap_or_default()),
            FormField::new("Usuario", existing.map(|a| a.username.clone()).unwrap_or_default()),
            FormField::new(
                "Rol",
                existing.map_or(AdminRole::Admin, |a| a.role).as_str(),
            ),
            FormField::new(
                "Estado",
                existing.map_or(ActivityStatus::Active, |a| a.status).as_str(),
            ),
        ];
        Self::new(title, FormKind::Admin(id), fields)
    }

    pub fn contact(driver: &Driver) -> Self {
        Self::new(
            "Mis datos de contacto",
            FormKind::MyContact,
            vec![
                FormField::new("Teléfono", driver.phone.clone()),
                FormField::new("Email", driver.email.clone()),
            ],
        )
    }

    pub fn profile(name: &str, phone: &str) -> Self {
        Self::new(
            "Editar perfil",
            FormKind::Profile,
            vec![FormField::new("Nombre", name), FormField::new("Teléfono", phone)],
        )
    }

    pub fn password() -> Self {
        Self::new(
            "Cambiar contraseña",
            FormKind::Password,
            vec![
                FormField::secret("Contraseña actual"),
                FormField::secret("Nueva contraseña"),
                FormField::secret("Confirmar contraseña"),
            ],
        )
    }

    pub fn focused_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focus)
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn on_last_field(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    fn text(&self, idx: usize) -> &str {
        self.fields.get(idx).map(FormField::value).unwrap_or_default()
    }

    fn raw(&self, idx: usize) -> String {
        self.fields
            .get(idx)
            .map(|field| field.input.clone())
            .unwrap_or_default()
    }

    pub fn credentials(&self) -> (String, String) {
        (self.text(0).to_string(), self.raw(1))
    }

    pub fn new_bus(&self) -> Result<NewBus, ValidationError> {
        let bus = NewBus {
            plate: self.text(0).to_string(),
            model: self.text(1).to_string(),
            capacity: parse_number(self.text(2), "capacity")?,
            year: parse_number(self.text(3), "year")?,
            status: parse_bus_status(self.text(4))?,
        };
        bus.validate()?;
        Ok(bus)
    }

    pub fn bus_patch(&self) -> Result<BusPatch, ValidationError> {
        let bus = self.new_bus()?;
        Ok(BusPatch {
            plate: Some(bus.plate),
            model: Some(bus.model),
            capacity: Some(bus.capacity),
            year: Some(bus.year),
            status: Some(bus.status),
        })
    }

    pub fn new_route(&self) -> Result<NewRoute, ValidationError> {
        let route = NewRoute {
            name: self.text(0).to_string(),
            origin: self.text(1).to_string(),
            destination: self.text(2).to_string(),
            distance: parse_number(self.text(3), "distance")?,
            duration: parse_number(self.text(4), "duration")?,
            fare: parse_number(self.text(5), "fare")?,
            status: parse_activity(self.text(6))?,
        };
        route.validate()?;
        Ok(route)
    }

    pub fn route_patch(&self) -> Result<RoutePatch, ValidationError> {
        let route = self.new_route()?;
        Ok(RoutePatch {
            name: Some(route.name),
            origin: Some(route.origin),
            destination: Some(route.destination),
            distance: Some(route.distance),
            duration: Some(route.duration),
            fare: Some(route.fare),
            status: Some(route.status),
        })
    }

    pub fn new_driver(&self) -> Result<NewDriver, ValidationError> {
        let assigned = self.text(6);
        if let Some(choices) = &self.bus_choices {
            if !assigned.is_empty() && !choices.iter().any(|id| id == assigned) {
                return Err(invalid("assignedBus", "expected one of the available buses"));
            }
        }
        let driver = NewDriver {
            name: self.text(0).to_string(),
            license: self.text(1).to_string(),
            phone: self.text(2).to_string(),
            email: self.text(3).to_string(),
            experience: parse_number(self.text(4), "experience")?,
            status: parse_activity(self.text(5))?,
            assigned_bus: (!assigned.is_empty()).then(|| assigned.to_string()),
        };
        driver.validate()?;
        Ok(driver)
    }

    /// An empty bus field clears the assignment.
    pub fn driver_patch(&self) -> Result<DriverPatch, ValidationError> {
        let driver = self.new_driver()?;
        Ok(DriverPatch {
            name: Some(driver.name),
            license: Some(driver.license),
            phone: Some(driver.phone),
            email: Some(driver.email),
            experience: Some(driver.experience),
            status: Some(driver.status),
            assigned_bus: Some(driver.assigned_bus),
        })
    }

    pub fn new_admin(&self) -> Result<NewAdmin, ValidationError> {
        let username = self.text(2);
        if username.is_empty() {
            return Err(invalid("username", "must not be empty"));
        }
        Ok(NewAdmin {
            name: self.text(0).to_string(),
            email: self.text(1).to_string(),
            username: username.to_string(),
            role: AdminRole::parse(self.text(3))
                .ok_or_else(|| invalid("role", "expected super-admin, admin, readmin or editor"))?,
            status: parse_activity(self.text(4))?,
        })
    }

    pub fn admin_patch(&self) -> Result<AdminPatch, ValidationError> {
        let admin = self.new_admin()?;
        Ok(AdminPatch {
            name: Some(admin.name),
            email: Some(admin.email),
            username: Some(admin.username),
            role: Some(admin.role),
            status: Some(admin.status),
        })
    }

    pub fn contact_value(&self) -> DriverContact {
        DriverContact {
            phone: self.text(0).to_string(),
            email: self.text(1).to_string(),
        }
    }

    pub fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.text(0).to_string(),
            phone: self.text(1).to_string(),
        }
    }

    pub fn password_change(&self) -> PasswordChange {
        PasswordChange {
            current: self.raw(0),
            new: self.raw(1),
            confirm: self.raw(2),
        }
    }
}

fn editing(noun: &str, id: Option<String>) -> (String, Option<String>) {
    match id {
        Some(id) => (format!("Editar {noun} {id}"), Some(id)),
        None => (format!("Nuevo {noun}"), None),
    }
}

fn invalid(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(raw: &str, field: &'static str) -> Result<T, ValidationError> {
    raw.parse().map_err(|_| invalid(field, "expected a number"))
}

fn parse_bus_status(raw: &str) -> Result<BusStatus, ValidationError> {
    match raw.to_ascii_lowercase().as_str() {
        "active" => Ok(BusStatus::Active),
        "maintenance" => Ok(BusStatus::Maintenance),
        "inactive" => Ok(BusStatus::Inactive),
        _ => Err(invalid("status", "expected active, maintenance or inactive")),
    }
}

fn parse_activity(raw: &str) -> Result<ActivityStatus, ValidationError> {
    match raw.to_ascii_lowercase().as_str() {
        "active" => Ok(ActivityStatus::Active),
        "inactive" => Ok(ActivityStatus::Inactive),
        _ => Err(invalid("status", "expected active or inactive")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(form: &mut FormModal, values: &[&str]) {
        for (field, value) in form.fields.iter_mut().zip(values) {
            *field = FormField::new(field.label, *value);
        }
    }

    #[test]
    fn editing_handles_multibyte_text() {
        let mut field = FormField::new("Nombre", "Pérez");
        field.move_home();
        field.move_cursor(2);
        field.delete();
        assert_eq!(field.input, "Péez");
        field.insert('r');
        field.move_end();
        field.backspace();
        assert_eq!(field.input, "Pére");
        assert_eq!(field.cursor, 4);
    }

    #[test]
    fn secret_fields_are_masked() {
        let mut field = FormField::secret("Contraseña");
        for ch in "abc".chars() {
            field.insert(ch);
        }
        assert_eq!(field.display(), "***");
    }

    #[test]
    fn bus_form_parses_and_validates() -> anyhow::Result<()> {
        let mut form = FormModal::bus(None);
        fill(&mut form, &["XYZ-321", "Scania K410", "44", "2023", "maintenance"]);
        let bus = form.new_bus()?;
        assert_eq!(bus.capacity, 44);
        assert_eq!(bus.status, BusStatus::Maintenance);

        fill(&mut form, &["XYZ-321", "Scania K410", "cuarenta", "2023", "active"]);
        assert!(form.new_bus().is_err());
        fill(&mut form, &["XYZ-321", "Scania K410", "0", "2023", "active"]);
        assert!(form.new_bus().is_err());
        Ok(())
    }

    #[test]
    fn blank_bus_field_clears_assignment() -> anyhow::Result<()> {
        let mut form = FormModal::driver(None, &[]);
        fill(
            &mut form,
            &["Ana", "A-I-1", "900", "ana@etransa.com", "2", "active", ""],
        );
        assert_eq!(form.driver_patch()?.assigned_bus, Some(None));
        Ok(())
    }

    fn bus(id: &str, status: BusStatus) -> Bus {
        Bus {
            id: id.to_string(),
            plate: format!("PL-{id}"),
            model: "Mercedes O500".to_string(),
            capacity: 40,
            year: 2022,
            status,
        }
    }

    #[test]
    fn driver_assignment_limited_to_available_buses() -> anyhow::Result<()> {
        let assignable = [bus("b2", BusStatus::Active)];
        let mut form = FormModal::driver(None, &assignable);
        assert_eq!(form.hint.as_deref(), Some("Buses disponibles: b2"));

        fill(
            &mut form,
            &["Ana", "A-I-1", "900", "ana@etransa.com", "2", "active", "b1"],
        );
        assert!(matches!(
            form.new_driver(),
            Err(ValidationError::InvalidField { field: "assignedBus", .. })
        ));

        fill(
            &mut form,
            &["Ana", "A-I-1", "900", "ana@etransa.com", "2", "active", "b2"],
        );
        assert_eq!(form.new_driver()?.assigned_bus.as_deref(), Some("b2"));
        Ok(())
    }

    #[test]
    fn current_assignment_stays_valid_when_editing() -> anyhow::Result<()> {
        let driver = Driver {
            id: "d1".to_string(),
            name: "Carlos".to_string(),
            license: "A-IIIb-1".to_string(),
            phone: "987".to_string(),
            email: "c@etransa.com".to_string(),
            experience: 8,
            status: ActivityStatus::Active,
            assigned_bus: Some("b1".to_string()),
        };
        let form = FormModal::driver(Some(&driver), &[bus("b2", BusStatus::Active)]);
        assert_eq!(form.driver_patch()?.assigned_bus, Some(Some("b1".to_string())));
        Ok(())
    }

    #[test]
    fn passwords_are_taken_verbatim() {
        let mut form = FormModal::password();
        fill(&mut form, &["old ", "n3w", "n3w"]);
        let change = form.password_change();
        assert_eq!(change.current, "old ");
        assert!(change.validate().is_ok());
    }
}
