use std::{cmp, future::Future, io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fleet_core::{
    can_manage_admins, sections_for, Admin, Bus, ConsoleError, Driver, DriverView, FleetConsole,
    Locale, Managed, Message, Notice, NoticeKind, Profile, Route, Section, Session, SessionState,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info};

use crate::form::{FormKind, FormModal};

const TICK_RATE: Duration = Duration::from_millis(250);
/// Ticks a notice stays in the status bar.
const NOTICE_TICKS: u32 = 20;
const SESSION_KEYS: &str = "Tab sección · L cerrar sesión · q salir";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Dashboard,
}

/// Records shown by the active tab.
#[derive(Debug, Clone)]
enum SectionData {
    Buses(Vec<Bus>),
    Routes(Vec<Route>),
    Drivers(Vec<Driver>),
    Admins(Vec<Admin>),
    MyDriver(DriverView),
    Profile(Profile),
}

impl SectionData {
    fn len(&self) -> usize {
        match self {
            Self::Buses(rows) => rows.len(),
            Self::Routes(rows) => rows.len(),
            Self::Drivers(rows) => rows.len(),
            Self::Admins(rows) => rows.len(),
            Self::MyDriver(_) | Self::Profile(_) => 0,
        }
    }

    fn id_at(&self, index: usize) -> Option<String> {
        match self {
            Self::Buses(rows) => rows.get(index).map(|row| row.id.clone()),
            Self::Routes(rows) => rows.get(index).map(|row| row.id.clone()),
            Self::Drivers(rows) => rows.get(index).map(|row| row.id.clone()),
            Self::Admins(rows) => rows.get(index).map(|row| row.id.clone()),
            Self::MyDriver(_) | Self::Profile(_) => None,
        }
    }
}

/// Result of a finished background action.
struct Outcome {
    notice: Notice,
    refresh: bool,
}

enum AppEvent {
    Input(Event),
    Tick,
    Login(Result<Option<Session>, ConsoleError>),
    Loaded(Section, Result<SectionData, ConsoleError>),
    /// Buses a driver can be assigned to, fetched before the driver form opens.
    DriverForm(Option<Driver>, Result<Vec<Bus>, ConsoleError>),
    Finished(Outcome),
}

/// Terminal front end of the fleet console.
pub struct FleetApp {
    console: FleetConsole,
    locale: Locale,
    state: UiState,
    screen: Screen,
    session: Option<Session>,
    sections: Vec<Section>,
    tab: usize,
    data: Option<SectionData>,
    login: FormModal,
    form: Option<FormModal>,
    confirm_delete: Option<String>,
    /// Spawned tasks whose result event has not arrived yet.
    pending: usize,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl FleetApp {
    pub fn new(console: FleetConsole) -> Self {
        let locale = console.locale();
        Self {
            console,
            locale,
            state: UiState::default(),
            screen: Screen::Login,
            session: None,
            sections: Vec::new(),
            tab: 0,
            data: None,
            login: FormModal::login(),
            form: None,
            confirm_delete: None,
            pending: 0,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let mut session_rx = self.console.sessions().subscribe();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = session_rx.borrow_and_update().clone();
                    self.apply_session_state(state);
                }
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn apply_session_state(&mut self, state: SessionState) {
        match state {
            SessionState::LoggedIn(session) => {
                self.sections = sections_for(session.principal());
                self.session = Some(session);
                self.screen = Screen::Dashboard;
                self.tab = 0;
                self.login = FormModal::login();
                self.load_current_section();
            }
            SessionState::LoggedOut => {
                self.session = None;
                self.sections.clear();
                self.data = None;
                self.form = None;
                self.confirm_delete = None;
                self.screen = Screen::Login;
            }
        }
    }

    fn handle_tick(&mut self) {
        self.state.age_notice();
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "input handling failed");
                    self.state.set_notice(Notice {
                        kind: NoticeKind::Error,
                        text: format!("Error: {err}"),
                    });
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::Login(result)) => {
                self.pending = self.pending.saturating_sub(1);
                let notice = match result {
                    Ok(Some(session)) => self
                        .locale
                        .notice(Message::LoggedIn(session.user().name.clone())),
                    Ok(None) => self.locale.notice(Message::BadCredentials),
                    Err(err) => {
                        error!(%err, "login failed");
                        self.locale.failure(Message::BadCredentials, &err)
                    }
                };
                self.state.set_notice(notice);
                true
            }
            Some(AppEvent::Loaded(section, result)) => {
                self.pending = self.pending.saturating_sub(1);
                if self.current_section() != Some(section) {
                    return true;
                }
                match result {
                    Ok(data) => {
                        self.data = Some(data);
                        self.state.clamp_cursor(self.row_count());
                    }
                    Err(err) => {
                        error!(%err, section = section.title(), "section load failed");
                        self.data = None;
                        let notice = match err {
                            ConsoleError::Forbidden(_) => {
                                self.locale.failure(Message::Forbidden, &err)
                            }
                            _ => Notice {
                                kind: NoticeKind::Error,
                                text: err.to_string(),
                            },
                        };
                        self.state.set_notice(notice);
                    }
                }
                true
            }
            Some(AppEvent::DriverForm(existing, result)) => {
                self.pending = self.pending.saturating_sub(1);
                match result {
                    Ok(buses) => {
                        self.form = Some(FormModal::driver(existing.as_ref(), &buses));
                    }
                    Err(err) => {
                        error!(%err, "assignable buses unavailable");
                        self.state.set_notice(
                            self.locale.failure(Message::SaveFailed(Section::Drivers), &err),
                        );
                    }
                }
                true
            }
            Some(AppEvent::Finished(outcome)) => {
                self.pending = self.pending.saturating_sub(1);
                self.state.set_notice(outcome.notice);
                if outcome.refresh {
                    self.load_current_section();
                }
                true
            }
            None => false,
        }
    }

    fn is_busy(&self) -> bool {
        self.pending > 0
    }

    fn current_section(&self) -> Option<Section> {
        self.sections.get(self.tab).copied()
    }

    fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, SectionData::len)
    }

    fn selected_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.id_at(self.state.cursor))
    }

    fn can_manage_current(&self) -> bool {
        let (Some(session), Some(section)) = (&self.session, self.current_section()) else {
            return false;
        };
        match section {
            Section::Admins => can_manage_admins(session.principal()),
            Section::Buses | Section::Routes | Section::Drivers => {
                session.permits(Bus::MANAGE)
            }
            Section::MyDriver | Section::Profile => false,
        }
    }

    /// Run `task` off the UI loop; its event arrives through the channel.
    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return;
        };
        self.pending += 1;
        spawn(async move {
            let event = task.await;
            let _ = sender.send(event).await;
        });
    }

    fn load_current_section(&mut self) {
        let (Some(session), Some(section)) = (self.session.clone(), self.current_section())
        else {
            return;
        };
        let console = self.console.clone();
        info!(section = section.title(), "loading section");
        self.spawn_task(async move {
            let result = match section {
                Section::Buses => console.list(&session).await.map(SectionData::Buses),
                Section::Routes => console.list(&session).await.map(SectionData::Routes),
                Section::Drivers => console.list(&session).await.map(SectionData::Drivers),
                Section::Admins => console.list(&session).await.map(SectionData::Admins),
                Section::MyDriver => console.my_driver(&session).await.map(SectionData::MyDriver),
                Section::Profile => console.profile(&session).await.map(SectionData::Profile),
            };
            AppEvent::Loaded(section, result)
        });
    }

    fn submit_login(&mut self) {
        let (username, password) = self.login.credentials();
        if username.is_empty() {
            return;
        }
        let console = self.console.clone();
        self.spawn_task(async move {
            AppEvent::Login(console.login(&username, &password).await)
        });
    }

    fn logout(&mut self) {
        if self.console.logout() {
            self.state.set_notice(self.locale.notice(Message::LoggedOut));
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        if self.is_busy() {
            return Ok(());
        }
        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Dashboard if self.form.is_some() => self.handle_form_key(key),
            Screen::Dashboard if self.confirm_delete.is_some() => self.handle_confirm_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
        }
        Ok(())
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Enter if self.login.on_last_field() => self.submit_login(),
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down => self.login.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.login.prev_field(),
            _ => edit_field(&mut self.login, key),
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.form = None,
            KeyCode::Enter if form.on_last_field() => {
                if let Some(form) = self.form.take() {
                    self.submit_form(form);
                }
            }
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            _ => edit_field(form, key),
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let Some(id) = self.confirm_delete.take() else {
            return;
        };
        if let KeyCode::Char('y') | KeyCode::Char('s') = key.code {
            self.delete_record(id);
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Char('L') => self.logout(),
            KeyCode::Tab | KeyCode::Right => self.switch_tab(1),
            KeyCode::BackTab | KeyCode::Left => self.switch_tab(-1),
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.move_cursor(1, self.row_count());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.move_cursor(-1, self.row_count());
            }
            KeyCode::Char('r') => self.load_current_section(),
            KeyCode::Char('n') if self.can_manage_current() => self.open_create_form(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_form(),
            KeyCode::Char('d') if self.can_manage_current() => {
                self.confirm_delete = self.selected_id();
            }
            KeyCode::Char('s') if self.can_manage_current() => self.toggle_selected(),
            KeyCode::Char('p') if self.current_section() == Some(Section::Profile) => {
                self.form = Some(FormModal::password());
            }
            _ => {}
        }
    }

    fn switch_tab(&mut self, delta: isize) {
        if self.sections.is_empty() {
            return;
        }
        let len = self.sections.len() as isize;
        self.tab = (self.tab as isize + delta).rem_euclid(len) as usize;
        self.data = None;
        self.state.cursor = 0;
        self.state.offset = 0;
        self.load_current_section();
    }

    fn open_create_form(&mut self) {
        if self.current_section() == Some(Section::Drivers) {
            self.open_driver_form(None);
            return;
        }
        self.form = match self.current_section() {
            Some(Section::Buses) => Some(FormModal::bus(None)),
            Some(Section::Routes) => Some(FormModal::route(None)),
            Some(Section::Admins) => Some(FormModal::admin(None)),
            _ => None,
        };
    }

    /// The driver form opens once the active buses are known.
    fn open_driver_form(&mut self, existing: Option<Driver>) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let console = self.console.clone();
        self.spawn_task(async move {
            let buses = console.assignable_buses(&session).await;
            AppEvent::DriverForm(existing, buses)
        });
    }

    fn open_edit_form(&mut self) {
        let cursor = self.state.cursor;
        let manage = self.can_manage_current();
        let selected_driver = match &self.data {
            Some(SectionData::Drivers(rows)) => Some(rows.get(cursor).cloned()),
            _ => None,
        };
        if let Some(selected) = selected_driver {
            if let (true, Some(driver)) = (manage, selected) {
                self.open_driver_form(Some(driver));
            }
            return;
        }
        self.form = match &self.data {
            Some(SectionData::Buses(rows)) if manage => {
                rows.get(cursor).map(|row| FormModal::bus(Some(row)))
            }
            Some(SectionData::Routes(rows)) if manage => {
                rows.get(cursor).map(|row| FormModal::route(Some(row)))
            }
            Some(SectionData::Admins(rows)) if manage => {
                rows.get(cursor).map(|row| FormModal::admin(Some(row)))
            }
            Some(SectionData::MyDriver(view)) => view.driver.as_ref().map(FormModal::contact),
            Some(SectionData::Profile(profile)) => {
                Some(FormModal::profile(&profile.name, &profile.phone))
            }
            _ => None,
        };
    }

    fn submit_form(&mut self, form: FormModal) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let console = self.console.clone();
        let locale = self.locale;
        let section = form.kind.section();
        let rejected =
            |err| locale.failure(Message::SaveFailed(section), &ConsoleError::Validation(err));

        match form.kind.clone() {
            FormKind::Login => {}
            FormKind::Bus(id) => match (id, form.new_bus(), form.bus_patch()) {
                (None, Ok(draft), _) => {
                    self.spawn_task(save_new::<Bus>(console, session, draft, locale))
                }
                (Some(id), _, Ok(patch)) => {
                    self.spawn_task(save_edit::<Bus>(console, session, id, patch, locale))
                }
                (_, Err(err), _) | (_, _, Err(err)) => self.state.set_notice(rejected(err)),
            },
            FormKind::Route(id) => match (id, form.new_route(), form.route_patch()) {
                (None, Ok(draft), _) => {
                    self.spawn_task(save_new::<Route>(console, session, draft, locale))
                }
                (Some(id), _, Ok(patch)) => {
                    self.spawn_task(save_edit::<Route>(console, session, id, patch, locale))
                }
                (_, Err(err), _) | (_, _, Err(err)) => self.state.set_notice(rejected(err)),
            },
            FormKind::Driver(id) => match (id, form.new_driver(), form.driver_patch()) {
                (None, Ok(draft), _) => {
                    self.spawn_task(save_new::<Driver>(console, session, draft, locale))
                }
                (Some(id), _, Ok(patch)) => {
                    self.spawn_task(save_edit::<Driver>(console, session, id, patch, locale))
                }
                (_, Err(err), _) | (_, _, Err(err)) => self.state.set_notice(rejected(err)),
            },
            FormKind::Admin(id) => match (id, form.new_admin(), form.admin_patch()) {
                (None, Ok(draft), _) => {
                    self.spawn_task(save_new::<Admin>(console, session, draft, locale))
                }
                (Some(id), _, Ok(patch)) => {
                    self.spawn_task(save_edit::<Admin>(console, session, id, patch, locale))
                }
                (_, Err(err), _) | (_, _, Err(err)) => self.state.set_notice(rejected(err)),
            },
            FormKind::MyContact => {
                let contact = form.contact_value();
                self.spawn_task(async move {
                    let notice = match console.update_my_contact(&session, contact).await {
                        Ok(_) => locale.notice(Message::Updated(Section::MyDriver)),
                        Err(err) => locale.failure(Message::SaveFailed(Section::MyDriver), &err),
                    };
                    AppEvent::Finished(Outcome {
                        notice,
                        refresh: true,
                    })
                });
            }
            FormKind::Profile => {
                let update = form.profile_update();
                self.spawn_task(async move {
                    let notice = match console.update_profile(&session, update).await {
                        Ok(_) => locale.notice(Message::ProfileUpdated),
                        Err(err) => locale.failure(Message::SaveFailed(Section::Profile), &err),
                    };
                    AppEvent::Finished(Outcome {
                        notice,
                        refresh: true,
                    })
                });
            }
            FormKind::Password => {
                let change = form.password_change();
                if let Err(err) = change.validate() {
                    self.state.set_notice(rejected(err));
                    return;
                }
                self.spawn_task(async move {
                    let notice = match console.change_password(&session, &change).await {
                        Ok(()) => locale.notice(Message::PasswordChanged),
                        Err(err) => locale.failure(Message::SaveFailed(Section::Profile), &err),
                    };
                    AppEvent::Finished(Outcome {
                        notice,
                        refresh: false,
                    })
                });
            }
        }
    }

    fn delete_record(&mut self, id: String) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let console = self.console.clone();
        let locale = self.locale;
        match self.current_section() {
            Some(Section::Buses) => self.spawn_task(delete::<Bus>(console, session, id, locale)),
            Some(Section::Routes) => self.spawn_task(delete::<Route>(console, session, id, locale)),
            Some(Section::Drivers) => {
                self.spawn_task(delete::<Driver>(console, session, id, locale))
            }
            Some(Section::Admins) => self.spawn_task(delete::<Admin>(console, session, id, locale)),
            _ => {}
        }
    }

    fn toggle_selected(&mut self) {
        let (Some(session), Some(id)) = (self.session.clone(), self.selected_id()) else {
            return;
        };
        let console = self.console.clone();
        let locale = self.locale;
        match self.current_section() {
            Some(Section::Buses) => self.spawn_task(toggle::<Bus>(console, session, id, locale)),
            Some(Section::Routes) => self.spawn_task(toggle::<Route>(console, session, id, locale)),
            Some(Section::Drivers) => {
                self.spawn_task(toggle::<Driver>(console, session, id, locale))
            }
            Some(Section::Admins) => self.spawn_task(toggle::<Admin>(console, session, id, locale)),
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Login => self.draw_login(frame),
            Screen::Dashboard => self.draw_dashboard(frame),
        }
        if let Some(form) = &self.form {
            self.render_form(frame, form);
        }
        if let Some(id) = &self.confirm_delete {
            self.render_confirm(frame, id);
        }
    }

    fn draw_login(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(3)])
            .split(area);

        let title = Paragraph::new(Line::from(Span::styled(
            "ETRANSA · Panel de administración",
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(title, Rect::new(area.x, area.y + 1, area.width, 1));

        self.render_form(frame, &self.login);
        self.render_status(frame, layout[1]);
    }

    fn draw_dashboard(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_tabs(frame, chunks[0]);
        match self.data.clone() {
            Some(SectionData::MyDriver(view)) => self.render_my_driver(frame, chunks[1], &view),
            Some(SectionData::Profile(profile)) => self.render_profile(frame, chunks[1], &profile),
            Some(data) => self.render_rows(frame, chunks[1], &data),
            None => {
                let text = if self.is_busy() { "Cargando…" } else { "Sin datos" };
                let placeholder =
                    Paragraph::new(text).block(Block::default().borders(Borders::ALL));
                frame.render_widget(placeholder, chunks[1]);
            }
        }
        self.render_status(frame, chunks[2]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = self
            .sections
            .iter()
            .map(|section| Line::from(section.title()))
            .collect();
        let header = self
            .session
            .as_ref()
            .map(|session| {
                format!(
                    "{} · {}",
                    session.user().name,
                    session.user().role.label()
                )
            })
            .unwrap_or_default();
        let tabs = Tabs::new(titles)
            .select(self.tab)
            .block(Block::default().borders(Borders::ALL).title(header))
            .style(Style::default().fg(self.theme.primary_fg))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn render_rows(&mut self, frame: &mut Frame, area: Rect, data: &SectionData) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp_cursor(data.len());
        self.state.ensure_cursor_visible(data.len());

        let lines: Vec<String> = match data {
            SectionData::Buses(rows) => rows.iter().map(bus_line).collect(),
            SectionData::Routes(rows) => rows.iter().map(route_line).collect(),
            SectionData::Drivers(rows) => rows.iter().map(driver_line).collect(),
            SectionData::Admins(rows) => rows.iter().map(admin_line).collect(),
            SectionData::MyDriver(_) | SectionData::Profile(_) => Vec::new(),
        };
        let end = (self.state.offset + self.state.list_height).min(lines.len());
        let visible = lines.get(self.state.offset..end).unwrap_or_default();

        let mut list_state = ListState::default();
        if !visible.is_empty() {
            list_state.select(Some(self.state.cursor.saturating_sub(self.state.offset)));
        }
        let items: Vec<ListItem> = visible
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let marker = if self.state.offset + idx == self.state.cursor {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(line.clone(), Style::default().fg(self.theme.primary_fg)),
                ]))
            })
            .collect();

        let title = self
            .current_section()
            .map(|section| format!("{} ({})", section.title(), data.len()))
            .unwrap_or_default();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_my_driver(&self, frame: &mut Frame, area: Rect, view: &DriverView) {
        let mut lines = Vec::new();
        match &view.driver {
            Some(driver) => {
                lines.push(label_line("Nombre", &driver.name));
                lines.push(label_line("Licencia", &driver.license));
                lines.push(label_line("Teléfono", &driver.phone));
                lines.push(label_line("Email", &driver.email));
                lines.push(label_line("Experiencia", &format!("{} años", driver.experience)));
                lines.push(label_line("Estado", driver.status.as_str()));
            }
            None => lines.push(Line::from("Registro de chofer no encontrado")),
        }
        lines.push(Line::from(""));
        match &view.bus {
            Some(bus) => {
                lines.push(label_line("Bus asignado", &bus.plate));
                lines.push(label_line("Modelo", &bus.model));
                lines.push(label_line("Capacidad", &bus.capacity.to_string()));
                lines.push(label_line("Estado del bus", bus.status.as_str()));
            }
            None => lines.push(label_line("Bus asignado", "ninguno")),
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Mi Perfil"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_profile(&self, frame: &mut Frame, area: Rect, profile: &Profile) {
        let created = profile
            .created_at
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        let last_login = profile
            .last_login
            .map(|at| at.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let lines = vec![
            label_line("Nombre", &profile.name),
            label_line("Email", &profile.email),
            label_line("Rol", &profile.role),
            label_line("Teléfono", &profile.phone),
            label_line("Creado", &created),
            label_line("Último acceso", &last_login),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Perfil"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &FormModal) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let extra = if form.hint.is_some() { 5 } else { 4 };
        let height = (form.fields.len() as u16 + extra).min(frame_area.height.saturating_sub(2));
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let label_width = form
            .fields
            .iter()
            .map(|field| field.label.chars().count())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<Line> = form
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let style = if idx == form.focus {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                Line::from(vec![
                    Span::styled(format!("{:<label_width$} ", field.label), style),
                    Span::raw(field.display()),
                ])
            })
            .collect();
        if let Some(hint) = &form.hint {
            lines.push(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(self.theme.muted),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" siguiente/guardar  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancelar"),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title.clone()));
        frame.render_widget(paragraph, area);

        if let Some(field) = form.fields.get(form.focus) {
            let cursor_x = (area.x + 2 + label_width as u16 + field.cursor as u16)
                .min(area.x + area.width.saturating_sub(2));
            let cursor_y = area.y + 1 + form.focus as u16;
            frame.set_cursor(cursor_x, cursor_y);
        }
    }

    fn render_confirm(&self, frame: &mut Frame, id: &str) {
        let area = centered_rect(44, 5, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(format!("¿Eliminar el registro {id}?")),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" eliminar  "),
                Span::styled("cualquier tecla", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancelar"),
            ]),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirmar")
                .border_style(Style::default().fg(self.theme.danger)),
        )
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(self.help_text());
        let line = match &self.state.notice {
            Some(notice) => {
                let color = match notice.kind {
                    NoticeKind::Success => self.theme.success,
                    NoticeKind::Error => self.theme.danger,
                    NoticeKind::Info => self.theme.warning,
                };
                Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
            }
            None if self.is_busy() => Line::from("Procesando…"),
            None => Line::from(""),
        };
        let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn help_text(&self) -> String {
        match (self.screen, self.current_section()) {
            (Screen::Login, _) => "Enter continuar · Esc salir".to_string(),
            (Screen::Dashboard, Some(Section::MyDriver)) => {
                format!("e editar contacto · r recargar · {SESSION_KEYS}")
            }
            (Screen::Dashboard, Some(Section::Profile)) => {
                format!("e editar · p contraseña · {SESSION_KEYS}")
            }
            (Screen::Dashboard, _) if self.can_manage_current() => {
                format!("n nuevo · e editar · d eliminar · s estado · r recargar · {SESSION_KEYS}")
            }
            (Screen::Dashboard, _) => format!("r recargar · {SESSION_KEYS}"),
        }
    }
}

async fn save_new<T: Managed>(
    console: FleetConsole,
    session: Session,
    draft: T::Draft,
    locale: Locale,
) -> AppEvent {
    let notice = match console.create::<T>(&session, &draft).await {
        Ok(_) => locale.notice(Message::Created(T::SECTION)),
        Err(err) => locale.failure(Message::SaveFailed(T::SECTION), &err),
    };
    AppEvent::Finished(Outcome {
        notice,
        refresh: true,
    })
}

async fn save_edit<T: Managed>(
    console: FleetConsole,
    session: Session,
    id: String,
    patch: T::Patch,
    locale: Locale,
) -> AppEvent {
    let notice = match console.update::<T>(&session, &id, &patch).await {
        Ok(_) => locale.notice(Message::Updated(T::SECTION)),
        Err(err) => locale.failure(Message::SaveFailed(T::SECTION), &err),
    };
    AppEvent::Finished(Outcome {
        notice,
        refresh: true,
    })
}

async fn delete<T: Managed>(
    console: FleetConsole,
    session: Session,
    id: String,
    locale: Locale,
) -> AppEvent {
    let notice = match console.delete::<T>(&session, &id).await {
        Ok(_) => locale.notice(Message::Deleted(T::SECTION)),
        Err(err) => locale.failure(Message::DeleteFailed(T::SECTION), &err),
    };
    AppEvent::Finished(Outcome {
        notice,
        refresh: true,
    })
}

async fn toggle<T: Managed>(
    console: FleetConsole,
    session: Session,
    id: String,
    locale: Locale,
) -> AppEvent {
    let notice = match console.toggle_status::<T>(&session, &id).await {
        Ok(_) => locale.notice(Message::StatusChanged(T::SECTION)),
        Err(err) => locale.failure(Message::SaveFailed(T::SECTION), &err),
    };
    AppEvent::Finished(Outcome {
        notice,
        refresh: true,
    })
}

fn edit_field(form: &mut FormModal, key: KeyEvent) {
    let Some(field) = form.focused_mut() else {
        return;
    };
    match key.code {
        KeyCode::Left => field.move_cursor(-1),
        KeyCode::Right => field.move_cursor(1),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Char(ch) => {
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                field.insert(ch);
            }
        }
        _ => {}
    }
}

fn label_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(value.to_string()),
    ])
}

fn bus_line(bus: &Bus) -> String {
    format!(
        "{:<10} {:<22} {:>3} asientos  {}  {}",
        bus.plate,
        bus.model,
        bus.capacity,
        bus.year,
        bus.status.as_str()
    )
}

fn route_line(route: &Route) -> String {
    format!(
        "{:<18} {} → {}  {} km  {} h  S/ {:.2}  {}",
        route.name,
        route.origin,
        route.destination,
        route.distance,
        route.duration,
        route.fare,
        route.status.as_str()
    )
}

fn driver_line(driver: &Driver) -> String {
    format!(
        "{:<20} {:<14} {:<11} {:<22} {:>2} años  bus {}  {}",
        driver.name,
        driver.license,
        driver.phone,
        driver.email,
        driver.experience,
        driver.assigned_bus.as_deref().unwrap_or("-"),
        driver.status.as_str()
    )
}

fn admin_line(admin: &Admin) -> String {
    format!(
        "{:<18} {:<10} {:<24} {:<11} {}  {}",
        admin.name,
        admin.username,
        admin.email,
        admin.role.as_str(),
        admin.created_at.format("%d/%m/%Y"),
        admin.status.as_str()
    )
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: usize,
    offset: usize,
    list_height: usize,
    notice: Option<Notice>,
    notice_age: u32,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            offset: 0,
            list_height: 1,
            notice: None,
            notice_age: 0,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_age = 0;
    }

    fn age_notice(&mut self) {
        if self.notice.is_none() {
            return;
        }
        self.notice_age += 1;
        if self.notice_age >= NOTICE_TICKS {
            self.notice = None;
        }
    }

    fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = idx as usize;
        self.ensure_cursor_visible(len);
    }

    fn clamp_cursor(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn ensure_cursor_visible(&mut self, len: usize) {
        if len == 0 || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = len.saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_stays_within_rows() {
        let mut state = UiState {
            list_height: 2,
            ..UiState::default()
        };
        state.move_cursor(5, 3);
        assert_eq!(state.cursor, 2);
        assert_eq!(state.offset, 1);
        state.move_cursor(-9, 3);
        assert_eq!((state.cursor, state.offset), (0, 0));
        state.clamp_cursor(0);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn notices_expire() {
        let mut state = UiState::default();
        state.set_notice(Locale::Es.notice(Message::LoggedOut));
        for _ in 0..NOTICE_TICKS {
            state.age_notice();
        }
        assert!(state.notice.is_none());
    }

    #[test]
    fn centered_rect_fits_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(40, 4, area), Rect::new(0, 3, 20, 4));
    }
}
