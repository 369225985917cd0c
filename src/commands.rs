//! Command-line surface of the console.
//!
//! Each subcommand maps to one backend operation. Protected commands pass the
//! navigation guard first, the same way a protected view would.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::api::ai::AccessType;
use crate::api::detection::{self, ImageError, ImageUpload};
use crate::api::error::ApiError;
use crate::api::query::Query;
use crate::api::resources::ResourceKind;
use crate::api::types::{RegisterRequest, Sex};
use crate::api::{auth, billing, reservations};
use crate::routes::Route;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "smartcondo", version, about = "Smart Condominium administration console")]
pub struct Cli {
    /// Retries for server and network failures (overrides CONDO_HTTP_RETRIES)
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Invalidate the token and forget the session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create a new account
    Register {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        apellido: String,
        #[arg(long)]
        correo: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        sexo: SexArg,
        #[arg(long)]
        telefono: Option<String>,
    },
    /// List a collection
    List {
        resource: ResourceKind,
        /// Filter as key=value (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },
    /// Show one item
    Get { resource: ResourceKind, id: String },
    /// Create an item from a JSON body
    Create { resource: ResourceKind, data: String },
    /// Update an item from a JSON body (PATCH, or PUT with --replace)
    Update {
        resource: ResourceKind,
        id: String,
        data: String,
        #[arg(long)]
        replace: bool,
    },
    /// Delete an item
    Delete { resource: ResourceKind, id: String },
    /// Cancel a reservation
    CancelReservation { id: i64 },
    /// Show free slots of a common area on a date (YYYY-MM-DD)
    Availability { area: i64, date: String },
    /// Account statement for a month (YYYY-MM)
    Statement { month: String },
    /// Download a payment receipt
    Receipt {
        id: i64,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Face recognition and enrolment
    #[command(subcommand)]
    Face(FaceCommand),
    /// Licence plate detection
    #[command(subcommand)]
    Plate(PlateCommand),
    /// Check the AI detection service
    AiHealth,
}

#[derive(Debug, Subcommand)]
pub enum FaceCommand {
    Recognize {
        image: PathBuf,
        #[arg(long)]
        camera: Option<String>,
        /// Send to the AI service instead of the backend
        #[arg(long)]
        ai: bool,
    },
    Enroll {
        image: PathBuf,
        user: i64,
        #[arg(long)]
        ai: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PlateCommand {
    Detect {
        image: PathBuf,
        #[arg(long)]
        camera: Option<String>,
        #[arg(long)]
        ai: bool,
        /// Vehicle leaving (AI service only)
        #[arg(long)]
        exit: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SexArg {
    M,
    F,
}

impl From<SexArg> for Sex {
    fn from(arg: SexArg) -> Self {
        match arg {
            SexArg::M => Sex::Male,
            SexArg::F => Sex::Female,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("{0} requires a session. Run `smartcondo login <email>` first")]
    LoginRequired(&'static str),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read password: {0}")]
    Io(#[from] io::Error),
}

impl CommandError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, CommandError::Api(e) if e.is_session_expired())
    }

    /// The user has to log in (again) before retrying.
    pub fn needs_login(&self) -> bool {
        self.is_session_expired() || matches!(self, CommandError::LoginRequired(_))
    }
}

/// View a resource belongs to, for the guard.
pub fn route_for(resource: ResourceKind) -> Route {
    match resource {
        ResourceKind::Usuarios => Route::Users,
        ResourceKind::Roles => Route::Roles,
        ResourceKind::Propiedades | ResourceKind::Pertenece => Route::Properties,
        ResourceKind::Pagos | ResourceKind::Multas => Route::FeesAndFines,
        ResourceKind::AreasComunes | ResourceKind::Horarios => Route::CommonAreas,
        ResourceKind::Comunicados => Route::Bulletins,
        ResourceKind::Reserva => Route::Reservations,
        ResourceKind::Casos => Route::Cases,
        ResourceKind::ReconocimientoFacial
        | ResourceKind::PerfilFacial
        | ResourceKind::DeteccionPlaca => Route::AiDetection,
        _ => Route::Dashboard,
    }
}

/// Run one command and return what should be printed.
pub async fn run(state: &AppState, command: Command) -> Result<String, CommandError> {
    match command {
        Command::Login { email, password } => {
            state.navigator.navigate(Route::Login, false);
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let user = auth::login(&state.api, &email, &password).await?;
            state.navigator.navigate(Route::Dashboard, true);
            Ok(format!(
                "Logged in as {} <{}>{}",
                user.full_name(),
                user.correo,
                user.role_name()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default()
            ))
        }
        Command::Logout => {
            auth::logout(&state.api).await?;
            state.navigator.navigate(Route::Login, false);
            Ok("Logged out".to_string())
        }
        Command::Whoami => {
            guard(state, Route::Dashboard).await?;
            let user = auth::current_user(&state.api).await?;
            pretty(&user)
        }
        Command::Register {
            nombre,
            apellido,
            correo,
            password,
            sexo,
            telefono,
        } => {
            state.navigator.navigate(Route::Register, false);
            let request = RegisterRequest {
                nombre,
                apellido,
                correo,
                contrasena: password,
                sexo: sexo.into(),
                telefono,
            };
            let message = auth::register(&state.api, &request).await?;
            Ok(message.unwrap_or_else(|| "Account created".to_string()))
        }
        Command::List { resource, filters } => {
            guard(state, route_for(resource)).await?;
            let query = Query::new().extend_raw(filters.iter().map(String::as_str));
            let listing = state.api.resource(resource).list(&query).await?;
            let mut out = pretty(listing.items())?;
            out.push_str(&format!(
                "\n{} of {} {}",
                listing.len(),
                listing.total(),
                resource
            ));
            if let Some(next) = listing.next_page() {
                out.push_str(&format!("\nnext page: {}", next));
            }
            Ok(out)
        }
        Command::Get { resource, id } => {
            guard(state, route_for(resource)).await?;
            pretty(&state.api.resource(resource).get(&id).await?)
        }
        Command::Create { resource, data } => {
            guard(state, route_for(resource)).await?;
            let body: Value = serde_json::from_str(&data)?;
            pretty(&state.api.resource(resource).create(&body).await?)
        }
        Command::Update {
            resource,
            id,
            data,
            replace,
        } => {
            guard(state, route_for(resource)).await?;
            let body: Value = serde_json::from_str(&data)?;
            let items = state.api.resource(resource);
            let updated = if replace {
                items.replace(&id, &body).await?
            } else {
                items.update(&id, &body).await?
            };
            pretty(&updated)
        }
        Command::Delete { resource, id } => {
            guard(state, route_for(resource)).await?;
            state.api.resource(resource).delete(&id).await?;
            Ok(format!("Deleted {} {}", resource, id))
        }
        Command::CancelReservation { id } => {
            guard(state, Route::Reservations).await?;
            let reserva = reservations::cancel(&state.api, id).await?;
            Ok(format!("Reservation {} is now {:?}", reserva.id, reserva.estado))
        }
        Command::Availability { area, date } => {
            guard(state, Route::Reservations).await?;
            let disponibilidad = reservations::availability(&state.api, area, &date).await?;
            let mut out = format!("{} on {}", disponibilidad.area_descripcion, disponibilidad.fecha);
            for slot in &disponibilidad.horarios_disponibles {
                out.push_str(&format!(
                    "\n  {}-{}  {}",
                    slot.hora_ini,
                    slot.hora_fin,
                    if slot.disponible { "free" } else { "taken" }
                ));
            }
            Ok(out)
        }
        Command::Statement { month } => {
            guard(state, Route::AccountStatement).await?;
            let estado = billing::account_statement(&state.api, &month).await?;
            let mut out = format!("Statement {} ({})", estado.mes, estado.propiedades.join(", "));
            for cargo in estado.charges_newest_first() {
                out.push_str(&format!(
                    "\n  {:<10} {:<30} {:>10.2}",
                    cargo.fecha.as_deref().unwrap_or("-"),
                    cargo.descripcion,
                    cargo.monto
                ));
            }
            out.push_str(&format!(
                "\ncharges {}  payments {}  balance {}",
                estado.totales.cargos, estado.totales.pagos, estado.totales.saldo
            ));
            if !estado.mensaje.is_empty() {
                out.push_str(&format!("\n{}", estado.mensaje));
            }
            Ok(out)
        }
        Command::Receipt { id, out } => {
            guard(state, Route::AccountStatement).await?;
            let receipt = billing::download_receipt(&state.api, id).await?;
            let path = receipt.save_in(&out)?;
            Ok(format!("Saved {}", path.display()))
        }
        Command::Face(face) => {
            guard(state, Route::AiDetection).await?;
            run_face(state, face).await
        }
        Command::Plate(PlateCommand::Detect {
            image,
            camera,
            ai,
            exit,
        }) => {
            guard(state, Route::AiDetection).await?;
            let image = ImageUpload::from_path(&image)?;
            if ai {
                let access = if exit { AccessType::Salida } else { AccessType::Entrada };
                pretty(&state.ai.detect_plate(image, camera.as_deref(), access).await?)
            } else {
                pretty(&detection::detect_plate(&state.api, image, camera.as_deref()).await?)
            }
        }
        Command::AiHealth => {
            let health = state.ai.health().await?;
            let mut out = format!("AI service at {}: {}", state.ai.root(), health.status);
            let mut services: Vec<_> = health.services.iter().collect();
            services.sort();
            for (name, up) in services {
                out.push_str(&format!("\n  {:<12} {}", name, if *up { "up" } else { "down" }));
            }
            Ok(out)
        }
    }
}

async fn run_face(state: &AppState, command: FaceCommand) -> Result<String, CommandError> {
    match command {
        FaceCommand::Recognize { image, camera, ai } => {
            let image = ImageUpload::from_path(&image)?;
            if ai {
                pretty(&state.ai.recognize_face(image, camera.as_deref()).await?)
            } else {
                pretty(&detection::recognize_face(&state.api, image, camera.as_deref()).await?)
            }
        }
        FaceCommand::Enroll { image, user, ai } => {
            let image = ImageUpload::from_path(&image)?;
            if ai {
                pretty(&state.ai.register_face(image, user).await?)
            } else {
                pretty(&detection::enroll_face_profile(&state.api, image, user).await?)
            }
        }
    }
}

async fn guard(state: &AppState, route: Route) -> Result<(), CommandError> {
    match state.enter(route).await {
        Some(_) => Ok(()),
        None => Err(CommandError::LoginRequired(route.path())),
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, CommandError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn read_password() -> Result<String, CommandError> {
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
