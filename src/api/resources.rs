//! Typed access to the backend's REST collections.
//!
//! Every collection follows the same shape: `/<name>/` for list and create,
//! `/<name>/<id>/` for read, partial update, replace and delete.

use std::fmt;
use std::marker::PhantomData;

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::client::ApiClient;
use super::error::ApiError;
use super::query::Query;
use super::response::Listing;
use super::types::{
    AreaComun, Caso, Comunicado, Horario, Multa, Pago, Propiedad, Reserva, Rol, Usuario,
};

/// The backend's REST collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ResourceKind {
    Usuarios,
    Roles,
    Propiedades,
    Pertenece,
    Pagos,
    Multas,
    #[value(alias = "areas")]
    AreasComunes,
    Horarios,
    Comunicados,
    #[value(alias = "reservas")]
    Reserva,
    Casos,
    Vehiculos,
    Notificaciones,
    Tareas,
    Bitacora,
    ReporteSeguridad,
    ReconocimientoFacial,
    PerfilFacial,
    DeteccionPlaca,
}

impl ResourceKind {
    /// Collection path relative to the API prefix, with trailing slash.
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Usuarios => "/usuarios/",
            ResourceKind::Roles => "/roles/",
            ResourceKind::Propiedades => "/propiedades/",
            ResourceKind::Pertenece => "/pertenece/",
            ResourceKind::Pagos => "/pagos/",
            ResourceKind::Multas => "/multas/",
            ResourceKind::AreasComunes => "/areascomunes/",
            ResourceKind::Horarios => "/horarios/",
            ResourceKind::Comunicados => "/comunicados/",
            ResourceKind::Reserva => "/reserva/",
            ResourceKind::Casos => "/casos/",
            ResourceKind::Vehiculos => "/vehiculos/",
            ResourceKind::Notificaciones => "/notificaciones/",
            ResourceKind::Tareas => "/tareas/",
            ResourceKind::Bitacora => "/bitacora/",
            ResourceKind::ReporteSeguridad => "/reporteseguridad/",
            ResourceKind::ReconocimientoFacial => "/reconocimientofacial/",
            ResourceKind::PerfilFacial => "/perfilfacial/",
            ResourceKind::DeteccionPlaca => "/deteccionplaca/",
        }
    }

    /// Path of a single item.
    pub fn item_path(self, id: impl fmt::Display) -> String {
        format!("{}{}/", self.path(), id)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_matches('/'))
    }
}

/// A collection bound to a client and an item type.
///
/// `T` is the item as read; write bodies can be any serializable form.
pub struct Resource<'a, T> {
    api: &'a ApiClient,
    kind: ResourceKind,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Resource<'a, T> {
    pub fn new(api: &'a ApiClient, kind: ResourceKind) -> Self {
        Self {
            api,
            kind,
            _item: PhantomData,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// List the collection. Paginated responses are returned as pages, bare
    /// arrays as-is.
    pub async fn list(&self, query: &Query) -> Result<Listing<T>, ApiError> {
        self.api.get(&query.apply(self.kind.path())).await
    }

    pub async fn get(&self, id: impl fmt::Display) -> Result<T, ApiError> {
        self.api.get(&self.kind.item_path(id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<T, ApiError> {
        self.api.post(self.kind.path(), body).await
    }

    /// Partial update (PATCH).
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: impl fmt::Display,
        body: &B,
    ) -> Result<T, ApiError> {
        self.api.patch(&self.kind.item_path(id), body).await
    }

    /// Full replacement (PUT).
    pub async fn replace<B: Serialize + ?Sized>(
        &self,
        id: impl fmt::Display,
        body: &B,
    ) -> Result<T, ApiError> {
        self.api.put(&self.kind.item_path(id), body).await
    }

    pub async fn delete(&self, id: impl fmt::Display) -> Result<(), ApiError> {
        self.api.delete(&self.kind.item_path(id)).await
    }
}

impl ApiClient {
    /// Untyped handle on any collection.
    pub fn resource(&self, kind: ResourceKind) -> Resource<'_, Value> {
        Resource::new(self, kind)
    }

    pub fn usuarios(&self) -> Resource<'_, Usuario> {
        Resource::new(self, ResourceKind::Usuarios)
    }

    pub fn roles(&self) -> Resource<'_, Rol> {
        Resource::new(self, ResourceKind::Roles)
    }

    pub fn propiedades(&self) -> Resource<'_, Propiedad> {
        Resource::new(self, ResourceKind::Propiedades)
    }

    pub fn pertenece(&self) -> Resource<'_, Value> {
        Resource::new(self, ResourceKind::Pertenece)
    }

    pub fn pagos(&self) -> Resource<'_, Pago> {
        Resource::new(self, ResourceKind::Pagos)
    }

    pub fn multas(&self) -> Resource<'_, Multa> {
        Resource::new(self, ResourceKind::Multas)
    }

    pub fn areas_comunes(&self) -> Resource<'_, AreaComun> {
        Resource::new(self, ResourceKind::AreasComunes)
    }

    pub fn horarios(&self) -> Resource<'_, Horario> {
        Resource::new(self, ResourceKind::Horarios)
    }

    pub fn comunicados(&self) -> Resource<'_, Comunicado> {
        Resource::new(self, ResourceKind::Comunicados)
    }

    pub fn reservas(&self) -> Resource<'_, Reserva> {
        Resource::new(self, ResourceKind::Reserva)
    }

    pub fn casos(&self) -> Resource<'_, Caso> {
        Resource::new(self, ResourceKind::Casos)
    }

    // ── Filtered lists ───────────────────────────────────────────────────

    /// Users with `estado=activo`.
    pub async fn active_users(&self) -> Result<Listing<Usuario>, ApiError> {
        self.usuarios()
            .list(&Query::new().param("estado", "activo"))
            .await
    }

    /// Users holding any of the given role ids (`idrol=1&idrol=2`).
    pub async fn users_by_roles(&self, role_ids: &[i64]) -> Result<Listing<Usuario>, ApiError> {
        self.usuarios()
            .list(&Query::new().repeated("idrol", role_ids))
            .await
    }

    pub async fn active_roles(&self) -> Result<Listing<Rol>, ApiError> {
        self.roles()
            .list(&Query::new().param("estado", "activo"))
            .await
    }

    /// Opening hours of one common area.
    pub async fn schedules_for_area(&self, area_id: i64) -> Result<Listing<Horario>, ApiError> {
        self.horarios()
            .list(&Query::new().param("id_area_c", area_id))
            .await
    }

    /// Residency links, optionally narrowed to a property and/or a user.
    pub async fn residency_links(
        &self,
        property: Option<i64>,
        user: Option<i64>,
    ) -> Result<Listing<Value>, ApiError> {
        let query = Query::new()
            .opt("codigo_propiedad", property)
            .opt("codigo_usuario", user);
        self.pertenece().list(&query).await
    }

    /// Close a residency link by setting its end date (`YYYY-MM-DD`).
    pub async fn end_residency(&self, link_id: i64, end_date: &str) -> Result<Value, ApiError> {
        self.pertenece()
            .update(link_id, &json!({ "fecha_fin": end_date }))
            .await
    }
}
