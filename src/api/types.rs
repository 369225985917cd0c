//! Request and response types for the condominium backend API.
//!
//! Field names follow the backend's snake_case Spanish schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role summary embedded in a user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
}

/// User profile as returned by `/auth/user/` and at login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub codigo: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub correo: String,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub telefono: Option<Value>,
    #[serde(default)]
    pub estado: Option<Value>,
    #[serde(default)]
    pub idrol: Option<i64>,
    #[serde(default)]
    pub rol: Option<RoleSummary>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }

    pub fn role_name(&self) -> Option<&str> {
        self.rol.as_ref().and_then(|r| r.descripcion.as_deref())
    }
}

/// Login request body sent to POST /auth/login/.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response from POST /auth/login/.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// Registration body sent to POST /auth/register/.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub contrasena: String,
    pub sexo: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// User record from /usuarios/.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    pub codigo: i64,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub apellido: Option<String>,
    #[serde(default)]
    pub correo: Option<String>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub telefono: Option<Value>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub idrol: Option<i64>,
    #[serde(default)]
    pub rol: Option<RoleSummary>,
}

/// Partial user body for POST/PATCH /usuarios/.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsuarioForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrasena: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sexo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idrol: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rol {
    pub id: i64,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub estado: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RolForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
}

/// Current owner/tenant attached to a property listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residente {
    pub codigo: i64,
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub tipo_rol: String,
    pub fecha_ini: String,
    #[serde(default)]
    pub fecha_fin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propiedad {
    pub codigo: i64,
    pub tamano_m2: f64,
    pub nro_casa: i64,
    pub piso: i64,
    pub descripcion: String,
    #[serde(default)]
    pub propietario_actual: Option<Residente>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PropiedadForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nro_casa: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub piso: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tamano_m2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

/// Links a resident to a property (POST /pertenece/).
#[derive(Debug, Clone, Serialize)]
pub struct PerteneceForm {
    pub codigo_usuario: i64,
    pub codigo_propiedad: i64,
    pub fecha_ini: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_fin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pago {
    pub id: i64,
    pub tipo: String,
    pub descripcion: String,
    pub monto: f64,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PagoForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multa {
    pub id: i64,
    pub descripcion: String,
    pub monto: f64,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MultaForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaEstado {
    Activo,
    Inactivo,
    Mantenimiento,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaComun {
    pub id: i64,
    pub descripcion: String,
    pub costo: f64,
    pub capacidad_max: i64,
    pub estado: AreaEstado,
    #[serde(default)]
    pub fecha_creacion: Option<String>,
    #[serde(default)]
    pub fecha_modificacion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaComunForm {
    pub descripcion: String,
    pub costo: f64,
    pub capacidad_max: i64,
    pub estado: AreaEstado,
}

/// Opening hours of a common area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horario {
    pub id: i64,
    pub hora_ini: String,
    pub hora_fin: String,
    pub id_area_c: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HorarioForm {
    pub id_area_c: i64,
    pub hora_ini: String,
    pub hora_fin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsuarioRef {
    pub codigo: i64,
    pub nombre: String,
    pub apellido: String,
}

/// Bulletin ("comunicado") as listed by /comunicados/.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comunicado {
    pub id: i64,
    pub tipo: String,
    pub fecha: String,
    pub hora: String,
    pub titulo: String,
    pub contenido: String,
    #[serde(default)]
    pub url: Option<String>,
    pub estado: String,
    pub codigo_usuario: i64,
    #[serde(default)]
    pub usuario: Option<UsuarioRef>,
}

/// Audience of a bulletin: a named group or an explicit list of user ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destinatarios {
    Grupo(Audiencia),
    Usuarios(Vec<i64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audiencia {
    Todos,
    Copropietarios,
    Inquilinos,
    Administradores,
    Usuarios,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prioridad {
    Baja,
    Media,
    Alta,
    Urgente,
    Normal,
    Importante,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComunicadoPayload {
    pub tipo: String,
    pub fecha: String,
    pub hora: String,
    pub titulo: String,
    pub contenido: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub destinatarios: Destinatarios,
    pub prioridad: Prioridad,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuario_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_publicacion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hora_publicacion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservaEstado {
    Confirmada,
    Cancelada,
    Finalizada,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRef {
    pub id: i64,
    pub descripcion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reserva {
    pub id: i64,
    #[serde(default)]
    pub codigo_usuario: Option<i64>,
    #[serde(default)]
    pub id_area_c: Option<i64>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub estado: Option<ReservaEstado>,
    #[serde(default)]
    pub usuario: Option<UsuarioRef>,
    #[serde(default)]
    pub area: Option<AreaRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservaForm {
    pub codigo_usuario: i64,
    pub id_area_c: i64,
    pub fecha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hora_ini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hora_fin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FranjaHoraria {
    pub hora_ini: String,
    pub hora_fin: String,
    pub disponible: bool,
}

/// Availability of a common area on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disponibilidad {
    pub fecha: String,
    pub area_id: i64,
    pub area_descripcion: String,
    #[serde(default)]
    pub horarios_disponibles: Vec<FranjaHoraria>,
    #[serde(default)]
    pub reservas_existentes: Vec<Reserva>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidacionDisponibilidad {
    pub disponible: bool,
    #[serde(default)]
    pub mensaje: Option<String>,
}

/// Incident case (/casos/).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caso {
    pub id: i64,
    pub titulo: String,
    pub descripcion: String,
    pub tipo: String,
    #[serde(default)]
    pub prioridad: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CasoForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioridad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
}

/// Detection record stored by the backend (face or plate).
///
/// The backend's payload varies per detector; the scoring fields are lifted out
/// and everything else is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "confianza")]
    pub confidence: Option<f64>,
    #[serde(default, alias = "es_residente")]
    pub is_resident: Option<bool>,
    #[serde(default, alias = "autorizado")]
    pub is_authorized: Option<bool>,
    #[serde(default, alias = "placa")]
    pub plate: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_response_parses_backend_user() {
        let body = json!({
            "token": "abc",
            "user": {
                "codigo": 3,
                "nombre": "Maria",
                "apellido": "Lopez",
                "correo": "maria@condo.bo",
                "sexo": "F",
                "telefono": 70012345,
                "estado": "activo",
                "idrol": 1,
                "rol": {"id": 1, "descripcion": "Administrador", "tipo": "admin"}
            }
        });
        let resp: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.user.full_name(), "Maria Lopez");
        assert_eq!(resp.user.role_name(), Some("Administrador"));
    }

    #[test]
    fn destinatarios_accepts_group_or_ids() {
        let group: Destinatarios = serde_json::from_value(json!("copropietarios")).unwrap();
        assert_eq!(group, Destinatarios::Grupo(Audiencia::Copropietarios));
        let ids: Destinatarios = serde_json::from_value(json!([4, 9])).unwrap();
        assert_eq!(ids, Destinatarios::Usuarios(vec![4, 9]));
    }

    #[test]
    fn register_omits_missing_phone() {
        let body = serde_json::to_value(RegisterRequest {
            nombre: "Eva".into(),
            apellido: "Suarez".into(),
            correo: "eva@condo.bo".into(),
            contrasena: "secreta".into(),
            sexo: Sex::Female,
            telefono: None,
        })
        .unwrap();
        assert_eq!(body["sexo"], "F");
        assert!(body.get("telefono").is_none());
    }

    #[test]
    fn detection_record_lifts_scores() {
        let rec: DetectionRecord = serde_json::from_value(json!({
            "id": 12,
            "confianza": 0.93,
            "es_residente": true,
            "ubicacion_camara": "Porteria"
        }))
        .unwrap();
        assert_eq!(rec.confidence, Some(0.93));
        assert_eq!(rec.is_resident, Some(true));
        assert_eq!(rec.extra["ubicacion_camara"], "Porteria");
    }
}
