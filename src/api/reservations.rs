//! Reservation actions beyond plain CRUD.

use serde_json::json;

use super::client::ApiClient;
use super::error::ApiError;
use super::query::Query;
use super::resources::ResourceKind;
use super::types::{Disponibilidad, Reserva, ReservaEstado, ReservaForm, ValidacionDisponibilidad};

const AVAILABILITY_PATH: &str = "/reserva/disponibilidad/";
const VALIDATE_PATH: &str = "/reserva/validar-disponibilidad/";

/// Cancel a reservation. The record is kept with `estado = cancelada`.
pub async fn cancel(api: &ApiClient, id: i64) -> Result<Reserva, ApiError> {
    let reserva: Reserva = api
        .patch(
            &ResourceKind::Reserva.item_path(id),
            &json!({ "estado": ReservaEstado::Cancelada }),
        )
        .await?;
    log::info!("Reservation {} cancelled", id);
    Ok(reserva)
}

/// Free and taken slots of a common area on `date` (`YYYY-MM-DD`).
pub async fn availability(api: &ApiClient, area_id: i64, date: &str) -> Result<Disponibilidad, ApiError> {
    let query = Query::new().param("area_id", area_id).param("fecha", date);
    api.get(&query.apply(AVAILABILITY_PATH)).await
}

/// Ask the backend whether `form` could be booked, without booking it.
pub async fn validate(api: &ApiClient, form: &ReservaForm) -> Result<ValidacionDisponibilidad, ApiError> {
    api.post(VALIDATE_PATH, form).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockito::Matcher;

    use super::*;
    use crate::api::retry::RetryPolicy;
    use crate::session::{Credential, MemoryStore, Session};

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        let store = MemoryStore::with_credential(Credential::new("k", Default::default()));
        ApiClient::new(
            &format!("{}/api", server.url()),
            Arc::new(Session::restore(Box::new(store))),
        )
        .with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn cancel_patches_state() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/reserva/12/")
            .match_body(Matcher::Json(json!({"estado": "cancelada"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 12, "estado": "cancelada"}"#)
            .create_async()
            .await;

        let reserva = cancel(&client(&server), 12).await.unwrap();
        assert_eq!(reserva.estado, Some(ReservaEstado::Cancelada));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn availability_sends_area_and_date() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/reserva/disponibilidad/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("area_id".into(), "3".into()),
                Matcher::UrlEncoded("fecha".into(), "2025-03-14".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "fecha": "2025-03-14",
                    "area_id": 3,
                    "area_descripcion": "Piscina",
                    "horarios_disponibles": [
                        {"hora_ini": "08:00", "hora_fin": "10:00", "disponible": true},
                        {"hora_ini": "10:00", "hora_fin": "12:00", "disponible": false}
                    ],
                    "reservas_existentes": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let disponibilidad = availability(&client(&server), 3, "2025-03-14").await.unwrap();
        assert_eq!(disponibilidad.area_descripcion, "Piscina");
        assert_eq!(
            disponibilidad
                .horarios_disponibles
                .iter()
                .filter(|f| f.disponible)
                .count(),
            1
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn validate_reports_conflict_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/reserva/validar-disponibilidad/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"disponible": false, "mensaje": "Horario ocupado"}"#)
            .create_async()
            .await;

        let form = ReservaForm {
            codigo_usuario: 4,
            id_area_c: 3,
            fecha: "2025-03-14".into(),
            hora_ini: Some("10:00".into()),
            hora_fin: Some("12:00".into()),
        };
        let result = validate(&client(&server), &form).await.unwrap();
        assert!(!result.disponible);
        assert_eq!(result.mensaje.as_deref(), Some("Horario ocupado"));
    }
}
