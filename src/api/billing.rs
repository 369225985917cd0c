//! Account statements and payment receipts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;
use super::query::Query;

const STATEMENT_PATH: &str = "/estado-cuenta/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeOrigin {
    Pago,
    Multa,
}

/// A charge billed in the statement month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub tipo: String,
    pub descripcion: String,
    pub monto: f64,
    pub origen: ChargeOrigin,
    #[serde(default)]
    pub fecha: Option<String>,
}

/// A payment made in the statement month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagoRealizado {
    pub id: i64,
    pub concepto: String,
    pub monto: f64,
    pub fecha: String,
    pub hora: String,
    pub tipo_pago: String,
    pub estado: String,
}

/// Totals are preformatted decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totales {
    pub cargos: String,
    pub pagos: String,
    pub saldo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstadoCuenta {
    pub mes: String,
    #[serde(default)]
    pub propiedades: Vec<String>,
    #[serde(default)]
    pub cargos: Vec<Cargo>,
    #[serde(default)]
    pub pagos: Vec<PagoRealizado>,
    #[serde(default)]
    pub totales: Totales,
    #[serde(default)]
    pub mensaje: String,
}

impl EstadoCuenta {
    /// Charges sorted by date, newest first; undated charges last.
    pub fn charges_newest_first(&self) -> Vec<&Cargo> {
        let mut cargos: Vec<&Cargo> = self.cargos.iter().collect();
        cargos.sort_by(|a, b| {
            let da = a.fecha.as_deref().unwrap_or("");
            let db = b.fecha.as_deref().unwrap_or("");
            db.cmp(da)
        });
        cargos
    }
}

/// A downloaded payment receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Receipt {
    /// Write the receipt into `dir` under its own file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ApiError> {
        fs::create_dir_all(dir)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", dir.display(), e)))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// Statement for `month` in `YYYY-MM` form.
pub async fn account_statement(api: &ApiClient, month: &str) -> Result<EstadoCuenta, ApiError> {
    if !is_month(month) {
        return Err(ApiError::InvalidRequest(format!(
            "month must be YYYY-MM, got {:?}",
            month
        )));
    }
    api.get(&Query::new().param("mes", month).apply(STATEMENT_PATH))
        .await
}

/// Download the PDF receipt of payment `id`.
pub async fn download_receipt(api: &ApiClient, id: i64) -> Result<Receipt, ApiError> {
    let bytes = api.get_bytes(&format!("/comprobante/{}/", id)).await?;
    log::debug!("Receipt {} downloaded ({} bytes)", id, bytes.len());
    Ok(Receipt {
        file_name: format!("comprobante_{}.pdf", id),
        bytes,
    })
}

fn is_month(value: &str) -> bool {
    match value.split_once('-') {
        Some((year, month)) => {
            year.len() == 4
                && year.bytes().all(|b| b.is_ascii_digit())
                && matches!(month.parse::<u8>(), Ok(1..=12))
                && month.len() == 2
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

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

    #[test]
    fn month_format() {
        assert!(is_month("2025-03"));
        assert!(!is_month("2025-3"));
        assert!(!is_month("2025-13"));
        assert!(!is_month("25-03"));
        assert!(!is_month("marzo"));
    }

    #[tokio::test]
    async fn statement_rejects_bad_month_without_calling_server() {
        let server = mockito::Server::new_async().await;
        let err = account_statement(&client(&server), "03/2025").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn statement_sorts_charges() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/estado-cuenta/?mes=2025-03")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "mes": "2025-03",
                    "propiedades": ["Casa 12"],
                    "cargos": [
                        {"tipo": "expensa", "descripcion": "Marzo", "monto": 350.0, "origen": "pago", "fecha": "2025-03-01"},
                        {"tipo": "multa", "descripcion": "Ruido", "monto": 50.0, "origen": "multa", "fecha": "2025-03-20"},
                        {"tipo": "otro", "descripcion": "Ajuste", "monto": 5.0, "origen": "pago", "fecha": null}
                    ],
                    "pagos": [],
                    "totales": {"cargos": "405.00", "pagos": "0.00", "saldo": "405.00"},
                    "mensaje": "Saldo pendiente"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let estado = account_statement(&client(&server), "2025-03").await.unwrap();
        let order: Vec<&str> = estado
            .charges_newest_first()
            .iter()
            .map(|c| c.descripcion.as_str())
            .collect();
        assert_eq!(order, vec!["Ruido", "Marzo", "Ajuste"]);
        assert_eq!(estado.totales.saldo, "405.00");
    }

    #[tokio::test]
    async fn receipt_is_saved_under_its_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/comprobante/42/")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 fake")
            .create_async()
            .await;

        let receipt = download_receipt(&client(&server), 42).await.unwrap();
        assert_eq!(receipt.file_name, "comprobante_42.pdf");

        let dir = tempfile::tempdir().unwrap();
        let path = receipt.save_in(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("comprobante_42.pdf"));
        assert_eq!(fs::read(path).unwrap(), b"%PDF-1.4 fake");
    }
}
