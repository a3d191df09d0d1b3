// src/services/material_service.rs

use serde_json::{Map, Value};
use sqlx::{Connection, PgConnection};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        calculations::line_item_totals,
        csv::{self, CsvWriter},
        error::AppError,
        pagination::{PaginatedResponse, PaginationParams},
        schema::parse_record,
    },
    db::{material_repo::NewMaterial, AuditRepository, MaterialRepository, ProjectRepository},
    models::{
        audit::{changes, Actor, AuditAction},
        material::{
            CreateMaterialPayload, ImportRowError, MaterialFilter, MaterialImportResult, MaterialImportRow,
            MaterialLineItem, MaterialSummary, UpdateMaterialPayload, CSV_REQUIRED_HEADERS,
        },
    },
};

const ENTITY: &str = "MaterialLineItem";

#[derive(Clone)]
pub struct MaterialService {
    material_repo: MaterialRepository,
    project_repo: ProjectRepository,
    audit_repo: AuditRepository,
}

impl MaterialService {
    pub fn new(material_repo: MaterialRepository, project_repo: ProjectRepository, audit_repo: AuditRepository) -> Self {
        Self { material_repo, project_repo, audit_repo }
    }

    async fn ensure_project(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<(), AppError> {
        self.project_repo
            .find_by_id(conn, tenant_id, project_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::ResourceNotFound("Project".into()))
    }

    async fn require_material(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<MaterialLineItem, AppError> {
        self.material_repo
            .find_by_id(conn, tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Material".into()))
    }

    // Totais sempre recalculados aqui; o que o cliente mandar é ignorado
    async fn insert_payload(&self, conn: &mut PgConnection, p: &CreateMaterialPayload) -> Result<MaterialLineItem, AppError> {
        let (total_qty, total_cost) = line_item_totals(p.quantity, p.wastage_factor, p.unit_cost)?;
        let row = NewMaterial {
            project_id: p.project_id,
            category: p.category,
            description: p.description.trim(),
            quantity: p.quantity,
            unit: p.unit,
            wastage_factor: p.wastage_factor,
            total_qty,
            unit_cost: p.unit_cost,
            total_cost,
            notes: p.notes.as_deref(),
        };
        self.material_repo.insert(conn, &row).await
    }

    pub async fn create(&self, conn: &mut PgConnection, actor: Actor, payload: &CreateMaterialPayload) -> Result<MaterialLineItem, AppError> {
        // 1. Inicia a transação
        let mut tx = conn.begin().await?;

        // 2. Projeto precisa ser do tenant
        self.ensure_project(&mut *tx, actor.tenant_id, payload.project_id).await?;

        // 3. Insere com totais do servidor
        let item = self.insert_payload(&mut *tx, payload).await?;

        // 4. Auditoria
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Create, ENTITY, item.id, changes::<(), _>(None, Some(&item)))
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn get(&self, conn: &mut PgConnection, tenant_id: Uuid, id: Uuid) -> Result<MaterialLineItem, AppError> {
        self.require_material(conn, tenant_id, id).await
    }

    pub async fn list(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        filter: &MaterialFilter,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<MaterialLineItem>, AppError> {
        let items = self
            .material_repo
            .list(&mut *conn, tenant_id, filter.project_id, filter.category, params.limit(), params.offset())
            .await?;
        let total = self
            .material_repo
            .count(&mut *conn, tenant_id, filter.project_id, filter.category)
            .await?;
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        id: Uuid,
        payload: UpdateMaterialPayload,
    ) -> Result<MaterialLineItem, AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_material(&mut *tx, actor.tenant_id, id).await?;
        let merged = apply_update(before.clone(), payload)?;
        merged.validate()?;

        let after = self.material_repo.update(&mut *tx, &merged).await?;
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Update, ENTITY, id, changes(Some(&before), Some(&after)))
            .await?;

        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, conn: &mut PgConnection, actor: Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = conn.begin().await?;

        let before = self.require_material(&mut *tx, actor.tenant_id, id).await?;
        if !self.material_repo.soft_delete(&mut *tx, id).await? {
            return Err(AppError::ResourceNotFound("Material".into()));
        }
        self.audit_repo
            .record(&mut *tx, actor, AuditAction::Delete, ENTITY, id, changes::<_, ()>(Some(&before), None))
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn summary(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<MaterialSummary, AppError> {
        self.ensure_project(&mut *conn, tenant_id, project_id).await?;
        let by_category = self.material_repo.totals_by_category(conn, project_id).await?;
        Ok(MaterialSummary {
            project_id,
            item_count: by_category.iter().map(|c| c.item_count).sum(),
            grand_total: by_category.iter().map(|c| c.total_cost).sum(),
            by_category,
        })
    }

    // ---
    // Importação / exportação
    // ---

    /// Cada linha é validada sozinha; as válidas entram numa transação só.
    pub async fn import_rows(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        project_id: Uuid,
        rows: Vec<Value>,
    ) -> Result<MaterialImportResult, AppError> {
        let (valid, errors) = validate_rows(rows);

        // 1. Inicia a transação
        let mut tx = conn.begin().await?;
        self.ensure_project(&mut *tx, actor.tenant_id, project_id).await?;

        // 2. Insere as válidas
        let mut created_ids = Vec::with_capacity(valid.len());
        for row in valid {
            let item = self.insert_payload(&mut *tx, &row.into_payload(project_id)).await?;
            created_ids.push(item.id);
        }

        // 3. Uma entrada de auditoria pela importação
        if !created_ids.is_empty() {
            let audit = serde_json::json!({ "bulkImportCount": created_ids.len(), "createdIds": created_ids });
            self.audit_repo
                .record(&mut *tx, actor, AuditAction::Create, ENTITY, project_id, audit)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            project_id = %project_id,
            imported = created_ids.len(),
            rejected = errors.len(),
            "Importação de materiais concluída"
        );

        Ok(MaterialImportResult {
            imported_count: created_ids.len(),
            error_count: errors.len(),
            created_ids,
            errors,
        })
    }

    pub async fn import_csv(
        &self,
        conn: &mut PgConnection,
        actor: Actor,
        project_id: Uuid,
        text: &str,
    ) -> Result<MaterialImportResult, AppError> {
        let rows = csv_rows(text)?;
        self.import_rows(conn, actor, project_id, rows).await
    }

    pub async fn export_csv(&self, conn: &mut PgConnection, tenant_id: Uuid, project_id: Uuid) -> Result<String, AppError> {
        self.ensure_project(&mut *conn, tenant_id, project_id).await?;
        let items = self.material_repo.list_for_project(conn, project_id).await?;
        Ok(materials_to_csv(&items))
    }
}

fn apply_update(mut m: MaterialLineItem, p: UpdateMaterialPayload) -> Result<MaterialLineItem, AppError> {
    if let Some(v) = p.category { m.category = v; }
    if let Some(v) = p.description { m.description = v; }
    if let Some(v) = p.quantity { m.quantity = v; }
    if let Some(v) = p.unit { m.unit = v; }
    if let Some(v) = p.wastage_factor { m.wastage_factor = v; }
    if let Some(v) = p.unit_cost { m.unit_cost = v; }
    if let Some(v) = p.notes { m.notes = Some(v); }

    let (total_qty, total_cost) = line_item_totals(m.quantity, m.wastage_factor, m.unit_cost)?;
    m.total_qty = total_qty;
    m.total_cost = total_cost;
    Ok(m)
}

/// Separa linhas válidas das inválidas (numeradas a partir de 1).
pub fn validate_rows(rows: Vec<Value>) -> (Vec<MaterialImportRow>, Vec<ImportRowError>) {
    let mut valid = Vec::new();
    let mut errors = Vec::new();
    for (idx, raw) in rows.into_iter().enumerate() {
        match parse_record::<MaterialImportRow>(raw) {
            Ok(row) => valid.push(row),
            Err(e) => {
                let api = e.to_api_error();
                let details = api
                    .details
                    .unwrap_or_else(|| serde_json::json!({ "__record": [api.message] }));
                errors.push(ImportRowError { row: idx + 1, errors: details });
            }
        }
    }
    (valid, errors)
}

/// CSV -> objetos JSON crus. Falta de coluna obrigatória rejeita o arquivo inteiro.
pub fn csv_rows(text: &str) -> Result<Vec<Value>, AppError> {
    let (headers, records) = csv::parse_with_headers(text)?;

    let missing: Vec<&str> = CSV_REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|c| c == h))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required CSV columns: {}",
            missing.join(", ")
        )));
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let object: Map<String, Value> = record
                .into_iter()
                .map(|(k, v)| {
                    let v = csv_cell(&k, v);
                    (k, v)
                })
                .collect();
            Value::Object(object)
        })
        .collect())
}

// Planilhas chegam com "framing", "ea"...; células já vêm aparadas
fn csv_cell(header: &str, value: String) -> Value {
    match header {
        "category" | "unit" => Value::String(value.to_uppercase()),
        _ => Value::String(value),
    }
}

pub fn materials_to_csv(items: &[MaterialLineItem]) -> String {
    let mut w = CsvWriter::new();
    w.row([
        "category",
        "description",
        "quantity",
        "unit",
        "wastage_factor",
        "unit_cost",
        "total_qty",
        "total_cost",
        "notes",
    ]);
    for m in items {
        w.row([
            m.category.as_str().to_string(),
            m.description.clone(),
            m.quantity.to_string(),
            m.unit.as_str().to_string(),
            m.wastage_factor.to_string(),
            m.unit_cost.to_string(),
            m.total_qty.to_string(),
            m.total_cost.to_string(),
            m.notes.clone().unwrap_or_default(),
        ]);
    }
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::material::{MaterialCategory, UnitOfMeasure};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item() -> MaterialLineItem {
        let now = Utc::now();
        MaterialLineItem {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            category: MaterialCategory::Framing,
            description: "2x4 Lumber, 8ft".into(),
            quantity: dec("500"),
            unit: UnitOfMeasure::Ea,
            wastage_factor: dec("0.1"),
            total_qty: dec("550"),
            unit_cost: dec("8.50"),
            total_cost: dec("4675.00"),
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn update_recomputes_totals() {
        let patch = UpdateMaterialPayload { quantity: Some(dec("100")), ..Default::default() };
        let m = apply_update(item(), patch).unwrap();
        assert_eq!(m.total_qty, dec("110"));
        assert_eq!(m.total_cost, dec("935.00"));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn invalid_rows_are_reported_with_their_position() {
        let rows = vec![
            json!({ "category": "FRAMING", "description": "Studs", "quantity": 10, "unit": "EA", "unitCost": 4 }),
            json!({ "category": "FRAMING", "description": "", "quantity": -1, "unit": "EA", "unitCost": 4 }),
            json!({ "category": "NOPE", "description": "x", "quantity": 1, "unit": "EA", "unitCost": 1 }),
        ];
        let (valid, errors) = validate_rows(rows);
        assert_eq!(valid.len(), 1);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].row, 2);
        assert!(errors[0].errors.get("quantity").is_some());
        assert!(errors[0].errors.get("description").is_some());
        assert_eq!(errors[1].row, 3);
        assert!(errors[1].errors.get("__record").is_some());
    }

    #[test]
    fn csv_rows_require_the_mandatory_columns() {
        let err = csv_rows("category,description,quantity\nFRAMING,Studs,10\n").unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.contains("unit"));
                assert!(msg.contains("unit_cost"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn csv_rows_feed_the_same_validation() {
        let text = "category,description,quantity,unit,wastage_factor,unit_cost,notes\n\
                    FRAMING,2x4 Lumber - 8ft,500,EA,0.10,8.50,Premium grade\n\
                    ROOFING,Shingles,abc,SQ,0.15,95.00,\n";
        let (valid, errors) = validate_rows(csv_rows(text).unwrap());
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].notes.as_deref(), Some("Premium grade"));
        let (qty, cost) = line_item_totals(valid[0].quantity, valid[0].wastage_factor, valid[0].unit_cost).unwrap();
        assert_eq!((qty, cost), (dec("550"), dec("4675.00")));
        assert_eq!(errors[0].row, 2);
    }

    #[test]
    fn csv_cells_are_normalized_before_validation() {
        let text = "category,description,quantity,unit,wastage_factor,unit_cost,notes\n\
                    framing,Studs,10, ea ,,4.00,\n\
                    Roofing,Shingles,30,sq,0.15,95.00,  \n";
        let (valid, errors) = validate_rows(csv_rows(text).unwrap());
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(valid[0].category, MaterialCategory::Framing);
        assert_eq!(valid[0].unit, UnitOfMeasure::Ea);
        assert!(valid[0].wastage_factor.is_zero());
        assert_eq!(valid[0].notes, None);
        assert_eq!(valid[1].category, MaterialCategory::Roofing);
        assert_eq!(valid[1].unit, UnitOfMeasure::Sq);
        assert_eq!(valid[1].notes, None);
    }

    #[test]
    fn blank_json_notes_are_dropped_on_import() {
        let rows = vec![json!({
            "category": "OTHER", "description": "Dumpster", "quantity": 1,
            "unit": "EA", "unitCost": 450, "notes": "   "
        })];
        let (valid, _) = validate_rows(rows);
        let payload = valid[0].clone().into_payload(Uuid::new_v4());
        assert_eq!(payload.notes, None);
    }

    #[test]
    fn export_round_trips_through_import() {
        let text = materials_to_csv(&[item()]);
        assert!(text.starts_with("category,description,quantity,unit,wastage_factor,unit_cost"));
        assert!(text.contains("\"2x4 Lumber, 8ft\""));
        let (valid, errors) = validate_rows(csv_rows(&text).unwrap());
        assert!(errors.is_empty());
        assert_eq!(valid[0].description, "2x4 Lumber, 8ft");
        assert_eq!(valid[0].unit_cost, dec("8.50"));
    }
}
