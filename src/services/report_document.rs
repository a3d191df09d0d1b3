// src/services/report_document.rs
//
// Monta o conteúdo de um relatório (independente de formato) e
// renderiza em CSV ou PDF.

use std::path::Path;

use chrono::NaiveDate;
use genpdf::{elements, style, Element};
use rust_decimal::Decimal;

use crate::{
    common::{csv::CsvWriter, error::AppError},
    models::{
        file::ProjectFile,
        material::{CategoryTotal, MaterialLineItem},
        project::{BuildProject, Lot, ProjectFinancials},
        report::{ReportFormat, ReportType},
        schedule::ScheduleMilestone,
    },
    services::schedule_service::variance_report,
};

const FONT_FAMILY: &str = "Roboto";

/// Tudo que um relatório pode precisar, lido numa passada só.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub project: BuildProject,
    pub financials: ProjectFinancials,
    pub materials: Vec<MaterialLineItem>,
    pub categories: Vec<CategoryTotal>,
    pub milestones: Vec<ScheduleMilestone>,
    pub lots: Vec<Lot>,
    pub files: Vec<ProjectFile>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionOptions {
    pub include_materials: bool,
    pub include_schedule: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub facts: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}

// ---
// Conteúdo por tipo
// ---

/// Seções "núcleo" de cada tipo saem sempre; as flags só somam seções extras.
pub fn build_document(kind: ReportType, data: &ReportData, opts: SectionOptions) -> ReportDocument {
    let p = &data.project;
    let f = &data.financials;

    let mut facts = vec![
        ("Project".to_string(), p.title.clone()),
        ("Status".to_string(), p.status.as_str().to_string()),
    ];
    let mut sections = Vec::new();

    match kind {
        ReportType::Progress => {
            facts.push(("Average completion (%)".into(), money(f.avg_completion)));
            facts.push(("Baseline end".into(), opt_date(p.baseline_end_date)));
            sections.push(schedule_section(data));
            if opts.include_materials {
                sections.push(categories_section(&data.categories));
            }
        }
        ReportType::BudgetVsActual => {
            facts.push(("Budget".into(), opt_money(f.budget)));
            facts.push(("Materials cost".into(), money(f.materials_cost)));
            facts.push(("Variance".into(), opt_money(f.variance)));
            facts.push(("Variance (%)".into(), opt_money(f.variance_percent)));
            facts.push(("Earned value".into(), opt_money(f.earned_value)));
            facts.push(("Cost variance".into(), opt_money(f.cost_variance)));
            facts.push(("Cost per sq ft".into(), opt_money(f.cost_per_sq_ft)));
            sections.push(categories_section(&data.categories));
            if opts.include_materials {
                sections.push(materials_section(&data.materials));
            }
            if opts.include_schedule {
                sections.push(schedule_section(data));
            }
        }
        ReportType::TakeoffSummary => {
            facts.push(("Line items".into(), data.materials.len().to_string()));
            facts.push(("Materials cost".into(), money(f.materials_cost)));
            sections.push(materials_section(&data.materials));
            sections.push(categories_section(&data.categories));
            if opts.include_schedule {
                sections.push(schedule_section(data));
            }
        }
        ReportType::OmBinder => {
            facts.push(("Address".into(), address_line(p)));
            facts.push(("Home area (sq ft)".into(), opt_money(p.home_area_sq_ft)));
            facts.push(("Actual start".into(), opt_date(p.actual_start_date)));
            facts.push(("Actual end".into(), opt_date(p.actual_end_date)));
            sections.push(lots_section(&data.lots));
            sections.push(files_section(&data.files));
            if opts.include_materials {
                sections.push(materials_section(&data.materials));
            }
            if opts.include_schedule {
                sections.push(schedule_section(data));
            }
        }
    }

    ReportDocument {
        title: format!("{} - {}", kind.title(), p.title),
        facts,
        sections,
    }
}

fn schedule_section(data: &ReportData) -> Section {
    let report = variance_report(data.project.id, &data.milestones, data.today);
    let rows = data
        .milestones
        .iter()
        .zip(&report.variances)
        .map(|(m, v)| {
            vec![
                m.phase.as_str().to_string(),
                m.baseline_end_date.to_string(),
                v.actual_or_current_date.to_string(),
                v.variance_days.to_string(),
                money(m.percent_complete),
                if v.is_late { "YES".into() } else { "NO".into() },
            ]
        })
        .collect();
    Section {
        heading: "Schedule".into(),
        columns: cols(&["Phase", "Baseline End", "Actual/Current", "Variance (days)", "Complete (%)", "Late"]),
        rows,
    }
}

fn materials_section(items: &[MaterialLineItem]) -> Section {
    let rows = items
        .iter()
        .map(|m| {
            vec![
                m.category.as_str().to_string(),
                m.description.clone(),
                m.total_qty.to_string(),
                m.unit.as_str().to_string(),
                money(m.unit_cost),
                money(m.total_cost),
            ]
        })
        .collect();
    Section {
        heading: "Materials".into(),
        columns: cols(&["Category", "Description", "Total Qty", "Unit", "Unit Cost", "Total Cost"]),
        rows,
    }
}

fn categories_section(categories: &[CategoryTotal]) -> Section {
    let mut rows: Vec<Vec<String>> = categories
        .iter()
        .map(|c| vec![c.category.as_str().to_string(), c.item_count.to_string(), money(c.total_cost)])
        .collect();
    let items: i64 = categories.iter().map(|c| c.item_count).sum();
    let total: Decimal = categories.iter().map(|c| c.total_cost).sum();
    rows.push(vec!["TOTAL".into(), items.to_string(), money(total)]);
    Section {
        heading: "Cost by Category".into(),
        columns: cols(&["Category", "Items", "Total Cost"]),
        rows,
    }
}

fn lots_section(lots: &[Lot]) -> Section {
    let rows = lots
        .iter()
        .map(|l| vec![l.lot_number.clone(), l.address.clone().unwrap_or_default(), opt_money(l.area_sq_ft)])
        .collect();
    Section {
        heading: "Lots".into(),
        columns: cols(&["Lot", "Address", "Area (sq ft)"]),
        rows,
    }
}

fn files_section(files: &[ProjectFile]) -> Section {
    let rows = files
        .iter()
        .map(|f| {
            vec![
                f.filename.clone(),
                f.file_type.as_str().to_string(),
                f.size_bytes.map(|s| s.to_string()).unwrap_or_default(),
                f.storage_key.clone(),
            ]
        })
        .collect();
    Section {
        heading: "Documents".into(),
        columns: cols(&["File", "Type", "Size (bytes)", "Storage Key"]),
        rows,
    }
}

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn money(d: Decimal) -> String {
    format!("{:.2}", d)
}

fn opt_money(d: Option<Decimal>) -> String {
    d.map(money).unwrap_or_default()
}

fn opt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_default()
}

fn address_line(p: &BuildProject) -> String {
    [p.address.as_deref(), p.city.as_deref(), p.state.as_deref(), p.zip_code.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

// ---
// Renderização
// ---

pub fn render(doc: &ReportDocument, format: ReportFormat, fonts_dir: &Path) -> Result<Vec<u8>, AppError> {
    match format {
        ReportFormat::Csv => Ok(render_csv(doc).into_bytes()),
        ReportFormat::Pdf => render_pdf(doc, fonts_dir),
        ReportFormat::Xlsx => Err(AppError::BadRequest("XLSX rendering is not supported".into())),
    }
}

pub fn render_csv(doc: &ReportDocument) -> String {
    let mut w = CsvWriter::new();
    w.row([doc.title.as_str()]);
    for (key, value) in &doc.facts {
        w.row([key, value]);
    }
    for section in &doc.sections {
        w.blank();
        w.row([section.heading.as_str()]);
        w.row(&section.columns);
        for row in &section.rows {
            w.row(row);
        }
    }
    w.finish()
}

pub fn render_pdf(doc: &ReportDocument, fonts_dir: &Path) -> Result<Vec<u8>, AppError> {
    // 1. Fonte
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None).map_err(|e| {
        anyhow::anyhow!("Fonte {} não encontrada em {}: {}", FONT_FAMILY, fonts_dir.display(), e)
    })?;

    let mut pdf = genpdf::Document::new(font_family);
    pdf.set_title(doc.title.clone());
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    pdf.set_page_decorator(decorator);

    // 2. Cabeçalho
    pdf.push(elements::Paragraph::new(doc.title.clone()).styled(style::Style::new().bold().with_font_size(16)));
    pdf.push(elements::Break::new(1));
    for (key, value) in &doc.facts {
        pdf.push(elements::Paragraph::new(format!("{}: {}", key, value)).styled(style::Style::new().with_font_size(10)));
    }

    // 3. Tabelas
    let bold = style::Style::new().bold();
    for section in &doc.sections {
        pdf.push(elements::Break::new(1.5));
        pdf.push(elements::Paragraph::new(section.heading.clone()).styled(style::Style::new().bold().with_font_size(12)));

        let mut table = elements::TableLayout::new(vec![1; section.columns.len()]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let mut header = table.row();
        for c in &section.columns {
            header.push_element(elements::Paragraph::new(c.clone()).styled(bold));
        }
        header.push().map_err(|e| anyhow::anyhow!("Erro no cabeçalho da tabela: {}", e))?;

        for row in &section.rows {
            let mut line = table.row();
            for cell in row {
                line.push_element(elements::Paragraph::new(cell.clone()).styled(style::Style::new().with_font_size(9)));
            }
            line.push().map_err(|e| anyhow::anyhow!("Erro na linha da tabela: {}", e))?;
        }
        pdf.push(table);
    }

    // 4. Buffer em memória
    let mut buffer = Vec::new();
    pdf.render(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Falha ao renderizar PDF: {}", e))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        file::FileType,
        material::{MaterialCategory, UnitOfMeasure},
        project::ProjectStatus,
        schedule::MilestonePhase,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn data() -> ReportData {
        let now = Utc::now();
        let project = BuildProject {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Maple Ridge Lot 12".into(),
            address: Some("12 Maple Ridge".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip_code: None,
            status: ProjectStatus::Active,
            home_area_sq_ft: Some(dec("2000")),
            budget: Some(dec("100000")),
            baseline_start_date: Some(date("2024-01-01")),
            baseline_end_date: Some(date("2024-06-30")),
            actual_start_date: None,
            actual_end_date: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let material = MaterialLineItem {
            id: Uuid::new_v4(),
            project_id: project.id,
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
        };
        let milestone = ScheduleMilestone {
            id: Uuid::new_v4(),
            project_id: project.id,
            phase: MilestonePhase::Foundation,
            description: None,
            baseline_start_date: date("2024-01-01"),
            baseline_end_date: date("2024-01-31"),
            actual_start_date: None,
            actual_end_date: Some(date("2024-02-03")),
            percent_complete: dec("100"),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let file = ProjectFile {
            id: Uuid::new_v4(),
            tenant_id: project.tenant_id,
            project_id: project.id,
            filename: "site-plan.pdf".into(),
            file_type: FileType::Drawing,
            mime_type: None,
            size_bytes: Some(1024),
            storage_key: "t/p/x/site-plan.pdf".into(),
            storage_url: None,
            created_at: now,
            updated_at: now,
        };
        let financials = crate::services::project_service::compute_financials(&project, dec("4675.00"), &[dec("100")]);
        ReportData {
            project,
            financials,
            materials: vec![material],
            categories: vec![CategoryTotal {
                category: MaterialCategory::Framing,
                item_count: 1,
                total_cost: dec("4675.00"),
            }],
            milestones: vec![milestone],
            lots: vec![],
            files: vec![file],
            today: date("2024-03-01"),
        }
    }

    const ALL: SectionOptions = SectionOptions { include_materials: true, include_schedule: true };
    const NONE: SectionOptions = SectionOptions { include_materials: false, include_schedule: false };

    #[test]
    fn progress_report_lists_schedule_variance() {
        let doc = build_document(ReportType::Progress, &data(), NONE);
        assert_eq!(doc.title, "Progress Report - Maple Ridge Lot 12");
        let schedule = doc.section("Schedule").unwrap();
        assert_eq!(schedule.rows[0][0], "FOUNDATION");
        assert_eq!(schedule.rows[0][3], "-3");
        assert_eq!(schedule.rows[0][5], "YES");
        assert!(doc.section("Cost by Category").is_none());
    }

    #[test]
    fn flags_only_add_optional_sections() {
        let takeoff = build_document(ReportType::TakeoffSummary, &data(), NONE);
        assert!(takeoff.section("Materials").is_some());
        assert!(takeoff.section("Schedule").is_none());

        let binder = build_document(ReportType::OmBinder, &data(), ALL);
        let headings: Vec<&str> = binder.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Lots", "Documents", "Materials", "Schedule"]);
    }

    #[test]
    fn budget_report_carries_financials_and_category_total() {
        let doc = build_document(ReportType::BudgetVsActual, &data(), NONE);
        assert!(doc.facts.contains(&("Variance".into(), "95325.00".into())));
        let categories = doc.section("Cost by Category").unwrap();
        assert_eq!(categories.rows.last().unwrap(), &vec!["TOTAL".to_string(), "1".into(), "4675.00".into()]);
    }

    #[test]
    fn csv_rendering_quotes_cells_and_separates_sections() {
        let doc = build_document(ReportType::TakeoffSummary, &data(), NONE);
        let csv = render_csv(&doc);
        assert!(csv.starts_with("Takeoff Summary - Maple Ridge Lot 12\r\n"));
        assert!(csv.contains("\r\n\r\nMaterials\r\n"));
        assert!(csv.contains("FRAMING,\"2x4 Lumber, 8ft\",550,EA,8.50,4675.00\r\n"));
    }

    #[test]
    fn xlsx_is_rejected() {
        let doc = build_document(ReportType::Progress, &data(), NONE);
        let err = render(&doc, ReportFormat::Xlsx, Path::new("./fonts")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m == "XLSX rendering is not supported"));
    }

    #[test]
    fn pdf_needs_the_font_files() {
        let doc = build_document(ReportType::Progress, &data(), NONE);
        assert!(render_pdf(&doc, Path::new("/nonexistent/fonts")).is_err());
    }
}
