//! Monthly PDF report: text layout and rendering.

use chrono::NaiveDate;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::month::{MonthQuery, MonthWindow};
use crate::models::transaction::{Transaction, TransactionKind};
use crate::services::{auth, transaction};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
/// Millimetres per typographic point.
const PT_TO_MM: f32 = 0.3528;

/// One line of report text and its font size in points.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub text: String,
    pub size: f32,
    pub centered: bool,
}

impl ReportLine {
    fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
            centered: false,
        }
    }

    fn blank() -> Self {
        Self::new("", 12.0)
    }
}

/// Rendered report ready to stream to the client.
#[derive(Debug)]
pub struct MonthlyReport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fetch a month's records and render the PDF report for `user_id`.
pub async fn monthly_report(
    pool: &PgPool,
    user_id: Uuid,
    query: MonthQuery,
    today: NaiveDate,
) -> Result<MonthlyReport, AppError> {
    let window = MonthWindow::resolve(query, today)?;
    let user = auth::find_user_by_id(pool, user_id).await?;

    let (incomes, expenses) = tokio::try_join!(
        transaction::find_in_month(pool, TransactionKind::Income, user_id, &window),
        transaction::find_in_month(pool, TransactionKind::Expense, user_id, &window),
    )?;

    let lines = report_lines(&user.username, &window, &incomes, &expenses);
    let bytes = render_pdf(&format!("Monthly Report for {}", user.username), &lines)?;

    tracing::info!(
        user_id = %user_id,
        year = window.year,
        month = window.month,
        size = bytes.len(),
        "Rendered monthly report"
    );

    Ok(MonthlyReport {
        filename: report_filename(&user.username, &window),
        bytes,
    })
}

pub fn report_filename(username: &str, window: &MonthWindow) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}_{}_{}_report.pdf", window.month, window.year)
}

/// Lay out the report text: header, income and expense listings, then totals.
pub fn report_lines(
    username: &str,
    window: &MonthWindow,
    incomes: &[Transaction],
    expenses: &[Transaction],
) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine {
            text: format!("Monthly Report for {username}"),
            size: 20.0,
            centered: true,
        },
        ReportLine::blank(),
        ReportLine::new(format!("Month: {} / Year: {}", window.month, window.year), 16.0),
        ReportLine::blank(),
        ReportLine::new("Incomes:", 14.0),
    ];
    lines.extend(incomes.iter().map(entry_line));
    lines.push(ReportLine::blank());
    lines.push(ReportLine::new("Expenses:", 14.0));
    lines.extend(expenses.iter().map(entry_line));

    let total_income: Decimal = incomes.iter().map(|t| t.amount).sum();
    let total_expense: Decimal = expenses.iter().map(|t| t.amount).sum();

    lines.push(ReportLine::blank());
    lines.push(ReportLine::new(format!("Total Income: ${total_income}"), 16.0));
    lines.push(ReportLine::new(format!("Total Expense: ${total_expense}"), 16.0));
    lines.push(ReportLine::new(
        format!("Balance: ${}", total_income - total_expense),
        16.0,
    ));
    lines
}

fn entry_line(t: &Transaction) -> ReportLine {
    ReportLine::new(
        format!(
            "- {}: ${} on {}",
            t.category,
            t.amount,
            t.date.format("%a %b %d %Y")
        ),
        14.0,
    )
}

/// Render lines onto A4 pages with the builtin Helvetica font.
pub fn render_pdf(title: &str, lines: &[ReportLine]) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Internal(format!("PDF font setup failed: {e}")))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    for line in lines {
        let height = line.size * PT_TO_MM * 1.4;
        if y - height < MARGIN_MM {
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            current = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        y -= height;

        if line.text.is_empty() {
            continue;
        }

        let x = if line.centered {
            // Helvetica averages roughly half an em per glyph.
            let width = line.text.chars().count() as f32 * line.size * 0.5 * PT_TO_MM;
            ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_MM)
        } else {
            MARGIN_MM
        };
        current.use_text(line.text.as_str(), line.size, Mm(x), Mm(y), &font);
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF rendering failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(kind: TransactionKind, category: &str, amount: Decimal, day: u32) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            kind,
            category: category.to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lines_list_entries_and_totals() {
        let window = MonthWindow::new(2023, 3).unwrap();
        let incomes = vec![record(TransactionKind::Income, "Salary", Decimal::from(100), 5)];
        let expenses = vec![
            record(TransactionKind::Expense, "Food", Decimal::new(4050, 2), 5),
            record(TransactionKind::Expense, "Bus", Decimal::from(10), 20),
        ];

        let lines = report_lines("alice", &window, &incomes, &expenses);
        let text: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(text[0], "Monthly Report for alice");
        assert!(lines[0].centered);
        assert!(text.contains(&"Month: 3 / Year: 2023"));
        assert!(text.contains(&"- Salary: $100 on Sun Mar 05 2023"));
        assert!(text.contains(&"- Food: $40.50 on Sun Mar 05 2023"));
        assert!(text.contains(&"- Bus: $10 on Mon Mar 20 2023"));
        assert!(text.contains(&"Total Income: $100"));
        assert!(text.contains(&"Total Expense: $50.50"));
        assert_eq!(*text.last().unwrap(), "Balance: $49.50");
    }

    #[test]
    fn expenses_section_follows_incomes() {
        let window = MonthWindow::new(2023, 3).unwrap();
        let lines = report_lines("bob", &window, &[], &[]);
        let incomes_at = lines.iter().position(|l| l.text == "Incomes:").unwrap();
        let expenses_at = lines.iter().position(|l| l.text == "Expenses:").unwrap();
        assert!(incomes_at < expenses_at);
    }

    #[test]
    fn filename_embeds_month_and_sanitizes_user() {
        let window = MonthWindow::new(2024, 7).unwrap();
        assert_eq!(report_filename("alice", &window), "alice_7_2024_report.pdf");
        assert_eq!(
            report_filename("a b\"c", &window),
            "a_b_c_7_2024_report.pdf"
        );
    }

    #[test]
    fn rendered_report_is_a_pdf() {
        let window = MonthWindow::new(2023, 3).unwrap();
        let expenses: Vec<Transaction> = (1..=28)
            .flat_map(|day| {
                (0..3).map(move |_| {
                    record(TransactionKind::Expense, "Food", Decimal::from(3), day)
                })
            })
            .collect();
        let lines = report_lines("alice", &window, &[], &expenses);

        let bytes = render_pdf("Monthly Report for alice", &lines).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
