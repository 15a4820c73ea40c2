use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::{error::ReportError, model::AssignmentRow};

const IDENTITY_CENTER_ICON: &str = include_str!("report/identity_center.svg");
const ACCOUNT_ICON: &str = include_str!("report/account.svg");

const FILE_PREFIX: &str = "sso_report_Account_Assignments_";
const FILE_TIMESTAMP: &str = "%Y-%m-%d_%H.%M.%S";

const TEMPLATE: &str = r#"<html><head><meta charset="utf-8"><title>AWS Identity Center Assignment Report</title></head><body>
<h1>{{ identity_center_icon }}AWS Identity Center Assignment Report - {{ instance_name | escape }}</h1>
<h2>{{ account_icon }} AWS Accounts</h2><ul>
{% for account in accounts %}<li><a href='#account_{{ account.id | escape }}'>{{ account.name | escape }}</a></li>
{% endfor %}</ul>
{% for account in accounts %}<a name='account_{{ account.id | escape }}'></a><h2>{{ account.name | escape }}</h2><table border='1'><tr><th>Type</th><th>Name</th><th>PermissionSet</th></tr>
{% for row in account.rows %}<tr><td>{{ row.principal_type }}</td><td>{{ row.principal_name | escape }}</td><td>{{ row.permission_set | escape }}</td></tr>
{% endfor %}</table>
{% endfor %}</body></html>
"#;

#[derive(Serialize)]
struct ReportView<'a> {
    instance_name: &'a str,
    identity_center_icon: &'static str,
    account_icon: &'static str,
    accounts: Vec<AccountSection<'a>>,
}

/// One account block of the report: heading, anchor and assignment table.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccountSection<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub rows: Vec<RowView<'a>>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RowView<'a> {
    pub principal_type: String,
    pub principal_name: &'a str,
    pub permission_set: &'a str,
}

/// Order rows by account name, descending, and group them per account id.
///
/// The sort is stable, so rows of equally named accounts keep their input order, and
/// sections appear in the order their account is first seen in the sorted rows.
pub fn group_by_account(rows: &[AssignmentRow]) -> Vec<AccountSection<'_>> {
    let mut sorted: Vec<&AssignmentRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.account_name.cmp(&a.account_name));

    let mut sections: Vec<AccountSection<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in sorted {
        let slot = *index.entry(row.account_id.as_str()).or_insert_with(|| {
            sections.push(AccountSection {
                id: &row.account_id,
                name: &row.account_name,
                rows: Vec::new(),
            });
            sections.len() - 1
        });
        sections[slot].rows.push(RowView {
            principal_type: row.principal_type.to_string(),
            principal_name: &row.principal_name,
            permission_set: &row.permission_set_name,
        });
    }

    sections
}

/// Render the self-contained HTML report.
pub fn render_report(rows: &[AssignmentRow], instance_name: &str) -> Result<String, ReportError> {
    let view = ReportView {
        instance_name,
        identity_center_icon: IDENTITY_CENTER_ICON.trim_end(),
        account_icon: ACCOUNT_ICON.trim_end(),
        accounts: group_by_account(rows),
    };
    debug!("Rendering {} rows across {} accounts", rows.len(), view.accounts.len());

    let parser = liquid::ParserBuilder::with_stdlib().build()?;
    let template = parser.parse(TEMPLATE)?;
    let globals = liquid::to_object(&view)?;
    Ok(template.render(&globals)?)
}

pub fn report_file_name(completed_at: &NaiveDateTime) -> String {
    format!("{FILE_PREFIX}{}.html", completed_at.format(FILE_TIMESTAMP))
}

/// Write the report into `dir`, named after `completed_at`. An existing file with the
/// same name is overwritten.
pub fn write_report(
    html: &str,
    dir: &Path,
    completed_at: &NaiveDateTime,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)
        .map_err(|source| ReportError::Io { path: dir.to_path_buf(), source })?;
    let path = dir.join(report_file_name(completed_at));
    std::fs::write(&path, html).map_err(|source| ReportError::Io { path: path.clone(), source })?;
    Ok(path)
}

/// Write the collected rows as pretty-printed JSON.
pub fn write_json(rows: &[AssignmentRow], path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(rows)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io { path: path.to_path_buf(), source })
}
