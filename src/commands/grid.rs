use std::fmt::{self, Write};

use chrono::DateTime;

use crate::error::{ErrorCodeString, Result};
use crate::i18n::{tr, Locale, Message};
use crate::types::{AccountHistoryRow, ItemSearchData, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGridPager {
    pub limit_start: u32,
    pub limit_count: u32,
    pub total_rows: u64,
    pub filter_on: bool,
}

impl DataGridPager {
    pub fn new(search: &ItemSearchData, total_rows: u64) -> Self {
        Self {
            limit_start: search.limit_start,
            limit_count: search.limit_count.max(1),
            total_rows,
            filter_on: search.is_filtered(),
        }
    }

    pub fn first(&self) -> u64 {
        0
    }

    pub fn prev(&self) -> u64 {
        u64::from(self.limit_start.saturating_sub(self.limit_count))
    }

    pub fn next(&self) -> Option<u64> {
        let next = u64::from(self.limit_start) + u64::from(self.limit_count);
        (next < self.total_rows).then_some(next)
    }

    pub fn last(&self) -> u64 {
        let count = u64::from(self.limit_count);
        if self.total_rows == 0 {
            return 0;
        }
        ((self.total_rows - 1) / count) * count
    }

    pub fn current_page(&self) -> u64 {
        u64::from(self.limit_start) / u64::from(self.limit_count) + 1
    }

    pub fn total_pages(&self) -> u64 {
        self.total_rows.div_ceil(u64::from(self.limit_count)).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGridAction {
    pub name: &'static str,
    pub route: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGridRow {
    pub id: i64,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DataGrid {
    pub index: i64,
    pub headers: Vec<&'static str>,
    pub rows: Vec<DataGridRow>,
    pub actions: Vec<DataGridAction>,
    pub pager: DataGridPager,
    pub empty_text: &'static str,
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn display_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

impl DataGrid {
    pub fn render(&self) -> Result<String> {
        let mut html = String::new();
        self.write_html(&mut html)
            .map_err(|_| ErrorCodeString::new("GRID_RENDER_FAILED"))?;
        Ok(html)
    }

    fn write_html(&self, html: &mut String) -> fmt::Result {
        write!(
            html,
            r#"<div id="data-table-{}" class="data-table"><table><thead><tr>"#,
            self.index
        )?;
        for header in &self.headers {
            write!(html, "<th>{}</th>", html_escape(header))?;
        }
        html.push_str("<th></th></tr></thead><tbody>");

        if self.rows.is_empty() {
            write!(
                html,
                r#"<tr class="no-records"><td colspan="{}">{}</td></tr>"#,
                self.headers.len() + 1,
                html_escape(self.empty_text)
            )?;
        }

        for row in &self.rows {
            write!(html, r#"<tr data-item-id="{}">"#, row.id)?;
            for cell in &row.cells {
                write!(html, "<td>{}</td>", html_escape(cell))?;
            }
            html.push_str(r#"<td class="actions">"#);
            for action in &self.actions {
                write!(
                    html,
                    r#"<button type="button" data-action="{}" data-action-route="{}" data-item-id="{}" title="{}"></button>"#,
                    action.name,
                    action.route,
                    row.id,
                    html_escape(action.title)
                )?;
            }
            html.push_str("</td></tr>");
        }
        html.push_str("</tbody></table>");

        let pager = &self.pager;
        write!(
            html,
            r#"<div class="pager" data-start="{}" data-count="{}" data-total="{}" data-filter-on="{}" data-first="{}" data-prev="{}" data-next="{}" data-last="{}">{} / {}</div></div>"#,
            pager.limit_start,
            pager.limit_count,
            pager.total_rows,
            pager.filter_on,
            pager.first(),
            pager.prev(),
            pager.next().map(|n| n.to_string()).unwrap_or_default(),
            pager.last(),
            pager.current_page(),
            pager.total_pages()
        )
    }
}

pub struct AccountHistoryGrid;

impl AccountHistoryGrid {
    pub fn build(
        locale: Locale,
        index: i64,
        result: &QueryResult<AccountHistoryRow>,
        search: &ItemSearchData,
    ) -> DataGrid {
        let rows = result
            .data
            .iter()
            .map(|row| {
                let status = if row.is_deleted {
                    tr(locale, Message::StatusDeleted)
                } else if row.is_modify {
                    tr(locale, Message::StatusModified)
                } else {
                    ""
                };
                DataGridRow {
                    id: row.id,
                    cells: vec![
                        row.name.clone(),
                        row.client_name.clone(),
                        display_date(&row.date),
                        status.to_string(),
                    ],
                }
            })
            .collect();

        DataGrid {
            index,
            headers: vec![
                tr(locale, Message::GridName),
                tr(locale, Message::GridClient),
                tr(locale, Message::GridDate),
                tr(locale, Message::GridStatus),
            ],
            rows,
            actions: vec![
                DataGridAction {
                    name: "restore",
                    route: "accountHistoryManager/restore",
                    title: tr(locale, Message::ActionRestore),
                },
                DataGridAction {
                    name: "delete",
                    route: "accountHistoryManager/delete",
                    title: tr(locale, Message::ActionDelete),
                },
            ],
            pager: DataGridPager::new(search, result.total_num_rows),
            empty_text: tr(locale, Message::NoRecords),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(start: u32, count: u32, needle: &str) -> ItemSearchData {
        ItemSearchData {
            search_string: needle.to_string(),
            limit_start: start,
            limit_count: count,
        }
    }

    #[test]
    fn pager_offsets() {
        let pager = DataGridPager::new(&search(10, 10, ""), 25);
        assert_eq!(pager.prev(), 0);
        assert_eq!(pager.next(), Some(20));
        assert_eq!(pager.last(), 20);
        assert_eq!(pager.current_page(), 2);
        assert_eq!(pager.total_pages(), 3);
        assert!(!pager.filter_on);

        let last_page = DataGridPager::new(&search(20, 10, "x"), 25);
        assert_eq!(last_page.next(), None);
        assert!(last_page.filter_on);
    }

    #[test]
    fn render_escapes_cells() {
        let result = QueryResult::new(
            vec![AccountHistoryRow {
                id: 9,
                account_id: 1,
                name: "<script>alert(1)</script>".to_string(),
                client_name: "Acme & Co".to_string(),
                login: None,
                date: "2024-03-05T10:20:00+00:00".to_string(),
                is_modify: true,
                is_deleted: false,
            }],
            1,
        );

        let html = AccountHistoryGrid::build(Locale::En, 1, &result, &search(0, 12, ""))
            .render()
            .unwrap();

        assert!(html.contains(r#"id="data-table-1""#));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("2024-03-05 10:20"));
        assert!(html.contains("<td>Modified</td>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn empty_result_renders_placeholder() {
        let result: QueryResult<AccountHistoryRow> = QueryResult::new(Vec::new(), 0);
        let html = AccountHistoryGrid::build(Locale::Es, 0, &result, &search(0, 12, ""))
            .render()
            .unwrap();
        assert!(html.contains("No se encontraron registros"));
        assert!(html.contains("1 / 1"));
    }
}
