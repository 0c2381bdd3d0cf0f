use super::common::html_escape;
use crate::{
    entities::crate_record,
    errors::ServiceError,
    handlers::AppState,
    services::crates::{CrateDraft, CrateFilter, CrateTotals},
};
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

/// Dashboard query string: filters plus an optional redirect notice
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub run: Option<String>,
    pub puc: Option<String>,
    pub commodity: Option<String>,
    pub farm: Option<String>,
    pub notice: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub error: Option<String>,
}

/// GET / — the dashboard is the landing page
pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// GET /dashboard — filtered crate listing with totals
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, ServiceError> {
    let filter = CrateFilter {
        run_number: query.run.clone(),
        puc: query.puc.clone(),
        commodity: query.commodity.clone(),
        farm_name: query.farm.clone(),
    };
    let listing = state.services.crates.list(&filter).await?;

    Ok(Html(dashboard_page(
        &listing.crates,
        &listing.totals,
        &query,
    )))
}

/// GET /add — entry form with today's date pre-filled
pub async fn add_form(Query(query): Query<NoticeQuery>) -> Html<String> {
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    Html(add_page(&today, query.error.as_deref()))
}

/// POST /add — insert from the browser form, redirect with a notice
pub async fn add_crate(
    State(state): State<AppState>,
    Form(draft): Form<CrateDraft>,
) -> Redirect {
    match state.services.crates.create(draft).await {
        Ok(_) => Redirect::to("/dashboard?notice=Crate+added."),
        Err(err) => {
            warn!("failed to add crate: {}", err);
            let message = encode_query_value(&format!("Failed to add crate: {}", err.response_message()));
            Redirect::to(&format!("/add?error={}", message))
        }
    }
}

/// GET /crate/:id — single record view, 404 page when absent
pub async fn crate_detail(
    State(state): State<AppState>,
    Path(crate_id): Path<i32>,
) -> Result<Response, ServiceError> {
    match state.services.crates.get(crate_id).await {
        Ok(record) => Ok(Html(detail_page(&record)).into_response()),
        Err(ServiceError::NotFound(_)) => Ok((
            StatusCode::NOT_FOUND,
            Html(not_found_page(crate_id)),
        )
            .into_response()),
        Err(err) => Err(err),
    }
}

fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// Page rendering. Pages are deliberately plain; all user data is escaped.

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} - Packhouse QC</title>\n\
         <style>\n\
         body{{font-family:sans-serif;margin:2rem;color:#222}}\n\
         table{{border-collapse:collapse;width:100%}}\n\
         th,td{{border:1px solid #ccc;padding:.35rem .6rem;text-align:left}}\n\
         .notice{{background:#e6f4e6;border:1px solid #8c8;padding:.5rem 1rem}}\n\
         .error{{background:#f9e0e0;border:1px solid #c88;padding:.5rem 1rem}}\n\
         form.filters input{{margin-right:.5rem}}\n\
         label{{display:block;margin-top:.6rem}}\n\
         </style>\n</head>\n<body>\n\
         <nav><a href=\"/dashboard\">Dashboard</a> | <a href=\"/add\">Add crate</a> | \
         <a href=\"/export/csv\">Export CSV</a></nav>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = html_escape(title),
        body = body,
    )
}

fn banner(query_notice: Option<&str>, query_error: Option<&str>) -> String {
    match (query_notice, query_error) {
        (Some(n), _) => format!("<p class=\"notice\">{}</p>\n", html_escape(n)),
        (_, Some(e)) => format!("<p class=\"error\">{}</p>\n", html_escape(e)),
        _ => String::new(),
    }
}

fn opt_cell(value: Option<&str>) -> String {
    html_escape(value.unwrap_or(""))
}

fn dashboard_page(
    crates: &[crate_record::Model],
    totals: &CrateTotals,
    query: &DashboardQuery,
) -> String {
    let mut body = banner(query.notice.as_deref(), query.error.as_deref());

    body.push_str(&format!(
        "<form class=\"filters\" method=\"get\" action=\"/dashboard\">\n\
         <input name=\"run\" placeholder=\"Run number\" value=\"{run}\">\n\
         <input name=\"puc\" placeholder=\"PUC\" value=\"{puc}\">\n\
         <input name=\"commodity\" placeholder=\"Commodity\" value=\"{commodity}\">\n\
         <input name=\"farm\" placeholder=\"Farm\" value=\"{farm}\">\n\
         <button type=\"submit\">Filter</button>\n</form>\n",
        run = opt_cell(query.run.as_deref()),
        puc = opt_cell(query.puc.as_deref()),
        commodity = opt_cell(query.commodity.as_deref()),
        farm = opt_cell(query.farm.as_deref()),
    ));

    body.push_str(&format!(
        "<p><strong>{count}</strong> crate(s), total weight <strong>{weight}</strong> kg</p>\n",
        count = totals.count,
        weight = totals.total_weight,
    ));

    body.push_str(
        "<table>\n<tr><th>ID</th><th>Run</th><th>PUC</th><th>Farm</th><th>Commodity</th>\
         <th>Variety</th><th>Grade</th><th>Size</th><th>Weight</th><th>Received</th></tr>\n",
    );
    for c in crates {
        body.push_str(&format!(
            "<tr><td><a href=\"/crate/{id}\">{id}</a></td><td>{run}</td><td>{puc}</td>\
             <td>{farm}</td><td>{commodity}</td><td>{variety}</td><td>{grade}</td>\
             <td>{size}</td><td>{weight}</td><td>{date}</td></tr>\n",
            id = c.id,
            run = opt_cell(c.run_number.as_deref()),
            puc = html_escape(&c.puc),
            farm = html_escape(&c.farm_name),
            commodity = html_escape(&c.commodity),
            variety = opt_cell(c.variety.as_deref()),
            grade = opt_cell(c.grade_class.as_deref()),
            size = opt_cell(c.size.as_deref()),
            weight = c.weight.map(|w| w.to_string()).unwrap_or_default(),
            date = c.date_received.format("%Y-%m-%d"),
        ));
    }
    body.push_str("</table>\n");

    layout("Crate dashboard", &body)
}

fn add_page(today: &str, error: Option<&str>) -> String {
    let mut body = banner(None, error);
    body.push_str(&format!(
        "<form method=\"post\" action=\"/add\">\n\
         <label>Run number <input name=\"run_number\"></label>\n\
         <label>PUC <input name=\"puc\" required></label>\n\
         <label>Farm name <input name=\"farm_name\" required></label>\n\
         <label>Commodity <input name=\"commodity\" required></label>\n\
         <label>Variety <input name=\"variety\"></label>\n\
         <label>Grade/class <input name=\"grade_class\"></label>\n\
         <label>Size <input name=\"size\"></label>\n\
         <label>Weight (kg) <input name=\"weight\"></label>\n\
         <label>Date received <input name=\"date_received\" type=\"date\" value=\"{today}\"></label>\n\
         <label>Inspector notes <textarea name=\"inspector_notes\" rows=\"4\"></textarea></label>\n\
         <button type=\"submit\">Add crate</button>\n</form>\n",
        today = html_escape(today),
    ));
    layout("Add crate", &body)
}

fn detail_page(c: &crate_record::Model) -> String {
    let notes = c
        .inspector_notes
        .as_deref()
        .map(html_escape)
        .unwrap_or_default()
        .replace('\n', "<br>");
    let body = format!(
        "<table>\n\
         <tr><th>ID</th><td>{id}</td></tr>\n\
         <tr><th>Run number</th><td>{run}</td></tr>\n\
         <tr><th>PUC</th><td>{puc}</td></tr>\n\
         <tr><th>Farm</th><td>{farm}</td></tr>\n\
         <tr><th>Commodity</th><td>{commodity}</td></tr>\n\
         <tr><th>Variety</th><td>{variety}</td></tr>\n\
         <tr><th>Grade/class</th><td>{grade}</td></tr>\n\
         <tr><th>Size</th><td>{size}</td></tr>\n\
         <tr><th>Weight</th><td>{weight}</td></tr>\n\
         <tr><th>Date received</th><td>{date}</td></tr>\n\
         <tr><th>Inspector notes</th><td>{notes}</td></tr>\n\
         <tr><th>Created at</th><td>{created}</td></tr>\n\
         </table>\n",
        id = c.id,
        run = opt_cell(c.run_number.as_deref()),
        puc = html_escape(&c.puc),
        farm = html_escape(&c.farm_name),
        commodity = html_escape(&c.commodity),
        variety = opt_cell(c.variety.as_deref()),
        grade = opt_cell(c.grade_class.as_deref()),
        size = opt_cell(c.size.as_deref()),
        weight = c.weight.map(|w| w.to_string()).unwrap_or_default(),
        date = c.date_received.format("%Y-%m-%d"),
        notes = notes,
        created = c.created_at.to_rfc3339(),
    );
    layout(&format!("Crate #{}", c.id), &body)
}

fn not_found_page(crate_id: i32) -> String {
    layout(
        "Crate not found",
        &format!(
            "<p>No crate with id {} exists. <a href=\"/dashboard\">Back to the dashboard.</a></p>",
            crate_id
        ),
    )
}
