//! Derivation of display data from a stats snapshot.
//!
//! [`render`] is a pure function of the snapshot and the view-local
//! [`PaginationState`]; it never touches the network or the session. The
//! backend decides ordering and truncation of every aggregate, so series are
//! emitted exactly in payload order.

use std::ops::Range;

use dnsdash_shared::{CategoryCounts, DnsCode, QueryRecord, StatsSnapshot, TimeBucket};

/// Page sizes offered for the recent-queries table.
pub const ROWS_PER_PAGE_OPTIONS: [usize; 3] = [5, 10, 25];
pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

const MISSING: &str = "-";

/// Position in the recent-queries table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: usize,
    rows_per_page: usize,
}

impl PaginationState {
    pub fn new() -> Self {
        Self {
            page: 0,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Number of pages for `total_rows`; at least one.
    pub fn page_count(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.rows_per_page).max(1)
    }

    /// Changes the page size and returns to the first page. Sizes outside
    /// [`ROWS_PER_PAGE_OPTIONS`] are ignored.
    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> bool {
        if !ROWS_PER_PAGE_OPTIONS.contains(&rows_per_page) {
            return false;
        }
        self.rows_per_page = rows_per_page;
        self.page = 0;
        true
    }

    pub fn next_page(&mut self, total_rows: usize) {
        if self.page + 1 < self.page_count(total_rows) {
            self.page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Moves back to the last page that still has rows.
    pub fn clamp_to(&mut self, total_rows: usize) {
        self.page = self.page.min(self.page_count(total_rows) - 1);
    }

    /// Row indices shown for `total_rows`, using the clamped page.
    pub fn window(&self, total_rows: usize) -> Range<usize> {
        let page = self.page.min(self.page_count(total_rows) - 1);
        let start = (page * self.rows_per_page).min(total_rows);
        let end = (start + self.rows_per_page).min(total_rows);
        start..end
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}

/// One chart: labels and counts in backend order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub title: &'static str,
    pub points: Vec<(String, u64)>,
}

impl ChartSeries {
    fn from_pairs<'a>(title: &'static str, pairs: impl Iterator<Item = (&'a str, u64)>) -> Self {
        Self {
            title,
            points: pairs.map(|(label, count)| (label.to_string(), count)).collect(),
        }
    }

    fn from_counts(title: &'static str, counts: &CategoryCounts) -> Self {
        Self::from_pairs(title, counts.iter())
    }

    fn from_ranking(title: &'static str, ranking: &[(String, u64)]) -> Self {
        Self::from_pairs(
            title,
            ranking.iter().map(|(label, count)| (label.as_str(), *count)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_value(&self) -> u64 {
        self.points.iter().map(|(_, count)| *count).max().unwrap_or(0)
    }
}

/// A recent query, formatted for the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub time: String,
    pub client: String,
    pub server: String,
    pub domain: String,
    pub qtype: String,
    pub protocol: String,
    pub src_port: String,
    pub dst_port: String,
    pub rcode: String,
    pub response: &'static str,
}

impl QueryRow {
    fn from_record(record: &QueryRecord) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_else(|| MISSING.to_string());
        let port = |value: Option<u16>| value.map_or_else(|| MISSING.to_string(), |p| p.to_string());
        let code = |value: &Option<DnsCode>, label: fn(&DnsCode) -> String| {
            value.as_ref().map_or_else(|| MISSING.to_string(), label)
        };

        Self {
            time: table_time_label(&record.timestamp).to_string(),
            client: text(&record.src_ip),
            server: text(&record.dst_ip),
            domain: record.qname.clone(),
            qtype: code(&record.qtype, DnsCode::qtype_label),
            protocol: text(&record.protocol),
            src_port: port(record.src_port),
            dst_port: port(record.dst_port),
            rcode: code(&record.rcode, DnsCode::rcode_label),
            response: if record.response { "Yes" } else { "No" },
        }
    }
}

/// Pagination footer of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub page_count: usize,
    pub rows_per_page: usize,
    pub total_rows: usize,
    /// e.g. `11–12 of 12`
    pub label: String,
}

impl PageInfo {
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count
    }
}

/// Everything the dashboard draws for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub total_queries: u64,
    pub queries_over_time: ChartSeries,
    pub top_domains: ChartSeries,
    pub top_clients: ChartSeries,
    pub query_types: ChartSeries,
    pub protocols: ChartSeries,
    pub response_codes: ChartSeries,
    pub ports: ChartSeries,
    pub rows: Vec<QueryRow>,
    pub page: PageInfo,
}

/// Derives the dashboard for `snapshot` at the given table position.
pub fn render(snapshot: &StatsSnapshot, pagination: &PaginationState) -> DashboardView {
    let total_rows = snapshot.recent_queries.len();
    let window = pagination.window(total_rows);
    let page_count = pagination.page_count(total_rows);
    let page = pagination.page().min(page_count - 1);

    let label = if window.is_empty() {
        format!("0–0 of {}", total_rows)
    } else {
        format!("{}–{} of {}", window.start + 1, window.end, total_rows)
    };

    DashboardView {
        total_queries: snapshot.total_queries,
        queries_over_time: time_series(&snapshot.queries_over_time),
        top_domains: ChartSeries::from_ranking("Top Domains", &snapshot.top_domains),
        top_clients: ChartSeries::from_ranking("Top Clients", &snapshot.top_clients),
        query_types: ChartSeries::from_counts("Query Types", &snapshot.queries_by_type),
        protocols: ChartSeries::from_counts("Protocols", &snapshot.queries_by_protocol),
        response_codes: ChartSeries::from_counts("Response Codes", &snapshot.queries_by_rcode),
        ports: ChartSeries::from_counts("Ports", &snapshot.queries_by_port),
        rows: snapshot.recent_queries[window]
            .iter()
            .map(QueryRow::from_record)
            .collect(),
        page: PageInfo {
            page,
            page_count,
            rows_per_page: pagination.rows_per_page(),
            total_rows,
            label,
        },
    }
}

fn time_series(buckets: &[TimeBucket]) -> ChartSeries {
    ChartSeries::from_pairs(
        "Queries Over Time",
        buckets
            .iter()
            .map(|bucket| (chart_time_label(&bucket.timestamp), bucket.count)),
    )
}

/// `HH:MM` of an ISO-8601 timestamp; the full string if it is too short.
pub fn chart_time_label(timestamp: &str) -> &str {
    timestamp.get(11..16).unwrap_or(timestamp)
}

/// `HH:MM:SS` of an ISO-8601 timestamp; the full string if it is too short.
pub fn table_time_label(timestamp: &str) -> &str {
    timestamp.get(11..19).unwrap_or(timestamp)
}
