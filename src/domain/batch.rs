use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    business::BusinessRecord,
    search::{ScrapingResult, SearchParams, SourceKind, DEFAULT_MAX_RESULTS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Started,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    pub only_decision_makers: bool,
    pub use_proxies: bool,
    pub source: SourceKind,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            only_decision_makers: false,
            use_proxies: true,
            source: SourceKind::Scrape,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub services: Vec<String>,
    pub locations: Vec<String>,
    pub max_results: Option<usize>,
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub batch_id: Uuid,
    pub services: Vec<String>,
    pub locations: Vec<String>,
    pub max_results: usize,
    pub options: BatchOptions,
    pub status: BatchStatus,
    pub total_searches: usize,
    pub completed_results: Vec<ScrapingResult>,
    pub total_businesses: usize,
    pub total_contacts: usize,
    pub failed_searches: usize,
    pub attempted_searches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output_ref: String,
}

impl BatchJob {
    pub fn new(
        services: Vec<String>,
        locations: Vec<String>,
        max_results: Option<usize>,
        options: BatchOptions,
        output_ref: impl FnOnce(Uuid) -> String,
    ) -> Self {
        let batch_id = Uuid::new_v4();
        let total_searches = services.len() * locations.len();

        BatchJob {
            batch_id,
            services,
            locations,
            max_results: max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            options,
            status: BatchStatus::Started,
            total_searches,
            completed_results: vec![],
            total_businesses: 0,
            total_contacts: 0,
            failed_searches: 0,
            attempted_searches: 0,
            started_at: Utc::now(),
            finished_at: None,
            output_ref: output_ref(batch_id),
        }
    }

    /// Every (service, location) pair, services outer and locations inner.
    pub fn search_params(&self) -> Vec<SearchParams> {
        self.services
            .iter()
            .cartesian_product(self.locations.iter())
            .map(|(service, location)| {
                SearchParams::new(service.clone(), location.clone())
                    .with_max_results(self.max_results)
                    .with_only_decision_makers(self.options.only_decision_makers)
                    .with_proxies(self.options.use_proxies)
            })
            .collect()
    }

    pub fn record_result(&mut self, result: ScrapingResult) {
        self.attempted_searches += 1;
        if result.has_errors() {
            self.failed_searches += 1;
        }
        self.total_businesses += result.business_count();
        self.total_contacts += result.contact_count();
        self.completed_results.push(result);
    }

    pub fn record_failure(&mut self) {
        self.attempted_searches += 1;
        self.failed_searches += 1;
    }

    pub fn finish(&mut self) {
        self.status = match self.attempted_searches {
            0 => BatchStatus::Failed,
            _ => BatchStatus::Completed,
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            completed: self.attempted_searches,
            failed: self.failed_searches,
            total: self.total_searches,
        }
    }

    pub fn export(&self) -> BatchExport {
        let groups = self
            .completed_results
            .iter()
            .map(|result| ExportGroup {
                service: result.query().to_string(),
                location: result.location().to_string(),
                execution_id: result.execution_id(),
                errors: result.errors().to_vec(),
                rows: result.businesses().iter().flat_map(export_rows).collect(),
            })
            .collect();

        BatchExport {
            metadata: BatchMetadata {
                batch_id: self.batch_id,
                status: self.status,
                started_at: self.started_at,
                finished_at: self.finished_at,
                services: self.services.clone(),
                locations: self.locations.clone(),
                max_results: self.max_results,
                source: self.options.source,
                total_searches: self.total_searches,
                failed_searches: self.failed_searches,
                total_businesses: self.total_businesses,
                total_contacts: self.total_contacts,
            },
            groups,
        }
    }
}

pub const EXPORT_COLUMNS: [&str; 12] = [
    "business_name",
    "category",
    "address",
    "phone",
    "email",
    "website",
    "source",
    "contact_name",
    "position",
    "contact_email",
    "contact_phone",
    "decision_maker",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub business_name: String,
    pub category: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub source: String,
    pub contact_name: String,
    pub position: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub decision_maker: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportGroup {
    pub service: String,
    pub location: String,
    pub execution_id: Uuid,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub rows: Vec<ExportRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub services: Vec<String>,
    pub locations: Vec<String>,
    pub max_results: usize,
    pub source: SourceKind,
    pub total_searches: usize,
    pub failed_searches: usize,
    pub total_businesses: usize,
    pub total_contacts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchExport {
    pub metadata: BatchMetadata,
    pub groups: Vec<ExportGroup>,
}

impl BatchExport {
    pub fn rows(&self) -> impl Iterator<Item = &ExportRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }
}

/// One row per contact, or a single row with empty contact columns.
pub fn export_rows(business: &BusinessRecord) -> Vec<ExportRow> {
    let base = ExportRow {
        business_name: business.name.clone(),
        category: business.category.clone().unwrap_or_default(),
        address: business.address.clone().unwrap_or_default(),
        phone: business.phone_number.clone().unwrap_or_default(),
        email: business.email.clone().unwrap_or_default(),
        website: business.website.clone().unwrap_or_default(),
        source: business.source.to_string(),
        contact_name: String::new(),
        position: String::new(),
        contact_email: String::new(),
        contact_phone: String::new(),
        decision_maker: false,
    };

    if business.contacts.is_empty() {
        return vec![base];
    }

    business
        .contacts
        .iter()
        .map(|contact| ExportRow {
            contact_name: contact.name.clone(),
            position: contact.position.clone().unwrap_or_default(),
            contact_email: contact.email.clone().unwrap_or_default(),
            contact_phone: contact.phone_number.clone().unwrap_or_default(),
            decision_maker: contact.is_decision_maker,
            ..base.clone()
        })
        .collect()
}

/// Trims, drops blanks and removes duplicates while keeping first-seen order.
pub fn unique_inputs(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = vec![];
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
