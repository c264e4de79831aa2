#![allow(dead_code)]

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use prospector::{
    domain::{
        business::{BusinessRecord, ContactRecord},
        search::{ScrapingResult, SearchParams, SourceKind, SourceReport},
    },
    services::{BatchOrchestrator, BatchStatusReport, LeadSource, SearchError},
};
use uuid::Uuid;

/// Lead source returning one business with two contacts per search. Queries listed in
/// `failing` return an upstream error and queries in `panicking` panic.
#[derive(Default)]
pub struct FakeSource {
    pub calls: Mutex<Vec<(String, String)>>,
    pub failing: Vec<String>,
    pub panicking: Vec<String>,
}

impl FakeSource {
    pub fn failing_on(query: &str) -> Self {
        FakeSource {
            failing: vec![query.to_string()],
            ..Default::default()
        }
    }

    pub fn panicking_on(query: &str) -> Self {
        FakeSource {
            panicking: vec![query.to_string()],
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadSource for FakeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    async fn search(&self, params: SearchParams) -> Result<ScrapingResult, SearchError> {
        params.validate()?;
        self.calls
            .lock()
            .unwrap()
            .push((params.query.clone(), params.location.clone()));

        if self.panicking.contains(&params.query) {
            panic!("parser exploded on {}", params.query);
        }
        if self.failing.contains(&params.query) {
            return Err(SearchError::Upstream("upstream unavailable".to_string()));
        }

        let mut business = BusinessRecord::new(
            format!("{} co", params.query),
            SourceKind::Scrape,
            "https://www.google.com/search".to_string(),
        );
        business.contacts = vec![
            ContactRecord::new(business.id, "Ana".to_string(), Some("Owner".to_string()), None, None),
            ContactRecord::new(business.id, "Bo".to_string(), Some("Cleaner".to_string()), None, None),
        ];

        Ok(ScrapingResult::new(
            Uuid::new_v4(),
            &params,
            vec![business],
            vec![SourceReport {
                name: "scrape".to_string(),
                count: 1,
                success: true,
            }],
            vec![],
            vec![],
        ))
    }
}

pub async fn wait_for_terminal(orchestrator: &BatchOrchestrator, batch_id: Uuid) -> BatchStatusReport {
    for _ in 0..500 {
        let report = orchestrator.batch_status(batch_id).await.unwrap();
        if report.status.is_terminal() {
            return report;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {} did not finish", batch_id);
}
