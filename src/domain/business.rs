use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::search::{SearchParams, SourceKind};

const DECISION_MAKER_KEYWORDS: [&str; 14] = [
    "owner",
    "founder",
    "cofounder",
    "ceo",
    "president",
    "manager",
    "director",
    "principal",
    "partner",
    "chief",
    "head",
    "vp",
    "executive",
    "proprietor",
];

const DECISION_MAKER_PHRASES: [&str; 2] = ["vice president", "co-founder"];

lazy_static! {
    // (305) 555-0134, 305-555-0134, 305.555.0134, optional +1
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"^(?:\+?1[\s.-]?)?(?:\(\d{3}\)\s?|\d{3}[\s.-])\d{3}[\s.-]\d{4}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: Uuid,
    pub name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub is_decision_maker: bool,
    pub company_id: Uuid,
}

impl ContactRecord {
    pub fn new(
        company_id: Uuid,
        name: String,
        position: Option<String>,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Self {
        let is_decision_maker = position.as_deref().is_some_and(is_decision_maker_title);

        ContactRecord {
            id: Uuid::new_v4(),
            name,
            position,
            email,
            phone_number,
            is_decision_maker,
            company_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub category: Option<String>,
    pub source: SourceKind,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub contacts: Vec<ContactRecord>,
}

impl BusinessRecord {
    pub fn new(name: String, source: SourceKind, source_url: String) -> Self {
        BusinessRecord {
            id: Uuid::new_v4(),
            name,
            address: None,
            phone_number: None,
            email: None,
            website: None,
            category: None,
            source,
            source_url,
            scraped_at: Utc::now(),
            contacts: vec![],
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize_business_name(&self.name)
    }
}

pub fn normalize_business_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn is_decision_maker_title(title: &str) -> bool {
    let title = title.to_lowercase();

    if DECISION_MAKER_PHRASES
        .iter()
        .any(|phrase| title.contains(phrase))
    {
        return true;
    }

    title
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| DECISION_MAKER_KEYWORDS.contains(&word))
}

/// Returns the trimmed phone number when it matches a recognized local format.
pub fn recognized_phone(text: &str) -> Option<String> {
    let text = text.trim();
    PHONE_PATTERN.is_match(text).then(|| text.to_string())
}

/// Dedups by normalized name (first occurrence wins), applies the decision maker filter
/// and truncates to `max_results`.
pub fn normalize_businesses(
    businesses: Vec<BusinessRecord>,
    params: &SearchParams,
) -> Vec<BusinessRecord> {
    let mut seen_names = HashSet::new();

    businesses
        .into_iter()
        .filter(|b| seen_names.insert(b.normalized_name()))
        .take(params.max_results)
        .map(|mut business| {
            if params.only_decision_makers {
                business.contacts.retain(|c| c.is_decision_maker);
            }
            let company_id = business.id;
            business
                .contacts
                .iter_mut()
                .for_each(|c| c.company_id = company_id);
            business
        })
        .collect()
}
