use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::{
    business::{recognized_phone, BusinessRecord, ContactRecord},
    search::SourceKind,
};

const GOOGLE_BASE_URL: &str = "https://www.google.com";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
    #[error("card {0} has no business name")]
    MissingName(usize),
    #[error("contact {1} in card {0} has no name")]
    MissingContactName(usize, usize),
}

/// CSS selectors describing one result card. Defaults follow the local results markup of the
/// search page; contacts are read from schema.org `Person` microdata inside a card.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub card: String,
    pub name: String,
    pub details: String,
    pub website: String,
    pub email: String,
    pub contact: String,
    pub contact_name: String,
    pub contact_position: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl Default for CardLayout {
    fn default() -> Self {
        CardLayout {
            card: "div.VkpGBb".to_string(),
            name: "div.dbg0pd, [role=\"heading\"]".to_string(),
            details: "div.rllt__details > div".to_string(),
            website: "a.yYlJEf".to_string(),
            email: "a[href^=\"mailto:\"]".to_string(),
            contact: "[itemtype$=\"schema.org/Person\"]".to_string(),
            contact_name: "[itemprop=\"name\"]".to_string(),
            contact_position: "[itemprop=\"jobTitle\"]".to_string(),
            contact_email: "[itemprop=\"email\"], a[href^=\"mailto:\"]".to_string(),
            contact_phone: "[itemprop=\"telephone\"]".to_string(),
        }
    }
}

struct Selectors {
    card: Selector,
    name: Selector,
    details: Selector,
    website: Selector,
    email: Selector,
    contact: Selector,
    contact_name: Selector,
    contact_position: Selector,
    contact_email: Selector,
    contact_phone: Selector,
}

#[derive(Debug, Default)]
pub struct ParsedPage {
    pub businesses: Vec<BusinessRecord>,
    pub warnings: Vec<String>,
}

pub struct ResultParser {
    selectors: Selectors,
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

impl ResultParser {
    pub fn new(layout: &CardLayout) -> Result<Self, ParseError> {
        Ok(ResultParser {
            selectors: Selectors {
                card: compile(&layout.card)?,
                name: compile(&layout.name)?,
                details: compile(&layout.details)?,
                website: compile(&layout.website)?,
                email: compile(&layout.email)?,
                contact: compile(&layout.contact)?,
                contact_name: compile(&layout.contact_name)?,
                contact_position: compile(&layout.contact_position)?,
                contact_email: compile(&layout.contact_email)?,
                contact_phone: compile(&layout.contact_phone)?,
            },
        })
    }

    pub fn parse(&self, html: &str, source_url: &str) -> ParsedPage {
        let document = Html::parse_document(html);
        let mut page = ParsedPage::default();

        for (i, card) in document.select(&self.selectors.card).enumerate() {
            match self.parse_card(i, card, source_url, &mut page.warnings) {
                Ok(business) => page.businesses.push(business),
                Err(e) => {
                    log::warn!("Skipping result card: {}", e);
                    page.warnings.push(format!("Skipped {}", e));
                }
            }
        }

        page
    }

    fn parse_card(
        &self,
        index: usize,
        card: ElementRef,
        source_url: &str,
        warnings: &mut Vec<String>,
    ) -> Result<BusinessRecord, ParseError> {
        let name = card
            .select(&self.selectors.name)
            .map(element_text)
            .find(|t| !t.is_empty())
            .ok_or(ParseError::MissingName(index))?;

        let mut business = BusinessRecord::new(name, SourceKind::Scrape, source_url.to_string());

        let lines: Vec<String> = card
            .select(&self.selectors.details)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        self.apply_details(&mut business, &lines);

        business.website = card
            .select(&self.selectors.website)
            .find_map(|a| a.value().attr("href").and_then(unwrap_website));

        let contact_elements: Vec<ElementRef> = card.select(&self.selectors.contact).collect();
        let contact_nodes: HashSet<_> = contact_elements
            .iter()
            .flat_map(|c| c.descendants().map(|d| d.id()))
            .collect();

        business.email = card
            .select(&self.selectors.email)
            .filter(|a| !contact_nodes.contains(&a.id()))
            .find_map(mailto_address);

        for (j, contact) in contact_elements.into_iter().enumerate() {
            match self.parse_contact(index, j, contact, business.id) {
                Ok(contact) => business.contacts.push(contact),
                Err(e) => {
                    log::warn!("Skipping contact: {}", e);
                    warnings.push(format!("Skipped {}", e));
                }
            }
        }

        Ok(business)
    }

    // First line carries the category (possibly after a rating), later lines carry the
    // address and phone separated by middle dots.
    fn apply_details(&self, business: &mut BusinessRecord, lines: &[String]) {
        let mut lines = lines.iter();

        if let Some(first) = lines.next() {
            business.category = first
                .split('·')
                .map(str::trim)
                .filter(|s| !s.is_empty() && !looks_like_rating(s))
                .last()
                .map(str::to_string);
        }

        for segment in lines.flat_map(|l| l.split('·')).map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            if let Some(phone) = recognized_phone(segment) {
                business.phone_number.get_or_insert(phone);
            } else if looks_like_phone(segment) {
                continue;
            } else if business.address.is_none() && !looks_like_hours(segment) {
                business.address = Some(segment.to_string());
            }
        }
    }

    fn parse_contact(
        &self,
        card_index: usize,
        contact_index: usize,
        contact: ElementRef,
        company_id: uuid::Uuid,
    ) -> Result<ContactRecord, ParseError> {
        let first_text = |selector: &Selector| {
            contact
                .select(selector)
                .map(element_text)
                .find(|t| !t.is_empty())
        };

        let name = first_text(&self.selectors.contact_name)
            .ok_or(ParseError::MissingContactName(card_index, contact_index))?;
        let position = first_text(&self.selectors.contact_position);
        let email = contact
            .select(&self.selectors.contact_email)
            .find_map(|e| mailto_address(e).or_else(|| Some(element_text(e))))
            .filter(|e| e.contains('@'));
        let phone_number = first_text(&self.selectors.contact_phone).and_then(|p| recognized_phone(&p));

        Ok(ContactRecord::new(
            company_id,
            name,
            position,
            email,
            phone_number,
        ))
    }
}

fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<&str>>()
        .join(" ")
}

fn mailto_address(element: ElementRef) -> Option<String> {
    element
        .value()
        .attr("href")
        .and_then(|href| href.strip_prefix("mailto:"))
        .map(|address| address.split('?').next().unwrap_or(address).trim().to_string())
        .filter(|address| address.contains('@'))
}

/// Resolves `/url?q=` redirect links to the target site.
fn unwrap_website(href: &str) -> Option<String> {
    let base = Url::parse(GOOGLE_BASE_URL).ok()?;
    let url = base.join(href).ok()?;

    let target = match url.path() {
        "/url" => url
            .query_pairs()
            .find(|(key, _)| key == "q" || key == "url")
            .and_then(|(_, value)| Url::parse(&value).ok())?,
        _ => url,
    };

    match (target.scheme(), target.host_str()) {
        ("http" | "https", Some(host)) if !host.ends_with("google.com") => Some(target.to_string()),
        _ => None,
    }
}

fn digit_count(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

// Digits and punctuation only, e.g. a number outside the recognized local formats
fn looks_like_phone(text: &str) -> bool {
    digit_count(text) >= 7 && !text.chars().any(char::is_alphabetic)
}

fn looks_like_rating(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || ".,() ".contains(c))
}

fn looks_like_hours(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["open", "closed", "closes", "opens"]
        .iter()
        .any(|w| lower.starts_with(w))
}
