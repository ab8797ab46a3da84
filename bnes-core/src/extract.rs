//! Extraction of upcoming collections from an iShareMaps-style council page.
//!
//! The page carries a `reftab` table with one row per collection type. The first cell of
//! each row holds a bold label such as `Your next recycling collection is:` and, when the
//! council has a date on file, a span such as `Friday, 15 March 2024`.

use chrono::{NaiveDate, Weekday};
use scraper::{ElementRef, Html, Selector};

use crate::model::CollectionEvent;

const ROW_SELECTOR: &str = "table#reftab > tr, table#reftab > tbody > tr";
const DATE_FORMAT: &str = "%A, %d %B %Y";
const DAY_MONTH_YEAR_FORMAT: &str = "%d %B %Y";

// Fixed wording of the council page, removed in this order.
const LABEL_PREFIX: &str = "Your next ";
const LABEL_SUFFIX: &str = "collection is";

#[derive(thiserror::Error, Debug)]
/// Errors meaning the page no longer has the expected layout.
pub enum ExtractError {
    /// A selector failed to compile.
    #[error("Invalid selector {selector:?}: {message}")]
    Selector {
        /// Selector source.
        selector: &'static str,
        /// Parser message.
        message: String,
    },
    /// A collection row has no bold label in its first cell.
    #[error("Collection row {row} has no label")]
    MissingLabel {
        /// Zero-based row index within the table.
        row: usize,
    },
    /// A date span did not match `<weekday>, <day> <month> <year>`.
    #[error("Unrecognised collection date {raw:?}: {source}")]
    InvalidDate {
        /// Text found in the date span.
        raw: String,
        /// Parser error.
        #[source]
        source: chrono::ParseError,
    },
}

/// Extract the collections listed on the page, in table order.
///
/// Rows without a date are skipped. An empty result is not an error.
///
/// # Errors
///
/// Returns an [`ExtractError`] when a row's label is missing or its date is malformed.
pub fn extract_collections(page_html: &str) -> Result<Vec<CollectionEvent>, ExtractError> {
    let rows = Selector::parse(ROW_SELECTOR).map_err(|err| ExtractError::Selector {
        selector: ROW_SELECTOR,
        message: format!("{err:?}"),
    })?;
    let document = Html::parse_document(page_html);

    let mut events = Vec::new();
    for (index, row) in document.select(&rows).enumerate() {
        let Some(cell) = child_element(row, "td") else {
            tracing::debug!(row = index, "skipping row without cells");
            continue;
        };

        let label = child_texts(cell, "strong")
            .next()
            .ok_or(ExtractError::MissingLabel { row: index })?;
        let raw_type = label.split(':').next().unwrap_or_default();

        let Some(raw_date) = child_texts(cell, "span")
            .map(str::trim)
            .find(|text| !text.is_empty())
        else {
            tracing::debug!(row = index, label = raw_type, "no date listed, skipping");
            continue;
        };

        let date = parse_date(raw_date)?;
        events.push(CollectionEvent::new(describe(raw_type), date));
    }

    tracing::debug!(count = events.len(), "extracted collections");
    Ok(events)
}

/// Turn a raw label such as `Your next recycling collection is` into `Recycling `.
#[must_use]
pub fn describe(raw_type: &str) -> String {
    capitalize(&raw_type.replace(LABEL_PREFIX, "").replace(LABEL_SUFFIX, ""))
}

/// Parse a council date such as `Friday, 15 March 2024`.
///
/// The leading weekday name must be present but is not checked against the date.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidDate`] for any other format.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ExtractError> {
    let parsed = match raw
        .split_once(", ")
        .filter(|(weekday, _)| weekday.parse::<Weekday>().is_ok())
    {
        Some((_, day_month_year)) => {
            NaiveDate::parse_from_str(day_month_year, DAY_MONTH_YEAR_FORMAT)
        }
        // No weekday prefix, so the full format fails and reports where.
        None => NaiveDate::parse_from_str(raw, DATE_FORMAT),
    };
    parsed.map_err(|source| ExtractError::InvalidDate {
        raw: raw.to_owned(),
        source,
    })
}

// Upper-case the first character and lower-case the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn child_element<'a>(parent: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == name)
}

// Direct text nodes of every `name` child, in document order.
fn child_texts<'a>(parent: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
        .flat_map(|child| {
            child
                .children()
                .filter_map(|node| node.value().as_text())
                .map(|text| &**text)
        })
}
