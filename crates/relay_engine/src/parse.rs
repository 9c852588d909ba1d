//! Portal page parsing.
//!
//! Every function here is pure. Missing containers are errors; a missing or
//! unreadable numeric value inside a present container falls back to zero.

use relay_core::{MessageDetail, Number, Range, NO_MESSAGE_BODY};
use relay_logging::relay_warn;
use scraper::{ElementRef, Html, Selector};

const NO_DATA_MARKER: &str = "You do not have any SMS";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid selector {0}")]
    Selector(&'static str),
    #[error("expected element missing: {0}")]
    MissingElement(&'static str),
    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },
}

/// Range summary cards from the received-SMS statistics fragment.
///
/// Returns an empty list when the page says there is no SMS for the window.
pub fn parse_range_summaries(html: &str) -> Result<Vec<Range>, ParseError> {
    let doc = Html::parse_fragment(html);
    let flash_sel = selector("p#messageFlash")?;
    let card_sel = selector("div.card.card-body.mb-1.pointer")?;

    if doc
        .select(&flash_sel)
        .any(|flash| element_text(&flash).contains(NO_DATA_MARKER))
    {
        return Ok(Vec::new());
    }

    let cards: Vec<ElementRef> = doc.select(&card_sel).collect();
    if cards.is_empty() {
        return Err(ParseError::MissingElement("range summary cards"));
    }

    cards.into_iter().map(|card| parse_summary_card(&card)).collect()
}

fn parse_summary_card(card: &ElementRef) -> Result<Range, ParseError> {
    let p_sel = selector("p")?;
    let revenue_sel = selector("span.currency_cdr")?;

    let cols = column_divs(card)?;
    if cols.len() < 5 {
        return Err(ParseError::Malformed {
            what: "range summary card",
            detail: format!("expected 5 columns, found {}", cols.len()),
        });
    }

    let range_name = element_text(&cols[0]);
    let counter = |idx: usize, what: &'static str| -> Result<u64, ParseError> {
        let text = cols[idx]
            .select(&p_sel)
            .next()
            .map(|p| element_text(&p))
            .ok_or(ParseError::MissingElement(what))?;
        Ok(number_or_zero(&text, &range_name, what))
    };
    let count = counter(1, "range count")?;
    let paid = counter(2, "range paid count")?;
    let unpaid = counter(3, "range unpaid count")?;
    let revenue = cols[4]
        .select(&revenue_sel)
        .next()
        .map(|span| decimal_or_zero(&element_text(&span)))
        .unwrap_or(0.0);

    let range_id = card
        .value()
        .attr("onclick")
        .and_then(details_argument)
        .unwrap_or_else(|| range_name.clone());

    Ok(Range {
        range_name,
        range_id,
        count,
        paid,
        unpaid,
        revenue,
    })
}

/// Numbers listed for one range, in page order (newest first).
pub fn parse_numbers(html: &str) -> Result<Vec<Number>, ParseError> {
    let doc = Html::parse_fragment(html);
    let block_sel = selector("div.card.card-body.border-bottom.bg-100.p-2.rounded-0")?;

    let mut numbers = Vec::new();
    for block in doc.select(&block_sel) {
        let column = column_divs(&block)?
            .into_iter()
            .next()
            .ok_or(ParseError::MissingElement("number column"))?;
        let onclick = column.value().attr("onclick").unwrap_or_default();
        match quoted_pair(onclick) {
            Some((number, number_id)) => numbers.push(Number { number, number_id }),
            None => relay_warn!("Failed to parse number onclick: {}", onclick),
        }
    }
    Ok(numbers)
}

/// Body and revenue from a message detail fragment.
pub fn parse_message(html: &str) -> Result<MessageDetail, ParseError> {
    let doc = Html::parse_fragment(html);
    let body_sel = selector("div.col-9.col-sm-6.text-center.text-sm-start")?;
    let revenue_sel = selector("div.col-3.col-sm-2.text-center.text-sm-start")?;
    let p_sel = selector("p")?;
    let currency_sel = selector("span.currency_cdr")?;

    let body = match doc.select(&body_sel).next() {
        Some(block) => block
            .select(&p_sel)
            .next()
            .map(|p| element_text(&p))
            .ok_or(ParseError::MissingElement("message text"))?,
        None => NO_MESSAGE_BODY.to_string(),
    };

    let revenue = match doc.select(&revenue_sel).next() {
        Some(block) => block
            .select(&currency_sel)
            .next()
            .map(|span| decimal_or_zero(&element_text(&span)))
            .ok_or(ParseError::MissingElement("message revenue"))?,
        None => 0.0,
    };

    Ok(MessageDetail { body, revenue })
}

/// The hidden `_token` field of the login form.
pub fn extract_login_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(r#"input[name="_token"]"#).ok()?;
    doc.select(&sel)
        .find_map(|input| input.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// The `csrf-token` meta tag of an authenticated portal page.
pub fn extract_csrf_meta(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(r#"meta[name="csrf-token"]"#).ok()?;
    doc.select(&sel)
        .find_map(|meta| meta.value().attr("content"))
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Descendant `div`s carrying a grid column class (`col-N` or `col-sm-N`).
fn column_divs<'a>(root: &ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, ParseError> {
    let div_sel = selector("div")?;
    Ok(root
        .select(&div_sel)
        .filter(|div| div.value().classes().any(is_column_class))
        .collect())
}

fn is_column_class(class: &str) -> bool {
    let Some(rest) = class.strip_prefix("col-") else {
        return false;
    };
    let rest = rest.strip_prefix("sm-").unwrap_or(rest);
    rest.starts_with(|c: char| c.is_ascii_digit())
}

fn number_or_zero(text: &str, range_name: &str, what: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    text.replace(',', "").parse().unwrap_or_else(|_| {
        relay_warn!("Unreadable {} {:?} for {}, using 0", what, text, range_name);
        0
    })
}

fn decimal_or_zero(text: &str) -> f64 {
    text.replace(',', "").trim().parse().unwrap_or(0.0)
}

/// Argument of the `getDetials('…')` call in a summary card's onclick.
fn details_argument(onclick: &str) -> Option<String> {
    let start = onclick.find("getDetials('")? + "getDetials('".len();
    let len = onclick[start..].find("')")?;
    let argument = &onclick[start..start + len];
    (!argument.is_empty() && !argument.contains('\'')).then(|| argument.to_string())
}

/// First `'a','b'` pair of single-quoted arguments.
fn quoted_pair(onclick: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = onclick.split('\'').collect();
    (1..parts.len().saturating_sub(2))
        .step_by(2)
        .find(|&i| !parts[i].is_empty() && parts[i + 1] == "," && !parts[i + 2].is_empty())
        .map(|i| (parts[i].to_string(), parts[i + 2].to_string()))
}
