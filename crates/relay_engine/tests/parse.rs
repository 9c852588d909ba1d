use pretty_assertions::assert_eq;
use relay_core::{Number, NO_MESSAGE_BODY};
use relay_engine::{
    extract_csrf_meta, extract_login_token, parse_message, parse_numbers, parse_range_summaries,
    ParseError,
};

const SUMMARY_PAGE: &str = r#"
<div id="accordion">
  <div class="card card-body mb-1 pointer" onclick="getDetials('UK 4470 A');">
    <div class="row">
      <div class="col-sm-4"><h6 class="mb-0">UK 4470 A</h6></div>
      <div class="col-3 col-sm-2"><p class="mb-0 pb-0">12</p></div>
      <div class="col-3 col-sm-2"><p class="mb-0 pb-0">10</p></div>
      <div class="col-3 col-sm-2"><p class="mb-0 pb-0">2</p></div>
      <div class="col-3 col-sm-2"><p class="mb-0 pb-0"><span class="currency_cdr">0.35</span> USD</p></div>
    </div>
  </div>
  <div class="card card-body mb-1 pointer" onclick="getDetials('IVORY COAST 21');">
    <div class="row">
      <div class="col-sm-4"><h6 class="mb-0">IVORY COAST 21</h6></div>
      <div class="col-3 col-sm-2"><p>1,204</p></div>
      <div class="col-3 col-sm-2"><p>1,200</p></div>
      <div class="col-3 col-sm-2"><p>4</p></div>
      <div class="col-3 col-sm-2"><p><span class="currency_cdr">12.5</span> USD</p></div>
    </div>
  </div>
</div>"#;

#[test]
fn summaries_are_read_in_page_order() {
    let ranges = parse_range_summaries(SUMMARY_PAGE).expect("parse");

    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].range_name, "UK 4470 A");
    assert_eq!(ranges[0].range_id, "UK 4470 A");
    assert_eq!(ranges[0].count, 12);
    assert_eq!(ranges[0].paid, 10);
    assert_eq!(ranges[0].unpaid, 2);
    assert!((ranges[0].revenue - 0.35).abs() < 1e-9);
    assert_eq!(ranges[1].range_name, "IVORY COAST 21");
    assert_eq!(ranges[1].count, 1204);
}

#[test]
fn no_sms_marker_is_an_empty_list() {
    let page = r#"<div class="text-center">
        <p id="messageFlash" class="text-muted">You do not have any SMS</p></div>"#;

    assert_eq!(parse_range_summaries(page), Ok(Vec::new()));
}

#[test]
fn page_without_cards_or_marker_is_an_error() {
    let page = "<div class=\"alert\">Something went wrong</div>";

    assert_eq!(
        parse_range_summaries(page),
        Err(ParseError::MissingElement("range summary cards"))
    );
}

#[test]
fn card_with_missing_columns_is_malformed() {
    let page = r#"<div class="card card-body mb-1 pointer">
        <div class="col-sm-4">Broken</div>
        <div class="col-3 col-sm-2"><p>3</p></div>
    </div>"#;

    assert!(matches!(
        parse_range_summaries(page),
        Err(ParseError::Malformed { what: "range summary card", .. })
    ));
}

#[test]
fn unreadable_count_falls_back_to_zero() {
    let page = r#"<div class="card card-body mb-1 pointer">
        <div class="col-sm-4">RangeX</div>
        <div class="col-3 col-sm-2"><p>n/a</p></div>
        <div class="col-3 col-sm-2"><p></p></div>
        <div class="col-3 col-sm-2"><p>1</p></div>
        <div class="col-3 col-sm-2"><p>-</p></div>
    </div>"#;

    let ranges = parse_range_summaries(page).expect("parse");

    assert_eq!(ranges[0].range_name, "RangeX");
    assert_eq!(ranges[0].range_id, "RangeX");
    assert_eq!(ranges[0].count, 0);
    assert_eq!(ranges[0].paid, 0);
    assert_eq!(ranges[0].unpaid, 1);
    assert_eq!(ranges[0].revenue, 0.0);
}

#[test]
fn card_without_counter_paragraph_is_an_error() {
    let page = r#"<div class="card card-body mb-1 pointer">
        <div class="col-sm-4">RangeX</div>
        <div class="col-3 col-sm-2">7</div>
        <div class="col-3 col-sm-2"><p>7</p></div>
        <div class="col-3 col-sm-2"><p>0</p></div>
        <div class="col-3 col-sm-2"><p>0.1</p></div>
    </div>"#;

    assert_eq!(
        parse_range_summaries(page),
        Err(ParseError::MissingElement("range count"))
    );
}

#[test]
fn numbers_keep_page_order_and_skip_unreadable_entries() {
    let page = r#"
    <div class="card card-body border-bottom bg-100 p-2 rounded-0">
      <div class="col-sm-4 border-bottom" onclick="getDetialsNumber('447700900003','9003')">447700900003</div>
    </div>
    <div class="card card-body border-bottom bg-100 p-2 rounded-0">
      <div class="col-sm-4 border-bottom" onclick="refresh()">???</div>
    </div>
    <div class="card card-body border-bottom bg-100 p-2 rounded-0">
      <div class="col-sm-4 border-bottom" onclick="getDetialsNumber('447700900001','9001')">447700900001</div>
    </div>"#;

    assert_eq!(
        parse_numbers(page).expect("parse"),
        vec![
            Number::new("447700900003", "9003"),
            Number::new("447700900001", "9001"),
        ]
    );
}

#[test]
fn empty_number_list_is_not_an_error() {
    assert_eq!(parse_numbers("<div></div>"), Ok(Vec::new()));
}

#[test]
fn message_body_and_revenue_are_read() {
    let page = r#"<div class="row">
        <div class="col-9 col-sm-6 text-center text-sm-start"><p>Your code is 482 913</p></div>
        <div class="col-3 col-sm-2 text-center text-sm-start"><span class="currency_cdr">0.03</span></div>
    </div>"#;

    let detail = parse_message(page).expect("parse");

    assert_eq!(detail.body, "Your code is 482 913");
    assert!((detail.revenue - 0.03).abs() < 1e-9);
}

#[test]
fn absent_message_block_yields_placeholder() {
    let detail = parse_message("<div class=\"row\"></div>").expect("parse");

    assert_eq!(detail.body, NO_MESSAGE_BODY);
    assert_eq!(detail.revenue, 0.0);
}

#[test]
fn message_block_without_text_is_an_error() {
    let page = r#"<div class="col-9 col-sm-6 text-center text-sm-start"><span>gone</span></div>"#;

    assert_eq!(
        parse_message(page),
        Err(ParseError::MissingElement("message text"))
    );
}

#[test]
fn login_and_csrf_tokens_are_extracted() {
    let login = r#"<form><input type="hidden" name="_token" value="abc123"></form>"#;
    let portal = r#"<html><head><meta name="csrf-token" content="xyz789"></head></html>"#;

    assert_eq!(extract_login_token(login), Some("abc123".to_string()));
    assert_eq!(extract_csrf_meta(portal), Some("xyz789".to_string()));
    assert_eq!(extract_login_token("<form></form>"), None);
    assert_eq!(
        extract_csrf_meta(r#"<meta name="csrf-token" content="">"#),
        None
    );
}
