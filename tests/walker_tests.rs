//! Integration tests for the walker, the render/list/reply visitors and
//! the per-message session.

use std::path::{Path, PathBuf};

use mimewalk::mime::filter::FilterTable;
use mimewalk::mime::{walk_message, Action, Visitor};
use mimewalk::parser::header::mime_type;
use mimewalk::parser::message::{Message, MessageSource, Part};
use mimewalk::session::{BodyMode, HeaderMode, Session, ShowOptions};
use mimewalk::visitor::{List, ListFormat, Render, Reply};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> MessageSource {
    MessageSource::open(fixture(name)).unwrap()
}

/// Records `(depth, type)` for every visit and answers from a script.
struct Script {
    seen: Vec<(usize, String)>,
    answer_at: Option<(usize, Action)>,
}

impl Script {
    fn new(answer_at: Option<(usize, Action)>) -> Self {
        Self {
            seen: Vec::new(),
            answer_at,
        }
    }

    fn types(&self) -> Vec<&str> {
        self.seen.iter().map(|(_, t)| t.as_str()).collect()
    }
}

impl Visitor for Script {
    fn visit(&mut self, depth: usize, part: &Part<'_>, _body: &[u8]) -> Action {
        self.seen
            .push((depth, mime_type(&part.content_type()).to_string()));
        match self.answer_at {
            Some((n, action)) if n == self.seen.len() => action,
            _ => Action::Continue,
        }
    }
}

fn render_to_string(message: &Message<'_>, filters: &FilterTable) -> String {
    let mut render = Render::new(Vec::new(), filters);
    walk_message(message, &mut render);
    String::from_utf8(render.finish().unwrap()).unwrap()
}

// ─── Traversal order and numbering ──────────────────────────────────

#[test]
fn test_preorder_through_embedded_message() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut script = Script::new(None);
    assert_eq!(walk_message(&message, &mut script), Action::Continue);

    assert_eq!(
        script.types(),
        vec![
            "multipart/mixed",
            "text/plain",
            "message/rfc822",
            "multipart/alternative",
            "text/plain",
            "text/html",
            "application/pdf",
        ]
    );
    let depths: Vec<usize> = script.seen.iter().map(|(d, _)| *d).collect();
    assert_eq!(depths, vec![0, 1, 1, 2, 3, 3, 1]);
}

#[test]
fn test_sequence_numbers_have_no_gaps() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut list = List::new(std::io::sink(), ListFormat::Json);
    walk_message(&message, &mut list);
    let parts = list.finish().unwrap();

    let numbers: Vec<usize> = parts.iter().map(|p| p.number).collect();
    assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
    assert_eq!(parts[6].filename.as_deref(), Some("report.pdf"));
    // "%PDF-1.4\n" after base64 decoding
    assert_eq!(parts[6].size, 9);
}

#[test]
fn test_stop_inside_embedded_message() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut script = Script::new(Some((5, Action::Stop)));
    assert_eq!(walk_message(&message, &mut script), Action::Stop);
    assert_eq!(script.seen.len(), 5);
    assert!(!script.types().contains(&"application/pdf"));
}

#[test]
fn test_prune_keeps_later_siblings() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut script = Script::new(Some((3, Action::Prune)));
    assert_eq!(walk_message(&message, &mut script), Action::Continue);
    assert_eq!(
        script.types(),
        vec![
            "multipart/mixed",
            "text/plain",
            "message/rfc822",
            "application/pdf"
        ]
    );
}

// ─── Render ─────────────────────────────────────────────────────────

#[test]
fn test_render_recodes_latin1_text() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let text = render_to_string(&message, &FilterTable::new());

    assert!(text.starts_with("--- 1: multipart/mixed size="));
    assert!(text.contains("--- --- 2: text/plain size=14 ---\nGrüße aus Köln\n"));
    assert!(text.contains("Subject: Inner\n"));
    assert!(text.contains("--- --- --- --- 5: text/plain size="));
    assert!(text.contains("inner plain"));
    assert!(text.contains(
        "--- --- 7: application/pdf size=9 name=\"report.pdf\" ---\nno filter or default handler\n"
    ));
}

#[cfg(unix)]
#[test]
fn test_render_filter_on_embedded_message_prunes_it() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut filters = FilterTable::new();
    filters.insert("message", "wc -c >/dev/null; echo forwarded");
    let text = render_to_string(&message, &filters);

    assert!(text.contains("3: message/rfc822 size="));
    assert!(text.contains("filter=\"wc -c >/dev/null; echo forwarded\" ---\nforwarded\n"));
    assert!(!text.contains("inner plain"));
    assert!(!text.contains("text/html"));
    // the pruned subtree is never visited, so it takes no numbers
    assert!(text.contains("--- --- 4: application/pdf size=9 name=\"report.pdf\" ---\n"));
    assert!(!text.contains("7: application/pdf"));
}

#[cfg(unix)]
#[test]
fn test_render_failing_message_filter_keeps_children() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut filters = FilterTable::new();
    filters.insert("message", "cat >/dev/null; exit 2");
    let text = render_to_string(&message, &filters);

    assert!(text.contains("3: message/rfc822 size="));
    assert!(text.contains(" filter=\"cat >/dev/null; exit 2\" ---\nFrom: Carol <carol@example.com>\n"));
    assert!(text.contains("Subject: Inner\n"));
    assert!(text.contains("--- --- --- --- 5: text/plain size=11 ---\ninner plain"));
    assert!(text.contains("6: text/html size=17"));
    assert!(text.contains("--- --- 7: application/pdf"));
}

#[cfg(unix)]
#[test]
fn test_render_failing_filter_falls_back() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut filters = FilterTable::new();
    filters.insert("text/plain", "cat >/dev/null; exit 2");
    let text = render_to_string(&message, &filters);

    assert!(text.contains(
        " charset=\"ISO-8859-1\" filter=\"cat >/dev/null; exit 2\" ---\nGrüße aus Köln\n"
    ));
}

#[cfg(unix)]
#[test]
fn test_render_filter_sees_charset() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut filters = FilterTable::new();
    filters.insert("text/plain", "cat >/dev/null; echo \"cs=$PIPE_CHARSET\"");
    let text = render_to_string(&message, &filters);

    assert!(text.contains("cs=ISO-8859-1\n"));
    assert!(text.contains("cs=us-ascii\n"));
}

// ─── List and reply ─────────────────────────────────────────────────

#[test]
fn test_list_indents_and_omits_bodies() {
    let mut session = Session::new(Vec::new(), FilterTable::new());
    let path = fixture("nested.eml");
    let parts = session.list(&path, ListFormat::Text).unwrap();
    let text = String::from_utf8(session.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(parts.len(), 7);
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], path.display().to_string());
    assert!(lines[1].starts_with("  1: multipart/mixed size="));
    assert!(lines[2].starts_with("    2: text/plain size="));
    assert!(lines[5].starts_with("        5: text/plain size="));
    assert_eq!(lines[7], "    7: application/pdf size=9 name=\"report.pdf\"");
    assert!(!text.contains("inner plain"));
}

#[test]
fn test_list_json() {
    let mut session = Session::new(Vec::new(), FilterTable::new());
    session
        .list(&fixture("three_parts.eml"), ListFormat::Json)
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&session.into_inner()).unwrap();

    let parts = value["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1]["number"], 2);
    assert_eq!(parts[1]["mime_type"], "text/plain");
    assert_eq!(parts[1]["size"], 5);
    assert_eq!(parts[2]["size"], 6);
    assert!(parts[1].get("filename").is_none());
    assert!(value["file"].as_str().unwrap().ends_with("three_parts.eml"));
}

#[test]
fn test_reply_quotes_plain_text_only() {
    let source = load("nested.eml");
    let message = source.parse().unwrap();
    let mut reply = Reply::new(Vec::new());
    walk_message(&message, &mut reply);
    let text = String::from_utf8(reply.finish().unwrap()).unwrap();

    // recoded text gains a final newline, UTF-8 and ASCII bodies are copied as is
    assert_eq!(text, "Grüße aus Köln\ninner plain");
}

// ─── Show ───────────────────────────────────────────────────────────

#[test]
fn test_show_page_break_between_messages() {
    let options = ShowOptions {
        headers: HeaderMode::selected("subject"),
        body: BodyMode::Skip,
        ..ShowOptions::default()
    };
    let mut session = Session::new(Vec::new(), FilterTable::new());
    session.show(&fixture("three_parts.eml"), &options).unwrap();
    session.show(&fixture("plain.eml"), &options).unwrap();
    let text = String::from_utf8(session.into_inner()).unwrap();

    assert_eq!(text, "Subject: Three parts\n\x0c\nSubject: No MIME here\n");
}

#[test]
fn test_show_without_page_break() {
    let options = ShowOptions {
        headers: HeaderMode::selected("subject"),
        body: BodyMode::Skip,
        page_break: false,
        ..ShowOptions::default()
    };
    let mut session = Session::new(Vec::new(), FilterTable::new());
    session.show(&fixture("three_parts.eml"), &options).unwrap();
    session.show(&fixture("plain.eml"), &options).unwrap();
    let text = String::from_utf8(session.into_inner()).unwrap();

    assert!(!text.contains('\x0c'));
}

#[test]
fn test_show_non_mime_body_is_raw() {
    let mut session = Session::new(Vec::new(), FilterTable::new());
    session
        .show(&fixture("plain.eml"), &ShowOptions::default())
        .unwrap();
    let text = String::from_utf8(session.into_inner()).unwrap();

    assert!(text.contains("Subject: No MIME here\n"));
    assert!(text.contains("\n\nJust a plain old message.\n=?UTF-8?Q?not_decoded?=\n"));
    assert!(!text.contains("---"));
}

#[test]
fn test_show_decodes_subject_and_renders_parts() {
    let mut session = Session::new(Vec::new(), FilterTable::new());
    session
        .show(&fixture("nested.eml"), &ShowOptions::default())
        .unwrap();
    let text = String::from_utf8(session.into_inner()).unwrap();

    assert!(text.starts_with("From: Alice Example <alice@example.com>\n"));
    assert!(text.contains("Subject: Quartalsbericht für Köln\n"));
    assert!(text.contains("--- 1: multipart/mixed"));
}

#[test]
fn test_show_missing_file() {
    let mut session = Session::new(Vec::new(), FilterTable::new());
    let err = session
        .show(&fixture("does-not-exist.eml"), &ShowOptions::default())
        .unwrap_err();
    assert!(matches!(err, mimewalk::error::MimeError::NotFound(_)));
}
