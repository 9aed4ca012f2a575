//! Decode/encode integration tests.
//!
//! These exercise the public API end to end: decoding realistic messages,
//! searching the resulting tree, and checking that encoding is the
//! structural inverse of decoding.

#![allow(clippy::unwrap_used, clippy::needless_collect)]

use mimetree::{
    Decoder, EncodeOptions, Encoder, Error, Headers, LineEnding, Message, Part, PartFilter,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn redecode(message: &Message) -> Message {
    Message::from_bytes(&message.to_bytes()).unwrap()
}

fn keys(headers: &Headers) -> Vec<&str> {
    headers.iter().map(|(k, _)| k).collect()
}

const NESTED: &str = concat!(
    "Received: from relay1.example.com\r\n",
    "Received: from relay2.example.com\r\n",
    "From: sender@example.com\r\n",
    "To: recipient@example.com\r\n",
    "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
    "Subject: Nested\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/mixed;\r\n",
    "\tboundary=\"outer\"\r\n",
    "\r\n",
    "This is a multi-part message in MIME format.\r\n",
    "\r\n",
    "--outer\r\n",
    "Content-Type: multipart/alternative; boundary=alt\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: text/plain; charset=utf-8\r\n",
    "\r\n",
    "Plain version\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: multipart/related; boundary=\"rel\"\r\n",
    "\r\n",
    "--rel\r\n",
    "Content-Type: text/html; charset=utf-8\r\n",
    "Content-ID: <body@example.com>\r\n",
    "\r\n",
    "<html><body><img src=\"cid:logo@example.com\"></body></html>\r\n",
    "--rel\r\n",
    "Content-Type: image/png\r\n",
    "Content-ID: <logo@example.com>\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\r\n",
    "YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==\r\n",
    "--rel--\r\n",
    "--alt--\r\n",
    "\r\n",
    "--outer\r\n",
    "Content-Type: application/pdf; name=\"report.pdf\"\r\n",
    "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "JVBERi0xLjQK\r\n",
    "--outer--\r\n",
    "epilogue\r\n",
);

#[test]
fn basic_multipart() {
    init_tracing();
    let raw = concat!(
        "From: sender@example.com\r\n",
        "Content-Type: multipart/mixed; boundary=\"simple\"\r\n",
        "\r\n",
        "--simple\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Hello, World!\r\n",
        "--simple\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<h1>Hello, World!</h1>\r\n",
        "--simple--\r\n",
    );

    let message = Message::from_bytes(raw.as_bytes()).unwrap();
    assert_eq!(message.parts().len(), 3);
    assert_eq!(message.from(), Some("sender@example.com"));
    assert_eq!(message.parts()[1].body(), "Hello, World!");
    assert_eq!(message.parts()[2].body(), "<h1>Hello, World!</h1>");
    assert!(message.parts()[1..].iter().all(Part::is_leaf));
}

#[test]
fn declared_multipart_without_boundary() {
    let raw = concat!(
        "From: sender@example.com\r\n",
        "Content-Type: multipart/mixed\r\n",
        "\r\n",
        "--test\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Hello\r\n",
        "--test--\r\n",
    );

    let message = Message::parse(raw).unwrap();
    assert_eq!(message.parts().len(), 1);
    assert!(message.is_multipart());
    assert_eq!(
        message.envelope().body(),
        "--test\nContent-Type: text/plain\n\nHello\n--test--"
    );
}

#[test]
fn invalid_utf8() {
    let err = mimetree::decode(&[0xFF, 0xFE, 0xFD]).unwrap_err();
    assert!(matches!(err, Error::InvalidUtf8(_)));
    assert!(err.to_string().starts_with("Invalid UTF-8 input"));
}

#[test]
fn empty_input() {
    assert_eq!(mimetree::decode_str("").unwrap_err(), Error::NoHeaders);
}

#[test]
fn empty_leaf_body() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=b\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "not empty\r\n",
        "--b--\r\n",
    );

    let message = Message::parse(raw).unwrap();
    assert_eq!(message.parts().len(), 3);
    assert!(message.parts()[1].is_leaf());
    assert_eq!(message.parts()[1].body(), "");
    assert_eq!(message.parts()[2].body(), "not empty");
}

#[test]
fn case_insensitive_lookup_after_decode() {
    let message = Message::parse("Content-Type: text/plain\r\n\r\nbody").unwrap();
    let headers = message.headers();
    assert_eq!(headers.get("content-type"), Some("text/plain"));
    assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    assert_eq!(headers.get("Content-Type"), Some("text/plain"));
}

#[test]
fn header_order_preserved() {
    let raw = concat!(
        "From: a@example.com\r\n",
        "To: b@example.com\r\n",
        "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
        "Subject: Order\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "body\r\n",
    );
    let expected = vec!["From", "To", "Date", "Subject", "MIME-Version", "Content-Type"];

    let message = Message::parse(raw).unwrap();
    assert_eq!(keys(message.headers()), expected);

    let again = redecode(&message);
    assert_eq!(keys(again.headers()), expected);
}

#[test]
fn duplicate_headers_survive_round_trip() {
    let message = Message::parse(NESTED).unwrap();
    assert_eq!(
        message.headers().get_all("received"),
        vec!["from relay1.example.com", "from relay2.example.com"]
    );

    let again = redecode(&message);
    assert_eq!(again.headers(), message.headers());
}

#[test]
fn nested_depth_first_search() {
    init_tracing();
    let message = Message::parse(NESTED).unwrap();

    assert_eq!(message.parts().len(), 3);
    let alternative = &message.parts()[1];
    assert!(alternative.is_container());
    assert_eq!(alternative.children().len(), 2);
    assert!(alternative.children()[0].is_leaf());
    assert!(alternative.children()[1].is_container());

    let html = message
        .first_part(&PartFilter::Header {
            name: "Content-Type",
            value: "text/html",
        })
        .unwrap();
    assert!(html.is_leaf());
    assert_eq!(html.headers().get("content-id"), Some("<body@example.com>"));

    let cid = message
        .first_part(&PartFilter::Header {
            name: "Content-ID",
            value: "<logo@example.com>",
        })
        .unwrap();
    assert_eq!(
        cid.body(),
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\nYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg=="
    );

    let pdf = message
        .first_part(&PartFilter::Attribute {
            header: "Content-Disposition",
            name: "filename",
            value: "report.pdf",
        })
        .unwrap();
    assert_eq!(pdf.body(), "JVBERi0xLjQK");
    assert_eq!(message.part_named("report.pdf"), Some(pdf));

    assert_eq!(message.text_body(), Some("Plain version"));
    assert_eq!(message.walk().count(), 7);
}

#[test]
fn boundary_quoting_equivalence() {
    let body = concat!(
        "\r\n",
        "--abc\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "one\r\n",
        "--abc\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "two\r\n",
        "--abc--\r\n",
    );
    let quoted = format!("Content-Type: multipart/mixed; boundary=\"abc\"\r\n{body}");
    let bare = format!("Content-Type: multipart/mixed; boundary=abc\r\n{body}");

    let quoted = Message::parse(&quoted).unwrap();
    let bare = Message::parse(&bare).unwrap();

    assert_eq!(quoted.parts().len(), 3);
    assert_eq!(quoted.parts()[1..], bare.parts()[1..]);
    assert_eq!(
        quoted.envelope().header_attributes("content-type"),
        bare.envelope().header_attributes("content-type")
    );
}

#[test]
fn round_trip_is_stable() {
    let message = Message::parse(NESTED).unwrap();

    let first = message.to_bytes();
    let decoded = Message::from_bytes(&first).unwrap();
    assert_eq!(decoded, message);

    let second = decoded.to_bytes();
    assert_eq!(first, second);
    assert_eq!(Message::from_bytes(&second).unwrap(), decoded);
}

#[test]
fn round_trip_with_lf_endings() {
    let encoder = Encoder::with_options(EncodeOptions {
        line_ending: LineEnding::Lf,
    });
    let message = Message::parse(NESTED).unwrap();

    let encoded = encoder.encode_message(&message);
    assert!(!encoded.contains(&b'\r'));
    assert_eq!(Decoder::new().decode(&encoded).unwrap(), message);
}

#[test]
fn decoded_parts_get_fresh_identity() {
    let message = Message::parse(NESTED).unwrap();
    let again = redecode(&message);

    assert_eq!(again.parts()[1], message.parts()[1]);
    assert_ne!(again.parts()[1].id(), message.parts()[1].id());
}

#[test]
fn edited_tree_round_trips() {
    let message = Message::parse(NESTED).unwrap();
    let mut parts = message.into_parts();
    let attachment = parts.pop().unwrap();

    let mut headers = attachment.headers().clone();
    headers.set("Content-Disposition", "inline");
    parts.push(attachment.with_headers(headers));
    parts.push(Part::leaf(
        Headers::from([("Content-Type", "text/plain")]),
        "appended",
    ));

    let edited = Message::from_parts(parts).unwrap();
    let again = redecode(&edited);
    assert_eq!(again, edited);
    assert_eq!(again.parts().len(), 4);
    assert_eq!(again.parts()[3].body(), "appended");
}

#[test]
fn single_part_body_keeps_trailing_newline() {
    let message = Message::single_part(Headers::from([("Subject", "x")]), "line\n");
    assert_eq!(redecode(&message), message);
}

fn header_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9@.<>]{1,12}( [A-Za-z0-9]{1,6})?"
}

fn extra_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("X-[A-Za-z]{1,8}", header_value()), 0..4)
}

fn body_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z ]{0,11}|", 0..5).prop_map(|lines| lines.join("\n"))
}

fn leaf_part() -> impl Strategy<Value = Part> {
    (extra_headers(), body_text()).prop_map(|(extra, body)| {
        let mut headers: Headers = extra.into_iter().collect();
        headers.add("Content-Type", "text/plain; charset=utf-8");
        Part::leaf(headers, body)
    })
}

fn part_tree() -> impl Strategy<Value = Part> {
    part_tree_with("[a-z0-9]{12}")
}

/// Trees whose boundaries come from `boundary`, a regex strategy.
fn part_tree_with(boundary: &'static str) -> impl Strategy<Value = Part> {
    leaf_part().prop_recursive(3, 24, 4, move |inner| {
        (
            extra_headers(),
            boundary,
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(extra, boundary, children)| {
                let mut headers: Headers = extra.into_iter().collect();
                headers.add(
                    "Content-Type",
                    format!("multipart/mixed; boundary=\"{boundary}\""),
                );
                Part::container(headers, children)
            })
    })
}

fn message_tree() -> impl Strategy<Value = Message> {
    (
        extra_headers(),
        "[a-z0-9]{12}",
        prop::collection::vec(part_tree(), 0..4),
        body_text(),
    )
        .prop_map(|(extra, boundary, sections, body)| {
            let mut headers: Headers = extra.into_iter().collect();
            headers.add("From", "sender@example.com");
            if sections.is_empty() {
                Message::single_part(headers, body)
            } else {
                headers.add(
                    "Content-Type",
                    format!("multipart/mixed; boundary={boundary}"),
                );
                Message::multipart(headers, sections)
            }
        })
}

/// Messages whose nested containers reuse a few short boundaries, including
/// ones ending in `--`.
fn tangled_message() -> impl Strategy<Value = Message> {
    (
        "(a|b)(--)?",
        prop::collection::vec(part_tree_with("(a|b)(--)?"), 1..4),
    )
        .prop_map(|(boundary, sections)| {
            let headers = Headers::from([
                ("From".to_string(), "sender@example.com".to_string()),
                (
                    "Content-Type".to_string(),
                    format!("multipart/mixed; boundary=\"{boundary}\""),
                ),
            ]);
            Message::multipart(headers, sections)
        })
}

proptest! {
    #[test]
    fn reused_boundaries_decode_stably(message in tangled_message()) {
        let once = redecode(&message);
        let twice = redecode(&once);
        prop_assert_eq!(&twice, &once);
    }

    #[test]
    fn decode_encode_round_trip(message in message_tree()) {
        let once = redecode(&message);
        let twice = redecode(&once);

        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(once.to_bytes(), twice.to_bytes());
        prop_assert_eq!(once.parts().len(), message.parts().len());
    }

    #[test]
    fn generated_trees_keep_their_shape(message in message_tree()) {
        let decoded = redecode(&message);
        let shape = |m: &Message| m.walk().map(Part::is_container).collect::<Vec<_>>();
        prop_assert_eq!(shape(&decoded), shape(&message));
    }
}
